use std::sync::Arc;

use tracing::debug;

use crate::{
    error::RuntimeError,
    interpreter::{
        domain::{
            array::{is_array, to_vector},
            core::{monadic, split},
            scalar::{is_channel, is_dict},
        },
        evaluator::{
            core::{EvalResult, Interpreter},
            registry::{Handler, PrimitiveHandler},
        },
        value::{array::Array, channel::Channel, core::Value, dict::Dict},
    },
};

/// `K#V`: a dictionary from parallel key and value vectors. A single value
/// is shared by every key.
fn build_dict(keys: &Value, values: &Value) -> EvalResult<Value> {
    let keys = keys.elements();
    let mut values = values.elements();
    if values.len() == 1 && keys.len() > 1 {
        values = vec![values[0].clone(); keys.len()];
    }
    if keys.len() != values.len() {
        return Err(RuntimeError::LengthError { details: format!("{} keys but {} values", keys.len(), values.len()) });
    }

    let mut dict = Dict::new();
    for (key, value) in keys.into_iter().zip(values) {
        if !dict.insert(key.clone(), value) {
            return Err(RuntimeError::InvalidArgument { details: format!("{} cannot be a key", key.type_name()) });
        }
    }
    Ok(Value::Dict(Arc::new(dict)))
}

fn keys(ip: &Interpreter, value: &Value) -> Value {
    match value {
        Value::Dict(dict) => Value::from(Array::vector(dict.keys().to_vec()).unify(ip.tower(), true)),
        other => other.clone(),
    }
}

/// `<C`: the next value of a channel. An error sent by the producer is
/// raised here.
fn receive(channel: &Channel) -> EvalResult<Value> {
    match channel.recv() {
        Some(Value::Error(error)) => {
            channel.close();
            Err(error.as_ref().clone())
        },
        Some(value) => Ok(value),
        None => Err(RuntimeError::ChannelClosed),
    }
}

/// `,C`: collects the rest of a channel into a vector.
fn drain(ip: &Interpreter, channel: &Channel) -> EvalResult<Value> {
    let mut values = Vec::new();
    while let Some(value) = channel.recv() {
        if let Value::Error(error) = value {
            channel.close();
            return Err(error.as_ref().clone());
        }
        values.push(value);
    }
    debug!(received = values.len(), "drained channel");
    Ok(Value::from(Array::vector(values).unify(ip.tower(), true)))
}

/// Returns the dictionary and channel handlers.
pub fn handlers() -> Vec<Arc<dyn PrimitiveHandler>> {
    let handlers = vec![Handler::new("#", "dictionary", split(to_vector(None), to_vector(None)), |_, left, right| {
                            let left = left.ok_or_else(|| RuntimeError::domain("#", None, &right))?;
                            build_dict(&left, &right)
                        }),
                        Handler::new("#", "keys", monadic(is_dict()), |ip, _, right| Ok(keys(ip, &right))),
                        Handler::new("<", "stream", monadic(is_array(None)), |_, _, right| {
                            let cells = right.as_array_view().major_cells();
                            Ok(Value::Channel(Channel::from_values(cells)))
                        }),
                        Handler::new("<", "receive", monadic(is_channel()), |_, _, right| match &right {
                            Value::Channel(channel) => receive(channel),
                            other => Err(RuntimeError::domain("<", None, other)),
                        }),
                        Handler::new(",", "drain", monadic(is_channel()), |ip, _, right| match &right {
                            Value::Channel(channel) => drain(ip, channel),
                            other => Err(RuntimeError::domain(",", None, other)),
                        }),];

    handlers.into_iter()
            .map(|h| Arc::new(h) as Arc<dyn PrimitiveHandler>)
            .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(line: &str) -> EvalResult<Vec<Value>> {
        let mut ip = Interpreter::new();
        let program = ip.parse(line).expect("parses");
        ip.eval_program(&program)
    }

    #[test]
    fn dictionaries_from_vectors() {
        let values = run("D←\"a\" \"b\"#1 2 ⋄ D[\"b\"] ⋄ #D").unwrap();
        assert_eq!(values[1].to_string(), "2");
        assert_eq!(values[2].to_string(), "ab");
    }

    #[test]
    fn mismatched_lengths_fail() {
        assert!(matches!(run("1 2 3#4 5"), Err(RuntimeError::LengthError { .. })));
    }

    #[test]
    fn channels_stream_major_cells() {
        let values = run("C←<10 20 30 ⋄ <C ⋄ <C ⋄ ,C").unwrap();
        assert_eq!(values[1].to_string(), "10");
        assert_eq!(values[2].to_string(), "20");
        assert_eq!(values[3].to_string(), "30");
    }

    #[test]
    fn receiving_past_the_end_fails() {
        assert_eq!(run("C←<1 2 ⋄ ,C ⋄ <C").unwrap_err(), RuntimeError::ChannelClosed);
    }

    #[test]
    fn matrices_stream_rows() {
        let values = run("C←<2 3⍴⍳6 ⋄ <C").unwrap();
        assert_eq!(values[1].to_string(), "1 2 3");
    }
}
