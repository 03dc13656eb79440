use std::{
    collections::VecDeque,
    fmt,
    sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError},
    thread,
};

use tracing::debug;

use crate::interpreter::value::core::Value;

/// Values a producer may run ahead of its consumer.
const CAPACITY: usize = 1;

#[derive(Default)]
struct State {
    queue:     VecDeque<Value>,
    /// The consumer closed the channel.
    cancelled: bool,
    /// Every consumer handle was dropped.
    abandoned: bool,
    /// The producer hung up.
    finished:  bool,
}

/// State shared by both ends. Every change to it is announced on `changed`.
#[derive(Default)]
struct Shared {
    state:   Mutex<State>,
    changed: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, State>) -> MutexGuard<'a, State> {
        self.changed.wait(guard).unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, f: impl FnOnce(&mut State)) {
        f(&mut self.lock());
        self.changed.notify_all();
    }
}

/// Marks the channel abandoned once the last consumer handle goes away.
struct Consumer(Arc<Shared>);

impl Drop for Consumer {
    fn drop(&mut self) {
        self.0.update(|state| state.abandoned = true);
    }
}

/// The receiving end of a single-producer, single-consumer value stream.
///
/// A channel pairs a bounded data direction with a cancellation flag. Both
/// ends block on one condition variable, so a producer waiting for room
/// wakes up either when the consumer takes a value or when it cancels.
/// Closing raises the flag, drops anything queued and then waits until the
/// producer has observed the flag and hung up.
#[derive(Clone)]
pub struct Channel {
    consumer: Arc<Consumer>,
}

/// The producing end of a [`Channel`]. Dropping it ends the stream.
pub struct Producer {
    shared: Arc<Shared>,
}

impl Channel {
    /// Creates a connected producer and channel.
    #[must_use]
    pub fn pair() -> (Producer, Self) {
        let shared = Arc::new(Shared::default());
        (Producer { shared: Arc::clone(&shared) },
         Self { consumer: Arc::new(Consumer(shared)) })
    }

    fn shared(&self) -> &Shared {
        &self.consumer.0
    }

    /// Streams the given values from a background thread.
    ///
    /// # Example
    /// ```
    /// use aplomb::interpreter::value::{channel::Channel, core::Value};
    ///
    /// let c = Channel::from_values(vec![Value::Int(1), Value::Int(2)]);
    /// assert_eq!(c.recv(), Some(Value::Int(1)));
    /// assert_eq!(c.recv(), Some(Value::Int(2)));
    /// assert_eq!(c.recv(), None);
    /// ```
    #[must_use]
    pub fn from_values(values: Vec<Value>) -> Self {
        let (producer, channel) = Self::pair();
        thread::spawn(move || {
            for value in values {
                if !producer.send(value) {
                    break;
                }
            }
        });
        channel
    }

    /// Receives the next value, blocking until one is available.
    ///
    /// Returns `None` once the producer has finished or the channel has been
    /// closed.
    #[must_use]
    pub fn recv(&self) -> Option<Value> {
        let shared = self.shared();
        let mut state = shared.lock();
        loop {
            if let Some(value) = state.queue.pop_front() {
                drop(state);
                shared.changed.notify_all();
                return Some(value);
            }
            if state.finished || state.cancelled {
                return None;
            }
            state = shared.wait(state);
        }
    }

    /// Cancels the producer and waits for it to hang up.
    pub fn close(&self) {
        let shared = self.shared();
        let mut state = shared.lock();
        state.cancelled = true;
        let drained = state.queue.len();
        state.queue.clear();
        shared.changed.notify_all();
        while !state.finished {
            state = shared.wait(state);
        }
        debug!(drained, "channel closed");
    }

    /// Returns `true` once [`Channel::close`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared().lock().cancelled
    }
}

impl Producer {
    /// Sends a value, waiting while the channel is full.
    ///
    /// Returns `false` without sending if the consumer cancelled or went
    /// away; the producer should stop at that point.
    pub fn send(&self, value: Value) -> bool {
        let mut state = self.shared.lock();
        loop {
            if state.cancelled || state.abandoned {
                return false;
            }
            if state.queue.len() < CAPACITY {
                state.queue.push_back(value);
                drop(state);
                self.shared.changed.notify_all();
                return true;
            }
            state = self.shared.wait(state);
        }
    }

    /// Returns `true` if the consumer closed the channel or dropped it.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        let state = self.shared.lock();
        state.cancelled || state.abandoned
    }
}

impl Drop for Producer {
    fn drop(&mut self) {
        self.shared.update(|state| state.finished = true);
    }
}

impl PartialEq for Channel {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.consumer, &other.consumer)
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
         .field("closed", &self.is_closed())
         .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_stops_an_endless_producer() {
        let (producer, channel) = Channel::pair();
        let handle = thread::spawn(move || {
            let mut sent = 0_i64;
            while producer.send(Value::Int(sent)) {
                sent += 1;
            }
            sent
        });
        assert_eq!(channel.recv(), Some(Value::Int(0)));
        channel.close();
        assert!(channel.is_closed());
        assert!(handle.join().unwrap() >= 1);
        assert_eq!(channel.recv(), None);
    }

    #[test]
    fn close_wakes_a_producer_waiting_for_room() {
        let (producer, channel) = Channel::pair();
        let handle = thread::spawn(move || {
            assert!(producer.send(Value::Int(1)));
            producer.send(Value::Int(2))
        });
        while channel.shared().lock().queue.is_empty() {
            thread::yield_now();
        }
        channel.close();
        assert!(!handle.join().unwrap());
        assert_eq!(channel.recv(), None);
    }

    #[test]
    fn values_sent_before_hanging_up_are_delivered() {
        let (producer, channel) = Channel::pair();
        assert!(producer.send(Value::Int(7)));
        drop(producer);
        assert_eq!(channel.recv(), Some(Value::Int(7)));
        assert_eq!(channel.recv(), None);
        channel.close();
    }

    #[test]
    fn a_blocked_consumer_does_not_hold_up_close() {
        let (producer, channel) = Channel::pair();
        let reader = channel.clone();
        let waiting = thread::spawn(move || reader.recv());
        let writer = thread::spawn(move || {
            while producer.send(Value::Int(0)) {}
        });
        channel.close();
        writer.join().unwrap();
        let _ = waiting.join().unwrap();
        assert!(channel.is_closed());
    }

    #[test]
    fn dropping_the_consumer_disconnects() {
        let (producer, channel) = Channel::pair();
        drop(channel);
        assert!(!producer.send(Value::Int(1)));
    }
}
