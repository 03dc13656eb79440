use std::{
    fs,
    io::{self, BufRead, Write},
};

use aplomb::interpreter::{evaluator::core::Interpreter, lexer::LineBuffer};
use clap::Parser;
use tracing::Level;

/// aplomb evaluates expressions of an APL dialect, one line at a time.
///
/// Without a script it reads lines from standard input.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Tells aplomb to read `contents` as a file path instead of a script.
    #[arg(short, long)]
    file: bool,

    /// First valid index.
    #[arg(long, default_value_t = 1)]
    origin: i64,

    /// Significant digits shown for floats.
    #[arg(long)]
    precision: Option<usize>,

    /// Logs dispatch decisions to standard error; repeat for more detail.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Lists every registered primitive and operator, then exits.
    #[arg(long)]
    list: bool,

    contents: Option<String>,
}

fn main() {
    let args = Args::parse();

    let level = match args.verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt().with_max_level(level)
                             .with_writer(io::stderr)
                             .init();

    let mut ip = Interpreter::new();
    ip.config_mut().origin = args.origin;
    if let Some(precision) = args.precision {
        ip.config_mut().precision = precision;
    }

    if args.list {
        for (symbol, doc) in ip.registry().docs() {
            println!("{symbol}  {doc}");
        }
        return;
    }

    let script = match args.contents {
        Some(path) if args.file => fs::read_to_string(&path).unwrap_or_else(|_| {
                                                                 eprintln!("Failed to read the input file '{path}'. \
                                                                            Perhaps this file does not exist?");
                                                                 std::process::exit(1);
                                                             }),
        Some(script) => script,
        None => {
            repl(&mut ip);
            return;
        },
    };

    let mut buffer = LineBuffer::new();
    for line in script.lines() {
        match buffer.push(line) {
            Ok(Some(logical)) => {
                if let Err(e) = ip.run(&logical) {
                    eprintln!("{e}");
                }
            },
            Ok(None) => {},
            Err(e) => eprintln!("{e}"),
        }
    }
}

/// Reads lines from standard input until it closes. Errors are reported and
/// the session goes on.
fn repl(ip: &mut Interpreter) {
    let mut buffer = LineBuffer::new();
    let stdin = io::stdin();
    prompt(&buffer);
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        match buffer.push(&line) {
            Ok(Some(logical)) => {
                if let Err(e) = ip.run(&logical) {
                    eprintln!("{e}");
                }
            },
            Ok(None) => {},
            Err(e) => eprintln!("{e}"),
        }
        prompt(&buffer);
    }
}

fn prompt(buffer: &LineBuffer) {
    print!("{}", if buffer.is_pending() { "      ⋄ " } else { "      " });
    let _ = io::stdout().flush();
}
