use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use jscore::lexer::{LexError, Lexer};
use jscore::parser::ParseError;
use jscore::{Completion, Interpreter};
use tracing_subscriber::EnvFilter;

/// Evaluation recurses on the native stack; run it on a thread with room
/// for the interpreter's call depth limit.
const EVAL_STACK_SIZE: usize = 256 * 1024 * 1024;

#[derive(Parser)]
#[command(name = "jscore", version, about = "An ECMAScript interpreter")]
struct Cli {
    /// JavaScript file to execute
    file: Option<PathBuf>,

    /// Evaluate inline JavaScript
    #[arg(short = 'e', long = "eval")]
    eval: Option<String>,

    /// Print the token stream instead of evaluating
    #[arg(long, conflicts_with = "ast")]
    tokens: bool,

    /// Print the parsed AST instead of evaluating
    #[arg(long)]
    ast: bool,

    /// Tracing filter, e.g. `debug` or `jscore::parser=trace`
    #[arg(long, env = "JSCORE_LOG", default_value = "warn")]
    log: String,
}

#[derive(Debug, thiserror::Error)]
enum EngineError {
    #[error("{0}")]
    Lex(#[from] LexError),
    #[error("{0}")]
    Syntax(#[from] ParseError),
    #[error("Uncaught {0}")]
    Uncaught(String),
    #[error("Error reading {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
}

#[derive(Clone, Copy)]
enum Mode {
    Evaluate,
    Tokens,
    Ast,
}

impl Mode {
    fn from_cli(cli: &Cli) -> Self {
        if cli.tokens {
            Mode::Tokens
        } else if cli.ast {
            Mode::Ast
        } else {
            Mode::Evaluate
        }
    }
}

fn run_source(interp: &mut Interpreter, source: &str, mode: Mode) -> Result<Option<String>, EngineError> {
    match mode {
        Mode::Tokens => {
            for token in Lexer::new(source) {
                let token = token?;
                println!("{}\t{:?}\t{:?}", token.location, token.kind, token.text);
            }
            Ok(None)
        }
        Mode::Ast => {
            let program = jscore::parse(source)?;
            println!("{program:#?}");
            Ok(None)
        }
        Mode::Evaluate => {
            let program = jscore::parse(source)?;
            match program.evaluate(interp) {
                Completion::Throw(thrown) => Err(EngineError::Uncaught(interp.format_value(&thrown))),
                Completion::Normal(value) => Ok(Some(interp.format_value(&value))),
                _ => Ok(None),
            }
        }
    }
}

fn execute_code(code: &str, mode: Mode) -> ExitCode {
    let mut interp = Interpreter::new();
    match run_source(&mut interp, code, mode) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(1)
        }
    }
}

fn run_file(path: &Path, mode: Mode) -> ExitCode {
    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(source) => {
            let err = EngineError::Io {
                path: path.to_path_buf(),
                source,
            };
            eprintln!("{err}");
            return ExitCode::from(1);
        }
    };
    execute_code(&source, mode)
}

fn run_repl(mode: Mode) -> ExitCode {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut interp = Interpreter::new();

    println!("jscore v{}", env!("CARGO_PKG_VERSION"));
    println!("Type JavaScript statements. Press Ctrl-D to exit.");

    loop {
        print!("> ");
        if stdout.flush().is_err() {
            break;
        }

        let mut line = String::new();
        let read_result = stdin.lock().read_line(&mut line);

        match read_result {
            Ok(0) => break,
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                match run_source(&mut interp, trimmed, mode) {
                    Ok(Some(value)) => println!("{value}"),
                    Ok(None) => {}
                    Err(err) => eprintln!("{err}"),
                }
            }
            Err(e) => {
                eprintln!("Read error: {e}");
                return ExitCode::from(1);
            }
        }
    }

    println!();
    ExitCode::SUCCESS
}

fn run(cli: Cli) -> ExitCode {
    let mode = Mode::from_cli(&cli);

    if let Some(code) = &cli.eval {
        return execute_code(code, mode);
    }

    if let Some(path) = &cli.file {
        return run_file(path, mode);
    }

    run_repl(mode)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let worker = std::thread::Builder::new()
        .name("jscore-eval".to_string())
        .stack_size(EVAL_STACK_SIZE)
        .spawn(move || run(cli));
    match worker.map(|handle| handle.join()) {
        Ok(Ok(code)) => code,
        Ok(Err(_)) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Failed to start evaluator thread: {e}");
            ExitCode::from(1)
        }
    }
}
