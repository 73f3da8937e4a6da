use std::cell::RefCell;
use std::fs;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;

use clap::{Parser as ClapParser, ValueEnum};
use colored::Colorize;
use thiserror::Error;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use marble::env::Env;
use marble::error::{ParseError, RuntimeError};
use marble::evaluator::Evaluator;
use marble::lexer::Lexer;
use marble::parser::Parser;
use marble::token::TokenKind;

#[derive(ClapParser, Debug)]
#[clap(name = "marble", version, about = "Run a marble program")]
struct Cli {
    /// The path of the file to open
    #[clap(short, long, value_parser)]
    filepath: PathBuf,

    /// What to print: the token stream, the parsed program, or the final value
    #[clap(long, value_enum, default_value = "value")]
    emit: Emit,

    /// Log front end and evaluator activity to stderr
    #[clap(short, long)]
    verbose: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Emit {
    Tokens,
    Ast,
    Value,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("unable to read file, {0}")]
    Read(#[from] std::io::Error),
    #[error("parsing errors")]
    Parse(Vec<ParseError>),
    #[error("{0}")]
    Runtime(#[from] RuntimeError),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if !std::io::stderr().is_terminal() {
        colored::control::set_override(false);
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Parse(errors)) => {
            eprintln!("{}", "parsing errors".red().bold());
            for error in errors {
                eprintln!("  {}", error);
            }
            ExitCode::FAILURE
        }
        Err(error) => {
            eprintln!("{}", error.to_string().red());
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("marble=trace")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let source = fs::read(&cli.filepath)?;
    debug!(path = %cli.filepath.display(), bytes = source.len(), "read source");

    if cli.emit == Emit::Tokens {
        let mut lexer = Lexer::new(&source);
        loop {
            let token = lexer.next_token();
            println!("{:>4}:{:<4} {:<10} {}", token.line, token.column, token.kind, token.literal);
            if token.kind == TokenKind::Eof {
                return Ok(());
            }
        }
    }

    let mut parser = Parser::new(Lexer::new(&source));
    let program = parser.parse_program();
    if !parser.errors().is_empty() {
        return Err(CliError::Parse(parser.errors().to_vec()));
    }

    if cli.emit == Emit::Ast {
        println!("{}", program);
        return Ok(());
    }

    let mut evaluator = Evaluator::new(Rc::new(RefCell::new(Env::new())));
    let result = evaluator.eval(&program)?;
    println!("{}", result.map(|object| object.to_string()).unwrap_or_default());

    Ok(())
}
