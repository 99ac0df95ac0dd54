//! c99c - C99 front-end driver
//!
//! Lexes, parses and type-checks a C source file and reports diagnostics.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use c99_frontend::frontend::lexer::Lexer;
use c99_frontend::frontend::token::TokenKind;
use c99_frontend::{check_source, parse_source, AnalyzerConfig};

/// C99 front-end
#[derive(Parser, Debug)]
#[command(name = "c99c")]
#[command(author = "Z1529")]
#[command(version)]
#[command(about = "C99 front-end - lexer, parser and semantic analyzer")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input source file (.c)
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Diagnostic output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    format: OutputFormat,

    /// Do not warn about unused local variables
    #[arg(long, global = true)]
    no_warn_unused: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Lex, parse and analyze a source file
    Check {
        /// Input source file
        input: PathBuf,
    },
    /// Dump the token stream
    Tokens {
        /// Input source file
        input: PathBuf,
    },
    /// Dump the syntax tree
    Ast {
        /// Input source file
        input: PathBuf,
    },
    /// Print version information
    Version,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("error: {:#}", e);
            process::exit(1);
        }
    }
}

/// Returns whether the source was free of errors
fn run(cli: &Cli) -> Result<bool> {
    match &cli.command {
        Some(Commands::Check { input }) => check_file(input, cli),
        Some(Commands::Tokens { input }) => dump_tokens(input),
        Some(Commands::Ast { input }) => dump_ast(input),
        Some(Commands::Version) => {
            println!("c99c {}", env!("CARGO_PKG_VERSION"));
            println!("C99 front-end");
            println!("License: Apache-2.0");
            Ok(true)
        }
        None => match &cli.input {
            Some(input) => check_file(input, cli),
            None => {
                eprintln!("Error: No input file specified");
                eprintln!("Usage: c99c <FILE> or c99c check <FILE>");
                Ok(false)
            }
        },
    }
}

fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn check_file(input: &Path, cli: &Cli) -> Result<bool> {
    let source = read_source(input)?;
    let config = AnalyzerConfig {
        warn_unused: !cli.no_warn_unused,
    };
    let outcome = check_source(&source, &input.display().to_string(), config);

    match cli.format {
        OutputFormat::Text => print!("{}", outcome.report.to_text()),
        OutputFormat::Json => println!("{}", outcome.report.to_json()),
    }
    Ok(outcome.report.success)
}

fn dump_tokens(input: &Path) -> Result<bool> {
    let source = read_source(input)?;
    let mut lexer = Lexer::new(&source);

    loop {
        let token = lexer.next_token();
        match token.kind {
            TokenKind::Eof => return Ok(true),
            TokenKind::Error => {
                eprintln!("{}:{}: error: {}", input.display(), token.span, token.text);
                return Ok(false);
            }
            _ => println!("{:<8} {:<28} {}", token.span.to_string(), token.kind.describe(), token.text),
        }
    }
}

fn dump_ast(input: &Path) -> Result<bool> {
    let source = read_source(input)?;
    match parse_source(&source) {
        Ok(unit) => {
            println!("{:#?}", unit);
            Ok(true)
        }
        Err(e) => {
            eprintln!("{}:{}", input.display(), e.render());
            Ok(false)
        }
    }
}
