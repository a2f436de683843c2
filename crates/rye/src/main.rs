use std::fs;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use rye::diagnostics;
use rye::{LexerOptions, TokenPayload, lex};

#[derive(Parser)]
#[command(name = "rye", version, about = "Rye scripting language tools")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Lex a source file and print one token per line.
    Tokens(LexArgs),
    /// Lex a source file and report success or the first error.
    Check(LexArgs),
}

#[derive(Args)]
struct LexArgs {
    /// Source file to read.
    file: String,
    /// Treat reserved words as plain identifiers.
    #[arg(long)]
    keyword_as_identifier: bool,
    /// Force every numeric literal to become a real.
    #[arg(long)]
    integer_as_real: bool,
    /// Process escape sequences in single-quoted strings.
    #[arg(long)]
    escapable_single_quotes: bool,
}

impl LexArgs {
    fn options(&self) -> LexerOptions {
        LexerOptions {
            keyword_as_identifier: self.keyword_as_identifier,
            integer_as_real: self.integer_as_real,
            escapable_single_quote_string: self.escapable_single_quotes,
        }
    }
}

fn payload_kind(payload: &TokenPayload) -> &'static str {
    match payload {
        TokenPayload::Keyword(_) => "keyword",
        TokenPayload::Punctuator(_) => "punctuator",
        TokenPayload::Identifier(_) => "identifier",
        TokenPayload::StringLiteral(_) => "string",
        TokenPayload::IntegerLiteral(_) => "integer",
        TokenPayload::RealLiteral(_) => "real",
    }
}

fn run_tokens(args: &LexArgs, print: bool) -> Result<bool> {
    let source = fs::read(&args.file).with_context(|| format!("cannot read `{}`", args.file))?;
    let mut stream = match lex(&source, &args.file, &args.options()) {
        Ok(stream) => stream,
        Err(err) => {
            diagnostics::report_parse_error(&args.file, &source, &err);
            return Ok(false);
        }
    };
    if print {
        while let Some(token) = stream.pop() {
            println!(
                "{}:{}:{}: {} {}",
                token.line,
                token.offset,
                token.length,
                payload_kind(&token.payload),
                token.payload
            );
        }
    } else {
        let mut count = 0usize;
        while stream.pop().is_some() {
            count += 1;
        }
        println!("{}: ok, {} tokens", args.file, count);
    }
    Ok(true)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let outcome = match &cli.command {
        Command::Tokens(args) => run_tokens(args, true),
        Command::Check(args) => run_tokens(args, false),
    };
    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            diagnostics::report_error(None, &format!("{:#}", err), None);
            ExitCode::FAILURE
        }
    }
}
