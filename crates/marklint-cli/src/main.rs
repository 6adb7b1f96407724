use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use marklint_core::{
    HtmlOptions, ParseOptions, TokenStream, emit_html_with_options, tokenize_path,
    tokenize_with_options, verify_round_trip,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Tokenize GitHub-Flavored Markdown into a position-exact token stream.
#[derive(Debug, Parser)]
#[command(name = "marklint", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the token stream.
    Tokens {
        #[command(flatten)]
        input: Input,
        #[arg(long, value_enum, default_value_t = Format::Compact)]
        format: Format,
    },
    /// Render the document as HTML.
    Html {
        #[command(flatten)]
        input: Input,
        /// Escape raw HTML tags GFM disallows.
        #[arg(long)]
        tag_filter: bool,
    },
    /// Check that the token stream reproduces the input byte for byte.
    Verify {
        #[command(flatten)]
        input: Input,
    },
}

#[derive(Debug, Args)]
struct Input {
    /// Markdown file to read; stdin when omitted.
    path: Option<PathBuf>,
    /// Plain CommonMark: no strikethrough, task items or literal autolinks.
    #[arg(long)]
    commonmark: bool,
    /// Treat a leading `---` block as front matter.
    #[arg(long)]
    front_matter: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    /// One `[tag(line,column):detail]` token per line.
    Compact,
    Json,
}

impl Input {
    fn options(&self) -> ParseOptions {
        let base = if self.commonmark {
            ParseOptions::commonmark()
        } else {
            ParseOptions::default()
        };
        ParseOptions {
            front_matter: self.front_matter,
            ..base
        }
    }

    fn tokenize(&self) -> Result<TokenStream> {
        let options = self.options();
        let stream = match &self.path {
            Some(path) => tokenize_path(path, &options)
                .with_context(|| format!("failed to tokenize {}", path.display()))?,
            None => {
                let mut source = String::new();
                io::stdin()
                    .read_to_string(&mut source)
                    .context("failed to read stdin")?;
                tokenize_with_options(&source, &options).context("failed to tokenize stdin")?
            }
        };
        debug!(tokens = stream.len(), "tokenized input");
        Ok(stream)
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Tokens { input, format } => {
            let stream = input.tokenize()?;
            match format {
                Format::Compact => {
                    for token in stream.tokens() {
                        println!("{token}");
                    }
                }
                Format::Json => {
                    let json = serde_json::to_string_pretty(stream.tokens())
                        .context("failed to serialize tokens")?;
                    println!("{json}");
                }
            }
        }
        Command::Html { input, tag_filter } => {
            let stream = input.tokenize()?;
            print!("{}", emit_html_with_options(&stream, &HtmlOptions { tag_filter }));
        }
        Command::Verify { input } => {
            let stream = input.tokenize()?;
            verify_round_trip(&stream).context("round trip failed")?;
            println!("ok: {} tokens cover {} bytes", stream.len(), stream.source().len());
        }
    }
    Ok(())
}
