// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Command-line interface for chat2html.
//!
//! This binary provides the `chat2html` command for converting an exported
//! chat archive page into one HTML page per conversation.

use chat2html::export::{self, ExportOptions};
use lexopt::prelude::*;
use snafu::prelude::*;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// How much diagnostic output to produce.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

struct Cli {
    input: Option<PathBuf>,
    export: ExportOptions,
    verbosity: Verbosity,
}

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to parse arguments: {source}"))]
    ParseArgs { source: lexopt::Error },

    #[snafu(display("missing input file\n\n{}", usage()))]
    MissingInput,

    #[snafu(transparent)]
    Export { source: export::Error },
}

fn usage() -> String {
    format!("Usage: {} [OPTIONS] <INPUT>", env!("CARGO_PKG_NAME"))
}

fn print_help() {
    println!(
        "\
{name} {version}
Convert an exported chat archive into browsable HTML pages

{usage}

Arguments:
  <INPUT>  Exported chat HTML file

Options:
  -o, --output <DIR>        Output directory (default: chats)
      --order <ORDER>       Message order: mapping (default) or thread
      --dedupe              Suffix repeated file names instead of overwriting
      --script <PATH>       Search script reference in each page (default: conversation.js)
      --start-marker <TEXT> Text preceding the embedded conversation array
      --end-marker <TEXT>   Text following the embedded conversation array

Other options:
  -q, --quiet               Only report warnings and errors
  -v, --verbose             Report debug detail
  -h, --help                Print help
  -V, --version             Print version

Open a generated page with ?q=<term> to highlight <term>; press n / N to
step through the matches.",
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        usage = usage(),
    );
}

fn parse_args() -> Result<Cli, lexopt::Error> {
    let mut input = None;
    let mut export = ExportOptions::default();
    let mut verbosity = Verbosity::Normal;

    let mut parser = lexopt::Parser::from_env();
    while let Some(arg) = parser.next()? {
        match arg {
            Short('o') | Long("output") => export.output_dir = parser.value()?.parse()?,
            Long("order") => export.render.order = parser.value()?.parse()?,
            Long("dedupe") => export.dedupe = true,
            Long("script") => export.render.script_src = parser.value()?.parse()?,
            Long("start-marker") => export.markers.start = parser.value()?.parse()?,
            Long("end-marker") => export.markers.end = parser.value()?.parse()?,
            Short('q') | Long("quiet") => verbosity = Verbosity::Quiet,
            Short('v') | Long("verbose") => verbosity = Verbosity::Verbose,
            Short('h') | Long("help") => {
                print_help();
                std::process::exit(0);
            }
            Short('V') | Long("version") => {
                println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            Value(val) if input.is_none() => input = Some(val.parse()?),
            _ => return Err(arg.unexpected()),
        }
    }

    if export.markers.start.is_empty() || export.markers.end.is_empty() {
        return Err("markers must not be empty".into());
    }

    Ok(Cli {
        input,
        export,
        verbosity,
    })
}

/// Installs the stderr log subscriber. `RUST_LOG` takes precedence.
fn init_tracing(verbosity: Verbosity) {
    let default = match verbosity {
        Verbosity::Quiet => "warn",
        Verbosity::Normal => "info",
        Verbosity::Verbose => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // Fails only if a subscriber is already installed.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(verbosity == Verbosity::Verbose)
        .without_time()
        .compact()
        .try_init();
}

fn run() -> Result<(), Error> {
    let cli = parse_args().context(ParseArgsSnafu)?;
    init_tracing(cli.verbosity);

    let input = cli.input.context(MissingInputSnafu)?;
    export::run(&input, &cli.export)?;
    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
