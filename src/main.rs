use anyhow::{Context, Result};
use clap::Parser;
use smsh::reader::LineReader;
use smsh::{logging, signals, Config, Shell};
use std::io;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "smsh-rs", version, about = "Small shell: pipelines, redirection and wildcards")]
struct Cli {
    /// Execute the given command line(s) and exit
    #[arg(short = 'c', value_name = "COMMAND")]
    command: Option<String>,
    /// Configuration file (default: ~/.config/smsh-rs/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    /// Append log records to this file instead of stderr
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.log_file.as_deref())?;
    let config = Config::load(cli.config.as_deref())?;
    if config.shell.ignore_interrupts {
        signals::ignore_interrupts().context("ignoring interrupt signals")?;
    }
    let mut shell = Shell::new(config);
    match cli.command {
        Some(script) => shell.run(&mut LineReader::new(io::Cursor::new(script), io::sink()), false),
        None => {
            let interactive = atty::is(atty::Stream::Stdin);
            let stdin = io::stdin();
            shell.run(&mut LineReader::new(stdin.lock(), io::stdout()), interactive)
        }
    }
}
