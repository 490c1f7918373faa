use std::io::IsTerminal;

use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use miette::{IntoDiagnostic, Result};
use tracing_log::AsTrace;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: stage::commands::Commands,

    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,

    /// Log as JSON lines instead of text
    #[arg(long, global = true)]
    log_json: bool,
}

fn main() -> Result<()> {
    better_panic::install();

    let cli = Cli::parse();

    let text = (!cli.log_json).then(|| {
        tracing_subscriber::fmt::layer()
            .with_ansi(std::io::stderr().is_terminal())
            .with_writer(std::io::stderr)
            .with_file(true)
            .with_line_number(true)
            .with_target(false)
            .without_time()
            .compact()
    });
    let json = cli.log_json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
    });

    tracing_subscriber::registry()
        .with(text)
        .with(json)
        .with(
            EnvFilter::builder()
                .with_default_directive(cli.verbose.log_level_filter().as_trace().into())
                .from_env_lossy(),
        )
        .try_init()
        .into_diagnostic()?;

    cli.command.handle()
}
