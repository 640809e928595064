use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::args::{Cli, Command};
use cli::commands::dispatch;

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let cli = Cli::parse();

    let verbose = matches!(&cli.cmd, Command::Verify(args) if args.verbose);
    init_tracing(verbose);

    let code = dispatch(cli).await;
    std::process::exit(code);
}

/// Logs go to stderr; `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "ovsx_sign=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
