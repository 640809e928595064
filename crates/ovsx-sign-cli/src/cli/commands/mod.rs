//! Subcommand handlers.
//!
//! Each handler returns the process exit code; errors are printed to stderr
//! as `error: <chain>`.

pub mod key_pair;
pub mod sign;
pub mod verify;

use super::args::{Cli, Command};

pub async fn dispatch(cli: Cli) -> i32 {
    match cli.cmd {
        Command::Verify(args) => verify::cmd_verify(args).await,
        Command::Sign(args) => sign::cmd_sign(args).await,
        Command::KeyPair(args) => key_pair::cmd_key_pair(args).await,
    }
}
