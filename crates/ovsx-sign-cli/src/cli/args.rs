use clap::{Parser, Subcommand};

use super::commands::{key_pair::KeyPairArgs, sign::SignArgs, verify::VerifyArgs};

#[derive(Parser, Debug)]
#[command(
    name = "ovsx-sign",
    version,
    about = "Sign and verify VS Code extension packages"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Verify an extension package
    Verify(VerifyArgs),

    /// Sign an extension package
    Sign(SignArgs),

    /// Generate an ed25519 key pair
    KeyPair(KeyPairArgs),
}
