//! `ovsx-sign key-pair` - Generate an ed25519 key pair.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use ovsx_sign::{generate_keypair, KeyPairOptions};

#[derive(Args, Debug)]
pub struct KeyPairArgs {
    /// Output directory for public.pem and private.pem
    #[arg(long, short = 'o', default_value = ".")]
    pub output_dir: PathBuf,

    /// Overwrite an existing key pair
    #[arg(long, short = 'f')]
    pub overwrite: bool,
}

pub async fn cmd_key_pair(args: KeyPairArgs) -> i32 {
    match run_key_pair(args).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("error: {e:#}");
            1
        }
    }
}

async fn run_key_pair(args: KeyPairArgs) -> Result<()> {
    let mut options = KeyPairOptions::default().with_output_dir(&args.output_dir);
    if args.overwrite {
        options = options.overwrite();
    }

    let paths = generate_keypair(&options)
        .await
        .with_context(|| format!("failed to generate key pair in {}", args.output_dir.display()))?;

    println!("Generated ed25519 key pair");
    println!();
    println!("  public key:  {}", paths.public_key_path.display());
    println!("  private key: {}", paths.private_key_path.display());

    Ok(())
}
