//! `ovsx-sign sign` - Sign an extension package.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use ovsx_sign::{sign, SignOptions};

#[derive(Args, Debug)]
pub struct SignArgs {
    /// Extension package (.vsix)
    pub extension_package: PathBuf,

    /// Private key file (PKCS#8 PEM)
    pub private_key: PathBuf,

    /// Output signature archive (default: ./extension.sigzip)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

pub async fn cmd_sign(args: SignArgs) -> i32 {
    match run_sign(args).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("error: {e:#}");
            1
        }
    }
}

async fn run_sign(args: SignArgs) -> Result<()> {
    let mut options = SignOptions::default();
    if let Some(output) = args.output {
        options = options.with_output(output);
    }

    let written = sign(&args.extension_package, &args.private_key, &options)
        .await
        .with_context(|| format!("failed to sign {}", args.extension_package.display()))?;

    println!("Signature archive written to {}", written.display());
    Ok(())
}
