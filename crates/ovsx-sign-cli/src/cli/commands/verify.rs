//! `ovsx-sign verify` - Verify an extension package against its signature archive.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use ovsx_sign::{verify, VerificationError, VerifyOptions};

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Extension package (.vsix)
    pub extension_package: PathBuf,

    /// Signature archive (.sigzip)
    pub signature_archive: PathBuf,

    /// Public key file (SPKI PEM); resolved from the registry when omitted
    #[arg(long, short = 'p')]
    pub public_key: Option<PathBuf>,

    /// Also verify the signature manifest in the signature archive
    #[arg(long, short = 'm')]
    pub verify_signature_manifest: bool,

    /// Log each verification step to stderr
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

pub async fn cmd_verify(args: VerifyArgs) -> i32 {
    match run_verify(&args).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("error: {e:#}");
            // Extract exit code from VerificationError if available
            if let Some(verify_err) = e.downcast_ref::<VerificationError>() {
                verify_err.code.exit_code()
            } else {
                1
            }
        }
    }
}

async fn run_verify(args: &VerifyArgs) -> Result<()> {
    let mut options = VerifyOptions::new();
    if let Some(public_key) = &args.public_key {
        options = options.with_public_key(public_key);
    }
    if args.verify_signature_manifest {
        options = options.verify_signature_manifest();
    }

    verify(&args.extension_package, &args.signature_archive, &options).await?;

    if args.verify_signature_manifest {
        println!("Signature manifest is valid");
    }
    println!("Signature is valid");

    Ok(())
}
