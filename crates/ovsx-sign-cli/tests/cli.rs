#![allow(deprecated)]
//! Integration tests for the `ovsx-sign` binary.

use assert_cmd::Command;
use ovsx_sign::archive::write_archive;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn ovsx_sign() -> Command {
    let mut cmd = Command::cargo_bin("ovsx-sign").unwrap();
    // Never reach a real registry from tests.
    cmd.env("OVSX_REGISTRY_URL", "http://127.0.0.1:9")
        .env("OVSX_REGISTRY_MAX_RETRIES", "0")
        .env_remove("RUST_LOG");
    cmd
}

fn write_vsix(dir: &Path, name: &str, main_js: &str) -> PathBuf {
    let bytes = write_archive(&[
        ("extension.vsixmanifest", b"<PackageManifest/>".as_slice()),
        (
            "extension/package.json",
            br#"{"publisher":"acme","name":"widgets","version":"0.1.0"}"#.as_slice(),
        ),
        ("extension/main.js", main_js.as_bytes()),
    ])
    .unwrap();
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

fn key_pair(dir: &Path) {
    ovsx_sign()
        .args(["key-pair", "--output-dir"])
        .arg(dir)
        .assert()
        .success();
}

#[test]
fn test_key_pair_creates_files() {
    let tmp = TempDir::new().unwrap();

    ovsx_sign()
        .args(["key-pair", "-o"])
        .arg(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("public.pem"))
        .stdout(predicate::str::contains("private.pem"));

    assert!(tmp.path().join("public.pem").exists());
    assert!(tmp.path().join("private.pem").exists());

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let metadata = std::fs::metadata(tmp.path().join("private.pem")).unwrap();
        assert_eq!(metadata.permissions().mode() & 0o777, 0o600);
    }
}

#[test]
fn test_key_pair_refuses_overwrite() {
    let tmp = TempDir::new().unwrap();
    key_pair(tmp.path());

    let public_before = std::fs::read(tmp.path().join("public.pem")).unwrap();
    let private_before = std::fs::read(tmp.path().join("private.pem")).unwrap();

    ovsx_sign()
        .args(["key-pair", "--output-dir"])
        .arg(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    assert_eq!(std::fs::read(tmp.path().join("public.pem")).unwrap(), public_before);
    assert_eq!(std::fs::read(tmp.path().join("private.pem")).unwrap(), private_before);

    ovsx_sign()
        .args(["key-pair", "--overwrite", "--output-dir"])
        .arg(tmp.path())
        .assert()
        .success();

    assert_ne!(std::fs::read(tmp.path().join("public.pem")).unwrap(), public_before);
}

#[test]
fn test_sign_and_verify_roundtrip() {
    let tmp = TempDir::new().unwrap();
    key_pair(tmp.path());
    let vsix = write_vsix(tmp.path(), "widgets.vsix", "exports.activate = () => {};");
    let sigzip = tmp.path().join("out").join("widgets.sigzip");

    ovsx_sign()
        .arg("sign")
        .arg(&vsix)
        .arg(tmp.path().join("private.pem"))
        .arg("--output")
        .arg(&sigzip)
        .assert()
        .success()
        .stdout(predicate::str::contains("widgets.sigzip"));

    assert!(sigzip.exists());

    ovsx_sign()
        .arg("verify")
        .arg(&vsix)
        .arg(&sigzip)
        .arg("--public-key")
        .arg(tmp.path().join("public.pem"))
        .arg("--verify-signature-manifest")
        .assert()
        .success()
        .stdout(predicate::str::contains("Signature is valid"));
}

#[test]
fn test_sign_default_output_in_working_dir() {
    let tmp = TempDir::new().unwrap();
    key_pair(tmp.path());
    let vsix = write_vsix(tmp.path(), "widgets.vsix", "1");

    ovsx_sign()
        .current_dir(tmp.path())
        .args(["sign", "widgets.vsix", "private.pem"])
        .assert()
        .success();

    assert!(vsix.exists());
    assert!(tmp.path().join("extension.sigzip").exists());
}

#[test]
fn test_verify_wrong_package_fails() {
    let tmp = TempDir::new().unwrap();
    key_pair(tmp.path());
    let vsix = write_vsix(tmp.path(), "widgets.vsix", "original");
    let other = write_vsix(tmp.path(), "other.vsix", "something else entirely");
    let sigzip = tmp.path().join("widgets.sigzip");

    ovsx_sign()
        .arg("sign")
        .arg(&vsix)
        .arg(tmp.path().join("private.pem"))
        .arg("-o")
        .arg(&sigzip)
        .assert()
        .success();

    ovsx_sign()
        .arg("verify")
        .arg(&other)
        .arg(&sigzip)
        .arg("-p")
        .arg(tmp.path().join("public.pem"))
        .assert()
        .code(4)
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn test_verify_missing_signature_exit_code() {
    let tmp = TempDir::new().unwrap();
    key_pair(tmp.path());
    let vsix = write_vsix(tmp.path(), "widgets.vsix", "x");

    let sigzip = tmp.path().join("empty.sigzip");
    std::fs::write(
        &sigzip,
        write_archive(&[(".signature.p7s", b"".as_slice())]).unwrap(),
    )
    .unwrap();

    ovsx_sign()
        .arg("verify")
        .arg(&vsix)
        .arg(&sigzip)
        .arg("-p")
        .arg(tmp.path().join("public.pem"))
        .assert()
        .code(3)
        .stderr(predicate::str::contains(".signature.sig"));
}

#[test]
fn test_verify_missing_package() {
    let tmp = TempDir::new().unwrap();

    ovsx_sign()
        .arg("verify")
        .arg(tmp.path().join("nope.vsix"))
        .arg(tmp.path().join("nope.sigzip"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not a valid zip file"));
}

#[test]
fn test_sign_missing_private_key() {
    let tmp = TempDir::new().unwrap();
    let vsix = write_vsix(tmp.path(), "widgets.vsix", "x");

    ovsx_sign()
        .arg("sign")
        .arg(&vsix)
        .arg(tmp.path().join("missing.pem"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("key file not found"));
}
