//! CLI argument and input handling tests, no network I/O.
//!
//! Every failure here happens before a generator is contacted: argument
//! parsing, model resolution, reading the images, or the credential check.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;

fn cmd(home: &Path) -> Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("styles");
    cmd.env("HOME", home)
        .env_remove("STYLES_CONFIG")
        .env_remove("STYLES_REPLAY")
        .env_remove("STYLES_REC")
        .env_remove("OPENROUTER_API_KEY")
        .env_remove("GEMINI_API_KEY")
        .current_dir(home);
    cmd
}

/// Fresh working directory holding a small JPEG and PNG.
fn workspace(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("styles_cli_{name}"));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    image::DynamicImage::new_rgb8(8, 8).save(dir.join("person.jpg")).unwrap();
    image::DynamicImage::new_rgb8(8, 8).save(dir.join("shirt.png")).unwrap();
    dir
}

#[test]
fn missing_clothing_flag_exits_with_usage_error() {
    let dir = workspace("missing_flag");
    cmd(&dir)
        .args(["--person", "person.jpg"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--clothing"));
}

#[test]
fn invalid_model_exits_with_error() {
    let dir = workspace("invalid_model");
    cmd(&dir)
        .args(["--person", "person.jpg", "--clothing", "shirt.png", "--model", "dall-e-3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown provider for model"));
}

#[test]
fn unreadable_image_is_upload_failure() {
    let dir = workspace("unreadable");
    cmd(&dir)
        .args(["--person", "nowhere.jpg", "--clothing", "shirt.png"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("upload-failed"));
}

#[test]
fn quality_out_of_range_is_rejected() {
    let dir = workspace("quality");
    cmd(&dir)
        .args(["--person", "person.jpg", "--clothing", "shirt.png", "--quality", "101"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("101"));
}

#[test]
fn missing_api_key_fails_before_any_request() {
    let dir = workspace("missing_key");
    cmd(&dir)
        .args(["--person", "person.jpg", "--clothing", "shirt.png"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Configuration Error"))
        .stderr(predicate::str::contains("OPENROUTER_API_KEY"))
        .stderr(predicate::str::contains("Generating").not());
}

#[test]
fn missing_remote_endpoint_is_config_error() {
    let dir = workspace("remote_endpoint");
    cmd(&dir)
        .args(["--person", "person.jpg", "--clothing", "shirt.png", "--model", "remote"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No remote endpoint configured"));
}
