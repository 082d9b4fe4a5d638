//! End-to-end tests that drive the `mdsite` binary against a temporary
//! project.
//!
//! Run with: cargo test --test cli_build

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn mdsite(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_mdsite"))
        .arg("--root")
        .arg(root)
        .args(args)
        .env_remove("MDSITE_LOG")
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let content = tmp.path().join("content");
    fs::create_dir_all(content.join("blog")).unwrap();
    fs::write(content.join("index.md"), "# Home\n\nWelcome.").unwrap();
    fs::write(content.join("about.md"), "# About\n\nUs.").unwrap();
    fs::write(content.join("blog/index.md"), "# Blog\n\nPosts.").unwrap();
    fs::create_dir_all(tmp.path().join("static")).unwrap();
    fs::write(tmp.path().join("static/site.css"), "body { margin: 0 }").unwrap();
    fs::write(
        tmp.path().join("mdsite.toml"),
        "[site]\ntitle = \"Test Site\"\n\n[build]\nthreads = 2\n",
    )
    .unwrap();
    tmp
}

#[test]
fn first_build_creates_every_page() {
    let tmp = project();
    let out = mdsite(tmp.path(), &["build"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let text = stdout(&out);
    assert!(text.starts_with("Start generating the static site..."));
    assert!(text.contains("\u{2714} Load manifest"));
    assert!(text.contains("\u{2714} Copy 1 static file"));
    assert!(text.contains("\u{2192} Create HTML files (use 2 threads)"));
    assert!(text.contains("\u{2714} Create 3 HTML files, 0 unmodified, 0 updated"));
    assert!(text.contains("\u{2714} Update manifest"));
    assert!(text.contains("Static site output completed in "));

    let output = tmp.path().join("output");
    let home = fs::read_to_string(output.join("index.html")).unwrap();
    assert!(home.contains("<title>Home | Test Site</title>"));
    assert!(output.join("about/index.html").is_file());
    assert!(output.join("blog/index.html").is_file());
    assert!(output.join("static/site.css").is_file());
    assert!(output.join(".mdsite-manifest.json").is_file());
}

#[test]
fn second_build_skips_everything() {
    let tmp = project();
    assert!(mdsite(tmp.path(), &["build"]).status.success());

    let out = mdsite(tmp.path(), &["build"]);
    assert!(out.status.success());
    let text = stdout(&out);
    assert!(text.contains("\u{2714} Copy 0 static files, 1 unmodified"));
    assert!(text.contains("\u{2714} Create 0 HTML files, 3 unmodified, 0 updated"));
    assert!(!text.contains("Update manifest"));
}

#[test]
fn force_flag_updates_every_page() {
    let tmp = project();
    assert!(mdsite(tmp.path(), &["build"]).status.success());

    let out = mdsite(tmp.path(), &["build", "--force", "--threads", "1"]);
    assert!(out.status.success());
    let text = stdout(&out);
    assert!(text.contains("\u{2714} Force update because --force"));
    assert!(text.contains("\u{2192} Create HTML files (use 1 thread)"));
    assert!(text.contains("\u{2714} Create 0 HTML files, 0 unmodified, 3 updated"));
}

#[test]
fn changed_static_file_forces_rebuild() {
    let tmp = project();
    assert!(mdsite(tmp.path(), &["build"]).status.success());
    fs::write(tmp.path().join("static/site.css"), "body { margin: 1em }").unwrap();

    let out = mdsite(tmp.path(), &["build"]);
    assert!(out.status.success());
    let text = stdout(&out);
    assert!(text.contains("\u{2714} Force update because static file(s) updated"));
    assert!(text.contains("\u{2714} Create 0 HTML files, 0 unmodified, 3 updated"));
}

#[test]
fn output_override_is_respected() {
    let tmp = project();
    let elsewhere = tmp.path().join("public");
    let out = mdsite(
        tmp.path(),
        &["build", "--output", elsewhere.to_str().unwrap()],
    );
    assert!(out.status.success());
    assert!(elsewhere.join("index.html").is_file());
    assert!(!tmp.path().join("output").exists());
}

#[test]
fn missing_content_directory_fails() {
    let tmp = TempDir::new().unwrap();
    let out = mdsite(tmp.path(), &["build"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("content directory not found"));
}

#[test]
fn invalid_config_fails_before_building() {
    let tmp = project();
    fs::write(tmp.path().join("mdsite.toml"), "[build]\nthreads = 0\n").unwrap();
    let out = mdsite(tmp.path(), &["build"]);
    assert!(!out.status.success());
    assert!(!tmp.path().join("output").exists());
}

#[test]
fn gen_config_prints_stock_toml() {
    let tmp = TempDir::new().unwrap();
    let out = mdsite(tmp.path(), &["gen-config"]);
    assert!(out.status.success());
    let text = stdout(&out);
    assert!(text.contains("[site]"));
    assert!(text.contains("content_dir = \"content\""));
}
