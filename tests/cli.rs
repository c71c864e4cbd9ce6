use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_default_output() {
    let temp_dir = tempdir().unwrap();
    let project = temp_dir.path().join("demo");
    fs::create_dir_all(&project).unwrap();
    fs::write(project.join("test.rs"), "fn main() {}").unwrap();

    let output_file = temp_dir.path().join("output.md");

    Command::cargo_bin("repo2md")
        .unwrap()
        .arg("-o")
        .arg(&output_file)
        .arg(&project)
        .assert()
        .success();

    let output = fs::read_to_string(&output_file).unwrap();
    assert!(output.starts_with("# Project Overview: demo\n"));
    assert!(output.contains("### `test.rs`\n```rs\nfn main() {}\n```\n"));
}

#[test]
fn test_default_file_name_in_working_directory() {
    let temp_dir = tempdir().unwrap();
    let project = temp_dir.path().join("widget");
    fs::create_dir_all(&project).unwrap();
    fs::write(project.join("a.txt"), "alpha").unwrap();

    Command::cargo_bin("repo2md")
        .unwrap()
        .current_dir(temp_dir.path())
        .arg(&project)
        .assert()
        .success();

    let written: Vec<String> = fs::read_dir(temp_dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".md"))
        .collect();
    assert_eq!(written.len(), 1);
    assert!(written[0].starts_with("widget_"));
}

#[test]
fn test_name_override() {
    let temp_dir = tempdir().unwrap();
    fs::write(temp_dir.path().join("a.txt"), "alpha").unwrap();
    let output_file = temp_dir.path().join("out").with_extension("markdown");

    Command::cargo_bin("repo2md")
        .unwrap()
        .args(["-n", "Renamed", "-o"])
        .arg(&output_file)
        .arg(temp_dir.path())
        .assert()
        .success();

    let output = fs::read_to_string(&output_file).unwrap();
    assert!(output.starts_with("# Project Overview: Renamed\n"));
    assert!(output.contains("Renamed/\n└── a.txt\n"));
}

#[test]
fn test_list_prints_tree_without_writing() {
    let temp_dir = tempdir().unwrap();
    let project = temp_dir.path().join("proj");
    fs::create_dir_all(project.join("src")).unwrap();
    fs::write(project.join("src/lib.rs"), "pub fn a() {}").unwrap();
    fs::write(project.join("notes.md"), "# notes").unwrap();
    fs::write(project.join("blob.data"), [b'a', 0, b'b']).unwrap();

    Command::cargo_bin("repo2md")
        .unwrap()
        .current_dir(temp_dir.path())
        .args(["--list", "-x", "md"])
        .arg(&project)
        .assert()
        .success()
        .stdout(predicate::str::contains("lib.rs (13 B)"))
        .stdout(predicate::str::contains("notes.md (7 B)  (filtered)"))
        .stdout(predicate::str::contains("blob.data (3 B)  (binary)"))
        .stdout(predicate::str::contains("lib.rs (13 B)  (binary)").not())
        .stdout(predicate::str::contains("Selected: 2 files, 16 B"));

    let has_markdown = fs::read_dir(temp_dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .any(|e| e.path().extension().is_some_and(|ext| ext == "md"));
    assert!(!has_markdown);
}

#[test]
fn test_unsupported_archive() {
    let temp_dir = tempdir().unwrap();
    let archive = temp_dir.path().join("bundle.7z");
    fs::write(&archive, b"7z").unwrap();

    Command::cargo_bin("repo2md")
        .unwrap()
        .arg(&archive)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported archive format"));
}

#[test]
fn test_unknown_format_override() {
    let temp_dir = tempdir().unwrap();
    let archive = temp_dir.path().join("bundle.bin");
    fs::write(&archive, b"data").unwrap();

    Command::cargo_bin("repo2md")
        .unwrap()
        .args(["--format", "rar"])
        .arg(&archive)
        .assert()
        .failure()
        .stderr(predicate::str::contains("rar"));
}

#[test]
fn test_invalid_argument() {
    Command::cargo_bin("repo2md")
        .unwrap()
        .arg("--invalid-arg")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_help() {
    Command::cargo_bin("repo2md")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--exclude-ext"));
}
