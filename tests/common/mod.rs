pub mod fixtures;

use assert_cmd::Command;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use fixtures::{LOSS_CSV, MINIMAL_CONFIG, MINIMAL_POST, RICH_POST, TRANSLATED_POST};

pub struct TestEnvironment {
    pub temp_dir: TempDir,
    pub root: PathBuf,
}

impl TestEnvironment {
    pub fn minimal() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path().to_path_buf();

        let env = Self { temp_dir, root };
        env.setup_minimal();
        env
    }

    /// Minimal site plus an English translation and a post using math,
    /// citations, charts, and diagrams.
    pub fn rich() -> Self {
        let env = Self::minimal();
        env.write_file("posts/test-post.en.md", TRANSLATED_POST);
        env.write_file("posts/rich.md", RICH_POST);
        env.write_file("posts/data/loss.csv", LOSS_CSV);
        env
    }

    fn setup_minimal(&self) {
        self.write_file("config.yaml", MINIMAL_CONFIG);
        self.write_file("posts/test-post.md", MINIMAL_POST);
    }

    pub fn create_post(&self, slug: &str, title: &str, tags: &[&str]) {
        let content = format!(
            r#"---
title: "{}"
date: 2024-01-10
tags: [{}]
---

Test content for {}.
"#,
            title,
            tags.join(", "),
            slug
        );
        self.write_file(&format!("posts/{}.md", slug), &content);
    }

    pub fn write_file(&self, path: &str, content: &str) {
        let full_path = self.root.join(path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        fs::write(full_path, content).expect("Failed to write file");
    }

    pub fn read_file(&self, path: &str) -> String {
        fs::read_to_string(self.root.join(path)).expect("Failed to read file")
    }

    fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("folio").expect("Failed to find folio binary");
        cmd.current_dir(&self.root);
        cmd
    }

    pub fn run(&self, args: &[&str]) -> std::process::Output {
        self.command()
            .args(args)
            .output()
            .expect("Failed to execute folio")
    }

    pub fn run_with_stdin(&self, args: &[&str], stdin: &str) -> std::process::Output {
        self.command()
            .args(args)
            .write_stdin(stdin)
            .output()
            .expect("Failed to execute folio")
    }

    pub fn run_build(&self) -> std::process::Output {
        self.run(&["build"])
    }

    pub fn run_build_incremental(&self) -> std::process::Output {
        self.run(&["build", "--incremental"])
    }

    pub fn output_exists(&self, path: &str) -> bool {
        self.root.join("dist").join(path).exists()
    }

    pub fn read_output(&self, path: &str) -> String {
        fs::read_to_string(self.root.join("dist").join(path)).expect("Failed to read output file")
    }

    pub fn cache_exists(&self) -> bool {
        self.root.join(".build-cache").exists()
    }

    pub fn modify_post(&self, slug: &str) {
        let path = format!("posts/{}.md", slug);
        let mut content = self.read_file(&path);
        content.push_str("\n\nModified content.");
        self.write_file(&path, &content);
    }

    pub fn file_exists(&self, path: &str) -> bool {
        self.root.join(path).exists()
    }
}

pub fn assert_success(output: &std::process::Output) {
    if !output.status.success() {
        eprintln!("STDOUT: {}", String::from_utf8_lossy(&output.stdout));
        eprintln!("STDERR: {}", String::from_utf8_lossy(&output.stderr));
        panic!("Command failed with status: {:?}", output.status);
    }
}

pub fn assert_failure(output: &std::process::Output) {
    assert!(
        !output.status.success(),
        "Expected command to fail but it succeeded"
    );
}

pub fn stdout_contains(output: &std::process::Output, text: &str) -> bool {
    String::from_utf8_lossy(&output.stdout).contains(text)
}

pub fn stderr_contains(output: &std::process::Output, text: &str) -> bool {
    String::from_utf8_lossy(&output.stderr).contains(text)
}
