//! Shared fixtures for integration tests.
//!
//! Builds a storage root in a temp directory holding real bare git
//! repositories, populated with the `git` CLI.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

/// A storage root with bare repositories under it.
pub struct TestStorage {
    dir: TempDir,
}

impl TestStorage {
    /// Create an empty storage root.
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    /// Path to the storage root.
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Create a bare repository named `id`.
    pub fn init_repo(&self, id: &str) -> TestRepo {
        let git_dir = self.dir.path().join(id);
        run_git(self.dir.path(), &["init", "--bare", "--quiet", id]);
        TestRepo { git_dir }
    }
}

/// A bare repository inside a [`TestStorage`].
pub struct TestRepo {
    pub git_dir: PathBuf,
}

impl TestRepo {
    /// Write the empty tree and return its OID.
    pub fn empty_tree(&self) -> String {
        let file = self.git_dir.join("tree-input");
        std::fs::write(&file, "").unwrap();
        let oid = self.git(&["hash-object", "-t", "tree", "-w", file.to_str().unwrap()]);
        std::fs::remove_file(&file).unwrap();
        oid
    }

    /// Create a root commit with the given message and return its OID.
    pub fn commit(&self, message: &str) -> String {
        let tree = self.empty_tree();
        self.git(&["commit-tree", &tree, "-m", message])
    }

    /// Point `name` at a fresh commit and return the commit OID.
    pub fn create_ref(&self, name: &str) -> String {
        let oid = self.commit(name);
        self.git(&["update-ref", name, &oid]);
        oid
    }

    /// Write a loose ref whose name is arbitrary bytes.
    #[cfg(unix)]
    pub fn create_raw_ref(&self, name: &[u8], oid: &str) {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let path = self.git_dir.join(OsStr::from_bytes(name));
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, format!("{oid}\n")).unwrap();
    }

    /// Raw names of all refs, read through libgit2, sorted.
    pub fn raw_ref_names(&self) -> Vec<Vec<u8>> {
        let repo = git2::Repository::open(&self.git_dir).unwrap();
        let mut names: Vec<Vec<u8>> = repo
            .references()
            .unwrap()
            .map(|r| r.unwrap().name_bytes().to_vec())
            .collect();
        names.sort();
        names
    }

    /// Create a symbolic ref.
    pub fn create_symref(&self, name: &str, target: &str) {
        self.git(&["symbolic-ref", name, target]);
    }

    /// Move all loose refs into `packed-refs`.
    pub fn pack_refs(&self) {
        self.git(&["pack-refs", "--all"]);
    }

    /// All ref names with their targets, sorted by name.
    pub fn refs(&self) -> Vec<(String, String)> {
        let listing = self.git(&["for-each-ref", "--format=%(refname) %(objectname)"]);
        let mut refs: Vec<(String, String)> = listing
            .lines()
            .filter_map(|line| line.split_once(' '))
            .map(|(name, oid)| (name.to_string(), oid.to_string()))
            .collect();
        refs.sort();
        refs
    }

    /// Ref names only, sorted.
    pub fn ref_names(&self) -> Vec<String> {
        self.refs().into_iter().map(|(name, _)| name).collect()
    }

    /// Run a git command against this repository and return trimmed stdout.
    pub fn git(&self, args: &[&str]) -> String {
        let mut full = vec!["--git-dir", self.git_dir.to_str().unwrap()];
        full.extend_from_slice(args);
        run_git(&self.git_dir, &full)
    }
}

/// Run a git command in the given directory and return trimmed stdout.
pub fn run_git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_AUTHOR_NAME", "nsprune")
        .env("GIT_AUTHOR_EMAIL", "nsprune@example.com")
        .env("GIT_COMMITTER_NAME", "nsprune")
        .env("GIT_COMMITTER_EMAIL", "nsprune@example.com")
        .output()
        .expect("git command failed");

    if !output.status.success() {
        panic!(
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }

    String::from_utf8(output.stdout).unwrap().trim().to_string()
}
