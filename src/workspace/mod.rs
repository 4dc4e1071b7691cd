//! Code workspace - the directory a code session writes into
//!
//! Holds two files, the solution and its tests. Writes replace the whole file;
//! the directory is created on first write.

pub mod test_runner;

use std::path::{Path, PathBuf};

use log::debug;

use crate::domain::CodeSlot;
use crate::error::Result;

pub use test_runner::{CommandTestRunner, DEFAULT_TEST_COMMAND, TestOutcome, TestRunner, TestRunnerConfig, pytest_command};

/// Default solution file name
pub const DEFAULT_SOLUTION_FILE: &str = "solution.py";

/// Default tests file name
pub const DEFAULT_TESTS_FILE: &str = "tests.py";

#[derive(Debug, Clone)]
pub struct CodeWorkspace {
    root: PathBuf,
    solution_file: String,
    tests_file: String,
}

impl CodeWorkspace {
    /// Workspace at `root` with the default file names
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_files(root, DEFAULT_SOLUTION_FILE, DEFAULT_TESTS_FILE)
    }

    pub fn with_files(root: impl Into<PathBuf>, solution_file: impl Into<String>, tests_file: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            solution_file: solution_file.into(),
            tests_file: tests_file.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File name a slot is written to
    pub fn file_name(&self, slot: CodeSlot) -> &str {
        match slot {
            CodeSlot::Solution => &self.solution_file,
            CodeSlot::Tests => &self.tests_file,
        }
    }

    pub fn path(&self, slot: CodeSlot) -> PathBuf {
        self.root.join(self.file_name(slot))
    }

    /// Replace the slot's file with `source`
    pub fn write(&self, slot: CodeSlot, source: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.root)?;
        let path = self.path(slot);
        let mut contents = source.to_string();
        if !contents.ends_with('\n') {
            contents.push('\n');
        }
        std::fs::write(&path, contents)?;
        debug!("Wrote {} bytes to {}", source.len(), path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_names() {
        let workspace = CodeWorkspace::new("/tmp/ws");
        assert_eq!(workspace.file_name(CodeSlot::Solution), "solution.py");
        assert_eq!(workspace.file_name(CodeSlot::Tests), "tests.py");
        assert_eq!(workspace.path(CodeSlot::Tests), PathBuf::from("/tmp/ws/tests.py"));
    }

    #[test]
    fn test_write_creates_dir_and_replaces() {
        let dir = TempDir::new().unwrap();
        let workspace = CodeWorkspace::new(dir.path().join("nested"));

        let path = workspace.write(CodeSlot::Solution, "x = 1").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "x = 1\n");

        workspace.write(CodeSlot::Solution, "x = 2\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "x = 2\n");
        assert!(!workspace.path(CodeSlot::Tests).exists());
    }

    #[test]
    fn test_custom_file_names() {
        let dir = TempDir::new().unwrap();
        let workspace = CodeWorkspace::with_files(dir.path(), "test_script.py", "tests.py");
        let path = workspace.write(CodeSlot::Solution, "pass").unwrap();
        assert!(path.ends_with("test_script.py"));
    }

    #[test]
    fn test_write_error_surfaces() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "").unwrap();
        // root is a regular file, so the directory cannot be created
        let workspace = CodeWorkspace::new(&blocker);
        assert!(workspace.write(CodeSlot::Tests, "pass").is_err());
    }
}
