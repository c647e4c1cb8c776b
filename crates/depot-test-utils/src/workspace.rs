//! [`TestWorkspace`] builder and archive fixtures for sync test scenarios.

use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::TempDir;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Build a small zip archive in memory, entries in the given order.
///
/// # Panics
/// Panics if the archive cannot be written; fixtures are test-only.
pub fn zip_fixture(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, contents) in entries {
        writer
            .start_file(*name, options)
            .expect("zip_fixture: start_file failed");
        writer
            .write_all(contents)
            .expect("zip_fixture: write failed");
    }
    writer
        .finish()
        .expect("zip_fixture: finish failed")
        .into_inner()
}

/// A temporary working directory with helper methods for test setup and
/// assertion.
///
/// # Example
///
/// ```rust,no_run
/// use depot_test_utils::TestWorkspace;
///
/// let ws = TestWorkspace::new();
/// ws.write_manifest("repository: \"acme/data\"\nversion: \"v1\"\n");
/// ws.write_file("src/models/model.bin", b"weights");
/// ws.assert_file_exists("depot.yml");
/// ```
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorkspace {
    /// Create an empty temporary working directory.
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("TestWorkspace: tempdir failed"),
        }
    }

    /// Return the root path of the working directory.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write `depot.yml` with the given content.
    pub fn write_manifest(&self, content: &str) {
        self.write_file("depot.yml", content.as_bytes());
    }

    /// Write a manifest with one asset per `(name, source, destination)`.
    pub fn write_manifest_with_assets(
        &self,
        repository: &str,
        version: &str,
        assets: &[(&str, &str, &str)],
    ) {
        let mut content = format!("repository: \"{repository}\"\nversion: \"{version}\"\n");
        if !assets.is_empty() {
            content.push_str("\nassets:\n");
            for (name, source, destination) in assets {
                content.push_str(&format!(
                    "  {name}:\n    source: \"{source}\"\n    destination: \"{destination}\"\n"
                ));
            }
        }
        self.write_manifest(&content);
    }

    /// Write a file (creating parents) relative to the root.
    pub fn write_file(&self, path: &str, contents: &[u8]) {
        let full_path = self.root().join(path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).expect("TestWorkspace: create_dir_all failed");
        }
        fs::write(&full_path, contents)
            .unwrap_or_else(|_| panic!("Could not write file: {}", full_path.display()));
    }

    /// Read a file relative to the root.
    ///
    /// # Panics
    /// Panics if the file cannot be read.
    pub fn read_file(&self, path: &str) -> Vec<u8> {
        let full_path = self.root().join(path);
        fs::read(&full_path)
            .unwrap_or_else(|_| panic!("Could not read file: {}", full_path.display()))
    }

    /// Assert that `path` (relative to the root) exists.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path does not exist.
    pub fn assert_file_exists(&self, path: &str) {
        let full_path = self.root().join(path);
        assert!(
            full_path.exists(),
            "Expected file to exist: {}",
            full_path.display()
        );
    }

    /// Assert that `path` (relative to the root) does **not** exist.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path exists.
    pub fn assert_file_not_exists(&self, path: &str) {
        let full_path = self.root().join(path);
        assert!(
            !full_path.exists(),
            "Expected file NOT to exist: {}",
            full_path.display()
        );
    }

    /// Assert that the file at `path` has exactly `contents`.
    ///
    /// # Panics
    /// Panics if the file cannot be read or differs.
    pub fn assert_file_content(&self, path: &str, contents: &[u8]) {
        assert_eq!(
            self.read_file(path),
            contents,
            "Unexpected content in {path}"
        );
    }
}
