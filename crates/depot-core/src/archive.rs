//! Deterministic archive packing and unpacking
//!
//! Archives are the unit of remote storage: one asset is one zip attached to
//! a release. The digest of the packed bytes doubles as integrity check and
//! cache key, so packing must be byte-for-byte reproducible: entries sorted
//! by relative path, a fixed timestamp, fixed permissions, UTF-8
//! forward-slash names, and a fixed deflate level.

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use depot_fs::{RelPath, digest_bytes};
use glob::Pattern;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::{Error, Result};

/// Capability interface for archive handling.
///
/// One production implementation ([`ZipArchiver`]); the sync engine and
/// resolver are constructed against the trait so tests can substitute.
pub trait ArchiveService: Send + Sync {
    /// Pack a directory tree into a deterministic archive.
    ///
    /// `excludes` are glob patterns matched case-sensitively against each
    /// file's forward-slash relative path.
    ///
    /// # Errors
    ///
    /// [`Error::ExcludePattern`] for an unparseable glob; I/O errors from
    /// reading the tree.
    fn pack(&self, source_dir: &Path, excludes: &[String]) -> Result<(Vec<u8>, String)>;

    /// Extract all entries into `destination`.
    ///
    /// Entry paths are validated before anything is written: an absolute
    /// path or parent traversal fails the whole call with
    /// [`Error::UnsafePath`] and leaves `destination` unmodified.
    ///
    /// # Errors
    ///
    /// [`Error::CorruptArchive`] on malformed input, [`Error::UnsafePath`]
    /// on an escaping entry.
    fn unpack(&self, bytes: &[u8], destination: &Path) -> Result<Vec<RelPath>>;

    /// List member paths from archive metadata, without extraction.
    ///
    /// # Errors
    ///
    /// [`Error::CorruptArchive`] on malformed input.
    fn list_members(&self, bytes: &[u8]) -> Result<Vec<RelPath>>;
}

/// Production archive service backed by the `zip` crate.
#[derive(Debug, Clone, Default)]
pub struct ZipArchiver;

impl ZipArchiver {
    pub fn new() -> Self {
        Self
    }

    fn file_options() -> SimpleFileOptions {
        // Fixed timestamp and permissions zero out all host-dependent
        // metadata. 2020-01-01 is in range for DOS datetimes, so the
        // fallback branch is unreachable.
        let stamp = zip::DateTime::from_date_and_time(2020, 1, 1, 0, 0, 0).unwrap_or_default();
        SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(6))
            .last_modified_time(stamp)
            .unix_permissions(0o644)
    }
}

impl ArchiveService for ZipArchiver {
    fn pack(&self, source_dir: &Path, excludes: &[String]) -> Result<(Vec<u8>, String)> {
        let patterns = compile_excludes(excludes)?;
        let mut files = collect_files(source_dir)?;
        files.retain(|(rel, _)| !patterns.iter().any(|p| p.matches(rel.as_str())));
        files.sort_by(|(a, _), (b, _)| a.cmp(b));

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = Self::file_options();

        for (rel, native) in &files {
            writer
                .start_file(rel.as_str(), options)
                .map_err(zip_error)?;
            let contents = std::fs::read(native).map_err(|e| depot_fs::Error::io(native, e))?;
            writer.write_all(&contents)?;
        }

        let cursor = writer.finish().map_err(zip_error)?;
        let bytes = cursor.into_inner();
        let sha256 = digest_bytes(&bytes);
        debug!(
            source = %source_dir.display(),
            files = files.len(),
            digest = %sha256,
            "packed archive"
        );
        Ok((bytes, sha256))
    }

    fn unpack(&self, bytes: &[u8], destination: &Path) -> Result<Vec<RelPath>> {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(zip_error)?;

        // Validate every entry path before writing anything, so an archive
        // with a traversal entry cannot leave a half-extracted destination.
        let mut members = Vec::new();
        for i in 0..archive.len() {
            let entry = archive.by_index_raw(i).map_err(zip_error)?;
            if entry.name().ends_with('/') {
                continue;
            }
            let rel = RelPath::new(entry.name()).map_err(|_| Error::UnsafePath {
                path: entry.name().to_string(),
            })?;
            members.push((i, rel));
        }

        let mut written = Vec::with_capacity(members.len());
        for (i, rel) in members {
            let mut entry = archive.by_index(i).map_err(zip_error)?;
            let target = rel.to_native(destination);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent).map_err(|e| depot_fs::Error::io(parent, e))?;
            }
            let mut out =
                std::fs::File::create(&target).map_err(|e| depot_fs::Error::io(&target, e))?;
            std::io::copy(&mut entry, &mut out)
                .map_err(|e| depot_fs::Error::io(&target, e))?;
            written.push(rel);
        }
        Ok(written)
    }

    fn list_members(&self, bytes: &[u8]) -> Result<Vec<RelPath>> {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(zip_error)?;
        let mut members = Vec::new();
        for i in 0..archive.len() {
            let entry = archive.by_index_raw(i).map_err(zip_error)?;
            if entry.name().ends_with('/') {
                continue;
            }
            let rel = RelPath::new(entry.name()).map_err(|_| Error::UnsafePath {
                path: entry.name().to_string(),
            })?;
            members.push(rel);
        }
        Ok(members)
    }
}

fn zip_error(e: zip::result::ZipError) -> Error {
    Error::CorruptArchive {
        message: e.to_string(),
    }
}

fn compile_excludes(excludes: &[String]) -> Result<Vec<Pattern>> {
    excludes
        .iter()
        .map(|raw| {
            Pattern::new(raw).map_err(|e| Error::ExcludePattern {
                pattern: raw.clone(),
                message: e.to_string(),
            })
        })
        .collect()
}

/// Recursively collect `(relative, native)` file paths under `root`.
fn collect_files(root: &Path) -> Result<Vec<(RelPath, PathBuf)>> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir).map_err(|e| depot_fs::Error::io(&dir, e))? {
            let entry = entry.map_err(|e| depot_fs::Error::io(&dir, e))?;
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if path.is_file() {
                let rel = RelPath::from_native(root, &path)?;
                out.push((rel, path));
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    fn write_tree(root: &Path, files: &[(&str, &str)]) {
        for (rel, contents) in files {
            let path = root.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, contents).unwrap();
        }
    }

    #[test]
    fn pack_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        write_tree(
            dir.path(),
            &[("b.txt", "bbb"), ("a/nested.txt", "nested"), ("a.txt", "aaa")],
        );

        let archiver = ZipArchiver::new();
        let (bytes1, sha1) = archiver.pack(dir.path(), &[]).unwrap();
        let (bytes2, sha2) = archiver.pack(dir.path(), &[]).unwrap();

        assert_eq!(bytes1, bytes2);
        assert_eq!(sha1, sha2);
    }

    #[test]
    fn pack_orders_members_lexicographically() {
        let dir = tempfile::tempdir().unwrap();
        write_tree(dir.path(), &[("z.txt", "z"), ("a/b.txt", "ab"), ("m.txt", "m")]);

        let archiver = ZipArchiver::new();
        let (bytes, _) = archiver.pack(dir.path(), &[]).unwrap();
        let members: Vec<_> = archiver
            .list_members(&bytes)
            .unwrap()
            .into_iter()
            .map(|p| p.as_str().to_string())
            .collect();

        assert_eq!(members, vec!["a/b.txt", "m.txt", "z.txt"]);
    }

    #[test]
    fn pack_respects_excludes() {
        let dir = tempfile::tempdir().unwrap();
        write_tree(
            dir.path(),
            &[
                ("keep.txt", "keep"),
                ("drop.tmp", "drop"),
                ("sub/drop.tmp", "drop"),
            ],
        );

        let archiver = ZipArchiver::new();
        let (bytes, _) = archiver
            .pack(dir.path(), &["**/*.tmp".to_string()])
            .unwrap();
        let members: Vec<_> = archiver
            .list_members(&bytes)
            .unwrap()
            .into_iter()
            .map(|p| p.as_str().to_string())
            .collect();

        assert_eq!(members, vec!["keep.txt"]);
    }

    #[test]
    fn bad_exclude_pattern_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_tree(dir.path(), &[("a.txt", "a")]);

        let err = ZipArchiver::new()
            .pack(dir.path(), &["[".to_string()])
            .unwrap_err();
        assert!(matches!(err, Error::ExcludePattern { .. }));
    }

    #[test]
    fn pack_unpack_round_trips() {
        let src = tempfile::tempdir().unwrap();
        write_tree(
            src.path(),
            &[("a.txt", "alpha"), ("sub/deep/b.bin", "beta")],
        );

        let archiver = ZipArchiver::new();
        let (bytes, _) = archiver.pack(src.path(), &[]).unwrap();

        let dst = tempfile::tempdir().unwrap();
        let written = archiver.unpack(&bytes, dst.path()).unwrap();

        let names: Vec<_> = written.iter().map(|p| p.as_str().to_string()).collect();
        assert_eq!(names, vec!["a.txt", "sub/deep/b.bin"]);
        assert_eq!(fs::read_to_string(dst.path().join("a.txt")).unwrap(), "alpha");
        assert_eq!(
            fs::read_to_string(dst.path().join("sub/deep/b.bin")).unwrap(),
            "beta"
        );
    }

    #[test]
    fn list_members_does_not_extract() {
        let src = tempfile::tempdir().unwrap();
        write_tree(src.path(), &[("a.txt", "alpha")]);
        let (bytes, _) = ZipArchiver::new().pack(src.path(), &[]).unwrap();

        let scratch = tempfile::tempdir().unwrap();
        ZipArchiver::new().list_members(&bytes).unwrap();
        assert_eq!(fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[test]
    fn traversal_entry_fails_without_writing() {
        // Build a zip with an escaping entry by hand.
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        writer.start_file("ok.txt", options).unwrap();
        writer.write_all(b"fine").unwrap();
        writer.start_file("../evil", options).unwrap();
        writer.write_all(b"evil").unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let dst = tempfile::tempdir().unwrap();
        let err = ZipArchiver::new().unpack(&bytes, dst.path()).unwrap_err();

        assert!(matches!(err, Error::UnsafePath { .. }));
        assert_eq!(fs::read_dir(dst.path()).unwrap().count(), 0);
    }

    #[test]
    fn garbage_bytes_are_a_corrupt_archive() {
        let err = ZipArchiver::new()
            .list_members(b"definitely not a zip")
            .unwrap_err();
        assert!(matches!(err, Error::CorruptArchive { .. }));
    }

    #[test]
    fn empty_directory_packs_to_empty_archive() {
        let dir = tempfile::tempdir().unwrap();
        let archiver = ZipArchiver::new();
        let (bytes, _) = archiver.pack(dir.path(), &[]).unwrap();
        assert!(archiver.list_members(&bytes).unwrap().is_empty());
    }
}
