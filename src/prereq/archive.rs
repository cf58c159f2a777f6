//! Runtime release manifests and archive layout.

use crate::TargetSpec;
use std::io;
use std::path::{Path, PathBuf};

/// One line of a `SHASUMS256.txt` manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ManifestEntry {
    pub sha256: String,
    pub file_name: String,
}

/// Find the release archive for `target` in a checksum manifest.
///
/// Lines look like `<sha256>  node-v22.11.0-linux-x64.tar.gz`; the entry
/// whose file name ends with the target's suffix wins.
pub(crate) fn find_archive(manifest: &str, target: &TargetSpec) -> Option<ManifestEntry> {
    let suffix = target.node_archive_suffix();
    manifest.lines().find_map(|line| {
        let mut parts = line.split_whitespace();
        let sha256 = parts.next()?;
        let file_name = parts.next()?.trim_start_matches('*');
        (file_name.starts_with("node-v") && file_name.ends_with(&suffix)).then(|| {
            ManifestEntry {
                sha256: sha256.to_ascii_lowercase(),
                file_name: file_name.to_string(),
            }
        })
    })
}

/// The top-level folder a release archive unpacks into, e.g.
/// `node-v22.11.0-linux-x64` for `node-v22.11.0-linux-x64.tar.gz`.
pub(crate) fn release_folder(file_name: &str) -> &str {
    [".tar.gz", ".tar.xz", ".zip"]
        .iter()
        .find_map(|ext| file_name.strip_suffix(ext))
        .unwrap_or(file_name)
}

/// Locate the directory holding the runtime executables inside an extracted
/// archive.
///
/// The root is the `release` folder when the archive unpacked into one,
/// otherwise the single top-level subdirectory, otherwise the extraction
/// directory itself. A `bin/` child of the root is preferred when present
/// (unix archives).
pub(crate) fn locate_executable_dir(extracted: &Path, release: &str) -> io::Result<PathBuf> {
    let named = extracted.join(release);
    let root = if named.is_dir() {
        named
    } else {
        let entries: Vec<PathBuf> = std::fs::read_dir(extracted)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .collect();
        match entries.as_slice() {
            [single] if single.is_dir() => single.clone(),
            _ => extracted.to_path_buf(),
        }
    };

    let bin = root.join("bin");
    if bin.is_dir() {
        Ok(bin)
    } else {
        Ok(root)
    }
}
