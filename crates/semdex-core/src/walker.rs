//! Source file discovery.
//!
//! Walks a root without following symlinks, prunes ignored directory names,
//! keeps files by extension (or exact file name) and drops anything whose
//! first bytes look binary.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

/// Bytes inspected by [`is_text_file`].
pub const SNIFF_BYTES: usize = 2048;

pub const DEFAULT_EXTENSIONS: &[&str] = &[".rs", ".md"];

pub const DEFAULT_IGNORE_DIRS: &[&str] = &[
    ".git", ".idea", ".cache", ".venv", "venv", "build", "builddir", "target", "third_party",
    "iso", "test_efi_dir", "EFI", "boot_fat", "node_modules", "knowledge",
];

#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Extensions with their leading dot, e.g. `.rs`.
    pub extensions: BTreeSet<String>,
    pub ignore_dirs: BTreeSet<String>,
    /// File names accepted regardless of extension.
    pub always_include: BTreeSet<String>,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            ignore_dirs: DEFAULT_IGNORE_DIRS.iter().map(|s| s.to_string()).collect(),
            always_include: BTreeSet::new(),
        }
    }
}

/// A discovered file: `relative` to the walk root and its `absolute` location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub relative: PathBuf,
    pub absolute: PathBuf,
}

impl DiscoveryOptions {
    fn is_ignored_dir(&self, entry: &DirEntry) -> bool {
        entry.depth() > 0
            && entry.file_type().is_dir()
            && entry.file_name().to_str().is_some_and(|name| self.ignore_dirs.contains(name))
    }

    fn is_eligible(&self, path: &Path) -> bool {
        let name = path.file_name().and_then(|n| n.to_str());
        if name.is_some_and(|n| self.always_include.contains(n)) {
            return true;
        }
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.contains(&format!(".{ext}")))
    }
}

/// Eligible text files under `root`, in a stable (file-name sorted) order.
pub fn discover_files(root: &Path, options: &DiscoveryOptions) -> Vec<SourceFile> {
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !options.is_ignored_dir(e));

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() || !options.is_eligible(entry.path()) {
            continue;
        }
        if !is_text_file(entry.path()) {
            tracing::debug!("Skipping binary file: {}", entry.path().display());
            continue;
        }
        let absolute = entry.path().to_path_buf();
        let relative = absolute.strip_prefix(root).unwrap_or(&absolute).to_path_buf();
        files.push(SourceFile { relative, absolute });
    }
    files
}

/// `false` when the file holds a NUL byte in its first [`SNIFF_BYTES`]
/// bytes, or cannot be opened at all.
pub fn is_text_file(path: &Path) -> bool {
    let Ok(file) = File::open(path) else {
        return false;
    };
    let mut head = Vec::with_capacity(SNIFF_BYTES);
    if file.take(SNIFF_BYTES as u64).read_to_end(&mut head).is_err() {
        return false;
    }
    !head.contains(&0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn nul_byte_marks_binary() {
        let tmp = TempDir::new().unwrap();
        let text = tmp.path().join("a.rs");
        let binary = tmp.path().join("b.rs");
        fs::write(&text, "fn a() {}\n").unwrap();
        fs::write(&binary, b"fn b() {}\0\x01\x02").unwrap();
        assert!(is_text_file(&text));
        assert!(!is_text_file(&binary));
        assert!(!is_text_file(&tmp.path().join("missing.rs")));
    }

    #[test]
    fn nul_past_sniff_window_is_text() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("late.md");
        let mut bytes = vec![b'a'; SNIFF_BYTES];
        bytes.push(0);
        fs::write(&path, bytes).unwrap();
        assert!(is_text_file(&path));
    }

    #[test]
    fn eligibility_by_extension_and_name() {
        let mut options = DiscoveryOptions::default();
        options.always_include.insert("Makefile".to_string());
        assert!(options.is_eligible(Path::new("src/lib.rs")));
        assert!(options.is_eligible(Path::new("README.md")));
        assert!(options.is_eligible(Path::new("Makefile")));
        assert!(!options.is_eligible(Path::new("main.c")));
        assert!(!options.is_eligible(Path::new("rs")));
    }
}
