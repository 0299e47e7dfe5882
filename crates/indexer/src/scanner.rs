use drift_code_chunker::Language;
use ignore::{DirEntry, WalkBuilder};
use std::path::{Path, PathBuf};

/// Directory names never descended into, on top of `.gitignore` rules.
const SKIPPED_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    ".drift",
    ".idea",
    ".vscode",
    ".cache",
    ".next",
    ".venv",
    "__pycache__",
    "node_modules",
    "target",
    "build",
    "dist",
    "coverage",
    "vendor",
    "third_party",
];

const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Walks a workspace for files the chunker has a language for, honouring
/// `.gitignore`, `.ignore` and global git excludes.
pub struct FileScanner {
    root: PathBuf,
    max_file_size: u64,
}

impl FileScanner {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }

    #[must_use]
    pub const fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    /// Absolute paths in sorted order. A missing root yields nothing.
    pub fn scan(&self) -> Vec<PathBuf> {
        if !self.root.is_dir() {
            log::warn!("Workspace root {} does not exist", self.root.display());
            return Vec::new();
        }

        let walker = WalkBuilder::new(&self.root)
            .hidden(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .require_git(false)
            .sort_by_file_path(|a, b| a.cmp(b))
            .filter_entry(|entry| !is_skipped_dir(entry))
            .build();

        let files: Vec<PathBuf> = walker
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    log::warn!("Skipping unreadable entry: {err}");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_some_and(|kind| kind.is_file()))
            .filter(|entry| Language::from_path(entry.path()) != Language::Unknown)
            .filter(|entry| self.within_size_limit(entry))
            .map(DirEntry::into_path)
            .collect();

        log::info!("Found {} indexable files", files.len());
        files
    }

    /// Like [`FileScanner::scan`], as workspace-relative forward-slash paths.
    pub fn scan_relative(&self) -> Vec<String> {
        self.scan()
            .iter()
            .map(|path| normalize_path(&self.root, path))
            .collect()
    }

    fn within_size_limit(&self, entry: &DirEntry) -> bool {
        let Ok(meta) = entry.metadata() else {
            return true;
        };
        if meta.len() > self.max_file_size {
            log::debug!(
                "{} is {} bytes, over the {} byte limit",
                entry.path().display(),
                meta.len(),
                self.max_file_size
            );
            return false;
        }
        true
    }
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_some_and(|kind| kind.is_dir())
        && entry.depth() > 0
        && SKIPPED_DIRS
            .iter()
            .any(|name| entry.file_name().eq_ignore_ascii_case(name))
}

/// Path relative to `root` with forward slashes, the form chunk ids use.
pub fn normalize_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative.to_string_lossy().replace('\\', "/")
}
