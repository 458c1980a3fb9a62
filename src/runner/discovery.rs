use anyhow::Context;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Naming convention that marks a file as a test script.
pub const TEST_SUFFIX: &str = ".test.js";

/// A discovered test script: its absolute path plus the root-relative path
/// used for display and log naming.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct TestFile {
    pub path: PathBuf,
    pub relative: String,
}

/// Walks `root` recursively and returns every regular file ending in
/// `.test.js`, in deterministic per-directory lexicographic order.
///
/// Files are matched by name only; zero-byte or unreadable files are still
/// yielded and left for the runner to fail on. An inaccessible root or
/// subdirectory is a fatal error.
pub fn discover_tests(root: &Path) -> anyhow::Result<Vec<TestFile>> {
    let root = root
        .canonicalize()
        .with_context(|| format!("cannot access test root {}", root.display()))?;

    let pattern = format!("{}/**/*{}", root.to_string_lossy(), TEST_SUFFIX);
    let mut files = BTreeSet::new();

    for entry in glob::glob(&pattern)? {
        let path = entry.with_context(|| format!("cannot read directory under {}", root.display()))?;
        if !path.is_file() {
            continue;
        }
        let relative = path
            .strip_prefix(&root)
            .unwrap_or(&path)
            .to_string_lossy()
            .into_owned();
        files.insert(TestFile { path, relative });
    }

    tracing::debug!(count = files.len(), root = %root.display(), "discovered test files");
    Ok(files.into_iter().collect())
}
