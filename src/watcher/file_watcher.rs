use crate::runner::TEST_SUFFIX;
use notify::event::ModifyKind;
use notify::{EventKind, RecursiveMode};
use notify_debouncer_full::{new_debouncer, DebounceEventResult, Debouncer, RecommendedCache};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;

/// Watches the discovery root recursively and reports batches of changed
/// test files. Log files the harness writes next to the tests do not match
/// the test suffix, so runs never retrigger themselves.
pub struct FileWatcher {
    _debouncer: Debouncer<notify::RecommendedWatcher, RecommendedCache>,
    receiver: Receiver<Vec<PathBuf>>,
}

impl FileWatcher {
    pub fn new(root: &Path, debounce_ms: u64) -> anyhow::Result<Self> {
        let (tx, rx) = mpsc::channel();

        let mut debouncer = new_debouncer(
            Duration::from_millis(debounce_ms),
            None,
            move |result: DebounceEventResult| {
                if let Ok(events) = result {
                    let changed: HashSet<PathBuf> = events
                        .into_iter()
                        .filter(|e| {
                            matches!(
                                e.kind,
                                EventKind::Create(_)
                                    | EventKind::Modify(ModifyKind::Data(_))
                                    | EventKind::Remove(_)
                            )
                        })
                        .flat_map(|e| e.paths.clone())
                        .filter(|p| {
                            p.file_name()
                                .is_some_and(|n| n.to_string_lossy().ends_with(TEST_SUFFIX))
                        })
                        .collect();

                    if !changed.is_empty() {
                        let _ = tx.send(changed.into_iter().collect());
                    }
                }
            },
        )?;

        debouncer
            .watch(root, RecursiveMode::Recursive)
            .map_err(|e| anyhow::anyhow!("failed to watch {}: {}", root.display(), e))?;

        Ok(Self {
            _debouncer: debouncer,
            receiver: rx,
        })
    }

    /// Blocks until the next batch of changed test files.
    pub fn recv(&self) -> Option<Vec<PathBuf>> {
        self.receiver.recv().ok()
    }

    /// Drains any batch that arrived while a run was in progress.
    pub fn try_recv(&self) -> Option<Vec<PathBuf>> {
        self.receiver.try_recv().ok()
    }
}
