//! File watching for hot reload.
//!
//! Every existing directory that holds a candidate file is watched
//! non-recursively; events are filtered down to the candidate files
//! themselves, so a file created after startup is picked up too. A burst of
//! events is coalesced into one reload once the directory has been quiet for
//! the debounce window.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use notify::{recommended_watcher, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::ConfigError;

/// Invoked on a blocking thread after a debounced change.
pub(crate) type ReloadFn = Arc<dyn Fn() + Send + Sync>;

type FileSet = Arc<Mutex<HashSet<PathBuf>>>;

pub(crate) struct ConfigWatcher {
    watcher: RecommendedWatcher,
    watched_dirs: HashSet<PathBuf>,
    files: FileSet,
    task: JoinHandle<()>,
}

impl ConfigWatcher {
    /// Start watching `files`. Must be called inside a tokio runtime.
    pub(crate) fn start(
        files: &[PathBuf],
        debounce: Duration,
        reload: ReloadFn,
    ) -> Result<Self, ConfigError> {
        let handle = tokio::runtime::Handle::try_current().map_err(|_| ConfigError::NoRuntime)?;

        let (event_tx, event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
        let watcher = recommended_watcher(move |event| {
            let _ = event_tx.send(event);
        })?;

        let shared: FileSet = Arc::default();
        let task = handle.spawn(watch_loop(event_rx, Arc::clone(&shared), debounce, reload));
        let mut this = Self {
            watcher,
            watched_dirs: HashSet::new(),
            files: shared,
            task,
        };
        this.update(files)?;
        Ok(this)
    }

    /// Replace the set of candidate files, registering any new directories.
    /// Files whose directory does not exist are skipped.
    pub(crate) fn update(&mut self, files: &[PathBuf]) -> Result<(), ConfigError> {
        let mut canonical_files = HashSet::new();
        for file in files {
            let Some(dir) = directory_to_watch(file) else {
                continue;
            };
            let Ok(dir) = fs::canonicalize(&dir) else {
                continue;
            };
            if self.watched_dirs.insert(dir.clone()) {
                self.watcher.watch(&dir, RecursiveMode::NonRecursive)?;
                tracing::debug!(path = %dir.display(), "watching config directory");
            }
            if let Some(name) = file.file_name() {
                canonical_files.insert(dir.join(name));
            }
        }
        *self.files.lock().unwrap_or_else(PoisonError::into_inner) = canonical_files;
        Ok(())
    }

    /// Candidate files currently watched, sorted.
    pub(crate) fn files(&self) -> Vec<PathBuf> {
        let mut files: Vec<_> = self
            .files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect();
        files.sort();
        files
    }
}

impl Drop for ConfigWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn watch_loop(
    mut event_rx: mpsc::UnboundedReceiver<notify::Result<Event>>,
    files: FileSet,
    debounce: Duration,
    reload: ReloadFn,
) {
    while let Some(event) = event_rx.recv().await {
        let mut changed = relevant_paths(event, &files);
        if changed.is_empty() {
            continue;
        }
        loop {
            match tokio::time::timeout(debounce, event_rx.recv()).await {
                Ok(Some(event)) => changed.extend(relevant_paths(event, &files)),
                Ok(None) => return,
                Err(_) => break,
            }
        }
        changed.sort();
        changed.dedup();
        tracing::info!(files = ?changed, "config change detected, reloading");

        let reload = Arc::clone(&reload);
        if let Err(err) = tokio::task::spawn_blocking(move || reload()).await {
            tracing::error!(error = %err, "hot reload task failed");
        }
    }
}

fn relevant_paths(event: notify::Result<Event>, files: &FileSet) -> Vec<PathBuf> {
    let event = match event {
        Ok(event) => event,
        Err(err) => {
            tracing::warn!(error = %err, "watcher event error");
            return Vec::new();
        }
    };
    if !is_relevant_event_kind(&event.kind) {
        return Vec::new();
    }
    let files = files.lock().unwrap_or_else(PoisonError::into_inner);
    event
        .paths
        .into_iter()
        .filter(|path| files.contains(path))
        .collect()
}

fn is_relevant_event_kind(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Create(_) | EventKind::Modify(_))
}

fn directory_to_watch(path: &Path) -> Option<PathBuf> {
    if path.is_dir() {
        Some(path.to_path_buf())
    } else {
        path.parent().map(Path::to_path_buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, ModifyKind, RemoveKind};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn only_create_and_modify_are_relevant() {
        assert!(is_relevant_event_kind(&EventKind::Create(CreateKind::File)));
        assert!(is_relevant_event_kind(&EventKind::Modify(ModifyKind::Any)));
        assert!(!is_relevant_event_kind(&EventKind::Remove(RemoveKind::File)));
        assert!(!is_relevant_event_kind(&EventKind::Access(AccessKind::Any)));
    }

    #[test]
    fn events_are_filtered_to_contributing_files() {
        let path = PathBuf::from("/cfg/default.yaml");
        let files: FileSet = Arc::new(Mutex::new(HashSet::from([path])));
        let event = Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path(PathBuf::from("/cfg/default.yaml"))
            .add_path(PathBuf::from("/cfg/notes.txt"));
        assert_eq!(relevant_paths(Ok(event), &files), vec![PathBuf::from("/cfg/default.yaml")]);
    }

    #[test]
    fn start_outside_runtime_fails() {
        let err = ConfigWatcher::start(&[], Duration::from_millis(10), Arc::new(|| {}))
            .err()
            .expect("no runtime");
        assert!(matches!(err, ConfigError::NoRuntime));
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn burst_of_events_collapses_to_one_reload() {
        let (tx, rx) = mpsc::unbounded_channel();
        let path = PathBuf::from("/cfg/default.yaml");
        let files: FileSet = Arc::new(Mutex::new(HashSet::from([path.clone()])));
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let reload: ReloadFn = Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let task = tokio::spawn(watch_loop(rx, files, Duration::from_millis(100), reload));
        for _ in 0..5 {
            let event = Event::new(EventKind::Modify(ModifyKind::Any)).add_path(path.clone());
            tx.send(Ok(event)).unwrap();
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        tokio::time::sleep(Duration::from_millis(150)).await;
        drop(tx);
        task.await.unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 1, "rapid saves should collapse to one reload");
    }
}
