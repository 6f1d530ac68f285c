//! Watches a single source document for external changes
//!
//! The parent directory is watched non-recursively rather than the file
//! itself: many editors save by writing a sibling and renaming it over the
//! original, which would orphan a watch on the old inode.

use crate::error::WatcherError;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

/// A change to the watched document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// Created, written or renamed into place
    Modified(PathBuf),
    Removed(PathBuf),
    /// Backend error reported by notify
    Error(String),
}

/// Map a raw notify event onto the watched document, ignoring other files
fn classify(event: &Event, target: &Path) -> Option<WatchEvent> {
    let name = target.file_name()?;
    let touches = event.paths.iter().any(|p| p.file_name() == Some(name));
    if !touches {
        return None;
    }

    match event.kind {
        EventKind::Create(_) | EventKind::Modify(_) => {
            if target.exists() {
                Some(WatchEvent::Modified(target.to_path_buf()))
            } else {
                Some(WatchEvent::Removed(target.to_path_buf()))
            }
        }
        EventKind::Remove(_) => Some(WatchEvent::Removed(target.to_path_buf())),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => None,
    }
}

/// Watches one document and yields coalesced change events
pub struct DocumentWatcher {
    _watcher: RecommendedWatcher,
    path: PathBuf,
    events: UnboundedReceiver<WatchEvent>,
}

impl DocumentWatcher {
    /// Start watching `path`. The file's directory must exist.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, WatcherError> {
        let path = path.as_ref();
        let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let (tx, rx) = unbounded_channel();
        let target = path.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let event = match res {
                    Ok(event) => classify(&event, &target),
                    Err(e) => Some(WatchEvent::Error(e.to_string())),
                };
                if let Some(event) = event {
                    let _ = tx.send(event);
                }
            },
            Config::default(),
        )
        .map_err(WatcherError::InitError)?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|source| WatcherError::WatchError {
                path: dir.clone(),
                source,
            })?;
        log::info!("watching {}", path.display());

        Ok(Self {
            _watcher: watcher,
            path,
            events: rx,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wait for the next change, then absorb the burst that follows it.
    ///
    /// Events arriving less than `quiet` apart collapse into the last one.
    /// Returns `None` once the watcher has shut down.
    pub async fn next_change(&mut self, quiet: Duration) -> Option<WatchEvent> {
        let mut latest = self.events.recv().await?;
        loop {
            match tokio::time::timeout(quiet, self.events.recv()).await {
                Ok(Some(event)) => latest = event,
                Ok(None) | Err(_) => return Some(latest),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind, RemoveKind};

    #[test]
    fn test_classify_ignores_other_files() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("doc.md");
        std::fs::write(&target, "x").unwrap();

        let other =
            Event::new(EventKind::Modify(ModifyKind::Any)).add_path(dir.path().join("b.md"));
        assert_eq!(classify(&other, &target), None);

        let ours = Event::new(EventKind::Modify(ModifyKind::Any)).add_path(target.clone());
        assert_eq!(classify(&ours, &target), Some(WatchEvent::Modified(target.clone())));

        let access = Event::new(EventKind::Access(notify::event::AccessKind::Any))
            .add_path(target.clone());
        assert_eq!(classify(&access, &target), None);
    }

    #[test]
    fn test_classify_removal() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("gone.md");

        let removed = Event::new(EventKind::Remove(RemoveKind::File)).add_path(target.clone());
        assert_eq!(classify(&removed, &target), Some(WatchEvent::Removed(target.clone())));

        // A create event for a file that no longer exists reads as removal
        let created = Event::new(EventKind::Create(CreateKind::File)).add_path(target.clone());
        assert_eq!(classify(&created, &target), Some(WatchEvent::Removed(target)));
    }

    #[tokio::test]
    async fn test_detects_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.md");
        std::fs::write(&path, "one").unwrap();

        let mut watcher = DocumentWatcher::new(&path).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        std::fs::write(&path, "two").unwrap();

        let event = tokio::time::timeout(
            Duration::from_secs(5),
            watcher.next_change(Duration::from_millis(50)),
        )
        .await
        .expect("no change observed");
        assert!(matches!(event, Some(WatchEvent::Modified(_))));
    }
}
