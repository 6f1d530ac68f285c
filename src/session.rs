//! Live preview session
//!
//! Edits are coalesced: each change bumps the document version and restarts a
//! quiet period. When the period elapses, the latest text is laid out on the
//! blocking pool. A finished layout is published only if its version is still
//! the newest; results overtaken by a later edit are dropped.

use crate::config::{FontChoice, PreviewConfig};
use crate::layout::{PaginatedDocument, Paginator};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// A published layout and the document version it was computed from
#[derive(Debug, Clone)]
pub struct PreviewFrame {
    pub version: u64,
    pub document: PaginatedDocument,
}

#[derive(Debug, Clone)]
struct Snapshot {
    version: u64,
    text: Arc<str>,
    font: FontChoice,
}

/// Handle to the background layout task
pub struct PreviewSession {
    input: watch::Sender<Snapshot>,
    output: watch::Receiver<Option<Arc<PreviewFrame>>>,
    worker: JoinHandle<()>,
}

impl PreviewSession {
    /// Start a session on the current tokio runtime
    pub fn spawn(paginator: Paginator, font: FontChoice, debounce: Duration) -> Self {
        let (input, input_rx) = watch::channel(Snapshot {
            version: 0,
            text: Arc::from(""),
            font,
        });
        let (output_tx, output) = watch::channel(None);
        let worker = tokio::spawn(run(input_rx, output_tx, paginator, debounce));
        Self {
            input,
            output,
            worker,
        }
    }

    pub fn from_config(paginator: Paginator, config: &PreviewConfig) -> Self {
        Self::spawn(
            paginator,
            config.font,
            Duration::from_millis(config.debounce_ms),
        )
    }

    /// Replace the document text. Returns the new version.
    pub fn set_text(&self, text: impl Into<Arc<str>>) -> u64 {
        let text = text.into();
        self.bump(|snapshot| snapshot.text = text)
    }

    /// Change the preview font. Returns the new version.
    pub fn set_font(&self, font: FontChoice) -> u64 {
        self.bump(|snapshot| snapshot.font = font)
    }

    fn bump(&self, apply: impl FnOnce(&mut Snapshot)) -> u64 {
        let mut version = 0;
        self.input.send_modify(|snapshot| {
            apply(snapshot);
            snapshot.version += 1;
            version = snapshot.version;
        });
        version
    }

    /// Most recently requested version
    pub fn latest_version(&self) -> u64 {
        self.input.borrow().version
    }

    pub fn font(&self) -> FontChoice {
        self.input.borrow().font
    }

    /// Last published layout, if any
    pub fn current(&self) -> Option<Arc<PreviewFrame>> {
        self.output.borrow().clone()
    }

    /// Receiver notified on every publish
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<PreviewFrame>>> {
        self.output.clone()
    }

    /// Wait until a layout at least as new as `version` is published.
    ///
    /// Returns `None` if the session stops first.
    pub async fn wait_for(&self, version: u64) -> Option<Arc<PreviewFrame>> {
        let mut rx = self.subscribe();
        let result = rx
            .wait_for(|frame| frame.as_ref().is_some_and(|f| f.version >= version))
            .await;
        result.ok().and_then(|frame| (*frame).clone())
    }
}

impl Drop for PreviewSession {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

async fn run(
    mut input: watch::Receiver<Snapshot>,
    output: watch::Sender<Option<Arc<PreviewFrame>>>,
    paginator: Paginator,
    debounce: Duration,
) {
    while input.changed().await.is_ok() {
        // Quiet period, restarted by every further change
        loop {
            tokio::select! {
                changed = input.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
                _ = tokio::time::sleep(debounce) => break,
            }
        }

        let snapshot = input.borrow_and_update().clone();
        let version = snapshot.version;
        log::debug!("recomputing pages for version {}", version);

        let task_paginator = paginator.clone();
        let result = tokio::task::spawn_blocking(move || {
            let today = chrono::Local::now().date_naive();
            task_paginator.layout(&snapshot.text, snapshot.font, today)
        })
        .await;

        let document = match result {
            Ok(Some(document)) => document,
            Ok(None) => {
                log::warn!("layout for version {} skipped; keeping previous pages", version);
                continue;
            }
            Err(e) => {
                log::error!("layout task for version {} failed: {}", version, e);
                continue;
            }
        };

        let latest = input.borrow().version;
        if version != latest {
            log::warn!(
                "discarding stale layout for version {} (latest is {})",
                version,
                latest
            );
            continue;
        }

        log::debug!(
            "publishing version {} with {} page(s)",
            version,
            document.page_count()
        );
        output.send_replace(Some(Arc::new(PreviewFrame { version, document })));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PageGeometry;
    use crate::layout::BlockMeasurer;
    use crate::markdown::RenderedBlock;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    const DEBOUNCE: Duration = Duration::from_millis(20);
    const TIMEOUT: Duration = Duration::from_secs(5);

    /// Counts measurements; sleeps on blocks containing "slow"
    #[derive(Default)]
    struct CountingMeasurer {
        calls: AtomicUsize,
        not_ready: AtomicBool,
    }

    impl BlockMeasurer for CountingMeasurer {
        fn is_ready(&self) -> bool {
            !self.not_ready.load(Ordering::SeqCst)
        }

        fn measure(&self, block: &RenderedBlock, _font: FontChoice) -> f32 {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if block.html.contains("slow") {
                std::thread::sleep(Duration::from_millis(150));
            }
            10.0
        }
    }

    fn session(measurer: &Arc<CountingMeasurer>) -> PreviewSession {
        let paginator = Paginator::new(PageGeometry::default()).with_measurer(measurer.clone());
        PreviewSession::spawn(paginator, FontChoice::Inter, DEBOUNCE)
    }

    #[tokio::test]
    async fn test_burst_is_coalesced() {
        let measurer = Arc::new(CountingMeasurer::default());
        let session = session(&measurer);

        for i in 0..5 {
            session.set_text(format!("edit {}", i));
        }
        assert_eq!(session.latest_version(), 5);

        let frame = tokio::time::timeout(TIMEOUT, session.wait_for(5))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(frame.version, 5);
        assert_eq!(
            frame.document.pages[0].page.blocks[0].html.trim(),
            "<p>edit 4</p>"
        );
        // One single-block layout for the whole burst
        assert_eq!(measurer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stale_layout_is_not_published() {
        let measurer = Arc::new(CountingMeasurer::default());
        let session = session(&measurer);
        let mut rx = session.subscribe();

        let seen = tokio::spawn(async move {
            let mut versions = Vec::new();
            while rx.changed().await.is_ok() {
                if let Some(frame) = rx.borrow_and_update().as_ref() {
                    versions.push(frame.version);
                    if frame.version == 2 {
                        break;
                    }
                }
            }
            versions
        });

        session.set_text("slow layout");
        // Let the first layout start, then edit while it runs
        tokio::time::sleep(DEBOUNCE * 3).await;
        session.set_text("fast layout");

        let versions = tokio::time::timeout(TIMEOUT, seen).await.unwrap().unwrap();
        assert_eq!(versions, vec![2]);
        assert_eq!(session.current().unwrap().version, 2);
    }

    #[tokio::test]
    async fn test_not_ready_keeps_previous_pages() {
        let measurer = Arc::new(CountingMeasurer::default());
        let session = session(&measurer);

        session.set_text("first");
        let first = tokio::time::timeout(TIMEOUT, session.wait_for(1))
            .await
            .unwrap()
            .unwrap();

        measurer.not_ready.store(true, Ordering::SeqCst);
        session.set_text("second");
        tokio::time::sleep(DEBOUNCE * 10).await;
        assert_eq!(session.current().unwrap().version, first.version);

        measurer.not_ready.store(false, Ordering::SeqCst);
        let v = session.set_font(FontChoice::Lora);
        let frame = tokio::time::timeout(TIMEOUT, session.wait_for(v))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(frame.document.font, FontChoice::Lora);
        assert_eq!(
            frame.document.pages[0].page.blocks[0].html.trim(),
            "<p>second</p>"
        );
    }

    #[tokio::test]
    async fn test_nothing_published_before_first_edit() {
        let measurer = Arc::new(CountingMeasurer::default());
        let session = session(&measurer);
        tokio::time::sleep(DEBOUNCE * 5).await;
        assert!(session.current().is_none());
        assert_eq!(measurer.calls.load(Ordering::SeqCst), 0);
    }
}
