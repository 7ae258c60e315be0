//! Parallel paginated crawl: fans a project's issue pages out across a
//! fixed worker pool, retrying transient upstream errors and cancelling the
//! whole group on the first fatal one.
//!
//! Completion is tracked with an explicit counter of outstanding pages
//! rather than by the work channel closing: retries re-enqueue onto that
//! same channel from a detached task, so the channel never closes on its
//! own while a crawl is in flight. Once the counter reaches zero an
//! internal "done" token is fired, which is what actually wakes workers
//! blocked waiting for the next page.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use domain::Issue;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{CrawlError, UpstreamError};
use crate::rate_gate::SharedRateGate;
use crate::upstream::UpstreamClient;

/// One page's worth of crawl work: a zero-based page index to translate into
/// a `startAt` offset.
type PageIndex = u64;

/// Runs one paginated crawl of a project's issues (full or incremental,
/// depending on the `since` the caller threads through the upstream client
/// calls — this module is agnostic to that distinction).
///
/// `upstream` is an `Arc` rather than a borrow: each worker is a separately
/// spawned `'static` task, so it needs to own a handle to the client rather
/// than borrow one from the coordinator's stack frame.
pub struct Crawl {
    pub upstream: Arc<dyn UpstreamClient>,
    pub rate_gate: SharedRateGate,
    pub worker_count: usize,
    pub page_size: u32,
}

impl Crawl {
    /// Fetch every issue for `project_key` matching `since` (or all issues,
    /// if `since` is `None`), fanning the pages out across `worker_count`
    /// concurrent workers.
    ///
    /// `total == 0` short-circuits to an empty result without starting any
    /// workers. `page_size == 0` is a caller error, not silently clamped.
    pub async fn run(
        &self,
        project_key: &str,
        since: Option<chrono::DateTime<chrono::Utc>>,
        total: u64,
        cancel: CancellationToken,
    ) -> Result<Vec<Issue>, CrawlError> {
        if self.page_size == 0 {
            return Err(CrawlError::InvalidPageSize);
        }
        if total == 0 {
            return Ok(Vec::new());
        }

        let total_pages = total.div_ceil(self.page_size as u64);
        debug!(project_key, total, total_pages, "starting paginated crawl");

        let (page_tx, page_rx) = mpsc::channel::<PageIndex>(self.worker_count.max(1));
        let (result_tx, mut result_rx) = mpsc::channel::<(PageIndex, Vec<Issue>)>(self.worker_count.max(1));

        let page_rx = Arc::new(tokio::sync::Mutex::new(page_rx));

        // Pages not yet successfully fetched. Retries re-enqueue onto
        // `page_tx` without ever shrinking this, so the channel itself
        // never closes on its own while work remains; `all_done` (fired
        // when this hits zero) is what actually tells workers to stop.
        let remaining = Arc::new(AtomicU64::new(total_pages));
        let all_done = CancellationToken::new();

        let mut workers = JoinSet::new();
        for worker_id in 0..self.worker_count.max(1) {
            let page_rx = page_rx.clone();
            let result_tx = result_tx.clone();
            let page_tx_for_retry = page_tx.clone();
            let rate_gate = self.rate_gate.clone();
            let cancel = cancel.clone();
            let all_done = all_done.clone();
            let remaining = remaining.clone();
            let upstream = self.upstream.clone();
            let project_key = project_key.to_string();
            let page_size = self.page_size;

            workers.spawn(async move {
                loop {
                    if cancel.is_cancelled() {
                        return Err(CrawlError::Cancelled);
                    }
                    if all_done.is_cancelled() {
                        return Ok(());
                    }

                    rate_gate.wait_if_paused().await?;

                    let page = {
                        let mut rx = page_rx.lock().await;
                        tokio::select! {
                            page = rx.recv() => page,
                            _ = cancel.cancelled() => return Err(CrawlError::Cancelled),
                            _ = all_done.cancelled() => return Ok(()),
                        }
                    };
                    let Some(page) = page else {
                        return Ok(());
                    };

                    let start_at = page * page_size as u64;
                    debug!(worker_id, page, start_at, "fetching page");

                    match upstream.fetch_issues_page(&project_key, since, start_at, page_size).await {
                        Ok(issues) => {
                            rate_gate.reset();
                            if result_tx.send((page, issues)).await.is_err() {
                                return Ok(());
                            }
                            if remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
                                all_done.cancel();
                            }
                        }
                        Err(err) if err.class() == crate::error::ErrorClass::Transient => {
                            warn!(worker_id, page, %err, "transient upstream error, pausing and re-enqueuing");
                            rate_gate.pause();
                            // Re-enqueue from a detached task: sending back onto
                            // `page_tx` from inside this worker's own receive loop
                            // would deadlock once the channel is full, since no
                            // other worker is there to drain it on our behalf.
                            let page_tx_for_retry = page_tx_for_retry.clone();
                            tokio::spawn(async move {
                                let _ = page_tx_for_retry.send(page).await;
                            });
                        }
                        Err(err) => {
                            // A fatal error cancels the whole group: the
                            // token is created fresh per crawl by the caller,
                            // so cancelling it here only stops our own sibling
                            // workers and dispatcher, never another request.
                            cancel.cancel();
                            return Err(CrawlError::Fatal(err));
                        }
                    }
                }
            });
        }
        drop(result_tx);

        let dispatcher = {
            let cancel = cancel.clone();
            let all_done = all_done.clone();
            tokio::spawn(async move {
                for page in 0..total_pages {
                    tokio::select! {
                        send_result = page_tx.send(page) => {
                            if send_result.is_err() {
                                return;
                            }
                        }
                        _ = cancel.cancelled() => return,
                        _ = all_done.cancelled() => return,
                    }
                }
            })
        };

        let mut pages: Vec<Option<Vec<Issue>>> = (0..total_pages).map(|_| None).collect();
        while let Some((page, issues)) = result_rx.recv().await {
            pages[page as usize] = Some(issues);
        }

        let _ = dispatcher.await;

        // Prefer the most actionable outcome: a fatal upstream error (or a
        // worker panic) explains *why* the crawl stopped; a bare `Cancelled`
        // from a sibling reacting to that same fatal error carries no
        // information on its own and should never shadow it.
        let mut fatal = None;
        let mut panicked = None;
        let mut other = None;
        let mut cancelled = None;
        while let Some(outcome) = workers.join_next().await {
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(err @ CrawlError::Fatal(_))) => {
                    fatal.get_or_insert(err);
                }
                Ok(Err(CrawlError::Cancelled)) => {
                    cancelled.get_or_insert(CrawlError::Cancelled);
                }
                Ok(Err(err)) => {
                    other.get_or_insert(err);
                }
                Err(join_err) => {
                    panicked.get_or_insert(CrawlError::WorkerPanicked(join_err.to_string()));
                }
            }
        }
        if let Some(err) = fatal.or(panicked).or(other).or(cancelled) {
            return Err(err);
        }

        let mut all = Vec::with_capacity(total as usize);
        for page in pages {
            if let Some(issues) = page {
                all.extend(issues);
            }
        }
        info!(project_key, fetched = all.len(), "crawl finished");
        Ok(all)
    }
}
