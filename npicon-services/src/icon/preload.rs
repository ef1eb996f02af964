// SPDX-License-Identifier: LGPL-3.0-only
//! Bulk cache warm-up ahead of a burst of icon lookups.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;

use crate::icon::ServiceState;

/// Outcome of a preload run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreloadReport {
    /// Paths passed in.
    pub requested: usize,
    /// Paths already cached, duplicated, or empty.
    pub skipped: usize,
    /// Paths extracted and cached.
    pub loaded: usize,
    /// Paths whose extraction failed.
    pub failed: usize,
}

enum Outcome {
    Loaded,
    Cached,
    Failed,
}

/// Extract every uncached path concurrently and wait for all of them.
///
/// At most `settings.preload.concurrency` extractions run at once (0 lifts
/// the limit). Individual failures are logged and counted; they never
/// abort the rest of the run.
pub(crate) async fn preload_icons<I, P>(state: &Arc<ServiceState>, paths: I, size: u32) -> PreloadReport
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut report = PreloadReport::default();
    let mut seen = HashSet::new();
    let limit = state.settings.preload.concurrency;
    let permits = (limit > 0).then(|| Arc::new(Semaphore::new(limit)));
    let mut extractions = Vec::new();

    for path in paths {
        let path = path.as_ref();
        report.requested += 1;

        if path.as_os_str().is_empty() || !seen.insert(state.resolver.cache().key(path)) {
            report.skipped += 1;
            continue;
        }

        let task_state = Arc::clone(state);
        let permits = permits.clone();
        let path = path.to_path_buf();

        extractions.push(async move {
            let _permit = match permits {
                Some(semaphore) => semaphore.acquire_owned().await.ok(),
                None => None,
            };

            let display_path = path.clone();
            // Stat and extraction both stay on the blocking pool.
            let extracted = tokio::task::spawn_blocking(move || {
                if task_state.resolver.cached(&path).is_some() {
                    return Ok(Outcome::Cached);
                }
                task_state.resolver.resolve(&path, size).map(|_| Outcome::Loaded)
            })
            .await;

            match extracted {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(e)) => {
                    log::warn!("Preload: Failed to load icon for {:?}: {}", display_path, e);
                    Outcome::Failed
                },
                Err(e) => {
                    log::warn!("Preload: Task for {:?} failed: {}", display_path, e);
                    Outcome::Failed
                },
            }
        });
    }

    log::debug!(
        "Preload: Launching {} lookups ({} skipped)",
        extractions.len(),
        report.skipped
    );

    for outcome in join_all(extractions).await {
        match outcome {
            Outcome::Loaded => report.loaded += 1,
            Outcome::Cached => report.skipped += 1,
            Outcome::Failed => report.failed += 1,
        }
    }

    log::info!(
        "Preload: {} loaded, {} failed, {} skipped",
        report.loaded,
        report.failed,
        report.skipped
    );
    report
}
