// SPDX-License-Identifier: LGPL-3.0-only
//! Background loader draining the request queue in throttled batches.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::icon::ServiceState;
use crate::icon::bitmap::IconImage;
use crate::icon::error::IconError;
use crate::icon::events::{IconEvent, SlotUpdate};
use crate::icon::queue::{LoadRequest, LoadTarget};

/// Lifecycle state of the background loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderState {
    /// No worker is running.
    Stopped,
    /// The worker is draining the queue.
    Running,
}

struct Worker {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Owns the single worker task and its start/stop transitions.
#[derive(Default)]
pub(crate) struct BackgroundLoader {
    worker: Mutex<Option<Worker>>,
}

impl BackgroundLoader {
    pub(crate) fn state(&self) -> LoaderState {
        match self.lock().as_ref() {
            Some(worker) if !worker.handle.is_finished() => LoaderState::Running,
            _ => LoaderState::Stopped,
        }
    }

    /// Spawn the worker on the current tokio runtime. No-op while running.
    pub(crate) fn start(&self, state: &Arc<ServiceState>) -> Result<(), IconError> {
        let runtime = Handle::try_current().map_err(|_| IconError::NoRuntime)?;
        let mut worker = self.lock();

        if let Some(existing) = worker.as_ref() {
            if !existing.handle.is_finished() {
                log::debug!("IconLoader: Already running");
                return Ok(());
            }
        }

        let cancel = CancellationToken::new();
        let handle = runtime.spawn(run(Arc::clone(state), cancel.clone()));
        *worker = Some(Worker { cancel, handle });
        log::info!("IconLoader: Started");
        Ok(())
    }

    /// Cancel the worker and wait up to `grace` for it to exit.
    ///
    /// Returns once the worker is gone or the grace period ran out; in the
    /// latter case the task is left to notice the cancellation on its own.
    pub(crate) async fn stop(&self, grace: Duration) {
        let worker = self.lock().take();
        let Some(Worker { cancel, handle }) = worker else {
            return;
        };

        cancel.cancel();
        match tokio::time::timeout(grace, handle).await {
            Ok(Ok(())) => log::info!("IconLoader: Stopped"),
            Ok(Err(e)) => log::warn!("IconLoader: Worker ended abnormally: {}", e),
            Err(_) => log::warn!(
                "IconLoader: Worker did not exit within {:?}, detaching it",
                grace
            ),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Worker>> {
        self.worker.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for BackgroundLoader {
    fn drop(&mut self) {
        if let Some(worker) = self.lock().take() {
            worker.cancel.cancel();
        }
    }
}

/// Worker main loop. Only cancellation ends it.
async fn run(state: Arc<ServiceState>, cancel: CancellationToken) {
    let settings = state.settings.loader.clone();
    let batch_size = settings.batch_size.max(1);
    log::debug!(
        "IconLoader: Worker running (batch size {}, batch delay {:?})",
        batch_size,
        settings.batch_delay()
    );

    loop {
        if cancel.is_cancelled() {
            break;
        }

        let batch = state.queue.take_batch(batch_size);
        let pause = if batch.is_empty() {
            settings.idle_delay()
        } else {
            state.batches.fetch_add(1, Ordering::Relaxed);
            log::trace!("IconLoader: Processing batch of {}", batch.len());

            process_batch(&state, batch, &cancel).await;
            settings.batch_delay()
        };

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(pause) => {},
        }
    }

    log::debug!("IconLoader: Worker exited ({} requests still queued)", state.queue.len());
}

async fn process_batch(state: &Arc<ServiceState>, batch: Vec<LoadRequest>, cancel: &CancellationToken) {
    let mut pending = batch.into_iter();

    while let Some(request) = pending.next() {
        if cancel.is_cancelled() {
            let mut rest = vec![request];
            rest.extend(pending);
            log::debug!("IconLoader: Cancelled mid-batch, re-queueing {} requests", rest.len());
            state.queue.requeue_front(rest);
            return;
        }

        let LoadRequest { path, size, target } = request;
        let handled = AssertUnwindSafe(async {
            let result = resolve_blocking(state, path.clone(), size).await;
            deliver(state, path.clone(), target, result);
        })
        .catch_unwind()
        .await;

        if let Err(panic) = handled {
            log::error!(
                "IconLoader: Delivery for {:?} panicked: {}",
                path,
                panic_message(panic.as_ref())
            );
        }
    }
}

/// Run the cache-or-extract step on the blocking pool.
///
/// The returned future is never aborted; cancellation only takes effect
/// once it completes.
async fn resolve_blocking(
    state: &Arc<ServiceState>,
    path: PathBuf,
    size: u32,
) -> Result<IconImage, IconError> {
    let worker_state = Arc::clone(state);
    tokio::task::spawn_blocking(move || worker_state.resolver.resolve(&path, size))
        .await
        .unwrap_or_else(|e| Err(IconError::TaskFailed(e.to_string())))
}

fn deliver(
    state: &ServiceState,
    path: PathBuf,
    target: LoadTarget,
    result: Result<IconImage, IconError>,
) {
    match result {
        Ok(image) => {
            match target {
                LoadTarget::None => {},
                LoadTarget::Slot(slot) => match &state.sink {
                    Some(sink) => sink.deliver(SlotUpdate {
                        slot,
                        path: path.clone(),
                        image,
                        placeholder: false,
                    }),
                    None => log::debug!("IconLoader: No slot sink for {:?}", slot),
                },
                LoadTarget::Callback(callback) => callback(image),
                LoadTarget::Completion(tx) => {
                    let _ = tx.send(Ok(image));
                },
            }
            let _ = state.events.send(IconEvent::Loaded { path });
        },
        Err(e) => {
            log::warn!("IconLoader: Failed to load icon for {:?}: {}", path, e);
            let error = e.to_string();
            if let LoadTarget::Completion(tx) = target {
                let _ = tx.send(Err(e));
            }
            let _ = state.events.send(IconEvent::Failed { path, error });
        },
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
