#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime};

use image::{Rgba, RgbaImage};
use npicon_services::icon::{ExtractionGateway, FileStat, IconError, IconImage, IconService, SlotUpdate};
use npicon_services::settings::IconSettings;
use tokio::sync::mpsc;

/// Counters shared between a test and the gateway it handed to a service.
#[derive(Default)]
pub struct GatewayStats {
    pub calls: AtomicUsize,
    pub active: AtomicUsize,
    pub max_active: AtomicUsize,
}

impl GatewayStats {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

/// Gateway that counts calls, optionally sleeps, and fails for files named `bad*`.
#[derive(Clone, Default)]
pub struct CountingGateway {
    pub stats: Arc<GatewayStats>,
    pub delay: Duration,
}

impl CountingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }
}

impl ExtractionGateway for CountingGateway {
    fn extract(&self, path: &Path, size: u32) -> Result<IconImage, IconError> {
        self.stats.calls.fetch_add(1, Ordering::SeqCst);
        let active = self.stats.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.max_active.fetch_max(active, Ordering::SeqCst);

        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.stats.active.fetch_sub(1, Ordering::SeqCst);

        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if name.starts_with("bad") {
            return Err(IconError::extraction(path, "unreadable"));
        }

        let side = size.clamp(1, 8);
        Ok(IconImage::from_rgba(RgbaImage::from_pixel(side, side, Rgba([1, 2, 3, 255]))))
    }
}

/// In-memory modification times. Unknown paths exist with mtime `UNIX_EPOCH`.
#[derive(Clone, Default)]
pub struct FakeStat {
    times: Arc<Mutex<HashMap<PathBuf, Option<SystemTime>>>>,
}

impl FakeStat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn touch(&self, path: impl Into<PathBuf>, seconds: u64) {
        let time = SystemTime::UNIX_EPOCH + Duration::from_secs(seconds);
        self.times.lock().unwrap().insert(path.into(), Some(time));
    }

    pub fn remove(&self, path: impl Into<PathBuf>) {
        self.times.lock().unwrap().insert(path.into(), None);
    }
}

impl FileStat for FakeStat {
    fn modified(&self, path: &Path) -> Option<SystemTime> {
        self.times
            .lock()
            .unwrap()
            .get(path)
            .copied()
            .unwrap_or(Some(SystemTime::UNIX_EPOCH))
    }
}

pub fn test_settings() -> IconSettings {
    let mut settings = IconSettings::default();
    settings.cache.case_insensitive_keys = false;
    settings
}

/// Service over a counting gateway and fake stat, with a slot channel.
pub fn service_with(
    gateway: CountingGateway,
    stat: FakeStat,
    settings: IconSettings,
) -> (IconService, mpsc::UnboundedReceiver<SlotUpdate>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let service = IconService::builder(gateway)
        .settings(settings)
        .file_stat(stat)
        .slot_sink(tx)
        .build();
    (service, rx)
}

pub fn service(gateway: CountingGateway) -> (IconService, mpsc::UnboundedReceiver<SlotUpdate>) {
    service_with(gateway, FakeStat::new(), test_settings())
}

/// Poll `condition` until it holds or `budget` runs out.
pub async fn wait_until(budget: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + budget;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// Receive slot updates until `count` non-placeholder ones arrived.
pub async fn resolved_updates(
    rx: &mut mpsc::UnboundedReceiver<SlotUpdate>,
    count: usize,
    budget: Duration,
) -> Vec<SlotUpdate> {
    let mut resolved = Vec::new();
    let _ = tokio::time::timeout(budget, async {
        while resolved.len() < count {
            match rx.recv().await {
                Some(update) if !update.placeholder => resolved.push(update),
                Some(_) => {},
                None => break,
            }
        }
    })
    .await;
    resolved
}
