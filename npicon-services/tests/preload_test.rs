mod common;

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};
use std::time::{Duration, SystemTime};

use common::{service, service_with, test_settings, CountingGateway, FakeStat};
use npicon_services::icon::{FileStat, IconService, PreloadReport};

/// Records the thread of every stat call.
#[derive(Clone, Default)]
struct ThreadRecordingStat {
    threads: Arc<Mutex<Vec<ThreadId>>>,
}

impl FileStat for ThreadRecordingStat {
    fn modified(&self, _path: &Path) -> Option<SystemTime> {
        self.threads.lock().unwrap().push(thread::current().id());
        Some(SystemTime::UNIX_EPOCH)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_preload_warms_every_path() {
    let gateway = CountingGateway::new();
    let stats = gateway.stats.clone();
    let (service, _rx) = service(gateway);
    let paths: Vec<String> = (0..50).map(|i| format!("/photos/img{:02}.jpg", i)).collect();

    let report = service.preload_icons(&paths, 32).await;

    assert_eq!(
        report,
        PreloadReport {
            requested: 50,
            skipped: 0,
            loaded: 50,
            failed: 0,
        }
    );
    assert_eq!(service.stats().cached, 50);
    assert_eq!(stats.calls(), 50);

    // Everything afterwards is a cache hit.
    for path in &paths {
        assert!(service.get_icon_sync(path.as_str()).is_some());
    }
    assert_eq!(stats.calls(), 50);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_preload_respects_concurrency_limit() {
    let gateway = CountingGateway::with_delay(Duration::from_millis(30));
    let stats = gateway.stats.clone();
    let mut settings = test_settings();
    settings.preload.concurrency = 4;
    let (service, _rx) = service_with(gateway, FakeStat::new(), settings);

    let paths: Vec<String> = (0..16).map(|i| format!("/video/clip{}.mkv", i)).collect();
    let report = service.preload_icons(&paths, 48).await;

    assert_eq!(report.loaded, 16);
    assert!(stats.max_active() <= 4, "max active was {}", stats.max_active());
    assert!(stats.max_active() >= 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_preload_skips_duplicates_and_cached_paths() {
    let gateway = CountingGateway::new();
    let stats = gateway.stats.clone();
    let (service, _rx) = service(gateway);

    service.get_icon_sync("/already/here.txt").unwrap();
    let report = service
        .preload_icons(["/already/here.txt", "/new/one.txt", "/new/one.txt", "", "/new/two.txt"], 48)
        .await;

    assert_eq!(report.requested, 5);
    assert_eq!(report.skipped, 3);
    assert_eq!(report.loaded, 2);
    assert_eq!(stats.calls(), 3);
    assert_eq!(service.stats().cached, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_preload_waits_for_failures_too() {
    let gateway = CountingGateway::with_delay(Duration::from_millis(20));
    let stats = gateway.stats.clone();
    let (service, _rx) = service(gateway);

    let report = service
        .preload_icons(["/a/ok1.png", "/a/bad1.png", "/a/ok2.png", "/a/bad2.png"], 48)
        .await;

    assert_eq!(report.loaded, 2);
    assert_eq!(report.failed, 2);
    assert_eq!(stats.calls(), 4);
    assert_eq!(stats.active.load(std::sync::atomic::Ordering::SeqCst), 0);
    assert_eq!(service.stats().cached, 2);
    assert!(!service.cache().contains(std::path::Path::new("/a/bad1.png")));
}

#[tokio::test]
async fn test_preload_of_nothing() {
    let (service, _rx) = service(CountingGateway::new());
    let report = service.preload_icons(Vec::<String>::new(), 48).await;
    assert_eq!(report, PreloadReport::default());
}

#[tokio::test]
async fn test_preload_stats_files_off_the_executor() {
    let stat = ThreadRecordingStat::default();
    let service = IconService::builder(CountingGateway::new())
        .settings(test_settings())
        .file_stat(stat.clone())
        .build();

    service.get_icon_sync("/warm/cached.txt").unwrap();
    stat.threads.lock().unwrap().clear();

    let report = service.preload_icons(["/warm/cached.txt", "/warm/new.txt"], 48).await;
    assert_eq!(report.skipped, 1);
    assert_eq!(report.loaded, 1);

    let executor = thread::current().id();
    let threads = stat.threads.lock().unwrap();
    assert!(!threads.is_empty());
    assert!(threads.iter().all(|id| *id != executor));
}
