mod common;

use std::fs;
use std::time::Duration;

use common::{wait_until, CountingGateway};
use npicon_services::icon::IconService;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_watcher_drops_changed_files() {
    let dir = tempfile::tempdir().unwrap();
    let changed = dir.path().join("changed.txt");
    let untouched = dir.path().join("untouched.txt");
    fs::write(&changed, "before").unwrap();
    fs::write(&untouched, "same").unwrap();

    let service = IconService::builder(CountingGateway::new())
        .settings(common::test_settings())
        .build();
    let _watcher = service.watch(dir.path()).unwrap();

    service.get_icon_sync(&changed).unwrap();
    service.get_icon_sync(&untouched).unwrap();
    assert_eq!(service.stats().cached, 2);

    fs::write(&changed, "after").unwrap();

    let cache = service.cache();
    assert!(wait_until(Duration::from_secs(3), || !cache.contains(&changed)).await);
    assert!(cache.contains(&untouched));
}

#[tokio::test]
async fn test_watching_a_missing_path_fails() {
    let dir = tempfile::tempdir().unwrap();
    let service = IconService::builder(CountingGateway::new()).build();
    assert!(service.watch(dir.path().join("nope")).is_err());
}
