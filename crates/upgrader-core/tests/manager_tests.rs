//! Integration tests for the upgrade pipeline, driven through
//! `UpgradeManager` with mocked fetch, provider and handler collaborators.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use upgrader_core::{
    snapshot, ArchiveHandler, HttpResponse, ModuleRelease, ReleaseFetch, RepositoryRef, Result,
    StaticRepositoryProvider, UpgradeError, UpgradeManager, UpgradeSettings,
};

#[derive(Clone)]
enum Scripted {
    Ok { status: u16, body: Vec<u8> },
    Transport,
}

impl Scripted {
    fn ok(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Scripted::Ok {
            status,
            body: body.into(),
        }
    }
}

/// Scripted fetch layer counting invocations per path.
#[derive(Default)]
struct MockFetch {
    releases: Mutex<HashMap<String, Scripted>>,
    archives: Mutex<HashMap<String, Scripted>>,
    assets: Mutex<HashMap<String, Scripted>>,
    release_calls: AtomicU32,
    direct_calls: AtomicU32,
    archive_calls: AtomicU32,
    asset_calls: AtomicU32,
}

impl MockFetch {
    fn script_release(&self, url: &str, scripted: Scripted) {
        self.releases.lock().unwrap().insert(url.to_string(), scripted);
    }

    fn script_archive(&self, url: &str, scripted: Scripted) {
        self.archives.lock().unwrap().insert(url.to_string(), scripted);
    }

    fn script_asset(&self, url: &str, scripted: Scripted) {
        self.assets.lock().unwrap().insert(url.to_string(), scripted);
    }

    fn respond(map: &Mutex<HashMap<String, Scripted>>, url: &str) -> Result<HttpResponse> {
        match map.lock().unwrap().get(url).cloned() {
            Some(Scripted::Ok { status, body }) => Ok(HttpResponse {
                status,
                headers: BTreeMap::new(),
                body,
            }),
            Some(Scripted::Transport) | None => Err(UpgradeError::Network {
                url: url.to_string(),
                message: "connection refused".to_string(),
                source: None,
            }),
        }
    }
}

#[async_trait]
impl ReleaseFetch for MockFetch {
    async fn fetch_release(&self, url: &str) -> Result<HttpResponse> {
        self.release_calls.fetch_add(1, Ordering::SeqCst);
        Self::respond(&self.releases, url)
    }

    async fn fetch_release_direct(&self, url: &str) -> Result<HttpResponse> {
        self.direct_calls.fetch_add(1, Ordering::SeqCst);
        Self::respond(&self.releases, url)
    }

    async fn fetch_archive(&self, url: &str) -> Result<HttpResponse> {
        self.archive_calls.fetch_add(1, Ordering::SeqCst);
        Self::respond(&self.archives, url)
    }

    async fn fetch_asset(&self, url: &str) -> Result<HttpResponse> {
        self.asset_calls.fetch_add(1, Ordering::SeqCst);
        Self::respond(&self.assets, url)
    }
}

/// Archive handler that records each staged file (and its bytes, read
/// while the file still exists).
#[derive(Default)]
struct RecordingHandler {
    handled: Mutex<Vec<(PathBuf, Vec<u8>)>>,
    fail: bool,
}

#[async_trait]
impl ArchiveHandler for RecordingHandler {
    async fn handle(&self, archive: &Path) -> Result<()> {
        let bytes = std::fs::read(archive).expect("staged archive must exist during handling");
        self.handled
            .lock()
            .unwrap()
            .push((archive.to_path_buf(), bytes));
        if self.fail {
            Err(UpgradeError::Extraction {
                message: "corrupt zip".to_string(),
                path: archive.to_path_buf(),
            })
        } else {
            Ok(())
        }
    }
}

fn release_url(repository_id: &str) -> String {
    format!("https://api.github.com/repos/{}/releases/latest", repository_id)
}

fn release_payload(module: &str, tag: &str, body: &str) -> String {
    format!(
        r#"{{
            "tag_name": "{tag}",
            "body": "{body}",
            "assets": [
                {{
                    "name": "{module}.zip",
                    "content_type": "application/zip",
                    "browser_download_url": "https://github.com/o/{module}/releases/download/{tag}/{module}.zip",
                    "url": "https://api.github.com/repos/o/{module}/releases/assets/1"
                }}
            ]
        }}"#
    )
}

struct Fixture {
    _temp: TempDir,
    settings: UpgradeSettings,
    fetch: Arc<MockFetch>,
    handler: Arc<RecordingHandler>,
    manager: UpgradeManager,
}

fn fixture(repositories: Vec<RepositoryRef>, failing_handler: bool) -> Fixture {
    let temp = TempDir::new().unwrap();
    let settings = UpgradeSettings::new(temp.path(), "Test Shop");
    let fetch = Arc::new(MockFetch::default());
    let handler = Arc::new(RecordingHandler {
        fail: failing_handler,
        ..Default::default()
    });
    let manager = UpgradeManager::with_fetcher(
        settings.clone(),
        Arc::clone(&fetch) as Arc<dyn ReleaseFetch>,
        Arc::new(StaticRepositoryProvider::new(repositories)),
        Arc::clone(&handler) as Arc<dyn ArchiveHandler>,
    );
    Fixture {
        _temp: temp,
        settings,
        fetch,
        handler,
        manager,
    }
}

fn seed_snapshot(settings: &UpgradeSettings, modules: &[ModuleRelease]) {
    let path = snapshot::snapshot_path(settings);
    snapshot::write_snapshot(&path, modules).unwrap();
}

fn module_record(name: &str) -> ModuleRelease {
    ModuleRelease {
        name: name.to_string(),
        version_available: "2.0.0".to_string(),
        archive_url: format!("https://github.com/o/{name}/releases/download/v2.0.0/{name}.zip"),
        asset_url: format!("https://api.github.com/repos/o/{name}/releases/assets/1"),
        change_log: None,
    }
}

// === Resolution ===

#[tokio::test]
async fn resolve_all_keeps_only_repositories_with_a_matching_zip_asset() {
    let fx = fixture(
        vec![
            RepositoryRef::new("alpha", "o/alpha"),
            RepositoryRef::new("beta", "o/beta"),
            RepositoryRef::new("gamma", "o/gamma"),
        ],
        false,
    );

    // alpha: usable release; beta: asset named after a different module;
    // gamma: unusable payload.
    fx.fetch.script_release(
        &release_url("o/alpha"),
        Scripted::ok(200, release_payload("alpha", "v2.0.0", "- fix")),
    );
    fx.fetch.script_release(
        &release_url("o/beta"),
        Scripted::ok(200, release_payload("other-module", "v1.0.0", "")),
    );
    fx.fetch
        .script_release(&release_url("o/gamma"), Scripted::ok(200, "not json"));

    let modules = fx.manager.resolve_all().await.unwrap();

    assert!(modules.len() <= 3);
    assert_eq!(modules.len(), 1);
    assert_eq!(modules[0].name, "alpha");
    assert_eq!(modules[0].version_available, "2.0.0");
    assert!(modules[0].archive_url.ends_with("/alpha.zip"));

    // The listing was persisted and reads back verbatim.
    assert_eq!(fx.manager.read_snapshot().unwrap(), modules);
}

#[tokio::test]
async fn resolve_all_persists_an_empty_snapshot_when_nothing_resolves() {
    let fx = fixture(vec![RepositoryRef::new("alpha", "o/alpha")], false);
    // Scripted as a transport failure on both paths.

    let modules = fx.manager.resolve_all().await.unwrap();
    assert!(modules.is_empty());

    let path = snapshot::snapshot_path(&fx.settings);
    assert!(path.exists());
    assert!(fx.manager.read_snapshot().unwrap().is_empty());
}

#[tokio::test]
async fn resolve_all_surfaces_transport_failures_in_dev_mode() {
    let temp = TempDir::new().unwrap();
    let settings = UpgradeSettings::new(temp.path(), "Test Shop").with_dev_mode(true);
    let fetch = Arc::new(MockFetch::default());
    let manager = UpgradeManager::with_fetcher(
        settings,
        Arc::clone(&fetch) as Arc<dyn ReleaseFetch>,
        Arc::new(StaticRepositoryProvider::new(vec![RepositoryRef::new(
            "alpha", "o/alpha",
        )])),
        Arc::new(RecordingHandler::default()),
    );

    let result = manager.resolve_all().await;
    assert!(matches!(result, Err(UpgradeError::Network { .. })));
}

#[tokio::test]
async fn read_snapshot_is_idempotent_without_resolution() {
    let fx = fixture(vec![], false);
    seed_snapshot(&fx.settings, &[module_record("alpha")]);

    let first = fx.manager.read_snapshot().unwrap();
    let second = fx.manager.read_snapshot().unwrap();
    assert_eq!(first, second);
    assert_eq!(fx.fetch.release_calls.load(Ordering::SeqCst), 0);
}

// === Circuit breaker integration ===

#[tokio::test]
async fn third_call_after_two_transport_failures_skips_the_primary_path() {
    let fx = fixture(vec![RepositoryRef::new("alpha", "o/alpha")], false);
    // No script: every fetch against the endpoint is a transport failure.

    for _ in 0..2 {
        fx.manager.resolve_all().await.unwrap();
    }
    assert_eq!(fx.fetch.release_calls.load(Ordering::SeqCst), 2);
    assert_eq!(fx.fetch.direct_calls.load(Ordering::SeqCst), 2);

    // Circuit is open now: the primary path is not attempted again.
    fx.manager.resolve_all().await.unwrap();
    assert_eq!(fx.fetch.release_calls.load(Ordering::SeqCst), 2);
    assert_eq!(fx.fetch.direct_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn open_circuit_still_resolves_through_the_fallback_path() {
    let fx = fixture(vec![RepositoryRef::new("alpha", "o/alpha")], false);
    let url = release_url("o/alpha");

    // Open the breaker with two failing passes.
    for _ in 0..2 {
        fx.manager.resolve_all().await.unwrap();
    }

    // Upstream recovers; the fallback path carries the result.
    fx.fetch.script_release(
        &url,
        Scripted::ok(200, release_payload("alpha", "v3.0.0", "")),
    );
    let modules = fx.manager.resolve_all().await.unwrap();

    assert_eq!(fx.fetch.release_calls.load(Ordering::SeqCst), 2);
    assert_eq!(modules.len(), 1);
    assert_eq!(modules[0].version_available, "3.0.0");
}

// === Download ===

#[tokio::test]
async fn download_stages_the_archive_and_cleans_up() {
    let fx = fixture(vec![], false);
    let record = module_record("alpha");
    seed_snapshot(&fx.settings, &[record.clone()]);
    fx.fetch
        .script_archive(&record.archive_url, Scripted::ok(200, "PK\x03\x04zipbytes"));

    fx.manager.download("alpha").await.unwrap();

    let handled = fx.handler.handled.lock().unwrap();
    assert_eq!(handled.len(), 1);
    let (path, bytes) = &handled[0];
    assert!(path.ends_with("downloads/alpha.zip"));
    assert_eq!(bytes, b"PK\x03\x04zipbytes");
    // Staged file is gone once the download call returns.
    assert!(!path.exists());
    assert_eq!(fx.fetch.asset_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn download_retries_the_asset_url_once_on_empty_primary_body() {
    let fx = fixture(vec![], false);
    let record = module_record("alpha");
    seed_snapshot(&fx.settings, &[record.clone()]);
    fx.fetch.script_archive(&record.archive_url, Scripted::ok(200, ""));
    fx.fetch
        .script_asset(&record.asset_url, Scripted::ok(200, "PK\x03\x04assetbytes"));

    fx.manager.download("alpha").await.unwrap();

    assert_eq!(fx.fetch.archive_calls.load(Ordering::SeqCst), 1);
    assert_eq!(fx.fetch.asset_calls.load(Ordering::SeqCst), 1);
    let handled = fx.handler.handled.lock().unwrap();
    assert_eq!(handled[0].1, b"PK\x03\x04assetbytes");
}

#[tokio::test]
async fn download_treats_not_found_body_as_missing() {
    let fx = fixture(vec![], false);
    let record = module_record("alpha");
    seed_snapshot(&fx.settings, &[record.clone()]);
    fx.fetch
        .script_archive(&record.archive_url, Scripted::ok(200, "Not Found"));
    fx.fetch
        .script_asset(&record.asset_url, Scripted::ok(200, "PK\x03\x04assetbytes"));

    fx.manager.download("alpha").await.unwrap();
    assert_eq!(fx.fetch.asset_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn download_fails_when_both_urls_yield_nothing() {
    let fx = fixture(vec![], false);
    let record = module_record("alpha");
    seed_snapshot(&fx.settings, &[record.clone()]);
    fx.fetch.script_archive(&record.archive_url, Scripted::ok(404, "Not Found"));
    fx.fetch.script_asset(&record.asset_url, Scripted::ok(404, "Not Found"));

    let result = fx.manager.download("alpha").await;
    assert!(matches!(result, Err(UpgradeError::DownloadFailed { .. })));

    // Exactly one asset retry, the handler never ran, nothing was staged.
    assert_eq!(fx.fetch.archive_calls.load(Ordering::SeqCst), 1);
    assert_eq!(fx.fetch.asset_calls.load(Ordering::SeqCst), 1);
    assert!(fx.handler.handled.lock().unwrap().is_empty());
    assert!(!fx.settings.downloads_dir().join("alpha.zip").exists());
}

#[tokio::test]
async fn download_of_unknown_module_is_a_noop() {
    let fx = fixture(vec![], false);
    seed_snapshot(&fx.settings, &[module_record("alpha")]);

    fx.manager.download("unknown").await.unwrap();

    assert_eq!(fx.fetch.archive_calls.load(Ordering::SeqCst), 0);
    assert!(fx.handler.handled.lock().unwrap().is_empty());
}

#[tokio::test]
async fn staged_archive_is_removed_even_when_the_handler_fails() {
    let fx = fixture(vec![], true);
    let record = module_record("alpha");
    seed_snapshot(&fx.settings, &[record.clone()]);
    fx.fetch
        .script_archive(&record.archive_url, Scripted::ok(200, "PK\x03\x04zipbytes"));

    let result = fx.manager.download("alpha").await;
    assert!(matches!(result, Err(UpgradeError::Extraction { .. })));

    let handled = fx.handler.handled.lock().unwrap();
    assert_eq!(handled.len(), 1);
    assert!(!handled[0].0.exists());
}
