use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use harvester_engine::{
    dispatch, filename_from_url, DownloadService, FetchSettings, FsDownloadService,
    PassthroughTabs, PlatformError, PlatformMessage, ReqwestFetcher, SavePayload, TabOpener,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct MemoryDownloads {
    saved: Mutex<Vec<(SavePayload, String)>>,
}

#[async_trait::async_trait]
impl DownloadService for MemoryDownloads {
    async fn save(&self, payload: SavePayload, name: &str) -> Result<PathBuf, PlatformError> {
        self.saved.lock().unwrap().push((payload, name.to_string()));
        Ok(PathBuf::from(name))
    }
}

#[tokio::test]
async fn passthrough_hands_url_to_download_service() {
    let downloads = Arc::new(MemoryDownloads::default());
    let tabs = PassthroughTabs::new(downloads.clone(), Duration::from_millis(20));
    let url = "https://v.pinimg.com/videos/mc/720p/ab/cd/xy.mp4";

    tabs.open_background(url).await.unwrap();
    let failures = tabs.wait_idle().await;

    assert!(failures.is_empty());
    assert_eq!(tabs.pending(), 0);
    assert_eq!(
        *downloads.saved.lock().unwrap(),
        vec![(SavePayload::Url(url.to_string()), "xy.mp4".to_string())]
    );
}

struct RejectingDownloads;

#[async_trait::async_trait]
impl DownloadService for RejectingDownloads {
    async fn save(&self, _: SavePayload, _: &str) -> Result<PathBuf, PlatformError> {
        Err(PlatformError::Rejected("disk full".to_string()))
    }
}

struct StalledDownloads;

#[async_trait::async_trait]
impl DownloadService for StalledDownloads {
    async fn save(&self, _: SavePayload, name: &str) -> Result<PathBuf, PlatformError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(PathBuf::from(name))
    }
}

#[tokio::test]
async fn failed_passthrough_is_reported_by_wait_idle() {
    let tabs = PassthroughTabs::new(Arc::new(RejectingDownloads), Duration::from_millis(1));
    let url = "https://v.pinimg.com/videos/mc/720p/ab/cd/xy.mp4";

    tabs.open_background(url).await.unwrap();
    let failures = tabs.wait_idle().await;

    assert_eq!(failures.len(), 1);
    match &failures[0] {
        PlatformError::Passthrough { url: failed, reason } => {
            assert_eq!(failed, url);
            assert!(reason.contains("disk full"), "{reason}");
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(tabs.wait_idle().await.is_empty());
}

#[tokio::test]
async fn cancel_all_aborts_outstanding_passthroughs() {
    let tabs = PassthroughTabs::new(Arc::new(StalledDownloads), Duration::from_secs(3));

    tabs.open_background("https://v.pinimg.com/a.mp4").await.unwrap();
    tabs.open_background("https://v.pinimg.com/b.mp4").await.unwrap();
    tabs.cancel_all();
    let failures = tokio::time::timeout(Duration::from_secs(2), tabs.wait_idle())
        .await
        .expect("cancelled passthroughs finish promptly");

    assert!(failures.is_empty());
    assert_eq!(tabs.pending(), 0);
}

#[tokio::test]
async fn fs_service_fetches_urls_and_uniquifies() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/videos/clip.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![4u8; 64], "video/mp4"))
        .mount(&server)
        .await;
    let out = TempDir::new().unwrap();
    let service = FsDownloadService::new(
        out.path().to_path_buf(),
        Arc::new(ReqwestFetcher::new(FetchSettings::default())),
    );
    let url = format!("{}/videos/clip.mp4", server.uri());

    let first = service
        .save(SavePayload::Url(url.clone()), "clip.mp4")
        .await
        .unwrap();
    let second = service
        .save(SavePayload::Bytes(vec![1u8, 2, 3].into()), "clip.mp4")
        .await
        .unwrap();

    assert_eq!(first, out.path().join("clip.mp4"));
    assert_eq!(std::fs::read(&first).unwrap(), vec![4u8; 64]);
    assert_eq!(second, out.path().join("clip (1).mp4"));
}

#[tokio::test]
async fn fs_service_surfaces_fetch_failures() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();
    let service = FsDownloadService::new(
        out.path().to_path_buf(),
        Arc::new(ReqwestFetcher::new(FetchSettings::default())),
    );

    let err = service
        .save(SavePayload::Url(format!("{}/nothing.mp4", server.uri())), "x.mp4")
        .await
        .unwrap_err();

    assert!(matches!(err, PlatformError::Fetch(_)));
}

#[test]
fn messages_use_action_tag_on_the_wire() {
    let theme = PlatformMessage::SetTheme {
        theme: "dark".to_string(),
    };
    assert_eq!(theme.to_json().unwrap(), r#"{"action":"setTheme","theme":"dark"}"#);

    let parsed = PlatformMessage::from_json(
        r#"{"action":"openTabDownload","url":"https://v.pinimg.com/a.mp4"}"#,
    )
    .unwrap();
    assert_eq!(
        parsed,
        PlatformMessage::OpenTabDownload {
            url: "https://v.pinimg.com/a.mp4".to_string()
        }
    );
    assert!(PlatformMessage::from_json(r#"{"action":"reboot"}"#).is_err());
}

#[tokio::test]
async fn dispatch_routes_downloads_and_tabs() {
    let downloads = Arc::new(MemoryDownloads::default());
    let tabs = PassthroughTabs::new(downloads.clone(), Duration::ZERO);

    let saved = dispatch(
        PlatformMessage::Download {
            url: "https://i.pinimg.com/originals/a.jpg".to_string(),
            filename: "a.jpg".to_string(),
        },
        downloads.as_ref(),
        &tabs,
    )
    .await
    .unwrap();
    let opened = dispatch(
        PlatformMessage::OpenTabDownload {
            url: "https://v.pinimg.com/b.mp4".to_string(),
        },
        downloads.as_ref(),
        &tabs,
    )
    .await
    .unwrap();
    assert!(tabs.wait_idle().await.is_empty());

    assert_eq!(saved, Some(PathBuf::from("a.jpg")));
    assert_eq!(opened, None);
    assert_eq!(downloads.saved.lock().unwrap().len(), 2);
}

#[test]
fn filename_falls_back_for_bare_hosts() {
    assert_eq!(filename_from_url("https://v.pinimg.com/"), "download.bin");
    assert_eq!(filename_from_url("https://v.pinimg.com/a/b.webm?x=1"), "b.webm");
}
