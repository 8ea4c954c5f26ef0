use std::time::{Duration, Instant};

use harvester_engine::{FailureKind, FetchSettings, MediaFetcher, ReqwestFetcher};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn fetcher_returns_body_with_browser_identity_and_no_referer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/originals/a.jpg"))
        .and(header("user-agent", "pin-harvester-test"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![7u8; 2048], "image/jpeg"))
        .mount(&server)
        .await;

    let settings = FetchSettings {
        user_agent: "pin-harvester-test".to_string(),
        ..FetchSettings::default()
    };
    let fetcher = ReqwestFetcher::new(settings);
    let url = format!("{}/originals/a.jpg", server.uri());

    let output = fetcher
        .fetch(&url, &CancellationToken::new())
        .await
        .expect("fetch ok");
    assert_eq!(output.metadata.original_url, url);
    assert_eq!(output.metadata.final_url, url);
    assert_eq!(output.metadata.content_type.as_deref(), Some("image/jpeg"));
    assert_eq!(output.metadata.byte_len, 2048);
    assert_eq!(output.bytes.len(), 2048);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].headers.contains_key("referer"));
}

#[tokio::test]
async fn fetcher_fails_on_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fetcher = ReqwestFetcher::new(FetchSettings::default());
    let url = format!("{}/missing", server.uri());

    let err = fetcher.fetch(&url, &CancellationToken::new()).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(404));
}

#[tokio::test]
async fn fetcher_times_out_on_slow_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(250))
                .set_body_string("slow"),
        )
        .mount(&server)
        .await;

    let settings = FetchSettings {
        request_timeout: Duration::from_millis(50),
        ..FetchSettings::default()
    };
    let fetcher = ReqwestFetcher::new(settings);
    let url = format!("{}/slow", server.uri());

    let err = fetcher.fetch(&url, &CancellationToken::new()).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Timeout);
}

#[tokio::test]
async fn cancelling_aborts_the_in_flight_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stalled"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(5))
                .set_body_raw(vec![0u8; 4096], "image/png"),
        )
        .mount(&server)
        .await;

    let fetcher = ReqwestFetcher::new(FetchSettings::default());
    let url = format!("{}/stalled", server.uri());
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let err = fetcher.fetch(&url, &cancel).await.unwrap_err();

    assert!(err.is_cancelled());
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn cancelling_after_headers_lets_the_body_finish() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = vec![0u8; 4096];
        let _ = socket.read(&mut request).await.unwrap();
        socket
            .write_all(
                b"HTTP/1.1 200 OK\r\nContent-Type: image/jpeg\r\nContent-Length: 2048\r\n\r\n",
            )
            .await
            .unwrap();
        socket.write_all(&[1u8; 1024]).await.unwrap();
        socket.flush().await.unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        socket.write_all(&[2u8; 1024]).await.unwrap();
        socket.flush().await.unwrap();
    });

    let fetcher = ReqwestFetcher::new(FetchSettings::default());
    let url = format!("http://{addr}/originals/late.jpg");
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let output = fetcher.fetch(&url, &cancel).await.expect("body completes");

    assert!(cancel.is_cancelled());
    assert_eq!(output.bytes.len(), 2048);
    assert_eq!(output.bytes[2047], 2);
}

#[tokio::test]
async fn fetcher_rejects_too_large_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/large"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "video/mp4")
                .insert_header("Content-Length", "11")
                .set_body_string("01234567890"),
        )
        .mount(&server)
        .await;

    let settings = FetchSettings {
        max_bytes: 10,
        ..FetchSettings::default()
    };
    let fetcher = ReqwestFetcher::new(settings);
    let url = format!("{}/large", server.uri());

    let err = fetcher.fetch(&url, &CancellationToken::new()).await.unwrap_err();
    assert_eq!(
        err.kind,
        FailureKind::TooLarge {
            max_bytes: 10,
            actual: Some(11)
        }
    );
}

#[tokio::test]
async fn malformed_url_is_invalid() {
    let fetcher = ReqwestFetcher::new(FetchSettings::default());
    let err = fetcher
        .fetch("not a url", &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::InvalidUrl);
}
