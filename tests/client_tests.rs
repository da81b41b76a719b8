//! Tests for the queues and tracks services.
//!
//! These tests use a mock server to verify the requests that go out and the
//! way responses, failures and cancellation come back.

use std::time::Duration;

use reqwest::StatusCode;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use yamusic::{
    config::Config, error::ErrorKind, http::DecodeError, protocol::tracks, token::Token, Client,
};

fn envelope(result: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "invocationInfo": {
            "hostname": "music-stable-back-1",
            "req-id": "1562058479226171-1",
            "exec-duration-millis": 2
        },
        "result": result
    })
}

fn client_for(server: &MockServer) -> Client {
    client_with(server, None)
}

fn client_with(server: &MockServer, token: Option<&str>) -> Client {
    let token = token.map(|token| token.parse::<Token>().unwrap());
    let config = Config::new(token).with_base_url(&server.uri()).unwrap();
    Client::new(&config).unwrap()
}

/// Form-decoded value of `field` in the single request the server received.
async fn form_field(server: &MockServer, field: &str) -> Option<String> {
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    url::form_urlencoded::parse(&requests[0].body)
        .find(|(key, _)| key == field)
        .map(|(_, value)| value.into_owned())
}

// =============================================================================
// Queues
// =============================================================================

mod queues {
    use super::*;

    #[tokio::test]
    async fn test_list_preserves_server_order() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/queues"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(serde_json::json!({
                "queues": [
                    {"id": "5d2c1b0e8b5c6a0e3c000002", "modified": "2019-07-15T09:24:30.121Z"},
                    {"id": "5d2c1b0e8b5c6a0e3c000001", "modified": "2019-07-14T18:00:00.000Z"}
                ]
            }))))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let (response, raw) = client
            .queues()
            .list(&CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(raw.status, StatusCode::OK);
        assert!(response.is_ok());
        assert_eq!(response.invocation_info.hostname(), Some("music-stable-back-1"));

        let ids: Vec<_> = response.result.queues.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, ["5d2c1b0e8b5c6a0e3c000002", "5d2c1b0e8b5c6a0e3c000001"]);
    }

    #[tokio::test]
    async fn test_get_decodes_all_tracks() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/queues/5d2c1b0e8b5c6a0e3c000002"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(serde_json::json!({
                "tracks": [
                    {"trackId": "38633706", "albumId": "4766522", "from": "web-home"},
                    {"trackId": "2806532", "albumId": "295410", "from": "web-home"},
                    {"trackId": "111", "albumId": "222", "from": "web-search"},
                    {"trackId": "333", "albumId": "444", "from": "web-search"}
                ],
                "currentIndex": 2,
                "modified": "2019-07-15T09:24:30.121Z"
            }))))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let (response, _) = client
            .queues()
            .get(&CancellationToken::new(), "5d2c1b0e8b5c6a0e3c000002")
            .await
            .unwrap();

        let detail = response.result;
        assert_eq!(detail.tracks.len(), 4);
        assert_eq!(detail.tracks[0].track_id, "38633706");
        assert_eq!(detail.current_index, 2);
        assert_eq!(detail.current().unwrap().track_id, "111");
        assert!(detail.modified.is_some());
    }

    #[tokio::test]
    async fn test_sends_oauth_token() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/queues"))
            .and(header("authorization", "OAuth y0_test_token"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(envelope(serde_json::json!({"queues": []}))),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_with(&server, Some("y0_test_token"));
        let (response, _) = client
            .queues()
            .list(&CancellationToken::new())
            .await
            .unwrap();
        assert!(response.result.queues.is_empty());
    }
}

// =============================================================================
// Tracks
// =============================================================================

mod tracks_service {
    use super::*;

    #[tokio::test]
    async fn test_get_tracks_posts_comma_joined_ids() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/tracks"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(serde_json::json!([
                {"id": "2806532", "durationMs": 193000, "title": "Second", "type": "music"},
                {"id": "38633706", "durationMs": 225390, "title": "First", "version": "Radio Edit", "type": "music"}
            ]))))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let (response, _) = client
            .tracks()
            .get_tracks(&CancellationToken::new(), &["38633706", "2806532"])
            .await
            .unwrap();

        assert_eq!(
            form_field(&server, "track_ids").await.as_deref(),
            Some("38633706,2806532")
        );

        // Returned in a different order than requested.
        let by_id = tracks::by_id(&response.result);
        assert_eq!(by_id["38633706"].title, "First");
        assert_eq!(by_id["38633706"].version.as_deref(), Some("Radio Edit"));
        assert_eq!(by_id["2806532"].version, None);
    }

    #[tokio::test]
    async fn test_get_tracks_single_id() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/tracks"))
            .and(body_string("track_ids=42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(serde_json::json!([]))))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let ids = vec![String::from("42")];
        let (response, _) = client
            .tracks()
            .get_tracks(&CancellationToken::new(), &ids)
            .await
            .unwrap();
        assert!(response.result.is_empty());
    }

    #[tokio::test]
    async fn test_get_tracks_empty_batch_is_sent() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/tracks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "invocationInfo": {"req-id": "1"},
                "error": {"name": "validate", "message": "track_ids is empty"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let (response, _) = client
            .tracks()
            .get_tracks::<&str>(&CancellationToken::new(), &[])
            .await
            .unwrap();

        assert_eq!(form_field(&server, "track_ids").await.as_deref(), Some(""));
        assert_eq!(response.error().unwrap().name, "validate");
    }

    #[tokio::test]
    async fn test_get_download_info() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/tracks/38633706/download-info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(serde_json::json!([
                {"codec": "mp3", "bitrateInKbps": 192, "downloadInfoUrl": "https://storage.example/a"},
                {"codec": "mp3", "bitrateInKbps": 320, "downloadInfoUrl": "https://storage.example/b"},
                {"codec": "aac", "bitrateInKbps": 128, "downloadInfoUrl": "https://storage.example/c"}
            ]))))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let (response, raw) = client
            .tracks()
            .get_download_info(&CancellationToken::new(), "38633706")
            .await
            .unwrap();

        assert!(raw.url.path().ends_with("/tracks/38633706/download-info"));
        let variants = response.result;
        assert_eq!(variants.len(), 3);
        assert_eq!(variants[2].codec, "aac");
        assert_eq!(
            tracks::best_for_codec(&variants, "mp3").unwrap().download_info_url,
            "https://storage.example/b"
        );

        let requests = server.received_requests().await.unwrap();
        assert!(requests[0].body.is_empty());
        assert!(requests[0].headers.get("content-type").is_none());
    }
}

// =============================================================================
// Logical errors
// =============================================================================

mod logical_errors {
    use super::*;

    #[tokio::test]
    async fn test_error_body_with_200_is_not_raised() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/queues/missing"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "invocationInfo": {"hostname": "back-1", "req-id": "7", "exec-duration-millis": "1"},
                "error": {"name": "not-found", "message": "Queue not found"}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let (response, raw) = client
            .queues()
            .get(&CancellationToken::new(), "missing")
            .await
            .unwrap();

        assert_eq!(raw.status, StatusCode::OK);
        let error = response.error().unwrap();
        assert_eq!(error.name, "not-found");
        assert_eq!(error.message, "Queue not found");
        assert!(response.result.tracks.is_empty());

        let err = response.into_result().unwrap_err();
        assert_eq!(err.kind, ErrorKind::FailedPrecondition);
    }

    #[tokio::test]
    async fn test_error_body_with_status_is_decoded() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/tracks/0/download-info"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "error": {"name": "not-found", "message": "Track not found"}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let (response, raw) = client
            .tracks()
            .get_download_info(&CancellationToken::new(), "0")
            .await
            .unwrap();

        assert_eq!(raw.status, StatusCode::NOT_FOUND);
        assert_eq!(response.error().unwrap().message, "Track not found");
    }
}

// =============================================================================
// Failures
// =============================================================================

mod failures {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_server() {
        // Reserve a port, then release it so nothing is listening there.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);

        let config = Config::default()
            .with_base_url(&format!("http://{address}"))
            .unwrap();
        let client = Client::new(&config).unwrap();

        let err = client
            .queues()
            .list(&CancellationToken::new())
            .await
            .unwrap_err();
        assert!(!err.is_cancelled());
        assert_eq!(err.kind, ErrorKind::Unavailable);

        let err = client
            .tracks()
            .get_tracks(&CancellationToken::new(), &["1"])
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unavailable);
    }

    #[tokio::test]
    async fn test_invalid_json_response() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/queues"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>bad gateway</html>"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .queues()
            .list(&CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
        assert!(err.to_string().contains("200"));
    }

    #[tokio::test]
    async fn test_gateway_error_page_keeps_response() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/queues"))
            .respond_with(
                ResponseTemplate::new(502)
                    .insert_header("x-cache", "MISS")
                    .set_body_string("<html><body>502 Bad Gateway</body></html>"),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .queues()
            .list(&CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);

        let decode = err.downcast::<DecodeError>().unwrap();
        assert_eq!(decode.raw.status, StatusCode::BAD_GATEWAY);
        assert_eq!(decode.raw.headers["x-cache"], "MISS");
        assert_eq!(decode.raw.url.path(), "/queues");
        assert!(decode.source.is_syntax());
        assert!(std::error::Error::source(&err).unwrap().is::<serde_json::Error>());
    }

    #[tokio::test]
    async fn test_empty_body_yields_default_envelope() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/queues"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let (response, raw) = client
            .queues()
            .list(&CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(raw.status, StatusCode::NO_CONTENT);
        assert!(response.is_ok());
        assert!(response.result.queues.is_empty());
    }

    #[tokio::test]
    async fn test_unusable_base_url_fails_before_io() {
        let mut config = Config::default();
        config.base_url = Url::parse("mailto:music@example.com").unwrap();
        let client = Client::new(&config).unwrap();

        let err = client
            .queues()
            .get(&CancellationToken::new(), "abc")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);

        let err = client
            .tracks()
            .get_download_info(&CancellationToken::new(), "1")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn test_request_timeout() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/queues"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(envelope(serde_json::json!({"queues": []})))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let config = Config::default()
            .with_base_url(&server.uri())
            .unwrap()
            .with_timeout(Duration::from_millis(200));
        let client = Client::new(&config).unwrap();

        let err = client
            .queues()
            .list(&CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::DeadlineExceeded);
    }
}

// =============================================================================
// Cancellation
// =============================================================================

mod cancellation {
    use super::*;

    #[tokio::test]
    async fn test_cancel_during_exchange() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/tracks"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(envelope(serde_json::json!([])))
                    .set_delay(Duration::from_secs(10)),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let result = tokio::time::timeout(
            Duration::from_secs(2),
            client.tracks().get_tracks(&cancel, &["1", "2"]),
        )
        .await
        .expect("cancellation did not return promptly");

        assert!(result.unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_before_call() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(serde_json::json!([]))))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = client.queues().list(&cancel).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Cancelled);

        let err = client.queues().get(&cancel, "abc").await.unwrap_err();
        assert!(err.is_cancelled());

        let err = client
            .tracks()
            .get_download_info(&cancel, "1")
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_concurrent_calls_share_client() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/queues"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(envelope(serde_json::json!({"queues": []}))),
            )
            .expect(2)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/tracks/1/download-info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(serde_json::json!([]))))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let cancel = CancellationToken::new();
        let queues = client.queues();

        let (a, b, c) = tokio::join!(
            queues.list(&cancel),
            queues.list(&cancel),
            client.tracks().get_download_info(&cancel, "1"),
        );
        assert!(a.is_ok() && b.is_ok() && c.is_ok());
    }
}
