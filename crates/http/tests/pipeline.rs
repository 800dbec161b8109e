//! Request-pipeline behavior against a mock HTTP server.
//!
//! Covers the layered fallback chain (per-call hook, instance hook,
//! default), the response decision table end to end, and cancellation
//! through the composed sources.

use std::time::Duration;

use pretty_assertions::assert_eq;
use tether_core::{AbortProxy, Error, Meta};
use tether_http::{FetchOptions, HttpProvider, HttpProviderOptions, HttpQuery, Payload};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

async fn server_with(path_str: &str, template: ResponseTemplate) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(path_str))
        .respond_with(template)
        .mount(&server)
        .await;
    server
}

fn provider_for(server: &MockServer) -> HttpProvider {
    HttpProvider::new(
        HttpProviderOptions::new().base_url(server.uri().parse().expect("valid mock uri")),
    )
}

// ---------------------------------------------------------------------------
// Error fallback chain
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unhandled_non_success_fails_with_status_text() {
    let server = server_with("/broken", ResponseTemplate::new(503)).await;
    let provider = provider_for(&server);

    let err = provider
        .request("/broken", HttpQuery::get(), None, None, None)
        .await
        .unwrap_err();

    match err {
        Error::Transport {
            status,
            status_text,
            ..
        } => {
            assert_eq!(status, Some(503));
            assert_eq!(status_text, "Service Unavailable");
        }
        other => panic!("expected transport failure, got {other:?}"),
    }
}

#[tokio::test]
async fn non_standard_status_carries_numeric_status_text() {
    let server = server_with("/odd", ResponseTemplate::new(599)).await;

    let err = provider_for(&server)
        .request("/odd", HttpQuery::get(), None, None, None)
        .await
        .unwrap_err();

    match err {
        Error::Transport {
            status,
            status_text,
            ..
        } => {
            assert_eq!(status, Some(599));
            assert_eq!(status_text, "599");
        }
        other => panic!("expected transport failure, got {other:?}"),
    }
}

#[tokio::test]
async fn per_call_error_hook_wins_over_instance_hook() {
    let server = server_with("/broken", ResponseTemplate::new(500)).await;
    let provider = HttpProvider::new(
        HttpProviderOptions::new()
            .base_url(server.uri().parse().unwrap())
            .on_error(|_, _, _, _| async { Ok(Payload::Text("instance".to_owned())) }),
    );

    let options =
        FetchOptions::new().on_error(|_, _, _, _| async { Ok(Payload::Text("per-call".to_owned())) });
    let payload = provider
        .request("/broken", HttpQuery::get(), Some(options), None, None)
        .await
        .unwrap();

    assert_eq!(payload, Payload::Text("per-call".to_owned()));
}

#[tokio::test]
async fn instance_error_hook_recovers_when_no_per_call_hook() {
    let server = server_with("/broken", ResponseTemplate::new(404)).await;
    let provider = HttpProvider::new(
        HttpProviderOptions::new()
            .base_url(server.uri().parse().unwrap())
            .on_error(|_, _, response, _| async move {
                Ok(Payload::Text(format!("saw {}", response.status().as_u16())))
            }),
    );

    let payload = provider
        .request("/broken", HttpQuery::get(), None, None, None)
        .await
        .unwrap();

    assert_eq!(payload, Payload::Text("saw 404".to_owned()));
}

// ---------------------------------------------------------------------------
// Response decision table, end to end
// ---------------------------------------------------------------------------

#[tokio::test]
async fn json_content_type_yields_structured_payload() {
    // set_body_raw keeps the declared content type; set_body_string
    // would stamp text/plain over it.
    let template =
        ResponseTemplate::new(200).set_body_raw(r#"{"id": 7, "name": "widget"}"#, "application/json");
    let server = server_with("/item", template).await;

    let payload = provider_for(&server)
        .request("/item", HttpQuery::get(), None, None, None)
        .await
        .unwrap();

    assert_eq!(
        payload,
        Payload::Json(serde_json::json!({"id": 7, "name": "widget"}))
    );
}

#[tokio::test]
async fn plain_text_yields_raw_text_payload() {
    let template = ResponseTemplate::new(200)
        .insert_header("content-type", "text/plain")
        .set_body_string("hello");
    let server = server_with("/greeting", template).await;

    let payload = provider_for(&server)
        .request("/greeting", HttpQuery::get(), None, None, None)
        .await
        .unwrap();

    assert_eq!(payload, Payload::Text("hello".to_owned()));
}

#[tokio::test]
async fn no_text_without_json_is_unprocessable() {
    let template = ResponseTemplate::new(200)
        .insert_header("content-type", "text/plain")
        .set_body_string("hello");
    let server = server_with("/greeting", template).await;

    let err = provider_for(&server)
        .request(
            "/greeting",
            HttpQuery::get(),
            Some(FetchOptions::new().no_text()),
            None,
            None,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Unprocessable));
}

#[tokio::test]
async fn per_call_response_hook_wins_over_instance_hook() {
    let template = ResponseTemplate::new(200).set_body_raw("{}", "application/json");
    let server = server_with("/item", template).await;

    let provider = HttpProvider::new(
        HttpProviderOptions::new()
            .base_url(server.uri().parse().unwrap())
            .on_response(|_, _, _, _| async { Ok(Payload::Text("instance".to_owned())) }),
    );
    let options = FetchOptions::new()
        .on_response(|_, _, _, _| async { Ok(Payload::Text("per-call".to_owned())) });

    let payload = provider
        .request("/item", HttpQuery::get(), Some(options), None, None)
        .await
        .unwrap();

    assert_eq!(payload, Payload::Text("per-call".to_owned()));
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread")]
async fn firing_proxy_mid_flight_fails_with_cancelled() {
    // The server would answer successfully, just far too late.
    let template = ResponseTemplate::new(200)
        .insert_header("content-type", "text/plain")
        .set_body_string("too late")
        .set_delay(Duration::from_secs(30));
    let server = server_with("/slow", template).await;
    let provider = provider_for(&server);

    let proxy = AbortProxy::new();
    let trigger = proxy.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.fire();
    });

    let err = tokio::time::timeout(
        Duration::from_secs(5),
        provider.request("/slow", HttpQuery::get(), None, None, Some(proxy)),
    )
    .await
    .expect("cancellation must not hang")
    .unwrap_err();

    assert!(err.is_cancelled(), "expected cancellation, got {err:?}");
}

#[tokio::test(flavor = "multi_thread")]
async fn query_embedded_abort_token_joins_the_composition() {
    let template = ResponseTemplate::new(200).set_delay(Duration::from_secs(30));
    let server = server_with("/slow", template).await;
    let provider = provider_for(&server);

    let token = CancellationToken::new();
    let query = HttpQuery::get().abort(token.clone());
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = tokio::time::timeout(
        Duration::from_secs(5),
        provider.request("/slow", query, None, None, None),
    )
    .await
    .expect("cancellation must not hang")
    .unwrap_err();

    assert!(err.is_cancelled());
}

#[tokio::test(flavor = "multi_thread")]
async fn firing_proxy_during_body_read_fails_with_cancelled() {
    // Status line, headers, and a body prefix arrive; then the server
    // stalls without ever completing the declared content length.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stall server");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        let mut head = [0u8; 1024];
        let _ = socket.read(&mut head).await;
        socket
            .write_all(
                b"HTTP/1.1 200 OK\r\ncontent-type: text/plain\r\ncontent-length: 1000\r\n\r\npartial",
            )
            .await
            .expect("write response head");
        tokio::time::sleep(Duration::from_secs(30)).await;
    });

    let provider = HttpProvider::new(
        HttpProviderOptions::new().base_url(format!("http://{addr}").parse().unwrap()),
    );
    let proxy = AbortProxy::new();
    let trigger = proxy.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.fire();
    });

    let err = tokio::time::timeout(
        Duration::from_secs(5),
        provider.request("/stall", HttpQuery::get(), None, None, Some(proxy)),
    )
    .await
    .expect("cancellation must not hang")
    .unwrap_err();

    assert!(err.is_cancelled(), "expected cancellation, got {err:?}");
}

#[tokio::test]
async fn proxy_fired_before_send_fails_without_exchange() {
    let server = server_with("/item", ResponseTemplate::new(200)).await;
    let provider = provider_for(&server);

    let proxy = AbortProxy::new();
    proxy.fire();

    let err = provider
        .request("/item", HttpQuery::get(), None, None, Some(proxy))
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
}

// ---------------------------------------------------------------------------
// modify_request and Meta threading
// ---------------------------------------------------------------------------

#[tokio::test]
async fn modify_request_mutates_headers_before_send() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/secured"))
        .and(header("authorization", "Bearer sesame"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/plain")
                .set_body_string("ok"),
        )
        .mount(&server)
        .await;

    let provider = HttpProvider::new(
        HttpProviderOptions::new()
            .base_url(server.uri().parse().unwrap())
            .on_request(|_url, mut spec, _meta| async move {
                spec.headers.insert(
                    reqwest::header::AUTHORIZATION,
                    reqwest::header::HeaderValue::from_static("Bearer sesame"),
                );
                Ok(spec)
            }),
    );

    let payload = provider
        .request("/secured", HttpQuery::get(), None, None, None)
        .await
        .unwrap();
    assert_eq!(payload, Payload::Text("ok".to_owned()));
}

#[tokio::test]
async fn one_meta_instance_is_shared_across_hooks() {
    let template = ResponseTemplate::new(200)
        .insert_header("content-type", "text/plain")
        .set_body_string("body");
    let server = server_with("/item", template).await;

    let provider = HttpProvider::new(
        HttpProviderOptions::new()
            .base_url(server.uri().parse().unwrap())
            .on_request(|_url, spec, meta| async move {
                meta.insert("stamped", true);
                Ok(spec)
            })
            .on_response(|_, _, _, meta| async move {
                assert_eq!(meta.get("stamped"), Some(serde_json::Value::Bool(true)));
                Ok(Payload::Text("meta intact".to_owned()))
            }),
    );

    let meta = Meta::new();
    let payload = provider
        .request("/item", HttpQuery::get(), None, Some(meta.clone()), None)
        .await
        .unwrap();

    assert_eq!(payload, Payload::Text("meta intact".to_owned()));
    assert_eq!(meta.get("stamped"), Some(serde_json::Value::Bool(true)));
}

#[tokio::test]
async fn modify_request_failure_propagates_as_hook_error() {
    let server = server_with("/item", ResponseTemplate::new(200)).await;

    let provider = HttpProvider::new(
        HttpProviderOptions::new()
            .base_url(server.uri().parse().unwrap())
            .on_request(|_url, _spec, _meta| async {
                Err::<tether_http::RequestSpec, tether_core::BoxError>("credentials missing".into())
            }),
    );

    let err = provider
        .request("/item", HttpQuery::get(), None, None, None)
        .await
        .unwrap_err();

    match err {
        Error::Hook(source) => assert_eq!(source.to_string(), "credentials missing"),
        other => panic!("expected hook failure, got {other:?}"),
    }
}

#[tokio::test]
async fn search_params_are_appended_to_the_resolved_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/list"))
        .and(wiremock::matchers::query_param("page", "2"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/plain")
                .set_body_string("page two"),
        )
        .mount(&server)
        .await;

    let payload = provider_for(&server)
        .request("/list", HttpQuery::get().param("page", "2"), None, None, None)
        .await
        .unwrap();
    assert_eq!(payload, Payload::Text("page two".to_owned()));
}
