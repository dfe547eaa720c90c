use http_client::{build_headers, ClientConfig, HttpClient, Transport, TransportError};
use mockito::Matcher;

#[tokio::test]
async fn post_sends_form_body_and_returns_bytes() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/")
        .match_header("content-type", "application/x-www-form-urlencoded")
        .match_body(Matcher::Exact("optType=ReadRealTimeData, pwd=secret".to_string()))
        .with_status(200)
        .with_body("{\"type\":14}")
        .create_async()
        .await;

    let client = HttpClient::new(ClientConfig::default()).expect("client");
    let url = format!("{}/", server.url());
    let bytes = client
        .post(&url, &[], "optType=ReadRealTimeData, pwd=secret")
        .await
        .expect("post");

    assert_eq!(bytes, b"{\"type\":14}");
    mock.assert_async().await;
}

#[tokio::test]
async fn post_forwards_custom_headers() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/")
        .match_header("x-forwarded-for", "5.8.8.8")
        .with_status(200)
        .with_body("ok")
        .create_async()
        .await;

    let client = HttpClient::new(ClientConfig::default()).expect("client");
    let url = format!("{}/", server.url());
    let headers = vec![("X-Forwarded-For".to_string(), "5.8.8.8".to_string())];
    client.post(&url, &headers, "").await.expect("post");

    mock.assert_async().await;
}

#[tokio::test]
async fn non_success_status_is_an_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/")
        .with_status(404)
        .create_async()
        .await;

    let client = HttpClient::new(ClientConfig::default()).expect("client");
    let url = format!("{}/", server.url());
    let err = client.post(&url, &[], "").await.expect_err("status");

    assert!(matches!(err, TransportError::Status { status: 404 }));
}

#[tokio::test]
async fn connection_refused_is_an_error() {
    let client = HttpClient::new(ClientConfig {
        timeout_ms: 500,
        connect_timeout_ms: 500,
    })
    .expect("client");

    // Port 1 on loopback has nothing listening.
    let result = client.post("http://127.0.0.1:1/", &[], "").await;
    assert!(result.is_err());
}

#[test]
fn caller_content_type_overrides_default() {
    let headers = vec![("Content-Type".to_string(), "text/plain".to_string())];
    let map = build_headers(&headers).expect("headers");
    assert_eq!(map.get("content-type").expect("content type"), "text/plain");

    let map = build_headers(&[]).expect("headers");
    assert_eq!(
        map.get("content-type").expect("content type"),
        "application/x-www-form-urlencoded"
    );
}

#[test]
fn invalid_header_name_is_rejected() {
    let headers = vec![("bad header".to_string(), "x".to_string())];
    assert!(matches!(
        build_headers(&headers),
        Err(TransportError::InvalidHeader(_))
    ));
}
