//! Requests dispatched through built sessions against a mock API server.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, StatusCode};
use rest_client::{
    AuthMethod, ClientFactory, ClientOptions, CommandName, Namespace, PluginRegistry, SessionBuilder,
    SessionError,
};
use serde_json::json;
use wiremock::matchers::{header, header_regex, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A minimal command, the way plugin crates write them.
struct Users {
    builder: Arc<SessionBuilder>,
}

impl Users {
    async fn list(&self) -> Result<serde_json::Value, SessionError> {
        let session = self.builder.build_session()?;
        let request = session.request(Method::GET, self.builder.build_url(&["users"]));
        let response = session.send(request).await?.error_for_status()?;
        Ok(response.json().await?)
    }
}

fn namespace() -> Namespace {
    Namespace::new("confd_client.commands").unwrap()
}

fn registry() -> PluginRegistry<SessionBuilder, Users> {
    let mut registry = PluginRegistry::new();
    registry.register(namespace(), CommandName::new("users").unwrap(), |builder| {
        Ok(Users { builder })
    });
    registry
}

fn options_for(server: &MockServer) -> ClientOptions {
    let address = server.address();
    ClientOptions::new().host(address.ip().to_string()).port(address.port())
}

#[tokio::test]
async fn token_header_is_sent_with_command_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/1.1/users"))
        .and(header("x-auth-token", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .expect(1)
        .mount(&server)
        .await;

    let factory = ClientFactory::new(namespace(), 9486, "1.1");
    let client = factory
        .new_client(options_for(&server).token("abc"), &registry())
        .unwrap();

    let body = client.command("users").unwrap().list().await.unwrap();
    assert_eq!(body, json!({"items": []}));
}

#[tokio::test]
async fn basic_credentials_are_sent_up_front() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("authorization", "Basic dTpw"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let factory = ClientFactory::new(namespace(), 9486, "1.1").auth_method(AuthMethod::Basic);
    let client = factory
        .new_client(options_for(&server).credentials("u", "p"), &registry())
        .unwrap();

    client.command("users").unwrap().list().await.unwrap();
}

#[tokio::test]
async fn digest_challenge_is_answered_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/1.1/users"))
        .and(header_regex("authorization", r#"^Digest .*username="u""#))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": ["alice"]})))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).insert_header(
            "WWW-Authenticate",
            r#"Digest realm="confd", qop="auth", nonce="dcd98b7102dd2f0e8b11d0f600bfb0c0", opaque="5ccc069c403ebaf9f0171e9517f40e41""#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let factory = ClientFactory::new(namespace(), 9486, "1.1").auth_method("digest");
    let client = factory
        .new_client(options_for(&server).credentials("u", "p"), &registry())
        .unwrap();

    let body = client.command("users").unwrap().list().await.unwrap();
    assert_eq!(body, json!({"items": ["alice"]}));
}

#[tokio::test]
async fn unanswerable_digest_response_is_returned_as_is() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).insert_header("WWW-Authenticate", r#"Basic realm="confd""#))
        .expect(1)
        .mount(&server)
        .await;

    let factory = ClientFactory::new(namespace(), 9486, "1.1").auth_method("digest");
    let client = factory
        .new_client(options_for(&server).credentials("u", "p"), &registry())
        .unwrap();
    let builder = client.session_builder();

    let session = builder.build_session().unwrap();
    let response = session
        .send(session.request(Method::GET, builder.build_url(&["users"])))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn session_timeout_bounds_slow_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let factory = ClientFactory::new(namespace(), 9486, "1.1");
    let client = factory
        .new_client(options_for(&server).timeout(Duration::from_millis(200)), &registry())
        .unwrap();

    let err = client.command("users").unwrap().list().await.unwrap_err();
    match err {
        SessionError::Transport(source) => assert!(source.is_timeout()),
        other => panic!("expected a timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn raw_transport_carries_session_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/1.1/users"))
        .and(header("x-auth-token", "abc"))
        .and(header("authorization", "Basic dTpw"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let factory = ClientFactory::new(namespace(), 9486, "1.1").auth_method("basic");
    let client = factory
        .new_client(
            options_for(&server).token("abc").credentials("u", "p"),
            &registry(),
        )
        .unwrap();
    let builder = client.session_builder();

    let session = builder.build_session().unwrap();
    let response = session
        .http_client()
        .get(builder.build_url(&["users"]))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn raw_transport_is_bounded_by_the_session_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let factory = ClientFactory::new(namespace(), 9486, "1.1");
    let client = factory
        .new_client(options_for(&server).timeout(Duration::from_millis(200)), &registry())
        .unwrap();
    let builder = client.session_builder();

    let session = builder.build_session().unwrap();
    let err = session
        .http_client()
        .get(builder.build_url(&["users"]))
        .send()
        .await
        .unwrap_err();
    assert!(err.is_timeout());
}
