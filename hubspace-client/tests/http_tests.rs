use hubspace_client::{
    Document, HubConfig, HubError, IndexSpec, InstanceId, Query, Session, SpaceId, field,
};
use hubspace_crypto::{Credential, Identity, resolve_signed_credential, resolve_static_credential};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn mock_config(server: &MockServer) -> HubConfig {
    HubConfig {
        api_base_url: server.uri(),
        timeout_secs: 5,
        ..Default::default()
    }
}

fn credential() -> Credential {
    resolve_static_credential("app", "s3cret").unwrap()
}

fn identity() -> Identity {
    Identity::from_seed(&[7; 32])
}

async fn mount_verify(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/v1/credentials/verify"))
        .respond_with(ResponseTemplate::new(204))
        .mount(server)
        .await;
}

async fn mount_token(server: &MockServer, identity: &Identity, token: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/tokens/challenge"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "c1",
            "nonce": "sign-me"
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/tokens"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": token,
            "identity": identity.public().to_string()
        })))
        .mount(server)
        .await;
}

fn space_json(id: SpaceId, owner: &Identity) -> serde_json::Value {
    json!({
        "id": id.to_string(),
        "name": "blog",
        "created_at": "2024-01-01T00:00:00Z",
        "owner": owner.public().to_string(),
        "peers": 3,
        "addresses": ["/dns4/hub.example/tcp/443"]
    })
}

// ── Config ──────────────────────────────────────────────────────

#[test]
fn transport_rejects_bad_base_url() {
    let config = HubConfig {
        api_base_url: "ftp://hub".to_string(),
        ..Default::default()
    };
    assert!(matches!(
        hubspace_client::HttpTransport::new(config),
        Err(HubError::Configuration(_))
    ));
}

// ── Credentials ─────────────────────────────────────────────────

#[tokio::test]
async fn connect_sends_static_credential_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/credentials/verify"))
        .and(header("x-hub-key", "app"))
        .and(header("x-hub-secret", "s3cret"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    Session::connect_with_config(mock_config(&server), credential())
        .await
        .unwrap();
}

#[tokio::test]
async fn connect_sends_signed_credential_headers() {
    let server = MockServer::start().await;
    let id = identity();
    let credential =
        resolve_signed_credential("app", "s3cret", &id, Duration::from_secs(60)).unwrap();
    let Credential::Signed(signed) = &credential else {
        panic!("expected signed credential");
    };

    Mock::given(method("GET"))
        .and(path("/v1/credentials/verify"))
        .and(header("x-hub-key", "app"))
        .and(header("x-hub-sig", signed.signature()))
        .and(header("x-hub-sig-msg", signed.signed_message()))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    Session::connect_with_config(mock_config(&server), credential.clone())
        .await
        .unwrap();
}

#[tokio::test]
async fn rejected_credential_is_authentication_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/credentials/verify"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "message": "bad secret" })),
        )
        .mount(&server)
        .await;

    let err = Session::connect_with_config(mock_config(&server), credential())
        .await
        .unwrap_err();
    assert!(matches!(err, HubError::Authentication(ref m) if m == "bad secret"));
}

#[tokio::test]
async fn unreachable_hub_is_network_error() {
    let config = HubConfig {
        api_base_url: "http://127.0.0.1:1".to_string(),
        timeout_secs: 2,
        ..Default::default()
    };
    let err = Session::connect_with_config(config, credential())
        .await
        .unwrap_err();
    assert!(err.is_retryable());
}

// ── Tokens ──────────────────────────────────────────────────────

#[tokio::test]
async fn token_is_presented_as_bearer() {
    let server = MockServer::start().await;
    let id = identity();
    mount_verify(&server).await;
    mount_token(&server, &id, "tok-1").await;

    let space = SpaceId::from_seed(b"blog");
    Mock::given(method("POST"))
        .and(path("/v1/spaces"))
        .and(header("authorization", "Bearer tok-1"))
        .and(header("x-hub-key", "app"))
        .and(body_json(json!({ "id": space.to_string(), "name": "blog" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(space_json(space, &id)))
        .expect(1)
        .mount(&server)
        .await;

    let session = Session::connect_with_config(mock_config(&server), credential())
        .await
        .unwrap();
    let user = session.authorize(&id).await.unwrap();
    let handle = user.create_space(Some("blog"), Some(b"blog")).await.unwrap();
    assert_eq!(handle.id(), space);
}

#[tokio::test]
async fn token_for_other_identity_is_protocol_error() {
    let server = MockServer::start().await;
    mount_verify(&server).await;
    mount_token(&server, &Identity::from_seed(&[9; 32]), "tok-x").await;

    let session = Session::connect_with_config(mock_config(&server), credential())
        .await
        .unwrap();
    assert!(matches!(
        session.issue_token(&identity()).await,
        Err(HubError::Protocol(_))
    ));
}

#[tokio::test]
async fn rejected_token_is_reissued_and_call_retried() {
    let server = MockServer::start().await;
    let id = identity();
    mount_verify(&server).await;

    Mock::given(method("POST"))
        .and(path("/v1/tokens/challenge"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "c1",
            "nonce": "sign-me"
        })))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/tokens"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "tok",
            "identity": id.public().to_string()
        })))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/spaces"))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/spaces"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "spaces": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let session = Session::connect_with_config(mock_config(&server), credential())
        .await
        .unwrap();
    let user = session.authorize(&id).await.unwrap();
    assert!(user.list_spaces().await.unwrap().is_empty());
}

#[tokio::test]
async fn second_rejection_is_surfaced() {
    let server = MockServer::start().await;
    let id = identity();
    mount_verify(&server).await;
    mount_token(&server, &id, "tok").await;
    Mock::given(method("GET"))
        .and(path("/v1/spaces"))
        .respond_with(ResponseTemplate::new(403))
        .expect(2)
        .mount(&server)
        .await;

    let session = Session::connect_with_config(mock_config(&server), credential())
        .await
        .unwrap();
    let user = session.authorize(&id).await.unwrap();
    assert!(user.list_spaces().await.unwrap_err().is_auth());
}

// ── Spaces and collections ──────────────────────────────────────

#[tokio::test]
async fn list_spaces_sorts_by_id() {
    let server = MockServer::start().await;
    let id = identity();
    mount_verify(&server).await;
    mount_token(&server, &id, "tok").await;

    let (x, y) = (SpaceId::from_seed(b"one"), SpaceId::from_seed(b"two"));
    let (a, b) = (x.min(y), x.max(y));
    Mock::given(method("GET"))
        .and(path("/v1/spaces"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "spaces": [space_json(b, &id), space_json(a, &id)]
        })))
        .mount(&server)
        .await;

    let session = Session::connect_with_config(mock_config(&server), credential())
        .await
        .unwrap();
    let user = session.authorize(&id).await.unwrap();
    let spaces = user.list_spaces().await.unwrap();
    assert_eq!(spaces.iter().map(|s| s.id).collect::<Vec<_>>(), vec![a, b]);
    assert_eq!(spaces[0].peers, 3);
}

#[tokio::test]
async fn missing_space_is_not_found() {
    let server = MockServer::start().await;
    let id = identity();
    mount_verify(&server).await;
    mount_token(&server, &id, "tok").await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/v1/spaces/[0-9a-f-]+$"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such space"))
        .mount(&server)
        .await;

    let session = Session::connect_with_config(mock_config(&server), credential())
        .await
        .unwrap();
    let user = session.authorize(&id).await.unwrap();
    let err = user.open_space(SpaceId::random()).await.unwrap_err();
    assert!(matches!(err, HubError::NotFound(ref m) if m == "no such space"));
}

#[tokio::test]
async fn list_indexes_decodes_paths() {
    let server = MockServer::start().await;
    let id = identity();
    let space = SpaceId::from_seed(b"s");
    mount_verify(&server).await;
    mount_token(&server, &id, "tok").await;
    Mock::given(method("GET"))
        .and(path(format!("/v1/spaces/{space}/collections/Post/indexes")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "indexes": [{ "path": "title", "unique": true }, { "path": "author" }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v1/spaces/{space}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(space_json(space, &id)))
        .mount(&server)
        .await;

    let session = Session::connect_with_config(mock_config(&server), credential())
        .await
        .unwrap();
    let user = session.authorize(&id).await.unwrap();
    let handle = user.open_space(space).await.unwrap();
    assert_eq!(
        handle.list_indexes("Post").await.unwrap(),
        vec![IndexSpec::unique("title"), IndexSpec::new("author")]
    );
}

// ── Instances ───────────────────────────────────────────────────

async fn posts_fixture(server: &MockServer) -> hubspace_client::CollectionHandle {
    let id = identity();
    let space = SpaceId::from_seed(b"s");
    mount_verify(server).await;
    mount_token(server, &id, "tok").await;
    Mock::given(method("GET"))
        .and(path(format!("/v1/spaces/{space}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(space_json(space, &id)))
        .mount(server)
        .await;

    let session = Session::connect_with_config(mock_config(server), credential())
        .await
        .unwrap();
    let user = session.authorize(&id).await.unwrap();
    user.open_space(space).await.unwrap().collection("Post")
}

#[tokio::test]
async fn create_returns_hub_ids() {
    let server = MockServer::start().await;
    let space = SpaceId::from_seed(b"s");
    Mock::given(method("POST"))
        .and(path(format!("/v1/spaces/{space}/collections/Post/instances")))
        .and(body_json(json!({ "instances": [{ "_id": "", "title": "hi" }] })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "ids": ["01-assigned"] })))
        .expect(1)
        .mount(&server)
        .await;

    let posts = posts_fixture(&server).await;
    let doc = Document::from_value(json!({ "_id": "", "title": "hi" })).unwrap();
    let ids = posts.create(&[doc]).await.unwrap();
    assert_eq!(ids, vec!["01-assigned".parse::<InstanceId>().unwrap()]);
}

#[tokio::test]
async fn create_with_wrong_id_count_is_protocol_error() {
    let server = MockServer::start().await;
    let space = SpaceId::from_seed(b"s");
    Mock::given(method("POST"))
        .and(path(format!("/v1/spaces/{space}/collections/Post/instances")))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "ids": [] })))
        .mount(&server)
        .await;

    let posts = posts_fixture(&server).await;
    let doc = Document::from_value(json!({ "title": "hi" })).unwrap();
    assert!(matches!(
        posts.create(&[doc]).await,
        Err(HubError::Protocol(_))
    ));
}

#[tokio::test]
async fn schema_violation_carries_reasons() {
    let server = MockServer::start().await;
    let space = SpaceId::from_seed(b"s");
    Mock::given(method("POST"))
        .and(path(format!("/v1/spaces/{space}/collections/Post/instances")))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "code": "schema_violation",
            "message": "instance violates schema",
            "instance": "p1",
            "reasons": ["score: -1 is less than minimum 0"]
        })))
        .mount(&server)
        .await;

    let posts = posts_fixture(&server).await;
    let doc = Document::from_value(json!({ "_id": "p1", "score": -1 })).unwrap();
    match posts.create(&[doc]).await.unwrap_err() {
        HubError::SchemaViolation { instance, reasons } => {
            assert_eq!(instance, "p1");
            assert_eq!(reasons, vec!["score: -1 is less than minimum 0".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn conflict_is_already_exists() {
    let server = MockServer::start().await;
    let space = SpaceId::from_seed(b"s");
    Mock::given(method("POST"))
        .and(path(format!("/v1/spaces/{space}/collections/Post/instances")))
        .respond_with(ResponseTemplate::new(409))
        .mount(&server)
        .await;

    let posts = posts_fixture(&server).await;
    let doc = Document::from_value(json!({ "_id": "p1" })).unwrap();
    assert!(matches!(
        posts.create(&[doc]).await,
        Err(HubError::AlreadyExists(_))
    ));
}

#[tokio::test]
async fn find_sends_query_and_decodes_instances() {
    let server = MockServer::start().await;
    let space = SpaceId::from_seed(b"s");
    Mock::given(method("POST"))
        .and(path(format!("/v1/spaces/{space}/collections/Post/instances/find")))
        .and(body_json(json!({
            "query": { "kind": "field", "path": "age", "op": "eq", "value": 21 }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "instances": [{ "_id": "a", "age": 21 }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let posts = posts_fixture(&server).await;
    let found = posts.find(&field("age").eq(21)).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id(), Some("a"));
}

#[tokio::test]
async fn server_error_is_retryable_network_error() {
    let server = MockServer::start().await;
    let space = SpaceId::from_seed(b"s");
    Mock::given(method("POST"))
        .and(path(format!("/v1/spaces/{space}/collections/Post/instances/find")))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let posts = posts_fixture(&server).await;
    let err = posts.find(&Query::all()).await.unwrap_err();
    assert!(matches!(err, HubError::Network(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn undecodable_body_is_protocol_error() {
    let server = MockServer::start().await;
    let space = SpaceId::from_seed(b"s");
    Mock::given(method("POST"))
        .and(path(format!("/v1/spaces/{space}/collections/Post/instances/find")))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let posts = posts_fixture(&server).await;
    assert!(matches!(
        posts.find(&Query::all()).await,
        Err(HubError::Protocol(_))
    ));
}

#[tokio::test]
async fn delete_sends_ids() {
    let server = MockServer::start().await;
    let space = SpaceId::from_seed(b"s");
    Mock::given(method("DELETE"))
        .and(path(format!("/v1/spaces/{space}/collections/Post/instances")))
        .and(body_json(json!({ "ids": ["a", "b"] })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let posts = posts_fixture(&server).await;
    let ids: Vec<InstanceId> = vec!["a".parse().unwrap(), "b".parse().unwrap()];
    posts.delete(&ids).await.unwrap();
}
