// tests/note_http.rs
//
// note session publisher against a mock editor API.

use ai_news_publisher::generate::Article;
use ai_news_publisher::publish::note::NoteSession;
use ai_news_publisher::publish::session::SessionPublisher;
use ai_news_publisher::publish::PrimaryPublisher;
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn article() -> Article {
    Article {
        title: "AI Breakthrough: What It Means".into(),
        body: "Intro.\n\nDetails.".into(),
        source_item_id: "abc".into(),
    }
}

fn publisher(server: &MockServer) -> SessionPublisher<NoteSession> {
    let session = NoteSession::new("writer@example.com", SecretString::from("pw".to_string()), 5)
        .expect("http client")
        .with_base_url(&server.uri());
    SessionPublisher::new(session)
}

async fn mount_sign_in(server: &MockServer, times: u64) {
    Mock::given(method("POST"))
        .and(path("/api/v1/sessions/sign_in"))
        .and(body_partial_json(json!({ "login": "writer@example.com", "password": "pw" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "urlname": "writer" }
        })))
        .expect(times)
        .mount(server)
        .await;
}

async fn mount_draft(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/v1/text_notes"))
        .and(body_partial_json(json!({
            "name": "AI Breakthrough: What It Means",
            "body": "<p>Intro.</p><p>Details.</p>"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "data": { "id": 42, "key": "n1abc" }
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn signs_in_once_and_returns_the_public_url() {
    let server = MockServer::start().await;
    mount_sign_in(&server, 1).await;
    mount_draft(&server).await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/text_notes/42"))
        .and(body_partial_json(json!({ "status": "published" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": {} })))
        .expect(2)
        .mount(&server)
        .await;

    let p = publisher(&server);
    let url = p.publish(&article()).await.expect("published");
    assert_eq!(url, format!("{}/writer/n/n1abc", server.uri()));

    // session is reused for the second post
    p.publish(&article()).await.expect("published again");
}

#[tokio::test]
async fn session_cookie_from_sign_in_is_sent_with_the_draft() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/sessions/sign_in"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "_note_session_v5=s3cr3t; Path=/; HttpOnly")
                .set_body_json(json!({ "data": { "urlname": "writer" } })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/text_notes"))
        .and(header("cookie", "_note_session_v5=s3cr3t"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "data": { "id": 42, "key": "n1abc" }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/text_notes/42"))
        .and(header("cookie", "_note_session_v5=s3cr3t"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": {} })))
        .expect(1)
        .mount(&server)
        .await;

    let url = publisher(&server).publish(&article()).await.expect("published");
    assert_eq!(url, format!("{}/writer/n/n1abc", server.uri()));
}

#[tokio::test]
async fn note_url_from_the_publish_response_wins() {
    let server = MockServer::start().await;
    mount_sign_in(&server, 1).await;
    mount_draft(&server).await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/text_notes/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "note_url": "https://note.example/abc" }
        })))
        .mount(&server)
        .await;

    let url = publisher(&server).publish(&article()).await.expect("published");
    assert_eq!(url, "https://note.example/abc");
}

#[tokio::test]
async fn rejected_sign_in_is_an_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/sessions/sign_in"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/text_notes"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let err = publisher(&server).publish(&article()).await.unwrap_err();
    assert!(err.is_auth());
    assert_eq!(err.to_string(), "login failed: sign-in rejected with status 401");
}

#[tokio::test]
async fn expired_session_signs_in_again_on_the_next_post() {
    let server = MockServer::start().await;
    mount_sign_in(&server, 2).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/text_notes"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    let p = publisher(&server);
    assert!(p.publish(&article()).await.unwrap_err().is_auth());
    assert!(p.publish(&article()).await.unwrap_err().is_auth());
}

#[tokio::test]
async fn server_side_rejection_is_a_submission_error() {
    let server = MockServer::start().await;
    mount_sign_in(&server, 1).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/text_notes"))
        .respond_with(ResponseTemplate::new(422).set_body_string("body too long"))
        .mount(&server)
        .await;

    let err = publisher(&server).publish(&article()).await.unwrap_err();
    assert!(!err.is_auth());
    assert_eq!(
        err.to_string(),
        "submission rejected with status 422: body too long"
    );
}
