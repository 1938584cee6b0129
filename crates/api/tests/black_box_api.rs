use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{json, Value};

use castle_api::app::{build_app, AppServices};
use castle_auth::{AdministratorMarker, PrincipalId, TokenTtls};

const SECRET: &str = "black-box-secret";

struct TestServer {
    base_url: String,
    services: Arc<AppServices>,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, bound to an ephemeral port.
        let services = Arc::new(AppServices::in_memory(SECRET, TokenTtls::default()));
        let app = build_app(services.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}/api/v1", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            services,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn register(&self, username: &str) -> PrincipalId {
        let res = self
            .client
            .post(self.url("/users/register"))
            .json(&json!({
                "username": username,
                "password": "password123",
                "email": format!("{username}@example.com"),
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let body: Value = res.json().await.unwrap();
        PrincipalId::new(body["id"].as_i64().unwrap())
    }

    /// Returns (access, refresh).
    async fn login(&self, username: &str) -> (String, String) {
        let res = self
            .client
            .post(self.url("/users/login"))
            .json(&json!({ "username": username, "password": "password123" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = res.json().await.unwrap();
        (
            body["access_token"].as_str().unwrap().to_string(),
            body["refresh_token"].as_str().unwrap().to_string(),
        )
    }

    async fn get(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap()
    }

    async fn make_admin(&self, id: PrincipalId) {
        self.services
            .accounts
            .grant_administrator(AdministratorMarker { id, security_level: 1 })
            .await
            .unwrap();
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(secret: &str, sub: &str, role: Option<&str>, exp_offset: ChronoDuration) -> String {
    let now = Utc::now();
    let mut claims = json!({
        "sub": sub,
        "iat": now.timestamp(),
        "exp": (now + exp_offset).timestamp(),
    });
    if let Some(role) = role {
        claims["role"] = json!(role);
    }

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("failed to encode jwt")
}

#[tokio::test]
async fn missing_token_gets_generic_401() {
    let server = TestServer::spawn().await;
    let res = server.client.get(server.url("/whoami")).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "error": "unauthorized", "message": "permission denied" }));
}

#[tokio::test]
async fn register_login_whoami() {
    let server = TestServer::spawn().await;
    let id = server.register("alice").await;
    let (access, _) = server.login("alice").await;

    let res = server.get("/whoami", &access).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["principal_id"], json!(id.get()));
    assert_eq!(body["role"], "user");

    let res = server.get(&format!("/users/{}", id), &access).await;
    let account: Value = res.json().await.unwrap();
    assert_eq!(account["username"], "alice");
    assert!(account.get("passwordHash").is_none());
    assert!(account.get("password").is_none());
}

#[tokio::test]
async fn duplicate_registration_conflicts_and_bad_password_is_rejected() {
    let server = TestServer::spawn().await;
    server.register("alice").await;

    let res = server
        .client
        .post(server.url("/users/register"))
        .json(&json!({ "username": "alice", "password": "password123", "email": "other@example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = server
        .client
        .post(server.url("/users/login"))
        .json(&json!({ "username": "alice", "password": "wrong-password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn administrator_routes_need_administrator_role() {
    let server = TestServer::spawn().await;
    let id = server.register("alice").await;
    let (access, refresh) = server.login("alice").await;

    assert_eq!(server.get("/users", &access).await.status(), StatusCode::FORBIDDEN);

    // The role inside an access token is fixed; a refresh picks up the new marker.
    server.make_admin(id).await;
    assert_eq!(server.get("/users", &access).await.status(), StatusCode::FORBIDDEN);

    let res = server
        .client
        .post(server.url("/users/refresh"))
        .bearer_auth(&refresh)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    let admin_access = body["access_token"].as_str().unwrap().to_string();

    let res = server.get("/users", &admin_access).await;
    assert_eq!(res.status(), StatusCode::OK);
    let users: Value = res.json().await.unwrap();
    assert_eq!(users.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn only_owner_or_administrator_may_modify_an_account() {
    let server = TestServer::spawn().await;
    let alice = server.register("alice").await;
    let bob = server.register("bob").await;
    let root = server.register("root").await;
    server.make_admin(root).await;

    let (bob_access, _) = server.login("bob").await;
    let update = json!({ "username": "alice2", "password": "password123", "email": "alice2@example.com" });

    let res = server
        .client
        .put(server.url(&format!("/users/update/{}", alice)))
        .bearer_auth(&bob_access)
        .json(&update)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = server
        .client
        .delete(server.url(&format!("/users/delete/{}", alice)))
        .bearer_auth(&bob_access)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let (root_access, _) = server.login("root").await;
    let res = server
        .client
        .put(server.url(&format!("/users/update/{}", alice)))
        .bearer_auth(&root_access)
        .json(&update)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = server
        .client
        .put(server.url(&format!("/users/update/{}", bob)))
        .bearer_auth(&bob_access)
        .json(&json!({ "username": "bobby", "password": "password123", "email": "bob@example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["username"], "bobby");
}

#[tokio::test]
async fn logout_revokes_access_and_refresh_tokens() {
    let server = TestServer::spawn().await;
    server.register("alice").await;
    let (access, refresh) = server.login("alice").await;

    let res = server
        .client
        .post(server.url("/users/logout"))
        .bearer_auth(&access)
        .json(&json!({ "refresh_token": refresh }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    assert_eq!(server.get("/whoami", &access).await.status(), StatusCode::UNAUTHORIZED);

    let res = server
        .client
        .post(server.url("/users/refresh"))
        .bearer_auth(&refresh)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn access_token_cannot_refresh_and_refresh_token_cannot_pass_gate() {
    let server = TestServer::spawn().await;
    server.register("alice").await;
    let (access, refresh) = server.login("alice").await;

    let res = server
        .client
        .post(server.url("/users/refresh"))
        .bearer_auth(&access)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    assert_eq!(server.get("/whoami", &refresh).await.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn deleted_principal_token_stops_working() {
    let server = TestServer::spawn().await;
    let id = server.register("alice").await;
    let (access, _) = server.login("alice").await;

    let res = server
        .client
        .delete(server.url(&format!("/users/delete/{}", id)))
        .bearer_auth(&access)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    assert_eq!(server.get("/whoami", &access).await.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn forged_and_expired_tokens_are_rejected() {
    let server = TestServer::spawn().await;
    let id = server.register("alice").await;
    let sub = id.to_string();

    let foreign = mint_jwt("someone-elses-secret", &sub, Some("administrator"), ChronoDuration::minutes(10));
    assert_eq!(server.get("/whoami", &foreign).await.status(), StatusCode::UNAUTHORIZED);

    let expired = mint_jwt(SECRET, &sub, Some("user"), ChronoDuration::seconds(-1));
    assert_eq!(server.get("/whoami", &expired).await.status(), StatusCode::UNAUTHORIZED);

    let ghost = mint_jwt(SECRET, "999", Some("administrator"), ChronoDuration::minutes(10));
    assert_eq!(server.get("/users", &ghost).await.status(), StatusCode::UNAUTHORIZED);

    let valid = mint_jwt(SECRET, &sub, Some("user"), ChronoDuration::minutes(10));
    assert_eq!(server.get("/whoami", &valid).await.status(), StatusCode::OK);

    assert_eq!(server.get("/whoami", "not-a-jwt").await.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn organizer_marker_lifecycle() {
    let server = TestServer::spawn().await;
    let root = server.register("root").await;
    server.make_admin(root).await;
    let alice = server.register("alice").await;
    let (root_access, _) = server.login("root").await;

    let create = |id: i64| {
        server
            .client
            .post(server.url("/users/create-organizer"))
            .bearer_auth(&root_access)
            .json(&json!({ "id": id, "description": "amber tours" }))
            .send()
    };

    assert_eq!(create(999).await.unwrap().status(), StatusCode::NOT_FOUND);
    assert_eq!(create(alice.get()).await.unwrap().status(), StatusCode::CREATED);
    assert_eq!(create(alice.get()).await.unwrap().status(), StatusCode::CONFLICT);

    let res = server.get(&format!("/organizers/{}", alice), &root_access).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["description"], "amber tours");

    let (alice_access, _) = server.login("alice").await;
    let res = server.get("/whoami", &alice_access).await;
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["role"], "organizer");
}
