//! Account endpoints and their interaction with the refresh whitelist.

mod common;

use axum::http::{Method, StatusCode};
use common::{Call, PASSWORD, add_user, login, rotate, setup};
use serde_json::json;
use tokengate::db::UserRole;

fn delete_user<'a>(username: &str) -> Call<'a> {
    Call::new(Method::DELETE, "/api/user").json(json!({ "username": username }))
}

#[tokio::test]
async fn test_join_then_login() {
    let t = setup().await;

    let response = Call::post("/api/user/join")
        .json(json!({
            "username": "carol",
            "password": PASSWORD,
            "nickname": "Carol",
            "email": "carol@example.com"
        }))
        .send(&t.app)
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert!(response.body["userEntityId"].as_i64().unwrap() > 0);

    let response = Call::post("/api/user/exist")
        .json(json!({ "username": "carol" }))
        .send(&t.app)
        .await;
    assert_eq!(response.body, json!(true));

    let (access, _) = login(&t.app, "carol").await;
    let response = Call::get("/api/user/me").bearer(&access).send(&t.app).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["nickname"], "Carol");
    assert_eq!(response.body["email"], "carol@example.com");
    assert_eq!(response.body["role"], "user");
    assert_eq!(response.body["social"], false);
}

#[tokio::test]
async fn test_join_duplicate_conflicts() {
    let t = setup().await;
    add_user(&t.db, "alice", UserRole::User).await;

    let response = Call::post("/api/user/join")
        .json(json!({ "username": "alice", "password": PASSWORD }))
        .send(&t.app)
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_join_validation() {
    let t = setup().await;

    for body in [
        json!({ "username": "Bad Name", "password": PASSWORD }),
        json!({ "username": "", "password": PASSWORD }),
        json!({ "username": "dave", "password": "short" }),
        json!({ "username": "dave" }),
    ] {
        let response = Call::post("/api/user/join").json(body).send(&t.app).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
    }
    assert!(!t.db.users().exists("dave").await.unwrap());
}

#[tokio::test]
async fn test_update_profile() {
    let t = setup().await;
    add_user(&t.db, "alice", UserRole::User).await;
    let (access, _) = login(&t.app, "alice").await;

    let response = Call::new(Method::PUT, "/api/user/me")
        .bearer(&access)
        .json(json!({ "nickname": "Al", "email": "al@example.com" }))
        .send(&t.app)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["nickname"], "Al");

    let user = t.db.users().get_by_username("alice").await.unwrap().unwrap();
    assert_eq!(user.email.as_deref(), Some("al@example.com"));
}

#[tokio::test]
async fn test_update_profile_requires_auth() {
    let t = setup().await;

    let response = Call::new(Method::PUT, "/api/user/me")
        .json(json!({ "nickname": "x" }))
        .send(&t.app)
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_locked_account_profile_is_hidden() {
    let t = setup().await;
    add_user(&t.db, "alice", UserRole::User).await;
    let (access, _) = login(&t.app, "alice").await;

    t.db.users().set_locked("alice", true).await.unwrap();

    // The access token is still within its lifetime.
    let response = Call::get("/api/user/me").bearer(&access).send(&t.app).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = Call::new(Method::PUT, "/api/user/me")
        .bearer(&access)
        .json(json!({ "nickname": "x" }))
        .send(&t.app)
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    t.db.users().set_locked("alice", false).await.unwrap();
    let response = Call::get("/api/user/me").bearer(&access).send(&t.app).await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_delete_self_revokes_refresh_tokens() {
    let t = setup().await;
    add_user(&t.db, "alice", UserRole::User).await;
    let (access, refresh) = login(&t.app, "alice").await;
    let (_, other_device) = login(&t.app, "alice").await;

    let response = delete_user("alice").bearer(&access).send(&t.app).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    assert!(!t.db.users().exists("alice").await.unwrap());
    assert_eq!(rotate(&t.app, &refresh).await.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        rotate(&t.app, &other_device).await.status,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_delete_other_user_forbidden() {
    let t = setup().await;
    add_user(&t.db, "alice", UserRole::User).await;
    add_user(&t.db, "bob", UserRole::User).await;
    let (access, _) = login(&t.app, "alice").await;

    let response = delete_user("bob").bearer(&access).send(&t.app).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert!(t.db.users().exists("bob").await.unwrap());
}

#[tokio::test]
async fn test_admin_deletes_other_user() {
    let t = setup().await;
    add_user(&t.db, "root", UserRole::Admin).await;
    add_user(&t.db, "bob", UserRole::User).await;
    let (admin_access, _) = login(&t.app, "root").await;
    let (_, bob_refresh) = login(&t.app, "bob").await;

    let response = delete_user("bob").bearer(&admin_access).send(&t.app).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
    assert_eq!(
        rotate(&t.app, &bob_refresh).await.status,
        StatusCode::UNAUTHORIZED
    );

    let response = delete_user("bob").bearer(&admin_access).send(&t.app).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_requires_auth() {
    let t = setup().await;
    add_user(&t.db, "alice", UserRole::User).await;

    let response = delete_user("alice").send(&t.app).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_lookup_requires_admin() {
    let t = setup().await;
    add_user(&t.db, "root", UserRole::Admin).await;
    add_user(&t.db, "alice", UserRole::User).await;
    let (user_access, _) = login(&t.app, "alice").await;
    let (admin_access, _) = login(&t.app, "root").await;

    let response = Call::get("/api/admin/users/alice")
        .bearer(&user_access)
        .send(&t.app)
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = Call::get("/api/admin/users/alice")
        .bearer(&admin_access)
        .send(&t.app)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["username"], "alice");

    let response = Call::get("/api/admin/users/nobody")
        .bearer(&admin_access)
        .send(&t.app)
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_lock_revokes_sessions() {
    let t = setup().await;
    add_user(&t.db, "root", UserRole::Admin).await;
    add_user(&t.db, "alice", UserRole::User).await;
    let (admin_access, _) = login(&t.app, "root").await;
    let (_, alice_refresh) = login(&t.app, "alice").await;

    let response = Call::post("/api/admin/users/alice/lock")
        .bearer(&admin_access)
        .json(json!({ "locked": true }))
        .send(&t.app)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["locked"], true);

    assert_eq!(
        rotate(&t.app, &alice_refresh).await.status,
        StatusCode::UNAUTHORIZED
    );
    let response = Call::post("/login")
        .json(json!({ "username": "alice", "password": PASSWORD }))
        .send(&t.app)
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    // Unlock restores password login.
    Call::post("/api/admin/users/alice/lock")
        .bearer(&admin_access)
        .json(json!({ "locked": false }))
        .send(&t.app)
        .await;
    login(&t.app, "alice").await;
}
