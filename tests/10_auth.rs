mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::TestServer;

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let server = TestServer::spawn().await?;

    let res = server.client.get(server.url("/health")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);

    // Should be valid JSON
    let _body = res.json::<Value>().await?;
    Ok(())
}

#[tokio::test]
async fn resources_require_a_token() -> Result<()> {
    let server = TestServer::spawn().await?;

    for path in ["/user", "/form", "/subscription", "/profile-link", "/subscription-report"] {
        let res = server.client.get(server.url(path)).send().await?;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "GET {}", path);
        assert_eq!(res.json::<Value>().await?, json!({ "error": "Unauthorized" }));
    }
    Ok(())
}

#[tokio::test]
async fn garbage_tokens_are_unauthorized() -> Result<()> {
    let server = TestServer::spawn().await?;

    for header in ["Bearer not-a-jwt", "Basic YWRtaW46YWRtaW4=", "Bearer "] {
        let res = server
            .client
            .get(server.url("/form"))
            .header("Authorization", header)
            .send()
            .await?;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "header {:?}", header);
    }
    Ok(())
}

#[tokio::test]
async fn only_admins_create_accounts() -> Result<()> {
    let server = TestServer::spawn().await?;
    let (_, member) = server.register("member").await?;

    let res = server
        .client
        .post(server.url("/user"))
        .bearer_auth(&member)
        .json(&json!({ "nickname": "sneaky", "email": "sneaky@example.com", "password": "pw" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(res.json::<Value>().await?, json!({ "error": "Forbidden" }));
    Ok(())
}

#[tokio::test]
async fn duplicate_nickname_conflicts() -> Result<()> {
    let server = TestServer::spawn().await?;
    server.register("twin").await?;
    let admin = server.admin_token().await?;

    let res = server
        .client
        .post(server.url("/user"))
        .bearer_auth(&admin)
        .json(&json!({ "nickname": "twin", "email": "other@example.com", "password": "pw" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    assert_eq!(res.json::<Value>().await?["error"], "Nickname Already Taken");
    Ok(())
}

#[tokio::test]
async fn users_only_change_themselves() -> Result<()> {
    let server = TestServer::spawn().await?;
    let (alice, alice_token) = server.register("alice").await?;
    let (bob, _) = server.register("bob").await?;

    let res = server
        .client
        .delete(server.url(&format!("/user/{}", bob)))
        .bearer_auth(&alice_token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = server
        .client
        .put(server.url(&format!("/user/{}", alice)))
        .bearer_auth(&alice_token)
        .json(&json!({ "nickname": "alice2", "email": "alice2@example.com", "password": "new-password" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let user = res.json::<Value>().await?;
    assert_eq!(user["nickname"], "alice2");
    assert!(user.get("password").is_none());

    let res = server
        .client
        .delete(server.url(&format!("/user/{}", alice)))
        .bearer_auth(&alice_token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    Ok(())
}
