mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::{TestServer, ADMIN_EMAIL, ADMIN_PASSWORD};

#[tokio::test]
async fn seeded_admin_can_log_in() -> Result<()> {
    let server = TestServer::spawn().await?;

    let res = server
        .client
        .post(server.url("/login"))
        .json(&json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body = res.json::<Value>().await?;
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()), "{}", body);
    assert_eq!(body["expires_in"], 3600);
    Ok(())
}

#[tokio::test]
async fn wrong_password_and_unknown_email_look_the_same() -> Result<()> {
    let server = TestServer::spawn().await?;

    for (email, password) in [(ADMIN_EMAIL, "nope"), ("ghost@example.com", ADMIN_PASSWORD)] {
        let res = server
            .client
            .post(server.url("/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(res.json::<Value>().await?, json!({ "error": "Incorrect Details" }));
    }
    Ok(())
}

#[tokio::test]
async fn login_validates_fields() -> Result<()> {
    let server = TestServer::spawn().await?;

    let res = server
        .client
        .post(server.url("/login"))
        .json(&json!({ "email": "not-an-email" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = res.json::<Value>().await?;
    assert_eq!(body["field_errors"]["email"], "Invalid Email");
    assert_eq!(body["field_errors"]["password"], "Required Password");
    Ok(())
}

#[tokio::test]
async fn issued_token_opens_protected_routes() -> Result<()> {
    let server = TestServer::spawn().await?;
    let (id, token) = server.register("reader").await?;

    let res = server
        .client
        .get(server.url(&format!("/user/{}", id)))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<Value>().await?["nickname"], "reader");
    Ok(())
}
