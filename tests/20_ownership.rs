mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::TestServer;

#[tokio::test]
async fn forms_belong_to_their_author() -> Result<()> {
    let server = TestServer::spawn().await?;
    let (author, author_token) = server.register("author").await?;
    let (_, other_token) = server.register("other").await?;

    let res = server
        .client
        .post(server.url("/form"))
        .bearer_auth(&author_token)
        .json(&json!({ "type": "feedback", "data": { "text": "great article" }, "author_id": author }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let form = res.json::<Value>().await?;
    let form_url = server.url(&format!("/form/{}", form["id"]));

    // Anyone with FORM-GET can read it
    let res = server.client.get(&form_url).bearer_auth(&other_token).send().await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = server
        .client
        .put(&form_url)
        .bearer_auth(&other_token)
        .json(&json!({ "type": "feedback", "data": { "text": "hijacked" }, "author_id": author }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = server.client.delete(&form_url).bearer_auth(&other_token).send().await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = server
        .client
        .put(&form_url)
        .bearer_auth(&author_token)
        .json(&json!({ "type": "feedback", "data": { "text": "edited" }, "author_id": author }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<Value>().await?["data"]["text"], "edited");

    let res = server.client.delete(&form_url).bearer_auth(&author_token).send().await?;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = server.client.get(&form_url).bearer_auth(&author_token).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn subscription_links_and_reports_follow_the_subscription_owner() -> Result<()> {
    let server = TestServer::spawn().await?;
    let (owner, owner_token) = server.register("owner").await?;
    let (stranger, stranger_token) = server.register("stranger").await?;

    let res = server
        .client
        .post(server.url("/subscription"))
        .bearer_auth(&owner_token)
        .json(&json!({ "email": "reader@example.com", "data": { "topics": ["css"] }, "author_id": owner }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let subscription = res.json::<Value>().await?;
    let subscription_id = subscription["id"].as_i64().unwrap_or_default();
    let hash = subscription["profile_link"]["hash"].as_str().unwrap_or_default().to_string();

    // The link made with the subscription is reachable by hash
    let res = server
        .client
        .get(server.url(&format!("/profile-link/{}", hash)))
        .bearer_auth(&stranger_token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let link = res.json::<Value>().await?;
    assert_eq!(link["profile_id"], subscription_id);

    // A stranger cannot hang links or reports on someone else's subscription
    let res = server
        .client
        .post(server.url("/profile-link"))
        .bearer_auth(&stranger_token)
        .json(&json!({ "author_id": stranger, "profile_id": subscription_id }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = server
        .client
        .post(server.url("/subscription-report"))
        .bearer_auth(&stranger_token)
        .json(&json!({ "path": "/css/flex", "author_id": stranger, "profile_id": subscription_id }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = server
        .client
        .post(server.url("/subscription-report"))
        .bearer_auth(&owner_token)
        .json(&json!({ "path": "/css/flex", "author_id": owner, "profile_id": subscription_id }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let report = res.json::<Value>().await?;

    let res = server
        .client
        .get(server.url("/subscription-report/%2Fcss%2Fflex"))
        .bearer_auth(&owner_token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<Value>().await?["id"], report["id"]);

    let report_url = server.url(&format!("/subscription-report/{}", report["id"]));
    let res = server.client.delete(&report_url).bearer_auth(&stranger_token).send().await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // Deleting the subscription takes its links and reports with it
    let res = server
        .client
        .delete(server.url(&format!("/subscription/{}", subscription_id)))
        .bearer_auth(&owner_token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = server
        .client
        .get(server.url(&format!("/profile-link/{}", hash)))
        .bearer_auth(&owner_token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = server.client.delete(&report_url).bearer_auth(&owner_token).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}
