mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn register_sign_in_and_read_user() -> Result<()> {
    let server = common::ensure_server().await?;
    let (client, username) = common::user_client(server).await?;

    let res = client.get(server.url("/v1/user")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["username"], username.as_str());
    assert_eq!(body["data"]["isEmailVerified"], false);
    assert_eq!(body["data"]["isAdministrator"], false);
    Ok(())
}

#[tokio::test]
async fn sign_in_sets_http_only_session_cookies() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .post(server.url("/v1/user/sign-in"))
        .json(&json!({ "email": common::ADMIN_EMAIL, "password": common::ADMIN_PASSWORD }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let cookies: Vec<String> = res
        .headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok().map(str::to_string))
        .collect();
    assert!(cookies.iter().any(|c| c.starts_with("accessToken=") && c.contains("HttpOnly")));
    assert!(cookies.iter().any(|c| c.starts_with("refreshToken=") && c.contains("HttpOnly")));

    let body: Value = res.json().await?;
    assert_eq!(body["data"]["successful"], true);
    Ok(())
}

#[tokio::test]
async fn user_endpoints_require_a_session() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client.get(server.url("/v1/user")).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await?;
    assert_eq!(body["error"], true);
    assert_eq!(body["code"], "UNAUTHORIZED");
    Ok(())
}

#[tokio::test]
async fn sign_out_ends_the_session() -> Result<()> {
    let server = common::ensure_server().await?;
    let (client, _) = common::user_client(server).await?;

    let res = client.post(server.url("/v1/user/sign-out")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = client.get(server.url("/v1/user")).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // Signing out without a session still succeeds
    let res = reqwest::Client::new().post(server.url("/v1/user/sign-out")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn wrong_password_and_unknown_user_are_rejected() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .post(server.url("/v1/user/sign-in"))
        .json(&json!({ "username": common::ADMIN_USERNAME, "password": "not-the-password" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .post(server.url("/v1/user/sign-in"))
        .json(&json!({ "username": "nobody-at-all", "password": "not-the-password" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn registration_is_validated() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .post(server.url("/v1/user/register"))
        .json(&json!({ "username": "has spaces", "email": "not-an-email", "password": "short" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["field_errors"]["username"].is_string());
    assert!(body["field_errors"]["email"].is_string());
    assert!(body["field_errors"]["password"].is_string());

    let res = client
        .post(server.url("/v1/user/register"))
        .json(&json!({
            "username": common::ADMIN_USERNAME,
            "email": "someone-else@climbassist.test",
            "password": "long-enough"
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = client
        .post(server.url("/v1/user/sign-in"))
        .json(&json!({ "password": "long-enough" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn change_password_keeps_the_session() -> Result<()> {
    let server = common::ensure_server().await?;
    let (client, username) = common::user_client(server).await?;

    let res = client
        .post(server.url("/v1/user/change-password"))
        .json(&json!({ "currentPassword": "correct-horse", "newPassword": "battery-staple" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["username"], username.as_str());

    let res = client.get(server.url("/v1/user")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);

    common::sign_in(server, &common::session_client()?, &username, "battery-staple").await?;
    Ok(())
}

#[tokio::test]
async fn unverified_users_cannot_reset_passwords() -> Result<()> {
    let server = common::ensure_server().await?;
    let (_, username) = common::user_client(server).await?;

    let res = reqwest::Client::new()
        .post(server.url("/v1/user/send-password-reset-email"))
        .json(&json!({ "username": username }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = reqwest::Client::new()
        .post(server.url("/v1/user/resend-initial-verification-email"))
        .json(&json!({ "username": username }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn delete_user_removes_account_and_cookies() -> Result<()> {
    let server = common::ensure_server().await?;
    let (client, username) = common::user_client(server).await?;

    let res = client.delete(server.url("/v1/user")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = client.get(server.url("/v1/user")).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = reqwest::Client::new()
        .post(server.url("/v1/user/sign-in"))
        .json(&json!({ "username": username, "password": "correct-horse" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}
