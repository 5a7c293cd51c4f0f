mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

use common::TestServer;
use tcm_api::database::models::Role;

#[tokio::test]
async fn health_and_root_are_public() -> Result<()> {
    let server = TestServer::spawn().await?;

    let res = server.client.get(server.url("/health")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await?;
    assert_eq!(body["data"]["status"], "ok");

    let res = server.client.get(server.url("/")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn protected_routes_require_a_valid_token() -> Result<()> {
    let server = TestServer::spawn().await?;

    let res = server.client.get(server.url("/api/v1/projects")).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let (status, body) = server.get("/api/v1/projects", "not-a-jwt").await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
    Ok(())
}

#[tokio::test]
async fn login_rejects_wrong_password_and_duplicate_registration() -> Result<()> {
    let server = TestServer::spawn().await?;
    server.signup("alice", Role::User).await?;

    let res = server
        .client
        .post(server.url("/api/v1/auth/login"))
        .json(&json!({ "email": "alice@example.com", "password": "wrong-password" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = server
        .client
        .post(server.url("/api/v1/auth/register"))
        .json(&json!({
            "username": "alice2",
            "email": "alice@example.com",
            "password": common::PASSWORD,
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = server
        .client
        .post(server.url("/api/v1/auth/register"))
        .json(&json!({ "username": "bo", "email": "bo@example.com", "password": common::PASSWORD }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn project_lifecycle_for_the_owner() -> Result<()> {
    let server = TestServer::spawn().await?;
    let (alice_id, alice) = server.signup("alice", Role::User).await?;

    let (status, body) = server
        .post("/api/v1/projects", &alice, json!({ "name": "Checkout", "description": "Payment flows" }))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["owner_id"], alice_id);
    let id = body["data"]["id"].as_i64().unwrap();

    let (status, _) = server.post("/api/v1/projects", &alice, json!({ "name": "Checkout" })).await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = server.post("/api/v1/projects", &alice, json!({ "name": "ab" })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = server
        .put(&format!("/api/v1/projects/{}", id), &alice, json!({ "description": "Cards only" }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Checkout");
    assert_eq!(body["data"]["description"], "Cards only");

    let (status, _) = server.delete(&format!("/api/v1/projects/{}", id), &alice).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = server.get(&format!("/api/v1/projects/{}", id), &alice).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Project not found");
    Ok(())
}

#[tokio::test]
async fn grants_drive_view_and_edit_over_http() -> Result<()> {
    let server = TestServer::spawn().await?;
    let (_, alice) = server.signup("alice", Role::User).await?;
    let (bob_id, bob) = server.signup("bob", Role::Tester).await?;

    let (_, body) = server.post("/api/v1/projects", &alice, json!({ "name": "Checkout" })).await?;
    let id = body["data"]["id"].as_i64().unwrap();
    let project = format!("/api/v1/projects/{}", id);
    let access = format!("{}/access", project);

    let (status, _) = server.get(&project, &bob).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (_, body) = server.get("/api/v1/projects", &bob).await?;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);

    let (status, body) = server
        .post(&access, &alice, json!({ "user_id": bob_id, "level": "view" }))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    let grant_id = body["data"]["id"].as_i64().unwrap();

    let (status, _) = server
        .post(&access, &alice, json!({ "user_id": bob_id, "level": "edit" }))
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = server.get(&project, &bob).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = server.put(&project, &bob, json!({ "name": "Renamed" })).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (_, body) = server.get("/api/v1/projects", &bob).await?;
    assert_eq!(body["data"][0]["id"], id);

    // Grantees cannot manage access
    let (status, _) = server.get(&access, &bob).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let grant = format!("{}/{}", access, grant_id);
    let (status, body) = server.put(&grant, &alice, json!({ "level": "edit" })).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["level"], "edit");

    let (status, _) = server.put(&project, &bob, json!({ "name": "Renamed" })).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = server.delete(&project, &bob).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, body) = server.get("/api/v1/me/access", &bob).await?;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = server.delete(&grant, &alice).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = server.get(&project, &bob).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn self_grant_and_unknown_target_are_rejected() -> Result<()> {
    let server = TestServer::spawn().await?;
    let (alice_id, alice) = server.signup("alice", Role::User).await?;

    let (_, body) = server.post("/api/v1/projects", &alice, json!({ "name": "Checkout" })).await?;
    let access = format!("/api/v1/projects/{}/access", body["data"]["id"]);

    let (status, body) = server
        .post(&access, &alice, json!({ "user_id": alice_id, "level": "edit" }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["field_errors"]["user_id"].is_string());

    let (status, _) = server
        .post(&access, &alice, json!({ "user_id": 424242, "level": "view" }))
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = server
        .post("/api/v1/projects/424242/access", &alice, json!({ "user_id": alice_id, "level": "view" }))
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn admin_sees_everything_but_cannot_manage_grants() -> Result<()> {
    let server = TestServer::spawn().await?;
    let (_, alice) = server.signup("alice", Role::User).await?;
    let (bob_id, _) = server.signup("bob", Role::User).await?;
    let (_, admin) = server.signup("root", Role::Admin).await?;

    let (_, body) = server.post("/api/v1/projects", &alice, json!({ "name": "Checkout" })).await?;
    let id = body["data"]["id"].as_i64().unwrap();
    let project = format!("/api/v1/projects/{}", id);

    let (_, body) = server.get("/api/v1/projects", &admin).await?;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = server.get(&project, &admin).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = server.put(&project, &admin, json!({ "name": "Audited" })).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = server
        .post(&format!("{}/access", project), &admin, json!({ "user_id": bob_id, "level": "view" }))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = server.delete(&project, &admin).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn unparseable_paging_falls_back_to_defaults() -> Result<()> {
    let server = TestServer::spawn().await?;
    let (_, alice) = server.signup("alice", Role::User).await?;
    for i in 0..12 {
        server
            .post("/api/v1/projects", &alice, json!({ "name": format!("Project {:02}", i) }))
            .await?;
    }

    let (status, body) = server.get("/api/v1/projects?page=abc&page_size=-4", &alice).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 10);

    let (_, body) = server.get("/api/v1/projects?page=3&page_size=5", &alice).await?;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"][1]["name"], "Project 00");
    Ok(())
}

#[tokio::test]
async fn malformed_bodies_and_paths_are_400_with_error_envelope() -> Result<()> {
    let server = TestServer::spawn().await?;
    let (_, alice) = server.signup("alice", Role::User).await?;
    let (bob_id, _) = server.signup("bob", Role::User).await?;

    let (_, body) = server.post("/api/v1/projects", &alice, json!({ "name": "Checkout" })).await?;
    let access = format!("/api/v1/projects/{}/access", body["data"]["id"]);

    let bad_bodies = [
        json!({ "level": "view" }),
        json!({ "user_id": bob_id, "level": "owner" }),
    ];
    for bad in bad_bodies {
        let (status, body) = server.post(&access, &alice, bad.clone()).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {}", bad);
        assert_eq!(body["error"], true);
        assert!(
            body["code"] == "VALIDATION_ERROR" || body["code"] == "BAD_REQUEST",
            "unexpected code {}",
            body["code"]
        );
    }

    let (status, body) = server.post("/api/v1/projects", &alice, json!({ "description": "no name" })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let res = server
        .client
        .post(server.url("/api/v1/projects"))
        .bearer_auth(&alice)
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await?;
    assert_eq!(body["code"], "BAD_REQUEST");

    let (status, body) = server.get("/api/v1/projects/abc", &alice).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");

    // Nothing was granted by the rejected requests
    let (_, body) = server.get(&access, &alice).await?;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
    Ok(())
}
