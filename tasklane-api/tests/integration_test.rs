/// Integration tests for the Tasklane API
///
/// These drive the full router (auth middleware, extractors, error mapping)
/// over the in-memory store:
/// - Login, registration, refresh and logout
/// - Default container bootstrap on first task
/// - Ownership and membership checks surfacing as 404/403
/// - Project deletion blocked by tasks
/// - Expired tokens and the cookie fallback on task routes

mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Duration;
use common::{TestContext, SEED_EMAIL, SEED_PASSWORD};
use serde_json::{json, Value};

fn id_of(value: &Value) -> String {
    value["id"].as_str().expect("response has an id").to_string()
}

/// Decodes the payload segment of a JWT without checking its signature
fn token_payload(token: &str) -> Value {
    let segment = token.split('.').nth(1).expect("token has a payload segment");
    let bytes = URL_SAFE_NO_PAD.decode(segment).expect("payload is base64url");
    serde_json::from_slice(&bytes).expect("payload is JSON")
}

#[tokio::test]
async fn test_health() {
    let ctx = TestContext::new().await;

    let response = ctx.request(Method::GET, "/health", None, None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "healthy");
    assert_eq!(response.body["store"], "connected");
    assert_eq!(
        response.headers.get("x-content-type-options").unwrap(),
        "nosniff"
    );
}

#[tokio::test]
async fn test_login_sets_tokens_and_cookies() {
    let ctx = TestContext::new().await;

    let response = ctx
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": SEED_EMAIL, "password": SEED_PASSWORD })),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["user"]["email"], SEED_EMAIL);
    assert!(response.body["user"].get("passwordHash").is_none());
    assert!(response.body["refreshToken"].is_string());

    let payload = token_payload(response.body["accessToken"].as_str().unwrap());
    assert_eq!(payload["userId"], ctx.user.id.to_string());
    assert_eq!(payload["email"], SEED_EMAIL);

    let cookies = response.cookies();
    assert_eq!(cookies.len(), 2);
    assert!(cookies.iter().any(|c| c.starts_with("access_token=")));
    assert!(cookies
        .iter()
        .all(|c| c.contains("HttpOnly") && c.contains("SameSite=Lax")));
}

#[tokio::test]
async fn test_login_rejects_bad_credentials() {
    let ctx = TestContext::new().await;

    for body in [
        json!({ "email": SEED_EMAIL, "password": "wrong-password" }),
        json!({ "email": "nobody@example.com", "password": SEED_PASSWORD }),
    ] {
        let response = ctx
            .request(Method::POST, "/api/auth/login", None, Some(body))
            .await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(response.body["error"], "Invalid credentials");
    }
}

#[tokio::test]
async fn test_register_and_me() {
    let ctx = TestContext::new().await;
    let body = json!({ "email": "New.User@Example.com", "password": "Str0ngPassword", "name": "New" });

    let response = ctx
        .request(Method::POST, "/api/auth/register", None, Some(body.clone()))
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["user"]["email"], "new.user@example.com");

    let token = response.body["accessToken"].as_str().unwrap().to_string();
    let me = ctx
        .request(Method::GET, "/api/auth/me", Some(&token), None)
        .await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["user"]["name"], "New");

    let duplicate = ctx
        .request(Method::POST, "/api/auth/register", None, Some(body))
        .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);
    assert_eq!(duplicate.body["error"], "Email already registered");
}

#[tokio::test]
async fn test_register_rejects_weak_password() {
    let ctx = TestContext::new().await;

    let response = ctx
        .request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "email": "weak@example.com", "password": "alllowercase1" })),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["code"], "VALIDATION_ERROR");
    assert_eq!(response.body["details"][0]["field"], "password");
}

#[tokio::test]
async fn test_refresh_until_logout() {
    let ctx = TestContext::new().await;
    let login = ctx
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": SEED_EMAIL, "password": SEED_PASSWORD })),
        )
        .await;
    let refresh_token = login.body["refreshToken"].as_str().unwrap().to_string();
    let body = json!({ "refreshToken": refresh_token });

    let refreshed = ctx
        .request(Method::POST, "/api/auth/refresh", None, Some(body.clone()))
        .await;
    assert_eq!(refreshed.status, StatusCode::OK);
    let access = refreshed.body["accessToken"].as_str().unwrap().to_string();
    assert_eq!(
        ctx.request(Method::GET, "/api/auth/me", Some(&access), None)
            .await
            .status,
        StatusCode::OK
    );

    let logout = ctx
        .request(Method::POST, "/api/auth/logout", None, Some(body.clone()))
        .await;
    assert_eq!(logout.status, StatusCode::OK);
    assert!(logout.cookies().iter().all(|c| c.contains("Max-Age=0")));

    let after = ctx
        .request(Method::POST, "/api/auth/refresh", None, Some(body))
        .await;
    assert_eq!(after.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_reads_cookie() {
    let ctx = TestContext::new().await;
    let login = ctx
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": SEED_EMAIL, "password": SEED_PASSWORD })),
        )
        .await;
    let refresh_token = login.body["refreshToken"].as_str().unwrap();

    let response = ctx
        .send(
            Request::builder()
                .method(Method::POST)
                .uri("/api/auth/refresh")
                .header(header::COOKIE, format!("refresh_token={}", refresh_token))
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body["accessToken"].is_string());
}

#[tokio::test]
async fn test_missing_and_expired_tokens() {
    let ctx = TestContext::new().await;

    let missing = ctx.request(Method::GET, "/api/projects", None, None).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing.body["code"], "UNAUTHORIZED");

    let expired = ctx.token_for(&ctx.user, Duration::minutes(-5));
    for uri in ["/api/projects", "/api/tasks", "/api/workspaces"] {
        let response = ctx.request(Method::GET, uri, Some(&expired), None).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(response.body["code"], "TOKEN_EXPIRED");
    }

    let garbage = ctx
        .request(Method::GET, "/api/tasks", Some("not-a-jwt"), None)
        .await;
    assert_eq!(garbage.status, StatusCode::UNAUTHORIZED);
    assert_eq!(garbage.body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_first_task_bootstraps_default_container() {
    let ctx = TestContext::new().await;

    let created = ctx
        .as_user(Method::POST, "/api/tasks", Some(json!({ "title": "First task" })))
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert!(created.body["sectionId"].is_null());
    assert_eq!(created.body["status"], "TODO");
    assert_eq!(created.body["owner"]["email"], SEED_EMAIL);
    let project_id = created.body["projectId"].as_str().unwrap().to_string();

    let second = ctx
        .as_user(Method::POST, "/api/tasks", Some(json!({ "title": "Second task" })))
        .await;
    assert_eq!(second.body["projectId"], project_id.as_str());

    let workspaces = ctx.as_user(Method::GET, "/api/workspaces", None).await;
    assert_eq!(workspaces.body["total"], 1);
    assert_eq!(workspaces.body["workspaces"][0]["role"], "ADMIN");

    let projects = ctx.as_user(Method::GET, "/api/projects", None).await;
    assert_eq!(projects.body["total"], 1);
    assert_eq!(projects.body["projects"][0]["name"], "Personal Tasks");
    assert_eq!(projects.body["projects"][0]["memberRole"], "ADMIN");

    let detail = ctx
        .as_user(Method::GET, &format!("/api/projects/{}", project_id), None)
        .await;
    assert_eq!(detail.status, StatusCode::OK);
    let sections = detail.body["project"]["sections"].as_array().unwrap();
    assert_eq!(sections.len(), 3);
    assert_eq!(sections[0]["name"], "To Do");
    assert_eq!(detail.body["project"]["tasks"].as_array().unwrap().len(), 2);
    assert_eq!(detail.body["project"]["_count"]["tasks"], 2);
}

#[tokio::test]
async fn test_tasks_are_hidden_from_other_users() {
    let ctx = TestContext::new().await;
    let (_, other) = ctx.create_user("other@example.com", "secret123").await;

    let created = ctx
        .as_user(Method::POST, "/api/tasks", Some(json!({ "title": "Private" })))
        .await;
    let uri = format!("/api/tasks/{}", id_of(&created.body));

    for (method, body) in [
        (Method::GET, None),
        (Method::PATCH, Some(json!({ "title": "Hijacked" }))),
        (Method::DELETE, None),
    ] {
        let response = ctx.request(method, &uri, Some(&other), body).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(response.body["error"], "Task not found");
    }

    let listed = ctx.request(Method::GET, "/api/tasks", Some(&other), None).await;
    assert_eq!(listed.body, json!([]));

    let mine = ctx.as_user(Method::GET, &uri, None).await;
    assert_eq!(mine.body["title"], "Private");
}

#[tokio::test]
async fn test_assignee_can_update_but_not_delete() {
    let ctx = TestContext::new().await;
    let (assignee, assignee_token) = ctx.create_user("assignee@example.com", "secret123").await;

    let created = ctx
        .as_user(
            Method::POST,
            "/api/tasks",
            Some(json!({ "title": "Shared", "assigneeId": assignee.id })),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    let uri = format!("/api/tasks/{}", id_of(&created.body));

    let updated = ctx
        .request(
            Method::PATCH,
            &uri,
            Some(&assignee_token),
            Some(json!({ "status": "IN_PROGRESS" })),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["status"], "IN_PROGRESS");

    let deleted = ctx
        .request(Method::DELETE, &uri, Some(&assignee_token), None)
        .await;
    assert_eq!(deleted.status, StatusCode::NOT_FOUND);

    let owner_delete = ctx.as_user(Method::DELETE, &uri, None).await;
    assert_eq!(owner_delete.status, StatusCode::OK);
    assert_eq!(owner_delete.body["success"], true);
}

#[tokio::test]
async fn test_completed_at_follows_status() {
    let ctx = TestContext::new().await;
    let created = ctx
        .as_user(Method::POST, "/api/tasks", Some(json!({ "title": "Finish me" })))
        .await;
    let uri = format!("/api/tasks/{}", id_of(&created.body));
    assert!(created.body["completedAt"].is_null());

    let done = ctx
        .as_user(Method::PATCH, &uri, Some(json!({ "status": "COMPLETED" })))
        .await;
    assert!(done.body["completedAt"].is_string());

    let retitled = ctx
        .as_user(Method::PATCH, &uri, Some(json!({ "title": "Finished" })))
        .await;
    assert_eq!(retitled.body["completedAt"], done.body["completedAt"]);

    let reopened = ctx
        .as_user(Method::PATCH, &uri, Some(json!({ "status": "TODO" })))
        .await;
    assert!(reopened.body["completedAt"].is_null());
}

#[tokio::test]
async fn test_task_validation() {
    let ctx = TestContext::new().await;

    let untitled = ctx
        .as_user(Method::POST, "/api/tasks", Some(json!({ "title": "  " })))
        .await;
    assert_eq!(untitled.status, StatusCode::BAD_REQUEST);
    assert_eq!(untitled.body["error"], "Title is required");

    let malformed = ctx
        .as_user(Method::POST, "/api/tasks", Some(json!({ "title": "x", "priority": "SOMEDAY" })))
        .await;
    assert_eq!(malformed.status, StatusCode::BAD_REQUEST);

    let bad_date = ctx
        .as_user(Method::POST, "/api/tasks", Some(json!({ "title": "x", "dueDate": "tomorrow" })))
        .await;
    assert_eq!(bad_date.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_project_lifecycle_and_delete_conflict() {
    let ctx = TestContext::new().await;
    let workspace = ctx
        .as_user(Method::POST, "/api/workspaces", Some(json!({ "name": "Acme" })))
        .await;
    assert_eq!(workspace.status, StatusCode::CREATED);
    let workspace_id = id_of(&workspace.body["workspace"]);

    let project = ctx
        .as_user(
            Method::POST,
            "/api/projects",
            Some(json!({ "name": "Launch", "workspaceId": workspace_id, "createDefaultSections": true })),
        )
        .await;
    assert_eq!(project.status, StatusCode::CREATED);
    assert_eq!(project.body["project"]["color"], "#0066FF");
    let project_id = id_of(&project.body["project"]);

    let duplicate = ctx
        .as_user(
            Method::POST,
            "/api/projects",
            Some(json!({ "name": "Launch", "workspaceId": workspace_id })),
        )
        .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);

    let sections = ctx
        .as_user(Method::GET, &format!("/api/projects/{}/sections", project_id), None)
        .await;
    assert_eq!(sections.body["sections"].as_array().unwrap().len(), 4);

    let section = ctx
        .as_user(
            Method::POST,
            &format!("/api/projects/{}/sections", project_id),
            Some(json!({ "name": "Blocked" })),
        )
        .await;
    assert_eq!(section.status, StatusCode::CREATED);
    assert_eq!(section.body["section"]["order"], 5);

    let task = ctx
        .as_user(
            Method::POST,
            "/api/tasks",
            Some(json!({ "title": "Ship it", "projectId": project_id })),
        )
        .await;
    assert_eq!(task.status, StatusCode::CREATED);

    let project_uri = format!("/api/projects/{}", project_id);
    let blocked = ctx.as_user(Method::DELETE, &project_uri, None).await;
    assert_eq!(blocked.status, StatusCode::CONFLICT);
    assert_eq!(blocked.body["error"], "Cannot delete project with existing tasks");
    assert!(blocked.body["details"].as_str().unwrap().contains("1 task(s)"));

    let task_uri = format!("/api/tasks/{}", id_of(&task.body));
    assert_eq!(ctx.as_user(Method::DELETE, &task_uri, None).await.status, StatusCode::OK);

    let deleted = ctx.as_user(Method::DELETE, &project_uri, None).await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(deleted.body["message"], "Project deleted successfully");

    let gone = ctx.as_user(Method::GET, &project_uri, None).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_outsiders_and_viewers() {
    let ctx = TestContext::new().await;
    let (viewer, viewer_token) = ctx.create_user("viewer@example.com", "secret123").await;
    let (_, outsider_token) = ctx.create_user("outsider@example.com", "secret123").await;

    let workspace = ctx
        .as_user(Method::POST, "/api/workspaces", Some(json!({ "name": "Acme" })))
        .await;
    let workspace_id = id_of(&workspace.body["workspace"]);
    let project = ctx
        .as_user(
            Method::POST,
            "/api/projects",
            Some(json!({ "name": "Launch", "workspaceId": workspace_id })),
        )
        .await;
    let project_uri = format!("/api/projects/{}", id_of(&project.body["project"]));

    let added = ctx
        .as_user(
            Method::POST,
            &format!("/api/workspaces/{}/members", workspace_id),
            Some(json!({ "email": viewer.email, "role": "VIEWER" })),
        )
        .await;
    assert_eq!(added.status, StatusCode::CREATED);

    // Outsiders cannot tell the project exists
    let hidden = ctx
        .request(Method::GET, &project_uri, Some(&outsider_token), None)
        .await;
    assert_eq!(hidden.status, StatusCode::NOT_FOUND);
    assert_eq!(hidden.body["error"], "Project not found or access denied");

    let no_access = ctx
        .request(
            Method::POST,
            "/api/projects",
            Some(&outsider_token),
            Some(json!({ "name": "Intrusion", "workspaceId": workspace_id })),
        )
        .await;
    assert_eq!(no_access.status, StatusCode::FORBIDDEN);
    assert_eq!(no_access.body["error"], "You do not have access to this workspace");

    // Viewers read but do not write
    let visible = ctx
        .request(Method::GET, &project_uri, Some(&viewer_token), None)
        .await;
    assert_eq!(visible.status, StatusCode::OK);
    assert_eq!(visible.body["project"]["memberRole"], "VIEWER");

    let forbidden = ctx
        .request(
            Method::POST,
            "/api/projects",
            Some(&viewer_token),
            Some(json!({ "name": "Side project", "workspaceId": workspace_id })),
        )
        .await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);

    let rename = ctx
        .request(
            Method::PUT,
            &project_uri,
            Some(&viewer_token),
            Some(json!({ "name": "Renamed" })),
        )
        .await;
    assert_eq!(rename.status, StatusCode::NOT_FOUND);

    let members = ctx
        .request(
            Method::GET,
            &format!("/api/workspaces/{}/members", workspace_id),
            Some(&viewer_token),
            None,
        )
        .await;
    assert_eq!(members.body["members"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_task_routes_accept_cookie() {
    let ctx = TestContext::new().await;
    let created = ctx
        .as_user(Method::POST, "/api/tasks", Some(json!({ "title": "Cookie task" })))
        .await;
    let cookie = format!("theme=dark; access_token={}", ctx.token);

    let with_cookie = |uri: String| {
        Request::builder()
            .method(Method::GET)
            .uri(uri)
            .header(header::COOKIE, cookie.clone())
            .body(Body::empty())
            .unwrap()
    };

    let task = ctx
        .send(with_cookie(format!("/api/tasks/{}", id_of(&created.body))))
        .await;
    assert_eq!(task.status, StatusCode::OK);
    assert_eq!(task.body["title"], "Cookie task");

    let projects = ctx.send(with_cookie("/api/projects".to_string())).await;
    assert_eq!(projects.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_task_children() {
    let ctx = TestContext::new().await;
    let created = ctx
        .as_user(Method::POST, "/api/tasks", Some(json!({ "title": "Parent" })))
        .await;
    let task_uri = format!("/api/tasks/{}", id_of(&created.body));

    let subtask = ctx
        .as_user(
            Method::POST,
            &format!("{}/subtasks", task_uri),
            Some(json!({ "title": "Step one" })),
        )
        .await;
    assert_eq!(subtask.status, StatusCode::CREATED);
    assert_eq!(subtask.body["order"], 1);

    let toggled = ctx
        .as_user(
            Method::PATCH,
            &format!("{}/subtasks/{}", task_uri, id_of(&subtask.body)),
            Some(json!({ "completed": true })),
        )
        .await;
    assert_eq!(toggled.body["completed"], true);

    let comment = ctx
        .as_user(
            Method::POST,
            &format!("{}/comments", task_uri),
            Some(json!({ "content": "Looks good" })),
        )
        .await;
    assert_eq!(comment.status, StatusCode::CREATED);
    assert_eq!(comment.body["user"]["email"], SEED_EMAIL);

    let tag = ctx
        .as_user(
            Method::POST,
            &format!("{}/tags", task_uri),
            Some(json!({ "name": "urgent" })),
        )
        .await;
    assert_eq!(tag.status, StatusCode::CREATED);

    let attachment = ctx
        .as_user(
            Method::POST,
            &format!("{}/attachments", task_uri),
            Some(json!({ "name": "brief.pdf", "url": "https://files.example.com/brief.pdf", "size": 1024 })),
        )
        .await;
    assert_eq!(attachment.status, StatusCode::BAD_REQUEST);
    assert_eq!(attachment.body["code"], "VALIDATION_ERROR");

    let attachment = ctx
        .as_user(
            Method::POST,
            &format!("{}/attachments", task_uri),
            Some(json!({
                "name": "brief.pdf",
                "url": "https://files.example.com/brief.pdf",
                "size": 1024,
                "mimeType": "application/pdf"
            })),
        )
        .await;
    assert_eq!(attachment.status, StatusCode::CREATED);
    assert_eq!(attachment.body["mimeType"], "application/pdf");

    let full = ctx.as_user(Method::GET, &task_uri, None).await;
    assert_eq!(full.body["subtasks"].as_array().unwrap().len(), 1);
    assert_eq!(full.body["tags"][0]["name"], "urgent");
    assert_eq!(full.body["comments"].as_array().unwrap().len(), 1);
    assert_eq!(full.body["attachments"].as_array().unwrap().len(), 1);
    assert_eq!(full.body["_count"]["comments"], 1);

    let untag = ctx
        .as_user(
            Method::DELETE,
            &format!("{}/tags/{}", task_uri, id_of(&tag.body)),
            None,
        )
        .await;
    assert_eq!(untag.status, StatusCode::OK);

    let (_, other) = ctx.create_user("other@example.com", "secret123").await;
    let foreign = ctx
        .request(
            Method::POST,
            &format!("{}/comments", task_uri),
            Some(&other),
            Some(json!({ "content": "Sneaky" })),
        )
        .await;
    assert_eq!(foreign.status, StatusCode::NOT_FOUND);
}
