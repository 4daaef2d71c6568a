use sea_orm::EntityTrait;
use serde_json::json;

use atelier::auth::{API_KEY_HEADER, BLOG_INGEST_SCOPE, INTERNAL_SECRET_HEADER};
use atelier::entity::{blog_post, media_asset, portfolio_item};

use crate::common::{ADMIN_PASSWORD, INTERNAL_SECRET, ImageScript, TestApp, bearer, routes};

const PNG: &[u8] = b"\x89PNG\r\n\x1a\nadmin-test";

mod login {
    use super::*;

    #[tokio::test]
    async fn correct_password_sets_a_session_cookie() {
        let app = TestApp::spawn().await;

        let res = app
            .post_json(
                routes::ADMIN_LOGIN,
                &json!({ "password": ADMIN_PASSWORD }),
                &[],
            )
            .await;

        assert_eq!(res.status, 200, "Login failed: {}", res.text);
        assert_eq!(res.body["success"], true);
        let token = res.body["token"].as_str().unwrap();
        let cookie = res.header("set-cookie").expect("Set-Cookie header");
        assert!(cookie.starts_with(&format!("admin_session={token};")));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(cookie.contains("Max-Age=3600"));
    }

    #[tokio::test]
    async fn wrong_password_is_rejected_and_audited() {
        let app = TestApp::spawn().await;

        let res = app
            .post_json(routes::ADMIN_LOGIN, &json!({ "password": "hunter2" }), &[])
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["error"], "Invalid password");
        assert!(res.header("set-cookie").is_none());
        assert_eq!(app.audit_rows("admin.login.rejected").await.len(), 1);
    }

    #[tokio::test]
    async fn missing_password_is_a_validation_error() {
        let app = TestApp::spawn().await;

        let res = app.post_json(routes::ADMIN_LOGIN, &json!({}), &[]).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["error"], "password is required");
    }

    #[tokio::test]
    async fn empty_configured_password_disables_login() {
        let app = TestApp::spawn_with(|config| config.auth.admin_password.clear()).await;

        let res = app
            .post_json(routes::ADMIN_LOGIN, &json!({ "password": "" }), &[])
            .await;
        assert_eq!(res.status, 400);

        let res = app
            .post_json(routes::ADMIN_LOGIN, &json!({ "password": "anything" }), &[])
            .await;
        assert_eq!(res.status, 401);
    }
}

mod delete_portfolio {
    use super::*;

    #[tokio::test]
    async fn deleting_an_item_removes_its_screenshot_and_media() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        let auth = bearer(&token);
        app.fetcher.screenshot(PNG);
        let ingested = app
            .post_json(
                routes::INGEST_PORTFOLIO,
                &json!({ "sourceUrl": "https://example.com", "type": "web" }),
                &[("authorization", auth.as_str())],
            )
            .await;
        assert_eq!(ingested.status, 200, "Ingest failed: {}", ingested.text);
        let id = ingested.id();
        let screenshot = ingested.body["screenshotPath"].as_str().unwrap().to_string();

        let res = app
            .delete(&routes::admin_portfolio(&id), &[("authorization", auth.as_str())])
            .await;

        assert_eq!(res.status, 200, "Delete failed: {}", res.text);
        assert_eq!(res.body["success"], true);
        assert!(!app.object_path(&screenshot).exists());
        assert!(portfolio_item::Entity::find().all(&app.db).await.unwrap().is_empty());
        assert!(media_asset::Entity::find().all(&app.db).await.unwrap().is_empty());
        assert_eq!(app.audit_rows("portfolio.delete").await.len(), 1);

        let again = app
            .delete(&routes::admin_portfolio(&id), &[("authorization", auth.as_str())])
            .await;
        assert_eq!(again.status, 404);
        assert_eq!(again.body["error"], "Portfolio item not found");
    }

    #[tokio::test]
    async fn identical_screenshots_survive_deleting_the_other_item() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        let auth = bearer(&token);
        app.fetcher.screenshot(PNG);

        let mut ids = Vec::new();
        let mut paths = Vec::new();
        for url in ["https://a.example.com", "https://b.example.com"] {
            let res = app
                .post_json(
                    routes::INGEST_PORTFOLIO,
                    &json!({ "sourceUrl": url, "type": "web" }),
                    &[("authorization", auth.as_str())],
                )
                .await;
            assert_eq!(res.status, 200, "Ingest failed: {}", res.text);
            ids.push(res.id());
            paths.push(res.body["screenshotPath"].as_str().unwrap().to_string());
        }
        assert_ne!(paths[0], paths[1]);

        let res = app
            .delete(&routes::admin_portfolio(&ids[0]), &[("authorization", auth.as_str())])
            .await;
        assert_eq!(res.status, 200, "Delete failed: {}", res.text);

        assert!(!app.object_path(&paths[0]).exists());
        assert!(app.object_path(&paths[1]).exists());
        let media = media_asset::Entity::find().all(&app.db).await.unwrap();
        assert_eq!(media.len(), 1);
        assert_eq!(media[0].storage_path, paths[1]);
        assert_eq!(
            media[0].portfolio_item_id.map(|id| id.to_string()),
            Some(ids[1].clone())
        );
    }

    #[tokio::test]
    async fn delete_requires_admin_credentials() {
        let app = TestApp::spawn().await;
        let key = app.create_api_key(BLOG_INGEST_SCOPE).await;

        let res = app
            .delete(
                &routes::admin_portfolio(&uuid::Uuid::now_v7().to_string()),
                &[(API_KEY_HEADER, key.as_str())],
            )
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(app.audit_rows("admin.delete.rejected").await.len(), 1);
    }

    #[tokio::test]
    async fn internal_callers_may_delete() {
        let app = TestApp::spawn().await;

        let res = app
            .delete(
                &routes::admin_portfolio(&uuid::Uuid::now_v7().to_string()),
                &[(INTERNAL_SECRET_HEADER, INTERNAL_SECRET)],
            )
            .await;

        assert_eq!(res.status, 404);
    }
}

mod delete_blog {
    use super::*;

    #[tokio::test]
    async fn session_cookie_deletes_a_post_with_its_images() {
        let app = TestApp::spawn().await;
        let key = app.create_api_key(BLOG_INGEST_SCOPE).await;
        app.fetcher
            .image("https://img.test/cover.png", ImageScript::Ok(PNG.to_vec(), "image/png"));
        let ingested = app
            .post_json(
                routes::INGEST_BLOG,
                &json!({
                    "title": "Hello",
                    "slug": "to-delete",
                    "summary": "S",
                    "body": "<p>x</p>",
                    "tags": ["a"],
                    "images": [],
                    "featuredImage": "https://img.test/cover.png",
                }),
                &[(API_KEY_HEADER, key.as_str())],
            )
            .await;
        assert_eq!(ingested.status, 200, "Ingest failed: {}", ingested.text);
        let id = ingested.id();

        let token = app.admin_token().await;
        let cookie = format!("admin_session={token}");
        let res = app
            .delete(&routes::admin_blog(&id), &[("cookie", cookie.as_str())])
            .await;

        assert_eq!(res.status, 200, "Delete failed: {}", res.text);
        assert!(!app.object_path("blog/to-delete/featured").exists());
        assert!(blog_post::Entity::find().all(&app.db).await.unwrap().is_empty());
        assert!(media_asset::Entity::find().all(&app.db).await.unwrap().is_empty());

        let audits = app.audit_rows("blog.delete").await;
        assert_eq!(audits.len(), 1);
        assert_eq!(audits[0].detail.clone().unwrap()["slug"], "to-delete");
    }

    #[tokio::test]
    async fn unknown_post_is_not_found() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;

        let res = app
            .delete(
                &routes::admin_blog(&uuid::Uuid::now_v7().to_string()),
                &[("authorization", bearer(&token).as_str())],
            )
            .await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["error"], "Blog post not found");
    }
}

mod health {
    use super::*;

    #[tokio::test]
    async fn health_reports_ok_with_a_correlation_header() {
        let app = TestApp::spawn().await;

        let res = app.get(routes::HEALTH, &[("x-correlation-id", "trace-123")]).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body, json!({ "status": "ok" }));
        assert_eq!(res.header("x-correlation-id"), Some("trace-123"));
    }
}
