use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::{Value, json};

use atelier::auth::INTERNAL_SECRET_HEADER;
use atelier::entity::{media_asset, portfolio_item};
use atelier::fetch::AppMetadata;

use crate::common::{INTERNAL_SECRET, TestApp, TestResponse, bearer, routes};

const SCREENSHOT: &[u8] = b"\x89PNG\r\n\x1a\nscreenshot";

async fn ingest(app: &TestApp, token: &str, body: &Value) -> TestResponse {
    app.post_json(
        routes::INGEST_PORTFOLIO,
        body,
        &[("authorization", bearer(token).as_str())],
    )
    .await
}

fn sample_app() -> AppMetadata {
    AppMetadata {
        id: "123456".into(),
        title: "Pocket Planner".into(),
        summary: "Plans things".into(),
        category: Some("Productivity".into()),
        rating: Some(4.5),
        rating_count: Some(120),
        artwork_url: None,
    }
}

mod web_items {
    use super::*;

    #[tokio::test]
    async fn new_url_creates_one_published_item_with_a_screenshot() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        app.fetcher.screenshot(SCREENSHOT);

        let res = ingest(
            &app,
            &token,
            &json!({
                "sourceUrl": "https://example.com",
                "type": "web",
                "overrides": { "title": "Example", "tags": ["web"] },
            }),
        )
        .await;

        assert_eq!(res.status, 200, "Ingest failed: {}", res.text);
        assert_eq!(res.body["status"], "published");
        assert_eq!(res.body["needsAttention"], false);
        assert_eq!(res.body["bucket"], "public-media");
        let path = res.body["screenshotPath"].as_str().unwrap();
        assert!(path.starts_with("portfolio/screenshots/"));
        assert!(app.object_path(path).exists());

        let items = portfolio_item::Entity::find().all(&app.db).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Example");
        assert_eq!(items[0].tags, json!(["web"]));

        let media = media_asset::Entity::find()
            .filter(media_asset::Column::PortfolioItemId.eq(items[0].id))
            .all(&app.db)
            .await
            .unwrap();
        assert_eq!(media.len(), 1);
        assert_eq!(media[0].source, "capture");
    }

    #[tokio::test]
    async fn reingesting_a_url_updates_the_same_item() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        app.fetcher.screenshot(SCREENSHOT);
        let body = json!({ "sourceUrl": "https://example.com", "type": "web" });

        let first = ingest(&app, &token, &body).await;
        assert_eq!(first.status, 200, "First ingest failed: {}", first.text);

        let mut updated = body.clone();
        updated["featured"] = json!(true);
        updated["orderRank"] = json!(3);
        let second = ingest(&app, &token, &updated).await;

        assert_eq!(second.status, 200);
        assert_eq!(first.id(), second.id());
        let items = portfolio_item::Entity::find().all(&app.db).await.unwrap();
        assert_eq!(items.len(), 1);
        assert!(items[0].featured);
        assert_eq!(items[0].order_rank, 3);
    }

    #[tokio::test]
    async fn failed_screenshot_still_stores_the_item_once() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;

        let res = ingest(
            &app,
            &token,
            &json!({ "sourceUrl": "https://example.com", "type": "web" }),
        )
        .await;

        assert_eq!(res.status, 200, "Ingest failed: {}", res.text);
        assert_eq!(res.body["status"], "needs_attention");
        assert_eq!(res.body["needsAttention"], true);
        assert!(res.body.get("screenshotPath").is_none());

        let audits = app.audit_rows("portfolio.ingest.success").await;
        assert_eq!(audits.len(), 1);
        let detail = audits[0].detail.clone().unwrap();
        assert_eq!(detail["needsAttention"], true);
        assert_eq!(detail["sourceUrl"], "https://example.com");
        assert!(app.audit_rows("portfolio.ingest.failed").await.is_empty());
    }
}

mod app_items {
    use super::*;

    #[tokio::test]
    async fn catalog_metadata_fills_title_and_snapshot() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        app.fetcher.screenshot(SCREENSHOT);
        app.fetcher.app(sample_app());

        let res = ingest(
            &app,
            &token,
            &json!({ "sourceUrl": "https://apps.apple.com/app/id123456", "type": "app" }),
        )
        .await;

        assert_eq!(res.status, 200, "Ingest failed: {}", res.text);
        assert_eq!(res.body["needsAttention"], false);

        let item = portfolio_item::Entity::find().one(&app.db).await.unwrap().unwrap();
        assert_eq!(item.kind, "app");
        assert_eq!(item.title, "Pocket Planner");
        assert_eq!(item.summary, "Plans things");
        assert_eq!(item.metadata_snapshot["appStore"]["id"], "123456");
    }

    #[tokio::test]
    async fn failed_lookup_needs_attention_with_empty_title() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        app.fetcher.screenshot(SCREENSHOT);

        let res = ingest(
            &app,
            &token,
            &json!({ "sourceUrl": "https://apps.apple.com/app/id999", "type": "app" }),
        )
        .await;

        assert_eq!(res.status, 200, "Ingest failed: {}", res.text);
        assert_eq!(res.body["needsAttention"], true);

        let item = portfolio_item::Entity::find().one(&app.db).await.unwrap().unwrap();
        assert_eq!(item.title, "");
        assert_eq!(item.status, "needs_attention");
        assert_eq!(item.metadata_snapshot, json!({}));
    }

    #[tokio::test]
    async fn web_items_never_query_the_catalog() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;

        ingest(
            &app,
            &token,
            &json!({ "sourceUrl": "https://example.com", "type": "web" }),
        )
        .await;

        assert!(
            app.fetcher
                .calls()
                .iter()
                .all(|call| !call.starts_with("lookup"))
        );
    }
}

mod validation {
    use super::*;

    #[tokio::test]
    async fn missing_type_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;

        let res = ingest(&app, &token, &json!({ "sourceUrl": "https://example.com" })).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["error"], "sourceUrl and type are required");
    }

    #[tokio::test]
    async fn unknown_type_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;

        let res = ingest(
            &app,
            &token,
            &json!({ "sourceUrl": "https://example.com", "type": "desktop" }),
        )
        .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["error"], "type must be web or app");
    }

    #[tokio::test]
    async fn non_http_url_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;

        let res = ingest(
            &app,
            &token,
            &json!({ "sourceUrl": "ftp://example.com", "type": "web" }),
        )
        .await;

        assert_eq!(res.status, 400);
        assert!(app.fetcher.calls().is_empty());
    }
}

mod authorization {
    use super::*;

    #[tokio::test]
    async fn missing_bearer_is_rejected_and_audited() {
        let app = TestApp::spawn().await;

        let res = app
            .post_json(
                routes::INGEST_PORTFOLIO,
                &json!({ "sourceUrl": "https://example.com", "type": "web" }),
                &[],
            )
            .await;

        assert_eq!(res.status, 401);
        assert!(app.fetcher.calls().is_empty());
        assert_eq!(app.audit_rows("portfolio.ingest.rejected").await.len(), 1);
    }

    #[tokio::test]
    async fn tampered_token_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        let tampered = format!("{token}x");

        let res = ingest(
            &app,
            &tampered,
            &json!({ "sourceUrl": "https://example.com", "type": "web" }),
        )
        .await;

        assert_eq!(res.status, 401);
    }

    #[tokio::test]
    async fn internal_secret_is_not_accepted_for_portfolio_ingest() {
        let app = TestApp::spawn().await;

        let res = app
            .post_json(
                routes::INGEST_PORTFOLIO,
                &json!({ "sourceUrl": "https://example.com", "type": "web" }),
                &[(INTERNAL_SECRET_HEADER, INTERNAL_SECRET)],
            )
            .await;

        assert_eq!(res.status, 401);
    }
}
