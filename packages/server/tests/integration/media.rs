use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::multipart::{Form, Part};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::{Value, json};

use atelier::auth::{API_KEY_HEADER, BLOG_INGEST_SCOPE, INTERNAL_SECRET_HEADER, MEDIA_SCOPE};
use atelier::entity::media_asset;

use crate::common::{INTERNAL_SECRET, MAX_UPLOAD_BYTES, TestApp, TestResponse, bearer, routes};

const PNG: &[u8] = b"\x89PNG\r\n\x1a\nupload-bytes";

fn internal() -> [(&'static str, &'static str); 1] {
    [(INTERNAL_SECRET_HEADER, INTERNAL_SECRET)]
}

fn upload_body(filename: &str, content_type: &str, bytes: &[u8]) -> Value {
    json!({
        "filename": filename,
        "contentType": content_type,
        "data": STANDARD.encode(bytes),
        "altText": "A picture",
    })
}

async fn upload(app: &TestApp, body: &Value) -> TestResponse {
    app.post_json(routes::MEDIA_UPLOAD, body, &internal()).await
}

async fn media_count(app: &TestApp) -> usize {
    media_asset::Entity::find().all(&app.db).await.unwrap().len()
}

mod upload {
    use super::*;

    #[tokio::test]
    async fn png_is_stored_and_recorded() {
        let app = TestApp::spawn().await;

        let res = upload(&app, &upload_body("hero shot.png", "image/png", PNG)).await;

        assert_eq!(res.status, 201, "Upload failed: {}", res.text);
        let key = res.body["storagePath"].as_str().unwrap();
        assert!(key.starts_with("uploads/"));
        assert!(key.ends_with("-hero_shot.png"));
        assert_eq!(res.body["url"], format!("https://cdn.test/public-media/{key}"));
        assert_eq!(res.body["sizeBytes"], PNG.len());
        assert_eq!(res.body["source"], "upload");
        assert!(res.body["checksum"].as_str().is_some_and(|c| c.len() == 64));
        assert_eq!(std::fs::read(app.object_path(key)).unwrap(), PNG);

        assert_eq!(app.audit_rows("media.upload").await.len(), 1);
    }

    #[tokio::test]
    async fn data_url_payloads_are_accepted() {
        let app = TestApp::spawn().await;
        let mut body = upload_body("a.webp", "image/webp", PNG);
        body["data"] = json!(format!("data:image/webp;base64,{}", STANDARD.encode(PNG)));

        let res = upload(&app, &body).await;

        assert_eq!(res.status, 201, "Upload failed: {}", res.text);
    }

    #[tokio::test]
    async fn gif_is_unsupported_and_nothing_is_stored() {
        let app = TestApp::spawn().await;

        let res = upload(&app, &upload_body("anim.gif", "image/gif", b"GIF89a")).await;

        assert_eq!(res.status, 415);
        assert_eq!(res.body["code"], "UNSUPPORTED_MEDIA_TYPE");
        assert_eq!(media_count(&app).await, 0);
        assert!(!app.has_objects_under("uploads"));
    }

    #[tokio::test]
    async fn oversized_image_is_rejected() {
        let app = TestApp::spawn().await;
        let bytes = vec![7u8; MAX_UPLOAD_BYTES + 1];

        let res = upload(&app, &upload_body("big.png", "image/png", &bytes)).await;

        assert_eq!(res.status, 413);
        assert_eq!(res.body["code"], "PAYLOAD_TOO_LARGE");
        assert_eq!(media_count(&app).await, 0);
    }

    #[tokio::test]
    async fn blank_alt_text_is_rejected() {
        let app = TestApp::spawn().await;
        let mut body = upload_body("a.png", "image/png", PNG);
        body["altText"] = json!("   ");

        let res = upload(&app, &body).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["error"], "altText is required");
    }

    #[tokio::test]
    async fn association_needs_both_type_and_id() {
        let app = TestApp::spawn().await;
        let mut body = upload_body("a.png", "image/png", PNG);
        body["associatedType"] = json!("blog");

        let res = upload(&app, &body).await;

        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn unknown_associated_record_is_not_found_and_nothing_is_stored() {
        let app = TestApp::spawn().await;
        let mut body = upload_body("a.png", "image/png", PNG);
        body["associatedType"] = json!("portfolio");
        body["associatedId"] = json!(uuid::Uuid::now_v7());

        let res = upload(&app, &body).await;

        assert_eq!(res.status, 404, "Unexpected response: {}", res.text);
        assert_eq!(res.body["error"], "Portfolio item not found");
        assert_eq!(media_count(&app).await, 0);
        assert!(!app.has_objects_under("portfolio"));
    }

    #[tokio::test]
    async fn existing_blog_post_can_own_an_upload() {
        let app = TestApp::spawn().await;
        let key = app.create_api_key(BLOG_INGEST_SCOPE).await;
        let post = app
            .post_json(
                routes::INGEST_BLOG,
                &json!({
                    "title": "Owner",
                    "slug": "owner",
                    "summary": "S",
                    "body": "<p>x</p>",
                    "tags": [],
                    "images": [],
                }),
                &[(API_KEY_HEADER, key.as_str())],
            )
            .await;
        assert_eq!(post.status, 200, "Ingest failed: {}", post.text);
        let mut body = upload_body("a.png", "image/png", PNG);
        body["associatedType"] = json!("blog");
        body["associatedId"] = json!(post.id());

        let res = upload(&app, &body).await;

        assert_eq!(res.status, 201, "Upload failed: {}", res.text);
        assert!(res.body["storagePath"].as_str().unwrap().starts_with("blog/"));
        let row = media_asset::Entity::find()
            .filter(media_asset::Column::StoragePath.eq(res.body["storagePath"].as_str().unwrap()))
            .one(&app.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.blog_post_id.map(|id| id.to_string()), Some(post.id()));
    }

    #[tokio::test]
    async fn storage_failure_is_a_500_and_audited() {
        let app = TestApp::spawn().await;
        // A plain file where the prefix directory should go.
        std::fs::write(app.object_path("uploads"), b"not a directory").unwrap();

        let res = upload(&app, &upload_body("a.png", "image/png", PNG)).await;

        assert_eq!(res.status, 500, "Unexpected response: {}", res.text);
        assert_eq!(res.body["code"], "INTERNAL_ERROR");
        assert_eq!(media_count(&app).await, 0);
        let audits = app.audit_rows("media.upload.failed").await;
        assert_eq!(audits.len(), 1);
        assert_eq!(audits[0].outcome, "failure");
        assert_eq!(audits[0].correlation_id, res.body["correlationId"].as_str().unwrap());
        assert!(app.audit_rows("media.upload").await.is_empty());
    }

    #[tokio::test]
    async fn caller_errors_are_not_audited_as_failures() {
        let app = TestApp::spawn().await;
        let mut body = upload_body("a.png", "image/png", PNG);
        body["associatedType"] = json!("blog");
        body["associatedId"] = json!(uuid::Uuid::now_v7());

        let res = upload(&app, &body).await;

        assert_eq!(res.status, 404);
        assert!(app.audit_rows("media.upload.failed").await.is_empty());
    }

    #[tokio::test]
    async fn media_scoped_key_may_upload() {
        let app = TestApp::spawn().await;
        let key = app.create_api_key(MEDIA_SCOPE).await;

        let res = app
            .post_json(
                routes::MEDIA_UPLOAD,
                &upload_body("a.png", "image/png", PNG),
                &[(API_KEY_HEADER, key.as_str())],
            )
            .await;

        assert_eq!(res.status, 201, "Upload failed: {}", res.text);
    }

    #[tokio::test]
    async fn blog_scoped_key_may_not_upload() {
        let app = TestApp::spawn().await;
        let key = app.create_api_key(BLOG_INGEST_SCOPE).await;

        let res = app
            .post_json(
                routes::MEDIA_UPLOAD,
                &upload_body("a.png", "image/png", PNG),
                &[(API_KEY_HEADER, key.as_str())],
            )
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(app.audit_rows("media.upload.rejected").await.len(), 1);
    }

    #[tokio::test]
    async fn wrong_internal_secret_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .post_json(
                routes::MEDIA_UPLOAD,
                &upload_body("a.png", "image/png", PNG),
                &[(INTERNAL_SECRET_HEADER, "guess")],
            )
            .await;

        assert_eq!(res.status, 401);
    }
}

mod proxy {
    use super::*;

    fn form(bytes: &[u8], filename: &str, mime: &str) -> Form {
        Form::new()
            .part(
                "file",
                Part::bytes(bytes.to_vec())
                    .file_name(filename.to_string())
                    .mime_str(mime)
                    .unwrap(),
            )
            .text("altText", "Screenshot of the app")
            .text("caption", "Home screen")
    }

    #[tokio::test]
    async fn multipart_upload_is_stored() {
        let app = TestApp::spawn().await;

        let res = app
            .post_multipart(routes::MEDIA_PROXY, form(PNG, "shot.png", "image/png"), &internal())
            .await;

        assert_eq!(res.status, 201, "Proxy upload failed: {}", res.text);
        assert_eq!(res.body["altText"], "Screenshot of the app");
        assert_eq!(res.body["caption"], "Home screen");
        assert_eq!(res.body["mimeType"], "image/png");
        assert_eq!(app.audit_rows("media.upload.proxy").await.len(), 1);
    }

    #[tokio::test]
    async fn missing_file_field_is_rejected() {
        let app = TestApp::spawn().await;
        let form = Form::new().text("altText", "Nothing attached");

        let res = app
            .post_multipart(routes::MEDIA_PROXY, form, &internal())
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["error"], "Missing 'file' field");
    }

    #[tokio::test]
    async fn disallowed_type_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .post_multipart(
                routes::MEDIA_PROXY,
                form(b"GIF89a", "anim.gif", "image/gif"),
                &internal(),
            )
            .await;

        assert_eq!(res.status, 415);
        assert_eq!(media_count(&app).await, 0);
    }

    #[tokio::test]
    async fn oversized_file_is_rejected() {
        let app = TestApp::spawn().await;
        let bytes = vec![1u8; MAX_UPLOAD_BYTES + 1];

        let res = app
            .post_multipart(routes::MEDIA_PROXY, form(&bytes, "big.png", "image/png"), &internal())
            .await;

        assert_eq!(res.status, 413);
    }
}

mod presign_and_finalize {
    use super::*;

    #[tokio::test]
    async fn filesystem_backend_cannot_presign() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;

        let res = app
            .post_json(
                routes::MEDIA_PRESIGN,
                &json!({ "filename": "a.png", "contentType": "image/png", "sizeBytes": 10 }),
                &[("authorization", bearer(&token).as_str())],
            )
            .await;

        assert_eq!(res.status, 503);
        assert_eq!(res.body["code"], "SERVICE_UNAVAILABLE");
    }

    #[tokio::test]
    async fn presign_checks_type_and_declared_size_first() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        let auth = bearer(&token);

        let gif = app
            .post_json(
                routes::MEDIA_PRESIGN,
                &json!({ "filename": "a.gif", "contentType": "image/gif", "sizeBytes": 10 }),
                &[("authorization", auth.as_str())],
            )
            .await;
        let big = app
            .post_json(
                routes::MEDIA_PRESIGN,
                &json!({
                    "filename": "a.png",
                    "contentType": "image/png",
                    "sizeBytes": MAX_UPLOAD_BYTES + 1,
                }),
                &[("authorization", auth.as_str())],
            )
            .await;

        assert_eq!(gif.status, 415);
        assert_eq!(big.status, 413);
    }

    #[tokio::test]
    async fn presign_requires_an_admin_session() {
        let app = TestApp::spawn().await;

        let res = app
            .post_json(
                routes::MEDIA_PRESIGN,
                &json!({ "filename": "a.png", "contentType": "image/png", "sizeBytes": 10 }),
                &internal(),
            )
            .await;

        assert_eq!(res.status, 401);
    }

    #[tokio::test]
    async fn finalize_of_a_missing_object_is_not_found() {
        let app = TestApp::spawn().await;

        let res = app
            .post_json(
                routes::MEDIA_FINALIZE,
                &json!({ "objectKey": "uploads/never-uploaded.png", "altText": "Ghost" }),
                &internal(),
            )
            .await;

        assert_eq!(res.status, 404);
        assert_eq!(media_count(&app).await, 0);
    }

    #[tokio::test]
    async fn finalize_records_an_object_already_in_the_bucket() {
        let app = TestApp::spawn().await;
        let path = app.object_path("uploads/direct.png");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, PNG).unwrap();

        let res = app
            .post_json(
                routes::MEDIA_FINALIZE,
                &json!({ "objectKey": "uploads/direct.png", "altText": "Direct" }),
                &internal(),
            )
            .await;

        assert_eq!(res.status, 201, "Finalize failed: {}", res.text);
        assert_eq!(res.body["storagePath"], "uploads/direct.png");
        assert_eq!(res.body["sizeBytes"], PNG.len());
        assert_eq!(res.body["mimeType"], "image/png");
        assert_eq!(app.audit_rows("media.finalize").await.len(), 1);
    }

    #[tokio::test]
    async fn finalize_with_an_unknown_blog_post_is_not_found() {
        let app = TestApp::spawn().await;
        let path = app.object_path("uploads/orphan.png");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, PNG).unwrap();

        let res = app
            .post_json(
                routes::MEDIA_FINALIZE,
                &json!({
                    "objectKey": "uploads/orphan.png",
                    "altText": "Orphan",
                    "associatedType": "blog",
                    "associatedId": uuid::Uuid::now_v7(),
                }),
                &internal(),
            )
            .await;

        assert_eq!(res.status, 404, "Unexpected response: {}", res.text);
        assert_eq!(res.body["error"], "Blog post not found");
        assert_eq!(media_count(&app).await, 0);
    }

    #[tokio::test]
    async fn finalize_rejects_traversal_keys() {
        let app = TestApp::spawn().await;

        let res = app
            .post_json(
                routes::MEDIA_FINALIZE,
                &json!({ "objectKey": "../etc/passwd", "altText": "Nope" }),
                &internal(),
            )
            .await;

        assert_eq!(res.status, 400);
    }
}

mod delete_and_list {
    use super::*;

    #[tokio::test]
    async fn delete_removes_object_and_rows() {
        let app = TestApp::spawn().await;
        let uploaded = upload(&app, &upload_body("a.png", "image/png", PNG)).await;
        assert_eq!(uploaded.status, 201, "Upload failed: {}", uploaded.text);
        let key = uploaded.body["storagePath"].as_str().unwrap().to_string();

        let res = app
            .post_json(routes::MEDIA_DELETE, &json!({ "objectKey": key }), &internal())
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["success"], true);
        assert!(!app.object_path(&key).exists());
        let rows = media_asset::Entity::find()
            .filter(media_asset::Column::StoragePath.eq(&key))
            .all(&app.db)
            .await
            .unwrap();
        assert!(rows.is_empty());
        assert_eq!(app.audit_rows("media.delete").await.len(), 1);
    }

    #[tokio::test]
    async fn deleting_an_unknown_key_still_succeeds() {
        let app = TestApp::spawn().await;

        let res = app
            .post_json(
                routes::MEDIA_DELETE,
                &json!({ "objectKey": "uploads/gone.png" }),
                &internal(),
            )
            .await;

        assert_eq!(res.status, 200);
    }

    #[tokio::test]
    async fn media_key_may_not_delete() {
        let app = TestApp::spawn().await;
        let key = app.create_api_key(MEDIA_SCOPE).await;

        let res = app
            .post_json(
                routes::MEDIA_DELETE,
                &json!({ "objectKey": "uploads/a.png" }),
                &[(API_KEY_HEADER, key.as_str())],
            )
            .await;

        assert_eq!(res.status, 401);
    }

    #[tokio::test]
    async fn list_is_newest_first_and_searchable() {
        let app = TestApp::spawn().await;
        let mut first = upload_body("cat.png", "image/png", PNG);
        first["altText"] = json!("A sleepy Cat");
        let mut second = upload_body("dog.png", "image/png", PNG);
        second["altText"] = json!("A dog");
        assert_eq!(upload(&app, &first).await.status, 201);
        assert_eq!(upload(&app, &second).await.status, 201);

        let all = app.get(routes::MEDIA, &internal()).await;
        assert_eq!(all.status, 200, "List failed: {}", all.text);
        let data = all.body["data"].as_array().unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data[0]["altText"], "A dog");

        let cats = app.get(&format!("{}?q=CAT", routes::MEDIA), &internal()).await;
        let data = cats.body["data"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["altText"], "A sleepy Cat");

        let limited = app.get(&format!("{}?limit=1", routes::MEDIA), &internal()).await;
        assert_eq!(limited.body["data"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn list_requires_credentials() {
        let app = TestApp::spawn().await;

        let res = app.get(routes::MEDIA, &[]).await;

        assert_eq!(res.status, 401);
    }
}
