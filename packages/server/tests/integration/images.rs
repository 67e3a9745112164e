use common::generator::FakeOutcome;
use common::{BlobStore, ObjectKey, StorageError};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::json;
use sous_server::entity::image;

use crate::support::{TestApp, routes};

const GENERAL_REFUSAL: &str = "Sorry, I can't help with that request.";
const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G'];

async fn stored_images(app: &TestApp, user_id: i32) -> Vec<image::Model> {
    image::Entity::find()
        .filter(image::Column::UserId.eq(user_id))
        .all(&app.db)
        .await
        .unwrap()
}

async fn blob_exists(app: &TestApp, storage_key: &str) -> bool {
    match app
        .blobs
        .get_stream(&ObjectKey::parse(storage_key).unwrap())
        .await
    {
        Ok(_) => true,
        Err(StorageError::NotFound(_)) => false,
        Err(e) => panic!("unexpected storage error: {e}"),
    }
}

mod generation {
    use super::*;

    #[tokio::test]
    async fn guest_gets_the_provider_url_and_nothing_is_stored() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::FOOD_IMAGES,
                &json!({"name": "Paella", "style": "natural", "size": "1792x1024"}),
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["url"], "https://images.invalid/generated/fake.png");
        assert_eq!(image::Entity::find().count(&app.db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn prompt_is_food_only_and_includes_details() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::FOOD_IMAGES,
                &json!({
                    "name": "Paella",
                    "style": "vivid",
                    "course": "main course",
                    "main_ingredient": "saffron rice",
                    "dish_type": "null",
                }),
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);

        let prompt = app.generator.last_prompt().unwrap();
        assert!(prompt.contains("only generates images of food"));
        assert!(prompt.contains("with the name: Paella."));
        assert!(prompt.contains("It is a main course."));
        assert!(prompt.contains("The ingredients are saffron rice."));
        assert!(!prompt.contains("The type of dish"));
    }

    #[tokio::test]
    async fn signed_in_user_gets_a_signed_gallery_url() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("cook@example.com").await;
        let user_id = app.user_id(&token).await;

        let res = app.generate_image(&token).await;

        let url = res.body["url"].as_str().unwrap();
        let prefix = app.url(&format!("/api/v1/blobs/users/{user_id}/images/"));
        assert!(url.starts_with(&prefix), "unexpected url {url}");
        assert!(url.contains("signature="));

        let stored = stored_images(&app, user_id).await;
        assert_eq!(stored.len(), 1);
        assert!(blob_exists(&app, &stored[0].storage_key).await);

        let blob = app.get_absolute(url).await;
        assert_eq!(blob.status(), 200);
        assert_eq!(blob.headers()["content-type"], "image/png");
        let bytes = blob.bytes().await.unwrap();
        assert!(bytes.starts_with(PNG_MAGIC));
    }

    #[tokio::test]
    async fn invalid_style_is_rejected_before_generation() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(routes::FOOD_IMAGES, &json!({"style": "watercolor"}))
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
        assert_eq!(res.body["message"], "Sorry, the picked style is invalid");
        assert_eq!(app.generator.image_calls(), 0);
    }

    #[tokio::test]
    async fn invalid_size_is_rejected_before_generation() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::FOOD_IMAGES,
                &json!({"style": "vivid", "size": "640x480"}),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["message"], "Sorry, the picked size is invalid");
        assert_eq!(app.generator.image_calls(), 0);
    }

    #[tokio::test]
    async fn refused_generation_stores_nothing() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("cook@example.com").await;
        let user_id = app.user_id(&token).await;
        app.generator.push_image(FakeOutcome::Refuse);

        let res = app
            .post_with_token(routes::FOOD_IMAGES, &json!({"style": "vivid"}), &token)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "INAPPROPRIATE_REQUEST");
        assert_eq!(res.body["message"], GENERAL_REFUSAL);
        assert!(stored_images(&app, user_id).await.is_empty());
    }

    #[tokio::test]
    async fn no_image_returned_is_inappropriate() {
        let app = TestApp::spawn().await;
        app.generator.push_image(FakeOutcome::Empty);

        let res = app
            .post_without_token(routes::FOOD_IMAGES, &json!({"style": "vivid"}))
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "INAPPROPRIATE_REQUEST");
    }

    #[tokio::test]
    async fn unreachable_blob_store_is_retryable() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("cook@example.com").await;
        let user_id = app.user_id(&token).await;
        app.blobs.time_out_uploads(true);

        let res = app
            .post_with_token(routes::FOOD_IMAGES, &json!({"style": "vivid"}), &token)
            .await;

        assert_eq!(res.status, 503);
        assert_eq!(res.body["code"], "UPSTREAM_UNAVAILABLE");
        assert!(stored_images(&app, user_id).await.is_empty());
    }
}

mod gallery {
    use super::*;

    #[tokio::test]
    async fn gallery_pages_use_the_default_size() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("cook@example.com").await;
        for _ in 0..20 {
            app.generate_image(&token).await;
        }

        let first = app.get_with_token(routes::MY_IMAGES, &token).await;
        assert_eq!(first.status, 200);
        let items = first.body["items"].as_array().unwrap();
        assert_eq!(items.len(), 18);
        assert_eq!(first.body["total"], 20);
        assert_eq!(first.body["total_pages"], 2);
        for item in items {
            assert!(item["url"].as_str().unwrap().contains("signature="));
            assert!(item["filename"].as_str().unwrap().ends_with(".png"));
        }

        let second = app
            .get_with_token(&format!("{}?page=2", routes::MY_IMAGES), &token)
            .await;
        assert_eq!(second.body["items"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn gallery_page_far_past_the_end_is_empty() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("cook@example.com").await;
        app.generate_image(&token).await;

        let res = app
            .get_with_token(
                &format!("{}?page={}&page_size=50", routes::MY_IMAGES, i64::MAX),
                &token,
            )
            .await;

        assert_eq!(res.status, 200);
        assert!(res.body["items"].as_array().unwrap().is_empty());
        assert_eq!(res.body["total"], 1);
    }

    #[tokio::test]
    async fn gallery_only_shows_the_callers_images() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice@example.com").await;
        let bob = app.create_authenticated_user("bob@example.com").await;
        app.generate_image(&alice).await;

        let res = app.get_with_token(routes::MY_IMAGES, &bob).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["total"], 0);
        assert!(res.body["items"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn gallery_requires_authentication() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token(routes::MY_IMAGES).await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_MISSING");
    }

    #[tokio::test]
    async fn owner_can_download_an_image() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("cook@example.com").await;
        let user_id = app.user_id(&token).await;
        app.generate_image(&token).await;
        let stored = stored_images(&app, user_id).await.remove(0);
        let filename = stored.storage_key.rsplit('/').next().unwrap().to_string();

        let res = app
            .client
            .get(app.url(&routes::my_image_download(stored.id)))
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .unwrap();

        assert_eq!(res.status(), 200);
        assert_eq!(res.headers()["content-type"], "image/png");
        assert_eq!(
            res.headers()["content-disposition"],
            format!("attachment; filename=\"{filename}\"").as_str()
        );
        assert!(res.bytes().await.unwrap().starts_with(PNG_MAGIC));
    }

    #[tokio::test]
    async fn other_users_cannot_download_an_image() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice@example.com").await;
        let bob = app.create_authenticated_user("bob@example.com").await;
        let alice_id = app.user_id(&alice).await;
        app.generate_image(&alice).await;
        let stored = stored_images(&app, alice_id).await.remove(0);

        let res = app
            .get_with_token(&routes::my_image_download(stored.id), &bob)
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }
}

mod deletion {
    use super::*;

    #[tokio::test]
    async fn owner_deletes_record_and_blob() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("cook@example.com").await;
        let user_id = app.user_id(&token).await;
        app.generate_image(&token).await;
        let stored = stored_images(&app, user_id).await.remove(0);

        let res = app.delete_with_token(&routes::my_image(stored.id), &token).await;

        assert_eq!(res.status, 204, "{}", res.text);
        assert!(stored_images(&app, user_id).await.is_empty());
        assert!(!blob_exists(&app, &stored.storage_key).await);
    }

    #[tokio::test]
    async fn other_users_cannot_delete_an_image() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice@example.com").await;
        let bob = app.create_authenticated_user("bob@example.com").await;
        let alice_id = app.user_id(&alice).await;
        app.generate_image(&alice).await;
        let stored = stored_images(&app, alice_id).await.remove(0);

        let res = app.delete_with_token(&routes::my_image(stored.id), &bob).await;

        assert_eq!(res.status, 403);
        assert_eq!(stored_images(&app, alice_id).await.len(), 1);
        assert!(blob_exists(&app, &stored.storage_key).await);
    }

    #[tokio::test]
    async fn failed_blob_delete_keeps_the_record() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("cook@example.com").await;
        let user_id = app.user_id(&token).await;
        app.generate_image(&token).await;
        let stored = stored_images(&app, user_id).await.remove(0);
        app.blobs.fail_deletes(true);

        let res = app.delete_with_token(&routes::my_image(stored.id), &token).await;

        assert_eq!(res.status, 502);
        assert_eq!(res.body["code"], "STORAGE_ERROR");
        assert_eq!(stored_images(&app, user_id).await.len(), 1);
        assert!(blob_exists(&app, &stored.storage_key).await);
    }

    #[tokio::test]
    async fn missing_image_is_not_found() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("cook@example.com").await;

        let res = app.delete_with_token(&routes::my_image(12345), &token).await;

        assert_eq!(res.status, 404);
    }
}

mod blob_urls {
    use super::*;

    #[tokio::test]
    async fn tampered_signature_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("cook@example.com").await;
        let res = app.generate_image(&token).await;
        let url = res.body["url"].as_str().unwrap();
        let (base, _) = url.split_once("signature=").unwrap();

        let blob = app.get_absolute(&format!("{base}signature=deadbeef")).await;

        assert_eq!(blob.status(), 403);
    }

    #[tokio::test]
    async fn expired_url_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("cook@example.com").await;
        let res = app.generate_image(&token).await;
        let url = res.body["url"].as_str().unwrap();
        let (path, query) = url.split_once('?').unwrap();
        let signature = query
            .split('&')
            .find_map(|pair| pair.strip_prefix("signature="))
            .unwrap();

        let blob = app
            .get_absolute(&format!("{path}?expires=1&signature={signature}"))
            .await;

        assert_eq!(blob.status(), 403);
    }

    #[tokio::test]
    async fn missing_signature_is_a_validation_error() {
        let app = TestApp::spawn().await;

        let res = app
            .get_without_token("/api/v1/blobs/users/1/images/x.png")
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }
}
