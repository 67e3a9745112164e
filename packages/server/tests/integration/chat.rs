use common::generator::FakeOutcome;
use sea_orm::{EntityTrait, PaginatorTrait};
use serde_json::json;
use sous_server::entity::{conversation, message, recipe_file};

use crate::support::{TestApp, recipe_markdown, routes};

#[tokio::test]
async fn plain_answers_are_returned_unchanged() {
    let app = TestApp::spawn().await;
    app.generator.push_text(FakeOutcome::Reply(
        "Salt the pasta water generously.".into(),
    ));

    let res = app
        .post_without_token(routes::CHAT, &json!({"message": "How salty should pasta water be?"}))
        .await;

    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["reply"], "Salt the pasta water generously.");
    assert!(res.body["conversation_id"].is_null());
    assert_eq!(recipe_file::Entity::find().count(&app.db).await.unwrap(), 0);
    assert_eq!(conversation::Entity::find().count(&app.db).await.unwrap(), 0);

    let prompt = app.generator.last_prompt().unwrap();
    assert!(prompt.contains("only answers questions about food"));
    assert!(prompt.ends_with("\nUser: How salty should pasta water be?"));
}

#[tokio::test]
async fn recipe_answers_are_stored_with_a_download_link() {
    let app = TestApp::spawn().await;
    app.generator
        .push_text(FakeOutcome::Reply(recipe_markdown("Chat Chili")));

    let res = app
        .post_without_token(routes::CHAT, &json!({"message": "Give me a chili recipe"}))
        .await;

    assert_eq!(res.status, 200, "{}", res.text);
    let files = recipe_file::Entity::find().all(&app.db).await.unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].content, recipe_markdown("Chat Chili"));
    assert_eq!(files[0].owner_id, None);

    let reply = res.body["reply"].as_str().unwrap();
    assert!(reply.starts_with("### Chat Chili"));
    assert!(reply.ends_with(&format!(
        "[Download recipe]({}/api/v1/recipes/download/{})",
        app.url(""),
        files[0].id
    )));

    let download = app
        .get_without_token(&routes::recipe_download(files[0].id))
        .await;
    assert_eq!(download.status, 200);
}

#[tokio::test]
async fn empty_message_is_rejected() {
    let app = TestApp::spawn().await;

    let res = app
        .post_without_token(routes::CHAT, &json!({"message": "  "}))
        .await;

    assert_eq!(res.status, 400);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");
    assert_eq!(app.generator.text_calls(), 0);
}

#[tokio::test]
async fn content_policy_rejection_is_inappropriate() {
    let app = TestApp::spawn().await;
    app.generator.push_text(FakeOutcome::Refuse);

    let res = app
        .post_without_token(routes::CHAT, &json!({"message": "something awful"}))
        .await;

    assert_eq!(res.status, 400);
    assert_eq!(res.body["code"], "INAPPROPRIATE_REQUEST");
    assert_eq!(res.body["message"], "Sorry, I can't help with that request.");
}

#[tokio::test]
async fn stalled_generator_is_unavailable() {
    let app = TestApp::spawn().await;
    app.generator.push_text(FakeOutcome::Stall);

    let res = app
        .post_without_token(routes::CHAT, &json!({"message": "Quick snack ideas?"}))
        .await;

    assert_eq!(res.status, 503);
    assert_eq!(res.body["code"], "UPSTREAM_UNAVAILABLE");
}

mod conversations {
    use super::*;

    async fn start(app: &TestApp, token: &str, message: &str, reply: &str) -> i32 {
        app.generator.push_text(FakeOutcome::Reply(reply.into()));
        let res = app
            .post_with_token(routes::CHAT, &json!({"message": message}), token)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        res.conversation_id()
    }

    #[tokio::test]
    async fn signed_in_chat_is_stored_with_a_generated_title() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("cook@example.com").await;
        app.generator
            .push_text(FakeOutcome::Reply("Simmer tomatoes with garlic.".into()));
        app.generator
            .push_text(FakeOutcome::Reply("\"Tomato Sauce Basics\"".into()));

        let res = app
            .post_with_token(routes::CHAT, &json!({"message": "Tomato sauce?"}), &token)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["reply"], "Simmer tomatoes with garlic.");
        let id = res.conversation_id();

        let thread = app.get_with_token(&routes::conversation(id), &token).await;
        assert_eq!(thread.status, 200);
        assert_eq!(thread.body["title"], "Tomato Sauce Basics");
        let messages = thread.body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[0]["content"], "Tomato sauce?");
        assert_eq!(messages[1]["role"], "assistant");
        assert_eq!(messages[1]["content"], "Simmer tomatoes with garlic.");
    }

    #[tokio::test]
    async fn failed_title_generation_falls_back() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("cook@example.com").await;

        let id = start(&app, &token, "Soup ideas?", "Try a lentil soup.").await;

        let thread = app.get_with_token(&routes::conversation(id), &token).await;
        assert_eq!(thread.body["title"], "New Chat");
    }

    #[tokio::test]
    async fn refused_first_message_stores_nothing() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("cook@example.com").await;
        app.generator.push_text(FakeOutcome::Refuse);

        let res = app
            .post_with_token(routes::CHAT, &json!({"message": "something awful"}), &token)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(conversation::Entity::find().count(&app.db).await.unwrap(), 0);
        assert_eq!(message::Entity::find().count(&app.db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn follow_ups_are_appended_in_order() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("cook@example.com").await;
        let id = start(&app, &token, "Bread tips?", "Use strong flour.").await;
        app.generator
            .push_text(FakeOutcome::Reply("About 70% hydration.".into()));

        let res = app
            .post_with_token(
                &routes::conversation_messages(id),
                &json!({"message": "How much water?"}),
                &token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.conversation_id(), id);
        assert_eq!(res.body["reply"], "About 70% hydration.");

        let thread = app.get_with_token(&routes::conversation(id), &token).await;
        let contents: Vec<&str> = thread.body["messages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["content"].as_str().unwrap())
            .collect();
        assert_eq!(
            contents,
            vec!["Bread tips?", "Use strong flour.", "How much water?", "About 70% hydration."]
        );
    }

    #[tokio::test]
    async fn listing_shows_only_own_conversations_most_recent_first() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice@example.com").await;
        let bob = app.create_authenticated_user("bob@example.com").await;
        let older = start(&app, &alice, "Pasta?", "Boil it.").await;
        let newer = start(&app, &alice, "Rice?", "Steam it.").await;
        start(&app, &bob, "Eggs?", "Poach them.").await;

        app.generator.push_text(FakeOutcome::Reply("Salt the water.".into()));
        let res = app
            .post_with_token(
                &routes::conversation_messages(older),
                &json!({"message": "Anything else?"}),
                &alice,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);

        let list = app.get_with_token(routes::CHAT, &alice).await;
        assert_eq!(list.status, 200);
        let ids: Vec<i64> = list
            .body
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![older as i64, newer as i64]);
    }

    #[tokio::test]
    async fn rename_rejects_blank_titles() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("cook@example.com").await;
        let id = start(&app, &token, "Curry?", "Toast the spices.").await;

        let blank = app
            .patch_with_token(&routes::conversation(id), &json!({"title": "   "}), &token)
            .await;
        assert_eq!(blank.status, 400);
        assert_eq!(blank.body["code"], "VALIDATION_ERROR");

        let renamed = app
            .patch_with_token(
                &routes::conversation(id),
                &json!({"title": "  Friday curry  "}),
                &token,
            )
            .await;
        assert_eq!(renamed.status, 200, "{}", renamed.text);
        assert_eq!(renamed.body["title"], "Friday curry");
        assert_eq!(renamed.body["messages"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn delete_removes_the_conversation_and_its_messages() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("cook@example.com").await;
        let id = start(&app, &token, "Salad?", "Add lemon.").await;

        let res = app.delete_with_token(&routes::conversation(id), &token).await;

        assert_eq!(res.status, 204);
        let gone = app.get_with_token(&routes::conversation(id), &token).await;
        assert_eq!(gone.status, 404);
        assert_eq!(message::Entity::find().count(&app.db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn other_users_are_denied_every_operation() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice@example.com").await;
        let bob = app.create_authenticated_user("bob@example.com").await;
        let id = start(&app, &alice, "Cake?", "Cream the butter.").await;
        let calls_before = app.generator.text_calls();

        let read = app.get_with_token(&routes::conversation(id), &bob).await;
        assert_eq!(read.status, 403);
        assert_eq!(read.body["code"], "PERMISSION_DENIED");

        let follow_up = app
            .post_with_token(
                &routes::conversation_messages(id),
                &json!({"message": "Mine now"}),
                &bob,
            )
            .await;
        assert_eq!(follow_up.status, 403);
        assert_eq!(app.generator.text_calls(), calls_before);

        let rename = app
            .patch_with_token(&routes::conversation(id), &json!({"title": "Hijacked"}), &bob)
            .await;
        assert_eq!(rename.status, 403);

        let delete = app.delete_with_token(&routes::conversation(id), &bob).await;
        assert_eq!(delete.status, 403);

        let thread = app.get_with_token(&routes::conversation(id), &alice).await;
        assert_eq!(thread.status, 200);
        assert_eq!(thread.body["title"], "New Chat");
        assert_eq!(thread.body["messages"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn missing_conversation_is_not_found() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("cook@example.com").await;

        let res = app
            .post_with_token(
                &routes::conversation_messages(999),
                &json!({"message": "Hello?"}),
                &token,
            )
            .await;

        assert_eq!(res.status, 404);
        assert_eq!(app.generator.text_calls(), 0);
    }

    #[tokio::test]
    async fn conversations_require_authentication() {
        let app = TestApp::spawn().await;

        let list = app.get_without_token(routes::CHAT).await;
        assert_eq!(list.status, 401);

        let follow_up = app
            .post_without_token(&routes::conversation_messages(1), &json!({"message": "Hi"}))
            .await;
        assert_eq!(follow_up.status, 401);
    }
}
