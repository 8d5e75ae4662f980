//! Queue-RPC tests: every method dispatched in-process, with a loopback
//! transport standing in for the broker.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Value, json};
use sqlx::SqlitePool;
use tempfile::TempDir;
use tiller_api::AppState;
use tiller_api::config::ApiConfig;
use tiller_api::error::AppError;
use tiller_api::rpc::{Dispatcher, IncomingRpc, ReplyTransport, RpcReply, handle_message};
use tiller_core::config::JwtSettings;
use tiller_core::models::NewUser;
use tiller_core::token::{TokenIssuer, TokenPair};

const TEST_BCRYPT_COST: u32 = 4;

async fn test_state() -> (AppState, TempDir) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let db_path = dir.path().join("tiller-test.db");
    let url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePool::connect(&url).await.expect("connect test db");
    tiller_api::migrate(&pool).await.expect("run migrations");

    let config = ApiConfig {
        bind_addr: "127.0.0.1:0".to_string(),
        database_url: url,
        service_name: "test_service_".to_string(),
        bcrypt_cost: TEST_BCRYPT_COST,
        jwt: JwtSettings {
            secret: "test-secret".to_string(),
            algorithm: "HS256".to_string(),
            access_ttl_secs: 900,
            refresh_ttl_secs: 3600,
        },
    };
    let state = AppState::new(pool, config).expect("app state");
    state
        .manager
        .ensure_permission_types_seeded()
        .await
        .expect("seed permission types");
    (state, dir)
}

fn message(payload: Value, headers: &[(&str, &str)], reply_to: Option<&str>) -> IncomingRpc {
    IncomingRpc {
        headers: headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        payload: payload.to_string().into_bytes(),
        reply_to: reply_to.map(String::from),
    }
}

async fn register_and_issue(state: &AppState, phone: &str) -> TokenPair {
    let user = state
        .manager
        .register_user(&NewUser {
            name: "A".to_string(),
            surname: "B".to_string(),
            phone: phone.to_string(),
            city: "C".to_string(),
            password: "123".to_string(),
        })
        .await
        .expect("register");
    state.tokens.issue_pair(&user).expect("pair")
}

#[tokio::test]
async fn registration_and_authorization_answer_with_token_pairs() {
    let (state, _dir) = test_state().await;
    let dispatcher = Dispatcher::new(state);

    let reply = dispatcher
        .dispatch(
            "user_registration",
            &message(
                json!({"name": "A", "surname": "B", "phone": "123", "city": "C", "password": "123"}),
                &[],
                None,
            ),
        )
        .await;
    assert!(reply.status);
    let answer = reply.answer.expect("answer");
    assert!(answer["access_token"].is_string());
    assert!(answer["refresh_token"].is_string());
    assert_eq!(answer["token_type"], "bearer");

    let reply = dispatcher
        .dispatch(
            "user_authorization",
            &message(json!({"phone": "123", "password": "123"}), &[], None),
        )
        .await;
    assert!(reply.status);
    assert!(reply.answer.expect("answer")["access_token"].is_string());

    // Failures travel inside the envelope, never as a transport error.
    let reply = dispatcher
        .dispatch(
            "user_authorization",
            &message(json!({"phone": "123", "password": "wrong"}), &[], None),
        )
        .await;
    assert!(!reply.status);
    assert_eq!(reply.error.as_deref(), Some("Incorrect login or password!"));
}

#[tokio::test]
async fn action_checks_follow_the_bearer_role() {
    let (state, _dir) = test_state().await;
    let pair = register_and_issue(&state, "123").await;
    let dispatcher = Dispatcher::new(state);
    let auth = format!("Bearer {}", pair.access_token);

    let reply = dispatcher
        .dispatch(
            "user_handler_action",
            &message(
                json!({"action": "view profile"}),
                &[("Authorization", &auth)],
                None,
            ),
        )
        .await;
    assert!(reply.status);
    assert_eq!(reply.answer, Some(Value::Bool(true)));

    // A freshly registered client is not allowed moderator actions.
    let reply = dispatcher
        .dispatch(
            "user_handler_action",
            &message(
                json!({"action": "view all profiles"}),
                &[("Authorization", &auth)],
                None,
            ),
        )
        .await;
    assert!(reply.status);
    assert_eq!(reply.answer, Some(Value::Bool(false)));

    let reply = dispatcher
        .dispatch(
            "user_handler_action",
            &message(json!({"something": "else"}), &[("Authorization", &auth)], None),
        )
        .await;
    assert!(!reply.status);
    assert!(reply.error.expect("error").contains("action"));

    let reply = dispatcher
        .dispatch(
            "user_handler_action",
            &message(json!({"action": "view profile"}), &[], None),
        )
        .await;
    assert!(!reply.status);
}

#[tokio::test]
async fn refresh_rotates_the_pair_even_after_access_expiry() {
    let (state, _dir) = test_state().await;
    let user = state
        .manager
        .register_user(&NewUser {
            name: "A".to_string(),
            surname: "B".to_string(),
            phone: "123".to_string(),
            city: "C".to_string(),
            password: "123".to_string(),
        })
        .await
        .expect("register");

    // Pair whose access token is already expired but whose refresh token
    // is still good.
    let expired_issuer = TokenIssuer::new(&JwtSettings {
        secret: "test-secret".to_string(),
        algorithm: "HS256".to_string(),
        access_ttl_secs: -3600,
        refresh_ttl_secs: 3600,
    })
    .expect("issuer");
    let stale_pair = expired_issuer.issue_pair(&user).expect("pair");

    let dispatcher = Dispatcher::new(state.clone());
    let auth = format!("Bearer {}", stale_pair.access_token);
    let refresh = format!("Bearer {}", stale_pair.refresh_token);

    let reply = dispatcher
        .dispatch(
            "refresh_access_token",
            &message(
                json!({}),
                &[("Authorization", &auth), ("refresh", &refresh)],
                None,
            ),
        )
        .await;
    assert!(reply.status);
    let answer = reply.answer.expect("answer");
    let new_access = answer["access_token"].as_str().expect("access token");
    assert_ne!(new_access, stale_pair.access_token);
    state
        .tokens
        .decode_access(new_access)
        .expect("fresh access token verifies");

    // A refresh token only works alongside the access token it was bound to.
    let other_pair = state.tokens.issue_pair(&user).expect("pair");
    let mismatched_auth = format!("Bearer {}", other_pair.access_token);
    let reply = dispatcher
        .dispatch(
            "refresh_access_token",
            &message(
                json!({}),
                &[("Authorization", &mismatched_auth), ("refresh", &refresh)],
                None,
            ),
        )
        .await;
    assert!(!reply.status);

    // No refresh header at all.
    let reply = dispatcher
        .dispatch(
            "refresh_access_token",
            &message(json!({}), &[("Authorization", &auth)], None),
        )
        .await;
    assert!(!reply.status);
}

#[tokio::test]
async fn get_user_answers_the_profile_without_secrets() {
    let (state, _dir) = test_state().await;
    let pair = register_and_issue(&state, "123").await;
    let dispatcher = Dispatcher::new(state);
    let auth = format!("Bearer {}", pair.access_token);

    let reply = dispatcher
        .dispatch(
            "get_user",
            &message(json!({}), &[("Authorization", &auth)], None),
        )
        .await;
    assert!(reply.status);
    let answer = reply.answer.expect("answer");
    assert_eq!(answer["name"], "A");
    assert_eq!(answer["surname"], "B");
    assert_eq!(answer["phone"], "123");
    assert!(answer["city_id"].is_number());
    assert!(answer.get("password_hash").is_none());
}

#[tokio::test]
async fn unknown_methods_are_reported_in_the_envelope() {
    let (state, _dir) = test_state().await;
    let dispatcher = Dispatcher::new(state);

    let reply = dispatcher
        .dispatch("does_not_exist", &message(json!({}), &[], None))
        .await;
    assert!(!reply.status);
    assert!(reply.error.expect("error").contains("unknown method"));

    let reply = dispatcher
        .dispatch("user_registration", &message(json!("not an object"), &[], None))
        .await;
    assert!(!reply.status);
}

#[tokio::test]
async fn queue_names_carry_the_service_prefix() {
    let (state, _dir) = test_state().await;
    let dispatcher = Dispatcher::new(state);

    assert_eq!(dispatcher.queue_name("get_user"), "test_service_get_user");
    for method in Dispatcher::methods() {
        assert!(dispatcher.queue_name(method).starts_with("test_service_"));
    }
    assert_eq!(Dispatcher::methods().len(), 5);
}

struct LoopbackTransport {
    sent: Mutex<Vec<(String, Vec<u8>)>>,
}

#[async_trait]
impl ReplyTransport for LoopbackTransport {
    async fn reply(&self, reply_to: &str, payload: Vec<u8>) -> Result<(), AppError> {
        self.sent
            .lock()
            .expect("lock")
            .push((reply_to.to_string(), payload));
        Ok(())
    }
}

#[tokio::test]
async fn replies_are_delivered_only_when_requested() {
    let (state, _dir) = test_state().await;
    let dispatcher = Dispatcher::new(state);
    let transport = LoopbackTransport {
        sent: Mutex::new(Vec::new()),
    };

    let registration =
        json!({"name": "A", "surname": "B", "phone": "123", "city": "C", "password": "123"});
    let reply = handle_message(
        &dispatcher,
        &transport,
        "user_registration",
        &message(registration, &[], Some("client.reply.1")),
    )
    .await
    .expect("handled");
    assert!(reply.status);

    {
        let sent = transport.sent.lock().expect("lock");
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "client.reply.1");
        let envelope: RpcReply = serde_json::from_slice(&sent[0].1).expect("parse envelope");
        assert!(envelope.status);
        assert!(envelope.answer.expect("answer")["access_token"].is_string());
        assert!(envelope.error.is_none());
    }

    // Fire-and-forget: dispatched, nothing sent back.
    let reply = handle_message(
        &dispatcher,
        &transport,
        "user_authorization",
        &message(json!({"phone": "123", "password": "123"}), &[], None),
    )
    .await
    .expect("handled");
    assert!(reply.status);
    assert_eq!(transport.sent.lock().expect("lock").len(), 1);
}
