//! Queue-RPC surface.
//!
//! Each method is served from its own queue, named by concatenating the
//! configured service name (which carries its own separator) with the
//! method name. Replies use a fixed envelope:
//!
//! ```json
//! {"status": true,  "answer": <payload>}
//! {"status": false, "error": "<message>"}
//! ```
//!
//! Connecting to the broker, declaring queues and acking messages belong
//! to the transport wired in on top of [`ReplyTransport`]; this module
//! only turns one inbound message into one reply.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::AppState;
use crate::error::AppError;
use tiller_core::token::BearerHeaders;

mod methods;

/// The served RPC methods.
pub const METHODS: [&str; 5] = [
    "user_registration",
    "user_authorization",
    "user_handler_action",
    "refresh_access_token",
    "get_user",
];

/// One inbound RPC message, already pulled off the wire.
#[derive(Debug, Clone, Default)]
pub struct IncomingRpc {
    /// Transport headers; bearer tokens travel here, like HTTP.
    pub headers: HashMap<String, String>,
    /// Raw JSON payload.
    pub payload: Vec<u8>,
    /// Where the caller expects the reply, when it expects one.
    pub reply_to: Option<String>,
}

impl IncomingRpc {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// Parse the `Authorization` and `refresh` headers.
    pub fn bearer_headers(&self) -> tiller_core::Result<BearerHeaders> {
        BearerHeaders::parse(self.header("Authorization"), self.header("refresh"))
    }
}

/// Reply envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcReply {
    pub status: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RpcReply {
    pub fn ok(answer: serde_json::Value) -> Self {
        Self {
            status: true,
            answer: Some(answer),
            error: None,
        }
    }

    pub fn err(error: impl std::fmt::Display) -> Self {
        Self {
            status: false,
            answer: None,
            error: Some(error.to_string()),
        }
    }
}

/// Sends encoded replies back to callers. Implementations own the broker
/// specifics; the tests use an in-process loopback.
#[async_trait]
pub trait ReplyTransport: Send + Sync {
    async fn reply(&self, reply_to: &str, payload: Vec<u8>) -> Result<(), AppError>;
}

/// Routes inbound messages to method handlers.
#[derive(Clone)]
pub struct Dispatcher {
    state: AppState,
}

impl Dispatcher {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    pub fn methods() -> &'static [&'static str] {
        &METHODS
    }

    /// Queue name for a method: `<service_name><method>`.
    pub fn queue_name(&self, method: &str) -> String {
        format!("{}{}", self.state.config.service_name, method)
    }

    /// Run one message through a method handler. Failures never escape;
    /// they become error envelopes, mirroring the HTTP error mapping.
    pub async fn dispatch(&self, method: &str, message: &IncomingRpc) -> RpcReply {
        let result = match method {
            "user_registration" => methods::user_registration(&self.state, message).await,
            "user_authorization" => methods::user_authorization(&self.state, message).await,
            "user_handler_action" => methods::user_handler_action(&self.state, message).await,
            "refresh_access_token" => methods::refresh_access_token(&self.state, message).await,
            "get_user" => methods::get_user(&self.state, message).await,
            other => {
                warn!(method = other, "unknown rpc method");
                return RpcReply::err(format!("unknown method: {other}"));
            }
        };
        match result {
            Ok(answer) => RpcReply::ok(answer),
            Err(e) => {
                debug!(method, error = %e, "rpc method failed");
                RpcReply::err(e)
            }
        }
    }
}

/// Dispatch one message and deliver the reply when the caller asked for
/// one. Fire-and-forget messages (no `reply_to`) are dispatched for their
/// side effects only.
pub async fn handle_message<T: ReplyTransport + ?Sized>(
    dispatcher: &Dispatcher,
    transport: &T,
    method: &str,
    message: &IncomingRpc,
) -> Result<RpcReply, AppError> {
    let reply = dispatcher.dispatch(method, message).await;
    if let Some(reply_to) = message.reply_to.as_deref() {
        let payload = serde_json::to_vec(&reply)
            .map_err(|e| AppError::Internal(format!("encode rpc reply: {e}")))?;
        transport.reply(reply_to, payload).await?;
    }
    Ok(reply)
}
