//! JSON envelopes exchanged with remote and local callers.
//!
//! ```text
//! inbound   {"id": 7, "method": "PB.GetState", "params": {...}, "app_id"?: ..}
//!           {"setPState": "<session state>"}
//! reply     {"id": 7, "src": "<device>", "app_id"?: .., "result": ..}
//!           {"id": 7, "src": "<device>", "app_id"?: .., "error": {"code", "message"}}
//! push      {"id": -1, "src": "<device>", "status": ["FE0B..FF", ..], "data"?: .., "pState"?: ..}
//! ```

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{ErrorBody, RpcError};

/// Parameter map handed to every handler.
pub type Params = Map<String, Value>;

/// Request id used by unsolicited pushes.
pub const PUSH_ID: i64 = -1;

/// Client request ids wrap at this mask.
pub const REQUEST_ID_MASK: u16 = 2047;

/// A well-formed inbound call.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcRequest {
    pub id: i64,
    pub method: String,
    pub params: Params,
    pub app_id: Option<Value>,
}

impl RpcRequest {
    pub fn context(&self) -> ReplyContext {
        ReplyContext {
            id: Value::from(self.id),
            app_id: self.app_id.clone(),
        }
    }
}

/// Where a reply goes: the request id and optional app id, captured when
/// the request arrived.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplyContext {
    pub id: Value,
    pub app_id: Option<Value>,
}

/// Classification of one inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Request(RpcRequest),
    /// Session-state control message; never answered.
    SetPState(String),
    /// Could not be served; answer with `error` addressed to `reply`.
    Malformed { reply: ReplyContext, error: RpcError },
}

/// Classify an inbound JSON document.
pub fn parse_inbound(text: &str) -> Inbound {
    let unknown = ReplyContext {
        id: Value::Null,
        app_id: None,
    };
    let value: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) => {
            return Inbound::Malformed {
                reply: unknown,
                error: RpcError::protocol(format!("invalid JSON: {e}")),
            };
        }
    };
    let Value::Object(mut obj) = value else {
        return Inbound::Malformed {
            reply: unknown,
            error: RpcError::protocol("message is not an object"),
        };
    };

    let reply = ReplyContext {
        id: obj.get("id").cloned().unwrap_or(Value::Null),
        app_id: obj.remove("app_id"),
    };

    if let Some(state) = obj.remove("setPState") {
        return match state {
            Value::String(s) => Inbound::SetPState(s),
            _ => Inbound::Malformed {
                reply,
                error: RpcError::protocol("setPState must be a string"),
            },
        };
    }

    let method = match obj.remove("method") {
        Some(Value::String(m)) if !m.is_empty() => m,
        Some(_) => {
            return Inbound::Malformed {
                reply,
                error: RpcError::protocol("method must be a non-empty string"),
            };
        }
        None => {
            return Inbound::Malformed {
                reply,
                error: RpcError::protocol("missing method or control field"),
            };
        }
    };

    let Some(id) = obj.get("id").and_then(Value::as_i64) else {
        return Inbound::Malformed {
            reply,
            error: RpcError::protocol("missing or non-numeric id"),
        };
    };

    let params = match obj.remove("params") {
        None | Some(Value::Null) => Params::new(),
        Some(Value::Object(p)) => p,
        Some(_) => {
            return Inbound::Malformed {
                reply,
                error: RpcError::invalid_params("params must be an object"),
            };
        }
    };

    Inbound::Request(RpcRequest {
        id,
        method,
        params,
        app_id: reply.app_id,
    })
}

#[derive(Serialize)]
struct Reply<'a> {
    id: &'a Value,
    src: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    app_id: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorBody<'a>>,
}

/// Render the reply for one request outcome.
pub fn reply_text(
    ctx: &ReplyContext,
    src: &str,
    outcome: &Result<Value, RpcError>,
) -> Result<String, serde_json::Error> {
    let (result, error) = match outcome {
        Ok(v) => (Some(v), None),
        Err(e) => (None, Some(e.body())),
    };
    serde_json::to_string(&Reply {
        id: &ctx.id,
        src,
        app_id: ctx.app_id.as_ref(),
        result,
        error,
    })
}

/// Unsolicited status push.
#[derive(Debug, Serialize)]
pub struct PushEnvelope<'a> {
    pub id: i64,
    pub src: &'a str,
    pub status: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<&'a Params>,
    #[serde(rename = "pState", skip_serializing_if = "Option::is_none")]
    pub p_state: Option<&'a str>,
}

impl<'a> PushEnvelope<'a> {
    pub fn new(src: &'a str, status: Vec<String>) -> Self {
        Self {
            id: PUSH_ID,
            src,
            status,
            data: None,
            p_state: None,
        }
    }

    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Outgoing request id generator, wrapping at [`REQUEST_ID_MASK`].
#[derive(Debug, Default, Clone)]
pub struct RequestIds {
    last: u16,
}

impl RequestIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> u16 {
        self.last = (self.last + 1) & REQUEST_ID_MASK;
        self.last
    }
}

/// Render an outbound request, as a client would send it.
pub fn request_text(id: u16, method: &str, params: &Params) -> Result<String, serde_json::Error> {
    #[derive(Serialize)]
    struct Request<'a> {
        id: u16,
        method: &'a str,
        params: &'a Params,
    }
    serde_json::to_string(&Request { id, method, params })
}

// ───────────────────────────────────────────────────────────────
// Strict parameter accessors
// ───────────────────────────────────────────────────────────────

pub fn require_str<'p>(params: &'p Params, key: &str) -> Result<&'p str, RpcError> {
    match params.get(key) {
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(RpcError::invalid_params(format!("'{key}' must be a string"))),
        None => Err(RpcError::invalid_params(format!("missing '{key}'"))),
    }
}

pub fn require_int(params: &Params, key: &str) -> Result<i64, RpcError> {
    match params.get(key) {
        Some(v) => v
            .as_i64()
            .ok_or_else(|| RpcError::invalid_params(format!("'{key}' must be an integer"))),
        None => Err(RpcError::invalid_params(format!("missing '{key}'"))),
    }
}
