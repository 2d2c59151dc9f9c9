//! RPC error taxonomy.
//!
//! Every handler failure funnels into [`RpcError`], which serializes to
//! the `{code, message}` object carried in error replies. Malformed UART
//! frames never reach this type; the framer absorbs them.

use core::fmt;

use serde::Serialize;

use crate::app::ports::{ConfigError, McuError, StorageError};
use crate::uart::commands::CommandError;

/// Error class; each maps to one wire code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing field, wrong type, bad shape.
    InvalidParams,
    /// Password check failed.
    Unauthorized,
    /// No handler registered under the method name.
    MethodNotFound,
    /// Request conflicts with the device state (e.g. module off).
    DeviceStateConflict,
    /// Storage or transport failure while serving the request.
    Internal,
    /// Inbound message was not a recognizable request.
    Protocol,
}

impl ErrorKind {
    pub fn code(self) -> i32 {
        match self {
            Self::InvalidParams => 400,
            Self::Unauthorized => 401,
            Self::MethodNotFound => 404,
            Self::DeviceStateConflict => 409,
            Self::Internal => 500,
            Self::Protocol => -32600,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidParams => write!(f, "invalid params"),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::MethodNotFound => write!(f, "method not found"),
            Self::DeviceStateConflict => write!(f, "device state conflict"),
            Self::Internal => write!(f, "internal error"),
            Self::Protocol => write!(f, "protocol error"),
        }
    }
}

/// Structured handler failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcError {
    pub kind: ErrorKind,
    pub message: String,
}

/// Wire form: `{"code": .., "message": ..}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody<'a> {
    pub code: i32,
    pub message: &'a str,
}

impl RpcError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidParams, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(ErrorKind::Unauthorized, "unauthorized")
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DeviceStateConflict, message)
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Protocol, message)
    }

    pub fn code(&self) -> i32 {
        self.kind.code()
    }

    pub fn body(&self) -> ErrorBody<'_> {
        ErrorBody {
            code: self.code(),
            message: &self.message,
        }
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.kind, self.code(), self.message)
    }
}

impl From<StorageError> for RpcError {
    fn from(e: StorageError) -> Self {
        Self::new(ErrorKind::Internal, format!("storage: {e}"))
    }
}

impl From<ConfigError> for RpcError {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::ValidationFailed(msg) => Self::invalid_params(msg),
            other => Self::new(ErrorKind::Internal, format!("config: {other}")),
        }
    }
}

impl From<McuError> for RpcError {
    fn from(e: McuError) -> Self {
        Self::new(ErrorKind::Internal, format!("mcu: {e}"))
    }
}

impl From<CommandError> for RpcError {
    fn from(e: CommandError) -> Self {
        Self::invalid_params(e.to_string())
    }
}
