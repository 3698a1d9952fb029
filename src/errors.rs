use std::fmt;

use thiserror::Error;

use crate::models::{OAuthErrorResponse, XstsErrorResponse};

/// Identity of a chain stage, carried by every orchestrator failure.
///
/// The shape of a domain error differs per stage (structured OAuth error,
/// XErr payload or bare status code), so callers branch on this to interpret
/// the [`FailureKind`] of an [`AuthenticationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    OAuth,
    Xbl,
    Xsts,
    MinecraftLogin,
    Entitlement,
    Profile,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::OAuth => "oauth token",
            Stage::Xbl => "xbox live authentication",
            Stage::Xsts => "xsts authorization",
            Stage::MinecraftLogin => "minecraft login",
            Stage::Entitlement => "entitlement",
            Stage::Profile => "profile",
        };
        f.write_str(name)
    }
}

/// Network, timeout or malformed-body failure of a single HTTP call.
///
/// These are never recovered internally; the original cause stays attached
/// for caller inspection.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("malformed response body: {0}")]
    MalformedResponse(#[from] serde_json::Error),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// The one wrapped failure surfaced by the orchestrator: the first stage
/// that did not produce a plain value, plus its domain error or transport
/// failure.
#[derive(Debug, Error)]
#[error("authentication failed at the {stage} stage: {kind}")]
pub struct AuthenticationError {
    pub stage: Stage,
    pub kind: FailureKind,
}

impl AuthenticationError {
    pub fn new(stage: Stage, kind: FailureKind) -> Self {
        Self { stage, kind }
    }

    /// True for failures that are generically retryable (a whole new chain
    /// attempt); domain rejections usually are not.
    pub fn is_transport(&self) -> bool {
        matches!(self.kind, FailureKind::Transport(_))
    }
}

/// Stage-specific failure payload inside an [`AuthenticationError`].
#[derive(Debug, Error)]
pub enum FailureKind {
    #[error("service rejected the request: {0}")]
    OAuthRejected(OAuthErrorResponse),

    #[error("service rejected the request with status {0}")]
    StatusRejected(u16),

    #[error("xsts denied the request: {0}")]
    XstsDenied(XstsErrorResponse),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Failure to parse a persisted credential document.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("cannot parse credential file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("credential file is not a json object")]
    NotAnObject,

    #[error("credential file is missing field '{0}'")]
    MissingField(&'static str),

    #[error("unknown credential type '{0}'")]
    UnknownType(String),
}

pub type Result<T> = std::result::Result<T, AuthenticationError>;
