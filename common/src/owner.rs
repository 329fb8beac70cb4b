// Tenant scoping: job ownership and identity matching

use crate::errors::AuthError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The identity a job belongs to.
///
/// A caller may present a short-lived session id, a durable email, or both.
/// Ownership is satisfied by either identifier matching, so a job created
/// under one session remains visible to the same user after
/// re-authentication hands them a new session id.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Owner {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Owner {
    pub fn new(session_id: Option<String>, email: Option<String>) -> Self {
        Self { session_id, email }
    }

    pub fn from_session(session_id: impl Into<String>) -> Self {
        Self {
            session_id: Some(session_id.into()),
            email: None,
        }
    }

    pub fn from_email(email: impl Into<String>) -> Self {
        Self {
            session_id: None,
            email: Some(email.into()),
        }
    }

    /// Whether the owner carries no identifier at all
    pub fn is_anonymous(&self) -> bool {
        self.session_id.is_none() && self.email.is_none()
    }

    /// Whether `other` identifies the same owner. Anonymous owners match
    /// nothing, including each other.
    pub fn matches(&self, other: &Owner) -> bool {
        let session_match = match (&self.session_id, &other.session_id) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        };
        let email_match = match (&self.email, &other.email) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        };
        session_match || email_match
    }
}

/// IdentityResolver maps an opaque caller token to an owner identity.
///
/// The engine never interprets tokens itself; the surrounding application
/// supplies a resolver backed by whatever identity system it uses.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, token: &str) -> Result<Owner, AuthError>;
}

/// Fixed token-to-owner table, used by tests and single-tenant deployments
#[derive(Debug, Clone, Default)]
pub struct StaticIdentityResolver {
    identities: HashMap<String, Owner>,
}

impl StaticIdentityResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identity(mut self, token: impl Into<String>, owner: Owner) -> Self {
        self.identities.insert(token.into(), owner);
        self
    }
}

#[async_trait]
impl IdentityResolver for StaticIdentityResolver {
    async fn resolve(&self, token: &str) -> Result<Owner, AuthError> {
        self.identities
            .get(token)
            .cloned()
            .ok_or(AuthError::UnknownToken)
    }
}
