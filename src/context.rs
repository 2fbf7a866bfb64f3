//! Explicit per-request context.
//!
//! One `RequestContext` is constructed per inbound request and threaded
//! through the guards. It replaces any ambient or process-global identity
//! slot: sharing a context (or a guard holding one) across concurrent
//! requests would leak one request's resolved user into another.

use uuid::Uuid;

use crate::store::User;

/// Client characteristics used for fingerprint binding.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClientInfo {
    /// User-Agent header value, empty if absent.
    pub user_agent: String,
    /// Client address as seen by this service (or asserted by a trusted
    /// proxy), empty if unknown.
    pub client_addr: String,
}

impl ClientInfo {
    /// Create client info from request characteristics.
    pub fn new(user_agent: impl Into<String>, client_addr: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            client_addr: client_addr.into(),
        }
    }
}

/// Per-request context: the current identity slot plus correlation data.
#[derive(Debug, Clone)]
pub struct RequestContext {
    correlation_id: String,
    client: ClientInfo,
    current_user: Option<User>,
}

impl RequestContext {
    /// Create a fresh context for one inbound request.
    pub fn new(client: ClientInfo) -> Self {
        Self {
            correlation_id: Uuid::new_v4().to_string(),
            client,
            current_user: None,
        }
    }

    /// Correlation id for server-side logging.
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    /// Client characteristics for this request.
    pub fn client(&self) -> &ClientInfo {
        &self.client
    }

    /// The identity resolved earlier in the pipeline, if any.
    pub fn current_user(&self) -> Option<&User> {
        self.current_user.as_ref()
    }

    /// Set the resolved identity for the remainder of this request.
    pub fn set_current_user(&mut self, user: User) {
        self.current_user = Some(user);
    }

    /// Clear the resolved identity (logout).
    pub fn clear_current_user(&mut self) {
        self.current_user = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: "u-1".to_string(),
            email: "alice@example.com".to_string(),
            name: "Alice".to_string(),
            role: None,
            permissions: vec![],
        }
    }

    #[test]
    fn test_context_identity_slot() {
        let mut ctx = RequestContext::new(ClientInfo::new("agent", "10.0.0.1"));
        assert!(ctx.current_user().is_none());

        ctx.set_current_user(sample_user());
        assert_eq!(ctx.current_user().unwrap().id, "u-1");

        ctx.clear_current_user();
        assert!(ctx.current_user().is_none());
    }

    #[test]
    fn test_correlation_ids_are_unique() {
        let a = RequestContext::new(ClientInfo::default());
        let b = RequestContext::new(ClientInfo::default());
        assert_ne!(a.correlation_id(), b.correlation_id());
    }
}
