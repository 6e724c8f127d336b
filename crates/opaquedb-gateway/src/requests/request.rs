//! Request body types.

use serde::Deserialize;

/// Access to the opaque token a request may carry.
pub trait PrivateToken {
    /// The token string from the previous response, if any.
    fn private_token(&self) -> Option<&str>;
}

/// The request body accepted by the built-in routes.
///
/// Both fields are optional: a bare `{}` mints a fresh resource on the
/// compute route, while the events route requires `private`.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ComputeRequest {
    /// Server-side receive timestamp, stamped by the handler.
    #[serde(skip)]
    pub received: i64,

    /// Public properties for a new resource.
    #[serde(default)]
    pub public: Option<serde_json::Value>,

    /// The private token from the previous request. If omitted, a new
    /// resource is initialized.
    #[serde(default)]
    pub private: Option<String>,
}

impl PrivateToken for ComputeRequest {
    fn private_token(&self) -> Option<&str> {
        self.private.as_deref()
    }
}
