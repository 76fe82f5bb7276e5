#![forbid(unsafe_code)]

use std::any::Any;

/// A security token of any format.
pub trait SecurityToken: std::fmt::Debug + Send + Sync {
    fn id(&self) -> Option<&str>;

    /// For handlers that need the concrete token type.
    fn as_any(&self) -> &dyn Any;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    pub claim_type: String,
    pub value: String,
}

impl Claim {
    pub fn new(claim_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            claim_type: claim_type.into(),
            value: value.into(),
        }
    }
}

/// The identity a validated token asserts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimsPrincipal {
    pub claims: Vec<Claim>,
}

impl ClaimsPrincipal {
    pub fn find_first(&self, claim_type: &str) -> Option<&Claim> {
        self.claims.iter().find(|c| c.claim_type == claim_type)
    }
}

/// Result of a successful validation.
#[derive(Debug)]
pub struct ValidatedToken {
    pub principal: ClaimsPrincipal,
    pub token: Box<dyn SecurityToken>,
}
