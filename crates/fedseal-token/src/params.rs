#![forbid(unsafe_code)]

use std::sync::Arc;

use fedseal_keys::{CryptoProviderFactory, Key};

/// Looks up decryption keys by key identifier (`ds:KeyName`, else the
/// `EncryptedKey`'s `Id`).
pub type KeyResolver = Arc<dyn Fn(Option<&str>) -> Vec<Key> + Send + Sync>;

/// Inputs to reading and validating a token.
#[derive(Clone, Default)]
pub struct TokenValidationParameters {
    /// Decryption key tried after any resolved keys.
    pub token_decryption_key: Option<Key>,
    pub token_decryption_key_resolver: Option<KeyResolver>,
    /// Overrides the handler's provider factory for unwrapping.
    pub crypto_provider_factory: Option<Arc<dyn CryptoProviderFactory>>,
}

impl TokenValidationParameters {
    pub fn with_decryption_key(key: Key) -> Self {
        Self {
            token_decryption_key: Some(key),
            ..Self::default()
        }
    }

    /// Candidate keys in trial order: resolved keys, then the static key.
    pub fn decryption_keys(&self, key_identifier: Option<&str>) -> Vec<Key> {
        let mut keys = self
            .token_decryption_key_resolver
            .as_ref()
            .map(|resolve| resolve(key_identifier))
            .unwrap_or_default();
        keys.extend(self.token_decryption_key.iter().cloned());
        keys
    }
}

impl std::fmt::Debug for TokenValidationParameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenValidationParameters")
            .field("token_decryption_key", &self.token_decryption_key)
            .field("has_key_resolver", &self.token_decryption_key_resolver.is_some())
            .field("has_crypto_provider_factory", &self.crypto_provider_factory.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolved_keys_precede_static_key() {
        let resolver: KeyResolver = Arc::new(|id: Option<&str>| match id {
            Some("kek") => vec![Key::aes(vec![1u8; 16]).with_key_id("resolved")],
            _ => Vec::new(),
        });
        let params = TokenValidationParameters {
            token_decryption_key_resolver: Some(resolver),
            ..TokenValidationParameters::with_decryption_key(
                Key::aes(vec![2u8; 16]).with_key_id("static"),
            )
        };
        let ids = |id| {
            params
                .decryption_keys(id)
                .into_iter()
                .map(|k| k.key_id.unwrap_or_default())
                .collect::<Vec<_>>()
        };
        assert_eq!(ids(Some("kek")), vec!["resolved", "static"]);
        assert_eq!(ids(None), vec!["static"]);
    }

    #[test]
    fn test_no_keys_by_default() {
        assert!(TokenValidationParameters::default().decryption_keys(Some("x")).is_empty());
    }
}
