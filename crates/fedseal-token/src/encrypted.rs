#![forbid(unsafe_code)]

//! XML Encryption of security tokens.
//!
//! Writing serializes the inner token with the wrapped handler, encrypts it
//! with a fresh session key under AES-CBC, and emits an `xenc:EncryptedData`
//! whose `ds:KeyInfo` carries the session key wrapped for the recipient:
//!
//! ```text
//! <xenc:EncryptedData Type="...#Element">
//!   <xenc:EncryptionMethod Algorithm="...aes256-cbc"/>
//!   <ds:KeyInfo>
//!     <xenc:EncryptedKey>
//!       <xenc:EncryptionMethod Algorithm="...rsa-oaep-mgf1p">
//!         <ds:DigestMethod Algorithm="...sha1"/>
//!       </xenc:EncryptionMethod>
//!       <xenc:CipherData><xenc:CipherValue>wrapped key</xenc:CipherValue></xenc:CipherData>
//!     </xenc:EncryptedKey>
//!   </ds:KeyInfo>
//!   <xenc:CipherData><xenc:CipherValue>IV || ciphertext</xenc:CipherValue></xenc:CipherData>
//! </xenc:EncryptedData>
//! ```
//!
//! Reading reverses the pipeline and hands the plaintext element to the
//! wrapped handler. Any failing step aborts the whole operation.

use std::any::Any;
use std::sync::Arc;

use crate::handler::SecurityTokenHandler;
use crate::params::TokenValidationParameters;
use crate::token::{SecurityToken, ValidatedToken};
use fedseal_core::{algorithm, ns, Error, KeyWrapAlgorithm, Result};
use fedseal_crypto::{OaepHash, OaepParams, RsaKeyTransport};
use fedseal_enc::{
    CipherData, EncryptedKeyKeyInfo, EncryptedType, EncryptionMethod, EncryptionSerializer,
    KeyInfo,
};
use fedseal_keys::{
    get_security_key, unwrap_session_key, CryptoProviderFactory, DefaultCryptoProviderFactory,
    EncryptingCredentials, SessionKey,
};
use fedseal_xml::{reader, XmlWriter};
use roxmltree::Node;
use tracing::{debug, warn};

/// Default limit on the size of a token string: 250 KiB.
pub const DEFAULT_MAXIMUM_TOKEN_SIZE_IN_BYTES: usize = 1024 * 250;

/// Default limit on element nesting in a token or its decrypted content.
pub const DEFAULT_MAXIMUM_DEPTH: usize = 64;

/// An inner token paired with the credentials to encrypt it with.
#[derive(Debug)]
pub struct EncryptedSecurityToken {
    inner: Box<dyn SecurityToken>,
    credentials: EncryptingCredentials,
}

impl EncryptedSecurityToken {
    pub fn new(inner: Box<dyn SecurityToken>, credentials: EncryptingCredentials) -> Self {
        Self { inner, credentials }
    }

    pub fn inner(&self) -> &dyn SecurityToken {
        self.inner.as_ref()
    }

    pub fn credentials(&self) -> &EncryptingCredentials {
        &self.credentials
    }
}

impl SecurityToken for EncryptedSecurityToken {
    fn id(&self) -> Option<&str> {
        self.inner.id()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Settings for [`EncryptedSecurityTokenHandler`].
#[derive(Clone)]
pub struct EncryptedTokenConfig {
    pub serializer: EncryptionSerializer,
    /// Token strings longer than this are rejected before parsing.
    pub maximum_token_size_in_bytes: usize,
    /// Deeper element nesting is rejected before the tree parse.
    pub maximum_depth: usize,
    /// Used for key wrap on write, and for unwrap unless the validation
    /// parameters supply their own.
    pub crypto_provider_factory: Arc<dyn CryptoProviderFactory>,
}

impl Default for EncryptedTokenConfig {
    fn default() -> Self {
        Self {
            serializer: EncryptionSerializer::default(),
            maximum_token_size_in_bytes: DEFAULT_MAXIMUM_TOKEN_SIZE_IN_BYTES,
            maximum_depth: DEFAULT_MAXIMUM_DEPTH,
            crypto_provider_factory: Arc::new(DefaultCryptoProviderFactory),
        }
    }
}

impl std::fmt::Debug for EncryptedTokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedTokenConfig")
            .field("maximum_token_size_in_bytes", &self.maximum_token_size_in_bytes)
            .field("maximum_depth", &self.maximum_depth)
            .finish_non_exhaustive()
    }
}

/// Encrypts and decrypts tokens handled by an inner handler.
#[derive(Clone)]
pub struct EncryptedSecurityTokenHandler {
    inner: Arc<dyn SecurityTokenHandler>,
    config: EncryptedTokenConfig,
}

impl EncryptedSecurityTokenHandler {
    pub fn new(inner: Arc<dyn SecurityTokenHandler>) -> Self {
        Self::with_config(inner, EncryptedTokenConfig::default())
    }

    pub fn with_config(inner: Arc<dyn SecurityTokenHandler>, config: EncryptedTokenConfig) -> Self {
        Self { inner, config }
    }

    pub fn config(&self) -> &EncryptedTokenConfig {
        &self.config
    }

    pub fn inner_handler(&self) -> &dyn SecurityTokenHandler {
        self.inner.as_ref()
    }

    /// Parse a token string, probing only.
    pub fn can_read_token_str(&self, token: &str) -> bool {
        if self.check_size(token).is_err() {
            return false;
        }
        match self.parse(token) {
            Ok(doc) => self.can_read_token(doc.root_element()),
            Err(_) => false,
        }
    }

    pub fn read_token_str(
        &self,
        token: &str,
        params: &TokenValidationParameters,
    ) -> Result<Box<dyn SecurityToken>> {
        self.check_size(token)?;
        let doc = self.parse(token)?;
        self.read_token(doc.root_element(), params)
    }

    pub fn validate_token_str(
        &self,
        token: &str,
        params: &TokenValidationParameters,
    ) -> Result<ValidatedToken> {
        self.check_size(token)?;
        let doc = self.parse(token)?;
        self.validate_token(doc.root_element(), params)
    }

    pub fn write_token_to_string(&self, token: &dyn SecurityToken) -> Result<String> {
        let mut writer = XmlWriter::new();
        self.write_token(&mut writer, token)?;
        writer.into_string()
    }

    fn check_size(&self, token: &str) -> Result<()> {
        let max = self.config.maximum_token_size_in_bytes;
        if token.len() > max {
            return Err(Error::InvalidArgument(format!(
                "token is {} bytes, larger than the maximum of {max}",
                token.len()
            )));
        }
        Ok(())
    }

    fn parse<'a>(&self, xml: &'a str) -> Result<roxmltree::Document<'a>> {
        reader::parse_document_with_depth(xml, self.config.maximum_depth)
    }

    /// Build the `EncryptedData` for `token`.
    fn encrypt(&self, token: &EncryptedSecurityToken) -> Result<EncryptedType> {
        let credentials = token.credentials();
        let (session_key, wrapped_key) =
            get_security_key(credentials, self.config.crypto_provider_factory.as_ref())?;

        let mut inner_writer = XmlWriter::new();
        self.inner.write_token(&mut inner_writer, token.inner())?;
        let plaintext = inner_writer.into_bytes()?;
        let cipher_value = session_key.encrypt(&plaintext)?;
        debug!(
            content = %session_key.algorithm().uri(),
            plaintext_len = plaintext.len(),
            cipher_len = cipher_value.len(),
            "encrypted inner token"
        );

        let mut encrypted_key = EncryptedType::encrypted_key(CipherData::new(wrapped_key));
        encrypted_key.encryption_method = Some(key_wrap_method(credentials)?);
        encrypted_key.key_info = credentials.key.key_id.as_deref().map(KeyInfo::key_name);

        let mut encrypted_data = EncryptedType::encrypted_data(CipherData::new(cipher_value));
        encrypted_data.type_uri = Some(ns::ENC_TYPE_ELEMENT.to_owned());
        encrypted_data.encryption_method =
            Some(EncryptionMethod::new(session_key.algorithm().uri())?);
        encrypted_data.key_info = Some(EncryptedKeyKeyInfo::new(encrypted_key)?.into());
        Ok(encrypted_data)
    }

    /// Recover the inner token's XML from an `EncryptedData` element.
    fn decrypt(&self, element: Node<'_, '_>, params: &TokenValidationParameters) -> Result<String> {
        let encrypted_data = self.config.serializer.read_encrypted_data(element)?;
        let encrypted_key = encrypted_data.encrypted_key_in_key_info().ok_or_else(|| {
            Error::Encryption("EncryptedData KeyInfo does not contain an EncryptedKey".into())
        })?;
        let content_algorithm = encrypted_data
            .encryption_method
            .as_ref()
            .map(EncryptionMethod::algorithm)
            .ok_or_else(|| Error::Encryption("EncryptedData has no EncryptionMethod".into()))?;

        let session_key = self.resolve_session_key(encrypted_key, content_algorithm, params)?;
        let plaintext = session_key
            .decrypt(encrypted_data.cipher_data.cipher_value())
            .map_err(|e| Error::Encryption(format!("failed to decrypt token: {e}")))?;
        debug!(plaintext_len = plaintext.len(), "decrypted inner token");

        String::from_utf8(plaintext)
            .map_err(|e| Error::Encryption(format!("decrypted token is not UTF-8: {e}")))
    }

    fn resolve_session_key(
        &self,
        encrypted_key: &EncryptedType,
        content_algorithm: &str,
        params: &TokenValidationParameters,
    ) -> Result<SessionKey> {
        let method = encrypted_key
            .encryption_method
            .as_ref()
            .ok_or_else(|| Error::Encryption("EncryptedKey has no EncryptionMethod".into()))?;
        let oaep_params = OaepParams {
            digest_uri: method.digest_method.clone(),
            mgf_uri: method.mask_generation_function.clone(),
            label: method.oaep_params.clone(),
        };

        let key_identifier = key_identifier(encrypted_key);
        let candidates = params.decryption_keys(key_identifier);
        debug!(
            key_wrap = %method.algorithm(),
            key_identifier,
            candidates = candidates.len(),
            "resolving token decryption key"
        );
        if candidates.is_empty() {
            return Err(Error::Encryption(format!(
                "no decryption key resolved for key identifier {key_identifier:?}"
            )));
        }

        let factory = params
            .crypto_provider_factory
            .as_deref()
            .unwrap_or(self.config.crypto_provider_factory.as_ref());
        let mut last_error = None;
        for key in &candidates {
            match unwrap_session_key(
                key,
                method.algorithm(),
                &oaep_params,
                encrypted_key.cipher_data.cipher_value(),
                content_algorithm,
                factory,
            ) {
                Ok(session_key) => return Ok(session_key),
                Err(e) => {
                    warn!(
                        key_id = key.key_id.as_deref(),
                        error = %e,
                        "candidate key did not unwrap the session key"
                    );
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| Error::Encryption("no decryption key".into())))
    }
}

impl SecurityTokenHandler for EncryptedSecurityTokenHandler {
    /// True only for an `xenc:EncryptedData` element.
    fn can_read_token(&self, element: Node<'_, '_>) -> bool {
        reader::is_start_element(element, ns::ENC, ns::node::ENCRYPTED_DATA)
    }

    fn read_token(
        &self,
        element: Node<'_, '_>,
        params: &TokenValidationParameters,
    ) -> Result<Box<dyn SecurityToken>> {
        let xml = self.decrypt(element, params)?;
        let doc = self.parse(&xml)?;
        self.inner.read_token(doc.root_element(), params)
    }

    fn validate_token(
        &self,
        element: Node<'_, '_>,
        params: &TokenValidationParameters,
    ) -> Result<ValidatedToken> {
        let xml = self.decrypt(element, params)?;
        let doc = self.parse(&xml)?;
        self.inner.validate_token(doc.root_element(), params)
    }

    /// `token` must be an [`EncryptedSecurityToken`].
    fn write_token(&self, writer: &mut XmlWriter, token: &dyn SecurityToken) -> Result<()> {
        let token = token
            .as_any()
            .downcast_ref::<EncryptedSecurityToken>()
            .ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "EncryptedSecurityTokenHandler can only write an EncryptedSecurityToken, got {token:?}"
                ))
            })?;
        let encrypted_data = self.encrypt(token)?;
        self.config.serializer.write_encrypted_data(writer, &encrypted_data)
    }
}

/// `EncryptionMethod` for the wrapped key. The canonical URI is written;
/// for RSA-OAEP the digest and a non-SHA-1 MGF are made explicit so the
/// reader does not depend on the spelling's defaults.
fn key_wrap_method(credentials: &EncryptingCredentials) -> Result<EncryptionMethod> {
    let uri = &credentials.key_wrap_algorithm;
    let alg = KeyWrapAlgorithm::from_uri(uri)
        .ok_or_else(|| Error::Encryption(format!("unsupported key wrap algorithm '{uri}'")))?;
    let mut method = EncryptionMethod::new(alg.uri())?;
    if alg == KeyWrapAlgorithm::RsaOaep {
        let params = &credentials.oaep_params;
        if let RsaKeyTransport::Oaep { mgf, .. } = RsaKeyTransport::from_uri(uri, params)? {
            method.digest_method = Some(
                params
                    .digest_uri
                    .clone()
                    .unwrap_or_else(|| algorithm::SHA1.to_owned()),
            );
            if mgf != OaepHash::Sha1 || params.mgf_uri.is_some() {
                method.mask_generation_function = Some(mgf.mgf_uri().to_owned());
            }
        }
        method.oaep_params = params.label.clone();
    }
    Ok(method)
}

/// `ds:KeyName` of the `EncryptedKey`'s own `KeyInfo`, else its `Id`.
fn key_identifier(encrypted_key: &EncryptedType) -> Option<&str> {
    match &encrypted_key.key_info {
        Some(KeyInfo::Identifiers {
            key_name: Some(name),
            ..
        }) => Some(name.as_str()),
        _ => encrypted_key.id.as_deref(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::{RawXmlToken, RawXmlTokenHandler};
    use fedseal_keys::Key;

    fn handler() -> EncryptedSecurityTokenHandler {
        EncryptedSecurityTokenHandler::new(Arc::new(RawXmlTokenHandler))
    }

    fn aes_token(kek: &Key) -> EncryptedSecurityToken {
        EncryptedSecurityToken::new(
            Box::new(RawXmlToken::parse("<Token>abc</Token>").unwrap()),
            EncryptingCredentials::new(kek.clone(), algorithm::KW_AES256, algorithm::AES128_CBC),
        )
    }

    #[test]
    fn test_aes_kw_roundtrip() {
        let kek = Key::aes(vec![0x5Au8; 32]).with_key_id("kek-1");
        let handler = handler();
        let xml = handler.write_token_to_string(&aes_token(&kek)).unwrap();
        assert!(xml.contains("<ds:KeyName>kek-1</ds:KeyName>"));
        assert!(!xml.contains("<Token>"));
        assert!(handler.can_read_token_str(&xml));

        let params = TokenValidationParameters::with_decryption_key(kek);
        let validated = handler.validate_token_str(&xml, &params).unwrap();
        let raw = validated.token.as_any().downcast_ref::<RawXmlToken>().unwrap();
        assert_eq!(raw.xml(), "<Token>abc</Token>");
    }

    #[test]
    fn test_resolver_receives_key_name() {
        let kek = Key::aes(vec![0x11u8; 32]).with_key_id("by-name");
        let handler = handler();
        let xml = handler.write_token_to_string(&aes_token(&kek)).unwrap();

        let expected = kek.clone();
        let params = TokenValidationParameters {
            token_decryption_key_resolver: Some(Arc::new(move |id: Option<&str>| {
                if id == Some("by-name") {
                    vec![expected.clone()]
                } else {
                    Vec::new()
                }
            })),
            ..TokenValidationParameters::default()
        };
        let token = handler.read_token_str(&xml, &params).unwrap();
        assert_eq!(
            token.as_any().downcast_ref::<RawXmlToken>().map(RawXmlToken::xml),
            Some("<Token>abc</Token>")
        );
    }

    #[test]
    fn test_wrong_key_is_encryption_failure() {
        let handler = handler();
        let xml = handler
            .write_token_to_string(&aes_token(&Key::aes(vec![1u8; 32])))
            .unwrap();
        let params = TokenValidationParameters::with_decryption_key(Key::aes(vec![2u8; 32]));
        assert!(matches!(
            handler.validate_token_str(&xml, &params),
            Err(Error::Encryption(_))
        ));
    }

    #[test]
    fn test_no_decryption_key() {
        let handler = handler();
        let xml = handler
            .write_token_to_string(&aes_token(&Key::aes(vec![1u8; 32])))
            .unwrap();
        let err = handler
            .validate_token_str(&xml, &TokenValidationParameters::default())
            .unwrap_err();
        assert!(matches!(err, Error::Encryption(msg) if msg.contains("no decryption key")));
    }

    #[test]
    fn test_unsupported_wrap_for_resolved_key() {
        let handler = handler();
        let xml = handler
            .write_token_to_string(&aes_token(&Key::aes(vec![1u8; 32])))
            .unwrap();
        let params = TokenValidationParameters::with_decryption_key(Key::aes(vec![1u8; 16]));
        let err = handler.validate_token_str(&xml, &params).unwrap_err();
        assert!(matches!(err, Error::Encryption(msg) if msg.contains("not supported")));
    }

    #[test]
    fn test_missing_encrypted_key() {
        let xml = format!(
            "<xenc:EncryptedData xmlns:xenc=\"{}\"><xenc:EncryptionMethod Algorithm=\"{}\"/>\
             <xenc:CipherData><xenc:CipherValue>AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=</xenc:CipherValue>\
             </xenc:CipherData></xenc:EncryptedData>",
            ns::ENC,
            algorithm::AES128_CBC
        );
        let params = TokenValidationParameters::with_decryption_key(Key::aes(vec![1u8; 32]));
        let err = handler().validate_token_str(&xml, &params).unwrap_err();
        assert!(matches!(err, Error::Encryption(msg) if msg.contains("EncryptedKey")));
    }

    #[test]
    fn test_write_requires_encrypted_token() {
        let plain = RawXmlToken::parse("<Token>abc</Token>").unwrap();
        assert!(matches!(
            handler().write_token_to_string(&plain),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_can_read_token_probing() {
        let handler = handler();
        assert!(!handler.can_read_token_str("<Token>abc</Token>"));
        assert!(!handler.can_read_token_str("not xml"));
        assert!(!handler.can_read_token_str(&format!(
            "<EncryptedData xmlns=\"{}\"><Broken>",
            ns::ENC
        )));
        assert!(handler.can_read_token_str(&format!("<EncryptedData xmlns=\"{}\"/>", ns::ENC)));
    }

    #[test]
    fn test_size_guard() {
        let config = EncryptedTokenConfig {
            maximum_token_size_in_bytes: 64,
            ..EncryptedTokenConfig::default()
        };
        let handler = EncryptedSecurityTokenHandler::with_config(Arc::new(RawXmlTokenHandler), config);
        let small = format!("<EncryptedData xmlns=\"{}\"/>", ns::ENC);
        assert!(small.len() <= 64);
        assert!(handler.can_read_token_str(&small));

        let oversized = "x".repeat(65);
        assert!(!handler.can_read_token_str(&oversized));
        let err = handler
            .validate_token_str(&oversized, &TokenValidationParameters::default())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_deeply_nested_token_is_rejected_before_parsing() {
        let handler = handler();
        let deep = format!("{}{}", "<a>".repeat(36_000), "</a>".repeat(36_000));
        assert!(deep.len() <= DEFAULT_MAXIMUM_TOKEN_SIZE_IN_BYTES);
        assert!(!handler.can_read_token_str(&deep));
        let err = handler
            .validate_token_str(&deep, &TokenValidationParameters::default())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(msg) if msg.contains("depth")));
    }

    fn nested_encrypted_data(levels: usize) -> String {
        let cipher = "<xenc:CipherData><xenc:CipherValue>AQ==</xenc:CipherValue></xenc:CipherData>";
        let mut key_info = String::new();
        for _ in 0..levels {
            key_info = format!("<ds:KeyInfo><xenc:EncryptedKey>{key_info}{cipher}</xenc:EncryptedKey></ds:KeyInfo>");
        }
        format!(
            "<xenc:EncryptedData xmlns:xenc=\"{}\" xmlns:ds=\"{}\">\
             <xenc:EncryptionMethod Algorithm=\"{}\"/>{key_info}{cipher}</xenc:EncryptedData>",
            ns::ENC,
            ns::DSIG,
            algorithm::AES128_CBC
        )
    }

    #[test]
    fn test_nested_encrypted_keys_are_capped() {
        let params = TokenValidationParameters::with_decryption_key(Key::aes(vec![1u8; 32]));

        let deep = nested_encrypted_data(1_500);
        assert!(deep.len() <= DEFAULT_MAXIMUM_TOKEN_SIZE_IN_BYTES);
        let err = handler().validate_token_str(&deep, &params).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(msg) if msg.contains("depth")));

        let config = EncryptedTokenConfig {
            maximum_depth: 1_000,
            ..EncryptedTokenConfig::default()
        };
        let lenient = EncryptedSecurityTokenHandler::with_config(Arc::new(RawXmlTokenHandler), config);
        let err = lenient
            .validate_token_str(&nested_encrypted_data(40), &params)
            .unwrap_err();
        assert!(matches!(err, Error::EncryptedDataRead(msg) if msg.contains("nested")));
    }

    #[test]
    fn test_key_wrap_method_canonicalizes_oaep() {
        let sk = rsa::RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap();
        let creds = EncryptingCredentials::new(
            Key::rsa_private(sk),
            algorithm::RSA_OAEP_ENC11,
            algorithm::AES256_CBC,
        )
        .with_oaep_params(OaepParams {
            digest_uri: Some(algorithm::SHA256.into()),
            ..OaepParams::default()
        });
        let method = key_wrap_method(&creds).unwrap();
        assert_eq!(method.algorithm(), algorithm::RSA_OAEP);
        assert_eq!(method.digest_method.as_deref(), Some(algorithm::SHA256));
        assert_eq!(method.mask_generation_function.as_deref(), Some(algorithm::MGF1_SHA256));
    }
}
