//! Bearer token validation.
//!
//! A token is `header.payload.signature`. Validation decodes the payload and
//! decides valid / expired / malformed. Signature verification depends on the
//! configured [`TokenVerification`]:
//!
//! - `Unverified`: structure + expiration only. Any well-formed unexpired
//!   token is accepted, so this mode is refused in production by `Config`.
//! - `Signed`: signature checked by `jsonwebtoken` (HS256 or EdDSA).
//!
//! Expiration, `nbf`, issuer and audience are checked here rather than by
//! `jsonwebtoken::Validation`, so every mode applies the same rules.

use std::fmt;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, errors::ErrorKind};
use serde::{Deserialize, de::DeserializeOwned};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("token expired")]
    Expired,
    #[error("token not yet valid")]
    NotYetValid,
    #[error("invalid token signature")]
    InvalidSignature,
    #[error("invalid '{0}' claim")]
    InvalidClaim(&'static str),
}

/// Decoded token claims.
///
/// Built per validation call and dropped after the decision; never cached.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenClaims {
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub nbf: Option<i64>,
    #[serde(default)]
    pub iat: Option<i64>,

    #[serde(default)]
    pub iss: Option<String>,
    // string or array of strings
    #[serde(default)]
    pub aud: serde_json::Value,
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub jti: Option<String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TokenClaims {
    fn has_audience(&self, expected: &str) -> bool {
        match &self.aud {
            serde_json::Value::String(s) => s == expected,
            serde_json::Value::Array(arr) => arr.iter().any(|v| v.as_str() == Some(expected)),
            _ => false,
        }
    }
}

#[derive(Clone)]
pub enum TokenVerification {
    Unverified,
    Signed {
        key: DecodingKey,
        algorithm: Algorithm,
    },
}

#[derive(Clone)]
pub struct TokenValidator {
    verification: TokenVerification,
    issuer: Option<String>,
    audience: Option<String>,
    leeway_seconds: i64,
}

impl fmt::Debug for TokenValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print key material
        let mode = match &self.verification {
            TokenVerification::Unverified => "unverified",
            TokenVerification::Signed { .. } => "signed",
        };
        f.debug_struct("TokenValidator")
            .field("mode", &mode)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("leeway_seconds", &self.leeway_seconds)
            .finish()
    }
}

impl TokenValidator {
    pub fn new(verification: TokenVerification) -> Self {
        Self {
            verification,
            issuer: None,
            audience: None,
            leeway_seconds: 0,
        }
    }

    pub fn unverified() -> Self {
        Self::new(TokenVerification::Unverified)
    }

    pub fn hs256(secret: &[u8]) -> Self {
        Self::new(TokenVerification::Signed {
            key: DecodingKey::from_secret(secret),
            algorithm: Algorithm::HS256,
        })
    }

    /// `public_key_pem` must be an Ed25519 public key in PEM format.
    pub fn eddsa(public_key_pem: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        let key = DecodingKey::from_ed_pem(public_key_pem.as_bytes())?;
        Ok(Self::new(TokenVerification::Signed {
            key,
            algorithm: Algorithm::EdDSA,
        }))
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    pub fn with_leeway(mut self, seconds: u64) -> Self {
        self.leeway_seconds = i64::try_from(seconds).unwrap_or(i64::MAX);
        self
    }

    pub fn is_unverified(&self) -> bool {
        matches!(self.verification, TokenVerification::Unverified)
    }

    pub fn validate(&self, token: &str) -> Result<TokenClaims, TokenError> {
        self.validate_at(token, chrono::Utc::now().timestamp())
    }

    /// Validate against an explicit clock (seconds since epoch).
    pub fn validate_at(&self, token: &str, now: i64) -> Result<TokenClaims, TokenError> {
        let claims = match &self.verification {
            TokenVerification::Unverified => decode_unverified(token)?,
            TokenVerification::Signed { key, algorithm } => decode_signed(token, key, *algorithm)?,
        };

        let exp = claims.exp.ok_or(TokenError::Malformed)?;
        if exp.saturating_add(self.leeway_seconds) <= now {
            return Err(TokenError::Expired);
        }

        if let Some(nbf) = claims.nbf
            && nbf > now.saturating_add(self.leeway_seconds)
        {
            return Err(TokenError::NotYetValid);
        }

        if let Some(expected) = self.issuer.as_deref()
            && claims.iss.as_deref() != Some(expected)
        {
            return Err(TokenError::InvalidClaim("iss"));
        }

        if let Some(expected) = self.audience.as_deref()
            && !claims.has_audience(expected)
        {
            return Err(TokenError::InvalidClaim("aud"));
        }

        Ok(claims)
    }
}

fn decode_unverified(token: &str) -> Result<TokenClaims, TokenError> {
    let mut segments = token.split('.');
    let (Some(header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(TokenError::Malformed);
    };

    let header: serde_json::Value = decode_segment(header)?;
    if !header.get("alg").is_some_and(serde_json::Value::is_string) {
        return Err(TokenError::Malformed);
    }

    decode_segment(payload)
}

fn decode_segment<T: DeserializeOwned>(segment: &str) -> Result<T, TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment.trim_end_matches('='))
        .map_err(|_| TokenError::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)
}

fn decode_signed(
    token: &str,
    key: &DecodingKey,
    algorithm: Algorithm,
) -> Result<TokenClaims, TokenError> {
    let mut validation = Validation::new(algorithm);
    // Time and audience claims are checked by the validator itself.
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    jsonwebtoken::decode::<TokenClaims>(token, key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                TokenError::InvalidSignature
            }
            _ => TokenError::Malformed,
        })
}
