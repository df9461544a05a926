/// Factory: build the bearer `TokenValidator` from application `Config`.
use std::sync::Arc;

use crate::config::{AuthMode, Config, ConfigError};
use crate::services::auth::TokenValidator;

pub fn build_token_validator(config: &Config) -> Result<Arc<TokenValidator>, ConfigError> {
    let validator = match &config.auth_mode {
        AuthMode::Unverified => {
            tracing::warn!(
                "AUTH_MODE=unverified: bearer token signatures are NOT checked; \
                 any well-formed unexpired token is accepted"
            );
            TokenValidator::unverified()
        }
        AuthMode::Hs256 { secret } => TokenValidator::hs256(secret.as_bytes()),
        AuthMode::EdDsa { public_key_pem } => TokenValidator::eddsa(public_key_pem).map_err(|e| {
            tracing::warn!(error = %e, "failed to parse access JWT public key PEM (expected Ed25519)");
            ConfigError::Invalid("ACCESS_JWT_PUBLIC_KEY_PEM")
        })?,
    };

    let mut validator = validator.with_leeway(config.access_token_leeway_seconds);
    if let Some(issuer) = &config.auth_issuer {
        validator = validator.with_issuer(issuer.clone());
    }
    if let Some(audience) = &config.auth_audience {
        validator = validator.with_audience(audience.clone());
    }

    Ok(Arc::new(validator))
}
