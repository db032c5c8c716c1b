//! Bearer token decoding into a claims object.
//!
//! Any failure yields no claims; the compiler then treats the caller as
//! anonymous.

use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use log::debug;
use serde_json::{Map, Value};
use thiserror::Error;

pub type Claims = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationPolicy {
    /// Decode the payload without checking the signature or expiry
    SkipVerification,
    /// Verify with an HS256 secret, or an RS256 public key in PEM form
    Secret(String),
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Malformed token: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("Unsupported signing algorithm {0:?}")]
    UnsupportedAlgorithm(Algorithm),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JwtDecoder;

impl JwtDecoder {
    /// Claims of `token` under `policy`, or `None` on any decode or verification failure.
    pub fn decode(&self, token: &str, policy: &VerificationPolicy) -> Option<Claims> {
        let token = token.trim();
        let token = token.strip_prefix("Bearer ").unwrap_or(token).trim();
        if token.is_empty() {
            return None;
        }
        match decode_claims(token, policy) {
            Ok(claims) => Some(claims),
            Err(e) => {
                debug!("Discarding token: {}", e);
                None
            }
        }
    }
}

fn lenient(algorithm: Algorithm) -> Validation {
    let mut validation = Validation::new(algorithm);
    validation.required_spec_claims.clear();
    validation.validate_aud = false;
    validation
}

fn decode_claims(token: &str, policy: &VerificationPolicy) -> Result<Claims, AuthError> {
    let (key, validation) = match policy {
        VerificationPolicy::SkipVerification => {
            let mut validation = lenient(Algorithm::HS256);
            validation.insecure_disable_signature_validation();
            validation.validate_exp = false;
            (DecodingKey::from_secret(&[]), validation)
        }
        VerificationPolicy::Secret(secret) => match decode_header(token)?.alg {
            Algorithm::HS256 => (
                DecodingKey::from_secret(secret.as_bytes()),
                lenient(Algorithm::HS256),
            ),
            Algorithm::RS256 => (
                DecodingKey::from_rsa_pem(secret.as_bytes())?,
                lenient(Algorithm::RS256),
            ),
            other => return Err(AuthError::UnsupportedAlgorithm(other)),
        },
    };
    Ok(decode::<Claims>(token, &key, &validation)?.claims)
}
