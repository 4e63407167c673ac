//! Session token authentication.
//!
//! Tokens are HMAC-SHA256 signed and carry their own claims:
//!
//! - 16 bytes: user uuid
//! - 16 bytes: device uuid
//! - 8 bytes: issue time (epoch millis, big-endian)
//! - 32 bytes: HMAC-SHA256 signature over the first 40 bytes
//!
//! Total 72 bytes, base64-encoded for the `Authorization: Bearer` header.

use crate::error::{ServerError, ServerResult};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::Duration;
use tempo_sync_protocol::Millis;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// The identity a validated token proves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenClaims {
    /// The account.
    pub user_uuid: Uuid,
    /// The device the token was issued to.
    pub device_uuid: Uuid,
    /// When the token was issued.
    pub issued_at: Millis,
}

/// Issues and validates session tokens.
#[derive(Clone)]
pub struct TokenValidator {
    secret: Vec<u8>,
    token_expiry: Duration,
}

impl TokenValidator {
    /// Creates a validator with the given signing secret and lifetime.
    pub fn new(secret: Vec<u8>, token_expiry: Duration) -> Self {
        Self {
            secret,
            token_expiry,
        }
    }

    /// Issues a token for a device, returning the encoded token and its
    /// expiry time.
    pub fn create_token(&self, user_uuid: Uuid, device_uuid: Uuid, now: Millis) -> (String, Millis) {
        let mut data = Vec::with_capacity(72);
        data.extend_from_slice(user_uuid.as_bytes());
        data.extend_from_slice(device_uuid.as_bytes());
        data.extend_from_slice(&now.to_be_bytes());

        let signature = self.sign(&data);
        data.extend_from_slice(&signature);

        let expires_at = now + self.token_expiry.as_millis() as Millis;
        (BASE64.encode(data), expires_at)
    }

    /// Validates an encoded token and returns its claims.
    pub fn validate(&self, token: &str, now: Millis) -> ServerResult<TokenClaims> {
        let bytes = BASE64
            .decode(token)
            .map_err(|_| ServerError::NotAuthorized("malformed token".into()))?;
        if bytes.len() != 72 {
            return Err(ServerError::NotAuthorized("invalid token length".into()));
        }

        let signature = &bytes[40..72];
        let expected = self.sign(&bytes[0..40]);
        if signature != expected {
            return Err(ServerError::NotAuthorized("invalid signature".into()));
        }

        let user_uuid = Uuid::from_slice(&bytes[0..16])
            .map_err(|_| ServerError::NotAuthorized("malformed token".into()))?;
        let device_uuid = Uuid::from_slice(&bytes[16..32])
            .map_err(|_| ServerError::NotAuthorized("malformed token".into()))?;
        let issued_bytes: [u8; 8] = bytes[32..40]
            .try_into()
            .map_err(|_| ServerError::NotAuthorized("malformed token".into()))?;
        let issued_at = Millis::from_be_bytes(issued_bytes);

        let expiry = self.token_expiry.as_millis() as Millis;
        if now > issued_at + expiry {
            return Err(ServerError::NotAuthorized("token expired".into()));
        }

        Ok(TokenClaims {
            user_uuid,
            device_uuid,
            issued_at,
        })
    }

    fn sign(&self, data: &[u8]) -> [u8; 32] {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC can take key of any size");
        mac.update(data);
        mac.finalize().into_bytes().into()
    }
}
