//! Signed, stateless access tokens for image links.
//!
//! Payload: expires_at (i64 BE, epoch seconds) || image_id (16 bytes) = 24 bytes.
//! Token = base64url(payload || HMAC-SHA256(secret, payload)).

use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

const PAYLOAD_LEN: usize = 8 + 16; // expiry + image_id
const MAC_LEN: usize = 32; // SHA256
const TOKEN_LEN: usize = PAYLOAD_LEN + MAC_LEN;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token is not valid base64url")]
    Encoding,
    #[error("token has the wrong length")]
    Length,
    #[error("token signature does not match")]
    Signature,
}

/// Claims carried by a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessClaims {
    pub image_id: Uuid,
    /// Epoch seconds after which the token is rejected
    pub expires_at: i64,
}

#[derive(Clone)]
pub struct AccessTokenCodec {
    mac: HmacSha256,
}

impl AccessTokenCodec {
    pub fn new(secret: &[u8]) -> Result<Self, anyhow::Error> {
        let mac = HmacSha256::new_from_slice(secret)
            .map_err(|e| anyhow::anyhow!("Invalid token secret: {}", e))?;
        Ok(Self { mac })
    }

    /// Use the configured secret, or a random one that lives as long as the process.
    pub fn from_secret(secret: Option<&str>) -> Result<Self, anyhow::Error> {
        match secret {
            Some(secret) => Self::new(secret.as_bytes()),
            None => {
                tracing::warn!("TOKEN_SECRET not set, image links will not survive a restart");
                let secret: [u8; 32] = rand::random();
                Self::new(&secret)
            }
        }
    }

    pub fn encode(&self, image_id: Uuid, expires_at: i64) -> String {
        let mut token_bytes = [0u8; TOKEN_LEN];
        token_bytes[0..8].copy_from_slice(&expires_at.to_be_bytes());
        token_bytes[8..PAYLOAD_LEN].copy_from_slice(image_id.as_bytes());

        let mut mac = self.mac.clone();
        mac.update(&token_bytes[..PAYLOAD_LEN]);
        token_bytes[PAYLOAD_LEN..].copy_from_slice(&mac.finalize().into_bytes());

        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(token_bytes)
    }

    /// Verify the signature and return the claims. Expiry is not checked here.
    pub fn decode(&self, token: &str) -> Result<AccessClaims, TokenError> {
        let decoded = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(token.trim())
            .map_err(|_| TokenError::Encoding)?;
        if decoded.len() != TOKEN_LEN {
            return Err(TokenError::Length);
        }

        let (payload, tag) = decoded.split_at(PAYLOAD_LEN);
        let mut mac = self.mac.clone();
        mac.update(payload);
        mac.verify_slice(tag).map_err(|_| TokenError::Signature)?;

        let (expiry, id) = payload.split_at(8);
        let expiry: [u8; 8] = expiry.try_into().map_err(|_| TokenError::Length)?;
        let id: [u8; 16] = id.try_into().map_err(|_| TokenError::Length)?;

        Ok(AccessClaims {
            image_id: Uuid::from_bytes(id),
            expires_at: i64::from_be_bytes(expiry),
        })
    }
}

impl std::fmt::Debug for AccessTokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessTokenCodec { .. }")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> AccessTokenCodec {
        AccessTokenCodec::new(b"0123456789abcdef0123456789abcdef").unwrap()
    }

    #[test]
    fn test_round_trip() {
        let codec = codec();
        let id = Uuid::new_v4();
        let token = codec.encode(id, 1_700_000_900);

        let claims = codec.decode(&token).unwrap();
        assert_eq!(claims.image_id, id);
        assert_eq!(claims.expires_at, 1_700_000_900);
    }

    #[test]
    fn test_token_is_url_safe() {
        let token = codec().encode(Uuid::new_v4(), i64::MAX);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let codec = codec();
        let id = Uuid::new_v4();
        assert_eq!(codec.encode(id, 42), codec.encode(id, 42));
        assert_ne!(codec.encode(id, 42), codec.encode(id, 43));
    }

    #[test]
    fn test_tampered_token_is_rejected() {
        let codec = codec();
        let token = codec.encode(Uuid::new_v4(), 1_700_000_000);

        let mut bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(&token)
            .unwrap();
        // push the expiry forward
        bytes[7] ^= 0x01;
        let forged = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(&bytes);

        assert_eq!(codec.decode(&forged), Err(TokenError::Signature));
    }

    #[test]
    fn test_other_secret_is_rejected() {
        let token = codec().encode(Uuid::new_v4(), 1_700_000_000);
        let other = AccessTokenCodec::new(b"another-secret-another-secret-xx").unwrap();
        assert_eq!(other.decode(&token), Err(TokenError::Signature));
    }

    #[test]
    fn test_malformed_tokens() {
        let codec = codec();
        assert_eq!(codec.decode(""), Err(TokenError::Length));
        assert_eq!(codec.decode("not base64!"), Err(TokenError::Encoding));
        assert_eq!(codec.decode("AAAA"), Err(TokenError::Length));
    }

    #[test]
    fn test_random_secret_codecs_disagree() {
        let a = AccessTokenCodec::from_secret(None).unwrap();
        let b = AccessTokenCodec::from_secret(None).unwrap();
        let token = a.encode(Uuid::new_v4(), 10);
        assert!(a.decode(&token).is_ok());
        assert!(b.decode(&token).is_err());
    }
}
