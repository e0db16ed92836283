// ============================
// crates/backend-lib/src/auth/session.rs
// ============================
//! Signed session tokens.
//!
//! A token is `base64(payload) | unix_timestamp | hex(hmac)`, where the HMAC
//! covers the base64 payload and the timestamp. Tokens are stateless: nothing
//! is stored server side, and rotating the secret invalidates all of them.
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Field delimiter. Never produced by the base64, decimal or hex alphabets.
pub const DELIMITER: char = '|';

/// Maximum token age in seconds (31 days), regardless of cookie expiry
pub const FRESHNESS_WINDOW_SECS: i64 = 31 * 24 * 60 * 60;

/// Why a token was rejected. Callers treat all of these as "not logged in".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Invalid token format")]
    InvalidTokenFormat,

    #[error("Token signature mismatch")]
    SignatureMismatch,

    #[error("Token expired")]
    TokenExpired,

    #[error("Token payload could not be decoded")]
    PayloadDecodeError,

    #[error("Session secret is empty")]
    EmptySecret,
}

/// A decoded and verified session token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken {
    pub payload: String,
    pub issued_at: i64,
    signature: Vec<u8>,
}

impl SessionToken {
    /// Sign `payload` with the current time
    pub fn issue(payload: &str, secret: &str) -> Result<Self, TokenError> {
        Self::issue_at(payload, secret, now())
    }

    /// Sign `payload` with an explicit issue time
    pub fn issue_at(payload: &str, secret: &str, issued_at: i64) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::EmptySecret);
        }
        let encoded = STANDARD.encode(payload);
        let signature = mac(secret, &encoded, &issued_at.to_string())
            .finalize()
            .into_bytes()
            .to_vec();

        Ok(Self {
            payload: payload.to_string(),
            issued_at,
            signature,
        })
    }

    /// Render the transport form
    pub fn encode(&self) -> String {
        format!(
            "{}{DELIMITER}{}{DELIMITER}{}",
            STANDARD.encode(&self.payload),
            self.issued_at,
            hex::encode(&self.signature)
        )
    }

    /// Verify and decode a token at the current time
    pub fn decode(token: &str, secret: &str) -> Result<Self, TokenError> {
        Self::decode_at(token, secret, now())
    }

    /// Verify and decode a token as of `now`
    pub fn decode_at(token: &str, secret: &str, now: i64) -> Result<Self, TokenError> {
        let parts: Vec<&str> = token.split(DELIMITER).collect();
        let &[encoded, timestamp, signature] = parts.as_slice() else {
            return Err(TokenError::InvalidTokenFormat);
        };

        // only the canonical lowercase form is accepted, so a case change is a byte change
        if !is_lower_hex(signature) {
            return Err(TokenError::SignatureMismatch);
        }
        let signature = hex::decode(signature).map_err(|_| TokenError::SignatureMismatch)?;
        mac(secret, encoded, timestamp)
            .verify_slice(&signature)
            .map_err(|_| TokenError::SignatureMismatch)?;

        let issued_at: i64 = timestamp
            .parse()
            .map_err(|_| TokenError::InvalidTokenFormat)?;
        if now.saturating_sub(issued_at) > FRESHNESS_WINDOW_SECS {
            return Err(TokenError::TokenExpired);
        }

        let payload = STANDARD
            .decode(encoded)
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .ok_or(TokenError::PayloadDecodeError)?;

        Ok(Self {
            payload,
            issued_at,
            signature,
        })
    }
}

/// Encode `payload` into a signed token string
pub fn encode(payload: &str, secret: &str) -> Result<String, TokenError> {
    Ok(SessionToken::issue(payload, secret)?.encode())
}

/// Decode a signed token string back into its payload
pub fn decode(token: &str, secret: &str) -> Result<String, TokenError> {
    Ok(SessionToken::decode(token, secret)?.payload)
}

fn mac(secret: &str, encoded: &str, timestamp: &str) -> HmacSha256 {
    // HMAC accepts keys of any length
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac key of any size");
    mac.update(encoded.as_bytes());
    mac.update(timestamp.as_bytes());
    mac
}

fn is_lower_hex(s: &str) -> bool {
    s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "abracadabra";

    #[test]
    fn test_round_trip() {
        for payload in ["wind85", "", "æøå user", "a|b"] {
            let token = encode(payload, SECRET).unwrap();
            assert_eq!(decode(&token, SECRET).unwrap(), payload);
        }
    }

    #[test]
    fn test_empty_secret_is_rejected() {
        assert_eq!(encode("wind85", ""), Err(TokenError::EmptySecret));
    }

    #[test]
    fn test_wrong_secret() {
        let token = encode("wind85", SECRET).unwrap();
        assert_eq!(decode(&token, "other"), Err(TokenError::SignatureMismatch));
    }

    #[test]
    fn test_malformed_tokens() {
        assert_eq!(decode("", SECRET), Err(TokenError::InvalidTokenFormat));
        assert_eq!(decode("abc|123", SECRET), Err(TokenError::InvalidTokenFormat));
        assert_eq!(decode("a|b|c|d", SECRET), Err(TokenError::InvalidTokenFormat));
        assert_eq!(decode("a|b|zz", SECRET), Err(TokenError::SignatureMismatch));
    }

    #[test]
    fn test_any_flipped_byte_is_detected() {
        let token = encode("wind85", SECRET).unwrap();
        let bytes = token.as_bytes();

        for i in 0..bytes.len() {
            if bytes[i] == b'|' {
                continue;
            }
            let mut tampered = bytes.to_vec();
            tampered[i] = if tampered[i] == b'0' { b'1' } else { b'0' };
            let tampered = String::from_utf8(tampered).unwrap();

            let err = decode(&tampered, SECRET).unwrap_err();
            assert!(
                matches!(
                    err,
                    TokenError::SignatureMismatch | TokenError::PayloadDecodeError
                ),
                "byte {i}: {err:?}"
            );
        }
    }

    #[test]
    fn test_signature_case_change_is_detected() {
        let token = encode("wind85", SECRET).unwrap();
        let (head, signature) = token.rsplit_once(DELIMITER).unwrap();
        assert!(signature.bytes().any(|b| b.is_ascii_lowercase()));

        let upper = format!("{head}{DELIMITER}{}", signature.to_ascii_uppercase());
        assert_eq!(decode(&upper, SECRET), Err(TokenError::SignatureMismatch));

        // a single letter is enough
        let i = signature.find(|c: char| c.is_ascii_lowercase()).unwrap();
        let mut one = signature.to_string();
        one.replace_range(i..=i, &signature[i..=i].to_ascii_uppercase());
        let tampered = format!("{head}{DELIMITER}{one}");
        assert_eq!(decode(&tampered, SECRET), Err(TokenError::SignatureMismatch));
    }

    #[test]
    fn test_expired_token_with_valid_signature() {
        let issued = 1_700_000_000;
        let token = SessionToken::issue_at("wind85", SECRET, issued).unwrap().encode();

        let fresh = SessionToken::decode_at(&token, SECRET, issued + FRESHNESS_WINDOW_SECS);
        assert_eq!(fresh.unwrap().payload, "wind85");

        let stale = SessionToken::decode_at(&token, SECRET, issued + FRESHNESS_WINDOW_SECS + 1);
        assert_eq!(stale, Err(TokenError::TokenExpired));
    }

    #[test]
    fn test_signed_garbage_payload() {
        // correctly signed, but not base64
        let sig = mac(SECRET, "!!!", "100").finalize().into_bytes();
        let token = format!("!!!|100|{}", hex::encode(sig));
        assert_eq!(
            SessionToken::decode_at(&token, SECRET, 100),
            Err(TokenError::PayloadDecodeError)
        );
    }
}
