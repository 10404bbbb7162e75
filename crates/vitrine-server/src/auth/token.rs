use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt::{Display, Formatter};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use vitrine_model::UserId;

pub const TOKEN_TYPE: &str = "bearer";

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    Malformed,
    BadSignature,
    Expired,
    InvalidSubject,
    Signing,
}

impl Display for TokenError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenError::Malformed => write!(f, "token is malformed"),
            TokenError::BadSignature => write!(f, "token signature mismatch"),
            TokenError::Expired => write!(f, "token expired"),
            TokenError::InvalidSubject => write!(f, "token subject is not a user id"),
            TokenError::Signing => write!(f, "token signing failed"),
        }
    }
}

impl std::error::Error for TokenError {}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: u64,
}

fn unix_secs(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH).map_or(0, |d| d.as_secs())
}

fn sign(secret: &[u8], signing_input: &str) -> Result<Vec<u8>, TokenError> {
    let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| TokenError::Signing)?;
    mac.update(signing_input.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Mints a compact HS256 JWT with `sub` and `exp` claims.
pub fn mint_token(
    secret: &[u8],
    user: UserId,
    ttl: Duration,
    now: SystemTime,
) -> Result<String, TokenError> {
    let header = serde_json::json!({"alg": "HS256", "typ": "JWT"});
    let claims = Claims {
        sub: user.to_string(),
        exp: unix_secs(now) + ttl.as_secs(),
    };
    let header_b64 =
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header).map_err(|_| TokenError::Signing)?);
    let claims_b64 =
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).map_err(|_| TokenError::Signing)?);
    let signing_input = format!("{header_b64}.{claims_b64}");
    let signature = sign(secret, &signing_input)?;
    Ok(format!(
        "{signing_input}.{}",
        URL_SAFE_NO_PAD.encode(signature)
    ))
}

/// Verifies signature and expiry, returning the subject user id.
pub fn verify_token(secret: &[u8], token: &str, now: SystemTime) -> Result<UserId, TokenError> {
    let mut parts = token.splitn(3, '.');
    let (Some(header_b64), Some(claims_b64), Some(sig_b64)) =
        (parts.next(), parts.next(), parts.next())
    else {
        return Err(TokenError::Malformed);
    };
    let signature = URL_SAFE_NO_PAD
        .decode(sig_b64)
        .map_err(|_| TokenError::Malformed)?;

    let signing_input = format!("{header_b64}.{claims_b64}");
    let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| TokenError::Signing)?;
    mac.update(signing_input.as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| TokenError::BadSignature)?;

    let claims_raw = URL_SAFE_NO_PAD
        .decode(claims_b64)
        .map_err(|_| TokenError::Malformed)?;
    let claims: Claims =
        serde_json::from_slice(&claims_raw).map_err(|_| TokenError::Malformed)?;
    if claims.exp < unix_secs(now) {
        return Err(TokenError::Expired);
    }
    UserId::parse(&claims.sub).map_err(|_| TokenError::InvalidSubject)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"insecure-demo-secret-key";

    #[test]
    fn mint_then_verify_roundtrips_the_subject() {
        let user = UserId::random();
        let now = SystemTime::now();
        let token = mint_token(SECRET, user, Duration::from_secs(1800), now).expect("mint");
        assert_eq!(verify_token(SECRET, &token, now).expect("verify"), user);
    }

    #[test]
    fn wrong_secret_fails_signature_check() {
        let token = mint_token(
            SECRET,
            UserId::random(),
            Duration::from_secs(60),
            SystemTime::now(),
        )
        .expect("mint");
        assert_eq!(
            verify_token(b"other-secret", &token, SystemTime::now()),
            Err(TokenError::BadSignature)
        );
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let minted_at = SystemTime::now();
        let token =
            mint_token(SECRET, UserId::random(), Duration::from_secs(1), minted_at).expect("mint");
        let later = minted_at + Duration::from_secs(120);
        assert_eq!(verify_token(SECRET, &token, later), Err(TokenError::Expired));
    }

    #[test]
    fn garbage_tokens_are_malformed_not_panics() {
        for bad in ["", "abc", "a.b", "a.b.c", "!!.!!.!!"] {
            let err = verify_token(SECRET, bad, SystemTime::now()).expect_err("must fail");
            assert!(
                matches!(err, TokenError::Malformed | TokenError::BadSignature),
                "unexpected error for {bad:?}: {err}"
            );
        }
    }

    #[test]
    fn tampered_claims_fail_verification() {
        let token = mint_token(
            SECRET,
            UserId::random(),
            Duration::from_secs(60),
            SystemTime::now(),
        )
        .expect("mint");
        let mut parts: Vec<&str> = token.split('.').collect();
        let forged = URL_SAFE_NO_PAD.encode(br#"{"sub":"forged","exp":99999999999}"#);
        parts[1] = &forged;
        let tampered = parts.join(".");
        assert_eq!(
            verify_token(SECRET, &tampered, SystemTime::now()),
            Err(TokenError::BadSignature)
        );
    }
}
