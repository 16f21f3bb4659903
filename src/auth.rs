//! 토큰 기반 신원 확인
//!
//! 외부 인증 서비스가 발급하는 기간 제한 토큰을 검증해 사용자 id로
//! 환원한다. 형식: `base64(user_id:expiry:hmac_sha1(user_id:expiry))`

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

type HmacSha1 = Hmac<Sha1>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("malformed token")]
    Malformed,

    #[error("token expired")]
    Expired,

    #[error("bad signature")]
    BadSignature,
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before unix epoch")
        .as_secs()
}

fn sign(payload: &str, secret: &str) -> String {
    let mut mac =
        HmacSha1::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(payload.as_bytes());
    BASE64.encode(mac.finalize().into_bytes())
}

/// 토큰 발급. 운영에서는 인증 서비스 몫이고 여기서는 테스트/로컬용
pub fn issue_token(user_id: &str, secret: &str, ttl_secs: u64) -> String {
    let expiry = unix_now() + ttl_secs;
    let payload = format!("{}:{}", user_id, expiry);
    let signature = sign(&payload, secret);
    BASE64.encode(format!("{}:{}", payload, signature))
}

/// 토큰 → 사용자 id
pub fn resolve_identity(token: &str, secret: &str) -> Result<String, AuthError> {
    let decoded = BASE64.decode(token).map_err(|_| AuthError::Malformed)?;
    let decoded = String::from_utf8(decoded).map_err(|_| AuthError::Malformed)?;

    // user_id에 ':'가 올 수 있으므로 뒤에서부터 나눈다
    let (payload, signature) = decoded.rsplit_once(':').ok_or(AuthError::Malformed)?;
    let (user_id, expiry) = payload.rsplit_once(':').ok_or(AuthError::Malformed)?;

    let expiry: u64 = expiry.parse().map_err(|_| AuthError::Malformed)?;
    if expiry <= unix_now() {
        return Err(AuthError::Expired);
    }

    let mut mac =
        HmacSha1::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(payload.as_bytes());
    let expected = BASE64.decode(signature).map_err(|_| AuthError::Malformed)?;
    mac.verify_slice(&expected)
        .map_err(|_| AuthError::BadSignature)?;

    Ok(user_id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip() {
        let token = issue_token("user-42", "secret", 60);
        let resolved = resolve_identity(&token, "secret").unwrap();
        assert_eq!(resolved, "user-42");
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = issue_token("user-42", "secret", 0);
        assert!(matches!(
            resolve_identity(&token, "secret"),
            Err(AuthError::Expired)
        ));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue_token("user-42", "secret", 60);
        assert!(matches!(
            resolve_identity(&token, "other-secret"),
            Err(AuthError::BadSignature)
        ));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            resolve_identity("not-base64!!", "secret"),
            Err(AuthError::Malformed)
        ));
    }
}
