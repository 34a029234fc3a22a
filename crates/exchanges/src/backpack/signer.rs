use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use ed25519_dalek::{Signer, SigningKey};

use super::params::Params;

/// 서명 유효 시간 기본값 (ms)
pub const DEFAULT_WINDOW_MS: u64 = 5000;

/// 서명 대상 메시지 생성
///
/// `instruction=<name>&<정렬된 params>&timestamp=<ms>&window=<ms>`
/// params 가 비어 있으면 가운데 구간은 생략된다.
pub fn build_message(instruction: &str, params: &Params, timestamp_ms: i64, window_ms: u64) -> String {
    let query = params.to_query();
    let mut message = format!("instruction={}&", instruction);
    if !query.is_empty() {
        message.push_str(&query);
        message.push('&');
    }
    message.push_str(&format!("timestamp={}&window={}", timestamp_ms, window_ms));
    message
}

/// ed25519 서명 후 base64 로 인코딩. 같은 입력이면 항상 같은 서명이 나온다.
pub fn sign(
    params: &Params,
    signing_key: &SigningKey,
    timestamp_ms: i64,
    instruction: &str,
    window_ms: Option<u64>,
) -> String {
    let message = build_message(
        instruction,
        params,
        timestamp_ms,
        window_ms.unwrap_or(DEFAULT_WINDOW_MS),
    );
    let signature = signing_key.sign(message.as_bytes());
    BASE64.encode(signature.to_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signature, Verifier};

    fn key() -> SigningKey {
        SigningKey::from_bytes(&[42; 32])
    }

    #[test]
    fn test_message_layout() {
        let params = Params::new().with("symbol", "SOL_USDC");
        assert_eq!(
            build_message("ticker", &params, 1700000000000, 5000),
            "instruction=ticker&symbol=SOL_USDC&timestamp=1700000000000&window=5000"
        );
        assert_eq!(
            build_message("balanceQuery", &Params::new(), 1700000000000, 5000),
            "instruction=balanceQuery&timestamp=1700000000000&window=5000"
        );
    }

    #[test]
    fn test_canonical_key_order() {
        let params = Params::new().with("b", "2").with("a", "1");
        let message = build_message("orderExecute", &params, 1, 5000);
        assert_eq!(message, "instruction=orderExecute&a=1&b=2&timestamp=1&window=5000");
    }

    #[test]
    fn test_signature_is_deterministic() {
        let params = Params::new().with("symbol", "SOL_USDC").with("side", "Bid");
        let first = sign(&params, &key(), 1700000000000, "orderExecute", Some(5000));
        let second = sign(&params, &key(), 1700000000000, "orderExecute", Some(5000));
        assert_eq!(first, second);
    }

    #[test]
    fn test_any_field_changes_signature() {
        let params = Params::new().with("symbol", "SOL_USDC");
        let base = sign(&params, &key(), 1000, "orderExecute", Some(5000));

        let other_params = Params::new().with("symbol", "SOL_USDC_PERP");
        assert_ne!(base, sign(&other_params, &key(), 1000, "orderExecute", Some(5000)));
        assert_ne!(base, sign(&params, &SigningKey::from_bytes(&[43; 32]), 1000, "orderExecute", Some(5000)));
        assert_ne!(base, sign(&params, &key(), 1001, "orderExecute", Some(5000)));
        assert_ne!(base, sign(&params, &key(), 1000, "orderCancel", Some(5000)));
        assert_ne!(base, sign(&params, &key(), 1000, "orderExecute", Some(6000)));
    }

    #[test]
    fn test_default_window() {
        let params = Params::new();
        assert_eq!(
            sign(&params, &key(), 1000, "balanceQuery", None),
            sign(&params, &key(), 1000, "balanceQuery", Some(DEFAULT_WINDOW_MS))
        );
    }

    #[test]
    fn test_signature_verifies_against_message() {
        let params = Params::new().with("symbol", "SOL_USDC");
        let encoded = sign(&params, &key(), 1000, "orderQueryAll", None);
        let bytes: [u8; 64] = BASE64.decode(encoded).unwrap().try_into().unwrap();
        let message = build_message("orderQueryAll", &params, 1000, DEFAULT_WINDOW_MS);

        key()
            .verifying_key()
            .verify(message.as_bytes(), &Signature::from_bytes(&bytes))
            .unwrap();
    }
}
