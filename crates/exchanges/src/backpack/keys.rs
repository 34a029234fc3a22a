//! Backpack API 키 디코딩 및 키쌍 검증
//!
//! API Secret 은 ed25519 개인키 seed (base64), API Key 는 ed25519 공개키 (base64) 이다.
//! 두 키가 같은 쌍인지는 클라이언트 생성 시점에 한 번만 확인한다.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use ed25519_dalek::{SigningKey, VerifyingKey, SECRET_KEY_LENGTH};

use interface::ExchangeError;

/// PKCS#8 ed25519 개인키 DER prefix
const PKCS8_ED25519_PREFIX: [u8; 16] = [
    0x30, 0x2e, 0x02, 0x01, 0x00, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x04, 0x22, 0x04, 0x20,
];

/// SPKI ed25519 공개키 DER prefix
const SPKI_ED25519_PREFIX: [u8; 12] = [
    0x30, 0x2a, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x03, 0x21, 0x00,
];

fn decode_b64(raw_b64: &str, what: &str) -> Result<Vec<u8>, ExchangeError> {
    BASE64
        .decode(raw_b64.trim())
        .map_err(|e| ExchangeError::InvalidKey(format!("{} is not valid base64: {}", what, e)))
}

/// base64 개인키를 서명키로 변환한다. 디코딩된 값의 앞 32바이트만 seed 로 사용한다.
pub fn decode_private(raw_b64: &str) -> Result<SigningKey, ExchangeError> {
    let raw = decode_b64(raw_b64, "api secret")?;
    if raw.len() < SECRET_KEY_LENGTH {
        return Err(ExchangeError::InvalidKey(format!(
            "api secret must decode to at least {} bytes, got {}",
            SECRET_KEY_LENGTH,
            raw.len()
        )));
    }

    let mut seed = [0u8; SECRET_KEY_LENGTH];
    seed.copy_from_slice(&raw[..SECRET_KEY_LENGTH]);
    Ok(SigningKey::from_bytes(&seed))
}

/// base64 공개키를 SPKI DER 로 감싼다. 디코딩된 전체 값을 사용한다.
pub fn decode_public(raw_b64: &str) -> Result<Vec<u8>, ExchangeError> {
    let raw = decode_b64(raw_b64, "api key")?;
    let bytes: [u8; 32] = raw.as_slice().try_into().map_err(|_| {
        ExchangeError::InvalidKey(format!("api key must decode to 32 bytes, got {}", raw.len()))
    })?;
    VerifyingKey::from_bytes(&bytes)
        .map_err(|e| ExchangeError::InvalidKey(format!("api key is not an ed25519 point: {}", e)))?;

    Ok(spki_der(&bytes))
}

/// 개인키에서 공개키 32바이트를 유도
pub fn derive_public(signing_key: &SigningKey) -> [u8; 32] {
    signing_key.verifying_key().to_bytes()
}

/// 개인키에서 유도한 공개키의 SPKI 인코딩이 주어진 공개키 인코딩과 바이트 단위로 같은지
pub fn verify_pair(signing_key: &SigningKey, public_der: &[u8]) -> bool {
    spki_der(&derive_public(signing_key)) == public_der
}

pub fn spki_der(public: &[u8; 32]) -> Vec<u8> {
    let mut der = Vec::with_capacity(SPKI_ED25519_PREFIX.len() + public.len());
    der.extend_from_slice(&SPKI_ED25519_PREFIX);
    der.extend_from_slice(public);
    der
}

pub fn pkcs8_der(signing_key: &SigningKey) -> Vec<u8> {
    let mut der = Vec::with_capacity(PKCS8_ED25519_PREFIX.len() + SECRET_KEY_LENGTH);
    der.extend_from_slice(&PKCS8_ED25519_PREFIX);
    der.extend_from_slice(&signing_key.to_bytes());
    der
}

/// 검증이 끝난 키쌍. 생성 이후에는 변하지 않는다.
#[derive(Clone)]
pub struct KeyPair {
    signing_key: SigningKey,
    /// 요청 헤더(X-API-Key)에 그대로 넣는 base64 공개키
    api_key: String,
}

impl KeyPair {
    /// `api_secret` 과 `api_key` 가 같은 쌍이 아니면 `KeyMismatch` 로 실패한다.
    pub fn new(api_secret: &str, api_key: &str) -> Result<Self, ExchangeError> {
        let signing_key = decode_private(api_secret)?;
        let public_der = decode_public(api_key)?;

        if !verify_pair(&signing_key, &public_der) {
            return Err(ExchangeError::KeyMismatch);
        }

        Ok(Self {
            signing_key,
            api_key: api_key.trim().to_string(),
        })
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("api_key", &self.api_key)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// 테스트용 고정 seed 로 (secret, key) base64 쌍을 만든다
    pub(crate) fn key_pair_b64(seed: u8) -> (String, String) {
        let signing_key = SigningKey::from_bytes(&[seed; 32]);
        let secret = BASE64.encode(signing_key.to_bytes());
        let public = BASE64.encode(signing_key.verifying_key().to_bytes());
        (secret, public)
    }

    #[test]
    fn test_matching_pair_constructs() {
        let (secret, public) = key_pair_b64(7);
        let pair = KeyPair::new(&secret, &public).unwrap();
        assert_eq!(pair.api_key(), public);
    }

    #[test]
    fn test_swapped_public_key_is_key_mismatch() {
        let (secret, _) = key_pair_b64(7);
        let (_, other_public) = key_pair_b64(9);
        let err = KeyPair::new(&secret, &other_public).unwrap_err();
        assert!(matches!(err, ExchangeError::KeyMismatch));
    }

    #[test]
    fn test_secret_uses_first_32_bytes() {
        // seed(32) + public(32) 형태의 64바이트 secret 도 허용
        let signing_key = SigningKey::from_bytes(&[3; 32]);
        let mut keypair_bytes = signing_key.to_bytes().to_vec();
        keypair_bytes.extend_from_slice(&signing_key.verifying_key().to_bytes());
        let secret = BASE64.encode(&keypair_bytes);
        let public = BASE64.encode(signing_key.verifying_key().to_bytes());

        assert!(KeyPair::new(&secret, &public).is_ok());
    }

    #[test]
    fn test_invalid_key_material() {
        let (secret, public) = key_pair_b64(1);
        assert!(matches!(
            KeyPair::new("not base64!!", &public),
            Err(ExchangeError::InvalidKey(_))
        ));
        assert!(matches!(
            KeyPair::new(&secret, &BASE64.encode([1u8; 16])),
            Err(ExchangeError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_der_encodings() {
        let signing_key = SigningKey::from_bytes(&[5; 32]);
        let pkcs8 = pkcs8_der(&signing_key);
        assert_eq!(pkcs8.len(), 48);
        assert_eq!(&pkcs8[16..], &[5u8; 32]);

        let spki = spki_der(&derive_public(&signing_key));
        assert_eq!(spki.len(), 44);
        assert!(verify_pair(&signing_key, &spki));
    }
}
