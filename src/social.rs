//! Social login profile normalization.
//!
//! The OAuth handshake happens elsewhere; this module only turns the
//! provider's user-info payload into a uniform [`SocialProfile`] from which
//! the local username is derived.

use serde_json::Value;

/// Provider-independent profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocialProfile {
    pub external_id: String,
    pub email: String,
    pub display_name: String,
}

#[derive(Debug, PartialEq, Eq)]
pub enum SocialError {
    UnsupportedProvider(String),
    /// Payload is missing required fields or has the wrong shape
    MalformedPayload(&'static str),
}

impl std::fmt::Display for SocialError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SocialError::UnsupportedProvider(id) => write!(f, "Unsupported social provider: {}", id),
            SocialError::MalformedPayload(what) => write!(f, "Malformed provider payload: {}", what),
        }
    }
}

impl std::error::Error for SocialError {}

/// Turns one provider's payload shape into a [`SocialProfile`].
pub trait ProfileNormalizer: Send + Sync {
    fn normalize(&self, payload: &Value) -> Result<SocialProfile, SocialError>;
}

/// Naver nests everything under `response`.
pub struct NaverNormalizer;

impl ProfileNormalizer for NaverNormalizer {
    fn normalize(&self, payload: &Value) -> Result<SocialProfile, SocialError> {
        let response = payload
            .get("response")
            .and_then(Value::as_object)
            .ok_or(SocialError::MalformedPayload("response object missing"))?;

        let external_id = response
            .get("id")
            .and_then(scalar_to_string)
            .ok_or(SocialError::MalformedPayload("id missing"))?;

        Ok(SocialProfile {
            external_id,
            email: response
                .get("email")
                .and_then(scalar_to_string)
                .unwrap_or_default(),
            display_name: response
                .get("name")
                .and_then(scalar_to_string)
                .unwrap_or_else(|| "Naver user".to_string()),
        })
    }
}

/// Kakao keeps the id at the top level and the rest under `kakao_account`.
pub struct KakaoNormalizer;

impl ProfileNormalizer for KakaoNormalizer {
    fn normalize(&self, payload: &Value) -> Result<SocialProfile, SocialError> {
        let external_id = payload
            .get("id")
            .and_then(scalar_to_string)
            .ok_or(SocialError::MalformedPayload("id missing"))?;

        let account = payload.get("kakao_account");

        Ok(SocialProfile {
            external_id,
            email: account
                .and_then(|a| a.get("email"))
                .and_then(scalar_to_string)
                .unwrap_or_default(),
            display_name: account
                .and_then(|a| a.get("profile"))
                .and_then(|p| p.get("nickname"))
                .and_then(scalar_to_string)
                .unwrap_or_else(|| "Kakao user".to_string()),
        })
    }
}

/// Supported providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocialProvider {
    Naver,
    Kakao,
}

impl SocialProvider {
    /// Resolve an OAuth client registration id (case-insensitive).
    pub fn from_registration_id(id: &str) -> Result<Self, SocialError> {
        match id.to_ascii_uppercase().as_str() {
            "NAVER" => Ok(SocialProvider::Naver),
            "KAKAO" => Ok(SocialProvider::Kakao),
            _ => Err(SocialError::UnsupportedProvider(id.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SocialProvider::Naver => "NAVER",
            SocialProvider::Kakao => "KAKAO",
        }
    }

    pub fn normalizer(&self) -> &'static dyn ProfileNormalizer {
        match self {
            SocialProvider::Naver => &NaverNormalizer,
            SocialProvider::Kakao => &KakaoNormalizer,
        }
    }

    pub fn normalize(&self, payload: &Value) -> Result<SocialProfile, SocialError> {
        self.normalizer().normalize(payload)
    }

    /// Local username for a profile from this provider.
    pub fn username_for(&self, profile: &SocialProfile) -> String {
        format!("{}_{}", self.as_str(), profile.external_id)
    }
}

/// Providers send ids as strings or numbers.
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_naver_payload() {
        let payload = json!({
            "resultcode": "00",
            "response": { "id": "abc123", "email": "n@example.com", "name": "Kim" }
        });

        let provider = SocialProvider::from_registration_id("naver").unwrap();
        let profile = provider.normalize(&payload).unwrap();

        assert_eq!(profile.external_id, "abc123");
        assert_eq!(profile.email, "n@example.com");
        assert_eq!(profile.display_name, "Kim");
        assert_eq!(provider.username_for(&profile), "NAVER_abc123");
    }

    #[test]
    fn test_naver_defaults_for_optional_fields() {
        let payload = json!({ "response": { "id": "x" } });
        let profile = NaverNormalizer.normalize(&payload).unwrap();
        assert_eq!(profile.email, "");
        assert_eq!(profile.display_name, "Naver user");
    }

    #[test]
    fn test_naver_without_response_object() {
        let payload = json!({ "id": "x" });
        assert_eq!(
            NaverNormalizer.normalize(&payload),
            Err(SocialError::MalformedPayload("response object missing"))
        );
    }

    #[test]
    fn test_kakao_numeric_id() {
        let payload = json!({
            "id": 987654321u64,
            "kakao_account": {
                "email": "k@example.com",
                "profile": { "nickname": "Lee" }
            }
        });

        let provider = SocialProvider::Kakao;
        let profile = provider.normalize(&payload).unwrap();
        assert_eq!(profile.external_id, "987654321");
        assert_eq!(profile.display_name, "Lee");
        assert_eq!(provider.username_for(&profile), "KAKAO_987654321");
    }

    #[test]
    fn test_kakao_missing_id() {
        let payload = json!({ "kakao_account": {} });
        assert!(KakaoNormalizer.normalize(&payload).is_err());
    }

    #[test]
    fn test_unsupported_provider() {
        assert_eq!(
            SocialProvider::from_registration_id("github"),
            Err(SocialError::UnsupportedProvider("github".to_string()))
        );
    }
}
