use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::repo_types::Role;

/// Type of JWT: access or refresh. Serialized under the `type` claim.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT payload used for authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>, // user ID, decimal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>, // access tokens only
    #[serde(rename = "type")]
    pub kind: TokenKind,
    pub iat: usize,
    pub exp: usize,
    pub iss: String,
    pub aud: String,
    pub jti: Uuid,
}

impl Claims {
    /// Numeric user id carried in `sub`, if present and well formed.
    pub fn user_id(&self) -> Option<i64> {
        self.sub.as_deref()?.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(sub: Option<&str>) -> Claims {
        Claims {
            sub: sub.map(str::to_string),
            role: Some(Role::Candidate),
            kind: TokenKind::Access,
            iat: 0,
            exp: 0,
            iss: "iss".into(),
            aud: "aud".into(),
            jti: Uuid::new_v4(),
        }
    }

    #[test]
    fn kind_is_serialized_as_type() {
        let json = serde_json::to_value(claims(Some("12"))).unwrap();
        assert_eq!(json["type"], "access");
        assert_eq!(json["sub"], "12");
        assert_eq!(json["role"], "candidate");
    }

    #[test]
    fn user_id_parses_decimal_subject() {
        assert_eq!(claims(Some("12")).user_id(), Some(12));
        assert_eq!(claims(Some("abc")).user_id(), None);
        assert_eq!(claims(None).user_id(), None);
    }
}
