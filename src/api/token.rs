//! Bearer token issued by the client-credentials exchange.

use crate::error::AuthError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Short-lived credential attached to every query.
///
/// Serializes to the same shape the token endpoint returns, so a saved token
/// can be handed to a later client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BearerToken {
    #[serde(rename = "access_token")]
    pub token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(rename = ".issued", with = "http_date")]
    pub issued_at: DateTime<Utc>,
    #[serde(rename = ".expires", with = "http_date")]
    pub expires_at: DateTime<Utc>,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl BearerToken {
    /// Parses the token endpoint's JSON answer.
    pub fn from_response(body: &Value) -> Result<Self, AuthError> {
        if body.get("access_token").and_then(Value::as_str).is_none() {
            let reason = body
                .get("error_description")
                .or_else(|| body.get("error"))
                .and_then(Value::as_str)
                .unwrap_or("no access_token in response");
            return Err(AuthError::Rejected(reason.to_string()));
        }

        serde_json::from_value(body.clone()).map_err(|e| AuthError::InvalidToken(e.to_string()))
    }

    /// Returns true once the expiry time has been reached.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Token validity as seen by a client at the moment of the check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Unauthenticated,
    Valid,
    Expired,
}

impl TokenState {
    pub fn of(token: Option<&BearerToken>) -> Self {
        match token {
            None => TokenState::Unauthenticated,
            Some(t) if t.is_expired() => TokenState::Expired,
            Some(_) => TokenState::Valid,
        }
    }
}

/// Dates on the token endpoint use the HTTP date format (RFC 2822); RFC 3339
/// is accepted too.
mod http_date {
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format("%a, %d %b %Y %H:%M:%S GMT").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let text = String::deserialize(deserializer)?;
        parse(&text).ok_or_else(|| de::Error::custom(format!("unrecognized date: {}", text)))
    }

    pub fn parse(text: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc2822(text)
            .or_else(|_| DateTime::parse_from_rfc3339(text))
            .ok()
            .map(|date| date.with_timezone(&Utc))
    }
}
