//! Authenticated session model.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Cookie captured from an authenticated browser session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    #[serde(default = "default_cookie_path")]
    pub path: String,
    /// Expiry as seconds since the Unix epoch. `None` for session cookies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<f64>,
}

fn default_cookie_path() -> String {
    "/".to_string()
}

impl SessionCookie {
    /// Expiry as a timestamp, if the cookie has one.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let secs = self.expires?;
        if !secs.is_finite() || secs <= 0.0 {
            return None;
        }
        Utc.timestamp_opt(secs as i64, 0).single()
    }
}

/// The authenticated cookie set.
///
/// Created once by [`crate::services::SessionStore::ensure`] and shared
/// read-only with every download unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub cookies: Vec<SessionCookie>,
    pub captured_at: DateTime<Utc>,
}

impl Session {
    pub fn new(cookies: Vec<SessionCookie>) -> Self {
        Self {
            cookies,
            captured_at: Utc::now(),
        }
    }

    /// Earliest expiry among the cookies, if any cookie expires.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.cookies.iter().filter_map(|c| c.expires_at()).min()
    }

    /// True when any cookie has expired at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|at| at <= now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cookie(name: &str, expires: Option<f64>) -> SessionCookie {
        SessionCookie {
            name: name.to_string(),
            value: "v".to_string(),
            domain: ".example.test".to_string(),
            path: "/".to_string(),
            expires,
        }
    }

    #[test]
    fn session_cookies_never_expire() {
        let session = Session::new(vec![cookie("sid", None), cookie("pref", Some(-1.0))]);
        assert!(session.expires_at().is_none());
        assert!(!session.is_expired(Utc::now()));
    }

    #[test]
    fn earliest_expiry_wins() {
        let session = Session::new(vec![
            cookie("a", Some(2_000_000_000.0)),
            cookie("b", Some(1_000_000_000.0)),
        ]);
        let expected = Utc.timestamp_opt(1_000_000_000, 0).single();
        assert_eq!(session.expires_at(), expected);
        assert!(session.is_expired(Utc::now()));
    }

    #[test]
    fn missing_path_defaults_to_root() {
        let json = r#"{"name":"sid","value":"x","domain":"example.test"}"#;
        let parsed: SessionCookie = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.path, "/");
        assert!(parsed.expires.is_none());
    }
}
