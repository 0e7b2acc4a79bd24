use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{role::Role, user::UserInfo};

/// Renewable access token handed out by the identity provider.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessCredential {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessCredential {
    pub fn is_usable(&self) -> bool {
        !self.access_token.trim().is_empty()
    }

    /// Treats a token that expires within the next minute as already expired.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .is_some_and(|at| at - Duration::seconds(60) <= now)
    }
}

impl std::fmt::Debug for AccessCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessCredential")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub user: UserInfo,
    pub credential: AccessCredential,
    /// Computed once at login; not re-derived per request.
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
}

impl Session {
    pub fn identity(&self) -> &str {
        &self.user.email
    }

    pub fn is_expired(&self, now: DateTime<Utc>, max_age: Duration, idle_timeout: Duration) -> bool {
        now - self.created_at > max_age || now - self.last_used_at > idle_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_at(created: DateTime<Utc>, last_used: DateTime<Utc>) -> Session {
        Session {
            user: UserInfo {
                id: "1".into(),
                email: "a@example.com".into(),
                name: "A".into(),
                picture: String::new(),
            },
            credential: AccessCredential {
                access_token: "token".into(),
                refresh_token: None,
                expires_at: None,
            },
            role: Role::Employee,
            created_at: created,
            last_used_at: last_used,
        }
    }

    #[test]
    fn idle_and_absolute_limits_both_expire() {
        let now = Utc::now();
        let max_age = Duration::hours(24);
        let idle = Duration::hours(2);

        assert!(!session_at(now - Duration::hours(1), now).is_expired(now, max_age, idle));
        assert!(session_at(now - Duration::hours(3), now - Duration::hours(3))
            .is_expired(now, max_age, idle));
        assert!(session_at(now - Duration::hours(25), now).is_expired(now, max_age, idle));
    }

    #[test]
    fn credential_debug_hides_tokens() {
        let c = AccessCredential {
            access_token: "secret".into(),
            refresh_token: Some("also-secret".into()),
            expires_at: None,
        };
        let shown = format!("{c:?}");
        assert!(!shown.contains("secret\""));
        assert!(shown.contains("<redacted>"));
    }
}
