use std::sync::Arc;
use chrono::{DateTime, Duration, Utc};
use crate::domain::models::auth::AuthResponse;
use crate::domain::ports::Clock;

/// When to refresh: as soon as the access token is within `margin` of expiry.
#[derive(Debug, Clone, Copy)]
pub struct RefreshPolicy {
    pub margin: Duration,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self { margin: Duration::seconds(60) }
    }
}

impl RefreshPolicy {
    pub fn should_refresh(&self, expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        expires_at - now <= self.margin
    }
}

/// Client-side credentials for one signed-in user. The refresh token itself
/// lives in the HTTP client's cookie jar.
pub struct Session {
    access_token: String,
    csrf_token: String,
    token_ttl: Duration,
    expires_at: DateTime<Utc>,
    clock: Arc<dyn Clock>,
    policy: RefreshPolicy,
}

impl Session {
    pub fn new(auth: &AuthResponse, clock: Arc<dyn Clock>, policy: RefreshPolicy) -> Self {
        let token_ttl = Duration::seconds(auth.expires_in);
        let expires_at = clock.now() + token_ttl;
        Self {
            access_token: auth.access_token.clone(),
            csrf_token: auth.csrf_token.clone(),
            token_ttl,
            expires_at,
            clock,
            policy,
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn csrf_token(&self) -> &str {
        &self.csrf_token
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn needs_refresh(&self) -> bool {
        self.policy.should_refresh(self.expires_at, self.clock.now())
    }

    /// Takes over a token handed back in the rotation header. The server
    /// keeps the CSRF binding, so only the token and its expiry move.
    pub fn absorb_rotated(&mut self, access_token: &str) {
        if access_token.is_empty() || access_token == self.access_token {
            return;
        }
        self.access_token = access_token.to_string();
        self.expires_at = self.clock.now() + self.token_ttl;
    }

    /// Replaces every credential after an explicit refresh.
    pub fn replace(&mut self, auth: &AuthResponse) {
        self.access_token = auth.access_token.clone();
        self.csrf_token = auth.csrf_token.clone();
        self.token_ttl = Duration::seconds(auth.expires_in);
        self.expires_at = self.clock.now() + self.token_ttl;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{auth::UserProfile, user::Role};
    use std::sync::Mutex;

    struct ManualClock(Mutex<DateTime<Utc>>);

    impl ManualClock {
        fn advance(&self, by: Duration) {
            let mut now = self.0.lock().unwrap();
            *now += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    fn auth(token: &str, csrf: &str) -> AuthResponse {
        AuthResponse {
            access_token: token.to_string(),
            csrf_token: csrf.to_string(),
            expires_in: 900,
            user: UserProfile {
                id: "u1".to_string(),
                email: "p@example.com".to_string(),
                role: Role::Participant,
                display_name: "P".to_string(),
            },
        }
    }

    #[test]
    fn refresh_is_due_only_inside_the_margin() {
        let clock = Arc::new(ManualClock(Mutex::new(Utc::now())));
        let session = Session::new(&auth("a1", "c1"), clock.clone(), RefreshPolicy::default());
        assert!(!session.needs_refresh());

        clock.advance(Duration::seconds(839));
        assert!(!session.needs_refresh());

        clock.advance(Duration::seconds(1));
        assert!(session.needs_refresh());
    }

    #[test]
    fn rotated_token_extends_the_session_and_keeps_csrf() {
        let clock = Arc::new(ManualClock(Mutex::new(Utc::now())));
        let mut session = Session::new(&auth("a1", "c1"), clock.clone(), RefreshPolicy::default());

        clock.advance(Duration::minutes(14));
        assert!(session.needs_refresh());

        session.absorb_rotated("a2");
        assert_eq!(session.access_token(), "a2");
        assert_eq!(session.csrf_token(), "c1");
        assert!(!session.needs_refresh());
    }

    #[test]
    fn replaying_the_same_token_does_not_extend_expiry() {
        let clock = Arc::new(ManualClock(Mutex::new(Utc::now())));
        let mut session = Session::new(&auth("a1", "c1"), clock.clone(), RefreshPolicy::default());
        let original_expiry = session.expires_at();

        clock.advance(Duration::minutes(5));
        session.absorb_rotated("a1");
        assert_eq!(session.expires_at(), original_expiry);
    }

    #[test]
    fn explicit_refresh_replaces_csrf() {
        let clock = Arc::new(ManualClock(Mutex::new(Utc::now())));
        let mut session = Session::new(&auth("a1", "c1"), clock, RefreshPolicy::default());
        session.replace(&auth("a9", "c9"));
        assert_eq!(session.access_token(), "a9");
        assert_eq!(session.csrf_token(), "c9");
    }
}
