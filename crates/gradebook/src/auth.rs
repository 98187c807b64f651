//! The access guard: one credential pair, server-side sessions and flash notices.
//!
//! Each client holds only an opaque session id. Everything else (whether the
//! client logged in, which notices are waiting to be shown) lives in the
//! [`SessionStore`], keyed by that id, so sessions from different clients
//! never observe each other.
//!
//! Entries are created lazily: an id handed to an anonymous client occupies
//! no memory until a login or a notice is stored under it, and an anonymous
//! entry is dropped again once its notices have been read.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

/// The username/password pair accepted at login.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Create a credential pair.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Exact, case-sensitive match on both halves.
    #[must_use]
    pub fn matches(&self, username: &str, password: &str) -> bool {
        self.username == username && self.password == password
    }

    /// The accepted username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Severity of a flash notice, used for styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    /// Neutral information.
    Info,
    /// An operation completed.
    Success,
    /// An operation was rejected.
    Error,
}

impl fmt::Display for NoticeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A one-time message attached to the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    /// Severity.
    pub level: NoticeLevel,
    /// Text shown to the user.
    pub message: String,
}

impl Notice {
    /// An informational notice.
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    /// A success notice.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    /// An error notice.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Per-client state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    /// The logged-in user, if any. This is the session marker.
    pub user: Option<String>,
    /// Notices waiting to be shown, oldest first.
    pub notices: Vec<Notice>,
}

/// In-process map from session id to [`Session`].
///
/// Cloning is cheap and every clone shares the same map.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    inner: Arc<Mutex<HashMap<String, Session>>>,
}

impl SessionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<String, Session>> {
        // A panic while holding the lock cannot leave a half-written Session
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A fresh, unguessable session id. Nothing is stored for it yet.
    #[must_use]
    pub fn new_id() -> String {
        Uuid::new_v4().simple().to_string()
    }

    /// Return `id` if it names a live session, otherwise a fresh id.
    ///
    /// The flag is `true` when the id is fresh. Resolving never stores
    /// anything, so anonymous requests do not grow the store.
    #[must_use]
    pub fn resolve(&self, id: Option<&str>) -> (String, bool) {
        match id {
            Some(id) if self.contains(id) => (id.to_string(), false),
            _ => (Self::new_id(), true),
        }
    }

    /// Whether `id` names a live session.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.sessions().contains_key(id)
    }

    /// The logged-in user of a session.
    #[must_use]
    pub fn user(&self, id: &str) -> Option<String> {
        self.sessions().get(id).and_then(|s| s.user.clone())
    }

    /// Set the session marker, storing the session if it is not live yet.
    pub fn set_user(&self, id: &str, user: &str) {
        self.sessions().entry(id.to_string()).or_default().user = Some(user.to_string());
    }

    /// Queue a notice for the next page, storing the session if it is not
    /// live yet.
    pub fn push_notice(&self, id: &str, notice: Notice) {
        self.sessions()
            .entry(id.to_string())
            .or_default()
            .notices
            .push(notice);
    }

    /// Drain the queued notices; each is returned exactly once.
    ///
    /// A session without a logged-in user has nothing left once drained and
    /// is discarded.
    #[must_use]
    pub fn take_notices(&self, id: &str) -> Vec<Notice> {
        let mut sessions = self.sessions();
        let Some(session) = sessions.get_mut(id) else {
            return Vec::new();
        };
        let notices = std::mem::take(&mut session.notices);
        if session.user.is_none() {
            sessions.remove(id);
        }
        notices
    }

    /// Discard a session. Returns whether it existed.
    pub fn remove(&self, id: &str) -> bool {
        self.sessions().remove(id).is_some()
    }

    /// Number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions().len()
    }

    /// Whether there are no live sessions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions().is_empty()
    }
}

/// Decides whether a session may use the protected operations.
#[derive(Debug, Clone)]
pub struct AccessGuard {
    credentials: Credentials,
    sessions: SessionStore,
}

impl AccessGuard {
    /// Create a guard accepting `credentials`, with a fresh session store.
    #[must_use]
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            sessions: SessionStore::new(),
        }
    }

    /// The underlying session store.
    #[must_use]
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// True iff a prior login in this session succeeded.
    #[must_use]
    pub fn is_authenticated(&self, session_id: &str) -> bool {
        self.sessions.user(session_id).is_some()
    }

    /// Check the submitted pair and, on a match, mark the session as logged in.
    pub fn login(&self, session_id: &str, username: &str, password: &str) -> bool {
        if self.credentials.matches(username, password) {
            self.sessions.set_user(session_id, username);
            info!("User '{}' logged in", username);
            true
        } else {
            warn!("Rejected login attempt for user '{}'", username);
            false
        }
    }

    /// Discard the session and start a replacement carrying a logout notice.
    ///
    /// Returns the new session id. The old id is no longer valid.
    #[must_use]
    pub fn logout(&self, session_id: &str) -> String {
        if self.sessions.remove(session_id) {
            info!("Session logged out");
        }
        let fresh = SessionStore::new_id();
        self.sessions
            .push_notice(&fresh, Notice::info("You have been logged out."));
        fresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard() -> AccessGuard {
        AccessGuard::new(Credentials::new("professor", "1234"))
    }

    #[test]
    fn test_credentials_exact_match() {
        let creds = Credentials::new("professor", "1234");
        assert!(creds.matches("professor", "1234"));
        assert!(!creds.matches("professor", "wrong"));
        assert!(!creds.matches("Professor", "1234"));
        assert!(!creds.matches("professor ", "1234"));
        assert!(!creds.matches("", ""));
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = Credentials::new("professor", "hunter2");
        let debug_str = format!("{creds:?}");
        assert!(debug_str.contains("professor"));
        assert!(!debug_str.contains("hunter2"));
    }

    #[test]
    fn test_new_session_is_not_authenticated() {
        let guard = guard();
        let id = SessionStore::new_id();
        assert!(!guard.is_authenticated(&id));
    }

    #[test]
    fn test_login_success_sets_marker() {
        let guard = guard();
        let id = SessionStore::new_id();

        assert!(guard.login(&id, "professor", "1234"));
        assert!(guard.is_authenticated(&id));
        assert_eq!(guard.sessions().user(&id).as_deref(), Some("professor"));
    }

    #[test]
    fn test_login_failure_leaves_session_unauthenticated() {
        let guard = guard();
        let id = SessionStore::new_id();

        assert!(!guard.login(&id, "professor", "wrong"));
        assert!(!guard.is_authenticated(&id));
        assert!(guard.sessions().is_empty());
    }

    #[test]
    fn test_sessions_are_isolated() {
        let guard = guard();
        let a = SessionStore::new_id();
        let b = SessionStore::new_id();

        assert!(guard.login(&a, "professor", "1234"));
        assert!(guard.is_authenticated(&a));
        assert!(!guard.is_authenticated(&b));
    }

    #[test]
    fn test_logout_invalidates_old_session() {
        let guard = guard();
        let id = SessionStore::new_id();
        assert!(guard.login(&id, "professor", "1234"));

        let fresh = guard.logout(&id);

        assert_ne!(fresh, id);
        assert!(!guard.sessions().contains(&id));
        assert!(!guard.is_authenticated(&id));
        assert!(!guard.is_authenticated(&fresh));
        assert_eq!(
            guard.sessions().take_notices(&fresh),
            vec![Notice::info("You have been logged out.")]
        );
    }

    #[test]
    fn test_logout_of_unknown_session() {
        let guard = guard();
        let fresh = guard.logout("nope");
        assert!(guard.sessions().contains(&fresh));
        assert_eq!(guard.sessions().len(), 1);

        // Reading the logout notice leaves nothing behind
        assert_eq!(guard.sessions().take_notices(&fresh).len(), 1);
        assert!(guard.sessions().is_empty());
    }

    #[test]
    fn test_notices_are_read_once() {
        let store = SessionStore::new();
        let id = SessionStore::new_id();
        store.set_user(&id, "professor");
        store.push_notice(&id, Notice::success("saved"));
        store.push_notice(&id, Notice::error("oops"));

        let first = store.take_notices(&id);
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].level, NoticeLevel::Success);
        assert!(store.take_notices(&id).is_empty());
        assert!(store.contains(&id));
    }

    #[test]
    fn test_resolve_reuses_known_and_replaces_unknown() {
        let store = SessionStore::new();
        let id = SessionStore::new_id();
        store.set_user(&id, "professor");

        assert_eq!(store.resolve(Some(&id)), (id.clone(), false));

        let (other, fresh) = store.resolve(Some("forged"));
        assert!(fresh);
        assert_ne!(other, "forged");

        let (_, fresh) = store.resolve(None);
        assert!(fresh);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_anonymous_requests_do_not_grow_store() {
        let store = SessionStore::new();

        for _ in 0..10_000 {
            let (id, fresh) = store.resolve(None);
            assert!(fresh);
            assert!(store.take_notices(&id).is_empty());
        }

        assert!(store.is_empty());
    }

    #[test]
    fn test_anonymous_session_lives_until_notices_are_read() {
        let store = SessionStore::new();
        let (id, _) = store.resolve(None);

        store.push_notice(&id, Notice::info("Please log in"));
        assert!(store.contains(&id));
        assert_eq!(store.resolve(Some(&id)), (id.clone(), false));

        assert_eq!(store.take_notices(&id).len(), 1);
        assert!(!store.contains(&id));
        assert!(store.is_empty());
    }

    #[test]
    fn test_unknown_session_reads_are_noops() {
        let store = SessionStore::new();
        assert!(store.user("ghost").is_none());
        assert!(store.take_notices("ghost").is_empty());
        assert!(!store.remove("ghost"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_writes_store_session_on_demand() {
        let store = SessionStore::new();
        let id = SessionStore::new_id();
        assert!(!store.contains(&id));

        store.set_user(&id, "professor");
        assert_eq!(store.user(&id).as_deref(), Some("professor"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_notice_level_display() {
        assert_eq!(NoticeLevel::Info.to_string(), "info");
        assert_eq!(NoticeLevel::Success.to_string(), "success");
        assert_eq!(NoticeLevel::Error.to_string(), "error");
    }
}
