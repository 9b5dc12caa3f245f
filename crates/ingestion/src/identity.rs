//! IdentityStore - session identity state behind the set-user-id and
//! set-email events

use std::sync::{PoisonError, RwLock};

use contracts::{EmailValidator, IdentityOutcome, IdentityValidator};
use tracing::info;
use uuid::Uuid;

/// Placeholders that never count as a real user id
const RESERVED_USER_IDS: &[&str] = &["none", "undefined", "undefine", "null", "0", "-1"];

#[derive(Debug, Default)]
struct IdentityState {
    user_id: Option<String>,
    email: Option<String>,
}

/// In-process identity state
///
/// Default implementation of both identity validators; also owns the
/// visitor id stamped on events before a user id is known.
#[derive(Debug)]
pub struct IdentityStore {
    visitor_id: String,
    state: RwLock<IdentityState>,
}

impl Default for IdentityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityStore {
    /// New session with a generated visitor id
    pub fn new() -> Self {
        let mut visitor_id = Uuid::new_v4().simple().to_string();
        visitor_id.truncate(16);
        Self::with_visitor_id(visitor_id)
    }

    pub fn with_visitor_id(visitor_id: impl Into<String>) -> Self {
        Self {
            visitor_id: visitor_id.into(),
            state: RwLock::new(IdentityState::default()),
        }
    }

    pub fn visitor_id(&self) -> &str {
        &self.visitor_id
    }

    pub fn user_id(&self) -> Option<String> {
        self.read(|s| s.user_id.clone())
    }

    pub fn email(&self) -> Option<String> {
        self.read(|s| s.email.clone())
    }

    fn read<T>(&self, f: impl FnOnce(&IdentityState) -> T) -> T {
        f(&self.state.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn write<T>(&self, f: impl FnOnce(&mut IdentityState) -> T) -> T {
        f(&mut self.state.write().unwrap_or_else(PoisonError::into_inner))
    }
}

impl IdentityValidator for IdentityStore {
    fn validate_user_id(&self, user_id: &str) -> IdentityOutcome {
        let candidate = user_id.trim();
        if candidate.is_empty()
            || RESERVED_USER_IDS
                .iter()
                .any(|reserved| candidate.eq_ignore_ascii_case(reserved))
        {
            return IdentityOutcome::Invalid;
        }
        if self.read(|s| s.user_id.is_some()) {
            return IdentityOutcome::AlreadySet;
        }
        IdentityOutcome::Valid
    }

    fn commit_user_id(&self, user_id: &str) {
        let committed = self.write(|s| {
            if s.user_id.is_some() {
                return false;
            }
            s.user_id = Some(user_id.trim().to_string());
            true
        });
        if committed {
            info!(visitor = %self.visitor_id, "User id set");
        }
    }

    fn user_id(&self) -> Option<String> {
        IdentityStore::user_id(self)
    }
}

impl EmailValidator for IdentityStore {
    fn validate_email(&self, email: &str) -> IdentityOutcome {
        let candidate = email.trim();
        if !is_email_shaped(candidate) {
            return IdentityOutcome::Invalid;
        }
        if self.read(|s| s.email.as_deref() == Some(candidate)) {
            return IdentityOutcome::AlreadySet;
        }
        IdentityOutcome::Valid
    }

    fn commit_email(&self, email: &str) {
        self.write(|s| s.email = Some(email.trim().to_string()));
        info!(visitor = %self.visitor_id, "Email set");
    }
}

/// `local@domain.tld` with an alphabetic top-level label
fn is_email_shaped(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') || email.chars().any(char::is_whitespace) {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    let Some(tld) = labels.last() else {
        return false;
    };
    labels.len() >= 2
        && labels.iter().all(|label| !label.is_empty())
        && tld.len() >= 2
        && tld.chars().all(|c| c.is_ascii_alphabetic())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visitor_id_shape() {
        let store = IdentityStore::new();
        assert_eq!(store.visitor_id().len(), 16);
        assert!(store.visitor_id().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(store.visitor_id(), IdentityStore::new().visitor_id());
    }

    #[test]
    fn test_user_id_set_once() {
        let store = IdentityStore::with_visitor_id("v");
        assert_eq!(store.validate_user_id("abc"), IdentityOutcome::Valid);
        store.commit_user_id("abc");
        assert_eq!(store.user_id().as_deref(), Some("abc"));

        assert_eq!(store.validate_user_id("xyz"), IdentityOutcome::AlreadySet);
        store.commit_user_id("xyz");
        assert_eq!(store.user_id().as_deref(), Some("abc"));
    }

    #[test]
    fn test_reserved_user_ids_invalid() {
        let store = IdentityStore::new();
        for id in ["", "  ", "none", "NULL", "Undefined", "undefine", "0", "-1"] {
            assert_eq!(store.validate_user_id(id), IdentityOutcome::Invalid, "{id:?}");
        }
        assert_eq!(store.user_id(), None);
    }

    #[test]
    fn test_email_outcomes() {
        let store = IdentityStore::new();
        assert_eq!(store.validate_email("a@b.co"), IdentityOutcome::Valid);
        store.commit_email("a@b.co");
        assert_eq!(store.validate_email("a@b.co"), IdentityOutcome::AlreadySet);
        assert_eq!(store.validate_email("other@b.co"), IdentityOutcome::Valid);

        for bad in ["plain", "@b.co", "a@b", "a@.co", "a@b.c", "a b@c.io", "a@b@c.io", "a@b.c0m"] {
            assert_eq!(store.validate_email(bad), IdentityOutcome::Invalid, "{bad}");
        }
    }
}
