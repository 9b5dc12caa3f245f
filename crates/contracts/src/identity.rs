//! Identity validation capabilities used by the set-user-id / set-email events

/// Outcome of an identity check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityOutcome {
    /// Accept and commit the new value
    Valid,
    /// A value is already set; keep the current one
    AlreadySet,
    /// Value is not acceptable
    Invalid,
}

/// User id validator with commit access to identity state
///
/// Whatever `commit_user_id` stored is what `user_id` reads back; wire
/// events carry it as their customer id.
pub trait IdentityValidator: Send + Sync {
    fn validate_user_id(&self, user_id: &str) -> IdentityOutcome;

    fn commit_user_id(&self, user_id: &str);

    /// Currently committed user id
    fn user_id(&self) -> Option<String>;
}

/// Email validator with commit access to identity state
pub trait EmailValidator: Send + Sync {
    fn validate_email(&self, email: &str) -> IdentityOutcome;

    fn commit_email(&self, email: &str);
}
