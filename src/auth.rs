use parking_lot::RwLock;

use crate::api::SenderRole;

/// The authenticated user as seen by this subsystem.
///
/// `role` is the participant side the user acts as and is never
/// [`SenderRole::System`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: String,
    pub role: SenderRole,
}

impl CurrentUser {
    pub fn new(id: impl Into<String>, role: SenderRole) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }
}

/// Shared handle to the current authentication state.
///
/// Session management is an external collaborator; this only answers
/// "is someone signed in, and as which role". Absence of a user means
/// every periodic fetch treats its tick as nothing-to-do.
#[derive(Default)]
pub struct AuthState {
    user: RwLock<Option<CurrentUser>>,
}

impl AuthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_user(&self, user: CurrentUser) {
        *self.user.write() = Some(user);
    }

    pub fn clear(&self) {
        *self.user.write() = None;
    }

    pub fn current(&self) -> Option<CurrentUser> {
        self.user.read().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.read().is_some()
    }
}
