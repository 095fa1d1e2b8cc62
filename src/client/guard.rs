//! Route guard over the session state.

use super::session::SessionState;
use super::user::UserRole;

/// What a protected view requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    Authenticated,
    /// Authenticated with exactly this role
    Role(UserRole),
}

/// Outcome of evaluating a guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Initial load still running; render nothing yet.
    Pending,
    Redirect(String),
    Render,
}

#[derive(Debug, Clone)]
pub struct Guard {
    requirement: Requirement,
    sign_in_path: String,
    unauthorized_path: String,
}

impl Guard {
    pub fn new(requirement: Requirement, sign_in_path: impl Into<String>) -> Self {
        let sign_in_path = sign_in_path.into();
        Self {
            requirement,
            unauthorized_path: sign_in_path.clone(),
            sign_in_path,
        }
    }

    pub fn authenticated(sign_in_path: impl Into<String>) -> Self {
        Self::new(Requirement::Authenticated, sign_in_path)
    }

    pub fn role(role: UserRole, sign_in_path: impl Into<String>) -> Self {
        Self::new(Requirement::Role(role), sign_in_path)
    }

    /// Where signed-in users without the required role are sent.
    pub fn with_unauthorized_path(mut self, path: impl Into<String>) -> Self {
        self.unauthorized_path = path.into();
        self
    }

    pub fn evaluate(&self, state: &SessionState) -> GuardDecision {
        if state.loading {
            return GuardDecision::Pending;
        }
        let user = match (&state.user, state.is_authenticated) {
            (Some(user), true) => user,
            _ => return GuardDecision::Redirect(self.sign_in_path.clone()),
        };
        match &self.requirement {
            Requirement::Authenticated => GuardDecision::Render,
            Requirement::Role(role) if user.role == *role => GuardDecision::Render,
            Requirement::Role(_) => GuardDecision::Redirect(self.unauthorized_path.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::User;

    fn signed_in(role: UserRole) -> SessionState {
        SessionState::signed_in(
            User {
                id: "u1".into(),
                email: None,
                name: None,
                role,
            },
            Some("tok".into()),
        )
    }

    #[test]
    fn test_pending_while_loading() {
        let guard = Guard::authenticated("/sign-in");
        assert_eq!(guard.evaluate(&SessionState::loading()), GuardDecision::Pending);
    }

    #[test]
    fn test_redirects_signed_out() {
        let guard = Guard::role(UserRole::Creator, "/sign-in");
        assert_eq!(
            guard.evaluate(&SessionState::signed_out()),
            GuardDecision::Redirect("/sign-in".into())
        );
    }

    #[test]
    fn test_renders_authenticated() {
        let guard = Guard::authenticated("/sign-in");
        assert_eq!(guard.evaluate(&signed_in(UserRole::Member)), GuardDecision::Render);
    }

    #[test]
    fn test_role_mismatch_goes_to_unauthorized() {
        let guard = Guard::role(UserRole::Creator, "/sign-in").with_unauthorized_path("/dashboard");
        assert_eq!(
            guard.evaluate(&signed_in(UserRole::Member)),
            GuardDecision::Redirect("/dashboard".into())
        );
        assert_eq!(guard.evaluate(&signed_in(UserRole::Creator)), GuardDecision::Render);
    }
}
