// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Authentication state machine.
//!
//! `Loading` until the identity check resolves, then `Authenticated` or
//! `Unauthenticated`. Every ledger and reminder operation takes a gate and
//! calls [`SessionGate::require`] before touching the store.

use log::info;

use crate::error::{Error, Result};
use crate::models::Session;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Loading,
    Authenticated(Session),
    Unauthenticated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn(Session),
    SignedOut,
    UserUpdated(Session),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionGate {
    state: SessionState,
}

impl Default for SessionGate {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionGate {
    pub fn new() -> Self {
        Self {
            state: SessionState::Loading,
        }
    }

    pub fn authenticated(session: Session) -> Self {
        Self {
            state: SessionState::Authenticated(session),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, SessionState::Loading)
    }

    /// Settle the initial identity check.
    pub fn resolve(&mut self, session: Option<Session>) {
        self.state = match session {
            Some(s) => SessionState::Authenticated(s),
            None => SessionState::Unauthenticated,
        };
    }

    pub fn apply(&mut self, event: AuthEvent) {
        match event {
            AuthEvent::SignedIn(s) | AuthEvent::UserUpdated(s) => {
                info!("session established for {}", s.user.email);
                self.state = SessionState::Authenticated(s);
            }
            AuthEvent::SignedOut => self.sign_out(),
        }
    }

    pub fn sign_out(&mut self) {
        if let SessionState::Authenticated(s) = &self.state {
            info!("session ended for {}", s.user.email);
        }
        self.state = SessionState::Unauthenticated;
    }

    pub fn session(&self) -> Option<&Session> {
        match &self.state {
            SessionState::Authenticated(s) => Some(s),
            _ => None,
        }
    }

    pub fn require(&self) -> Result<&Session> {
        match &self.state {
            SessionState::Authenticated(s) if !s.user_id().trim().is_empty() => Ok(s),
            _ => Err(Error::Unauthenticated),
        }
    }

    pub fn user_id(&self) -> Result<&str> {
        self.require().map(|s| s.user_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;

    fn session(id: &str) -> Session {
        Session {
            access_token: "tok".into(),
            user: User {
                id: id.into(),
                email: "a@b.c".into(),
                first_name: String::new(),
                last_name: String::new(),
            },
        }
    }

    #[test]
    fn starts_loading_and_gates() {
        let gate = SessionGate::new();
        assert!(gate.is_loading());
        assert!(matches!(gate.require(), Err(Error::Unauthenticated)));
    }

    #[test]
    fn resolve_then_sign_out() {
        let mut gate = SessionGate::new();
        gate.resolve(Some(session("u1")));
        assert_eq!(gate.user_id().unwrap(), "u1");
        gate.sign_out();
        assert_eq!(gate.state(), &SessionState::Unauthenticated);
        assert!(gate.require().is_err());
    }

    #[test]
    fn resolve_none_is_unauthenticated() {
        let mut gate = SessionGate::new();
        gate.resolve(None);
        assert_eq!(gate.state(), &SessionState::Unauthenticated);
    }

    #[test]
    fn empty_user_id_is_not_a_session() {
        let gate = SessionGate::authenticated(session(""));
        assert!(matches!(gate.require(), Err(Error::Unauthenticated)));
    }

    #[test]
    fn events_drive_transitions() {
        let mut gate = SessionGate::new();
        gate.apply(AuthEvent::SignedIn(session("u1")));
        assert!(gate.session().is_some());
        gate.apply(AuthEvent::SignedOut);
        assert!(gate.session().is_none());
    }
}
