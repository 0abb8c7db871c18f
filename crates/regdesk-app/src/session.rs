// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use tracing::{info, warn};

use crate::SessionUser;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Checking,
    Anonymous,
    Authenticated(SessionUser),
}

/// Tracks who is signed in. Only its own transitions mutate the phase.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionStore {
    phase: SessionPhase,
}

impl SessionStore {
    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    pub fn user(&self) -> Option<&SessionUser> {
        match &self.phase {
            SessionPhase::Authenticated(user) => Some(user),
            SessionPhase::Checking | SessionPhase::Anonymous => None,
        }
    }

    pub fn is_checking(&self) -> bool {
        self.phase == SessionPhase::Checking
    }

    pub fn is_anonymous(&self) -> bool {
        self.phase == SessionPhase::Anonymous
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.phase, SessionPhase::Authenticated(_))
    }

    pub fn begin_probe(&mut self) {
        self.phase = SessionPhase::Checking;
    }

    /// Applies the identity probe. Returns true when a session now exists.
    pub fn probe_settled(&mut self, outcome: Result<Option<SessionUser>, String>) -> bool {
        if !self.is_checking() {
            return self.is_authenticated();
        }
        self.phase = match outcome {
            Ok(Some(user)) => {
                info!(user_id = user.id, "session restored");
                SessionPhase::Authenticated(user)
            }
            Ok(None) => SessionPhase::Anonymous,
            Err(error) => {
                warn!(%error, "session probe failed; continuing signed out");
                SessionPhase::Anonymous
            }
        };
        self.is_authenticated()
    }

    /// Login callbacks only count while nobody is signed in.
    pub fn logged_in(&mut self, user: SessionUser) -> bool {
        if !self.is_anonymous() {
            return false;
        }
        info!(user_id = user.id, "signed in");
        self.phase = SessionPhase::Authenticated(user);
        true
    }

    pub fn logged_out(&mut self) {
        if self.is_authenticated() {
            info!("signed out");
            self.phase = SessionPhase::Anonymous;
        }
    }
}
