// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Sign-up, sign-in and session persistence.
//!
//! [`LocalAuth`] keeps users in the same SQLite database as the ledger and
//! remembers the current session token in `settings`, so a later process
//! can pick it up through [`AuthProvider::get_session`].

use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::Argon2;
use log::{info, warn};
use rusqlite::{params, Connection, OptionalExtension};
use std::cell::{Cell, RefCell};
use uuid::Uuid;

use crate::db;
use crate::error::{Error, Result};
use crate::models::{Profile, Session, User};
use crate::session::{AuthEvent, SessionGate};

const SESSION_KEY: &str = "current_session";
const MIN_PASSWORD_LEN: usize = 6;

pub type AuthListener = Box<dyn Fn(&AuthEvent)>;

pub trait AuthProvider {
    fn sign_in(&self, email: &str, password: &str) -> Result<Session>;

    fn sign_up(&self, email: &str, password: &str, confirm: &str, profile: &Profile)
        -> Result<Session>;

    fn sign_out(&self) -> Result<()>;

    fn get_session(&self) -> Result<Option<Session>>;

    fn on_auth_state_change(&self, listener: AuthListener) -> u64;

    fn remove_listener(&self, id: u64);
}

/// Settle a fresh gate from whatever session the provider remembers.
pub fn restore<A: AuthProvider + ?Sized>(auth: &A) -> Result<SessionGate> {
    let mut gate = SessionGate::new();
    gate.resolve(auth.get_session()?);
    Ok(gate)
}

fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(Error::invalid(format!("'{}' is not a valid email address", email))),
    }
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| Error::persistence(format!("password hashing failed: {}", e)))
}

fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!("stored password hash is unreadable: {}", e);
            false
        }
    }
}

pub struct LocalAuth<'a> {
    conn: &'a Connection,
    listeners: RefCell<Vec<(u64, AuthListener)>>,
    next_id: Cell<u64>,
}

impl<'a> LocalAuth<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self {
            conn,
            listeners: RefCell::new(Vec::new()),
            next_id: Cell::new(1),
        }
    }

    fn emit(&self, event: AuthEvent) {
        for (_, listener) in self.listeners.borrow().iter() {
            listener(&event);
        }
    }

    fn user_by_id(&self, id: &str) -> Result<Option<User>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, email, first_name, last_name FROM users WHERE id=?1",
                params![id],
                |r| {
                    Ok(User {
                        id: r.get(0)?,
                        email: r.get(1)?,
                        first_name: r.get(2)?,
                        last_name: r.get(3)?,
                    })
                },
            )
            .optional()?)
    }

    fn start_session(&self, user: User) -> Result<Session> {
        let token = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO auth_sessions(access_token, user_id) VALUES (?1, ?2)",
            params![token, user.id],
        )?;
        db::set_setting(self.conn, SESSION_KEY, &token)?;
        let session = Session {
            access_token: token,
            user,
        };
        info!("signed in {}", session.user.email);
        self.emit(AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }
}

impl AuthProvider for LocalAuth<'_> {
    fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let email = normalize_email(email)?;
        let found: Option<(String, String)> = self
            .conn
            .query_row(
                "SELECT id, password_hash FROM users WHERE email=?1",
                params![email],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?;
        let Some((id, hash)) = found else {
            return Err(Error::Unauthenticated);
        };
        if !verify_password(password, &hash) {
            warn!("failed sign-in for {}", email);
            return Err(Error::Unauthenticated);
        }
        let user = self
            .user_by_id(&id)?
            .ok_or_else(|| Error::not_found(format!("user {}", id)))?;
        self.start_session(user)
    }

    /// Creates the user and provisions their zero balance row in one
    /// transaction, then signs them in.
    fn sign_up(
        &self,
        email: &str,
        password: &str,
        confirm: &str,
        profile: &Profile,
    ) -> Result<Session> {
        let email = normalize_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(Error::invalid(format!(
                "Password should be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        if password != confirm {
            return Err(Error::invalid("Passwords do not match."));
        }
        let exists: Option<i64> = self
            .conn
            .query_row("SELECT 1 FROM users WHERE email=?1", params![email], |r| {
                r.get(0)
            })
            .optional()?;
        if exists.is_some() {
            return Err(Error::invalid("User already registered"));
        }

        let user = User {
            id: Uuid::new_v4().to_string(),
            email,
            first_name: profile.first_name.trim().to_string(),
            last_name: profile.last_name.trim().to_string(),
        };
        let hash = hash_password(password)?;
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO users(id, email, password_hash, first_name, last_name)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![user.id, user.email, hash, user.first_name, user.last_name],
        )?;
        tx.execute(
            "INSERT INTO BalanceTbl(user_id, amount, version) VALUES (?1, '0', 0)",
            params![user.id],
        )?;
        tx.commit()?;
        info!("registered {}", user.email);
        self.start_session(user)
    }

    fn sign_out(&self) -> Result<()> {
        if let Some(token) = db::get_setting(self.conn, SESSION_KEY)? {
            self.conn.execute(
                "DELETE FROM auth_sessions WHERE access_token=?1",
                params![token],
            )?;
        }
        db::clear_setting(self.conn, SESSION_KEY)?;
        self.emit(AuthEvent::SignedOut);
        Ok(())
    }

    fn get_session(&self) -> Result<Option<Session>> {
        let Some(token) = db::get_setting(self.conn, SESSION_KEY)? else {
            return Ok(None);
        };
        let user_id: Option<String> = self
            .conn
            .query_row(
                "SELECT user_id FROM auth_sessions WHERE access_token=?1",
                params![token],
                |r| r.get(0),
            )
            .optional()?;
        let user = match user_id {
            Some(id) => self.user_by_id(&id)?,
            None => None,
        };
        match user {
            Some(user) => Ok(Some(Session {
                access_token: token,
                user,
            })),
            None => {
                warn!("discarding stale session token");
                db::clear_setting(self.conn, SESSION_KEY)?;
                Ok(None)
            }
        }
    }

    fn on_auth_state_change(&self, listener: AuthListener) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.listeners.borrow_mut().push((id, listener));
        id
    }

    fn remove_listener(&self, id: u64) {
        self.listeners.borrow_mut().retain(|(lid, _)| *lid != id);
    }
}
