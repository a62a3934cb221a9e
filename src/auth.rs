// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Email/password authentication and the explicit session value every
//! user-scoped operation receives.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{OptionalExtension, params};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{AuthError, Error, Result};
use crate::models::UserProfile;
use crate::store::{DocumentStore, Record, SqliteStore};
use crate::utils::now_local;

pub const MIN_PASSWORD_LEN: usize = 6;

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub user_id: String,
    pub email: String,
}

pub type SessionListener = Box<dyn FnMut(Option<&Session>)>;

pub trait AuthProvider {
    fn sign_in(&mut self, email: &str, password: &str) -> Result<Session>;
    /// Create an account, write its profile and sign it in.
    fn sign_up(&mut self, name: &str, email: &str, password: &str) -> Result<Session>;
    fn sign_out(&mut self) -> Result<()>;
    fn current_session(&self) -> Option<&Session>;
    /// Called once with the current state, then on every sign-in and sign-out.
    fn on_session_change(&mut self, listener: SessionListener);
    fn reauthenticate(&self, session: &Session, current_password: &str) -> Result<()>;
    fn change_password(&mut self, session: &Session, new_password: &str) -> Result<()>;
}

/// Credentials in the local database, argon2id hashes, one persisted session.
pub struct LocalAuth<'a> {
    store: &'a SqliteStore,
    session: Option<Session>,
    listeners: Vec<SessionListener>,
}

impl<'a> LocalAuth<'a> {
    /// Restore whatever session was active when the database was last used.
    pub fn new(store: &'a SqliteStore) -> Result<Self> {
        let session = store
            .conn()
            .query_row(
                "SELECT s.user_id, s.email FROM sessions s
                 JOIN credentials c ON c.user_id = s.user_id
                 WHERE s.slot = 1",
                [],
                |r| {
                    Ok(Session {
                        user_id: r.get(0)?,
                        email: r.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(Self {
            store,
            session,
            listeners: Vec::new(),
        })
    }

    /// The active session or `NotSignedIn`.
    pub fn require_session(&self) -> Result<Session> {
        self.session.clone().ok_or(Error::NotSignedIn)
    }

    fn ensure_current(&self, session: &Session) -> Result<()> {
        match &self.session {
            Some(s) if s == session => Ok(()),
            _ => Err(AuthError::SessionExpired.into()),
        }
    }

    fn activate(&mut self, session: Option<Session>) -> Result<()> {
        let conn = self.store.conn();
        match &session {
            Some(s) => {
                conn.execute(
                    "INSERT INTO sessions(slot, user_id, email) VALUES (1, ?1, ?2)
                     ON CONFLICT(slot) DO UPDATE SET user_id=excluded.user_id,
                        email=excluded.email, signed_in_at=datetime('now')",
                    params![s.user_id, s.email],
                )?;
            }
            None => {
                conn.execute("DELETE FROM sessions", [])?;
            }
        }
        self.session = session;
        for listener in self.listeners.iter_mut() {
            listener(self.session.as_ref());
        }
        Ok(())
    }

    fn stored_hash(&self, user_id: &str) -> Result<Option<String>> {
        Ok(self
            .store
            .conn()
            .query_row(
                "SELECT password_hash FROM credentials WHERE user_id=?1",
                params![user_id],
                |r| r.get(0),
            )
            .optional()?)
    }
}

fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    if !EMAIL.is_match(&email) {
        return Err(AuthError::InvalidEmail.into());
    }
    Ok(email)
}

fn check_strength(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::WeakPassword(MIN_PASSWORD_LEN).into());
    }
    Ok(())
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::encode_b64(uuid::Uuid::new_v4().as_bytes())
        .map_err(|e| Error::PasswordHash(format!("Failed to create salt: {}", e)))?;
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| Error::PasswordHash(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, stored: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored)
        .map_err(|e| Error::PasswordHash(format!("Stored hash unreadable: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

impl AuthProvider for LocalAuth<'_> {
    fn sign_in(&mut self, email: &str, password: &str) -> Result<Session> {
        let email = normalize_email(email).map_err(|_| AuthError::InvalidCredentials)?;
        let row: Option<(String, String)> = self
            .store
            .conn()
            .query_row(
                "SELECT user_id, password_hash FROM credentials WHERE email=?1",
                params![email],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?;
        let Some((user_id, hash)) = row else {
            warn!(%email, "sign-in for unknown email");
            return Err(AuthError::InvalidCredentials.into());
        };
        if !verify_password(password, &hash)? {
            warn!(%email, "sign-in with wrong password");
            return Err(AuthError::InvalidCredentials.into());
        }
        let session = Session { user_id, email };
        self.activate(Some(session.clone()))?;
        info!(user = %session.user_id, "signed in");
        Ok(session)
    }

    fn sign_up(&mut self, name: &str, email: &str, password: &str) -> Result<Session> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Validation("Name must not be empty.".into()));
        }
        let email = normalize_email(email)?;
        check_strength(password)?;

        let taken: Option<i64> = self
            .store
            .conn()
            .query_row(
                "SELECT 1 FROM credentials WHERE email=?1",
                params![email],
                |r| r.get(0),
            )
            .optional()?;
        if taken.is_some() {
            return Err(AuthError::EmailInUse.into());
        }

        let user_id = uuid::Uuid::new_v4().simple().to_string();
        let hash = hash_password(password)?;
        // Credentials and profile land together or not at all.
        let tx = self.store.conn().unchecked_transaction()?;
        tx.execute(
            "INSERT INTO credentials(user_id, email, password_hash) VALUES (?1, ?2, ?3)",
            params![user_id, email, hash],
        )?;
        let profile = UserProfile {
            id: user_id.clone(),
            name: name.to_string(),
            email: email.clone(),
            created_at: now_local(),
        };
        self.store.set::<UserProfile>(&user_id, profile.fields())?;
        tx.commit()?;

        let session = Session { user_id, email };
        self.activate(Some(session.clone()))?;
        info!(user = %session.user_id, "account created");
        Ok(session)
    }

    fn sign_out(&mut self) -> Result<()> {
        if let Some(s) = &self.session {
            info!(user = %s.user_id, "signed out");
        }
        self.activate(None)
    }

    fn current_session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    fn on_session_change(&mut self, mut listener: SessionListener) {
        listener(self.session.as_ref());
        self.listeners.push(listener);
    }

    fn reauthenticate(&self, session: &Session, current_password: &str) -> Result<()> {
        self.ensure_current(session)?;
        let hash = self
            .stored_hash(&session.user_id)?
            .ok_or(AuthError::SessionExpired)?;
        if !verify_password(current_password, &hash)? {
            warn!(user = %session.user_id, "reauthentication failed");
            return Err(AuthError::WrongPassword.into());
        }
        Ok(())
    }

    fn change_password(&mut self, session: &Session, new_password: &str) -> Result<()> {
        self.ensure_current(session)?;
        check_strength(new_password)?;
        let hash = hash_password(new_password)?;
        let changed = self.store.conn().execute(
            "UPDATE credentials SET password_hash=?1, updated_at=datetime('now') WHERE user_id=?2",
            params![hash, session.user_id],
        )?;
        if changed == 0 {
            return Err(AuthError::SessionExpired.into());
        }
        info!(user = %session.user_id, "password changed");
        Ok(())
    }
}
