// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Error types for Pocketledger

use thiserror::Error;

/// Failures reported by the auth provider. Session state is never changed
/// when one of these is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("email address is already registered")]
    EmailInUse,

    #[error("email address is malformed")]
    InvalidEmail,

    #[error("password must be at least {0} characters")]
    WeakPassword(usize),

    #[error("current password is incorrect")]
    WrongPassword,

    #[error("session is no longer active")]
    SessionExpired,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("Not signed in")]
    NotSignedIn,
}

impl Error {
    /// Message shown inline on the screen that triggered the failure.
    pub fn user_message(&self) -> String {
        match self {
            Error::Validation(msg) => msg.clone(),
            Error::Auth(AuthError::InvalidCredentials) => "Wrong email or password.".into(),
            Error::Auth(e) => {
                let mut msg = e.to_string();
                if let Some(first) = msg.get_mut(0..1) {
                    first.make_ascii_uppercase();
                }
                format!("{}.", msg)
            }
            Error::NotFound(what) => format!("{} not found.", what),
            Error::NotSignedIn => "Please sign in first.".into(),
            Error::Store(_) | Error::InvalidData(_) | Error::PasswordHash(_) => {
                tracing::error!(error = %self, "store failure");
                "Something went wrong. Please try again.".into()
            }
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
