// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::cell::RefCell;
use std::rc::Rc;

use pocketledger::auth::{AuthProvider, LocalAuth, Session};
use pocketledger::db;
use pocketledger::error::{AuthError, Error};
use pocketledger::ledger::{change_password, display_name, update_display_name};
use pocketledger::store::SqliteStore;

fn store() -> SqliteStore {
    SqliteStore::new(db::open_in_memory().unwrap())
}

#[test]
fn sign_up_writes_profile_and_signs_in() {
    let store = store();
    let mut auth = LocalAuth::new(&store).unwrap();
    assert!(auth.current_session().is_none());

    let session = auth.sign_up("Rina", " Rina@Example.com ", "secret1").unwrap();
    assert_eq!(session.email, "rina@example.com");
    assert_eq!(auth.current_session(), Some(&session));
    assert_eq!(display_name(&store, &session).unwrap(), "Rina");
}

#[test]
fn sign_in_checks_credentials_without_saying_which_failed() {
    let store = store();
    let mut auth = LocalAuth::new(&store).unwrap();
    let created = auth.sign_up("Rina", "rina@example.com", "secret1").unwrap();
    auth.sign_out().unwrap();
    assert!(auth.current_session().is_none());

    let wrong_pw = auth.sign_in("rina@example.com", "nope-nope").unwrap_err();
    let unknown = auth.sign_in("ghost@example.com", "secret1").unwrap_err();
    assert!(matches!(wrong_pw, Error::Auth(AuthError::InvalidCredentials)));
    assert!(matches!(unknown, Error::Auth(AuthError::InvalidCredentials)));
    assert_eq!(wrong_pw.user_message(), unknown.user_message());
    assert!(auth.current_session().is_none());

    let session = auth.sign_in("RINA@example.com", "secret1").unwrap();
    assert_eq!(session, created);
}

#[test]
fn sign_up_rules() {
    let store = store();
    let mut auth = LocalAuth::new(&store).unwrap();
    assert!(matches!(
        auth.sign_up("A", "a@example.com", "12345"),
        Err(Error::Auth(AuthError::WeakPassword(6)))
    ));
    assert!(matches!(
        auth.sign_up("A", "not-an-email", "123456"),
        Err(Error::Auth(AuthError::InvalidEmail))
    ));
    assert!(matches!(
        auth.sign_up("  ", "a@example.com", "123456"),
        Err(Error::Validation(_))
    ));
    auth.sign_up("A", "a@example.com", "123456").unwrap();
    assert!(matches!(
        auth.sign_up("B", "A@example.com", "abcdef"),
        Err(Error::Auth(AuthError::EmailInUse))
    ));
}

#[test]
fn failed_profile_write_leaves_no_account_behind() {
    let store = store();
    let mut auth = LocalAuth::new(&store).unwrap();
    store.conn().execute_batch("DROP TABLE users").unwrap();

    let err = auth.sign_up("Rina", "rina@example.com", "secret1").unwrap_err();
    assert!(matches!(err, Error::Store(_)));
    assert!(auth.current_session().is_none());
    let accounts: i64 = store
        .conn()
        .query_row("SELECT COUNT(*) FROM credentials", [], |r| r.get(0))
        .unwrap();
    assert_eq!(accounts, 0);

    db::init_schema(store.conn()).unwrap();
    let session = auth.sign_up("Rina", "rina@example.com", "secret1").unwrap();
    assert_eq!(display_name(&store, &session).unwrap(), "Rina");
}

#[test]
fn session_survives_reopening_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.sqlite");
    let user_id = {
        let store = SqliteStore::new(db::open_at(&path).unwrap());
        let mut auth = LocalAuth::new(&store).unwrap();
        auth.sign_up("Rina", "rina@example.com", "secret1").unwrap().user_id
    };

    let store = SqliteStore::new(db::open_at(&path).unwrap());
    let mut auth = LocalAuth::new(&store).unwrap();
    assert_eq!(auth.require_session().unwrap().user_id, user_id);

    auth.sign_out().unwrap();
    drop(auth);
    let auth = LocalAuth::new(&store).unwrap();
    assert!(matches!(auth.require_session(), Err(Error::NotSignedIn)));
}

#[test]
fn listeners_see_current_state_then_every_change() {
    let store = store();
    let mut auth = LocalAuth::new(&store).unwrap();
    let seen: Rc<RefCell<Vec<Option<String>>>> = Rc::default();
    let sink = Rc::clone(&seen);
    auth.on_session_change(Box::new(move |s: Option<&Session>| {
        sink.borrow_mut().push(s.map(|s| s.email.clone()));
    }));

    auth.sign_up("Rina", "rina@example.com", "secret1").unwrap();
    auth.sign_out().unwrap();
    let _ = auth.sign_in("rina@example.com", "wrong-pass");
    assert_eq!(
        *seen.borrow(),
        vec![None, Some("rina@example.com".to_string()), None]
    );
}

#[test]
fn password_change_requires_the_current_password() {
    let store = store();
    let mut auth = LocalAuth::new(&store).unwrap();
    let session = auth.sign_up("Rina", "rina@example.com", "secret1").unwrap();

    let empty = change_password(&mut auth, &session, "", "newsecret").unwrap_err();
    assert!(empty.is_validation());
    let wrong = change_password(&mut auth, &session, "secret2", "newsecret").unwrap_err();
    assert!(matches!(wrong, Error::Auth(AuthError::WrongPassword)));
    let weak = change_password(&mut auth, &session, "secret1", "abc").unwrap_err();
    assert!(matches!(weak, Error::Auth(AuthError::WeakPassword(_))));

    change_password(&mut auth, &session, "secret1", "newsecret").unwrap();
    auth.sign_out().unwrap();
    assert!(auth.sign_in("rina@example.com", "secret1").is_err());
    auth.sign_in("rina@example.com", "newsecret").unwrap();
}

#[test]
fn signed_out_session_cannot_change_password() {
    let store = store();
    let mut auth = LocalAuth::new(&store).unwrap();
    let session = auth.sign_up("Rina", "rina@example.com", "secret1").unwrap();
    auth.sign_out().unwrap();
    let err = change_password(&mut auth, &session, "secret1", "newsecret").unwrap_err();
    assert!(matches!(err, Error::Auth(AuthError::SessionExpired)));
}

#[test]
fn display_name_updates_and_rejects_blank() {
    let store = store();
    let mut auth = LocalAuth::new(&store).unwrap();
    let session = auth.sign_up("Rina", "rina@example.com", "secret1").unwrap();
    assert!(update_display_name(&store, &session, "   ").unwrap_err().is_validation());
    update_display_name(&store, &session, "  Rina S. ").unwrap();
    assert_eq!(display_name(&store, &session).unwrap(), "Rina S.");
}
