// tests/cache_tests.rs
use std::fs;
use std::path::PathBuf;
use std::sync::{mpsc, Arc, Barrier};
use std::thread;
use std::time::Duration;

use secret_keyring::{secret_keyring_path, KeyringError, SecretKeyringCache};
use tempfile::tempdir;

mod common;
mod support;
use support::{codec, secret_entity, write_keyring, CountingCodec, GatedCodec};

fn template_in(dir: &std::path::Path) -> String {
    dir.join("secretkeys.%u.gpg").to_string_lossy().into_owned()
}

#[test]
fn test_empty_username_fails_without_io() {
    common::setup();
    let counting = Arc::new(CountingCodec::default());
    let cache = SecretKeyringCache::new(Some("/nonexistent/%u".into()), counting.clone());

    let err = cache.load_for_user("").unwrap_err();

    assert!(matches!(err, KeyringError::NoUsername));
    assert!(cache.cached_usernames().is_empty());
    assert_eq!(counting.decodes(), 0);
}

#[test]
fn test_no_template_means_no_keyrings() {
    common::setup();
    let cache = SecretKeyringCache::new(None, codec());
    assert!(matches!(
        cache.load_for_user("alice"),
        Err(KeyringError::NoKeyrings)
    ));

    let blank = SecretKeyringCache::new(Some(String::new()), codec());
    assert!(blank.template().is_none());
}

#[test]
fn test_template_substitution() {
    assert_eq!(
        secret_keyring_path("/keys/secretkeys.%u.gpg", "alice"),
        PathBuf::from("/keys/secretkeys.alice.gpg")
    );
    // without the token every user shares one file
    assert_eq!(
        secret_keyring_path("/keys/shared.gpg", "alice"),
        secret_keyring_path("/keys/shared.gpg", "bob")
    );
}

#[test]
fn test_concurrent_first_loads_share_one_load() {
    common::setup();
    let dir = tempdir().unwrap();
    let template = template_in(dir.path());
    write_keyring(
        &secret_keyring_path(&template, "alice"),
        vec![secret_entity("alice")],
    );

    let counting = Arc::new(CountingCodec::default());
    let cache = Arc::new(SecretKeyringCache::new(Some(template), counting.clone()));
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                cache.load_for_user("alice").unwrap()
            })
        })
        .collect();
    let loaded: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(counting.decodes(), 1);
    assert!(loaded.iter().all(|k| Arc::ptr_eq(k, &loaded[0])));
    assert_eq!(loaded[0].len(), 1);
    assert_eq!(cache.cached_usernames(), vec!["alice".to_string()]);
}

#[test]
fn test_stalled_load_does_not_block_other_users() {
    common::setup();
    let dir = tempdir().unwrap();
    let template = template_in(dir.path());
    for user in ["a", "b"] {
        write_keyring(
            &secret_keyring_path(&template, user),
            vec![secret_entity(user)],
        );
    }

    let gated = Arc::new(GatedCodec::default());
    let cache = Arc::new(SecretKeyringCache::new(Some(template), gated.clone()));

    let stalled = {
        let cache = Arc::clone(&cache);
        thread::spawn(move || cache.load_for_user("a").map(|k| k.len()))
    };
    while !gated.is_holding() {
        thread::sleep(Duration::from_millis(5));
    }

    let (tx, rx) = mpsc::channel();
    {
        let cache = Arc::clone(&cache);
        thread::spawn(move || {
            let _ = tx.send(cache.load_for_user("b").map(|k| k.len()));
        });
    }
    let b = rx.recv_timeout(Duration::from_secs(5));

    gated.open();
    assert_eq!(stalled.join().unwrap().unwrap(), 1);
    assert_eq!(b.expect("load for b waited on a").unwrap(), 1);
}

#[test]
fn test_users_get_separate_keyrings() {
    common::setup();
    let dir = tempdir().unwrap();
    let template = template_in(dir.path());
    write_keyring(
        &secret_keyring_path(&template, "alice"),
        vec![secret_entity("alice")],
    );

    let cache = SecretKeyringCache::new(Some(template), codec());
    let alice = cache.load_for_user("alice").unwrap();
    let bob = cache.load_for_user("bob").unwrap();

    assert_eq!(alice.len(), 1);
    assert!(bob.is_empty());
    assert!(!Arc::ptr_eq(&alice, &bob));
}

#[test]
fn test_missing_file_is_cached_as_empty() {
    common::setup();
    let dir = tempdir().unwrap();
    let template = template_in(dir.path());
    let cache = SecretKeyringCache::new(Some(template.clone()), codec());

    let first = cache.load_for_user("carol").unwrap();
    assert!(first.is_empty());

    // appearing later does not matter until the entry is invalidated
    write_keyring(
        &secret_keyring_path(&template, "carol"),
        vec![secret_entity("carol")],
    );
    let second = cache.load_for_user("carol").unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert!(second.is_empty());

    assert!(cache.invalidate("carol"));
    let third = cache.load_for_user("carol").unwrap();
    assert_eq!(third.len(), 1);
}

#[test]
fn test_hard_errors_are_not_cached() {
    common::setup();
    let dir = tempdir().unwrap();
    let template = template_in(dir.path());
    let path = secret_keyring_path(&template, "dave");
    fs::write(&path, b"{ truncated").unwrap();

    let counting = Arc::new(CountingCodec::default());
    let cache = SecretKeyringCache::new(Some(template), counting.clone());

    let err = cache.load_for_user("dave").unwrap_err();
    assert!(matches!(err, KeyringError::Format { .. }));
    assert!(cache.cached_usernames().is_empty());

    write_keyring(&path, vec![secret_entity("dave")]);
    let keyring = cache.load_for_user("dave").unwrap();
    assert_eq!(keyring.len(), 1);
    assert_eq!(counting.decodes(), 2);
}
