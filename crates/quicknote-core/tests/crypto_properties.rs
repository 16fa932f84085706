//! Property-based tests for note encryption.
//!
//! 1. **Round-trip**: decrypt(encrypt(p, s), s) == p for any non-empty p
//! 2. **Wrong secret**: decrypt(encrypt(p, s1), s2) fails for s1 != s2
//! 3. **Salt coupling**: a salt is produced iff the secret is a password

use proptest::prelude::*;
use quicknote_core::{Error, LinkKey, NoteCipher, Secret};

// PBKDF2 at the production work factor makes hundreds of cases too slow.
fn cipher() -> NoteCipher {
    NoteCipher::with_iterations(64)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn password_round_trip(plaintext in ".{1,256}", password in ".{1,32}") {
        let note = cipher().encrypt(&plaintext, &Secret::password(password.clone())).unwrap();
        prop_assert!(note.salt.is_some());
        prop_assert_eq!(cipher().decrypt(&note, &password).unwrap(), plaintext);
    }

    #[test]
    fn link_key_round_trip(plaintext in ".{1,256}") {
        let key = LinkKey::generate();
        let note = cipher().encrypt(&plaintext, &Secret::LinkKey(key.clone())).unwrap();
        prop_assert!(note.salt.is_none());
        prop_assert_eq!(cipher().decrypt(&note, &key.encode()).unwrap(), plaintext);
    }

    #[test]
    fn wrong_password_fails(
        plaintext in ".{1,128}",
        right in "[a-z0-9]{1,16}",
        wrong in "[a-z0-9]{1,16}",
    ) {
        prop_assume!(right != wrong);
        let note = cipher().encrypt(&plaintext, &Secret::password(right)).unwrap();
        prop_assert_eq!(cipher().decrypt(&note, &wrong), Err(Error::Decryption));
    }
}

#[test]
fn scenario_link_key_hello() {
    let key = LinkKey::generate();
    let note = cipher()
        .encrypt("hello", &Secret::LinkKey(key.clone()))
        .unwrap();
    assert_eq!(cipher().decrypt(&note, &key.encode()).unwrap(), "hello");
}

#[test]
fn scenario_password_secret() {
    let note = cipher()
        .encrypt("secret", &Secret::password("p@ss"))
        .unwrap();
    assert_eq!(cipher().decrypt(&note, "wrong"), Err(Error::Decryption));
    assert_eq!(cipher().decrypt(&note, "p@ss").unwrap(), "secret");
}

#[test]
fn default_work_factor_round_trip() {
    let note = quicknote_core::encrypt("slow but safe", &Secret::password("p@ss")).unwrap();
    assert_eq!(
        quicknote_core::decrypt(&note, "p@ss").unwrap(),
        "slow but safe"
    );
}
