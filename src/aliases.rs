// src/aliases.rs
//! Secret containers used throughout secret-keyring

use zeroize::Zeroizing;

/// Private key packet bytes, wiped from memory on drop
pub type SecretKeyMaterial = Zeroizing<Vec<u8>>;
