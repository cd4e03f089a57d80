// Loxwatch Client - Miniserver websocket client
// Copyright (c) 2025 Loxwatch contributors
//
// Licensed under AGPL-3.0.
// See LICENSE file for details.

//! Key-hash authentication
//!
//! The Miniserver hands out a one-time key (`jdev/sys/getkey`, hex
//! encoded). The client answers with `authenticate/{hash}` where `hash` is
//! the hex HMAC-SHA1 of `user:password` keyed with the decoded key.

use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::error::ClientError;

type HmacSha1 = Hmac<Sha1>;

/// Command requesting the one-time key
pub const GET_KEY_COMMAND: &str = "jdev/sys/getkey";

/// Compute the credential hash for a hex-encoded key
pub fn credential_hash(key_hex: &str, user: &str, password: &str) -> Result<String, ClientError> {
    let key = hex::decode(key_hex.trim())
        .map_err(|e| ClientError::Authentication(format!("invalid key '{}': {}", key_hex, e)))?;
    let mut mac = HmacSha1::new_from_slice(&key)
        .map_err(|e| ClientError::Authentication(e.to_string()))?;
    mac.update(format!("{}:{}", user, password).as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Build the `authenticate/...` command for a key
pub fn authenticate_command(key_hex: &str, user: &str, password: &str) -> Result<String, ClientError> {
    Ok(format!("authenticate/{}", credential_hash(key_hex, user, password)?))
}
