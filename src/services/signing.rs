// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HMAC-SHA256 signing for values that round-trip through the browser
//! (session cookies, OAuth state).

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

/// Hex-encoded HMAC-SHA256 of `payload`.
pub fn sign(key: &[u8], payload: &str) -> String {
    // HMAC accepts keys of any length, so this cannot fail.
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key)
        .unwrap_or_else(|_| unreachable!("HMAC-SHA256 accepts any key length"));
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time check of a hex signature produced by [`sign`].
pub fn verify(key: &[u8], payload: &str, signature_hex: &str) -> bool {
    let expected = sign(key, payload);
    expected.len() == signature_hex.len()
        && bool::from(expected.as_bytes().ct_eq(signature_hex.as_bytes()))
}
