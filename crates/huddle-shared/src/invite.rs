//! Invite codes.
//!
//! A code is an opaque random token that grants eligibility to *request*
//! membership in exactly one group; the admin still has to approve the
//! request. Codes are persisted with a uniqueness constraint, so a code
//! always resolves to a single group. Several codes may be active for the
//! same group at once, and issuing a new one never invalidates the old.

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::constants::INVITE_CODE_BYTES;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct InviteCode(String);

impl InviteCode {
    /// Generate a fresh random code (hex, lowercase).
    pub fn generate() -> Self {
        let mut bytes = [0u8; INVITE_CODE_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Parse a user-supplied code: trimmed and lowercased so codes survive
    /// copy-paste. Returns `None` for anything that cannot be a code.
    pub fn parse(raw: &str) -> Option<Self> {
        let code = raw.trim().to_lowercase();
        if code.is_empty() || code.len() > 64 {
            return None;
        }
        Some(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for InviteCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
