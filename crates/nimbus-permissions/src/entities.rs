//! Per-path permission records and the account group table.

use nimbus_types::Principal;
use serde::{Deserialize, Serialize};

/// The two actions the authorization matrix distinguishes (§4.4): `read`
/// covers HEAD/GET, `write` covers PUT/POST/DELETE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Read,
    Write,
}

/// The `{read: [...], write: [...]}` record bound to one path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessList {
    pub read: Vec<Principal>,
    pub write: Vec<Principal>,
}

impl AccessList {
    pub fn is_empty(&self) -> bool {
        self.read.is_empty() && self.write.is_empty()
    }

    pub fn list_for(&self, action: Action) -> &[Principal] {
        match action {
            Action::Read => &self.read,
            Action::Write => &self.write,
        }
    }

    /// A path is public iff `*` appears in its read list.
    pub fn is_public(&self) -> bool {
        self.read.iter().any(Principal::is_public)
    }
}

/// A public-URL token binding: the path it grants read access to, plus the
/// alphabet/security parameters it was minted with (kept for audit, not
/// needed to resolve the token).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicBinding {
    pub path: String,
    pub token: String,
}
