//! Lock identity.

use payout_shared::types::PayoutAccountId;
use sha2::{Digest, Sha256};

/// Identity of a lock, identical across backends.
///
/// The distributed backend locks on `name`; the row backend locks the
/// `payout_locks` row whose id is `id`. Both derive from the same name, so
/// any code path locking the same account contends on the same lock.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LockKey {
    name: String,
    id: i64,
}

impl LockKey {
    /// Lock guarding reservation of an account's unpaid transactions.
    #[must_use]
    pub fn payout_account(account_id: PayoutAccountId) -> Self {
        Self::from_name(format!("payout_account:{account_id}"))
    }

    /// Builds a key from an arbitrary name.
    #[must_use]
    pub fn from_name(name: impl Into<String>) -> Self {
        let name = name.into();
        let id = stable_hash(&name);
        Self { name, id }
    }

    /// Lock name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 64-bit hash of the name.
    #[must_use]
    pub const fn id(&self) -> i64 {
        self.id
    }
}

impl std::fmt::Display for LockKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// First eight bytes of the SHA-256 of `name`, big-endian.
fn stable_hash(name: &str) -> i64 {
    let digest = Sha256::digest(name.as_bytes());
    let mut bytes = [0_u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    i64::from_be_bytes(bytes)
}
