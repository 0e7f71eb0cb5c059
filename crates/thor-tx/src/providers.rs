//! Chain-state provider traits and in-memory adapters used by the submit client.

use std::sync::RwLock;

use alloy_primitives::{B64, B256};

/// Source of the latest block reference: the first 8 bytes of a recent block id.
pub trait BlockRefProvider: Send + Sync {
    /// Returns the newest block reference when available.
    fn latest_block_ref(&self) -> Option<B64>;
}

/// In-memory block reference provider for tests and static configurations.
#[derive(Debug, Default)]
pub struct StaticBlockRefProvider {
    /// Current block reference.
    value: RwLock<Option<B64>>,
}

impl StaticBlockRefProvider {
    /// Creates a provider with an optional block reference.
    #[must_use]
    pub const fn new(value: Option<B64>) -> Self {
        Self {
            value: RwLock::new(value),
        }
    }

    /// Replaces the block reference, for example after a new head arrives.
    pub fn update(&self, value: Option<B64>) {
        match self.value.write() {
            Ok(mut guard) => *guard = value,
            Err(poisoned) => *poisoned.into_inner() = value,
        }
    }
}

impl BlockRefProvider for StaticBlockRefProvider {
    fn latest_block_ref(&self) -> Option<B64> {
        match self.value.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// Block reference of a block id: its first 8 bytes.
#[must_use]
pub fn block_ref_of(block_id: &B256) -> B64 {
    let mut out = [0_u8; 8];
    out.copy_from_slice(block_id.get(..8).unwrap_or(&[0_u8; 8]));
    B64::from(out)
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{b256, hex};

    use super::*;

    #[test]
    fn static_provider_tracks_updates() {
        let provider = StaticBlockRefProvider::new(None);
        assert_eq!(provider.latest_block_ref(), None);

        provider.update(Some(B64::from(hex!("00000000aabbccdd"))));
        assert_eq!(provider.latest_block_ref(), Some(B64::from(hex!("00000000aabbccdd"))));
    }

    #[test]
    fn block_ref_is_block_id_prefix() {
        let id = b256!("0000a1b2c3d4e5f6a7a8a9aaabacadaeafb0b1b2b3b4b5b6b7b8b9babbbcbdbe");
        assert_eq!(block_ref_of(&id), B64::from(hex!("0000a1b2c3d4e5f6")));
    }
}
