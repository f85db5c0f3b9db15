use std::sync::Arc;

use slotmap::{SlotMap, new_key_type};

new_key_type! {
    /// Opaque handle to file bytes held outside the tree.
    pub struct PayloadKey;
}

/// In-memory file contents, addressed by the handles stored on File nodes.
///
/// Bytes are shared as `Arc<[u8]>` so a decode worker can hold them while the
/// tree keeps changing. Nothing here is persisted.
#[derive(Debug, Default)]
pub struct PayloadStore {
    slots: SlotMap<PayloadKey, Arc<[u8]>>,
}

impl PayloadStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, bytes: impl Into<Arc<[u8]>>) -> PayloadKey {
        self.slots.insert(bytes.into())
    }

    pub fn get(&self, key: PayloadKey) -> Option<Arc<[u8]>> {
        self.slots.get(key).cloned()
    }

    pub fn release(&mut self, key: PayloadKey) -> bool {
        self.slots.remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn total_bytes(&self) -> usize {
        self.slots.values().map(|bytes| bytes.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn released_handles_stop_resolving() {
        let mut store = PayloadStore::new();
        let key = store.insert(b"hello".to_vec());
        assert_eq!(store.get(key).as_deref(), Some(&b"hello"[..]));
        assert_eq!(store.total_bytes(), 5);

        assert!(store.release(key));
        assert!(store.get(key).is_none());
        assert!(!store.release(key));
        assert!(store.is_empty());
    }
}
