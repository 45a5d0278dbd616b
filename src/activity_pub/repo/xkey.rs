use anyhow::{Result, ensure};
use fjall::{Slice, UserKey};

/// Longest key the underlying tree accepts.
pub(super) const MAX_KEY_LENGTH: usize = u16::MAX as usize;

pub(super) fn check_key(key: &[u8]) -> Result<()> {
    ensure!(
        key.len() <= MAX_KEY_LENGTH,
        "key of {} bytes exceeds {MAX_KEY_LENGTH}",
        key.len()
    );
    Ok(())
}

/// `actor NUL object`, so all follows of one actor sort together.
#[derive(Clone)]
pub(super) struct PairKey(Slice);

impl PairKey {
    pub(super) fn new(actor_id: &str, object_id: &str) -> Result<PairKey> {
        let mut key = Vec::with_capacity(actor_id.len() + object_id.len() + 1);
        key.extend_from_slice(actor_id.as_bytes());
        key.push(0);
        key.extend_from_slice(object_id.as_bytes());
        check_key(&key)?;
        Ok(PairKey(key.into()))
    }
}

impl From<PairKey> for UserKey {
    fn from(value: PairKey) -> Self {
        value.0
    }
}

impl AsRef<[u8]> for PairKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
