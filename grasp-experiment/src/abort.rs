use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// End-experiment interrupt.
///
/// Cloned into whatever thread watches the operator; the sequencer checks it
/// between transitions and on every sensor poll.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle {
    raised: Arc<AtomicBool>,
}

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let handle = AbortHandle::new();
        let watcher = handle.clone();
        assert!(!handle.is_raised());

        std::thread::spawn(move || watcher.raise()).join().unwrap();
        assert!(handle.is_raised());
    }
}
