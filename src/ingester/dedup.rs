use std::collections::VecDeque;
use std::sync::Mutex;

use rustc_hash::FxHashSet;

/// Bounded FIFO window of recently ingested signatures.
///
/// Catches the duplicate deliveries the relay's at-least-once outbox can
/// produce. A capacity of zero disables the window.
pub struct RecentSignatures {
    capacity: usize,
    inner: Mutex<Window>,
}

#[derive(Default)]
struct Window {
    order: VecDeque<String>,
    members: FxHashSet<String>,
}

impl RecentSignatures {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(Window::default()),
        }
    }

    pub fn contains(&self, signature: &str) -> bool {
        match self.inner.lock() {
            Ok(window) => window.members.contains(signature),
            Err(poisoned) => poisoned.into_inner().members.contains(signature),
        }
    }

    /// Remember a signature, evicting the oldest once the window is full
    pub fn remember(&self, signature: &str) {
        if self.capacity == 0 {
            return;
        }

        let mut window = match self.inner.lock() {
            Ok(window) => window,
            Err(poisoned) => poisoned.into_inner(),
        };

        if !window.members.insert(signature.to_string()) {
            return;
        }
        window.order.push_back(signature.to_string());

        while window.order.len() > self.capacity {
            if let Some(oldest) = window.order.pop_front() {
                window.members.remove(&oldest);
            }
        }
    }

    pub fn len(&self) -> usize {
        match self.inner.lock() {
            Ok(window) => window.order.len(),
            Err(poisoned) => poisoned.into_inner().order.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oldest_signature_is_evicted() {
        let recent = RecentSignatures::new(2);
        recent.remember("a");
        recent.remember("b");
        recent.remember("a");
        assert_eq!(recent.len(), 2);

        recent.remember("c");
        assert!(!recent.contains("a"));
        assert!(recent.contains("b"));
        assert!(recent.contains("c"));
    }

    #[test]
    fn test_zero_capacity_disables_window() {
        let recent = RecentSignatures::new(0);
        recent.remember("a");
        assert!(!recent.contains("a"));
        assert!(recent.is_empty());
    }
}
