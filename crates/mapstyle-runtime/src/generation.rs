//! Generation tokens for discarding stale async results.

use std::collections::HashMap;

/// Identifies one issued request for `key`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestToken {
    pub key: String,
    pub generation: u64,
}

/// Per-key generation counters.
///
/// Issuing a token for a key makes every earlier token for that key stale.
#[derive(Debug, Clone, Default)]
pub struct GenerationCounter {
    generations: HashMap<String, u64>,
}

impl GenerationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self, key: &str) -> RequestToken {
        let generation = self.generations.entry(key.to_string()).or_insert(0);
        *generation += 1;
        RequestToken {
            key: key.to_string(),
            generation: *generation,
        }
    }

    pub fn current(&self, key: &str) -> Option<u64> {
        self.generations.get(key).copied()
    }

    pub fn is_current(&self, token: &RequestToken) -> bool {
        self.current(&token.key) == Some(token.generation)
    }

    /// Invalidate every outstanding token for `key`.
    pub fn invalidate(&mut self, key: &str) {
        if let Some(generation) = self.generations.get_mut(key) {
            *generation += 1;
        }
    }
}
