use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Produces one idempotency key per request attempt.
///
/// Keys are `<millis>-<sequence>-<random>` in hex. The millisecond timestamp and
/// the per-generator sequence keep sequential keys apart even when the clock does
/// not move; the random suffix keeps separate processes apart.
#[derive(Debug, Default)]
pub struct IdempotencyKeyGenerator {
    sequence: AtomicU64,
}

impl IdempotencyKeyGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generate(&self) -> String {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let random: u64 = rand::random();
        format!("{millis:x}-{sequence:x}-{random:016x}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_sequential_keys_differ() {
        let generator = IdempotencyKeyGenerator::new();
        let keys: HashSet<String> = (0..1000).map(|_| generator.generate()).collect();
        assert_eq!(keys.len(), 1000);
    }

    #[test]
    fn test_key_shape() {
        let key = IdempotencyKeyGenerator::new().generate();
        let parts: Vec<&str> = key.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[1], "0");
        assert_eq!(parts[2].len(), 16);
        assert!(parts.iter().all(|p| p.chars().all(|c| c.is_ascii_hexdigit())));
    }
}
