use rand::Rng;
use std::ops::Range;
use std::time::Duration;

/// User agent rotation for avoiding detection
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:122.0) Gecko/20100101 Firefox/122.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
];

pub fn get_random_user_agent() -> &'static str {
    let mut rng = rand::rng();
    let index = rng.random_range(0..USER_AGENTS.len());
    USER_AGENTS[index]
}

/// Random duration within `range` (milliseconds), for interaction pacing.
pub fn jitter_ms(range: Range<u64>) -> Duration {
    let mut rng = rand::rng();
    Duration::from_millis(rng.random_range(range))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_user_agent() {
        let agent = get_random_user_agent();
        assert!(!agent.is_empty());
        assert!(USER_AGENTS.contains(&agent));
    }

    #[test]
    fn test_jitter_within_range() {
        for _ in 0..50 {
            let d = jitter_ms(40..140);
            assert!(d >= Duration::from_millis(40));
            assert!(d < Duration::from_millis(140));
        }
    }
}
