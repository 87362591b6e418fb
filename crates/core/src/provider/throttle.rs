//! Per-provider request throttling.
//!
//! Each provider instance owns its own throttle: a token bucket bounding
//! request rate plus a cooldown window entered when the remote side
//! rate-limits us. While the cooldown is active, calls short-circuit
//! without touching the network.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::ProviderError;

/// Token bucket: tokens refill at a constant rate, one request costs one
/// token.
struct TokenBucket {
    capacity: f32,
    tokens: f32,
    refill_rate: f32,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(requests_per_minute: u32) -> Self {
        let capacity = requests_per_minute.max(1) as f32;
        Self {
            capacity,
            tokens: capacity,
            refill_rate: capacity / 60.0,
            last_refill: Instant::now(),
        }
    }

    fn try_acquire(&mut self) -> Result<(), Duration> {
        self.refill();
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            Ok(())
        } else {
            let needed = 1.0 - self.tokens;
            Err(Duration::from_secs_f32(needed / self.refill_rate))
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f32();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.capacity);
        self.last_refill = now;
    }
}

/// Request throttle owned by one provider instance.
pub struct Throttle {
    bucket: Mutex<TokenBucket>,
    cooldown_until: Mutex<Option<Instant>>,
    cooldown: Duration,
}

impl Throttle {
    pub fn new(requests_per_minute: u32, cooldown: Duration) -> Self {
        Self {
            bucket: Mutex::new(TokenBucket::new(requests_per_minute)),
            cooldown_until: Mutex::new(None),
            cooldown,
        }
    }

    /// Admit one request, or fail with `RateLimited`.
    pub fn acquire(&self) -> Result<(), ProviderError> {
        if let Some(remaining) = self.cooldown_remaining() {
            return Err(ProviderError::RateLimited {
                retry_after_ms: remaining.as_millis() as u64,
            });
        }

        let mut bucket = self.bucket.lock().unwrap();
        bucket.try_acquire().map_err(|wait| ProviderError::RateLimited {
            retry_after_ms: wait.as_millis() as u64,
        })
    }

    /// Enter the configured cooldown window (remote told us to back off).
    pub fn enter_cooldown(&self) {
        let mut until = self.cooldown_until.lock().unwrap();
        *until = Some(Instant::now() + self.cooldown);
    }

    /// Time left in the cooldown window, if one is active.
    pub fn cooldown_remaining(&self) -> Option<Duration> {
        let mut until = self.cooldown_until.lock().unwrap();
        match *until {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    *until = None;
                    None
                } else {
                    Some(deadline - now)
                }
            }
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_exhaustion() {
        let throttle = Throttle::new(3, Duration::from_secs(60));
        for _ in 0..3 {
            assert!(throttle.acquire().is_ok());
        }
        let err = throttle.acquire().unwrap_err();
        assert!(matches!(err, ProviderError::RateLimited { .. }));
    }

    #[test]
    fn test_cooldown_short_circuits() {
        let throttle = Throttle::new(100, Duration::from_secs(60));
        assert!(throttle.acquire().is_ok());

        throttle.enter_cooldown();
        let err = throttle.acquire().unwrap_err();
        match err {
            ProviderError::RateLimited { retry_after_ms } => {
                assert!(retry_after_ms > 0);
                assert!(retry_after_ms <= 60_000);
            }
            other => panic!("expected RateLimited, got {:?}", other),
        }
    }

    #[test]
    fn test_cooldown_expires() {
        let throttle = Throttle::new(100, Duration::from_millis(0));
        throttle.enter_cooldown();
        // Zero-length window clears on the next check.
        assert!(throttle.cooldown_remaining().is_none());
        assert!(throttle.acquire().is_ok());
    }
}
