use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Enforces a minimum delay between consecutive outbound platform calls.
///
/// Callers await [`pace`](CallPacer::pace) before each request. The pacer
/// reserves the next available slot under a short lock and sleeps outside
/// of it, so concurrent callers queue up one slot apart instead of
/// serializing their whole requests.
pub struct CallPacer {
    min_interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl CallPacer {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            next_slot: Mutex::new(None),
        }
    }

    /// A pacer that never delays. Used in tests.
    pub fn unthrottled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub async fn pace(&self) {
        let slot = {
            let mut next_slot = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = match *next_slot {
                Some(at) if at > now => at,
                _ => now,
            };
            *next_slot = Some(slot + self.min_interval);
            slot
        };
        tokio::time::sleep_until(slot).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unthrottled_pacer_does_not_delay() {
        let pacer = CallPacer::unthrottled();
        let start = Instant::now();
        for _ in 0..10 {
            pacer.pace().await;
        }
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn sequential_calls_are_spaced() {
        let pacer = CallPacer::new(Duration::from_millis(20));
        let start = Instant::now();
        for _ in 0..3 {
            pacer.pace().await;
        }
        // First call is immediate, the next two wait 20ms each.
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn concurrent_calls_are_serialized() {
        use std::sync::Arc;

        let pacer = Arc::new(CallPacer::new(Duration::from_millis(20)));
        let start = Instant::now();
        let tasks: Vec<_> = (0..3)
            .map(|_| {
                let pacer = pacer.clone();
                tokio::spawn(async move { pacer.pace().await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }
        assert!(start.elapsed() >= Duration::from_millis(40));
    }
}
