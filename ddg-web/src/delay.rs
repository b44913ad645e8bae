use async_trait::async_trait;
use rand::Rng;
use rand::rngs::OsRng;
use std::time::Duration;
use tokio::time::sleep;

/// Pause awaited between two page fetches of the same query.
#[async_trait]
pub trait DelayPolicy: Send + Sync {
    async fn wait(&self);
}

/// Sleeps a uniformly random duration in `[min, max]` to look less like a bot.
#[derive(Debug, Clone)]
pub struct RandomDelay {
    min: Duration,
    max: Duration,
}

impl RandomDelay {
    /// Bounds are swapped when given in the wrong order.
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    pub fn from_millis(min: u64, max: u64) -> Self {
        Self::new(Duration::from_millis(min), Duration::from_millis(max))
    }

    pub fn pick(&self) -> Duration {
        let ms = OsRng.gen_range(self.min.as_millis() as u64..=self.max.as_millis() as u64);
        Duration::from_millis(ms)
    }
}

impl Default for RandomDelay {
    fn default() -> Self {
        Self::from_millis(800, 2900)
    }
}

#[async_trait]
impl DelayPolicy for RandomDelay {
    async fn wait(&self) {
        let pause = self.pick();
        tracing::trace!(target: "web.ddg", pause_ms = pause.as_millis() as u64, "delay.wait");
        sleep(pause).await;
    }
}

/// Returns immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

#[async_trait]
impl DelayPolicy for NoDelay {
    async fn wait(&self) {}
}
