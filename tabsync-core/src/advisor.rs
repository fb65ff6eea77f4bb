use std::future::Future;
use std::time::{Duration, Instant};

#[derive(Clone, Debug)]
pub struct AdvisorConfig {
    pub min: u64,
    pub max: u64,
    /// Below this the link is idle enough to double the batch.
    pub fast: Duration,
    /// Up to this the batch still grows by `step`.
    pub target: Duration,
    /// Past this the batch is cut to a third.
    pub slow: Duration,
    pub step: u64,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            min: 10,
            max: 100_000,
            fast: Duration::from_millis(800),
            target: Duration::from_millis(1100),
            slow: Duration::from_secs(3),
            step: 100,
        }
    }
}

/// Times each page round trip and proposes the size of the next page.
#[derive(Clone, Debug, Default)]
pub struct ChunksizeAdvisor {
    cfg: AdvisorConfig,
}

impl ChunksizeAdvisor {
    pub fn new(mut cfg: AdvisorConfig) -> Self {
        cfg.min = cfg.min.max(1);
        cfg.max = cfg.max.max(cfg.min);
        Self { cfg }
    }

    pub fn clamp(&self, size: u64) -> u64 {
        size.clamp(self.cfg.min, self.cfg.max)
    }

    /// Awaits `op` once and hands its output back untouched, together with
    /// the batch size to use next.
    pub async fn next<T, F>(&self, current: u64, op: F) -> (u64, T)
    where
        F: Future<Output = T>,
    {
        let started = Instant::now();
        let out = op.await;
        let elapsed = started.elapsed();
        let proposed = self.propose(current, elapsed);
        tracing::trace!(current, proposed, ?elapsed, "chunksize");
        (proposed, out)
    }

    /// Every branch is non-increasing in `elapsed` for any `current`.
    pub fn propose(&self, current: u64, elapsed: Duration) -> u64 {
        let c = self.clamp(current);
        let step = self.cfg.step;
        let next = if elapsed < self.cfg.fast {
            c.saturating_mul(2).max(c.saturating_add(step))
        } else if elapsed <= self.cfg.target {
            c.saturating_add(step)
        } else if elapsed <= self.cfg.slow {
            c.saturating_sub(step).max(c / 3)
        } else {
            c / 3
        };
        self.clamp(next)
    }
}
