//! Sample/publish scheduling policy.

use crate::sensor::{SampleSet, has_changed};

/// Minimum interval between sample/publish evaluation passes.
///
/// The throttle that keeps a noisy or bouncing input from flooding the
/// broker.
pub const SOFT_INTERVAL_MS: u64 = 3_000;

/// Maximum interval between publishes.
///
/// The heartbeat: a silent node that stopped reporting is indistinguishable
/// from a dead one, so a publish is forced at this interval even with no
/// change.
pub const HARD_INTERVAL_MS: u64 = 30_000;

/// What one scheduler tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// The soft deadline has not passed; nothing was sampled.
    Throttled,
    /// Sampled, but nothing changed and the heartbeat is not due.
    Quiet,
    /// Sampled and published.
    Published,
}

#[cfg(feature = "defmt")]
impl defmt::Format for Tick {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Tick::Throttled => defmt::write!(f, "Throttled"),
            Tick::Quiet => defmt::write!(f, "Quiet"),
            Tick::Published => defmt::write!(f, "Published"),
        }
    }
}

/// Decides, each tick, whether to sample and whether to publish.
///
/// Owns the two deadlines and the last *published* snapshot. The snapshot is
/// replaced only after a successful publish, so an unchanged-but-unsent
/// reading keeps comparing against what the broker actually holds.
///
/// Both deadlines start at the epoch, which makes the very first tick sample
/// and publish unconditionally: the heartbeat is immediately due, and the
/// implicit empty previous snapshot differs from any real sample anyway.
#[derive(Debug, Default)]
pub struct PublishScheduler {
    soft_deadline: u64,
    hard_deadline: u64,
    published: SampleSet,
}

impl PublishScheduler {
    /// A scheduler with both deadlines due immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one scheduling pass at monotonic time `now` (milliseconds).
    ///
    /// Before the soft deadline this is a no-op: `sample` is not even
    /// called. Past it, a fresh sample is taken and published when it
    /// differs from the last published snapshot or the hard deadline has
    /// passed. On a successful publish the snapshot is replaced and the
    /// hard deadline reset; the soft deadline advances whenever a pass ran,
    /// publish or not, success or not.
    ///
    /// A publish failure is returned to the caller; the sample is not
    /// queued. The next pass re-reads the sensors and retries naturally.
    pub fn tick<E>(
        &mut self,
        now: u64,
        sample: impl FnOnce() -> SampleSet,
        publish: impl FnOnce(&SampleSet) -> Result<(), E>,
    ) -> Result<Tick, E> {
        if now < self.soft_deadline {
            return Ok(Tick::Throttled);
        }

        let current = sample();
        let due = has_changed(&current, &self.published) || now >= self.hard_deadline;

        let outcome = if due {
            match publish(&current) {
                Ok(()) => {
                    self.published = current;
                    self.hard_deadline = now + HARD_INTERVAL_MS;
                    Ok(Tick::Published)
                }
                Err(err) => Err(err),
            }
        } else {
            Ok(Tick::Quiet)
        };

        // Throttle applies to evaluation passes, not just publishes.
        self.soft_deadline = now + SOFT_INTERVAL_MS;
        outcome
    }

    /// The sample set last successfully transmitted.
    pub fn published(&self) -> &SampleSet {
        &self.published
    }
}
