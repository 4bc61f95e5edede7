//! Cluster and hold-time configuration

use std::time::Duration;

use rand::Rng;

use crate::error::{Error, Result};

/// How long a granted process holds the resource before releasing it.
///
/// This is driver policy only, the protocol is correct for any hold time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HoldPolicy {
    /// Release as soon as `occupy` returns
    #[default]
    Immediate,
    Fixed(Duration),
    /// Uniformly random in `min..=max`
    Random { min: Duration, max: Duration },
}

impl HoldPolicy {
    /// Sample a hold duration
    #[must_use]
    pub fn duration(&self, rng: &mut impl Rng) -> Duration {
        match *self {
            HoldPolicy::Immediate => Duration::ZERO,
            HoldPolicy::Fixed(d) => d,
            HoldPolicy::Random { min, max } if min >= max => min,
            HoldPolicy::Random { min, max } => {
                let nanos = rng.gen_range(min.as_nanos()..=max.as_nanos());
                Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
            }
        }
    }

    /// Random hold between two millisecond bounds
    #[must_use]
    pub fn random_millis(min: u64, max: u64) -> Self {
        HoldPolicy::Random {
            min: Duration::from_millis(min),
            max: Duration::from_millis(max),
        }
    }
}

/// Configuration of an in-process cluster
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    /// Number of processes, ids are `0..processes`
    pub processes: usize,
    pub hold: HoldPolicy,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            processes: 3,
            hold: HoldPolicy::random_millis(0, 20),
        }
    }
}

impl ClusterConfig {
    pub fn new(processes: usize, hold: HoldPolicy) -> Self {
        Self { processes, hold }
    }

    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for an empty cluster or inverted hold bounds.
    pub fn validate(&self) -> Result<()> {
        if self.processes == 0 {
            return Err(Error::InvalidConfig(
                "a cluster needs at least one process".into(),
            ));
        }
        if let HoldPolicy::Random { min, max } = self.hold {
            if min > max {
                return Err(Error::InvalidConfig(format!(
                    "min hold {min:?} exceeds max hold {max:?}"
                )));
            }
        }
        Ok(())
    }
}
