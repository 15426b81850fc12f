//! GC configuration parameters.
//!
//! All budgets and thresholds are tunable for different workloads.
//! Every knob can also be adjusted at runtime through the setters on the
//! collector context; the adaptive trigger policy nudges
//! `promotion_survivals` and `allocation_threshold` after each cycle.

/// Configuration for the garbage collector.
///
/// # Example
///
/// ```ignore
/// use loam_gc::GcConfig;
///
/// // Frequent, short pauses for an interactive host
/// let config = GcConfig {
///     mark_budget: 5,
///     sweep_budget: 5,
///     ..Default::default()
/// };
/// loam_gc::init(config);
/// ```
#[derive(Debug, Clone)]
pub struct GcConfig {
    /// Maximum objects blackened per incremental step.
    ///
    /// Larger budgets finish cycles in fewer steps at the cost of longer
    /// individual pauses.
    ///
    /// Default: 20
    pub mark_budget: usize,

    /// Maximum pool entries examined per incremental sweep step.
    ///
    /// Default: 10
    pub sweep_budget: usize,

    /// Allocations between automatic cycle starts.
    ///
    /// Every registration increments an allocation counter; crossing this
    /// threshold resets the counter and starts an incremental cycle (a
    /// no-op if one is already in progress). The adaptive policy doubles
    /// this on large heaps to amortize collection cost.
    ///
    /// Default: 100
    pub allocation_threshold: usize,

    /// Survivals before a young object is promoted to the old generation.
    ///
    /// A young object that survives this many sweeps moves to the old
    /// pool with its survival count reset. The adaptive policy relaxes
    /// this on young-sparse heaps and tightens it on churning ones.
    ///
    /// Default: 50
    pub promotion_survivals: u32,

    /// Emit human-readable trace lines (timestamp + event) to stdout.
    ///
    /// Collector events are always emitted through the `log` crate under
    /// the `gc` target; this flag additionally prints them directly.
    ///
    /// Default: false
    pub debug: bool,
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            mark_budget: 20,
            sweep_budget: 10,
            allocation_threshold: 100,
            promotion_survivals: 50,
            debug: false,
        }
    }
}

impl GcConfig {
    /// Create a configuration optimized for short pauses.
    pub fn low_latency() -> Self {
        Self {
            mark_budget: 5,
            sweep_budget: 5,
            allocation_threshold: 50,
            ..Default::default()
        }
    }

    /// Create a configuration optimized for throughput.
    pub fn high_throughput() -> Self {
        Self {
            mark_budget: 200,
            sweep_budget: 100,
            allocation_threshold: 1000,
            ..Default::default()
        }
    }

    /// Create a configuration that promotes survivors quickly.
    ///
    /// Useful for exercising generational behavior: two survivals are
    /// enough to reach the old pool.
    pub fn eager_promotion() -> Self {
        Self {
            promotion_survivals: 2,
            ..Default::default()
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mark_budget == 0 {
            return Err(ConfigError::ZeroMarkBudget);
        }
        if self.sweep_budget == 0 {
            return Err(ConfigError::ZeroSweepBudget);
        }
        if self.allocation_threshold == 0 {
            return Err(ConfigError::ZeroAllocationThreshold);
        }
        if self.promotion_survivals == 0 {
            return Err(ConfigError::ZeroPromotionSurvivals);
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Mark budget must be at least 1.
    ZeroMarkBudget,
    /// Sweep budget must be at least 1.
    ZeroSweepBudget,
    /// Allocation threshold must be at least 1.
    ZeroAllocationThreshold,
    /// Promotion survival count must be at least 1.
    ZeroPromotionSurvivals,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ZeroMarkBudget => write!(f, "mark budget must be at least 1"),
            ConfigError::ZeroSweepBudget => write!(f, "sweep budget must be at least 1"),
            ConfigError::ZeroAllocationThreshold => {
                write!(f, "allocation threshold must be at least 1")
            }
            ConfigError::ZeroPromotionSurvivals => {
                write!(f, "promotion survival count must be at least 1")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(GcConfig::default().validate().is_ok());
    }

    #[test]
    fn test_preset_configs_are_valid() {
        assert!(GcConfig::low_latency().validate().is_ok());
        assert!(GcConfig::high_throughput().validate().is_ok());
        assert!(GcConfig::eager_promotion().validate().is_ok());
    }

    #[test]
    fn test_zero_mark_budget_rejected() {
        let config = GcConfig {
            mark_budget: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroMarkBudget));
    }

    #[test]
    fn test_zero_promotion_survivals_rejected() {
        let config = GcConfig {
            promotion_survivals: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroPromotionSurvivals));
    }
}
