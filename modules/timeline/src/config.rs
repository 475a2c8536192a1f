use std::env;

/// Engine configuration, read from the environment with safe defaults.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Subject prefix for published signals, e.g. `timeline.events` yields
    /// `timeline.events.repair.completed`.
    pub signal_subject_prefix: String,
    /// Capacity of the in-memory signal bus, when that implementation is
    /// wired in.
    pub bus_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            signal_subject_prefix: "timeline.events".to_string(),
            bus_capacity: 1024,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let signal_subject_prefix = env::var("TIMELINE_SIGNAL_SUBJECT_PREFIX")
            .unwrap_or(defaults.signal_subject_prefix);

        let bus_capacity = match env::var("TIMELINE_BUS_CAPACITY") {
            Ok(raw) => match raw.parse() {
                Ok(n) => n,
                Err(_) => {
                    tracing::warn!(value = %raw, "TIMELINE_BUS_CAPACITY is not a number, using default");
                    defaults.bus_capacity
                }
            },
            Err(_) => defaults.bus_capacity,
        };

        Self {
            signal_subject_prefix,
            bus_capacity,
        }
    }
}
