#![forbid(unsafe_code)]

//! Configuration for cells and the event bus.
//!
//! Neither structure changes dispatch semantics. They only control how a
//! cell or bus identifies itself in logs and when it warns about listener
//! lists that keep growing (the usual symptom of a host that never calls
//! `reset` or never gets dropped).

/// Default number of live entries after which a growth warning is logged.
pub const DEFAULT_WARN_THRESHOLD: usize = 64;

/// Configuration for a [`ReactiveCell`](crate::ReactiveCell).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellConfig {
    /// Name used in log records (e.g. `"TaskGroup.name"`).
    pub label: Option<&'static str>,
    /// Warn once the subscriber list exceeds this length (0 = never).
    pub subscriber_warn_threshold: usize,
}

impl Default for CellConfig {
    fn default() -> Self {
        Self {
            label: None,
            subscriber_warn_threshold: DEFAULT_WARN_THRESHOLD,
        }
    }
}

impl CellConfig {
    /// Default configuration carrying a log label.
    #[must_use]
    pub fn labeled(label: &'static str) -> Self {
        Self {
            label: Some(label),
            ..Self::default()
        }
    }

    /// Set the log label.
    #[must_use]
    pub fn with_label(mut self, label: &'static str) -> Self {
        self.label = Some(label);
        self
    }

    /// Set the subscriber growth warning threshold.
    #[must_use]
    pub fn with_subscriber_warn_threshold(mut self, threshold: usize) -> Self {
        self.subscriber_warn_threshold = threshold;
        self
    }

    pub(crate) fn label_or_default(&self) -> &'static str {
        self.label.unwrap_or("<unlabeled>")
    }
}

/// Configuration for an [`EventBus`](crate::EventBus).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventBusConfig {
    /// Warn once a single event's listener list exceeds this length
    /// (0 = never).
    pub listener_warn_threshold: usize,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            listener_warn_threshold: DEFAULT_WARN_THRESHOLD,
        }
    }
}

impl EventBusConfig {
    /// Set the listener growth warning threshold.
    #[must_use]
    pub fn with_listener_warn_threshold(mut self, threshold: usize) -> Self {
        self.listener_warn_threshold = threshold;
        self
    }

    /// Never warn about listener growth.
    #[must_use]
    pub fn quiet() -> Self {
        Self {
            listener_warn_threshold: 0,
        }
    }
}

/// True exactly when `len` has just grown past `threshold`.
///
/// Warnings fire on the crossing only, not on every later registration.
pub(crate) fn crossed_threshold(len: usize, threshold: usize) -> bool {
    threshold != 0 && len == threshold + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_config_builders() {
        let config = CellConfig::default()
            .with_label("TaskGroup.name")
            .with_subscriber_warn_threshold(3);
        assert_eq!(config.label, Some("TaskGroup.name"));
        assert_eq!(config.subscriber_warn_threshold, 3);
        assert_eq!(CellConfig::labeled("x").label_or_default(), "x");
        assert_eq!(CellConfig::default().label_or_default(), "<unlabeled>");
    }

    #[test]
    fn bus_config_builders() {
        assert_eq!(
            EventBusConfig::default().listener_warn_threshold,
            DEFAULT_WARN_THRESHOLD
        );
        assert_eq!(EventBusConfig::quiet().listener_warn_threshold, 0);
        assert_eq!(
            EventBusConfig::default()
                .with_listener_warn_threshold(5)
                .listener_warn_threshold,
            5
        );
    }

    #[test]
    fn threshold_crossing_fires_once() {
        assert!(!crossed_threshold(2, 2));
        assert!(crossed_threshold(3, 2));
        assert!(!crossed_threshold(4, 2));
        assert!(!crossed_threshold(1, 0));
    }
}
