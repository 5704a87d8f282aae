//! Loading indicator owned by a results panel.

use crate::config::SpinnerConfig;

/// A spinner-like indicator. At most one is active per panel: spinning an
/// already spinning indicator is a no-op.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadingIndicator {
    config: SpinnerConfig,
    /// Id of the panel the indicator is drawn into while spinning.
    target: Option<String>,
}

impl LoadingIndicator {
    pub fn new(config: SpinnerConfig) -> Self {
        Self { config, target: None }
    }

    pub fn config(&self) -> &SpinnerConfig {
        &self.config
    }

    /// Start spinning inside the element with id `target`.
    pub fn spin(&mut self, target: &str) {
        if self.target.is_none() {
            self.target = Some(target.to_string());
        }
    }

    pub fn stop(&mut self) {
        self.target = None;
    }

    pub fn is_spinning(&self) -> bool {
        self.target.is_some()
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spin_is_idempotent_and_stop_resets() {
        let mut spinner = LoadingIndicator::new(SpinnerConfig::default());
        spinner.spin("a");
        spinner.spin("b");
        assert_eq!(spinner.target(), Some("a"));
        spinner.stop();
        assert!(!spinner.is_spinning());
        spinner.stop();
        assert!(!spinner.is_spinning());
    }
}
