//! Reveal controller configuration.
//!
//! Configuration can be built in code:
//!
//! ```
//! use reveal::{RevealConfig, RootMargin};
//! use std::time::Duration;
//!
//! let config = RevealConfig::default()
//!     .with_items_per_page(25)
//!     .with_load_more_delay(Duration::from_millis(300))
//!     .with_root_margin(RootMargin::px(200.0));
//! assert!(config.validate().is_ok());
//! ```
//!
//! or loaded from TOML, where every key is optional:
//!
//! ```toml
//! items_per_page = 25
//! load_more_delay_ms = 300
//! root_margin = "200px 0"
//! threshold = 0.25
//! ```

use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, RevealError};
use crate::margin::RootMargin;
use crate::observer::ObserverOptions;
use crate::targets;

/// Default page size and initial display count.
pub const DEFAULT_ITEMS_PER_PAGE: usize = 20;
/// Default simulated fetch latency.
pub const DEFAULT_LOAD_MORE_DELAY: Duration = Duration::from_millis(500);
/// Default minimum visible fraction of the sentinel.
pub const DEFAULT_THRESHOLD: f32 = 0.1;

/// Settings for a [`RevealController`](crate::RevealController).
///
/// `items_per_page` must be positive. A zero page size is accepted but
/// degenerate: nothing is ever revealed and `has_more` never turns false.
/// Use [`validate`](Self::validate) to check the contract up front.
#[derive(Debug, Clone, PartialEq)]
pub struct RevealConfig {
    /// Page-size increment and initial display count.
    pub items_per_page: usize,
    /// Artificial latency before each increment is applied.
    pub load_more_delay: Duration,
    /// Pre-trigger margin around the viewport.
    pub root_margin: RootMargin,
    /// Minimum visible fraction of the sentinel, in `0.0..=1.0`.
    pub threshold: f32,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            items_per_page: DEFAULT_ITEMS_PER_PAGE,
            load_more_delay: DEFAULT_LOAD_MORE_DELAY,
            root_margin: RootMargin::default(),
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// On-disk shape of [`RevealConfig`].
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RevealConfigFile {
    items_per_page: Option<usize>,
    load_more_delay_ms: Option<u64>,
    root_margin: Option<RootMargin>,
    threshold: Option<f32>,
}

impl RevealConfig {
    /// Set the page size.
    pub fn with_items_per_page(mut self, items_per_page: usize) -> Self {
        self.items_per_page = items_per_page;
        self
    }

    /// Set the simulated fetch latency.
    pub fn with_load_more_delay(mut self, delay: Duration) -> Self {
        self.load_more_delay = delay;
        self
    }

    /// Set the root margin.
    pub fn with_root_margin(mut self, root_margin: RootMargin) -> Self {
        self.root_margin = root_margin;
        self
    }

    /// Set the visibility threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// The observer options derived from this configuration.
    pub fn observer_options(&self) -> ObserverOptions {
        ObserverOptions::new(self.root_margin, self.threshold)
    }

    /// Check the caller contract.
    pub fn validate(&self) -> Result<()> {
        if self.items_per_page == 0 {
            return Err(RevealError::invalid_config(
                "items_per_page",
                "must be a positive integer",
            ));
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(RevealError::invalid_config(
                "threshold",
                format!("{} is outside 0.0..=1.0", self.threshold),
            ));
        }
        Ok(())
    }

    /// Parse and validate a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let file: RevealConfigFile = toml::from_str(source)?;
        let defaults = Self::default();

        let config = Self {
            items_per_page: file.items_per_page.unwrap_or(defaults.items_per_page),
            load_more_delay: file
                .load_more_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.load_more_delay),
            root_margin: file.root_margin.unwrap_or(defaults.root_margin),
            threshold: file.threshold.unwrap_or(defaults.threshold),
        };
        config.validate()?;

        tracing::debug!(
            target: targets::CONFIG,
            items_per_page = config.items_per_page,
            load_more_delay_ms = config.load_more_delay.as_millis() as u64,
            root_margin = %config.root_margin,
            threshold = config.threshold,
            "loaded reveal configuration"
        );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::margin::MarginLength;

    #[test]
    fn test_defaults() {
        let config = RevealConfig::default();
        assert_eq!(config.items_per_page, 20);
        assert_eq!(config.load_more_delay, Duration::from_millis(500));
        assert_eq!(config.root_margin, RootMargin::px(100.0));
        assert_eq!(config.threshold, 0.1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = RevealConfig::default()
            .with_items_per_page(5)
            .with_load_more_delay(Duration::ZERO)
            .with_root_margin(RootMargin::ZERO)
            .with_threshold(1.0);
        assert_eq!(config.items_per_page, 5);
        assert_eq!(config.load_more_delay, Duration::ZERO);
        assert_eq!(config.observer_options().threshold, 1.0);
    }

    #[test]
    fn test_validate_rejects_contract_violations() {
        let zero_page = RevealConfig::default().with_items_per_page(0);
        assert!(matches!(
            zero_page.validate(),
            Err(RevealError::InvalidConfig { field: "items_per_page", .. })
        ));

        let bad_threshold = RevealConfig::default().with_threshold(1.5);
        assert!(matches!(
            bad_threshold.validate(),
            Err(RevealError::InvalidConfig { field: "threshold", .. })
        ));
    }

    #[test]
    fn test_from_toml_partial() {
        let config = RevealConfig::from_toml_str(
            r#"
            items_per_page = 25
            root_margin = "200px 5%"
            "#,
        )
        .unwrap();
        assert_eq!(config.items_per_page, 25);
        assert_eq!(config.load_more_delay, DEFAULT_LOAD_MORE_DELAY);
        assert_eq!(config.root_margin.right, MarginLength::Percent(5.0));
        assert_eq!(config.threshold, DEFAULT_THRESHOLD);
    }

    #[test]
    fn test_from_toml_empty_is_default() {
        assert_eq!(RevealConfig::from_toml_str("").unwrap(), RevealConfig::default());
    }

    #[test]
    fn test_from_toml_errors() {
        assert!(matches!(
            RevealConfig::from_toml_str("items_per_page = 0"),
            Err(RevealError::InvalidConfig { .. })
        ));
        assert!(matches!(
            RevealConfig::from_toml_str("root_margin = \"10em\""),
            Err(RevealError::ConfigParse { .. })
        ));
        assert!(matches!(
            RevealConfig::from_toml_str("page_size = 10"),
            Err(RevealError::ConfigParse { .. })
        ));
        assert!(matches!(
            RevealConfig::from_toml_str("load_more_delay_ms = -1"),
            Err(RevealError::ConfigParse { .. })
        ));
    }
}
