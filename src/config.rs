use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Construction-time parameters for a [`crate::Terminal`].
///
/// The core touches no filesystem or environment itself (see the crate's
/// Persistence note); `serde` derives are kept here only so an embedding
/// application can load these dimensions out of its own saved session file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalConfig {
    pub cols: u16,
    pub rows: u16,
    pub scrollback_capacity: usize,
    pub tab_width: u8,
    pub autowrap: bool,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            cols: 80,
            rows: 24,
            scrollback_capacity: 10_000,
            tab_width: 8,
            autowrap: true,
        }
    }
}

impl TerminalConfig {
    pub fn new(cols: u16, rows: u16) -> Self {
        Self {
            cols,
            rows,
            ..Self::default()
        }
    }

    pub fn with_scrollback_capacity(mut self, capacity: usize) -> Self {
        self.scrollback_capacity = capacity;
        self
    }

    pub fn with_tab_width(mut self, tab_width: u8) -> Self {
        self.tab_width = tab_width;
        self
    }

    pub fn with_autowrap(mut self, autowrap: bool) -> Self {
        self.autowrap = autowrap;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.cols == 0 || self.rows == 0 {
            return Err(ConfigError::InvalidDimensions {
                cols: self.cols,
                rows: self.rows,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(TerminalConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        let cfg = TerminalConfig::new(0, 24);
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::InvalidDimensions { cols: 0, rows: 24 })
        );
        let cfg = TerminalConfig::new(80, 0);
        assert!(cfg.validate().is_err());
    }
}
