//! Configuration for an `AlertDb` instance.

use std::time::Duration;

use herald_core::DEFAULT_SENSITIVITY;

/// Configuration for an [`AlertDb`](crate::AlertDb) instance.
///
/// Deserializable so the host server can carry it in its own config file.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct AlertDbConfig {
    /// Initial sensitivity (debounce) window. Repeated signals on one alert
    /// name inside this window collapse into one delivery.
    pub sensitivity: Duration,
    /// Whether a committed signal is also delivered to its own sender.
    pub deliver_to_sender: bool,
}

impl Default for AlertDbConfig {
    fn default() -> Self {
        Self {
            sensitivity: DEFAULT_SENSITIVITY,
            deliver_to_sender: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let cfg = AlertDbConfig::default();
        assert_eq!(cfg.sensitivity, DEFAULT_SENSITIVITY);
        assert!(cfg.deliver_to_sender);
    }
}
