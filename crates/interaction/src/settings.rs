use serde::{Deserialize, Serialize};

/// Thresholds for pointer and touch handling.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct PointerSettings {
    /// Minimum time between two hover raycasts.
    pub throttle_ms: f64,
    /// No raycasts once the pointer has been still for this long.
    pub idle_ms: f64,
    pub tap_max_move_px: f64,
    pub tap_max_duration_ms: f64,
    /// Fraction of the remaining glow distance covered per animation tick.
    pub glow_ease: f32,
}

impl Default for PointerSettings {
    fn default() -> Self {
        Self {
            throttle_ms: 50.0,
            idle_ms: 1500.0,
            tap_max_move_px: 10.0,
            tap_max_duration_ms: 500.0,
            glow_ease: 0.15,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::PointerSettings;

    #[test]
    fn partial_json_keeps_defaults() {
        let s: PointerSettings = serde_json::from_str(r#"{"throttleMs": 80}"#).expect("settings");
        assert_eq!(s.throttle_ms, 80.0);
        assert_eq!(s.idle_ms, 1500.0);
        assert_eq!(s.glow_ease, 0.15);
    }
}
