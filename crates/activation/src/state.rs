use formats::LazyLoading;
use foundation::math::finite_or;
use serde::Serialize;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadState {
    Pending,
    Loading,
    Loaded,
    Error,
}

impl LoadState {
    pub fn as_str(self) -> &'static str {
        match self {
            LoadState::Pending => "pending",
            LoadState::Loading => "loading",
            LoadState::Loaded => "loaded",
            LoadState::Error => "error",
        }
    }

    /// The host should show a retry affordance in this state.
    pub fn shows_retry(self) -> bool {
        self == LoadState::Error
    }
}

/// Which trigger sources `start()` arms.
///
/// With every source disabled and `immediate` off, nothing ever activates
/// the scene on its own; only an explicit `trigger_load` call does.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TriggerConfig {
    pub viewport_enabled: bool,
    /// Distance outside the viewport at which the container already counts
    /// as visible.
    pub viewport_margin_px: f64,
    pub interaction_enabled: bool,
    pub delay_enabled: bool,
    pub delay_ms: u64,
    pub manual_only: bool,
    /// Activate as soon as `start()` runs.
    pub immediate: bool,
}

pub const DEFAULT_VIEWPORT_MARGIN_PX: f64 = 200.0;

impl Default for TriggerConfig {
    fn default() -> Self {
        Self::from(&LazyLoading::default())
    }
}

impl From<&LazyLoading> for TriggerConfig {
    fn from(lazy: &LazyLoading) -> Self {
        Self {
            viewport_enabled: lazy.enabled && lazy.triggers.viewport,
            viewport_margin_px: DEFAULT_VIEWPORT_MARGIN_PX,
            interaction_enabled: lazy.enabled && lazy.triggers.user_interaction,
            delay_enabled: lazy.enabled && lazy.triggers.delay,
            delay_ms: lazy.delay,
            manual_only: false,
            immediate: !lazy.enabled,
        }
    }
}

impl TriggerConfig {
    pub fn manual() -> Self {
        Self {
            viewport_enabled: false,
            interaction_enabled: false,
            delay_enabled: false,
            manual_only: true,
            immediate: false,
            ..Self::default()
        }
    }

    pub fn immediate() -> Self {
        Self {
            viewport_enabled: false,
            interaction_enabled: false,
            delay_enabled: false,
            manual_only: false,
            immediate: true,
            ..Self::default()
        }
    }

    pub fn with_viewport_margin(mut self, margin_px: f64) -> Self {
        self.viewport_margin_px = finite_or(margin_px, DEFAULT_VIEWPORT_MARGIN_PX).max(0.0);
        self
    }

    /// Whether anything other than a manual call can start loading.
    pub fn activates_on_its_own(&self) -> bool {
        !self.manual_only
            && (self.immediate || self.viewport_enabled || self.interaction_enabled || self.delay_enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::{LoadState, TriggerConfig};
    use formats::{LazyLoading, LazyTriggers};

    #[test]
    fn default_lazy_loading_arms_all_three_sources() {
        let t = TriggerConfig::default();
        assert!(t.viewport_enabled && t.interaction_enabled && t.delay_enabled);
        assert_eq!(t.delay_ms, 3000);
        assert_eq!(t.viewport_margin_px, 200.0);
        assert!(!t.immediate);
    }

    #[test]
    fn disabled_lazy_loading_means_immediate() {
        let lazy = LazyLoading {
            enabled: false,
            ..LazyLoading::default()
        };
        let t = TriggerConfig::from(&lazy);
        assert!(t.immediate);
        assert!(!t.viewport_enabled && !t.interaction_enabled && !t.delay_enabled);
        assert!(t.activates_on_its_own());
    }

    #[test]
    fn all_sources_off_never_activates_alone() {
        let lazy = LazyLoading {
            enabled: true,
            triggers: LazyTriggers {
                viewport: false,
                user_interaction: false,
                delay: false,
            },
            delay: 3000,
        };
        assert!(!TriggerConfig::from(&lazy).activates_on_its_own());
        assert!(!TriggerConfig::manual().activates_on_its_own());
    }

    #[test]
    fn only_error_offers_retry() {
        assert!(LoadState::Error.shows_retry());
        assert!(!LoadState::Loading.shows_retry());
        assert_eq!(LoadState::Loaded.as_str(), "loaded");
    }
}
