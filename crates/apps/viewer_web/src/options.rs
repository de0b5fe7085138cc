//! Embedding options passed from the page as JSON.

use bridge::ModalSettings;
use formats::{LazyLoading, StationMapping};
use interaction::PointerSettings;
use serde::Deserialize;
use streaming::{FetchPlan, RetrySettings};
use thiserror::Error;

use activation::TriggerConfig;

#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("invalid embed options: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("embed options need a modelUrl")]
    MissingModelUrl,
}

/// Attribute names used to find things in the host page.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct DomAttributes {
    /// Marks an element as the trigger for the dialog named by its value.
    pub dialog_trigger: String,
    /// Marks a dialog root; the value is the dialog id.
    pub dialog_root: String,
    pub deferred_source: String,
    /// Optional per-element override of the live attribute name.
    pub deferred_target: String,
    /// `window[name](dialogId)` is tried after the trigger events.
    pub global_opener: String,
}

impl Default for DomAttributes {
    fn default() -> Self {
        Self {
            dialog_trigger: "data-dialog-trigger".to_string(),
            dialog_root: "data-dialog-id".to_string(),
            deferred_source: "data-deferred-src".to_string(),
            deferred_target: "data-deferred-attr".to_string(),
            global_opener: "openDialog".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct EmbedOptions {
    /// CSS selector of the element the scene is mounted into.
    pub container: String,
    pub model_url: String,
    pub model_fallback_url: Option<String>,
    pub config_url: Option<String>,
    pub config_fallback_url: Option<String>,
    pub stations: StationMapping,
    pub retry: RetrySettings,
    pub lazy_loading: LazyLoading,
    pub viewport_margin_px: f64,
    /// Only an explicit `triggerLoad()` call starts loading.
    pub manual_only: bool,
    pub pointer: PointerSettings,
    pub modal: ModalSettings,
    pub dom: DomAttributes,
    pub log_level: String,
}

impl Default for EmbedOptions {
    fn default() -> Self {
        Self {
            container: "#scene-embed".to_string(),
            model_url: String::new(),
            model_fallback_url: None,
            config_url: None,
            config_fallback_url: None,
            stations: StationMapping::default(),
            retry: RetrySettings::default(),
            lazy_loading: LazyLoading::default(),
            viewport_margin_px: activation::DEFAULT_VIEWPORT_MARGIN_PX,
            manual_only: false,
            pointer: PointerSettings::default(),
            modal: ModalSettings::default(),
            dom: DomAttributes::default(),
            log_level: "info".to_string(),
        }
    }
}

impl EmbedOptions {
    pub fn from_json(text: &str) -> Result<Self, OptionsError> {
        let options: EmbedOptions = serde_json::from_str(text)?;
        if options.model_url.trim().is_empty() {
            return Err(OptionsError::MissingModelUrl);
        }
        Ok(options)
    }

    pub fn model_plan(&self) -> FetchPlan {
        let plan = FetchPlan::new(self.model_url.clone()).with_retries(self.retry);
        match &self.model_fallback_url {
            Some(url) => plan.with_fallback(url.clone()),
            None => plan,
        }
    }

    pub fn config_plan(&self) -> Option<FetchPlan> {
        let primary = self.config_url.as_ref()?;
        let plan = FetchPlan::new(primary.clone()).with_retries(self.retry);
        Some(match &self.config_fallback_url {
            Some(url) => plan.with_fallback(url.clone()),
            None => plan,
        })
    }

    pub fn trigger_config(&self) -> TriggerConfig {
        if self.manual_only {
            return TriggerConfig::manual();
        }
        TriggerConfig::from(&self.lazy_loading).with_viewport_margin(self.viewport_margin_px)
    }

    pub fn log_level(&self) -> log::Level {
        match self.log_level.to_ascii_lowercase().as_str() {
            "error" => log::Level::Error,
            "warn" => log::Level::Warn,
            "debug" => log::Level::Debug,
            "trace" => log::Level::Trace,
            _ => log::Level::Info,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{EmbedOptions, OptionsError};
    use pretty_assertions::assert_eq;

    #[test]
    fn minimal_options_use_defaults() {
        let o = EmbedOptions::from_json(r#"{"modelUrl": "/models/plant.glb"}"#).expect("options");
        assert_eq!(o.container, "#scene-embed");
        assert_eq!(o.model_plan().candidates(), &["/models/plant.glb".to_string()]);
        assert_eq!(o.model_plan().max_retries(), 3);
        assert!(o.config_plan().is_none());
        assert_eq!(o.modal.debounce_ms, 400.0);
        assert_eq!(o.log_level(), log::Level::Info);

        let t = o.trigger_config();
        assert!(t.viewport_enabled && t.interaction_enabled && t.delay_enabled);
        assert_eq!(t.viewport_margin_px, 200.0);
    }

    #[test]
    fn full_options_build_both_plans() {
        let o = EmbedOptions::from_json(
            r#"{
                "container": "[data-scene]",
                "modelUrl": "/models/plant.glb",
                "modelFallbackUrl": "https://cdn.example.net/plant.glb",
                "configUrl": "/models/scene-config.json",
                "stations": {"pump": "dlg-pump", "tank": "dlg-tank"},
                "retry": {"maxRetries": 2, "baseDelayMs": 500},
                "lazyLoading": {"enabled": false},
                "logLevel": "DEBUG"
            }"#,
        )
        .expect("options");

        assert_eq!(o.model_plan().candidates().len(), 2);
        assert_eq!(o.model_plan().max_attempts(), 4);
        assert_eq!(
            o.config_plan().expect("config plan").candidates(),
            &["/models/scene-config.json".to_string()]
        );
        assert_eq!(o.stations.dialog_for("tank"), Some("dlg-tank"));
        assert!(o.trigger_config().immediate);
        assert_eq!(o.log_level(), log::Level::Debug);
    }

    #[test]
    fn manual_only_overrides_lazy_loading() {
        let o = EmbedOptions::from_json(r#"{"modelUrl": "m.glb", "manualOnly": true}"#).expect("o");
        assert!(!o.trigger_config().activates_on_its_own());
    }

    #[test]
    fn model_url_is_required() {
        assert!(matches!(
            EmbedOptions::from_json(r##"{"container": "#x"}"##),
            Err(OptionsError::MissingModelUrl)
        ));
        assert!(matches!(
            EmbedOptions::from_json("not json"),
            Err(OptionsError::Parse(_))
        ));
    }
}
