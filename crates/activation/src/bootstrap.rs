//! Config, renderer, model and hotspots, in that order.

use std::cell::RefCell;

use formats::{ConfigReport, SceneConfig, StationMapping};
use runtime::clock::Clock;
use runtime::sleep::Sleeper;
use scene::{HotspotBuild, HotspotIndex};
use streaming::{FetchPlan, ResourceFetcher, Transport};

use crate::error::ActivationError;
use crate::scene_runtime::SceneRuntime;

#[derive(Debug, Clone)]
pub struct BootstrapPlan {
    /// `None` runs with built-in defaults.
    pub config: Option<FetchPlan>,
    pub model: FetchPlan,
    pub stations: StationMapping,
}

#[derive(Debug)]
pub struct Bootstrapped {
    pub config: ConfigReport,
    pub model_url: String,
    pub model_from_fallback: bool,
    pub hotspots: HotspotBuild,
}

/// Fetches the configuration document. Never fails: exhaustion or an
/// unreadable document degrades to defaults with a warning.
pub async fn load_config<T, S, C>(fetcher: &ResourceFetcher<T, S, C>, plan: &FetchPlan) -> ConfigReport
where
    T: Transport,
    S: Sleeper,
    C: Clock,
{
    let fallback = |reason: String| {
        log::warn!("scene config unavailable ({reason}); using defaults");
        ConfigReport {
            config: SceneConfig::default(),
            warnings: vec![reason],
        }
    };
    let artifact = match fetcher.resolve(plan, None).await {
        Ok(a) => a,
        Err(err) => return fallback(err.to_string()),
    };
    let text = match artifact.text() {
        Ok(t) => t,
        Err(err) => return fallback(format!("config is not utf-8: {err}")),
    };
    match SceneConfig::parse_lenient(text) {
        Ok(report) => report,
        Err(err) => fallback(err.to_string()),
    }
}

/// Runs the whole bootstrap for one session. The runtime is borrowed only
/// between awaits.
///
/// `is_current` is checked before the renderer starts, before the model is
/// handed to it and before the hotspot index is built. Once it reports
/// false nothing else touches the runtime and `Ok(None)` is returned.
pub async fn bootstrap<T, S, C, R>(
    fetcher: &ResourceFetcher<T, S, C>,
    runtime: &RefCell<R>,
    plan: &BootstrapPlan,
    is_current: &dyn Fn() -> bool,
    on_progress: &mut dyn FnMut(u8),
) -> Result<Option<Bootstrapped>, ActivationError>
where
    T: Transport,
    S: Sleeper,
    C: Clock,
    R: SceneRuntime,
{
    let config = match &plan.config {
        Some(config_plan) => load_config(fetcher, config_plan).await,
        None => ConfigReport {
            config: SceneConfig::default(),
            warnings: Vec::new(),
        },
    };

    if !is_current() {
        log::debug!("bootstrap abandoned before renderer start");
        return Ok(None);
    }
    runtime
        .borrow_mut()
        .initialize(&config.config)
        .map_err(ActivationError::RenderBootstrapFailure)?;

    let artifact = fetcher.resolve(&plan.model, Some(on_progress)).await?;
    if artifact.from_fallback() {
        log::warn!("model served from fallback {}", artifact.url);
    }

    if !is_current() {
        log::debug!("bootstrap abandoned after fetching {}", artifact.url);
        return Ok(None);
    }
    let model_url = artifact.url.clone();
    let model_from_fallback = artifact.from_fallback();
    let pending = runtime.borrow_mut().load_model(artifact.bytes, &model_url);
    pending
        .await
        .map_err(ActivationError::RenderBootstrapFailure)?;

    if !is_current() {
        log::debug!("bootstrap abandoned before indexing hotspots");
        return Ok(None);
    }
    let mut rt = runtime.borrow_mut();
    let scene = rt.scene_mut().ok_or_else(|| {
        ActivationError::RenderBootstrapFailure("model loaded without a scene graph".to_string())
    })?;
    let hotspots = HotspotIndex::build(scene, &plan.stations);

    Ok(Some(Bootstrapped {
        config,
        model_url,
        model_from_fallback,
        hotspots,
    }))
}
