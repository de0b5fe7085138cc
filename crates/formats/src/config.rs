//! Scene configuration document.
//!
//! The document is exported by external authoring tooling, so it is read
//! leniently: a missing section or field keeps its documented default, and a
//! field with the wrong type or an out-of-range value is replaced by its
//! default and reported as a warning. Only a document that is not JSON (or
//! not a JSON object) is rejected, and callers fall back to
//! [`SceneConfig::default`] in that case too.

use std::collections::BTreeMap;
use std::f64::consts::PI;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct SceneConfig {
    pub camera: CameraConfig,
    pub controls: ControlsConfig,
    pub lighting: BTreeMap<String, LightConfig>,
    pub animations: AnimationsConfig,
    pub performance: PerformanceConfig,
    pub lazy_loading: LazyLoading,
}

impl Default for SceneConfig {
    fn default() -> Self {
        let mut lighting = BTreeMap::new();
        lighting.insert(
            "ambient".to_string(),
            LightConfig {
                intensity: 0.6,
                ..LightConfig::default()
            },
        );
        lighting.insert(
            "directional".to_string(),
            LightConfig {
                position: Some([5.0, 10.0, 7.5]),
                ..LightConfig::default()
            },
        );
        Self {
            camera: CameraConfig::default(),
            controls: ControlsConfig::default(),
            lighting,
            animations: AnimationsConfig::default(),
            performance: PerformanceConfig::default(),
            lazy_loading: LazyLoading::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CameraConfig {
    pub position: [f64; 3],
    pub target: [f64; 3],
    /// Vertical field of view in degrees.
    pub fov: f64,
    pub min_distance: f64,
    pub max_distance: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [5.0, 3.0, 5.0],
            target: [0.0, 0.0, 0.0],
            fov: 45.0,
            min_distance: 2.0,
            max_distance: 20.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ControlsConfig {
    /// Radians.
    pub min_polar_angle: f64,
    /// Radians.
    pub max_polar_angle: f64,
    pub min_distance: f64,
    pub max_distance: f64,
    pub enable_zoom: bool,
    pub enable_rotate: bool,
    pub enable_pan: bool,
    pub damping_factor: f64,
    pub enable_damping: bool,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            min_polar_angle: 0.0,
            max_polar_angle: PI / 2.0,
            min_distance: 2.0,
            max_distance: 20.0,
            enable_zoom: true,
            enable_rotate: true,
            enable_pan: false,
            damping_factor: 0.05,
            enable_damping: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct LightConfig {
    pub enabled: bool,
    pub intensity: f64,
    pub color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<[f64; 3]>,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            intensity: 1.0,
            color: "#ffffff".to_string(),
            position: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct AnimationsConfig {
    pub welcome_animation: WelcomeAnimation,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct WelcomeAnimation {
    pub enabled: bool,
    /// Milliseconds.
    pub duration: u64,
    pub easing: String,
    pub start_position: [f64; 3],
    pub start_target: [f64; 3],
    pub end_position: [f64; 3],
    pub end_target: [f64; 3],
}

impl Default for WelcomeAnimation {
    fn default() -> Self {
        Self {
            enabled: false,
            duration: 2000,
            easing: "easeInOutCubic".to_string(),
            start_position: [10.0, 6.0, 10.0],
            start_target: [0.0, 0.0, 0.0],
            end_position: [5.0, 3.0, 5.0],
            end_target: [0.0, 0.0, 0.0],
        }
    }
}

#[derive(Debug, Default, Copy, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QualityLevel {
    Low,
    Medium,
    #[default]
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct PerformanceConfig {
    pub quality_level: QualityLevel,
    #[serde(rename = "targetFPS")]
    pub target_fps: u32,
    pub enable_antialiasing: bool,
    pub pixel_ratio: f64,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            quality_level: QualityLevel::High,
            target_fps: 60,
            enable_antialiasing: true,
            pixel_ratio: 2.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct LazyLoading {
    pub enabled: bool,
    pub triggers: LazyTriggers,
    /// Delay trigger, milliseconds.
    pub delay: u64,
}

impl Default for LazyLoading {
    fn default() -> Self {
        Self {
            enabled: true,
            triggers: LazyTriggers::default(),
            delay: 3000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct LazyTriggers {
    pub viewport: bool,
    pub user_interaction: bool,
    pub delay: bool,
}

impl Default for LazyTriggers {
    fn default() -> Self {
        Self {
            viewport: true,
            user_interaction: true,
            delay: true,
        }
    }
}

/// A parsed configuration plus every correction applied while reading it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigReport {
    pub config: SceneConfig,
    pub warnings: Vec<String>,
}

impl SceneConfig {
    /// Lenient parse; see the module docs for the fallback rules.
    pub fn parse_lenient(text: &str) -> Result<ConfigReport, ConfigError> {
        let value: Value = serde_json::from_str(text)?;
        let Value::Object(root) = value else {
            return Err(ConfigError::NotAnObject);
        };

        let mut warnings = Vec::new();
        let mut config = SceneConfig::default();

        if let Some(obj) = section(&root, "camera", &mut warnings) {
            let c = &mut config.camera;
            field(obj, "camera", "position", &mut c.position, &mut warnings);
            field(obj, "camera", "target", &mut c.target, &mut warnings);
            field(obj, "camera", "fov", &mut c.fov, &mut warnings);
            field(obj, "camera", "minDistance", &mut c.min_distance, &mut warnings);
            field(obj, "camera", "maxDistance", &mut c.max_distance, &mut warnings);
        }

        if let Some(obj) = section(&root, "controls", &mut warnings) {
            let c = &mut config.controls;
            field(obj, "controls", "minPolarAngle", &mut c.min_polar_angle, &mut warnings);
            field(obj, "controls", "maxPolarAngle", &mut c.max_polar_angle, &mut warnings);
            field(obj, "controls", "minDistance", &mut c.min_distance, &mut warnings);
            field(obj, "controls", "maxDistance", &mut c.max_distance, &mut warnings);
            field(obj, "controls", "enableZoom", &mut c.enable_zoom, &mut warnings);
            field(obj, "controls", "enableRotate", &mut c.enable_rotate, &mut warnings);
            field(obj, "controls", "enablePan", &mut c.enable_pan, &mut warnings);
            field(obj, "controls", "dampingFactor", &mut c.damping_factor, &mut warnings);
            field(obj, "controls", "enableDamping", &mut c.enable_damping, &mut warnings);
        }

        if let Some(obj) = section(&root, "lighting", &mut warnings) {
            for (name, entry) in obj {
                let Value::Object(entry) = entry else {
                    warnings.push(format!("lighting.{name}: expected an object; ignored"));
                    continue;
                };
                let light = config.lighting.entry(name.clone()).or_default();
                let path = format!("lighting.{name}");
                field(entry, &path, "enabled", &mut light.enabled, &mut warnings);
                field(entry, &path, "intensity", &mut light.intensity, &mut warnings);
                field(entry, &path, "color", &mut light.color, &mut warnings);
                field(entry, &path, "position", &mut light.position, &mut warnings);
            }
        }

        if let Some(obj) = section(&root, "animations", &mut warnings)
            && let Some(obj) = section(obj, "welcomeAnimation", &mut warnings)
        {
            let w = &mut config.animations.welcome_animation;
            let path = "animations.welcomeAnimation";
            field(obj, path, "enabled", &mut w.enabled, &mut warnings);
            field(obj, path, "duration", &mut w.duration, &mut warnings);
            field(obj, path, "easing", &mut w.easing, &mut warnings);
            field(obj, path, "startPosition", &mut w.start_position, &mut warnings);
            field(obj, path, "startTarget", &mut w.start_target, &mut warnings);
            field(obj, path, "endPosition", &mut w.end_position, &mut warnings);
            field(obj, path, "endTarget", &mut w.end_target, &mut warnings);
        }

        if let Some(obj) = section(&root, "performance", &mut warnings) {
            let p = &mut config.performance;
            field(obj, "performance", "qualityLevel", &mut p.quality_level, &mut warnings);
            field(obj, "performance", "targetFPS", &mut p.target_fps, &mut warnings);
            field(obj, "performance", "enableAntialiasing", &mut p.enable_antialiasing, &mut warnings);
            field(obj, "performance", "pixelRatio", &mut p.pixel_ratio, &mut warnings);
        }

        if let Some(obj) = section(&root, "lazyLoading", &mut warnings) {
            let l = &mut config.lazy_loading;
            field(obj, "lazyLoading", "enabled", &mut l.enabled, &mut warnings);
            field(obj, "lazyLoading", "delay", &mut l.delay, &mut warnings);
            if let Some(t) = section(obj, "triggers", &mut warnings) {
                let path = "lazyLoading.triggers";
                field(t, path, "viewport", &mut l.triggers.viewport, &mut warnings);
                field(t, path, "userInteraction", &mut l.triggers.user_interaction, &mut warnings);
                field(t, path, "delay", &mut l.triggers.delay, &mut warnings);
            }
        }

        config.sanitize(&mut warnings);
        for w in &warnings {
            log::warn!("scene config: {w}");
        }
        Ok(ConfigReport { config, warnings })
    }

    /// Replaces out-of-range values with their defaults.
    pub fn sanitize(&mut self, warnings: &mut Vec<String>) {
        let cam_default = CameraConfig::default();
        let cam = &mut self.camera;
        if !all_finite(&cam.position) {
            warnings.push("camera.position: non-finite; using default".to_string());
            cam.position = cam_default.position;
        }
        if !all_finite(&cam.target) {
            warnings.push("camera.target: non-finite; using default".to_string());
            cam.target = cam_default.target;
        }
        if !(cam.fov.is_finite() && cam.fov > 0.0 && cam.fov < 180.0) {
            warnings.push(format!("camera.fov: {} out of (0, 180); using default", cam.fov));
            cam.fov = cam_default.fov;
        }
        if !valid_range(cam.min_distance, cam.max_distance) {
            warnings.push("camera distance range invalid; using default".to_string());
            cam.min_distance = cam_default.min_distance;
            cam.max_distance = cam_default.max_distance;
        }

        let ctl_default = ControlsConfig::default();
        let ctl = &mut self.controls;
        let polar_ok = ctl.min_polar_angle.is_finite()
            && ctl.max_polar_angle.is_finite()
            && ctl.min_polar_angle >= 0.0
            && ctl.max_polar_angle <= PI
            && ctl.min_polar_angle <= ctl.max_polar_angle;
        if !polar_ok {
            warnings.push("controls polar angle range invalid; using default".to_string());
            ctl.min_polar_angle = ctl_default.min_polar_angle;
            ctl.max_polar_angle = ctl_default.max_polar_angle;
        }
        if !valid_range(ctl.min_distance, ctl.max_distance) {
            warnings.push("controls distance range invalid; using default".to_string());
            ctl.min_distance = ctl_default.min_distance;
            ctl.max_distance = ctl_default.max_distance;
        }
        if !(ctl.damping_factor.is_finite() && ctl.damping_factor > 0.0 && ctl.damping_factor <= 1.0)
        {
            warnings.push("controls.dampingFactor out of (0, 1]; using default".to_string());
            ctl.damping_factor = ctl_default.damping_factor;
        }

        for (name, light) in &mut self.lighting {
            if !(light.intensity.is_finite() && light.intensity >= 0.0) {
                warnings.push(format!("lighting.{name}.intensity invalid; using 1.0"));
                light.intensity = 1.0;
            }
            if light.position.is_some_and(|p| !all_finite(&p)) {
                warnings.push(format!("lighting.{name}.position non-finite; dropped"));
                light.position = None;
            }
        }

        let perf_default = PerformanceConfig::default();
        let perf = &mut self.performance;
        if !(1..=240).contains(&perf.target_fps) {
            warnings.push(format!("performance.targetFPS {} out of 1..=240; using default", perf.target_fps));
            perf.target_fps = perf_default.target_fps;
        }
        if !(perf.pixel_ratio.is_finite() && perf.pixel_ratio > 0.0) {
            warnings.push("performance.pixelRatio invalid; using default".to_string());
            perf.pixel_ratio = perf_default.pixel_ratio;
        }
        perf.pixel_ratio = perf.pixel_ratio.min(4.0);
    }
}

fn all_finite(v: &[f64; 3]) -> bool {
    v.iter().all(|c| c.is_finite())
}

fn valid_range(min: f64, max: f64) -> bool {
    min.is_finite() && max.is_finite() && min >= 0.0 && min <= max
}

fn section<'a>(
    parent: &'a Map<String, Value>,
    key: &str,
    warnings: &mut Vec<String>,
) -> Option<&'a Map<String, Value>> {
    match parent.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::Object(obj)) => Some(obj),
        Some(_) => {
            warnings.push(format!("{key}: expected an object; using defaults"));
            None
        }
    }
}

fn field<T: DeserializeOwned>(
    obj: &Map<String, Value>,
    path: &str,
    key: &str,
    slot: &mut T,
    warnings: &mut Vec<String>,
) {
    let Some(value) = obj.get(key) else {
        return;
    };
    match T::deserialize(value) {
        Ok(parsed) => *slot = parsed,
        Err(err) => warnings.push(format!("{path}.{key}: {err}; using default")),
    }
}
