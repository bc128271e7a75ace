//! Viewer configuration
//!
//! Raster limits, debounce windows, tooltip timing and consolidation
//! constants. Configuration can be loaded from a TOML file, environment
//! variables, or created programmatically.

use std::fs;
use std::path::Path;
use std::time::Duration;

use pdf_viewer_geometry::{ConsolidationConfig, ScriptHeuristic};
use pdf_viewer_render::{RasterLimits, DETAIL_SCALE_FACTOR, MAX_SURFACE_DIMENSION, MAX_SURFACE_PIXELS};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid value for a configuration parameter
    #[error("invalid value for configuration key: {0}")]
    InvalidValue(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Configuration of one viewer instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Maximum pixels of a single raster surface
    pub max_canvas_pixels: u64,
    /// Maximum width or height of a single raster surface
    pub max_canvas_dimension: u32,
    /// Detail surface scale relative to the requested base scale
    pub detail_scale_factor: f64,
    pub zoom_debounce_ms: u64,
    pub scroll_debounce_ms: u64,
    pub tooltip_close_delay_ms: u64,
    /// Vertical gap between pages, in client pixels
    pub page_gap: f64,
    pub merge_threshold: f64,
    pub line_tolerance: f64,
    pub underline_thickness: f64,
    pub underline_baseline_ratio: f64,
    /// Underline runs also bridge gaps up to this fraction of the run height
    pub gap_height_ratio: f64,
    pub min_fragment_size: f64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        let consolidation = ConsolidationConfig::default();
        Self {
            max_canvas_pixels: MAX_SURFACE_PIXELS,
            max_canvas_dimension: MAX_SURFACE_DIMENSION,
            detail_scale_factor: DETAIL_SCALE_FACTOR,
            zoom_debounce_ms: 150,
            scroll_debounce_ms: 20,
            tooltip_close_delay_ms: 100,
            page_gap: 10.0,
            merge_threshold: consolidation.merge_threshold,
            line_tolerance: consolidation.line_tolerance,
            underline_thickness: consolidation.underline_thickness,
            underline_baseline_ratio: consolidation.baseline_ratio,
            gap_height_ratio: consolidation.gap_height_ratio,
            min_fragment_size: consolidation.min_fragment_size,
        }
    }
}

impl ViewerConfig {
    /// Sets the raster surface limits.
    pub fn with_raster_limits(mut self, max_pixels: u64, max_dimension: u32) -> Self {
        self.max_canvas_pixels = max_pixels;
        self.max_canvas_dimension = max_dimension;
        self
    }

    pub fn with_detail_scale_factor(mut self, factor: f64) -> Self {
        self.detail_scale_factor = factor;
        self
    }

    /// Sets the zoom and scroll debounce windows in milliseconds.
    pub fn with_debounce_ms(mut self, zoom_ms: u64, scroll_ms: u64) -> Self {
        self.zoom_debounce_ms = zoom_ms;
        self.scroll_debounce_ms = scroll_ms;
        self
    }

    pub fn with_tooltip_close_delay_ms(mut self, ms: u64) -> Self {
        self.tooltip_close_delay_ms = ms;
        self
    }

    pub fn with_page_gap(mut self, gap: f64) -> Self {
        self.page_gap = gap;
        self
    }

    pub fn with_merge_threshold(mut self, threshold: f64) -> Self {
        self.merge_threshold = threshold;
        self
    }

    pub fn raster_limits(&self) -> RasterLimits {
        RasterLimits::new(self.max_canvas_pixels, self.max_canvas_dimension)
    }

    pub fn consolidation(&self) -> ConsolidationConfig {
        ConsolidationConfig {
            merge_threshold: self.merge_threshold,
            line_tolerance: self.line_tolerance,
            underline_thickness: self.underline_thickness,
            gap_height_ratio: self.gap_height_ratio,
            baseline_ratio: self.underline_baseline_ratio,
            min_fragment_size: self.min_fragment_size,
        }
    }

    pub fn script_heuristic(&self) -> ScriptHeuristic {
        ScriptHeuristic::default()
    }

    pub fn zoom_debounce(&self) -> Duration {
        Duration::from_millis(self.zoom_debounce_ms)
    }

    pub fn scroll_debounce(&self) -> Duration {
        Duration::from_millis(self.scroll_debounce_ms)
    }

    pub fn tooltip_close_delay(&self) -> Duration {
        Duration::from_millis(self.tooltip_close_delay_ms)
    }

    /// Checks that every value is usable.
    ///
    /// # Errors
    /// Returns the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = |key: &str, value: f64| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(ConfigError::InvalidValue(key.to_string()))
            }
        };
        let non_negative = |key: &str, value: f64| {
            if value.is_finite() && value >= 0.0 {
                Ok(())
            } else {
                Err(ConfigError::InvalidValue(key.to_string()))
            }
        };

        if self.max_canvas_pixels == 0 {
            return Err(ConfigError::InvalidValue("max_canvas_pixels".to_string()));
        }
        if self.max_canvas_dimension == 0 {
            return Err(ConfigError::InvalidValue("max_canvas_dimension".to_string()));
        }
        positive("detail_scale_factor", self.detail_scale_factor)?;
        non_negative("page_gap", self.page_gap)?;
        non_negative("merge_threshold", self.merge_threshold)?;
        non_negative("line_tolerance", self.line_tolerance)?;
        positive("underline_thickness", self.underline_thickness)?;
        positive("underline_baseline_ratio", self.underline_baseline_ratio)?;
        non_negative("gap_height_ratio", self.gap_height_ratio)?;
        non_negative("min_fragment_size", self.min_fragment_size)
    }

    /// Loads configuration from environment variables.
    ///
    /// Environment variables:
    /// - `PDF_VIEWER_MAX_CANVAS_PIXELS`
    /// - `PDF_VIEWER_MAX_CANVAS_DIMENSION`
    /// - `PDF_VIEWER_DETAIL_SCALE`
    /// - `PDF_VIEWER_ZOOM_DEBOUNCE_MS`
    /// - `PDF_VIEWER_SCROLL_DEBOUNCE_MS`
    /// - `PDF_VIEWER_TOOLTIP_CLOSE_MS`
    /// - `PDF_VIEWER_MERGE_THRESHOLD`
    ///
    /// # Errors
    /// Returns an error if any environment variable contains an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = env_value("PDF_VIEWER_MAX_CANVAS_PIXELS")? {
            config.max_canvas_pixels = value;
        }
        if let Some(value) = env_value("PDF_VIEWER_MAX_CANVAS_DIMENSION")? {
            config.max_canvas_dimension = value;
        }
        if let Some(value) = env_value("PDF_VIEWER_DETAIL_SCALE")? {
            config.detail_scale_factor = value;
        }
        if let Some(value) = env_value("PDF_VIEWER_ZOOM_DEBOUNCE_MS")? {
            config.zoom_debounce_ms = value;
        }
        if let Some(value) = env_value("PDF_VIEWER_SCROLL_DEBOUNCE_MS")? {
            config.scroll_debounce_ms = value;
        }
        if let Some(value) = env_value("PDF_VIEWER_TOOLTIP_CLOSE_MS")? {
            config.tooltip_close_delay_ms = value;
        }
        if let Some(value) = env_value("PDF_VIEWER_MERGE_THRESHOLD")? {
            config.merge_threshold = value;
        }

        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a TOML file. Missing keys keep their defaults.
    ///
    /// ```toml
    /// max_canvas_pixels = 16777216
    /// zoom_debounce_ms = 150
    /// merge_threshold = 2.0
    /// ```
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves configuration to a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path.as_ref(), contents)?;
        Ok(())
    }
}

fn env_value<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    const ENV_KEYS: [&str; 7] = [
        "PDF_VIEWER_MAX_CANVAS_PIXELS",
        "PDF_VIEWER_MAX_CANVAS_DIMENSION",
        "PDF_VIEWER_DETAIL_SCALE",
        "PDF_VIEWER_ZOOM_DEBOUNCE_MS",
        "PDF_VIEWER_SCROLL_DEBOUNCE_MS",
        "PDF_VIEWER_TOOLTIP_CLOSE_MS",
        "PDF_VIEWER_MERGE_THRESHOLD",
    ];

    #[test]
    fn test_default_config() {
        let config = ViewerConfig::default();
        assert_eq!(config.max_canvas_pixels, 16_777_216);
        assert_eq!(config.max_canvas_dimension, 32_767);
        assert_eq!(config.detail_scale_factor, 1.3);
        assert_eq!(config.zoom_debounce(), Duration::from_millis(150));
        assert_eq!(config.scroll_debounce(), Duration::from_millis(20));
        assert_eq!(config.tooltip_close_delay(), Duration::from_millis(100));
        assert_eq!(config.consolidation(), ConsolidationConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_methods() {
        let config = ViewerConfig::default()
            .with_raster_limits(4_000_000, 4096)
            .with_detail_scale_factor(1.5)
            .with_debounce_ms(300, 40)
            .with_tooltip_close_delay_ms(250)
            .with_page_gap(0.0)
            .with_merge_threshold(3.0);

        assert_eq!(config.raster_limits(), RasterLimits::new(4_000_000, 4096));
        assert_eq!(config.detail_scale_factor, 1.5);
        assert_eq!(config.zoom_debounce_ms, 300);
        assert_eq!(config.scroll_debounce_ms, 40);
        assert_eq!(config.tooltip_close_delay_ms, 250);
        assert_eq!(config.page_gap, 0.0);
        assert_eq!(config.consolidation().merge_threshold, 3.0);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = ViewerConfig::default().with_detail_scale_factor(0.0);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(key)) if key == "detail_scale_factor"));

        let config = ViewerConfig::default().with_raster_limits(0, 10);
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_from_env() {
        let _guard = EnvGuard::new(&ENV_KEYS);
        for key in ENV_KEYS {
            env::remove_var(key);
        }

        env::set_var("PDF_VIEWER_MAX_CANVAS_PIXELS", "1000000");
        env::set_var("PDF_VIEWER_ZOOM_DEBOUNCE_MS", "75");
        env::set_var("PDF_VIEWER_MERGE_THRESHOLD", "4.5");

        let config = ViewerConfig::from_env().unwrap();
        assert_eq!(config.max_canvas_pixels, 1_000_000);
        assert_eq!(config.zoom_debounce_ms, 75);
        assert_eq!(config.merge_threshold, 4.5);
        assert_eq!(config.scroll_debounce_ms, 20); // default
    }

    #[test]
    #[serial]
    fn test_from_env_invalid() {
        let _guard = EnvGuard::new(&["PDF_VIEWER_SCROLL_DEBOUNCE_MS"]);

        env::set_var("PDF_VIEWER_SCROLL_DEBOUNCE_MS", "soon");
        let result = ViewerConfig::from_env();
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    // Helper to save and restore environment variables
    struct EnvGuard {
        vars: Vec<(String, Option<String>)>,
    }

    impl EnvGuard {
        fn new(var_names: &[&str]) -> Self {
            let vars = var_names
                .iter()
                .map(|name| (name.to_string(), env::var(name).ok()))
                .collect();
            Self { vars }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (name, value) in &self.vars {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }

    #[test]
    fn test_from_toml_keeps_defaults_for_missing_keys() {
        let config = ViewerConfig::from_toml(
            r#"
            max_canvas_dimension = 8192
            tooltip_close_delay_ms = 200
            "#,
        )
        .unwrap();

        assert_eq!(config.max_canvas_dimension, 8192);
        assert_eq!(config.tooltip_close_delay_ms, 200);
        assert_eq!(config.max_canvas_pixels, 16_777_216);
    }

    #[test]
    fn test_every_consolidation_constant_is_configurable() {
        let config = ViewerConfig::from_toml(
            r#"
            gap_height_ratio = 0.5
            line_tolerance = 4.0
            "#,
        )
        .unwrap();

        let consolidation = config.consolidation();
        assert_eq!(consolidation.gap_height_ratio, 0.5);
        assert_eq!(consolidation.line_tolerance, 4.0);
        assert_eq!(consolidation.baseline_ratio, ConsolidationConfig::default().baseline_ratio);

        assert!(ViewerConfig::from_toml("gap_height_ratio = -0.1").is_err());
    }

    #[test]
    fn test_from_toml_invalid() {
        assert!(matches!(ViewerConfig::from_toml("zoom_debounce_ms = \"x\""), Err(ConfigError::Parse(_))));
        assert!(ViewerConfig::from_toml("page_gap = -1.0").is_err());
    }

    #[test]
    fn test_file_roundtrip() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("viewer.toml");
        let config = ViewerConfig::default().with_debounce_ms(200, 30).with_merge_threshold(2.5);

        config.save_to_file(&path).unwrap();
        let loaded = ViewerConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_from_file_missing() {
        let result = ViewerConfig::from_file("/nonexistent/viewer.toml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
