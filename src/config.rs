use crate::types::{BoundingBox, Canvas};
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub map: MapConfig,
    pub input: InputConfig,
    pub animation: AnimationConfig,
    pub output: OutputConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MapConfig {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lng_min: f64,
    pub lng_max: f64,
    pub width: f64,
    pub height: f64,
    pub grid_rows: usize,
    pub grid_cols: usize,
}

// Bounding box slightly padded around Cambridgeshire
impl Default for MapConfig {
    fn default() -> Self {
        Self {
            lat_min: 51.95,
            lat_max: 52.60,
            lng_min: -0.30,
            lng_max: 0.52,
            width: 640.0,
            height: 420.0,
            grid_rows: 34,
            grid_cols: 52,
        }
    }
}

impl MapConfig {
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::new(self.lat_min, self.lat_max, self.lng_min, self.lng_max)
    }

    pub fn canvas(&self) -> Canvas {
        Canvas::new(self.width, self.height)
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct InputConfig {
    /// CSV or GeoJSON file replacing the built-in town list.
    pub points: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AnimationConfig {
    pub seed: u64,
    /// Upper bound (seconds) for the per-marker pulse start offset.
    pub max_pulse_delay: f64,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            seed: 7,
            max_pulse_delay: 1.5,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub svg: String,
    pub geojson: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
            svg: "service_area.svg".to_string(),
            geojson: "service_area.geojson".to_string(),
        }
    }
}

impl OutputConfig {
    pub fn svg_path(&self) -> PathBuf {
        self.dir.join(&self.svg)
    }

    pub fn geojson_path(&self) -> PathBuf {
        self.dir.join(&self.geojson)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 3000 }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` if it exists, otherwise the built-in Cambridgeshire map.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            tracing::warn!("Config file {:?} not found, using built-in map", path);
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        let map = &self.map;
        let finite = [
            map.lat_min,
            map.lat_max,
            map.lng_min,
            map.lng_max,
            map.width,
            map.height,
        ];
        if finite.iter().any(|v| !v.is_finite()) {
            return Err(anyhow!("Map bounds and canvas size must be finite numbers"));
        }
        if map.lat_min >= map.lat_max {
            return Err(anyhow!(
                "lat_min ({}) must be below lat_max ({})",
                map.lat_min,
                map.lat_max
            ));
        }
        if map.lng_min >= map.lng_max {
            return Err(anyhow!(
                "lng_min ({}) must be below lng_max ({})",
                map.lng_min,
                map.lng_max
            ));
        }
        if map.width <= 0.0 || map.height <= 0.0 {
            return Err(anyhow!(
                "Canvas must have a positive size, got {}x{}",
                map.width,
                map.height
            ));
        }
        if map.grid_rows < 2 || map.grid_cols < 2 {
            return Err(anyhow!(
                "Background grid needs at least 2 rows and 2 columns, got {}x{}",
                map.grid_rows,
                map.grid_cols
            ));
        }
        let max_delay = self.animation.max_pulse_delay;
        if !max_delay.is_finite() || max_delay < 0.0 {
            return Err(anyhow!("max_pulse_delay must be a finite, non-negative number of seconds"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_describe_cambridgeshire() {
        let config = AppConfig::default();
        assert_eq!(config.map.width, 640.0);
        assert_eq!(config.map.height, 420.0);
        assert_eq!((config.map.grid_rows, config.map.grid_cols), (34, 52));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = 8081").unwrap();

        let config = AppConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.server.port, 8081);
        assert_eq!(config.map.lat_max, 52.60);
        assert_eq!(config.output.svg, "service_area.svg");
    }

    #[test]
    fn degenerate_box_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[map]\nlat_min = 52.0\nlat_max = 52.0").unwrap();

        let err = AppConfig::load_from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("lat_min"));
    }

    #[test]
    fn infinite_pulse_delay_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[animation]\nmax_pulse_delay = inf").unwrap();

        let err = AppConfig::load_from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("max_pulse_delay"));
    }

    #[test]
    fn nan_pulse_delay_is_rejected() {
        let mut config = AppConfig::default();
        config.animation.max_pulse_delay = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn tiny_grid_is_rejected() {
        let mut config = AppConfig::default();
        config.map.grid_cols = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.server.port, 3000);
    }
}
