use anyhow::{ensure, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    pub seed: Option<u64>,
    #[serde(default)]
    pub backend: BackendKind,
    pub data_path: PathBuf,
    /// Checkpoint path without extension; the recorder appends `.bin`.
    pub model_path: PathBuf,
    pub delete_prev_data: bool,
    pub queue_capacity: Option<usize>,
    pub generation: Generation,
    pub train: Train,
    pub check: Check,
    pub target: TargetConfig,
    pub screen: ScreenConfig,
}

#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    NdArray,
    Wgpu,
}

#[derive(Deserialize, Debug, Clone, Copy)]
pub struct Generation {
    pub enabled: bool,
    pub duration_secs: u64,
    pub visualize: bool,
    pub draw_line: bool,
}

#[derive(Deserialize, Debug, Clone, Copy)]
pub struct Train {
    pub enabled: bool,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub hidden_size: usize,
    pub plot_loss: bool,
}

#[derive(Deserialize, Debug, Clone, Copy)]
pub struct Check {
    pub enabled: bool,
}

#[derive(Deserialize, Debug, Clone, Copy)]
pub struct TargetConfig {
    pub min_w: u32,
    pub max_w: u32,
    pub min_h: u32,
    pub max_h: u32,
    pub min_speed_x: f64,
    pub max_speed_x: f64,
    pub min_speed_y: f64,
    pub max_speed_y: f64,
}

#[derive(Deserialize, Debug, Clone, Copy)]
pub struct ScreenConfig {
    pub width: u32,
    pub height: u32,
    pub fov_x: f64,
    pub fov_y: f64,
    pub mouse_dpi: u32,
    pub mouse_sensitivity: f64,
    pub random_resolution: RandomResolution,
    pub random_fov: RandomFov,
    pub random_dpi: RandomDpi,
    pub random_sensitivity: RandomSensitivity,
}

#[derive(Deserialize, Debug, Clone, Copy)]
pub struct RandomResolution {
    pub enabled: bool,
    pub min_width: u32,
    pub max_width: u32,
    pub min_height: u32,
    pub max_height: u32,
}

#[derive(Deserialize, Debug, Clone, Copy)]
pub struct RandomFov {
    pub enabled: bool,
    pub min_x: u32,
    pub max_x: u32,
    pub min_y: u32,
    pub max_y: u32,
}

#[derive(Deserialize, Debug, Clone, Copy)]
pub struct RandomDpi {
    pub enabled: bool,
    pub min: u32,
    pub max: u32,
}

#[derive(Deserialize, Debug, Clone, Copy)]
pub struct RandomSensitivity {
    pub enabled: bool,
    pub min: f64,
    pub max: f64,
}

pub const CONFIG_PATH: &str = "config.toml";

pub fn load_config_from_file(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    let config = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let out = parse_config(&config)?;
    log::debug!("Loaded config: {:#?}", out);
    Ok(out)
}

pub fn parse_config(text: &str) -> Result<Config> {
    let config: Config = toml::from_str(text).context("failed to deserialize config")?;
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Checks the preconditions the simulation and proxy math rely on.
    pub fn validate(&self) -> Result<()> {
        let s = &self.screen;
        ensure!(s.width > 0 && s.height > 0, "screen dimensions must be > 0");
        ensure!(s.mouse_dpi > 0, "mouse_dpi must be > 0");
        ensure!(s.mouse_sensitivity > 0.0, "mouse_sensitivity must be > 0");

        let r = &s.random_resolution;
        if r.enabled {
            ensure!(r.min_width > 0 && r.min_height > 0, "random resolution must be > 0");
            ensure!(r.min_width <= r.max_width, "random_resolution width range is empty");
            ensure!(r.min_height <= r.max_height, "random_resolution height range is empty");
        }
        let f = &s.random_fov;
        if f.enabled {
            ensure!(f.min_x <= f.max_x && f.min_y <= f.max_y, "random_fov range is empty");
        }
        let d = &s.random_dpi;
        if d.enabled {
            ensure!(d.min > 0 && d.min <= d.max, "random_dpi range must be non-empty and > 0");
        }
        let m = &s.random_sensitivity;
        if m.enabled {
            ensure!(
                m.min > 0.0 && m.min <= m.max,
                "random_sensitivity range must be non-empty and > 0"
            );
        }

        let t = &self.target;
        ensure!(t.min_w > 0 && t.min_h > 0, "target size must be > 0");
        ensure!(t.min_w <= t.max_w && t.min_h <= t.max_h, "target size range is empty");
        ensure!(
            t.min_speed_x <= t.max_speed_x && t.min_speed_y <= t.max_speed_y,
            "target speed range is empty"
        );

        ensure!(self.train.batch_size > 0, "batch_size must be > 0");
        ensure!(self.train.hidden_size > 0, "hidden_size must be > 0");
        Ok(())
    }

    /// File the checkpoint recorder actually writes.
    pub fn checkpoint_file(&self) -> PathBuf {
        self.model_path.with_extension("bin")
    }
}

/// The shipped `config.toml` with a fixed seed, for tests.
#[cfg(test)]
pub(crate) fn test_config() -> Config {
    let mut config = parse_config(include_str!("../config.toml")).unwrap();
    config.seed = Some(7);
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHIPPED: &str = include_str!("../config.toml");

    #[test]
    fn shipped_config_parses() {
        let config = parse_config(SHIPPED).unwrap();
        assert_eq!(config.backend, BackendKind::NdArray);
        assert_eq!(config.screen.width, 384);
        assert_eq!(config.screen.height, 216);
        assert_eq!(config.train.epochs, 20);
        assert_eq!(config.train.batch_size, 64);
        assert_eq!(config.generation.duration_secs, 180);
        assert!(config.seed.is_none());
        assert_eq!(config.checkpoint_file(), PathBuf::from("mouse_net.bin"));
    }

    #[test]
    fn rejects_empty_ranges() {
        let text = SHIPPED.replace("min_w = 5", "min_w = 600");
        let err = parse_config(&text).unwrap_err();
        assert!(err.to_string().contains("target size range"));
    }

    #[test]
    fn rejects_zero_sensitivity() {
        let text = SHIPPED.replace("mouse_sensitivity = 1.0", "mouse_sensitivity = 0.0");
        assert!(parse_config(&text).is_err());
    }

    #[test]
    fn disabled_ranges_are_not_checked() {
        let text = SHIPPED
            .replace("[screen.random_dpi]\nenabled = true", "[screen.random_dpi]\nenabled = false")
            .replace("min = 1000", "min = 3000");
        let config = parse_config(&text).unwrap();
        assert!(!config.screen.random_dpi.enabled);
    }

    #[test]
    fn wgpu_backend_is_selectable() {
        let text = SHIPPED.replace("backend = \"ndarray\"", "backend = \"wgpu\"");
        assert_eq!(parse_config(&text).unwrap().backend, BackendKind::Wgpu);
    }
}
