//! TOML settings file and flag/file/default resolution.
//!
//! Precedence is CLI flag, then settings file, then built-in default; the
//! resolved `PlasmaConfig` still passes through the renderer's own
//! sanitization at mount.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use renderer::{PlasmaConfig, DEFAULT_OPACITY, DEFAULT_SCALE, DEFAULT_SPEED};
use serde::Deserialize;

use crate::cli::RunArgs;

/// Default logical window size when neither flag nor file specifies one.
const DEFAULT_WINDOW_SIZE: (u32, u32) = (1280, 720);

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub appearance: Appearance,
    pub window: WindowSettings,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Appearance {
    pub speed: Option<f32>,
    pub scale: Option<f32>,
    pub opacity: Option<f32>,
    /// RRGGBB hex string.
    pub tint: Option<String>,
    pub interactive: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowSettings {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<f32>,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings at {}", path.display()))?;
        Self::from_toml_str(&raw)
            .with_context(|| format!("failed to parse settings at {}", path.display()))
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("invalid settings TOML")
    }
}

/// Fully resolved host options.
pub struct ResolvedOptions {
    pub config: PlasmaConfig,
    pub window_size: (u32, u32),
    pub target_fps: Option<f32>,
}

pub fn resolve(args: &RunArgs) -> Result<ResolvedOptions> {
    let settings = match &args.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };

    let tint = args
        .tint
        .clone()
        .or_else(|| settings.appearance.tint.clone())
        .map(|hex| parse_tint(&hex))
        .transpose()?;

    let fragment_override = match &args.fragment {
        Some(path) => Some(fs::read_to_string(path).with_context(|| {
            format!("failed to read fragment shader at {}", path.display())
        })?),
        None => None,
    };

    let config = PlasmaConfig {
        speed: args
            .speed
            .or(settings.appearance.speed)
            .unwrap_or(DEFAULT_SPEED),
        scale: args
            .scale
            .or(settings.appearance.scale)
            .unwrap_or(DEFAULT_SCALE),
        opacity: args
            .opacity
            .or(settings.appearance.opacity)
            .unwrap_or(DEFAULT_OPACITY),
        tint,
        interactive: args.interactive || settings.appearance.interactive.unwrap_or(false),
        fragment_override,
    };

    let window_size = match &args.size {
        Some(spec) => parse_size(spec)?,
        None => (
            settings.window.width.unwrap_or(DEFAULT_WINDOW_SIZE.0),
            settings.window.height.unwrap_or(DEFAULT_WINDOW_SIZE.1),
        ),
    };

    let target_fps = normalize_fps(args.fps.or(settings.window.fps));

    Ok(ResolvedOptions {
        config,
        window_size,
        target_fps,
    })
}

/// Parses an RRGGBB hex triple into unit-range RGB.
pub fn parse_tint(hex: &str) -> Result<[f32; 3]> {
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        bail!("tint must be a 6-digit hex color, got {hex:?}");
    }
    let channel = |range| {
        u8::from_str_radix(&hex[range], 16)
            .map(|byte| byte as f32 / 255.0)
            .context("invalid hex digits")
    };
    Ok([channel(0..2)?, channel(2..4)?, channel(4..6)?])
}

/// Parses a `WIDTHxHEIGHT` size spec.
pub fn parse_size(spec: &str) -> Result<(u32, u32)> {
    let (width, height) = spec
        .split_once(['x', 'X'])
        .with_context(|| format!("size must look like 1920x1080, got {spec:?}"))?;
    let width: u32 = width
        .trim()
        .parse()
        .with_context(|| format!("invalid width in size spec {spec:?}"))?;
    let height: u32 = height
        .trim()
        .parse()
        .with_context(|| format!("invalid height in size spec {spec:?}"))?;
    if width == 0 || height == 0 {
        bail!("size must be non-zero, got {spec:?}");
    }
    Ok((width, height))
}

fn normalize_fps(value: Option<f32>) -> Option<f32> {
    value.and_then(|fps| if fps > 0.0 { Some(fps) } else { None })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn bare_args() -> RunArgs {
        RunArgs {
            speed: None,
            scale: None,
            opacity: None,
            tint: None,
            interactive: false,
            size: None,
            fps: None,
            fragment: None,
            config: None,
        }
    }

    const SETTINGS: &str = r#"
[appearance]
speed = 1.8
tint = "9429f5"

[window]
width = 1920
height = 1080
fps = 30
"#;

    #[test]
    fn parses_settings_toml() {
        let settings = Settings::from_toml_str(SETTINGS).unwrap();
        assert_eq!(settings.appearance.speed, Some(1.8));
        assert_eq!(settings.window.width, Some(1920));
        assert_eq!(settings.window.fps, Some(30.0));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Settings::from_toml_str("[appearance]\nspedd = 2.0\n").is_err());
    }

    #[test]
    fn flags_override_file_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SETTINGS.as_bytes()).unwrap();

        let mut args = bare_args();
        args.config = Some(file.path().to_path_buf());
        args.speed = Some(0.5);

        let options = resolve(&args).unwrap();
        assert_eq!(options.config.speed, 0.5);
        assert_eq!(options.config.scale, DEFAULT_SCALE);
        assert_eq!(options.config.tint, Some(parse_tint("9429f5").unwrap()));
        assert_eq!(options.window_size, (1920, 1080));
        assert_eq!(options.target_fps, Some(30.0));
    }

    #[test]
    fn defaults_apply_without_file() {
        let options = resolve(&bare_args()).unwrap();
        assert_eq!(options.config.speed, DEFAULT_SPEED);
        assert_eq!(options.config.opacity, DEFAULT_OPACITY);
        assert_eq!(options.window_size, DEFAULT_WINDOW_SIZE);
        assert_eq!(options.target_fps, None);
    }

    #[test]
    fn tint_parses_hex_with_optional_hash() {
        assert_eq!(parse_tint("#ffffff").unwrap(), [1.0, 1.0, 1.0]);
        assert_eq!(parse_tint("000000").unwrap(), [0.0, 0.0, 0.0]);
        assert!(parse_tint("12345").is_err());
        assert!(parse_tint("zzzzzz").is_err());
    }

    #[test]
    fn size_spec_parses() {
        assert_eq!(parse_size("1920x1080").unwrap(), (1920, 1080));
        assert_eq!(parse_size("800X600").unwrap(), (800, 600));
        assert!(parse_size("1920").is_err());
        assert!(parse_size("0x600").is_err());
    }

    #[test]
    fn zero_fps_means_uncapped() {
        let mut args = bare_args();
        args.fps = Some(0.0);
        let options = resolve(&args).unwrap();
        assert_eq!(options.target_fps, None);
    }
}
