/// Default animation speed multiplier.
pub const DEFAULT_SPEED: f32 = 1.0;
/// Default spatial scale of the plasma field.
pub const DEFAULT_SCALE: f32 = 1.0;
/// Default opacity; values above [`MAX_OPACITY`] saturate visually.
pub const DEFAULT_OPACITY: f32 = 1.0;
/// Opacity ceiling; the alpha term clamps to 1.0 well before this.
pub const MAX_OPACITY: f32 = 2.0;

/// Immutable configuration snapshot supplied by the host.
///
/// `PlasmaConfig` mirrors the host collaborator's display parameters. Identity
/// is plain `PartialEq`: replacing any field invalidates the mounted renderer
/// instance and forces a full re-initialization, never a partial uniform-only
/// update across identity changes.
#[derive(Debug, Clone, PartialEq)]
pub struct PlasmaConfig {
    /// Temporal rate multiplier applied to the oscillators. Must be > 0.
    pub speed: f32,
    /// Spatial frequency multiplier applied to the oscillators. Must be > 0.
    pub scale: f32,
    /// Output alpha scale in `[0, 2]`; the per-pixel alpha clamps to 1.
    pub opacity: f32,
    /// Optional RGB tint multiplied into the ramp color.
    pub tint: Option<[f32; 3]>,
    /// When set the host leaves the layer hit-testable. Accepted but has no
    /// effect on the rendered field.
    pub interactive: bool,
    /// Alternative fragment source honoring the same uniform contract.
    /// `None` renders the built-in plasma program.
    pub fragment_override: Option<String>,
}

impl Default for PlasmaConfig {
    fn default() -> Self {
        Self {
            speed: DEFAULT_SPEED,
            scale: DEFAULT_SCALE,
            opacity: DEFAULT_OPACITY,
            tint: None,
            interactive: false,
            fragment_override: None,
        }
    }
}

impl PlasmaConfig {
    /// Returns a copy with every field forced into its documented domain.
    ///
    /// Non-finite or non-positive speed/scale fall back to their defaults;
    /// opacity clamps to `[0, MAX_OPACITY]`; tint components clamp to `[0, 1]`.
    pub fn sanitized(&self) -> Self {
        let mut out = self.clone();
        if !out.speed.is_finite() || out.speed <= 0.0 {
            tracing::warn!(speed = out.speed, "invalid speed; using default");
            out.speed = DEFAULT_SPEED;
        }
        if !out.scale.is_finite() || out.scale <= 0.0 {
            tracing::warn!(scale = out.scale, "invalid scale; using default");
            out.scale = DEFAULT_SCALE;
        }
        out.opacity = if out.opacity.is_finite() {
            out.opacity.clamp(0.0, MAX_OPACITY)
        } else {
            DEFAULT_OPACITY
        };
        if let Some(tint) = out.tint.as_mut() {
            for channel in tint.iter_mut() {
                *channel = if channel.is_finite() {
                    channel.clamp(0.0, 1.0)
                } else {
                    1.0
                };
            }
        }
        out
    }
}

/// Current values for every uniform slot the fragment program reads.
///
/// One `UniformSet` lives per mounted instance. `resolution` is always the
/// backing-buffer pixel size (the fragment stage divides by drawing-buffer
/// pixels, not logical pixels), and `time` is monotonically non-decreasing,
/// resetting to zero only on a full re-initialization.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformSet {
    /// Backing-buffer size in pixels (`iResolution`).
    pub resolution: [f32; 2],
    /// Seconds since the render loop started (`iTime`).
    pub time: f32,
    /// Temporal rate multiplier (`uSpeed`).
    pub speed: f32,
    /// Spatial frequency multiplier (`uScale`).
    pub scale: f32,
    /// Alpha scale (`uOpacity`).
    pub opacity: f32,
    /// Optional RGB tint (`uTint`).
    pub tint: Option<[f32; 3]>,
}

impl UniformSet {
    /// Seeds a uniform set from the host configuration, with time at zero
    /// and a 1x1 resolution until the first box sync lands.
    pub fn from_config(config: &PlasmaConfig) -> Self {
        Self {
            resolution: [1.0, 1.0],
            time: 0.0,
            speed: config.speed,
            scale: config.scale,
            opacity: config.opacity,
            tint: config.tint,
        }
    }

    /// Writes the backing-buffer pixel dimensions into `iResolution`.
    pub fn set_resolution(&mut self, width: f32, height: f32) {
        self.resolution = [width, height];
    }

    /// Advances `iTime`. Regressions are dropped so the value never moves
    /// backwards within one mounted lifetime.
    pub fn advance_time(&mut self, seconds: f32) {
        if seconds >= self.time {
            self.time = seconds;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_clamps_out_of_domain_fields() {
        let config = PlasmaConfig {
            speed: -2.0,
            scale: f32::NAN,
            opacity: 5.0,
            tint: Some([2.0, -1.0, 0.5]),
            ..PlasmaConfig::default()
        };
        let clean = config.sanitized();
        assert_eq!(clean.speed, DEFAULT_SPEED);
        assert_eq!(clean.scale, DEFAULT_SCALE);
        assert_eq!(clean.opacity, MAX_OPACITY);
        assert_eq!(clean.tint, Some([1.0, 0.0, 0.5]));
    }

    #[test]
    fn sanitize_keeps_valid_fields() {
        let config = PlasmaConfig {
            speed: 1.5,
            scale: 0.7,
            opacity: 1.8,
            ..PlasmaConfig::default()
        };
        assert_eq!(config.sanitized(), config);
    }

    #[test]
    fn config_identity_is_field_equality() {
        let a = PlasmaConfig::default();
        let mut b = a.clone();
        assert_eq!(a, b);
        b.speed = 2.0;
        assert_ne!(a, b);
    }

    #[test]
    fn time_never_moves_backwards() {
        let mut uniforms = UniformSet::from_config(&PlasmaConfig::default());
        uniforms.advance_time(1.0);
        uniforms.advance_time(0.5);
        assert_eq!(uniforms.time, 1.0);
        uniforms.advance_time(2.0);
        assert_eq!(uniforms.time, 2.0);
    }
}
