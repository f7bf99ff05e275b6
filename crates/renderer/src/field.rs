//! CPU reference of the plasma field and color ramp.
//!
//! The fragment program in `shader.rs` evaluates exactly this math on the
//! GPU. Keeping a host-side mirror makes the determinism of the field a
//! testable property: golden samples at fixed `(uv, t)` points are checked
//! here without a device, and the `probe` tooling in the host binary prints
//! values from the same functions.

use crate::types::PlasmaConfig;

/// Spatial frequency of the horizontal oscillator.
pub const FREQ_X: f32 = 6.2831855;
/// Spatial frequency of the vertical oscillator.
pub const FREQ_Y: f32 = 4.712389;
/// Spatial frequency of the diagonal oscillator.
pub const FREQ_D: f32 = 3.1415927;

/// Temporal rate of the horizontal oscillator.
pub const RATE_X: f32 = 0.9;
/// Temporal rate of the vertical oscillator.
pub const RATE_Y: f32 = 1.3;
/// Temporal rate of the diagonal oscillator.
pub const RATE_D: f32 = 1.7;

/// Darkest stop of the color ramp.
pub const BASE_TONE: [f32; 3] = [0.051, 0.02, 0.129];
/// Middle stop of the color ramp.
pub const PRIMARY_TONE: [f32; 3] = [0.58, 0.16, 0.96];
/// Brightest stop of the color ramp.
pub const HIGHLIGHT_TONE: [f32; 3] = [0.91, 0.72, 1.0];

/// Evaluates the scalar plasma field at a normalized coordinate.
///
/// Three phase-shifted sine oscillators run along x, y, and the x+y
/// diagonal with distinct spatial frequencies and temporal rates; their
/// average is remapped into `[0, 1]`. Pure function of its inputs.
pub fn field_value(u: f32, v: f32, time: f32, speed: f32, scale: f32) -> f32 {
    let t = time * speed;
    let wave_x = (u * FREQ_X * scale + t * RATE_X).sin();
    let wave_y = (v * FREQ_Y * scale + t * RATE_Y).sin();
    let wave_d = ((u + v) * FREQ_D * scale + t * RATE_D).sin();
    (wave_x + wave_y + wave_d) / 6.0 + 0.5
}

/// Interpolates the three-stop ramp (base -> primary -> highlight) at a
/// field value in `[0, 1]`.
pub fn ramp_color(field: f32) -> [f32; 3] {
    let field = field.clamp(0.0, 1.0);
    if field < 0.5 {
        mix3(BASE_TONE, PRIMARY_TONE, field * 2.0)
    } else {
        mix3(PRIMARY_TONE, HIGHLIGHT_TONE, field * 2.0 - 1.0)
    }
}

/// Full per-pixel shading: field, ramp, tint, and premultiplied alpha.
///
/// Alpha is `field * opacity` clamped to `[0, 1]`; the color channels are
/// premultiplied so the layer composites behind host content.
pub fn shade(u: f32, v: f32, time: f32, config: &PlasmaConfig) -> [f32; 4] {
    let field = field_value(u, v, time, config.speed, config.scale);
    let mut color = ramp_color(field);
    if let Some(tint) = config.tint {
        for (channel, factor) in color.iter_mut().zip(tint) {
            *channel *= factor;
        }
    }
    let alpha = (field * config.opacity).clamp(0.0, 1.0);
    [color[0] * alpha, color[1] * alpha, color[2] * alpha, alpha]
}

fn mix3(a: [f32; 3], b: [f32; 3], t: f32) -> [f32; 3] {
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-6;

    #[test]
    fn field_is_deterministic() {
        for _ in 0..8 {
            let first = field_value(0.37, 0.81, 12.5, 1.3, 0.8);
            let second = field_value(0.37, 0.81, 12.5, 1.3, 0.8);
            assert_eq!(first.to_bits(), second.to_bits());
        }
    }

    #[test]
    fn field_stays_in_unit_interval() {
        for iu in 0..=20 {
            for iv in 0..=20 {
                for it in 0..=10 {
                    let value = field_value(
                        iu as f32 / 20.0,
                        iv as f32 / 20.0,
                        it as f32 * 0.731,
                        1.7,
                        1.4,
                    );
                    assert!((0.0..=1.0).contains(&value), "field {value} out of range");
                }
            }
        }
    }

    #[test]
    fn ramp_hits_the_three_stops() {
        assert_eq!(ramp_color(0.0), BASE_TONE);
        let mid = ramp_color(0.5);
        for (got, want) in mid.iter().zip(PRIMARY_TONE) {
            assert!((got - want).abs() < EPS);
        }
        let top = ramp_color(1.0);
        for (got, want) in top.iter().zip(HIGHLIGHT_TONE) {
            assert!((got - want).abs() < EPS);
        }
    }

    #[test]
    fn shade_clamps_alpha_at_high_opacity() {
        let config = PlasmaConfig {
            opacity: 2.0,
            ..PlasmaConfig::default()
        };
        // Hunt a sample where the raw field exceeds 0.5 so field * 2 > 1.
        let mut found = false;
        for it in 0..200 {
            let t = it as f32 * 0.05;
            let field = field_value(0.25, 0.25, t, config.speed, config.scale);
            if field > 0.6 {
                let rgba = shade(0.25, 0.25, t, &config);
                assert_eq!(rgba[3], 1.0);
                found = true;
                break;
            }
        }
        assert!(found, "no sample with field above 0.6");
    }

    #[test]
    fn shade_applies_tint_per_channel() {
        let config = PlasmaConfig {
            tint: Some([1.0, 0.0, 1.0]),
            ..PlasmaConfig::default()
        };
        let rgba = shade(0.5, 0.5, 3.0, &config);
        assert_eq!(rgba[1], 0.0);
    }

    #[test]
    fn shade_is_zero_alpha_at_zero_opacity() {
        let config = PlasmaConfig {
            opacity: 0.0,
            ..PlasmaConfig::default()
        };
        let rgba = shade(0.1, 0.9, 7.0, &config);
        assert_eq!(rgba, [0.0, 0.0, 0.0, 0.0]);
    }
}
