use bytemuck::{Pod, Zeroable};

use crate::types::UniformSet;

/// GPU mirror of the uniform block declared in the fragment program.
///
/// The layout must observe std140 alignment rules and match `PlasmaParams`
/// in `shader.rs` field for field: vec2 + five scalars + one pad, then the
/// vec4 tint at offset 32.
#[repr(C, align(16))]
#[derive(Clone, Copy)]
pub(crate) struct PlasmaUniforms {
    pub resolution: [f32; 2],
    pub time: f32,
    pub speed: f32,
    pub scale: f32,
    pub opacity: f32,
    pub tint_strength: f32,
    pub _pad0: f32,
    pub tint: [f32; 4],
}

unsafe impl Zeroable for PlasmaUniforms {}
unsafe impl Pod for PlasmaUniforms {}

impl PlasmaUniforms {
    /// Lowers the host-side uniform set into the std140 block.
    ///
    /// An absent tint becomes white with zero strength so the fragment
    /// program's mix is an exact no-op.
    pub fn from_set(set: &UniformSet) -> Self {
        let (tint, tint_strength) = match set.tint {
            Some(rgb) => ([rgb[0], rgb[1], rgb[2], 1.0], 1.0),
            None => ([1.0, 1.0, 1.0, 1.0], 0.0),
        };
        Self {
            resolution: set.resolution,
            time: set.time,
            speed: set.speed,
            scale: set.scale,
            opacity: set.opacity,
            tint_strength,
            _pad0: 0.0,
            tint,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PlasmaConfig;

    #[test]
    fn block_is_48_bytes_std140() {
        assert_eq!(std::mem::size_of::<PlasmaUniforms>(), 48);
        assert_eq!(std::mem::align_of::<PlasmaUniforms>(), 16);
    }

    #[test]
    fn absent_tint_lowers_to_identity() {
        let set = UniformSet::from_config(&PlasmaConfig::default());
        let block = PlasmaUniforms::from_set(&set);
        assert_eq!(block.tint_strength, 0.0);
        assert_eq!(block.tint, [1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn present_tint_lowers_with_full_strength() {
        let mut set = UniformSet::from_config(&PlasmaConfig::default());
        set.tint = Some([0.2, 0.4, 0.6]);
        set.set_resolution(1200.0, 900.0);
        let block = PlasmaUniforms::from_set(&set);
        assert_eq!(block.tint_strength, 1.0);
        assert_eq!(block.tint, [0.2, 0.4, 0.6, 1.0]);
        assert_eq!(block.resolution, [1200.0, 900.0]);
    }
}
