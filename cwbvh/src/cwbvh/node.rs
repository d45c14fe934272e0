use glam::{Vec3, Vec4};

use crate::gpu::{exp2i, CWBVH_BRANCHING};

/// Decoded form of a single 80-byte CWBVH node.
///
/// Byte layout (little-endian):
///
/// ```text
///  0..12  origin (3 x f32)
/// 12..15  exponents of the grid scale (3 x i8)
/// 15      inner-child mask
/// 16..20  index of the first child node
/// 20..24  index of the first triangle
/// 24..32  child metadata
/// 32..80  quantized child planes: lo-x, lo-y, lo-z, hi-x, hi-y, hi-z
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CwbvhNode {
    pub origin: Vec3,
    pub exponents: [i8; 3],
    pub imask: u8,
    pub child_base_idx: u32,
    pub triangle_base_idx: u32,
    pub meta: [u8; CWBVH_BRANCHING],
    pub lo_x: [u8; CWBVH_BRANCHING],
    pub lo_y: [u8; CWBVH_BRANCHING],
    pub lo_z: [u8; CWBVH_BRANCHING],
    pub hi_x: [u8; CWBVH_BRANCHING],
    pub hi_y: [u8; CWBVH_BRANCHING],
    pub hi_z: [u8; CWBVH_BRANCHING],
}

impl CwbvhNode {
    pub const SIZE: usize = 80;

    pub fn scale(&self) -> Vec3 {
        Vec3::new(
            exp2i(self.exponents[0] as i32),
            exp2i(self.exponents[1] as i32),
            exp2i(self.exponents[2] as i32),
        )
    }

    pub fn is_empty_slot(&self, slot: usize) -> bool {
        self.meta[slot] == 0
    }

    pub fn is_inner_slot(&self, slot: usize) -> bool {
        self.imask & (1 << slot) != 0
    }

    /// Returns the dequantized bounds of the child living at given slot.
    pub fn child_bounds(&self, slot: usize) -> (Vec3, Vec3) {
        let scale = self.scale();

        let lo = Vec3::new(
            self.lo_x[slot] as f32,
            self.lo_y[slot] as f32,
            self.lo_z[slot] as f32,
        );

        let hi = Vec3::new(
            self.hi_x[slot] as f32,
            self.hi_y[slot] as f32,
            self.hi_z[slot] as f32,
        );

        (self.origin + lo * scale, self.origin + hi * scale)
    }

    pub fn serialize(&self) -> [Vec4; 5] {
        let mut bytes = [0u8; Self::SIZE];

        bytes[0..4].copy_from_slice(&self.origin.x.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.origin.y.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.origin.z.to_le_bytes());

        for (byte, exponent) in bytes[12..15].iter_mut().zip(self.exponents) {
            *byte = exponent as u8;
        }

        bytes[15] = self.imask;
        bytes[16..20].copy_from_slice(&self.child_base_idx.to_le_bytes());
        bytes[20..24].copy_from_slice(&self.triangle_base_idx.to_le_bytes());
        bytes[24..32].copy_from_slice(&self.meta);
        bytes[32..40].copy_from_slice(&self.lo_x);
        bytes[40..48].copy_from_slice(&self.lo_y);
        bytes[48..56].copy_from_slice(&self.lo_z);
        bytes[56..64].copy_from_slice(&self.hi_x);
        bytes[64..72].copy_from_slice(&self.hi_y);
        bytes[72..80].copy_from_slice(&self.hi_z);

        let words: [u32; Self::SIZE / 4] = bytemuck::cast(bytes);

        let words = words.map(|word| f32::from_bits(u32::from_le(word)));

        [
            Vec4::from_slice(&words[0..4]),
            Vec4::from_slice(&words[4..8]),
            Vec4::from_slice(&words[8..12]),
            Vec4::from_slice(&words[12..16]),
            Vec4::from_slice(&words[16..20]),
        ]
    }

    pub fn deserialize(blocks: [Vec4; 5]) -> Self {
        let mut words = [0u32; Self::SIZE / 4];

        for (idx, block) in blocks.iter().enumerate() {
            for (word, value) in
                words[idx * 4..][..4].iter_mut().zip(block.to_array())
            {
                *word = value.to_bits().to_le();
            }
        }

        let bytes: [u8; Self::SIZE] = bytemuck::cast(words);

        let f32_at = |at: usize| {
            f32::from_le_bytes([
                bytes[at],
                bytes[at + 1],
                bytes[at + 2],
                bytes[at + 3],
            ])
        };

        let u32_at = |at: usize| {
            u32::from_le_bytes([
                bytes[at],
                bytes[at + 1],
                bytes[at + 2],
                bytes[at + 3],
            ])
        };

        let bytes8_at = |at: usize| {
            let mut out = [0; CWBVH_BRANCHING];
            out.copy_from_slice(&bytes[at..at + CWBVH_BRANCHING]);
            out
        };

        Self {
            origin: Vec3::new(f32_at(0), f32_at(4), f32_at(8)),
            exponents: [bytes[12] as i8, bytes[13] as i8, bytes[14] as i8],
            imask: bytes[15],
            child_base_idx: u32_at(16),
            triangle_base_idx: u32_at(20),
            meta: bytes8_at(24),
            lo_x: bytes8_at(32),
            lo_y: bytes8_at(40),
            lo_z: bytes8_at(48),
            hi_x: bytes8_at(56),
            hi_y: bytes8_at(64),
            hi_z: bytes8_at(72),
        }
    }
}
