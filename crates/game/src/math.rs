//! Shared math primitives: angle normalization, sequence-number wraparound,
//! and the fixed-point quantization used by the binary snapshot/input wire
//! formats.

use std::f32::consts::{PI, TAU};

/// Normalizes an angle in radians to `[-PI, PI]`.
pub fn normalize_angle(angle: f32) -> f32 {
    let mut normalized = angle % TAU;
    if normalized > PI {
        normalized -= TAU;
    } else if normalized < -PI {
        normalized += TAU;
    }
    normalized
}

/// Signed-delta sequence comparison over a 16-bit wrapping counter.
/// `greater_than(1, 65535)` is true; `greater_than(32769, 1)` is false.
#[inline]
pub fn sequence_greater_than_u16(s1: u16, s2: u16) -> bool {
    ((s1 > s2) && (s1 - s2 <= 32768)) || ((s1 < s2) && (s2 - s1 > 32768))
}

/// Q0.15 fixed-point: one sign bit, 15 fractional bits, range `[-1, 1]`.
pub const Q15_SCALE: f32 = 32767.0;

pub fn float_to_q15(x: f32) -> i16 {
    (x.clamp(-1.0, 1.0) * Q15_SCALE).round() as i16
}

pub fn q15_to_float(q: i16) -> f32 {
    q as f32 / Q15_SCALE
}

/// Position quantization: world bounds of +/-4096 units from center (spec's
/// `worldBounds` default) mapped into an unsigned 16-bit field, giving
/// 1/8-unit precision.
const POSITION_SCALE: f32 = 8.0;
const POSITION_OFFSET: f32 = 32768.0;

pub fn quantize_position(p: f32) -> u16 {
    (p * POSITION_SCALE + POSITION_OFFSET).round().clamp(0.0, 65535.0) as u16
}

pub fn unquantize_position(q: u16) -> f32 {
    (q as f32 - POSITION_OFFSET) / POSITION_SCALE
}

/// Velocity quantization: 1/256 m/s precision.
const VELOCITY_SCALE: f32 = 256.0;
const VELOCITY_OFFSET: f32 = 32768.0;

pub fn quantize_velocity(v: f32) -> u16 {
    (v * VELOCITY_SCALE + VELOCITY_OFFSET).round().clamp(0.0, 65535.0) as u16
}

pub fn unquantize_velocity(q: u16) -> f32 {
    (q as f32 - VELOCITY_OFFSET) / VELOCITY_SCALE
}

/// Rotation quantization: `round(theta * 1024 / 2*PI) mod 1024`.
const ROTATION_STEPS: f32 = 1024.0;

pub fn quantize_rotation(theta: f32) -> u16 {
    let normalized = normalize_angle(theta);
    let steps = (normalized * ROTATION_STEPS / TAU).round() as i32;
    steps.rem_euclid(1024) as u16
}

pub fn unquantize_rotation(q: u16) -> f32 {
    normalize_angle((q as f32) * TAU / ROTATION_STEPS)
}

/// One's-complement 16-bit checksum: sum folded `(sum & 0xFFFF) + (sum >>
/// 16)` over 16-bit words, then bitwise NOT.
pub fn checksum16(bytes: &[u8]) -> u16 {
    let mut sum: u32 = 0;
    let mut chunks = bytes.chunks_exact(2);
    for chunk in &mut chunks {
        sum += u16::from_le_bytes([chunk[0], chunk[1]]) as u32;
    }
    if let [last] = chunks.remainder() {
        sum += *last as u32;
    }
    let folded = (sum & 0xFFFF) + (sum >> 16);
    !(folded as u16)
}

/// Rotates a 2D vector by `theta` radians: `Rot(theta) * v`.
pub fn rotate2(v: glam::Vec2, theta: f32) -> glam::Vec2 {
    let (sin, cos) = theta.sin_cos();
    glam::Vec2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_wrap_boundaries() {
        assert!(sequence_greater_than_u16(1, 65535));
        assert!(!sequence_greater_than_u16(32769, 1));
    }

    #[test]
    fn q15_round_trip() {
        for x in [-1.0, -0.5, 0.0, 0.33333, 0.99999, 1.0] {
            let q = float_to_q15(x);
            let back = q15_to_float(q);
            assert!((back - x).abs() < 1.0 / 32767.0 + 1e-6);
        }
    }

    #[test]
    fn position_round_trip_within_tolerance() {
        for p in [-4096.0, -1200.5, 0.0, 12.5, 4095.0] {
            let q = quantize_position(p);
            let back = unquantize_position(q);
            assert!((back - p).abs() <= 1.0 / 8.0 + 1e-3);
        }
    }

    #[test]
    fn rotation_round_trip_within_tolerance() {
        for theta in [-PI, -1.0, 0.0, 1.0, PI - 0.01] {
            let q = quantize_rotation(theta);
            let back = unquantize_rotation(q);
            let mut diff = (back - theta).abs();
            if diff > PI {
                diff = TAU - diff;
            }
            assert!(diff <= PI / 1024.0 + 1e-4);
        }
    }

    #[test]
    fn checksum_is_deterministic() {
        let data = [1u8, 2, 3, 4, 5];
        assert_eq!(checksum16(&data), checksum16(&data));
    }

    #[test]
    fn rotate2_quarter_turn() {
        let v = glam::Vec2::new(1.0, 0.0);
        let rotated = rotate2(v, std::f32::consts::FRAC_PI_2);
        assert!((rotated.x).abs() < 1e-5);
        assert!((rotated.y - 1.0).abs() < 1e-5);
    }
}
