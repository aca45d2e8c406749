//! Fixed-ratio attribute codecs.
//!
//! Colors compress per 64-voxel block to two RGB565 endpoints plus a 2-bit
//! palette index per voxel (DXT1-style). Normals quantize to a 16-bit
//! octahedral encoding. Both codecs are lossy; occupancy never goes through
//! them.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Voxels covered by one color block.
pub const BLOCK_VOXELS: usize = 64;

/// Compressed colors for 64 consecutive voxels: two RGB565 endpoints and a
/// 2-bit palette index per voxel. 20 bytes per block, 8 blocks per brick.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct ColorBlock {
  /// RGB565 endpoints; `endpoints[0]` is the brighter one.
  pub endpoints: [u16; 2],

  /// 2-bit palette selectors, voxel `i` at bits `2i`.
  pub indices: [u8; 16],
}

impl ColorBlock {
  /// Compress one block. `occupied` masks which of the 64 slots carry a
  /// color; unoccupied slots get index 0 and never influence the endpoints.
  pub fn compress(colors: &[[u8; 3]; BLOCK_VOXELS], occupied: u64) -> Self {
    if occupied == 0 {
      return Self::zeroed();
    }

    // Endpoints: extreme colors by luminance over the occupied slots.
    let mut bright = [0u8; 3];
    let mut dark = [0u8; 3];
    let mut bright_lum = i32::MIN;
    let mut dark_lum = i32::MAX;
    for (i, color) in colors.iter().enumerate() {
      if occupied & (1 << i) == 0 {
        continue;
      }
      let lum = luminance(*color);
      if lum > bright_lum {
        bright_lum = lum;
        bright = *color;
      }
      if lum < dark_lum {
        dark_lum = lum;
        dark = *color;
      }
    }

    let endpoints = [encode_565(bright), encode_565(dark)];
    let palette = palette_from_endpoints(endpoints);

    let mut indices = [0u8; 16];
    for (i, color) in colors.iter().enumerate() {
      if occupied & (1 << i) == 0 {
        continue;
      }
      let best = nearest_palette_entry(&palette, *color);
      indices[i / 4] |= best << ((i % 4) * 2);
    }

    Self { endpoints, indices }
  }

  /// Decode the color of slot `i` (0..64).
  #[inline]
  pub fn decode(&self, i: usize) -> [u8; 3] {
    debug_assert!(i < BLOCK_VOXELS);
    let palette = palette_from_endpoints(self.endpoints);
    let sel = (self.indices[i / 4] >> ((i % 4) * 2)) & 3;
    palette[sel as usize]
  }
}

/// 4-entry palette: the two endpoints and two interpolated thirds.
#[inline]
fn palette_from_endpoints(endpoints: [u16; 2]) -> [[u8; 3]; 4] {
  let c0 = decode_565(endpoints[0]);
  let c1 = decode_565(endpoints[1]);
  let lerp = |a: u8, b: u8, num: u16| -> u8 { ((a as u16 * (3 - num) + b as u16 * num) / 3) as u8 };
  [
    c0,
    c1,
    [lerp(c0[0], c1[0], 1), lerp(c0[1], c1[1], 1), lerp(c0[2], c1[2], 1)],
    [lerp(c0[0], c1[0], 2), lerp(c0[1], c1[1], 2), lerp(c0[2], c1[2], 2)],
  ]
}

#[inline]
fn nearest_palette_entry(palette: &[[u8; 3]; 4], color: [u8; 3]) -> u8 {
  let mut best = 0u8;
  let mut best_dist = i32::MAX;
  for (sel, entry) in palette.iter().enumerate() {
    let dr = entry[0] as i32 - color[0] as i32;
    let dg = entry[1] as i32 - color[1] as i32;
    let db = entry[2] as i32 - color[2] as i32;
    let dist = dr * dr + dg * dg + db * db;
    if dist < best_dist {
      best_dist = dist;
      best = sel as u8;
    }
  }
  best
}

/// Integer Rec.601 luminance, scaled by 256.
#[inline]
fn luminance(c: [u8; 3]) -> i32 {
  77 * c[0] as i32 + 150 * c[1] as i32 + 29 * c[2] as i32
}

#[inline]
pub fn encode_565(c: [u8; 3]) -> u16 {
  (((c[0] >> 3) as u16) << 11) | (((c[1] >> 2) as u16) << 5) | (c[2] >> 3) as u16
}

#[inline]
pub fn decode_565(v: u16) -> [u8; 3] {
  let r = ((v >> 11) & 0x1f) as u8;
  let g = ((v >> 5) & 0x3f) as u8;
  let b = (v & 0x1f) as u8;
  [(r << 3) | (r >> 2), (g << 2) | (g >> 4), (b << 3) | (b >> 2)]
}

/// Quantize a unit normal to 16 bits via octahedral mapping, one snorm8 per
/// octahedral component. Axis-aligned normals survive exactly.
pub fn encode_normal(n: Vec3) -> u16 {
  let l1 = n.x.abs() + n.y.abs() + n.z.abs();
  if l1 < 1e-8 {
    // Degenerate input; encode +Y.
    return encode_normal(Vec3::Y);
  }
  let mut u = n.x / l1;
  let mut v = n.y / l1;
  if n.z < 0.0 {
    let (au, av) = (u.abs(), v.abs());
    let (su, sv) = (sign_not_zero(u), sign_not_zero(v));
    u = (1.0 - av) * su;
    v = (1.0 - au) * sv;
  }
  let qu = (u * 127.0).round() as i8;
  let qv = (v * 127.0).round() as i8;
  (qu as u8 as u16) | ((qv as u8 as u16) << 8)
}

/// Inverse of [`encode_normal`]; always returns a unit vector.
pub fn decode_normal(packed: u16) -> Vec3 {
  let u = (packed as u8 as i8) as f32 / 127.0;
  let v = ((packed >> 8) as u8 as i8) as f32 / 127.0;
  let z = 1.0 - u.abs() - v.abs();
  let n = if z < 0.0 {
    Vec3::new(
      (1.0 - v.abs()) * sign_not_zero(u),
      (1.0 - u.abs()) * sign_not_zero(v),
      z,
    )
  } else {
    Vec3::new(u, v, z)
  };
  n.normalize()
}

#[inline]
fn sign_not_zero(v: f32) -> f32 {
  if v >= 0.0 {
    1.0
  } else {
    -1.0
  }
}

#[cfg(test)]
#[path = "codec_test.rs"]
mod codec_test;
