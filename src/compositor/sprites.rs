use std::collections::HashMap;
use std::sync::Arc;

use crate::foundation::error::{DanceError, DanceResult};
use crate::foundation::math::{clamp01, mul_div255_u8};
use crate::scene::color::Color;

/// A pre-rendered image ready to paint.
#[derive(Clone)]
pub struct Sprite {
    /// Paint handle.
    pub image: vello_cpu::Image,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl std::fmt::Debug for Sprite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sprite")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

impl Sprite {
    /// Pixel size tuple.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Wrap premultiplied RGBA8 bytes as a paintable sprite.
pub fn sprite_from_premul(bytes: &[u8], width: u32, height: u32) -> DanceResult<Sprite> {
    let w: u16 = width
        .try_into()
        .map_err(|_| DanceError::render("sprite width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| DanceError::render("sprite height exceeds u16"))?;
    if w == 0 || h == 0 {
        return Err(DanceError::render("sprite must be non-empty"));
    }
    if bytes.len() != (width as usize) * (height as usize) * 4 {
        return Err(DanceError::render("sprite byte len mismatch"));
    }
    let pixels: Vec<vello_cpu::peniko::color::PremulRgba8> = bytes
        .chunks_exact(4)
        .map(|px| vello_cpu::peniko::color::PremulRgba8::from_u8_array([px[0], px[1], px[2], px[3]]))
        .collect();
    let pixmap = vello_cpu::Pixmap::from_parts_with_opacity(pixels, w, h, true);
    Ok(Sprite {
        image: vello_cpu::Image {
            image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
            sampler: vello_cpu::peniko::ImageSampler::default(),
        },
        width,
        height,
    })
}

/// Premultiply straight RGBA8 in place.
pub fn premultiply_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        px[0] = mul_div255_u8(u16::from(px[0]), a);
        px[1] = mul_div255_u8(u16::from(px[1]), a);
        px[2] = mul_div255_u8(u16::from(px[2]), a);
    }
}

/// Radial soft disc of `color`: opaque-ish center fading to clear at the edge.
pub fn radial_bytes(color: Color, size: u32, falloff: f64) -> Vec<u8> {
    let size = size.max(2);
    let c = f64::from(size) * 0.5;
    let mut out = vec![0u8; (size as usize) * (size as usize) * 4];
    for y in 0..size {
        for x in 0..size {
            let dx = (f64::from(x) + 0.5 - c) / c;
            let dy = (f64::from(y) + 0.5 - c) / c;
            let d = (dx * dx + dy * dy).sqrt();
            let k = clamp01(1.0 - d).powf(falloff);
            let i = ((y * size + x) as usize) * 4;
            out[i..i + 4].copy_from_slice(&color.to_premul8(k));
        }
    }
    out
}

/// Black edge darkening that leaves the center clear.
pub fn vignette_bytes(width: u32, height: u32, strength: f64) -> Vec<u8> {
    let (w, h) = (width.max(1), height.max(1));
    let mut out = vec![0u8; (w as usize) * (h as usize) * 4];
    for y in 0..h {
        for x in 0..w {
            let u = (f64::from(x) + 0.5) / f64::from(w) * 2.0 - 1.0;
            let v = (f64::from(y) + 0.5) / f64::from(h) * 2.0 - 1.0;
            let d = ((u * u + v * v) * 0.5).sqrt();
            let a = clamp01((d - 0.35) / 0.65).powf(1.6) * strength;
            let i = ((y * w + x) as usize) * 4;
            out[i..i + 4].copy_from_slice(&Color::BLACK.to_premul8(a));
        }
    }
    out
}

/// Vertical two-stop gradient, fully opaque.
pub fn vertical_gradient_bytes(width: u32, height: u32, top: Color, bottom: Color) -> Vec<u8> {
    let (w, h) = (width.max(1), height.max(1));
    let mut out = vec![0u8; (w as usize) * (h as usize) * 4];
    for y in 0..h {
        let t = if h > 1 {
            f64::from(y) / f64::from(h - 1)
        } else {
            0.0
        };
        let px = top.mix(bottom, t).with_alpha(1.0).to_premul8(1.0);
        for x in 0..w {
            let i = ((y * w + x) as usize) * 4;
            out[i..i + 4].copy_from_slice(&px);
        }
    }
    out
}

/// Halo sprites keyed by color.
#[derive(Debug, Default)]
pub struct HaloCache {
    sprites: HashMap<[u8; 4], Sprite>,
}

impl HaloCache {
    /// Halo sprite for `color`, rendered once per distinct RGBA8 value.
    pub fn get(&mut self, color: Color) -> DanceResult<Sprite> {
        let key = color.to_rgba8();
        if let Some(s) = self.sprites.get(&key) {
            return Ok(s.clone());
        }
        let size = crate::tuning::HALO_SPRITE_PX;
        let sprite = sprite_from_premul(&radial_bytes(color, size, 1.8), size, size)?;
        self.sprites.insert(key, sprite.clone());
        Ok(sprite)
    }

    /// Number of cached halos.
    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    /// Return `true` when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radial_center_is_denser_than_edge() {
        let b = radial_bytes(Color::WHITE, 16, 1.0);
        let center = b[((8 * 16 + 8) * 4 + 3) as usize];
        let corner = b[3];
        assert!(center > 200);
        assert_eq!(corner, 0);
    }

    #[test]
    fn vignette_center_is_clear() {
        let b = vignette_bytes(20, 20, 0.8);
        assert_eq!(b[((10 * 20 + 10) * 4 + 3) as usize], 0);
        assert!(b[3] > 0);
    }

    #[test]
    fn premultiply_matches_rounding() {
        let mut px = [255u8, 128, 0, 128];
        premultiply_in_place(&mut px);
        assert_eq!(px, [128, 64, 0, 128]);
    }

    #[test]
    fn sprite_rejects_bad_lengths() {
        assert!(sprite_from_premul(&[0; 8], 2, 2).is_err());
        assert!(sprite_from_premul(&[0; 16], 2, 2).is_ok());
    }

    #[test]
    fn halo_cache_reuses_sprites() {
        let mut c = HaloCache::default();
        c.get(Color::WHITE).unwrap();
        c.get(Color::WHITE).unwrap();
        c.get(Color::BLACK).unwrap();
        assert_eq!(c.len(), 2);
    }
}
