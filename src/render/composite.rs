use image::RgbaImage;

use crate::foundation::error::{SceneError, SceneResult};
use crate::render::images::PreparedImage;

/// One premultiplied RGBA8 pixel.
pub type PremulRgba8 = [u8; 4];

/// Source-over for premultiplied pixels.
pub fn over(dst: PremulRgba8, src: PremulRgba8) -> PremulRgba8 {
    match src[3] {
        0 => return dst,
        255 => return src,
        _ => {}
    }
    let inv = 255u16 - u16::from(src[3]);
    let mut out = [0u8; 4];
    for i in 0..4 {
        out[i] = add_sat_u8(src[i], mul_div255(u16::from(dst[i]), inv));
    }
    out
}

/// Back to straight alpha. Fully transparent pixels become all zero.
pub fn unpremultiply(px: PremulRgba8) -> [u8; 4] {
    let a = u32::from(px[3]);
    if a == 0 {
        return [0, 0, 0, 0];
    }
    let mut out = [0u8; 4];
    for i in 0..3 {
        out[i] = ((u32::from(px[i]) * 255 + a / 2) / a).min(255) as u8;
    }
    out[3] = px[3];
    out
}

fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

fn add_sat_u8(a: u8, b: u8) -> u8 {
    a.saturating_add(b)
}

/// Bilinear sample of a premultiplied image at pixel-center coordinates, clamped to the edges.
/// `src` must be non-empty.
fn sample_bilinear(src: &PreparedImage, u: f64, v: f64) -> PremulRgba8 {
    let u = u.clamp(0.0, f64::from(src.width - 1));
    let v = v.clamp(0.0, f64::from(src.height - 1));
    let (x0, y0) = (u.floor() as u32, v.floor() as u32);
    let x1 = (x0 + 1).min(src.width - 1);
    let y1 = (y0 + 1).min(src.height - 1);
    let (fx, fy) = (u - f64::from(x0), v - f64::from(y0));

    let at = |x: u32, y: u32| {
        let i = ((y as usize) * (src.width as usize) + (x as usize)) * 4;
        &src.rgba8_premul[i..i + 4]
    };
    let (a, b, c, d) = (at(x0, y0), at(x1, y0), at(x0, y1), at(x1, y1));

    let mut out = [0u8; 4];
    for i in 0..4 {
        let upper = f64::from(a[i]) * (1.0 - fx) + f64::from(b[i]) * fx;
        let lower = f64::from(c[i]) * (1.0 - fx) + f64::from(d[i]) * fx;
        out[i] = (upper * (1.0 - fy) + lower * fy).round().clamp(0.0, 255.0) as u8;
    }
    out
}

/// Premultiplied RGBA8 canvas, transparent on creation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Surface {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Surface {
    /// Transparent `width`×`height` surface.
    pub fn new(width: u32, height: u32) -> SceneResult<Self> {
        let len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(4))
            .ok_or_else(|| SceneError::validation("surface size overflow"))?;
        Ok(Self {
            width,
            height,
            data: vec![0; len],
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Premultiplied RGBA8 bytes, row-major.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Pixel at (`x`, `y`); `None` outside the surface.
    pub fn pixel(&self, x: u32, y: u32) -> Option<PremulRgba8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        Some([
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ])
    }

    /// Draw `src` resized to `width`×`height` with its top-left corner at (`x`, `y`).
    ///
    /// Coordinates and sizes are rounded to whole pixels. The target rectangle is clipped to
    /// the surface first and only the visible part is sampled (bilinear, premultiplied).
    pub fn draw_scaled(
        &mut self,
        src: &PreparedImage,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    ) -> SceneResult<()> {
        let (tw, th) = (width.round(), height.round());
        if !(tw >= 1.0 && th >= 1.0) || !x.is_finite() || !y.is_finite() {
            return Ok(());
        }
        let expected = (src.width as usize)
            .checked_mul(src.height as usize)
            .and_then(|n| n.checked_mul(4));
        if src.width == 0 || src.height == 0 || expected != Some(src.rgba8_premul.len()) {
            return Err(SceneError::invariant(format!(
                "image buffer does not match {}x{}",
                src.width, src.height
            )));
        }

        let (left, top) = (x.round(), y.round());
        let x0 = left.max(0.0);
        let y0 = top.max(0.0);
        let x1 = (left + tw).min(f64::from(self.width));
        let y1 = (top + th).min(f64::from(self.height));
        if !(x0 < x1 && y0 < y1) {
            return Ok(());
        }

        let scale_x = f64::from(src.width) / tw;
        let scale_y = f64::from(src.height) / th;
        for dy in (y0 as u32)..(y1 as u32) {
            let v = (f64::from(dy) - top + 0.5) * scale_y - 0.5;
            for dx in (x0 as u32)..(x1 as u32) {
                let u = (f64::from(dx) - left + 0.5) * scale_x - 0.5;
                let idx = ((dy as usize) * (self.width as usize) + (dx as usize)) * 4;
                let dst = [
                    self.data[idx],
                    self.data[idx + 1],
                    self.data[idx + 2],
                    self.data[idx + 3],
                ];
                self.data[idx..idx + 4].copy_from_slice(&over(dst, sample_bilinear(src, u, v)));
            }
        }
        Ok(())
    }

    /// Straight-alpha copy of the surface.
    pub fn to_rgba_image(&self) -> SceneResult<RgbaImage> {
        let mut straight = Vec::with_capacity(self.data.len());
        for px in self.data.chunks_exact(4) {
            straight.extend_from_slice(&unpremultiply([px[0], px[1], px[2], px[3]]));
        }
        RgbaImage::from_raw(self.width, self.height, straight)
            .ok_or_else(|| SceneError::invariant("surface buffer size mismatch"))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/composite.rs"]
mod tests;
