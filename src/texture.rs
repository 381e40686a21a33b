use bevy::{
    asset::RenderAssetUsages,
    prelude::*,
    render::render_resource::{
        Extent3d,
        TextureDimension,
        TextureFormat,
    },
};
use itertools::iproduct;
use rand::Rng;

use crate::font;


/// CPU-side RGBA8 canvas used for procedural textures.
#[derive(Clone, Debug, PartialEq)]
pub struct Raster {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Raster {
    pub fn filled(width: u32, height: u32, color: [u8; 4]) -> Self {
        let data = color
            .iter()
            .copied()
            .cycle()
            .take((width * height * 4) as usize)
            .collect();

        Self { width, height, data }
    }

    pub fn transparent(width: u32, height: u32) -> Self {
        Self::filled(width, height, [0, 0, 0, 0])
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = self.index(x, y);
        [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]]
    }

    fn index(&self, x: u32, y: u32) -> usize {
        ((y * self.width + x) * 4) as usize
    }

    /// Source-over blend of a straight-alpha color into one pixel.
    pub fn blend_pixel(&mut self, x: u32, y: u32, color: [u8; 3], alpha: f32) {
        if x >= self.width || y >= self.height {
            return;
        }

        let alpha = alpha.clamp(0.0, 1.0);
        if alpha <= 0.0 {
            return;
        }

        let i = self.index(x, y);
        let dst_alpha = self.data[i + 3] as f32 / 255.0;
        let out_alpha = alpha + dst_alpha * (1.0 - alpha);

        for channel in 0..3 {
            let src = color[channel] as f32;
            let dst = self.data[i + channel] as f32;
            let out = (src * alpha + dst * dst_alpha * (1.0 - alpha)) / out_alpha;
            self.data[i + channel] = out.round().clamp(0.0, 255.0) as u8;
        }
        self.data[i + 3] = (out_alpha * 255.0).round().clamp(0.0, 255.0) as u8;
    }

    /// Fills every pixel whose center lies within `radius` of (`cx`, `cy`).
    pub fn fill_circle(&mut self, cx: f32, cy: f32, radius: f32, color: [u8; 3], alpha: f32) {
        let min_x = (cx - radius).floor().max(0.0) as u32;
        let min_y = (cy - radius).floor().max(0.0) as u32;
        let max_x = ((cx + radius).ceil().max(0.0) as u32).min(self.width);
        let max_y = ((cy + radius).ceil().max(0.0) as u32).min(self.height);

        let radius_sq = radius * radius;
        for (y, x) in iproduct!(min_y..max_y, min_x..max_x) {
            let dx = x as f32 + 0.5 - cx;
            let dy = y as f32 + 0.5 - cy;
            if dx * dx + dy * dy <= radius_sq {
                self.blend_pixel(x, y, color, alpha);
            }
        }
    }

    pub fn fill_rect(&mut self, x: u32, y: u32, w: u32, h: u32, color: [u8; 3], alpha: f32) {
        for (py, px) in iproduct!(y..(y + h).min(self.height), x..(x + w).min(self.width)) {
            self.blend_pixel(px, py, color, alpha);
        }
    }

    /// Rec. 601 luma of a pixel in [0, 1].
    pub fn luminance(&self, x: u32, y: u32) -> f32 {
        let [r, g, b, _] = self.pixel(x, y);
        (0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32) / 255.0
    }

    pub fn into_image(self, format: TextureFormat) -> Image {
        Image::new(
            Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
            TextureDimension::D2,
            self.data,
            format,
            RenderAssetUsages::default(),
        )
    }
}


#[derive(Clone, Debug, Reflect)]
pub struct SpeckleSettings {
    pub size: u32,
    pub base_color: [u8; 3],
    pub dot_color: [u8; 3],
    pub dots: usize,
    pub radius_range: (f32, f32),
    pub alpha_range: (f32, f32),
}

impl Default for SpeckleSettings {
    fn default() -> Self {
        Self {
            size: 256,
            base_color: [0xE5, 0xC6, 0x87],
            dot_color: [160, 120, 60],
            dots: 5000,
            radius_range: (1.0, 3.0),
            alpha_range: (0.05, 0.15),
        }
    }
}

/// Shell-like speckle: a flat base stamped with many faint darker dots.
pub fn speckle_raster(settings: &SpeckleSettings, rng: &mut impl Rng) -> Raster {
    let [r, g, b] = settings.base_color;
    let mut raster = Raster::filled(settings.size, settings.size, [r, g, b, 255]);

    if settings.size == 0 {
        return raster;
    }

    let extent = settings.size as f32;
    for _ in 0..settings.dots {
        let x = rng.gen_range(0.0..extent);
        let y = rng.gen_range(0.0..extent);
        let radius = sample_span(rng, settings.radius_range);
        let alpha = sample_span(rng, settings.alpha_range);
        raster.fill_circle(x, y, radius, settings.dot_color, alpha);
    }

    raster
}

/// Uniform sample in `[lo, hi)`; collapsed or inverted spans yield `lo`.
fn sample_span(rng: &mut impl Rng, (lo, hi): (f32, f32)) -> f32 {
    if lo < hi {
        rng.gen_range(lo..hi)
    } else {
        lo
    }
}

/// Tangent-space normal map from the luminance of `height`, sampled with wraparound
/// so the map tiles like the source.
pub fn normal_map_from_height(height: &Raster, strength: f32) -> Raster {
    let (w, h) = (height.width(), height.height());
    let mut normals = Raster::transparent(w, h);

    let sample = |x: i64, y: i64| {
        height.luminance(x.rem_euclid(w as i64) as u32, y.rem_euclid(h as i64) as u32)
    };

    for (y, x) in iproduct!(0..h, 0..w) {
        let (xi, yi) = (x as i64, y as i64);
        let dx = sample(xi + 1, yi) - sample(xi - 1, yi);
        let dy = sample(xi, yi + 1) - sample(xi, yi - 1);
        let normal = Vec3::new(-dx * strength, -dy * strength, 1.0).normalize();

        let i = normals.index(x, y);
        normals.data[i] = ((normal.x * 0.5 + 0.5) * 255.0).round() as u8;
        normals.data[i + 1] = ((normal.y * 0.5 + 0.5) * 255.0).round() as u8;
        normals.data[i + 2] = ((normal.z * 0.5 + 0.5) * 255.0).round() as u8;
        normals.data[i + 3] = 255;
    }

    normals
}


#[derive(Clone, Debug, Reflect)]
pub struct LabelSettings {
    pub width: u32,
    pub height: u32,
    pub color: [u8; 3],
    pub shadow_alpha: f32,
    pub shadow_offset: u32,
    /// fraction of the canvas the text may cover on either axis
    pub fill: f32,
}

impl Default for LabelSettings {
    fn default() -> Self {
        Self {
            width: 256,
            height: 128,
            color: [255, 255, 255],
            shadow_alpha: 0.3,
            shadow_offset: 2,
            fill: 0.85,
        }
    }
}

/// Centered text on a transparent canvas with a soft drop shadow.
pub fn label_raster(text: &str, settings: &LabelSettings) -> Raster {
    let mut raster = Raster::transparent(settings.width, settings.height);

    let text_w = font::text_width(text);
    if text_w == 0 {
        return raster;
    }

    let max_w = settings.width as f32 * settings.fill;
    let max_h = settings.height as f32 * settings.fill;
    let scale = (max_w / text_w as f32)
        .min(max_h / font::GLYPH_H as f32)
        .floor()
        .max(1.0) as u32;

    let origin_x = settings.width.saturating_sub(text_w * scale) / 2;
    let origin_y = settings.height.saturating_sub(font::GLYPH_H * scale) / 2;

    let passes = [
        (settings.shadow_offset, [0, 0, 0], settings.shadow_alpha),
        (0, settings.color, 1.0),
    ];
    for (offset, color, alpha) in passes {
        for (gx, gy) in font::lit_pixels(text) {
            raster.fill_rect(
                origin_x + gx * scale + offset,
                origin_y + gy * scale + offset,
                scale,
                scale,
                color,
                alpha,
            );
        }
    }

    raster
}
