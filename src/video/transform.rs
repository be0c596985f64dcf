//! Ken Burns frame transform.
//!
//! A still image is fill-resized to the canvas height, center-cropped to the
//! canvas width, then magnified continuously over playback time and composited
//! centered on the canvas. Every frame is sampled from the cropped base with
//! the exact scale for its timestamp, so the push-in has no discrete steps.

use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};

use crate::config::{Canvas, RenderConfig};
use crate::error::{Result, VideoError};

const BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Linear magnification `1 + rate * t`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomCurve {
    rate: f64,
}

impl ZoomCurve {
    pub fn new(rate: f64) -> Self {
        Self { rate }
    }

    /// Scale factor at `t` seconds into the segment; never below 1.
    pub fn scale_at(&self, t: f64) -> f64 {
        1.0 + self.rate * t.max(0.0)
    }
}

/// Fill-resize to the canvas height and center-crop to the canvas width.
///
/// The crop window is taken in source pixels first so wide sources never
/// materialize at full fill size. Images narrower than the canvas keep their
/// aspect and are only resized.
pub fn fill_crop(image: &DynamicImage, canvas: Canvas) -> RgbaImage {
    let (w, h) = image.dimensions();
    let ratio = canvas.height as f64 / h as f64;
    let filled_width = ((w as f64 * ratio).round() as u32).max(1);
    if filled_width <= canvas.width {
        return image
            .resize_exact(filled_width, canvas.height, FilterType::Lanczos3)
            .to_rgba8();
    }

    let crop_width = ((canvas.width as f64 / ratio).round() as u32).clamp(1, w);
    let x = (w - crop_width) / 2;
    image
        .crop_imm(x, 0, crop_width, h)
        .resize_exact(canvas.width, canvas.height, FilterType::Lanczos3)
        .to_rgba8()
}

/// Draw `base` magnified by `scale` with its center pinned to the canvas center.
///
/// Content beyond the canvas is clipped; uncovered canvas stays black.
pub fn composite_centered(base: &RgbaImage, scale: f64, canvas: Canvas) -> RgbaImage {
    let mut frame = RgbaImage::from_pixel(canvas.width, canvas.height, BACKGROUND);
    let (bw, bh) = (base.width() as f64, base.height() as f64);
    let (cx, cy) = (canvas.width as f64 / 2.0, canvas.height as f64 / 2.0);
    let inv = 1.0 / scale;

    for y in 0..canvas.height {
        let sy = (y as f64 + 0.5 - cy) * inv + bh / 2.0;
        if sy < 0.0 || sy >= bh {
            continue;
        }
        for x in 0..canvas.width {
            let sx = (x as f64 + 0.5 - cx) * inv + bw / 2.0;
            if sx < 0.0 || sx >= bw {
                continue;
            }
            frame.put_pixel(x, y, sample_bilinear(base, sx - 0.5, sy - 0.5));
        }
    }
    frame
}

fn sample_bilinear(img: &RgbaImage, x: f64, y: f64) -> Rgba<u8> {
    let max_x = img.width() - 1;
    let max_y = img.height() - 1;
    let x = x.clamp(0.0, max_x as f64);
    let y = y.clamp(0.0, max_y as f64);
    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(max_x);
    let y1 = (y0 + 1).min(max_y);
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let p00 = img.get_pixel(x0, y0).0;
    let p10 = img.get_pixel(x1, y0).0;
    let p01 = img.get_pixel(x0, y1).0;
    let p11 = img.get_pixel(x1, y1).0;

    let mut out = [0u8; 4];
    for c in 0..4 {
        let top = p00[c] as f64 * (1.0 - fx) + p10[c] as f64 * fx;
        let bottom = p01[c] as f64 * (1.0 - fx) + p11[c] as f64 * fx;
        out[c] = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    Rgba(out)
}

/// Replace transparency with the black background so frames are opaque.
fn flatten_alpha(image: &mut RgbaImage) {
    for px in image.pixels_mut() {
        let a = px[3] as u16;
        if a == 255 {
            continue;
        }
        for c in 0..3 {
            px[c] = ((px[c] as u16 * a + 127) / 255) as u8;
        }
        px[3] = 255;
    }
}

/// One scene image prepared for animation over a fixed duration.
#[derive(Debug, Clone)]
pub struct TransformedClip {
    index: usize,
    base: RgbaImage,
    duration: f64,
    zoom: ZoomCurve,
    canvas: Canvas,
}

impl TransformedClip {
    /// Run fill-resize and center-crop on a decoded image.
    pub fn from_image(
        index: usize,
        image: &DynamicImage,
        duration: f64,
        render: &RenderConfig,
    ) -> Result<Self> {
        if image.width() == 0 || image.height() == 0 {
            return Err(VideoError::asset(index, "image has zero size"));
        }
        if !duration.is_finite() || duration <= 0.0 {
            return Err(VideoError::InvalidDuration(duration));
        }

        let canvas = render.canvas;
        let mut base = fill_crop(image, canvas);
        flatten_alpha(&mut base);

        Ok(Self {
            index,
            base,
            duration,
            zoom: ZoomCurve::new(render.zoom_rate),
            canvas,
        })
    }

    /// Decode the image at `path`; any read or decode failure names the scene.
    pub fn load(index: usize, path: &Path, duration: f64, render: &RenderConfig) -> Result<Self> {
        let image = image::open(path)
            .map_err(|e| VideoError::asset(index, format!("{}: {e}", path.display())))?;
        Self::from_image(index, &image, duration, render)
    }

    /// 1-based scene index this clip was built from.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Render the frame shown `t` seconds into the segment.
    pub fn frame_at(&self, t: f64) -> RgbaImage {
        composite_centered(&self.base, self.zoom.scale_at(t), self.canvas)
    }
}
