use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;
use std::path::Path;

use crate::error::{FrameUnavailable, PlayerError, PlayerResult};
use crate::render::{RasterFrame, Rgb};
use crate::source::{require_frame_pixel_size, FrameSource};

pub const DEFAULT_DEMO_SECONDS: f64 = 10.0;

// --- Demo frame generators ---

fn clamp_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

fn hsv_to_rgb(hue: f32, saturation: f32, value: f32) -> Rgb {
    let h = hue.rem_euclid(360.0) / 60.0;
    let c = value * saturation;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = value - c;
    [
        clamp_u8((r + m) * 255.0),
        clamp_u8((g + m) * 255.0),
        clamp_u8((b + m) * 255.0),
    ]
}

fn plasma(x: f32, y: f32, t: f32) -> f32 {
    let v = (x * 0.11 + t).sin()
        + (y * 0.07 - t * 1.3).sin()
        + ((x + y) * 0.05 + t * 0.7).sin()
        + ((x * x + y * y).sqrt() * 0.09 - t * 1.9).sin();
    v * 0.25
}

/// Procedural animation: a drifting plasma field with a bright orbiting disc
/// and seeded sparkles. Each index renders the same frame every time.
#[derive(Debug, Clone)]
pub struct DemoSource {
    frame_count: u64,
    seed: u64,
    width: usize,
    height: usize,
    fps: f64,
}

impl DemoSource {
    pub fn new(frame_count: u64, seed: u64) -> Self {
        Self {
            frame_count,
            seed,
            width: 0,
            height: 0,
            fps: 1.0,
        }
    }

    /// A demo lasting `seconds` at the given playback rate.
    pub fn with_duration(seconds: f64, fps: f64, seed: u64) -> Self {
        Self::new((seconds * fps).ceil().max(1.0) as u64, seed)
    }

    fn generate(&self, index: u64) -> PlayerResult<RasterFrame> {
        if self.width == 0 || self.height == 0 {
            return Err(PlayerError::malformed(
                self.width,
                self.height,
                "demo source has not been prepared",
            ));
        }
        let t = index as f32 / self.fps as f32;
        let (w, h) = (self.width as f32, self.height as f32);
        let orbit = t * TAU / 6.0;
        let disc_x = w * 0.5 + orbit.cos() * w * 0.3;
        let disc_y = h * 0.5 + orbit.sin() * h * 0.3;
        let disc_r = h.min(w) * 0.18;

        let mut frame_pixels = vec![[0u8; 3]; self.width * self.height];
        for y in 0..self.height {
            for x in 0..self.width {
                let (fx, fy) = (x as f32, y as f32);
                let v = plasma(fx, fy, t);
                let hue = v * 180.0 + t * 20.0;
                let value = (v * 0.5 + 0.5) * 0.75;
                let dist = ((fx - disc_x).powi(2) + (fy - disc_y).powi(2)).sqrt();
                frame_pixels[y * self.width + x] = if dist < disc_r {
                    [250, 240, 210]
                } else {
                    hsv_to_rgb(hue, 0.85, value)
                };
            }
        }

        let mut rng = StdRng::seed_from_u64(self.seed ^ index.wrapping_mul(0x9E37_79B9_7F4A_7C15));
        let sparkles = (self.width * self.height / 200).max(1);
        for _ in 0..sparkles {
            let x = rng.random_range(0..self.width);
            let y = rng.random_range(0..self.height);
            frame_pixels[y * self.width + x] = [255, 255, 255];
        }

        RasterFrame::from_pixels(self.width, self.height, frame_pixels)
    }
}

impl FrameSource for DemoSource {
    fn prepare(
        &mut self,
        _source_path: &Path,
        output_width: usize,
        output_height: usize,
        fps: f64,
    ) -> PlayerResult<()> {
        if output_width == 0 || output_height == 0 {
            return Err(PlayerError::preparation("demo output grid must be non-empty"));
        }
        (self.width, self.height) = require_frame_pixel_size(output_width, output_height)?;
        self.fps = fps;
        tracing::info!(
            frames = self.frame_count,
            width = self.width,
            height = self.height,
            "generating demo frames"
        );
        Ok(())
    }

    fn frame(&mut self, index: u64) -> Result<RasterFrame, FrameUnavailable> {
        if index == 0 || index > self.frame_count {
            return Err(FrameUnavailable::EndOfStream { index });
        }
        self.generate(index)
            .map_err(|err| FrameUnavailable::Unreadable {
                index,
                reason: err.to_string(),
            })
    }

    fn cleanup(&mut self) {}
}
