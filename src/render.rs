use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};
use log::error;
use nalgebra::Vector3;
use serde::Serialize;

use crate::{Parameters, RenderError};

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BACKGROUND: Rgb<u8> = Rgb([51, 77, 77]);

/// Receives the positions produced by each tick. Sinks only read what they are given.
pub trait RenderSink {
    fn submit(&mut self, leads: &[Vector3<f32>], particles: &[Vector3<f32>]);

    /// Flushes anything still buffered. Called once after the last tick.
    fn finish(&mut self) -> Result<(), RenderError> {
        Ok(())
    }

    /// Writes that failed so far.
    fn failures(&self) -> usize {
        0
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl RenderSink for NullSink {
    fn submit(&mut self, _leads: &[Vector3<f32>], _particles: &[Vector3<f32>]) {}
}

/// Maps a point in [-1, 1]² onto pixel coordinates, y pointing up.
fn to_pixel(p: &Vector3<f32>, width: u32, height: u32) -> (i64, i64) {
    let x = ((p.x + 1.0) * 0.5 * width as f32).floor() as i64;
    let y = ((1.0 - p.y) * 0.5 * height as f32).floor() as i64;
    (x.clamp(0, width as i64 - 1), y.clamp(0, height as i64 - 1))
}

fn draw_point(img: &mut RgbImage, p: &Vector3<f32>, size: f32, colour: Rgb<u8>) {
    let (width, height) = img.dimensions();
    let (cx, cy) = to_pixel(p, width, height);
    let half = (size / 2.0).floor().max(0.0) as i64;
    for y in (cy - half)..=(cy + half) {
        for x in (cx - half)..=(cx + half) {
            if x >= 0 && y >= 0 && (x as u32) < width && (y as u32) < height {
                img.put_pixel(x as u32, y as u32, colour);
            }
        }
    }
}

/// Rasterises every submitted tick into a numbered PNG.
pub struct FrameRecorder {
    dir: PathBuf,
    width: u32,
    height: u32,
    particle_size: f32,
    lead_size: f32,
    particle_colours: Vec<Rgb<u8>>,
    frame: usize,
    failures: usize,
}

impl FrameRecorder {
    /// Creates `dir` if needed.
    pub fn new(dir: &Path, params: &Parameters) -> Result<Self, RenderError> {
        fs::create_dir_all(dir)?;
        Ok(FrameRecorder {
            dir: dir.to_path_buf(),
            width: params.width,
            height: params.height,
            particle_size: params.particle_size,
            lead_size: params.lead_size,
            particle_colours: Vec::new(),
            frame: 0,
            failures: 0,
        })
    }

    /// Per-particle colours, in population order. Particles without one are drawn white.
    pub fn with_particle_colours(mut self, colours: Vec<Rgb<u8>>) -> Self {
        self.particle_colours = colours;
        self
    }

    pub fn frames_written(&self) -> usize {
        self.frame - self.failures
    }

    pub fn frame_path(&self, frame: usize) -> PathBuf {
        self.dir.join(format!("frame_{:0>8}.png", frame))
    }

    pub fn rasterise(&self, leads: &[Vector3<f32>], particles: &[Vector3<f32>]) -> RgbImage {
        let mut img = RgbImage::from_pixel(self.width, self.height, BACKGROUND);
        for (idx, p) in particles.iter().enumerate() {
            let colour = self.particle_colours.get(idx).copied().unwrap_or(WHITE);
            draw_point(&mut img, p, self.particle_size, colour);
        }
        for p in leads {
            draw_point(&mut img, p, self.lead_size, WHITE);
        }
        img
    }

    fn write_frame(
        &self,
        leads: &[Vector3<f32>],
        particles: &[Vector3<f32>],
    ) -> Result<(), RenderError> {
        let path = self.frame_path(self.frame);
        self.rasterise(leads, particles)
            .save(&path)
            .map_err(|source| RenderError::Image { path, source })
    }
}

impl RenderSink for FrameRecorder {
    fn submit(&mut self, leads: &[Vector3<f32>], particles: &[Vector3<f32>]) {
        if let Err(e) = self.write_frame(leads, particles) {
            error!("{e}");
            self.failures += 1;
        }
        self.frame += 1;
    }

    fn failures(&self) -> usize {
        self.failures
    }
}

#[derive(Serialize)]
struct TraceLine<'a> {
    tick: u64,
    leads: &'a [Vector3<f32>],
    particles: &'a [Vector3<f32>],
}

/// Writes one JSON object per tick: `{"tick", "leads", "particles"}`.
pub struct PositionLog<W: Write> {
    out: W,
    tick: u64,
    failures: usize,
}

impl<W: Write> PositionLog<W> {
    pub fn new(out: W) -> Self {
        PositionLog {
            out,
            tick: 0,
            failures: 0,
        }
    }

    pub fn into_inner(mut self) -> Result<W, RenderError> {
        self.out.flush()?;
        Ok(self.out)
    }

    fn write_line(
        &mut self,
        leads: &[Vector3<f32>],
        particles: &[Vector3<f32>],
    ) -> Result<(), RenderError> {
        let line = TraceLine {
            tick: self.tick,
            leads,
            particles,
        };
        serde_json::to_writer(&mut self.out, &line)?;
        self.out.write_all(b"\n")?;
        Ok(())
    }
}

impl<W: Write> RenderSink for PositionLog<W> {
    fn submit(&mut self, leads: &[Vector3<f32>], particles: &[Vector3<f32>]) {
        if let Err(e) = self.write_line(leads, particles) {
            error!("failed to write position trace for tick {}: {e}", self.tick);
            self.failures += 1;
        }
        self.tick += 1;
    }

    fn finish(&mut self) -> Result<(), RenderError> {
        self.out.flush().map_err(|e| {
            error!("failed to flush position trace: {e}");
            self.failures += 1;
            RenderError::from(e)
        })
    }

    fn failures(&self) -> usize {
        self.failures
    }
}

/// Forwards every tick to each inner sink in turn.
#[derive(Default)]
pub struct FanOut {
    sinks: Vec<Box<dyn RenderSink>>,
}

impl FanOut {
    pub fn new() -> Self {
        FanOut::default()
    }

    pub fn push(&mut self, sink: Box<dyn RenderSink>) {
        self.sinks.push(sink);
    }
}

impl RenderSink for FanOut {
    fn submit(&mut self, leads: &[Vector3<f32>], particles: &[Vector3<f32>]) {
        for sink in &mut self.sinks {
            sink.submit(leads, particles);
        }
    }

    /// Finishes every sink, even after one fails, and returns the first error.
    fn finish(&mut self) -> Result<(), RenderError> {
        let mut result = Ok(());
        for sink in &mut self.sinks {
            if let Err(e) = sink.finish() {
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        result
    }

    fn failures(&self) -> usize {
        self.sinks.iter().map(|sink| sink.failures()).sum()
    }
}
