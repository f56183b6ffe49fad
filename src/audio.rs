//! Loudness input for the follower update.
//!
//! Capture itself lives outside the crate; everything here reduces whatever
//! 16-bit mono samples arrived since the last tick to one scalar in `[0, 1]`.

use std::collections::VecDeque;
use std::f32::consts::TAU;

/// Sample rate the capture device is opened at.
pub const CAPTURE_SAMPLE_RATE: u32 = 44_100;

/// A per-tick loudness reading. Implementations must not block; with nothing
/// captured they return `0.0`.
pub trait AmplitudeSource {
    fn poll(&mut self) -> f32;
}

/// Mean absolute amplitude of `samples`, normalised so that full scale is 1.0.
pub fn amplitude_from_samples(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples
        .iter()
        .map(|&sample| (sample as f32 / 32768.0).abs())
        .sum();
    (sum / samples.len() as f32).clamp(0.0, 1.0)
}

/// No input device.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silence;

impl AmplitudeSource for Silence {
    fn poll(&mut self) -> f32 {
        0.0
    }
}

/// Blocks of samples handed over by a capture callback, drained on each poll.
#[derive(Debug, Default)]
pub struct SampleQueue {
    pending: VecDeque<Vec<i16>>,
}

impl SampleQueue {
    pub fn new() -> Self {
        SampleQueue::default()
    }

    pub fn push(&mut self, block: Vec<i16>) {
        self.pending.push_back(block);
    }

    /// Samples waiting for the next poll.
    pub fn available(&self) -> usize {
        self.pending.iter().map(Vec::len).sum()
    }
}

impl AmplitudeSource for SampleQueue {
    fn poll(&mut self) -> f32 {
        let samples: Vec<i16> = self.pending.drain(..).flatten().collect();
        amplitude_from_samples(&samples)
    }
}

/// A synthetic capture device: a steady tone whose volume swells and fades.
///
/// Produces `sample_rate / tick_rate` samples per poll, the block a real
/// device would have buffered over one frame.
#[derive(Debug, Clone)]
pub struct SineTone {
    frequency: f32,
    swell_period: f32,
    samples_per_tick: usize,
    sample_rate: u32,
    cursor: u64,
    block: Vec<i16>,
}

impl SineTone {
    /// `frequency` in Hz; `swell_period` is the seconds for one quiet-loud-quiet cycle.
    pub fn new(frequency: f32, swell_period: f32, tick_rate: u32) -> Self {
        let samples_per_tick = (CAPTURE_SAMPLE_RATE / tick_rate.max(1)) as usize;
        SineTone {
            frequency,
            swell_period: swell_period.max(f32::EPSILON),
            samples_per_tick,
            sample_rate: CAPTURE_SAMPLE_RATE,
            cursor: 0,
            block: Vec::with_capacity(samples_per_tick),
        }
    }

    fn fill_block(&mut self) {
        self.block.clear();
        let rate = self.sample_rate as f64;
        for _ in 0..self.samples_per_tick {
            let t = (self.cursor as f64 / rate) as f32;
            let envelope = 0.5 - 0.5 * (TAU * t / self.swell_period).cos();
            let wave = (TAU * self.frequency * t).sin();
            self.block
                .push((wave * envelope * i16::MAX as f32).round() as i16);
            self.cursor += 1;
        }
    }
}

impl AmplitudeSource for SineTone {
    fn poll(&mut self) -> f32 {
        self.fill_block();
        amplitude_from_samples(&self.block)
    }
}
