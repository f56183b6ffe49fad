use colors_transform::{Color, Hsl};
use image::Rgb;
use log::warn;
use nalgebra::Vector3;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::Parameters;
use crate::leads::LeadFlock;
use crate::vector::{is_finite, limit_speed, scale_to, wrap_position};

/// Particles handed to each worker at a time. Every chunk draws its noise from
/// its own stream, so the result does not depend on how the chunks are scheduled.
pub const PARTICLE_CHUNK: usize = 1024;

#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub position: Vector3<f32>,
    pub velocity: Vector3<f32>,
    pub size: f32,
    pub colour: Rgb<u8>,
}

impl Particle {
    /// A follower at rest, tinted by where it starts around the origin.
    pub fn at_rest(position: Vector3<f32>, size: f32) -> Self {
        Particle {
            position,
            velocity: Vector3::zeros(),
            size,
            colour: spawn_colour(&position),
        }
    }
}

fn spawn_colour(position: &Vector3<f32>) -> Rgb<u8> {
    let hue = position.y.atan2(position.x).to_degrees().rem_euclid(360.0);
    let rgb = Hsl::from(hue, 60.0, 80.0).to_rgb();
    Rgb([
        rgb.get_red().round() as u8,
        rgb.get_green().round() as u8,
        rgb.get_blue().round() as u8,
    ])
}

/// The follower population. Order carries no meaning beyond a stable upload layout.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticlePopulation {
    particles: Vec<Particle>,
}

impl ParticlePopulation {
    pub fn from_particles(particles: Vec<Particle>) -> Self {
        ParticlePopulation { particles }
    }

    pub fn random<R: Rng>(count: usize, size: f32, rng: &mut R) -> Self {
        let particles = (0..count)
            .map(|_| {
                Particle::at_rest(
                    Vector3::new(
                        rng.random_range(-1.0..=1.0),
                        rng.random_range(-1.0..=1.0),
                        0.0,
                    ),
                    size,
                )
            })
            .collect();
        ParticlePopulation { particles }
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn positions(&self) -> Vec<Vector3<f32>> {
        self.particles.iter().map(|p| p.position).collect()
    }

    pub fn colours(&self) -> Vec<Rgb<u8>> {
        self.particles.iter().map(|p| p.colour).collect()
    }
}

/// Unit vector from `from` toward the nearest lead, if the flock has any.
pub fn attraction_direction(flock: &LeadFlock, from: &Vector3<f32>) -> Option<Vector3<f32>> {
    flock
        .nearest(from)
        .map(|idx| scale_to(flock.birds()[idx].position - from, 1.0))
}

/// Advances every follower by one tick and returns how many held their previous
/// state because the new one came out non-finite.
///
/// Louder ticks widen the velocity jitter (see [`Parameters::noise_gain`]);
/// attraction toward the nearest lead is unaffected by audio. `tick_seed` feeds
/// the per-chunk noise streams.
pub fn update_particles(
    population: &mut ParticlePopulation,
    flock: &LeadFlock,
    amplitude: f32,
    params: &Parameters,
    tick_seed: u64,
) -> usize {
    let noise = params.noise * params.noise_gain(amplitude);

    population
        .particles
        .par_chunks_mut(PARTICLE_CHUNK)
        .enumerate()
        .map(|(chunk_idx, chunk)| {
            let mut rng = ChaCha8Rng::seed_from_u64(tick_seed);
            rng.set_stream(chunk_idx as u64);

            let mut held = 0;
            for (offset, particle) in chunk.iter_mut().enumerate() {
                let mut velocity = particle.velocity;
                let mut position = particle.position;

                if let Some(direction) = attraction_direction(flock, &particle.position) {
                    velocity += direction * params.attraction;
                    if noise.is_finite() && noise > 0.0 {
                        velocity.x += rng.random_range(-noise..=noise);
                        velocity.y += rng.random_range(-noise..=noise);
                    }
                    velocity = limit_speed(velocity, params.max_speed);
                    position += velocity;
                }
                position = wrap_position(position);

                if is_finite(&position) && is_finite(&velocity) {
                    particle.position = position;
                    particle.velocity = velocity;
                } else {
                    let idx = chunk_idx * PARTICLE_CHUNK + offset;
                    warn!("particle {idx} produced a non-finite state, holding previous tick");
                    held += 1;
                }
            }
            held
        })
        .sum()
}
