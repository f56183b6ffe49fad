use log::{debug, info};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::audio::AmplitudeSource;
use crate::leads::{LeadFlock, update_leads};
use crate::particles::{ParticlePopulation, update_particles};
use crate::render::RenderSink;
use crate::{ConfigError, Parameters};

/// What happened during one [`Simulation::step`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    pub amplitude: f32,
    pub held_leads: usize,
    pub held_particles: usize,
}

/// Owns the flock and the followers and advances them one tick at a time.
pub struct Simulation {
    params: Parameters,
    leads: LeadFlock,
    particles: ParticlePopulation,
    rng: ChaCha8Rng,
    tick: u64,
}

impl Simulation {
    /// Spawns a fresh flock and population. Without a seed the run is seeded from the OS.
    pub fn new(params: Parameters, seed: Option<u64>) -> Result<Self, ConfigError> {
        params.validate()?;
        let seed = seed.unwrap_or_else(|| rand::rng().random());
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let leads = LeadFlock::random(params.lead_count, params.lead_initial_speed, &mut rng);
        let particles =
            ParticlePopulation::random(params.particle_count, params.particle_size, &mut rng);
        info!(
            "spawned {} leads and {} particles (seed {seed})",
            leads.len(),
            particles.len()
        );
        Ok(Simulation {
            params,
            leads,
            particles,
            rng,
            tick: 0,
        })
    }

    /// Starts from a given state instead of a random spawn.
    pub fn from_state(
        params: Parameters,
        leads: LeadFlock,
        particles: ParticlePopulation,
        seed: u64,
    ) -> Result<Self, ConfigError> {
        params.validate()?;
        Ok(Simulation {
            params,
            leads,
            particles,
            rng: ChaCha8Rng::seed_from_u64(seed),
            tick: 0,
        })
    }

    /// Leads, then amplitude, then followers, then hand the positions to `sink`.
    pub fn step(
        &mut self,
        source: &mut dyn AmplitudeSource,
        sink: &mut dyn RenderSink,
    ) -> TickReport {
        let held_leads = update_leads(&mut self.leads, &self.params);

        let amplitude = source.poll();
        debug!("tick {} audio amplitude {amplitude:.4}", self.tick);

        let tick_seed: u64 = self.rng.random();
        let held_particles = update_particles(
            &mut self.particles,
            &self.leads,
            amplitude,
            &self.params,
            tick_seed,
        );

        sink.submit(&self.leads.positions(), &self.particles.positions());

        let report = TickReport {
            tick: self.tick,
            amplitude,
            held_leads,
            held_particles,
        };
        self.tick += 1;
        report
    }

    pub fn params(&self) -> &Parameters {
        &self.params
    }

    pub fn leads(&self) -> &LeadFlock {
        &self.leads
    }

    pub fn particles(&self) -> &ParticlePopulation {
        &self.particles
    }

    /// Ticks completed so far.
    pub fn tick(&self) -> u64 {
        self.tick
    }
}
