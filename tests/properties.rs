use murmuration::audio::{SampleQueue, Silence, SineTone, amplitude_from_samples};
use murmuration::leads::{LeadBird, LeadFlock};
use murmuration::particles::{Particle, ParticlePopulation, attraction_direction};
use murmuration::render::{FrameRecorder, NullSink, PositionLog, RenderSink};
use murmuration::{Parameters, Simulation};
use nalgebra::Vector3;

fn params(particle_count: usize, lead_count: usize) -> Parameters {
    Parameters {
        particle_count,
        lead_count,
        ..Parameters::default()
    }
}

#[test]
fn speed_and_containment_hold_every_tick() {
    let mut sim = Simulation::new(params(2000, 5), Some(2024)).unwrap();
    let mut tone = SineTone::new(330.0, 1.0, 60);
    let max_speed = sim.params().max_speed;
    for _ in 0..120 {
        let report = sim.step(&mut tone, &mut NullSink);
        assert_eq!(report.held_leads, 0);
        assert_eq!(report.held_particles, 0);
        for bird in sim.leads().birds() {
            assert!(bird.velocity.norm() <= max_speed + 1e-6);
            assert!(bird.position.x.abs() <= 1.0 && bird.position.y.abs() <= 1.0);
        }
        for p in sim.particles().particles() {
            assert!(p.velocity.norm() <= max_speed + 1e-6);
            assert!(p.position.x.abs() <= 1.0 && p.position.y.abs() <= 1.0);
        }
    }
}

#[test]
fn identical_seeds_give_identical_trajectories() {
    let run = || {
        let mut sim = Simulation::new(params(3000, 4), Some(77)).unwrap();
        let mut queue = SampleQueue::new();
        let mut trace = Vec::new();
        for tick in 0..40 {
            queue.push(vec![(tick * 500) as i16, -((tick * 300) as i16)]);
            sim.step(&mut queue, &mut NullSink);
            trace.push((sim.leads().clone(), sim.particles().clone()));
        }
        trace
    };
    assert_eq!(run(), run());
}

#[test]
fn different_seeds_diverge() {
    let a = Simulation::new(params(100, 2), Some(1)).unwrap();
    let b = Simulation::new(params(100, 2), Some(2)).unwrap();
    assert_ne!(a.particles(), b.particles());
}

#[test]
fn lone_lead_keeps_its_velocity() {
    let lead = LeadBird::new(Vector3::new(0.0, 0.0, 0.0), Vector3::new(0.003, 0.004, 0.0));
    let mut sim = Simulation::from_state(
        params(10, 1),
        LeadFlock::from_birds(vec![lead]),
        ParticlePopulation::from_particles(vec![]),
        0,
    )
    .unwrap();
    for _ in 0..10 {
        sim.step(&mut Silence, &mut NullSink);
        let bird = &sim.leads().birds()[0];
        assert_eq!(bird.velocity, Vector3::new(0.003, 0.004, 0.0));
        assert!(bird.position.iter().all(|c| c.is_finite()));
    }
}

#[test]
fn lead_wraps_at_right_edge() {
    let lead = LeadBird::new(Vector3::new(0.995, 0.0, 0.0), Vector3::new(0.01, 0.0, 0.0));
    let mut sim = Simulation::from_state(
        params(1, 1),
        LeadFlock::from_birds(vec![lead]),
        ParticlePopulation::from_particles(vec![]),
        0,
    )
    .unwrap();
    sim.step(&mut Silence, &mut NullSink);
    assert_eq!(sim.leads().birds()[0].position.x, -1.0);
}

#[test]
fn particle_is_pulled_toward_nearest_lead() {
    let flock = LeadFlock::from_birds(vec![
        LeadBird::new(Vector3::new(0.0, 0.0, 0.0), Vector3::zeros()),
        LeadBird::new(Vector3::new(1.0, 1.0, 0.0), Vector3::zeros()),
    ]);
    let from = Vector3::new(0.1, 0.1, 0.0);
    let direction = attraction_direction(&flock, &from).unwrap();
    let toward_origin = (Vector3::zeros() - from).normalize();
    assert!((direction - toward_origin).norm() < 1e-6);

    let quiet = Parameters {
        noise: 0.0,
        ..params(1, 2)
    };
    let mut sim = Simulation::from_state(
        quiet,
        flock,
        ParticlePopulation::from_particles(vec![Particle::at_rest(from, 5.0)]),
        0,
    )
    .unwrap();
    sim.step(&mut Silence, &mut NullSink);
    let p = &sim.particles().particles()[0];
    assert!(p.position.x < 0.1 && p.position.y < 0.1);
}

#[test]
fn amplitude_of_reference_buffers() {
    assert_eq!(amplitude_from_samples(&[i16::MIN, i16::MIN, 0, 0]), 0.5);
    assert_eq!(amplitude_from_samples(&[]), 0.0);
}

#[test]
fn recorder_writes_numbered_frames() {
    let dir = std::env::temp_dir().join(format!("murmuration-frames-{}", std::process::id()));
    let small = Parameters {
        width: 32,
        height: 32,
        ..params(50, 2)
    };
    let mut sim = Simulation::new(small, Some(3)).unwrap();
    let mut recorder = FrameRecorder::new(&dir, &small)
        .unwrap()
        .with_particle_colours(sim.particles().colours());
    for _ in 0..3 {
        sim.step(&mut Silence, &mut recorder);
    }
    assert_eq!(recorder.frames_written(), 3);
    assert_eq!(recorder.failures(), 0);
    for frame in 0..3 {
        let img = image::open(recorder.frame_path(frame)).unwrap();
        assert_eq!((img.width(), img.height()), (32, 32));
    }
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn trace_matches_simulation_state() {
    let mut sim = Simulation::new(params(20, 2), Some(12)).unwrap();
    let mut log = PositionLog::new(Vec::new());
    sim.step(&mut Silence, &mut log);
    let out = String::from_utf8(log.into_inner().unwrap()).unwrap();
    let line: serde_json::Value = serde_json::from_str(out.trim()).unwrap();
    let first = &line["particles"][0];
    let p = sim.particles().particles()[0].position;
    assert_eq!(first[0].as_f64().unwrap() as f32, p.x);
    assert_eq!(line["leads"].as_array().unwrap().len(), 2);
}
