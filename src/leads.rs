use log::warn;
use nalgebra::Vector3;
use rand::prelude::*;

use crate::Parameters;
use crate::vector::{is_finite, limit_speed, scale_to, wrap_position};

#[derive(Debug, Clone, PartialEq)]
pub struct LeadBird {
    pub position: Vector3<f32>,
    pub velocity: Vector3<f32>,
}

impl LeadBird {
    pub fn new(position: Vector3<f32>, velocity: Vector3<f32>) -> Self {
        LeadBird { position, velocity }
    }
}

/// The autonomous agents. Size is fixed for the life of the flock.
#[derive(Debug, Clone, PartialEq)]
pub struct LeadFlock {
    birds: Vec<LeadBird>,
}

impl LeadFlock {
    pub fn from_birds(birds: Vec<LeadBird>) -> Self {
        LeadFlock { birds }
    }

    /// Spawns `count` leads uniformly over the square with small random velocities.
    pub fn random<R: Rng>(count: usize, initial_speed: f32, rng: &mut R) -> Self {
        let birds = (0..count)
            .map(|_| {
                LeadBird::new(
                    Vector3::new(
                        rng.random_range(-1.0..=1.0),
                        rng.random_range(-1.0..=1.0),
                        0.0,
                    ),
                    Vector3::new(
                        rng.random_range(-initial_speed..=initial_speed),
                        rng.random_range(-initial_speed..=initial_speed),
                        0.0,
                    ),
                )
            })
            .collect();
        LeadFlock { birds }
    }

    pub fn birds(&self) -> &[LeadBird] {
        &self.birds
    }

    pub fn len(&self) -> usize {
        self.birds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.birds.is_empty()
    }

    pub fn positions(&self) -> Vec<Vector3<f32>> {
        self.birds.iter().map(|bird| bird.position).collect()
    }

    /// Index of the lead closest to `point`, or `None` for an empty flock.
    ///
    /// Ties go to the lowest index.
    pub fn nearest(&self, point: &Vector3<f32>) -> Option<usize> {
        let mut nearest = None;
        let mut min_distance = f32::MAX;
        for (idx, bird) in self.birds.iter().enumerate() {
            let distance = (bird.position - point).norm();
            if distance < min_distance {
                min_distance = distance;
                nearest = Some(idx);
            }
        }
        nearest
    }
}

/// Turns an averaged rule vector into a steering correction.
///
/// A vector with no direction contributes nothing.
fn steer(desired: Vector3<f32>, velocity: &Vector3<f32>, max_speed: f32) -> Vector3<f32> {
    let desired = scale_to(desired, max_speed);
    if desired == Vector3::zeros() {
        return desired;
    }
    limit_speed(desired - velocity, max_speed)
}

/// Advances every lead by one tick and returns how many kept their previous state
/// because the new one came out non-finite.
///
/// All leads move first; steering is then computed against that moved snapshot
/// (with everyone's previous velocities) and committed at once, so the order the
/// flock is stored in has no effect on the outcome.
pub fn update_leads(flock: &mut LeadFlock, params: &Parameters) -> usize {
    let max_speed = params.max_speed;
    let moved: Vec<Vector3<f32>> = flock
        .birds
        .iter()
        .map(|bird| wrap_position(bird.position + bird.velocity))
        .collect();

    let new_states: Vec<(Vector3<f32>, Vector3<f32>)> = flock
        .birds
        .iter()
        .enumerate()
        .map(|(bird_idx, bird)| {
            let position = moved[bird_idx];

            let mut separation = Vector3::zeros();
            let mut alignment = Vector3::zeros();
            let mut cohesion = Vector3::zeros();
            let mut separation_count = 0;
            let mut alignment_count = 0;
            let mut cohesion_count = 0;

            for (other_idx, other) in flock.birds.iter().enumerate() {
                if other_idx == bird_idx {
                    continue;
                }
                let other_position = moved[other_idx];
                let distance = (position - other_position).norm();

                if distance < params.separation_radius {
                    separation += position - other_position;
                    separation_count += 1;
                }
                if distance < params.alignment_radius {
                    alignment += other.velocity;
                    alignment_count += 1;
                }
                if distance < params.cohesion_radius {
                    cohesion += other_position;
                    cohesion_count += 1;
                }
            }

            if separation_count > 0 {
                separation = steer(
                    separation / separation_count as f32,
                    &bird.velocity,
                    max_speed,
                );
            }
            if alignment_count > 0 {
                alignment = steer(
                    alignment / alignment_count as f32,
                    &bird.velocity,
                    max_speed,
                );
            }
            if cohesion_count > 0 {
                cohesion = steer(
                    cohesion / cohesion_count as f32 - position,
                    &bird.velocity,
                    max_speed,
                );
            }

            let velocity = limit_speed(
                bird.velocity
                    + separation * params.separation_weight
                    + alignment * params.alignment_weight
                    + cohesion * params.cohesion_weight,
                max_speed,
            );
            (position, velocity)
        })
        .collect();

    let mut held = 0;
    for (idx, (bird, (position, velocity))) in
        flock.birds.iter_mut().zip(new_states).enumerate()
    {
        if is_finite(&position) && is_finite(&velocity) {
            bird.position = position;
            bird.velocity = velocity;
        } else {
            warn!("lead {idx} produced a non-finite state, holding previous tick");
            held += 1;
        }
    }
    held
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::ChaCha8Rng;

    fn bird(x: f32, y: f32, vx: f32, vy: f32) -> LeadBird {
        LeadBird::new(Vector3::new(x, y, 0.0), Vector3::new(vx, vy, 0.0))
    }

    #[test]
    fn random_flock_is_inside_bounds() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let flock = LeadFlock::random(5, 0.01, &mut rng);
        assert_eq!(flock.len(), 5);
        for bird in flock.birds() {
            assert!(bird.position.x.abs() <= 1.0 && bird.position.y.abs() <= 1.0);
            assert!(bird.velocity.x.abs() <= 0.01 && bird.velocity.y.abs() <= 0.01);
            assert_eq!(bird.position.z, 0.0);
            assert_eq!(bird.velocity.z, 0.0);
        }
    }

    #[test]
    fn lone_lead_only_moves() {
        let params = Parameters::default();
        let mut flock = LeadFlock::from_birds(vec![bird(0.0, 0.0, 0.004, -0.003)]);
        let held = update_leads(&mut flock, &params);
        assert_eq!(held, 0);
        let b = &flock.birds()[0];
        assert_eq!(b.velocity, Vector3::new(0.004, -0.003, 0.0));
        assert!((b.position - Vector3::new(0.004, -0.003, 0.0)).norm() < 1e-7);
    }

    #[test]
    fn distant_leads_do_not_interact() {
        let params = Parameters::default();
        let mut flock = LeadFlock::from_birds(vec![
            bird(-0.8, -0.8, 0.001, 0.0),
            bird(0.8, 0.8, 0.0, 0.001),
        ]);
        update_leads(&mut flock, &params);
        assert_eq!(flock.birds()[0].velocity, Vector3::new(0.001, 0.0, 0.0));
        assert_eq!(flock.birds()[1].velocity, Vector3::new(0.0, 0.001, 0.0));
    }

    #[test]
    fn close_leads_push_apart() {
        let params = Parameters::default();
        let mut flock = LeadFlock::from_birds(vec![
            bird(-0.02, 0.0, 0.0, 0.0),
            bird(0.02, 0.0, 0.0, 0.0),
        ]);
        update_leads(&mut flock, &params);
        // Separation carries weight 1.5 against cohesion's 1.0 pull.
        assert!(flock.birds()[0].velocity.x < 0.0);
        assert!(flock.birds()[1].velocity.x > 0.0);
    }

    #[test]
    fn coincident_leads_stay_finite() {
        let params = Parameters::default();
        let mut flock = LeadFlock::from_birds(vec![
            bird(0.3, 0.3, 0.0, 0.0),
            bird(0.3, 0.3, 0.0, 0.0),
            bird(0.3, 0.3, 0.0, 0.0),
        ]);
        let held = update_leads(&mut flock, &params);
        assert_eq!(held, 0);
        for b in flock.birds() {
            assert!(is_finite(&b.position) && is_finite(&b.velocity));
            assert_eq!(b.velocity, Vector3::zeros());
        }
    }

    #[test]
    fn storage_order_does_not_change_outcome() {
        let params = Parameters::default();
        let birds = vec![
            bird(0.0, 0.0, 0.005, 0.001),
            bird(0.05, 0.02, -0.002, 0.004),
            bird(0.1, -0.1, 0.003, -0.006),
        ];
        let mut forward = LeadFlock::from_birds(birds.clone());
        let mut reversed = LeadFlock::from_birds(birds.into_iter().rev().collect());
        for _ in 0..20 {
            update_leads(&mut forward, &params);
            update_leads(&mut reversed, &params);
        }
        let mut reversed_birds = reversed.birds().to_vec();
        reversed_birds.reverse();
        assert_eq!(forward.birds(), reversed_birds.as_slice());
    }

    #[test]
    fn speed_stays_bounded() {
        let params = Parameters::default();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut flock = LeadFlock::random(5, 0.05, &mut rng);
        for _ in 0..200 {
            update_leads(&mut flock, &params);
            for b in flock.birds() {
                assert!(b.velocity.norm() <= params.max_speed + 1e-6);
                assert!(b.position.x.abs() <= 1.0 && b.position.y.abs() <= 1.0);
            }
        }
    }

    #[test]
    fn non_finite_state_is_held() {
        let params = Parameters::default();
        let stuck = bird(0.5, 0.5, f32::NAN, 0.0);
        let mut flock = LeadFlock::from_birds(vec![stuck.clone()]);
        let held = update_leads(&mut flock, &params);
        assert_eq!(held, 1);
        assert_eq!(flock.birds()[0].position, stuck.position);
    }

    #[test]
    fn nearest_picks_closest_lead() {
        let flock = LeadFlock::from_birds(vec![bird(0.0, 0.0, 0.0, 0.0), bird(1.0, 1.0, 0.0, 0.0)]);
        assert_eq!(flock.nearest(&Vector3::new(0.1, 0.1, 0.0)), Some(0));
        assert_eq!(flock.nearest(&Vector3::new(0.9, 0.8, 0.0)), Some(1));
        assert_eq!(LeadFlock::from_birds(vec![]).nearest(&Vector3::zeros()), None);
    }
}
