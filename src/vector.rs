use nalgebra::Vector3;

/// Rescales `v` to exactly `max_speed` if it is faster, otherwise returns it unchanged.
///
/// A zero (or non-finite) magnitude has no direction to preserve and is passed
/// through as-is, so this never manufactures a NaN out of a finite input.
pub fn limit_speed(v: Vector3<f32>, max_speed: f32) -> Vector3<f32> {
    let speed = v.norm();
    if speed.is_finite() && speed > max_speed {
        v * (max_speed / speed)
    } else {
        v
    }
}

/// Rescales `v` to the given magnitude, or the zero vector if `v` has no usable direction.
pub fn scale_to(v: Vector3<f32>, magnitude: f32) -> Vector3<f32> {
    let length = v.norm();
    if length.is_finite() && length >= f32::MIN_POSITIVE {
        v * (magnitude / length)
    } else {
        Vector3::zeros()
    }
}

/// Toroidal wrap on the [-1, 1] square: leaving one edge snaps to the opposite edge.
///
/// Overshoot is discarded rather than folded back, and `z` is left alone.
pub fn wrap_position(mut p: Vector3<f32>) -> Vector3<f32> {
    if p.x < -1.0 {
        p.x = 1.0;
    }
    if p.x > 1.0 {
        p.x = -1.0;
    }
    if p.y < -1.0 {
        p.y = 1.0;
    }
    if p.y > 1.0 {
        p.y = -1.0;
    }
    p
}

pub fn is_finite(v: &Vector3<f32>) -> bool {
    v.iter().all(|c| c.is_finite())
}
