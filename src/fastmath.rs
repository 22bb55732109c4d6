// SmartWake - Fixed-Cost Math Approximations
//
// The aggregator computes a magnitude for every raw reading (10 Hz, all night)
// and the detector a standard deviation on every tick, so both use the
// bit-trick square root below instead of a libm call.

const SQRT_MAGIC: u32 = 0x5f37_59df;

/// Newton refinements applied to the inverse square root guess.
pub const NEWTON_ITERATIONS: usize = 3;

/// Worst-case relative error of [`approx_sqrt`] for inputs in `[1, 1e6]`.
pub const APPROX_SQRT_MAX_REL_ERROR: f32 = 1e-4;

/// Approximate `sqrt(x)` from a magic-constant inverse square root guess
/// followed by [`NEWTON_ITERATIONS`] Newton steps.
///
/// Zero, negative and non-finite inputs return `0.0`.
pub fn approx_sqrt(x: f32) -> f32 {
    if !x.is_finite() || x <= 0.0 {
        return 0.0;
    }

    let half = 0.5 * x;
    let mut inv = f32::from_bits(SQRT_MAGIC.wrapping_sub(x.to_bits() >> 1));
    for _ in 0..NEWTON_ITERATIONS {
        inv *= 1.5 - half * inv * inv;
    }
    x * inv
}

/// Euclidean length of a 3-vector.
pub fn magnitude(x: f32, y: f32, z: f32) -> f32 {
    approx_sqrt(x * x + y * y + z * z)
}
