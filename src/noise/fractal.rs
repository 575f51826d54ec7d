//! Multi-octave fractal and ridged noise over 2D world coordinates.

use simdnoise::NoiseBuilder;

/// Scales at or below this are treated as degenerate and replaced with [`MIN_SCALE`].
pub const SCALE_EPSILON: f32 = 1e-5;
/// Replacement scale used for degenerate inputs.
pub const MIN_SCALE: f32 = 1e-4;

#[inline]
pub(crate) fn sanitize_scale(scale: f32) -> f32 {
    if scale.is_finite() && scale > SCALE_EPSILON {
        scale
    } else {
        MIN_SCALE
    }
}

#[inline]
fn octave_seed(seed: i32, octave: u32) -> i32 {
    seed.wrapping_add(octave as i32 * 31337)
}

/// Single gradient-noise sample mapped into [0, 1].
#[inline]
pub fn gradient01(x: f32, y: f32, seed: i32) -> f32 {
    let v = NoiseBuilder::fbm_2d_offset(x, 1, y, 1)
        .with_seed(seed)
        .with_freq(1.0)
        .with_octaves(1)
        .generate()
        .0[0];
    (v * 0.5 + 0.5).clamp(0.0, 1.0)
}

/// Samples fractal Brownian motion at a 2D world position.
///
/// Each octave samples gradient noise with its own seed, the running sum is
/// normalized by the accumulated amplitude so the result stays in [0, 1].
pub fn fractal(
    x: f32,
    y: f32,
    octaves: u32,
    persistence: f32,
    lacunarity: f32,
    scale: f32,
    seed: i32,
) -> f32 {
    let scale = sanitize_scale(scale);
    let mut total = 0.0f32;
    let mut amplitude = 1.0f32;
    let mut frequency = 1.0f32;
    let mut max_amplitude = 0.0f32;

    for octave in 0..octaves {
        let sx = x / scale * frequency;
        let sy = y / scale * frequency;
        total += gradient01(sx, sy, octave_seed(seed, octave)) * amplitude;
        max_amplitude += amplitude;
        amplitude *= persistence;
        frequency *= lacunarity;
    }

    if max_amplitude > 0.0 {
        (total / max_amplitude).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Samples ridged multifractal noise at a 2D world position.
///
/// Per octave the signal is `(1 - |2v - 1|)^2`, weighted by the previous
/// octave's clamped `signal * gain`. Sharp crests appear where `v` crosses 0.5.
#[allow(clippy::too_many_arguments)]
pub fn ridged(
    x: f32,
    y: f32,
    octaves: u32,
    persistence: f32,
    lacunarity: f32,
    scale: f32,
    seed: i32,
    gain: f32,
) -> f32 {
    let scale = sanitize_scale(scale);
    let mut total = 0.0f32;
    let mut amplitude = 1.0f32;
    let mut frequency = 1.0f32;
    let mut max_amplitude = 0.0f32;
    let mut weight = 1.0f32;

    for octave in 0..octaves {
        let sx = x / scale * frequency;
        let sy = y / scale * frequency;
        let v = gradient01(sx, sy, octave_seed(seed, octave));

        let ridge = 1.0 - (2.0 * v - 1.0).abs();
        let signal = ridge * ridge * weight;
        weight = (signal * gain).clamp(0.0, 1.0);

        total += signal * amplitude;
        max_amplitude += amplitude;
        amplitude *= persistence;
        frequency *= lacunarity;
    }

    if max_amplitude > 0.0 {
        (total / max_amplitude).clamp(0.0, 1.0)
    } else {
        0.0
    }
}
