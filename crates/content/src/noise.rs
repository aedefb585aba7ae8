//! Seeded value noise.
//!
//! Lattice values come from a splitmix64 hash of (seed, x, y), so the same
//! inputs yield the same field on every platform without any RNG state.

/// Splitmix64 finalizer used as a stateless lattice hash.
pub(crate) fn splitmix64(mut state: u64) -> u64 {
    state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Lattice value in `[0, 1)` for integer coordinates.
fn lattice(seed: u64, x: i32, y: i32) -> f32 {
    let key = (x as u32 as u64) | ((y as u32 as u64) << 32);
    let h = splitmix64(seed ^ splitmix64(key));
    // Top 24 bits map exactly onto the f32 mantissa.
    (h >> 40) as f32 / (1u32 << 24) as f32
}

fn smoothstep(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Smoothly interpolated value noise in `[0, 1)`.
pub fn value_noise(seed: u64, x: f32, y: f32) -> f32 {
    let x0 = x.floor();
    let y0 = y.floor();
    let tx = smoothstep(x - x0);
    let ty = smoothstep(y - y0);
    let (ix, iy) = (x0 as i32, y0 as i32);

    let v00 = lattice(seed, ix, iy);
    let v10 = lattice(seed, ix.wrapping_add(1), iy);
    let v01 = lattice(seed, ix, iy.wrapping_add(1));
    let v11 = lattice(seed, ix.wrapping_add(1), iy.wrapping_add(1));

    lerp(lerp(v00, v10, tx), lerp(v01, v11, tx), ty)
}

/// Octave settings for fractal noise.
#[derive(Debug, Clone, Copy)]
pub struct Fbm {
    pub octaves: u32,
    pub frequency: f32,
    pub persistence: f32,
    pub lacunarity: f32,
}

impl Fbm {
    /// Fractal sum of `octaves` value-noise layers, normalized to `[0, 1)`.
    ///
    /// Each octave uses a derived seed so layers are uncorrelated.
    pub fn sample(&self, seed: u64, x: f32, y: f32) -> f32 {
        let mut sum = 0.0;
        let mut norm = 0.0;
        let mut amp = 1.0;
        let mut freq = self.frequency;
        for octave in 0..self.octaves {
            let octave_seed = splitmix64(seed.wrapping_add(octave as u64));
            sum += amp * value_noise(octave_seed, x * freq, y * freq);
            norm += amp;
            amp *= self.persistence;
            freq *= self.lacunarity;
        }
        if norm > 0.0 { sum / norm } else { 0.0 }
    }
}
