use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::GenerationError;

/// Largest supported grid resolution (vertices per side).
pub const MAX_RESOLUTION: u32 = 2048;

static NEXT_VERSION: AtomicU64 = AtomicU64::new(1);

/// Versions are drawn from one process-wide counter, so a version names a
/// single parameter state across every `ProceduralParameters` value.
fn next_version() -> u64 {
    NEXT_VERSION.fetch_add(1, Ordering::Relaxed)
}

/// Inputs of the procedural generator.
///
/// Immutable within a frame. Every mutation between frames, whether from an
/// external setter, a builder or [`ProceduralParameters::evolve`], takes a
/// fresh `version`; GPU resources carry the version they were built from and
/// are regenerated when it no longer matches. Two values share a version only
/// when one is a clone of the other with no mutation since.
///
/// Equality compares the parameters themselves and ignores the version.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProceduralParameters {
    seed: u64,
    /// Vertices per side of the heightfield; texture uses the same size.
    resolution: u32,
    octaves: u32,
    frequency: f32,
    /// Height of the tallest possible peak in world units.
    amplitude: f32,
    persistence: f32,
    lacunarity: f32,
    /// Animation phase; scrolls the noise domain.
    time: f32,
    /// Phase advance per second applied by `evolve`. Zero freezes the content.
    speed: f32,
    #[serde(skip, default = "next_version")]
    version: u64,
}

impl Default for ProceduralParameters {
    fn default() -> Self {
        Self {
            seed: 42,
            resolution: 64,
            octaves: 4,
            frequency: 3.0,
            amplitude: 0.35,
            persistence: 0.5,
            lacunarity: 2.0,
            time: 0.0,
            speed: 0.25,
            version: next_version(),
        }
    }
}

impl PartialEq for ProceduralParameters {
    fn eq(&self, other: &Self) -> bool {
        self.seed == other.seed
            && self.resolution == other.resolution
            && self.octaves == other.octaves
            && self.frequency == other.frequency
            && self.amplitude == other.amplitude
            && self.persistence == other.persistence
            && self.lacunarity == other.lacunarity
            && self.time == other.time
            && self.speed == other.speed
    }
}

impl ProceduralParameters {
    /// Parameters with the given seed and resolution, defaults elsewhere.
    pub fn new(seed: u64, resolution: u32) -> Self {
        Self {
            seed,
            resolution,
            ..Default::default()
        }
    }

    pub fn with_octaves(mut self, octaves: u32) -> Self {
        self.octaves = octaves;
        self.bump();
        self
    }

    pub fn with_frequency(mut self, frequency: f32) -> Self {
        self.frequency = frequency;
        self.bump();
        self
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self.bump();
        self
    }

    pub fn with_time(mut self, time: f32) -> Self {
        self.time = time;
        self.bump();
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn octaves(&self) -> u32 {
        self.octaves
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn amplitude(&self) -> f32 {
        self.amplitude
    }

    pub fn persistence(&self) -> f32 {
        self.persistence
    }

    pub fn lacunarity(&self) -> f32 {
        self.lacunarity
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Version of this parameter state; increases on every mutation and is
    /// never shared with an unrelated value.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn set_seed(&mut self, seed: u64) {
        self.seed = seed;
        self.bump();
    }

    pub fn set_resolution(&mut self, resolution: u32) {
        self.resolution = resolution;
        self.bump();
    }

    pub fn set_time(&mut self, time: f32) {
        self.time = time;
        self.bump();
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
        self.bump();
    }

    /// Internal evolution rule: advance the animation phase by `dt * speed`.
    ///
    /// Returns true when the parameters changed (and the version was bumped).
    pub fn evolve(&mut self, dt: f32) -> bool {
        if self.speed == 0.0 || dt <= 0.0 || !dt.is_finite() {
            return false;
        }
        self.time += dt * self.speed;
        self.bump();
        true
    }

    /// Reject zero-sized or degenerate inputs before any buffer is produced.
    pub fn validate(&self) -> Result<(), GenerationError> {
        let invalid = |msg: String| Err(GenerationError::InvalidParameters(msg));
        if self.resolution < 2 {
            return invalid(format!(
                "resolution must be at least 2, got {}",
                self.resolution
            ));
        }
        if self.resolution > MAX_RESOLUTION {
            return invalid(format!(
                "resolution {} exceeds maximum {MAX_RESOLUTION}",
                self.resolution
            ));
        }
        if self.octaves == 0 {
            return invalid("octaves must be at least 1".into());
        }
        if !(self.frequency.is_finite() && self.frequency > 0.0) {
            return invalid(format!("frequency must be positive, got {}", self.frequency));
        }
        if !(self.lacunarity.is_finite() && self.lacunarity > 0.0) {
            return invalid(format!(
                "lacunarity must be positive, got {}",
                self.lacunarity
            ));
        }
        if !self.amplitude.is_finite() || !self.persistence.is_finite() || !self.time.is_finite()
        {
            return invalid("amplitude, persistence and time must be finite".into());
        }
        Ok(())
    }

    fn bump(&mut self) {
        self.version = next_version();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let p = ProceduralParameters::default();
        assert!(p.validate().is_ok());
        assert!(p.version() > 0);
    }

    #[test]
    fn setters_bump_version() {
        let mut p = ProceduralParameters::new(1, 16);
        let v = p.version();
        p.set_seed(2);
        let after_seed = p.version();
        p.set_resolution(32);
        assert!(after_seed > v);
        assert!(p.version() > after_seed);
        assert_eq!(p.seed(), 2);
        assert_eq!(p.resolution(), 32);
    }

    #[test]
    fn evolve_advances_time() {
        let mut p = ProceduralParameters::new(1, 16).with_speed(2.0);
        let v = p.version();
        assert!(p.evolve(0.5));
        assert_eq!(p.time(), 1.0);
        assert!(p.version() > v);
    }

    #[test]
    fn evolve_is_noop_when_frozen() {
        let mut p = ProceduralParameters::new(1, 16).with_speed(0.0);
        let v = p.version();
        assert!(!p.evolve(0.5));
        assert_eq!(p.version(), v);
        let mut q = ProceduralParameters::new(1, 16);
        assert!(!q.evolve(0.0));
        assert!(!q.evolve(f32::NAN));
    }

    #[test]
    fn separate_parameter_sets_never_share_a_version() {
        let a = ProceduralParameters::new(1, 16);
        let b = ProceduralParameters::new(2, 16);
        let c = ProceduralParameters::default();
        assert_ne!(a.version(), b.version());
        assert_ne!(b.version(), c.version());
        assert_ne!(a.version(), c.version());
    }

    #[test]
    fn builders_bump_version() {
        let p = ProceduralParameters::new(1, 16);
        let v = p.version();
        let q = p.with_octaves(6);
        assert!(q.version() > v);
        let w = q.version();
        let r = q.with_speed(0.0).with_time(2.0).with_frequency(1.5);
        assert!(r.version() > w);
    }

    #[test]
    fn clones_share_version_until_mutated() {
        let a = ProceduralParameters::new(3, 8);
        let mut b = a.clone();
        assert_eq!(a.version(), b.version());
        b.set_seed(4);
        assert_ne!(a.version(), b.version());
    }

    #[test]
    fn equality_ignores_version() {
        let a = ProceduralParameters::new(5, 8);
        let b = ProceduralParameters::new(5, 8);
        assert_ne!(a.version(), b.version());
        assert_eq!(a, b);
        assert_ne!(a, ProceduralParameters::new(6, 8));
    }

    #[test]
    fn zero_resolution_is_invalid() {
        let p = ProceduralParameters::new(1, 0);
        assert!(matches!(
            p.validate(),
            Err(GenerationError::InvalidParameters(_))
        ));
    }

    #[test]
    fn degenerate_parameters_are_invalid() {
        assert!(ProceduralParameters::new(1, 1).validate().is_err());
        assert!(ProceduralParameters::new(1, MAX_RESOLUTION + 1).validate().is_err());
        assert!(ProceduralParameters::new(1, 8).with_octaves(0).validate().is_err());
        assert!(ProceduralParameters::new(1, 8).with_frequency(0.0).validate().is_err());
        assert!(ProceduralParameters::new(1, 8)
            .with_frequency(f32::INFINITY)
            .validate()
            .is_err());
        assert!(ProceduralParameters::new(1, 8).with_time(f32::NAN).validate().is_err());
    }
}
