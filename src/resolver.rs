//! Grain start position providers.

use rand::{rngs::SmallRng, Rng, SeedableRng};

// -------------------------------------------------------------------------------------------------

/// Decides where in each sample a new grain starts.
///
/// Called by a cluster on the render thread whenever it triggers a fresh grain. Implementations
/// must not block or allocate. Both slices have one slot per sample of the cluster's sample set:
/// `positions` comes prefilled with `-1.0` (sample not used) and `volumes` with `0.0`.
///
/// Positions are normalized to `0..=1` within the sample. Any negative position leaves the sample
/// out of the grain. Implementations may also use the call as notification that a grain of the
/// given voice got triggered, e.g. to forward it to a visualization.
///
/// Closures with the same signature as [`resolve`](Self::resolve) are resolvers too.
pub trait PositionResolver: Send + 'static {
    fn resolve(
        &mut self,
        voice_index: usize,
        duration_ms: f32,
        positions: &mut [f64],
        volumes: &mut [f32],
    );
}

impl<F> PositionResolver for F
where
    F: FnMut(usize, f32, &mut [f64], &mut [f32]) + Send + 'static,
{
    fn resolve(
        &mut self,
        voice_index: usize,
        duration_ms: f32,
        positions: &mut [f64],
        volumes: &mut [f32],
    ) {
        self(voice_index, duration_ms, positions, volumes)
    }
}

// -------------------------------------------------------------------------------------------------

/// Resolver which always plays the same positions with the same volumes.
#[derive(Debug, Clone)]
pub struct FixedPositions {
    positions: Vec<f64>,
    volumes: Vec<f32>,
}

impl FixedPositions {
    /// Create a new resolver. Samples without a position or volume entry are not used.
    pub fn new(positions: Vec<f64>, volumes: Vec<f32>) -> Self {
        Self { positions, volumes }
    }

    /// Play every sample from the same position with full volume.
    pub fn uniform(sample_count: usize, position: f64) -> Self {
        Self::new(vec![position; sample_count], vec![1.0; sample_count])
    }
}

impl PositionResolver for FixedPositions {
    fn resolve(
        &mut self,
        _voice_index: usize,
        _duration_ms: f32,
        positions: &mut [f64],
        volumes: &mut [f32],
    ) {
        for (dest, src) in positions.iter_mut().zip(&self.positions) {
            *dest = *src;
        }
        for (dest, src) in volumes.iter_mut().zip(&self.volumes) {
            *dest = *src;
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Resolver which places grains randomly around a center position per sample.
///
/// Each trigger picks `center + spread * r` with `r` uniformly in `-1..=1`, clamped to the
/// sample bounds. Samples with a negative center are not used.
pub struct ScatteredPositions {
    centers: Vec<f64>,
    volumes: Vec<f32>,
    spread: f64,
    rng: SmallRng,
}

impl ScatteredPositions {
    /// Create a new resolver with full volume for all samples. Pass a seed to get reproducible
    /// grain positions.
    pub fn new(centers: Vec<f64>, spread: f64, seed: Option<u64>) -> Self {
        let volumes = vec![1.0; centers.len()];
        let rng = match seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };
        Self {
            centers,
            volumes,
            spread: spread.clamp(0.0, 1.0),
            rng,
        }
    }

    /// Set individual volumes for the samples.
    pub fn with_volumes(mut self, volumes: Vec<f32>) -> Self {
        self.volumes = volumes;
        self
    }

    pub fn spread(&self) -> f64 {
        self.spread
    }

    pub fn set_spread(&mut self, spread: f64) {
        self.spread = spread.clamp(0.0, 1.0);
    }

    /// Move the center of the given sample. Negative values disable the sample.
    pub fn set_center(&mut self, sample_index: usize, center: f64) {
        if let Some(value) = self.centers.get_mut(sample_index) {
            *value = center.min(1.0);
        }
    }
}

impl PositionResolver for ScatteredPositions {
    fn resolve(
        &mut self,
        _voice_index: usize,
        _duration_ms: f32,
        positions: &mut [f64],
        volumes: &mut [f32],
    ) {
        for (index, (position, volume)) in positions.iter_mut().zip(volumes.iter_mut()).enumerate()
        {
            let Some(center) = self.centers.get(index).copied() else {
                continue;
            };
            if center < 0.0 {
                continue;
            }
            let offset = if self.spread > 0.0 {
                self.rng.random_range(-1.0..=1.0) * self.spread
            } else {
                0.0
            };
            *position = (center + offset).clamp(0.0, 1.0);
            *volume = self.volumes.get(index).copied().unwrap_or(1.0);
        }
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_positions() {
        let mut resolver = FixedPositions::new(vec![0.25, -1.0], vec![0.5, 1.0]);
        let mut positions = [-1.0; 3];
        let mut volumes = [0.0; 3];
        resolver.resolve(0, 100.0, &mut positions, &mut volumes);
        assert_eq!(positions, [0.25, -1.0, -1.0]);
        assert_eq!(volumes, [0.5, 1.0, 0.0]);
    }

    #[test]
    fn scattered_positions() {
        let mut resolver =
            ScatteredPositions::new(vec![0.5, -1.0], 0.1, Some(1234)).with_volumes(vec![0.5]);
        let mut positions = [-1.0; 2];
        let mut volumes = [0.0; 2];
        for _ in 0..100 {
            resolver.resolve(0, 100.0, &mut positions, &mut volumes);
            assert!((0.4..=0.6).contains(&positions[0]));
            assert_eq!(positions[1], -1.0);
            assert_eq!(volumes, [0.5, 0.0]);
        }

        // same seed, same positions
        let mut a = ScatteredPositions::new(vec![0.5], 1.0, Some(1));
        let mut b = ScatteredPositions::new(vec![0.5], 1.0, Some(1));
        let (mut pa, mut pb) = ([-1.0], [-1.0]);
        let (mut va, mut vb) = ([0.0], [0.0]);
        for _ in 0..10 {
            a.resolve(0, 1.0, &mut pa, &mut va);
            b.resolve(0, 1.0, &mut pb, &mut vb);
            assert_eq!(pa, pb);
            assert!((0.0..=1.0).contains(&pa[0]));
        }
    }

    #[test]
    fn moving_scattered_positions() {
        let mut resolver = ScatteredPositions::new(vec![0.5, 0.5], 0.0, Some(3));
        let mut positions = [-1.0; 2];
        let mut volumes = [0.0; 2];
        resolver.resolve(0, 100.0, &mut positions, &mut volumes);
        assert_eq!(positions, [0.5, 0.5]);

        // centers follow, negative centers disable the sample
        resolver.set_center(0, 0.75);
        resolver.set_center(1, -1.0);
        resolver.set_center(5, 0.1);
        let (mut positions, mut volumes) = ([-1.0; 2], [0.0; 2]);
        resolver.resolve(0, 100.0, &mut positions, &mut volumes);
        assert_eq!(positions, [0.75, -1.0]);
        assert_eq!(volumes, [1.0, 0.0]);

        // spray around the moved center
        resolver.set_spread(2.0);
        assert_eq!(resolver.spread(), 1.0);
        resolver.set_spread(0.05);
        assert_eq!(resolver.spread(), 0.05);
        for _ in 0..100 {
            resolver.resolve(0, 100.0, &mut positions, &mut volumes);
            assert!((0.7..=0.8).contains(&positions[0]));
        }

        // beyond the end
        resolver.set_spread(0.0);
        resolver.set_center(0, 3.0);
        resolver.resolve(0, 100.0, &mut positions, &mut volumes);
        assert_eq!(positions[0], 1.0);
    }

    #[test]
    fn closure_resolver() {
        let mut calls = 0;
        let mut resolver = move |voice: usize, _: f32, positions: &mut [f64], volumes: &mut [f32]| {
            calls += 1;
            positions[0] = voice as f64 / 10.0;
            volumes[0] = calls as f32;
        };
        let mut positions = [-1.0];
        let mut volumes = [0.0];
        PositionResolver::resolve(&mut resolver, 3, 10.0, &mut positions, &mut volumes);
        PositionResolver::resolve(&mut resolver, 3, 10.0, &mut positions, &mut volumes);
        assert_eq!(positions, [0.3]);
        assert_eq!(volumes, [2.0]);
    }
}
