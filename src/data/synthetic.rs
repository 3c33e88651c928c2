//! Synthetic length sets with known structure for testing and demos.

use crate::data::LengthSet;
use crate::error::Result;
use crate::rng::Rng;

/// Draw lengths from a mixture of normals.
///
/// Each group is `(count, mean, std)`. Draws are rounded and floored at 1 so
/// every length is valid. Groups are emitted in order.
pub fn normal_mixture(groups: &[(usize, f64, f64)], seed: u64) -> Vec<u64> {
    let mut rng = Rng::new(seed);
    let mut lengths = Vec::with_capacity(groups.iter().map(|g| g.0).sum());
    for &(count, mean, std) in groups {
        for _ in 0..count {
            let draw = rng.next_normal(mean, std).round().max(1.0);
            lengths.push(draw as u64);
        }
    }
    lengths
}

/// Wrap lengths into a set with ids `contig_1`, `contig_2`, ...
pub fn length_set_from(lengths: &[u64]) -> Result<LengthSet> {
    LengthSet::new(
        lengths
            .iter()
            .enumerate()
            .map(|(i, &len)| (format!("contig_{}", i + 1), len)),
    )
}

/// A seeded mixture as a [`LengthSet`].
pub fn mixture_set(groups: &[(usize, f64, f64)], seed: u64) -> Result<LengthSet> {
    length_set_from(&normal_mixture(groups, seed))
}
