use rand::rngs::StdRng;
use rand::SeedableRng;

/// Simulation RNG; a fixed seed gives reproducible runs
///
/// `stream` separates components sharing one configured seed.
pub fn sim_rng(seed: Option<u64>, stream: u64) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(stream)),
        None => StdRng::from_entropy(),
    }
}
