//! Seeded weighted history generator (`spec.md` §4.6).
//!
//! Grounded on `oxcrypt-mount::testing::generators` (the teacher's own
//! property-test fixture generator module: small pure functions over
//! `rand::Rng`, a `#[cfg(test)]` module exercising each one) with one
//! deliberate departure: an explicit `rand_chacha::ChaCha8Rng` seeded from
//! a `u64` rather than thread-local `rand::rng()`, since reproducibility
//! across re-runs and `--history FILE` replay is load-bearing here, unlike
//! the teacher's fixtures which only need *a* random value.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use fsmodel_core::Path;

use crate::event::{Invocation, Op, OpId};

/// The small path-component domain `spec.md` §4.6 calls for: collisions
/// and aliasing between operations are the point, so the domain stays
/// tiny on purpose.
const PATH_COMPONENTS: [&str; 2] = ["a", "b"];

/// Maximum path depth the generator produces (`spec.md` §4.6: "length 1
/// or 2").
const MAX_PATH_DEPTH: usize = 2;

/// Maximum length, in bytes, of generated file content.
const MAX_DATA_LEN: usize = 4;

/// Bound on the magnitude of a generated `truncate` delta.
const MAX_TRUNCATE_DELTA: i64 = 8;

#[derive(Debug, Clone, Copy)]
enum OpKind {
    Read,
    Touch,
    Append,
    Write,
    Mkdir,
    Mv,
    Rm,
    Ln,
    Truncate,
    Fsync,
    LoseUnfsyncedWrites,
}

impl OpKind {
    /// Weight from the table in `spec.md` §4.6: `read` is favored 5:1 over
    /// every mutating op, and `lose_unfsynced_writes` only appears at all
    /// when the caller opts in.
    fn weight(self) -> u32 {
        match self {
            OpKind::Read => 5,
            _ => 1,
        }
    }
}

/// The op kinds generated on every run, in `spec.md` §4.6's table order.
const BASE_KINDS: [OpKind; 10] = [
    OpKind::Read,
    OpKind::Touch,
    OpKind::Append,
    OpKind::Write,
    OpKind::Mkdir,
    OpKind::Mv,
    OpKind::Rm,
    OpKind::Ln,
    OpKind::Truncate,
    OpKind::Fsync,
];

/// Parameters controlling one generated history (`spec.md` §4.6, §6.5).
#[derive(Debug, Clone, Copy)]
pub struct GeneratorConfig {
    /// Seed for the deterministic RNG. Reusing a seed reproduces the same
    /// history exactly.
    pub seed: u64,
    /// Number of operations to generate. `spec.md` §4.6 calls for
    /// "scaled by approximately 1000"; callers pick the actual scale.
    pub length: usize,
    /// Whether `lose_unfsynced_writes` may be generated at all
    /// (`--lose-unfsynced-writes`, `spec.md` §6.5).
    pub lose_unfsynced_writes_enabled: bool,
}

impl GeneratorConfig {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        GeneratorConfig { seed, length: 1000, lose_unfsynced_writes_enabled: false }
    }
}

/// Generates a fresh history per [`GeneratorConfig`]: a seeded RNG, a
/// weighted pick of operation kind, and a random path/payload for it.
#[must_use]
pub fn generate(config: &GeneratorConfig) -> Vec<Invocation> {
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let kinds = enabled_kinds(config.lose_unfsynced_writes_enabled);
    let total_weight: u32 = kinds.iter().map(|k| k.weight()).sum();

    (0..config.length)
        .map(|i| {
            let op = random_op(&mut rng, &kinds, total_weight);
            Invocation { id: OpId(u64::try_from(i).unwrap_or(u64::MAX)), op }
        })
        .collect()
}

fn enabled_kinds(lose_unfsynced_writes_enabled: bool) -> Vec<OpKind> {
    let mut kinds = BASE_KINDS.to_vec();
    if lose_unfsynced_writes_enabled {
        kinds.push(OpKind::LoseUnfsyncedWrites);
    }
    kinds
}

fn random_op(rng: &mut ChaCha8Rng, kinds: &[OpKind], total_weight: u32) -> Op {
    let kind = weighted_pick(rng, kinds, total_weight);
    match kind {
        OpKind::Read => Op::Read(random_path(rng)),
        OpKind::Touch => Op::Touch(random_path(rng)),
        OpKind::Append => Op::Append(random_path(rng), random_data(rng)),
        OpKind::Write => Op::Write(random_path(rng), random_data(rng)),
        OpKind::Mkdir => Op::Mkdir(random_path(rng)),
        OpKind::Mv => Op::Mv(random_path(rng), random_path(rng)),
        OpKind::Rm => Op::Rm(random_path(rng)),
        OpKind::Ln => Op::Ln(random_path(rng), random_path(rng)),
        OpKind::Truncate => Op::Truncate(random_path(rng), rng.random_range(-MAX_TRUNCATE_DELTA..=MAX_TRUNCATE_DELTA)),
        OpKind::Fsync => Op::Fsync(random_path(rng)),
        OpKind::LoseUnfsyncedWrites => Op::LoseUnfsyncedWrites,
    }
}

fn weighted_pick(rng: &mut ChaCha8Rng, kinds: &[OpKind], total_weight: u32) -> OpKind {
    let mut threshold = rng.random_range(0..total_weight);
    for &kind in kinds {
        let w = kind.weight();
        if threshold < w {
            return kind;
        }
        threshold -= w;
    }
    // Unreachable if `total_weight` is the true sum of `kinds`' weights,
    // but fall back to the first kind rather than panic on a future
    // weight-table edit that drifts out of sync.
    kinds[0]
}

fn random_path(rng: &mut ChaCha8Rng) -> Path {
    let depth = rng.random_range(1..=MAX_PATH_DEPTH);
    let components: Vec<&str> = (0..depth).map(|_| PATH_COMPONENTS[rng.random_range(0..PATH_COMPONENTS.len())]).collect();
    Path::new(components)
}

fn random_data(rng: &mut ChaCha8Rng) -> Vec<u8> {
    let len = rng.random_range(0..=MAX_DATA_LEN);
    (0..len).map(|_| rng.random()).collect()
}
