//! Deterministic random number generation.
//!
//! RULE: Nothing in the core may call any platform RNG.
//! All randomness flows through GameRng instances derived from a
//! single master seed, so every combat, market and bonus-window
//! outcome is reproducible under test.
//!
//! Each randomized operation gets its own stream, seeded from
//! (master_seed XOR stream_index). Adding a new stream never
//! changes existing streams' draws.

use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;

/// A named, deterministic RNG for a single randomized operation.
pub struct GameRng {
    pub name: &'static str,
    inner: Pcg64Mcg,
}

impl GameRng {
    /// Create a stream RNG from the master seed and a stable stream
    /// index. The index must never change once assigned.
    pub fn new(master_seed: u64, stream_index: u64) -> Self {
        let derived_seed = master_seed ^ (stream_index.wrapping_mul(0x9e37_79b9_7f4a_7c15));
        Self {
            name: "unnamed",
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        use rand::RngCore;
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Roll a u64 in [0, n).
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        use rand::RngCore;
        assert!(n > 0, "n must be > 0");
        self.inner.next_u64() % n
    }

    /// Bernoulli trial: returns true with probability p.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Uniform draw in [lo, hi). Used for the combat roll multipliers
    /// and bonus-percentage tiers.
    pub fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        lo + self.next_f64() * (hi - lo)
    }
}

/// All operation RNGs for one engine instance, indexed by stable slot.
pub struct RngBank {
    master_seed: u64,
}

impl RngBank {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn for_stream(&self, stream: RngStream) -> GameRng {
        GameRng::new(self.master_seed, stream as u64).with_name(stream.name())
    }
}

/// Stable stream slot assignments.
/// NEVER reorder or remove entries — only append.
/// Reordering changes every stream's seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum RngStream {
    Duel = 0,
    Heist = 1,
    Market = 2,
    BonusHour = 3,
    Mission = 4,
    // Add new streams here — append only.
}

impl RngStream {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Duel => "duel",
            Self::Heist => "heist",
            Self::Market => "market",
            Self::BonusHour => "bonus_hour",
            Self::Mission => "mission",
        }
    }
}
