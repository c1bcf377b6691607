//! Deterministic randomness plumbing shared by every subsystem.
//!
//! The engine never reads ambient random state: every draw comes out of a
//! [`RngBundle`] built from an explicit seed, with one stream per simulation
//! domain so that adding draws in one subsystem cannot shift the sequence
//! seen by another.

use hmac::{Hmac, Mac};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sha2::Sha256;
use std::cell::{RefCell, RefMut};

/// Derive a per-run seed from a batch base seed and the run index.
///
/// Runs scheduled on different workers (or replayed alone) observe the same
/// stream for the same `(base_seed, run_index)` pair.
#[must_use]
pub fn derive_run_seed(base_seed: u64, run_index: u32) -> u64 {
    let mut tag = [0u8; 7];
    tag[..3].copy_from_slice(b"run");
    tag[3..].copy_from_slice(&run_index.to_le_bytes());
    derive_stream_seed(base_seed, &tag)
}

pub(crate) fn derive_stream_seed(seed: u64, domain_tag: &[u8]) -> u64 {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(&seed.to_le_bytes()).expect("64-bit seed is valid key");
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let seed_bytes: [u8; 8] = digest[..8].try_into().expect("digest slice length");
    u64::from_le_bytes(seed_bytes)
}

/// Deterministic bundle of RNG streams segregated by simulation domain.
#[derive(Debug, Clone)]
pub struct RngBundle {
    challenge: RefCell<CountingRng<ChaCha8Rng>>,
    council: RefCell<CountingRng<ChaCha8Rng>>,
    alliance: RefCell<CountingRng<ChaCha8Rng>>,
    advantage: RefCell<CountingRng<ChaCha8Rng>>,
    jury: RefCell<CountingRng<ChaCha8Rng>>,
    casting: RefCell<CountingRng<ChaCha8Rng>>,
}

impl RngBundle {
    /// Construct the bundle from a per-run seed.
    #[must_use]
    pub fn from_run_seed(seed: u64) -> Self {
        let challenge = CountingRng::new(derive_stream_seed(seed, b"challenge"));
        let council = CountingRng::new(derive_stream_seed(seed, b"council"));
        let alliance = CountingRng::new(derive_stream_seed(seed, b"alliance"));
        let advantage = CountingRng::new(derive_stream_seed(seed, b"advantage"));
        let jury = CountingRng::new(derive_stream_seed(seed, b"jury"));
        let casting = CountingRng::new(derive_stream_seed(seed, b"casting"));
        Self {
            challenge: RefCell::new(challenge),
            council: RefCell::new(council),
            alliance: RefCell::new(alliance),
            advantage: RefCell::new(advantage),
            jury: RefCell::new(jury),
            casting: RefCell::new(casting),
        }
    }

    /// Stream used by challenge resolution (immunity, rewards, fire-making).
    #[must_use]
    pub fn challenge(&self) -> RefMut<'_, CountingRng<ChaCha8Rng>> {
        self.challenge.borrow_mut()
    }

    /// Stream used by tribal-council ballots, revotes and tie fallbacks.
    #[must_use]
    pub fn council(&self) -> RefMut<'_, CountingRng<ChaCha8Rng>> {
        self.council.borrow_mut()
    }

    /// Stream used by alliance formation.
    #[must_use]
    pub fn alliance(&self) -> RefMut<'_, CountingRng<ChaCha8Rng>> {
        self.alliance.borrow_mut()
    }

    /// Stream used by idol searches and play decisions.
    #[must_use]
    pub fn advantage(&self) -> RefMut<'_, CountingRng<ChaCha8Rng>> {
        self.advantage.borrow_mut()
    }

    /// Stream used by final-tribal-council jury ballots.
    #[must_use]
    pub fn jury(&self) -> RefMut<'_, CountingRng<ChaCha8Rng>> {
        self.jury.borrow_mut()
    }

    /// Stream used by cast shuffles, tribe deals and swap draws.
    #[must_use]
    pub fn casting(&self) -> RefMut<'_, CountingRng<ChaCha8Rng>> {
        self.casting.borrow_mut()
    }
}

/// Counting wrapper for RNG streams providing instrumentation.
#[derive(Debug, Clone)]
pub struct CountingRng<R> {
    rng: R,
    draws: u64,
}

impl CountingRng<ChaCha8Rng> {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            draws: 0,
        }
    }
}

impl<R: rand::RngCore> CountingRng<R> {
    /// Number of draw calls performed against this stream.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }
}

impl<R: rand::RngCore> rand::RngCore for CountingRng<R> {
    fn next_u32(&mut self) -> u32 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.draws = self.draws.saturating_add(1);
        self.rng.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.draws = self.draws.saturating_add(1);
        self.rng.try_fill_bytes(dest)
    }
}
