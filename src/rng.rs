//! # RNG service
//!
//! Deterministic variate source for the fuzzer.
//!
//! ## Design
//!
//! **Generator**: the rand48 family, a 48-bit LCG
//! (`X' = 0x5DEECE66D·X + 0xB mod 2^48`) whose generator state is three
//! 16-bit lanes. The full externally visible state is an opaque 8-byte
//! blob: the LCG occupies the first 6 bytes (little-endian lanes); bytes
//! 6..8 are reserved and carried verbatim through draws and
//! snapshot/restore. Every logged seed is one of these blobs, so replay
//! depends on the snapshot being byte-exact.
//!
//! **Sharing**: all operations serialize on an internal mutex, and a
//! single `Arc<Rng>` is shared by every worker. Sharing keeps each
//! individual draw reproducible from its snapshot; it does not make the
//! interleaving of draws across workers reproducible.
//!
//! **Variate shapes**: besides flat uniforms the service produces Fermat
//! (`2^k + 1`) and Mersenne (`2^k − 1`) values, which set or clear long
//! runs of operand bits and probe width/boundary handling in targets.

use std::sync::Mutex;

/// Multiplier of the 48-bit LCG.
const LCG_A: u64 = 0x5DEE_CE66D;
/// Increment of the 48-bit LCG.
const LCG_C: u64 = 0xB;
/// Modulus mask: the generator lives in the low 48 bits.
const LCG_MASK: u64 = (1 << 48) - 1;

/// Number of state bytes the LCG actually uses (three 16-bit lanes).
const LANE_BYTES: usize = 6;
/// Size of the opaque state blob, including reserved bytes.
pub const STATE_BYTES: usize = 8;

/// The 95 printable ASCII characters, space through tilde.
const CHARSET: &[u8] =
    b" !\"#$%&'()*+,-./0123456789:;<=>?@ABCDEFGHIJKLMNOPQRSTUVWXYZ[\\]^_`abcdefghijklmnopqrstuvwxyz{|}~";

/// Mutex-serialized rand48 generator with a snapshot/restore contract.
///
/// # Thread Safety
///
/// All methods take `&self` and lock internally; share as `Arc<Rng>`.
///
/// # Reproducibility
///
/// Restoring a snapshot and repeating the same draw sequence yields the
/// same values byte-for-byte. Sharing one `Rng` across threads keeps this
/// property per draw but makes the cross-thread draw order arbitrary.
#[derive(Debug)]
pub struct Rng {
    state: Mutex<[u8; STATE_BYTES]>,
}

impl Rng {
    /// Creates a generator with the all-zero state.
    pub fn new() -> Self {
        Self {
            state: Mutex::new([0; STATE_BYTES]),
        }
    }

    /// Creates a generator from a state blob (zero-padded or truncated
    /// to 8 bytes).
    pub fn with_state(state: &[u8]) -> Self {
        let rng = Self::new();
        rng.restore(state);
        rng
    }

    /// Advances the LCG one step and returns the new 48-bit value.
    fn step(&self) -> u64 {
        let mut state = self.state.lock().expect("rng mutex poisoned");
        let x = load_lanes(&state);
        let next = (LCG_A.wrapping_mul(x).wrapping_add(LCG_C)) & LCG_MASK;
        store_lanes(&mut state, next);
        next
    }

    /// Returns a uniformly distributed `u32` (the top 32 of the 48
    /// generator bits; the low bits of an LCG are weaker).
    pub fn uniform_u32(&self) -> u32 {
        (self.step() >> 16) as u32
    }

    /// Returns a uniformly distributed `f64` in `[0, 1)` using all 48
    /// generator bits.
    pub fn uniform_f64(&self) -> f64 {
        self.step() as f64 / (1u64 << 48) as f64
    }

    /// Returns a uniform integer in `[begin, end]`, inclusive on both
    /// ends. `uniform_range(k, k)` returns `k`.
    ///
    /// # Panics
    /// Panics if `begin > end`.
    pub fn uniform_range(&self, begin: u64, end: u64) -> u64 {
        assert!(begin <= end, "uniform_range requires begin <= end");
        let span = (end - begin + 1) as f64;
        (self.uniform_f64() * span) as u64 + begin
    }

    /// Returns a Fermat number `2^k + 1` with `k` uniform in `[1, 31]`.
    pub fn fermat(&self) -> u64 {
        (1u64 << self.uniform_range(1, 31)) + 1
    }

    /// Returns a Mersenne number `2^k − 1` with `k` uniform in `[1, 32]`.
    pub fn mersenne(&self) -> u64 {
        (1u64 << self.uniform_range(1, 32)) - 1
    }

    /// Fills `out` with a NUL-terminated printable string.
    ///
    /// For `out.len() >= 2`: bytes `0..len−2` are drawn uniformly from
    /// the 95-character printable set, a NUL is written at `len−2`, and
    /// the final byte is left untouched. Shorter buffers are left as-is.
    pub fn fill_string(&self, out: &mut [u8]) {
        let len = out.len();
        if len < 2 {
            return;
        }
        for slot in out[..len - 2].iter_mut() {
            *slot = CHARSET[self.uniform_range(0, CHARSET.len() as u64 - 1) as usize];
        }
        out[len - 2] = 0;
    }

    /// Returns a byte-exact copy of the 8-byte state, including the
    /// reserved tail.
    pub fn snapshot(&self) -> [u8; STATE_BYTES] {
        *self.state.lock().expect("rng mutex poisoned")
    }

    /// Replaces the state with `src`, zero-padding or truncating to 8
    /// bytes.
    pub fn restore(&self, src: &[u8]) {
        let mut state = self.state.lock().expect("rng mutex poisoned");
        let mut next = [0u8; STATE_BYTES];
        let n = src.len().min(STATE_BYTES);
        next[..n].copy_from_slice(&src[..n]);
        *state = next;
    }
}

impl Default for Rng {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads the 48-bit generator value from the first six state bytes
/// (little-endian lanes).
fn load_lanes(state: &[u8; STATE_BYTES]) -> u64 {
    let mut x = 0u64;
    for (i, &byte) in state[..LANE_BYTES].iter().enumerate() {
        x |= (byte as u64) << (8 * i);
    }
    x
}

/// Writes the 48-bit generator value into the first six state bytes,
/// leaving the reserved tail untouched.
fn store_lanes(state: &mut [u8; STATE_BYTES], x: u64) {
    for (i, byte) in state[..LANE_BYTES].iter_mut().enumerate() {
        *byte = (x >> (8 * i)) as u8;
    }
}
