//! Fuzzer engine: operand-tuple generation and the iteration step.
//!
//! # Data model
//!
//! A `Fuzzer` owns a 7-slot operand tuple (the *variates*), two 256-byte
//! scratch buffers, and an 8-byte snapshot of the shared RNG taken
//! immediately before the draw that produced the current tuple. The
//! snapshot is the reproducibility anchor: restoring it and re-running
//! one generation step rebuilds the tuple byte-for-byte.
//!
//! | Slot | Meaning                                  |
//! |-----:|------------------------------------------|
//! | 0    | instruction selector, in `[0, 11]`       |
//! | 1    | data operand (A register)                |
//! | 2    | auxiliary operand (B register)           |
//! | 3    | `rep` count for string ops, in `[1, 64]` |
//! | 4    | port address, in `[0, 0xFFFF]`           |
//! | 5    | source buffer address (SI, for `outs*`)  |
//! | 6    | destination buffer address (DI, `ins*`)  |
//!
//! Slots 1 and 2 each mix three generators (flat uniform, Fermat
//! `2^k+1`, Mersenne `2^k−1`) so operands cover both typical values
//! and long runs of set/clear bits.
//!
//! # Concurrency
//!
//! All state sits behind one mutex; accessors return owned copies, never
//! references into the locked interior. Lock order is fuzzer mutex, then
//! (inside each draw) the RNG mutex.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::io_port;
use crate::ports::MAX_PORT;
use crate::rng::{Rng, STATE_BYTES};
use crate::stdx::DynArray;

/// Length of the operand tuple.
pub const NUM_VARIATES: usize = 7;

/// Size of each scratch buffer, and the byte ceiling of one string op
/// (`insl`/`outsl` move up to `4 * MAX_REP_COUNT` bytes).
pub const BUF_SIZE: usize = 256;

/// Upper bound of the `rep` count slot.
pub const MAX_REP_COUNT: u64 = (BUF_SIZE / 4) as u64;

struct Inner {
    rng: Arc<Rng>,
    ports: Option<Arc<DynArray<u16>>>,
    /// RNG snapshot taken before the draw that filled `variates`.
    state: [u8; STATE_BYTES],
    variates: DynArray<usize>,
    /// Slot 5 target. Boxed so the address is stable for the fuzzer's
    /// whole life; `outs*` reads through it during dispatch.
    src_buf: Box<[u8; BUF_SIZE]>,
    /// Slot 6 target; `ins*` writes through it during dispatch.
    dst_buf: Box<[u8; BUF_SIZE]>,
}

/// One fuzzing engine, typically one per worker.
///
/// Shareable as `Arc<Fuzzer>`; every operation serializes on the
/// internal mutex.
pub struct Fuzzer {
    inner: Mutex<Inner>,
}

impl Fuzzer {
    /// Creates a fuzzer with a fresh zero-state RNG, no port list, and
    /// one generation step already performed, so it is immediately
    /// iterable.
    pub fn new() -> Self {
        let mut inner = Inner {
            rng: Arc::new(Rng::new()),
            ports: None,
            state: [0; STATE_BYTES],
            variates: DynArray::with_length(NUM_VARIATES),
            src_buf: Box::new([0; BUF_SIZE]),
            dst_buf: Box::new([0; BUF_SIZE]),
        };
        inner.variates[5] = inner.src_buf.as_ptr() as usize;
        inner.variates[6] = inner.dst_buf.as_ptr() as usize;
        inner.randomize();

        Self {
            inner: Mutex::new(inner),
        }
    }

    /// Creates a fuzzer and seeds its RNG from `state` (zero-padded or
    /// truncated to 8 bytes).
    pub fn with_state(state: &[u8]) -> Self {
        let fuzzer = Self::new();
        fuzzer.set_state(state);
        fuzzer
    }

    /// Returns the shared RNG handle.
    pub fn rng(&self) -> Arc<Rng> {
        Arc::clone(&self.lock().rng)
    }

    /// Replaces the RNG and re-runs the variate generator, so the
    /// visible tuple and snapshot come from the new generator.
    pub fn set_rng(&self, rng: Arc<Rng>) {
        let mut inner = self.lock();
        inner.rng = rng;
        inner.randomize();
    }

    /// Returns the port list, if one is installed.
    pub fn ports(&self) -> Option<Arc<DynArray<u16>>> {
        self.lock().ports.clone()
    }

    /// Replaces the port list and re-runs the variate generator. An
    /// empty list behaves like no list: the port slot falls back to the
    /// full 16-bit space.
    pub fn set_ports(&self, ports: Option<Arc<DynArray<u16>>>) {
        let mut inner = self.lock();
        inner.ports = ports;
        inner.randomize();
    }

    /// Returns the snapshot that produced the current tuple.
    pub fn state(&self) -> [u8; STATE_BYTES] {
        self.lock().state
    }

    /// Restores the RNG from `state` and re-runs the variate generator.
    /// Afterwards the current tuple is exactly the tuple that snapshot
    /// produced originally (given the same port list).
    pub fn set_state(&self, state: &[u8]) {
        let mut inner = self.lock();
        inner.rng.restore(state);
        inner.randomize();
    }

    /// Returns an owned copy of the current operand tuple.
    pub fn variates(&self) -> [usize; NUM_VARIATES] {
        let inner = self.lock();
        let mut out = [0; NUM_VARIATES];
        out.copy_from_slice(inner.variates.as_slice());
        out
    }

    /// Advances to the next operand tuple without dispatching. Replay
    /// tooling and tests use this to walk the draw sequence off-target.
    pub fn randomize(&self) {
        self.lock().randomize();
    }

    /// Executes the current tuple's instruction, then generates the next
    /// tuple (snapshotting the RNG first).
    ///
    /// The caller must hold I/O privilege; without it the dispatched
    /// instruction raises `#GP` and the kernel kills the process.
    pub fn iterate(&self) {
        self.lock().step();
    }

    /// Restores the RNG from `state`, regenerates the tuple it produced,
    /// then behaves as [`iterate`](Self::iterate). Deterministic replay
    /// of one logged seed.
    pub fn iterate_with_state(&self, state: &[u8]) {
        let mut inner = self.lock();
        inner.rng.restore(state);
        inner.randomize();
        inner.step();
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("fuzzer mutex poisoned")
    }
}

impl Default for Fuzzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Inner {
    /// One variate-generation step: snapshot the RNG, then draw the
    /// seven slots in slot order.
    fn randomize(&mut self) {
        self.state = self.rng.snapshot();

        let selector = self.rng.uniform_range(0, io_port::NUM_INSTRUCTIONS as u64 - 1);
        let data = mixed_operand(&self.rng);
        let aux = mixed_operand(&self.rng);
        let count = self.rng.uniform_range(1, MAX_REP_COUNT);
        let port = match &self.ports {
            Some(ports) if !ports.is_empty() => {
                ports[self.rng.uniform_range(0, ports.len() as u64 - 1) as usize] as u64
            }
            _ => self.rng.uniform_range(0, MAX_PORT as u64),
        };
        self.rng.fill_string(&mut self.src_buf[..]);
        self.rng.fill_string(&mut self.dst_buf[..]);

        self.variates[0] = selector as usize;
        self.variates[1] = data as usize;
        self.variates[2] = aux as usize;
        self.variates[3] = count as usize;
        self.variates[4] = port as usize;
        // The buffers never move, so these rewrites are redundant after
        // construction; kept so the slot assignments read as one unit.
        self.variates[5] = self.src_buf.as_ptr() as usize;
        self.variates[6] = self.dst_buf.as_ptr() as usize;
    }

    /// Dispatch the current tuple, then prepare the next one.
    fn step(&mut self) {
        self.dispatch_current();
        self.randomize();
    }

    fn dispatch_current(&self) {
        let mut slots = [0; NUM_VARIATES];
        slots.copy_from_slice(self.variates.as_slice());
        // SAFETY: slots 5/6 hold the addresses of `src_buf`/`dst_buf`,
        // which live as long as `self` and span `4 * MAX_REP_COUNT`
        // bytes; the harness raised I/O privilege before any worker
        // reaches this point.
        unsafe { io_port::dispatch(&slots) };
    }
}

/// Slot 1/2 mixture: uniformly one of flat, Fermat, Mersenne.
fn mixed_operand(rng: &Rng) -> u64 {
    match rng.uniform_range(0, 2) {
        0 => rng.uniform_u32() as u64,
        1 => rng.fermat(),
        _ => rng.mersenne(),
    }
}
