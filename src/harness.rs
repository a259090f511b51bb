//! Multi-worker fuzzing harness.
//!
//! # Architecture
//!
//! ```text
//!   main thread                     worker threads (detached)
//!   ───────────                     ─────────────────────────
//!   raise_io_privilege()
//!   banner + countdown
//!   shared Rng  ──────────────┬──────────────┬─────────────┐
//!   shared LogSink ───────────┼──────────────┼─────────────┤
//!   spawn workers 1..N        │              │             │
//!   run worker 0 inline       ▼              ▼             ▼
//!                        ┌─────────┐    ┌─────────┐   ┌─────────┐
//!                        │ Fuzzer 0│    │ Fuzzer 1│   │ Fuzzer N│
//!                        └─────────┘    └─────────┘   └─────────┘
//! ```
//!
//! Each worker owns its fuzzer (and scratch buffers) outright; only the
//! RNG and the sink are shared. Per iteration a worker locks the sink,
//! emits one CSV line, forces it to disk, dispatches the instruction,
//! and unlocks, so a line is durable before its instruction can hang
//! the machine, and the stream stays line-atomic across workers.
//!
//! # Ordering Guarantees
//!
//! - Within a worker, line N's state snapshot produced line N's operands,
//!   and iteration N+1 happens-after iteration N's instruction.
//! - Across workers, lines appear in some serialization of the critical
//!   sections; the interleaving is not reproducible (the RNG is shared),
//!   but every individual line replays from its own state field.
//!
//! Workers run forever; the process ends only by external signal or a
//! worker's log I/O failing.

use std::fmt;
use std::fmt::Write as _;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::fuzzer::{Fuzzer, NUM_VARIATES};
use crate::io_port;
use crate::log_sink::LogSink;
use crate::privilege;
use crate::rng::{Rng, STATE_BYTES};
use crate::stdx::DynArray;

/// Harness configuration, filled in from the command line.
#[derive(Clone, Debug)]
pub struct HarnessConfig {
    /// Worker count; worker 0 runs on the calling thread.
    pub num_threads: usize,
    /// Append the log to this file instead of stdout.
    pub output: Option<PathBuf>,
    /// Port list to draw from; `None` (or empty) means the full 16-bit
    /// space.
    pub ports: Option<Arc<DynArray<u16>>>,
    /// Suppress the warning banner and countdown.
    pub quiet: bool,
    /// Per-worker stack size in bytes, if overridden.
    pub stack_size: Option<usize>,
    /// Initial 8-byte RNG seed, little-endian.
    pub state: u64,
    /// Per-worker lifecycle diagnostics on stderr.
    pub debug: bool,
    /// Startup configuration summary on stderr.
    pub verbose: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            num_threads: 1,
            output: None,
            ports: None,
            quiet: false,
            stack_size: None,
            state: 0,
            debug: false,
            verbose: false,
        }
    }
}

impl HarnessConfig {
    /// Validates the configuration. Panics on nonsense values.
    pub fn validate(&self) {
        assert!(self.num_threads > 0, "num_threads must be > 0");
        if let Some(stack_size) = self.stack_size {
            assert!(stack_size > 0, "stack_size must be > 0");
        }
    }
}

/// Fatal harness failures.
#[derive(Debug)]
#[non_exhaustive]
pub enum HarnessError {
    /// The OS refused to raise the I/O privilege level.
    Privilege(io::Error),
    /// The output file could not be opened.
    Sink(io::Error),
    /// A worker thread could not be spawned.
    Spawn(io::Error),
    /// Worker 0's log write or sync failed.
    Log(io::Error),
}

impl fmt::Display for HarnessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Privilege(err) => write!(f, "cannot raise I/O privilege (iopl): {err}"),
            Self::Sink(err) => write!(f, "cannot open log output: {err}"),
            Self::Spawn(err) => write!(f, "cannot spawn worker thread: {err}"),
            Self::Log(err) => write!(f, "log write failed: {err}"),
        }
    }
}

impl std::error::Error for HarnessError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Privilege(err) | Self::Sink(err) | Self::Spawn(err) | Self::Log(err) => Some(err),
        }
    }
}

/// Runs the harness: privilege, banner, shared RNG, workers.
///
/// Does not return during normal operation: worker 0 loops forever on
/// the calling thread. An `Err` is a setup failure or worker 0's log
/// I/O failing.
pub fn run(config: HarnessConfig) -> Result<(), HarnessError> {
    config.validate();

    privilege::raise_io_privilege().map_err(HarnessError::Privilege)?;

    if !config.quiet {
        banner();
    }

    let rng = Arc::new(Rng::with_state(&config.state.to_le_bytes()));
    let sink = Arc::new(match &config.output {
        Some(path) => LogSink::append(path).map_err(HarnessError::Sink)?,
        None => LogSink::stdout(),
    });

    if config.verbose {
        eprintln!(
            "iofuzz: {} worker(s), seed {:#x}, ports: {}, output: {}",
            config.num_threads,
            config.state,
            match &config.ports {
                Some(ports) => format!("{} entries", ports.len()),
                None => "full 16-bit space".to_owned(),
            },
            config
                .output
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "stdout".to_owned()),
        );
    }

    // Workers 1..N are detached, as the original harness detached its
    // pthreads: nobody joins them, and a worker's failure is its own.
    for ordinal in 1..config.num_threads {
        let rng = Arc::clone(&rng);
        let sink = Arc::clone(&sink);
        let ports = config.ports.clone();
        let debug = config.debug;

        let mut builder = thread::Builder::new().name(format!("iofuzz-worker-{ordinal}"));
        if let Some(stack_size) = config.stack_size {
            builder = builder.stack_size(stack_size);
        }
        builder
            .spawn(move || {
                if let Err(err) = worker_loop(ordinal, rng, ports, sink, debug) {
                    eprintln!("iofuzz: worker {ordinal} exiting: {err}");
                }
            })
            .map_err(HarnessError::Spawn)?;
    }

    worker_loop(0, rng, config.ports.clone(), sink, config.debug).map_err(HarnessError::Log)
}

/// Destructive-operation warning with a three-second countdown.
fn banner() {
    eprintln!("Warning: this program drives raw port I/O and may cause data loss.");
    eprintln!("Press Ctrl+C to interrupt");
    for secs in (1..=3).rev() {
        eprint!("Starting in {secs} secs...\r");
        thread::sleep(Duration::from_secs(1));
    }
    eprintln!();
}

/// The per-worker iteration loop. Never returns except on log I/O
/// failure.
fn worker_loop(
    ordinal: usize,
    rng: Arc<Rng>,
    ports: Option<Arc<DynArray<u16>>>,
    sink: Arc<LogSink>,
    debug: bool,
) -> io::Result<()> {
    if debug {
        eprintln!("iofuzz: worker {ordinal} starting");
    }

    let fuzzer = Fuzzer::new();
    fuzzer.set_ports(ports);
    fuzzer.set_rng(rng);

    let mut line = String::with_capacity(128);
    loop {
        let state = fuzzer.state();
        let variates = fuzzer.variates();
        format_line(&mut line, unix_seconds(), ordinal, state, &variates);

        // Log-before-execute: the line must be durable before the
        // instruction gets a chance to wedge the machine, and the sink
        // stays locked until the instruction returns.
        let mut stream = sink.lock();
        stream.write_line(&line)?;
        stream.sync()?;
        fuzzer.iterate();
        drop(stream);
    }
}

/// Formats one CSV record into `line` (clearing it first):
///
/// ```text
/// <unix_seconds>,<ordinal>,<state>,<mnemonic>,<v1>,<v2>,<v3>,<v4>,<v5>,<v6>\n
/// ```
///
/// The state prints as a `0x`-prefixed little-endian u64; the variates
/// print as `0x`-prefixed hex truncated to 32 bits. The truncation is
/// part of the log format; widening it would break every consumer.
pub fn format_line(
    line: &mut String,
    unix_seconds: u64,
    ordinal: usize,
    state: [u8; STATE_BYTES],
    variates: &[usize; NUM_VARIATES],
) {
    line.clear();
    let state_word = u64::from_le_bytes(state);
    let _ = write!(
        line,
        "{unix_seconds},{ordinal},{state_word:#x},{}",
        io_port::mnemonic(variates[0])
    );
    for &v in &variates[1..] {
        let _ = write!(line, ",{:#x}", v as u32);
    }
    line.push('\n');
}

/// Seconds since the Unix epoch.
fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
