//! Hardware I/O port fuzzer for x86-family platforms.
//!
//! Repeatedly executes the twelve x86 port-I/O instructions
//! (`inb/inw/inl`, `insb/insw/insl`, `outb/outw/outl`,
//! `outsb/outsw/outsl`) against a configurable set of port addresses
//! with pseudo-randomly chosen operands, and records each invocation,
//! together with the deterministic RNG state that produced it, to an
//! append-only CSV log.
//!
//! One iteration on one worker:
//! 1) snapshot the shared RNG state and draw the 7-slot operand tuple;
//! 2) format one CSV line and force it to stable storage;
//! 3) execute the selected instruction with the tuple's operands.
//!
//! The line is durable *before* the instruction runs, so a hard hang
//! leaves the causing seed on disk; feeding that seed back through
//! [`Fuzzer::iterate_with_state`] replays the exact instruction.
//!
//! This is deliberately not a safe or sandboxed tool: it does not mask
//! dangerous ports, detect crashes, or feed hardware behavior back into
//! operand selection. Its job is dense, reproducible, untyped stimulus.

pub mod fuzzer;
pub mod harness;
pub mod io_port;
pub mod log_sink;
pub mod ports;
pub mod privilege;
pub mod rng;
pub mod stdx;

pub use fuzzer::{Fuzzer, BUF_SIZE, NUM_VARIATES};
pub use harness::{run, HarnessConfig, HarnessError};
pub use io_port::{MNEMONICS, NUM_INSTRUCTIONS};
pub use log_sink::LogSink;
pub use ports::{parse_port_spec, parse_uint, PortSpecError, MAX_PORT};
pub use rng::Rng;
