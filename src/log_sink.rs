//! Serialized log sink shared by all workers.
//!
//! # Design
//!
//! One `LogSink` is shared process-wide. A worker takes the sink lock,
//! writes its CSV line, forces it to stable storage, executes the port
//! instruction, and only then releases the lock. Holding the lock across
//! the dispatch is deliberate: the record must be durable *before* the
//! instruction runs, because the instruction may never return, and no
//! other worker may interleave a line into that window.
//!
//! # Correctness Guarantees
//!
//! - **Line atomicity**: lines from different workers never interleave
//!   at the byte level; the stream is a serialization of whole critical
//!   sections.
//! - **Durability**: `sync` flushes and `fsync`s file output. Stdout is
//!   flushed and offered to `fsync`, whose result is ignored: pipes and
//!   terminals reject it, and there is nothing more to force there.
//! - **No ordering across workers** beyond lock acquisition order.
//!
//! The in-memory variant exists for tests that assert on the exact byte
//! stream.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

enum Stream {
    Stdout(io::Stdout),
    File(File),
    Memory(Vec<u8>),
}

/// Mutex-serialized output stream for CSV records.
pub struct LogSink {
    stream: Mutex<Stream>,
}

impl LogSink {
    /// Sink writing to the process's stdout.
    pub fn stdout() -> Self {
        Self::with_stream(Stream::Stdout(io::stdout()))
    }

    /// Sink appending to `path`, created if absent. Append mode keeps
    /// writes line-atomic even if another process logs to the same file.
    pub fn append(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::with_stream(Stream::File(file)))
    }

    /// In-memory sink for tests.
    pub fn memory() -> Self {
        Self::with_stream(Stream::Memory(Vec::new()))
    }

    fn with_stream(stream: Stream) -> Self {
        Self {
            stream: Mutex::new(stream),
        }
    }

    /// Acquires the sink for one critical section. The guard spans the
    /// caller's whole log-then-execute window.
    pub fn lock(&self) -> SinkGuard<'_> {
        SinkGuard {
            stream: self.stream.lock().expect("log sink mutex poisoned"),
        }
    }

    /// Extracts everything captured by a memory sink, leaving it empty.
    /// Returns an empty buffer for the other variants.
    pub fn take_captured(&self) -> Vec<u8> {
        let mut stream = self.stream.lock().expect("log sink mutex poisoned");
        match &mut *stream {
            Stream::Memory(buf) => std::mem::take(buf),
            _ => Vec::new(),
        }
    }
}

/// Exclusive access to the sink for one worker iteration.
pub struct SinkGuard<'a> {
    stream: MutexGuard<'a, Stream>,
}

impl SinkGuard<'_> {
    /// Writes one pre-formatted record (the caller includes the newline).
    pub fn write_line(&mut self, line: &str) -> io::Result<()> {
        match &mut *self.stream {
            Stream::Stdout(out) => out.write_all(line.as_bytes()),
            Stream::File(file) => file.write_all(line.as_bytes()),
            Stream::Memory(buf) => {
                buf.extend_from_slice(line.as_bytes());
                Ok(())
            }
        }
    }

    /// Forces the written record toward stable storage.
    pub fn sync(&mut self) -> io::Result<()> {
        match &mut *self.stream {
            Stream::Stdout(out) => {
                out.flush()?;
                // Terminals and pipes refuse fsync; nothing actionable.
                let _ = unsafe { libc::fsync(libc::STDOUT_FILENO) };
                Ok(())
            }
            Stream::File(file) => {
                file.flush()?;
                file.sync_data()
            }
            Stream::Memory(_) => Ok(()),
        }
    }
}
