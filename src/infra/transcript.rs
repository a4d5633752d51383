//! Line-oriented transcript of rewrites and conflicts.
//!
//! Decoupled from the terminal so tests can capture it in memory: the sink
//! is any `Write + Send`, shared behind a mutex because file tasks report
//! from worker threads.

use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;

/// Shared sink for human-readable old→new and conflict lines.
#[derive(Clone)]
pub struct Transcript {
    sink: Arc<Mutex<Box<dyn Write + Send>>>,
    verbose: bool,
}

impl Transcript {
    pub fn new(sink: Box<dyn Write + Send>, verbose: bool) -> Self {
        Transcript {
            sink: Arc::new(Mutex::new(sink)),
            verbose,
        }
    }

    /// Transcript writing to stdout.
    pub fn stdout(verbose: bool) -> Self {
        Transcript::new(Box::new(std::io::stdout()), verbose)
    }

    /// Transcript writing to a shared in-memory buffer, for tests.
    pub fn memory(verbose: bool) -> (Self, Arc<Mutex<Vec<u8>>>) {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let sink = SharedBuf(Arc::clone(&buf));
        (Transcript::new(Box::new(sink), verbose), buf)
    }

    /// Writes one line unconditionally (conflicts, warnings, summaries).
    pub fn line(&self, msg: impl std::fmt::Display) {
        // A broken sink must not abort the walk.
        let _ = writeln!(self.sink.lock(), "{msg}");
    }

    /// Writes one line in verbose mode only (per-rewrite reporting).
    pub fn detail(&self, msg: impl std::fmt::Display) {
        if self.verbose {
            self.line(msg);
        }
    }
}

struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_respects_verbosity() {
        let (t, buf) = Transcript::memory(false);
        t.detail("hidden");
        t.line("shown");
        assert_eq!(String::from_utf8(buf.lock().clone()).unwrap(), "shown\n");

        let (t, buf) = Transcript::memory(true);
        t.detail(format_args!("a -> {}", "b"));
        assert_eq!(String::from_utf8(buf.lock().clone()).unwrap(), "a -> b\n");
    }
}
