//! Serialized console output for child processes.

use std::io::{self, Write};
use std::sync::Mutex;

/// Console sink shared by every command of a run.
///
/// Each call writes its whole block under one lock, so multi-line output from
/// the stdout and stderr readers never interleaves mid-block.
pub struct Console {
    sink: Mutex<Box<dyn Write + Send>>,
}

impl std::fmt::Debug for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console").finish_non_exhaustive()
    }
}

impl Console {
    /// Creates a console writing to `sink`.
    #[must_use]
    pub fn new(sink: impl Write + Send + 'static) -> Self {
        Self {
            sink: Mutex::new(Box::new(sink)),
        }
    }

    /// Creates a console writing to standard error.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }

    /// Writes one block atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink fails.
    pub fn write_block(&self, bytes: &[u8]) -> io::Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        let mut sink = self
            .sink
            .lock()
            .map_err(|_| io::Error::other("console lock poisoned"))?;
        sink.write_all(bytes)?;
        sink.flush()
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::stderr()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::io::{self, Write};
    use std::sync::{Arc, Mutex};

    /// Cloneable in-memory sink for asserting console output.
    #[derive(Clone, Default)]
    pub struct SharedBuffer(pub Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        pub fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}
