use std::cell::RefCell;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::rc::Rc;

const TARGET: &str = "doodle::gl";

#[derive(Debug, Default)]
struct SinkState {
    file: Option<BufWriter<File>>,
    memory: Option<Vec<String>>,
    closed: bool,
}

/// Destination for native driver diagnostics (compile and link logs, error
/// reports).
///
/// A sink is created once by the runtime and handed to every component that
/// produces diagnostics. Clones share the same destination. Every message is
/// forwarded to the `log` facade under the `doodle::gl` target and, when
/// configured, appended to a file. [`close`](Self::close) flushes and detaches
/// the file; messages after that only reach the facade.
#[derive(Debug, Clone, Default)]
pub struct LogSink {
    state: Rc<RefCell<SinkState>>,
}

impl LogSink {
    /// Sink that forwards to the `log` facade only.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink that also appends every message to `path`, truncating it first.
    pub fn with_file(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        let sink = Self::new();
        sink.state.borrow_mut().file = Some(BufWriter::new(file));
        Ok(sink)
    }

    /// Sink that keeps messages in memory; read them back with [`messages`](Self::messages).
    pub fn memory() -> Self {
        let sink = Self::new();
        sink.state.borrow_mut().memory = Some(Vec::new());
        sink
    }

    /// Records `message`. Blank messages are dropped.
    pub fn message(&self, message: impl AsRef<str>) {
        let message = message.as_ref().trim_end();
        if message.trim().is_empty() {
            return;
        }

        log::info!(target: TARGET, "{message}");

        let mut state = self.state.borrow_mut();
        if let Some(memory) = state.memory.as_mut() {
            memory.push(message.to_string());
        }
        if let Some(file) = state.file.as_mut() {
            if let Err(e) = writeln!(file, "{message}") {
                log::warn!(target: TARGET, "log file write failed: {e}");
                state.file = None;
            }
        }
    }

    /// Records a failure together with its source chain.
    pub fn error(&self, err: &dyn std::error::Error) {
        let mut text = format!("error: {err}");
        let mut source = err.source();
        while let Some(cause) = source {
            text.push_str(&format!("\n  caused by: {cause}"));
            source = cause.source();
        }
        log::error!(target: TARGET, "{text}");

        let mut state = self.state.borrow_mut();
        if let Some(memory) = state.memory.as_mut() {
            memory.push(text.clone());
        }
        if let Some(file) = state.file.as_mut() {
            let _ = writeln!(file, "{text}");
        }
    }

    /// Messages captured by a [`memory`](Self::memory) sink.
    pub fn messages(&self) -> Vec<String> {
        self.state.borrow().memory.clone().unwrap_or_default()
    }

    /// Flushes and detaches the file destination. Idempotent.
    pub fn close(&self) -> io::Result<()> {
        let mut state = self.state.borrow_mut();
        if state.closed {
            return Ok(());
        }
        state.closed = true;
        match state.file.take() {
            Some(mut file) => file.flush(),
            None => Ok(()),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state.borrow().closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_messages_are_dropped() {
        let sink = LogSink::memory();
        sink.message("");
        sink.message("   \n\t");
        sink.message("0:12: warning: implicit cast\n");
        assert_eq!(sink.messages(), vec!["0:12: warning: implicit cast".to_string()]);
    }

    #[test]
    fn clones_share_the_destination() {
        let sink = LogSink::memory();
        let other = sink.clone();
        other.message("linked");
        assert_eq!(sink.messages().len(), 1);
    }

    #[test]
    fn errors_include_their_source_chain() {
        let sink = LogSink::memory();
        let io = io::Error::new(io::ErrorKind::NotFound, "Basic.vert");
        sink.error(&io);
        assert_eq!(sink.messages(), vec!["error: Basic.vert".to_string()]);
    }

    #[test]
    fn file_sink_writes_and_closes() {
        let path = std::env::temp_dir().join(format!("doodle-sink-{}.log", std::process::id()));
        let sink = LogSink::with_file(&path).unwrap();
        sink.message("first");
        sink.message(" ");
        sink.close().unwrap();
        sink.message("after close");
        sink.close().unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "first\n");
        assert!(sink.is_closed());
        std::fs::remove_file(&path).unwrap();
    }
}
