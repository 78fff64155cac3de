//! The `Trace` collaborator (spec §6): three independently-toggled diagnostic channels.
//!
//! `debug` gets one record per AST node the interpreter visits, `scope` gets one record
//! per scope the semantic analyzer exits, and `stack` gets a call-stack snapshot on every
//! activation-record push/pop (spec §4.4, §4.6). Records are free-form text; nothing in
//! the core parses them back.

pub trait Trace {
    fn debug(&mut self, record: &str);
    fn scope(&mut self, record: &str);
    fn stack(&mut self, record: &str);
}

/// All three channels disabled — the default when a host does not opt in.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTrace;

impl Trace for NullTrace {
    fn debug(&mut self, _record: &str) {}
    fn scope(&mut self, _record: &str) {}
    fn stack(&mut self, _record: &str) {}
}

/// Forwards each channel to the ambient `log` facade under a channel-specific target, so a
/// host gets all three just by setting `RUST_LOG=clike::trace::scope=trace` and friends
/// without writing its own sink.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingTrace;

impl Trace for LoggingTrace {
    fn debug(&mut self, record: &str) {
        log::debug!(target: "clike::trace::debug", "{record}");
    }

    fn scope(&mut self, record: &str) {
        log::debug!(target: "clike::trace::scope", "{record}");
    }

    fn stack(&mut self, record: &str) {
        log::debug!(target: "clike::trace::stack", "{record}");
    }
}

/// Records every channel into an in-memory buffer, tagged by channel name. Handy for tests
/// that want to assert tracing fired without depending on `log`'s global logger.
#[derive(Debug, Default, Clone)]
pub struct RecordingTrace {
    pub records: Vec<(&'static str, String)>,
}

impl Trace for RecordingTrace {
    fn debug(&mut self, record: &str) {
        self.records.push(("debug", record.to_owned()));
    }

    fn scope(&mut self, record: &str) {
        self.records.push(("scope", record.to_owned()));
    }

    fn stack(&mut self, record: &str) {
        self.records.push(("stack", record.to_owned()));
    }
}
