//! Entropy/trace sink
//!
//! The core writes one structured event per attempted instruction plus one
//! per tier transition, all keyed by session. The sink interface is narrow
//! so the host can route events anywhere; the reference implementations are
//! an in-memory ring and a mutex-guarded writer. Sinks must outlive every
//! context that references them.

use std::{
    collections::{HashSet, VecDeque},
    io::Write,
    sync::{Mutex, RwLock},
};

use core::fmt;

/// Opaque printable label routing trace events.
///
/// Defaults to the program fingerprint, which keeps session ids stable
/// across runs of the same program.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionId(String);

impl SessionId {
    /// Build from any printable label.
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// The label as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(label: &str) -> Self {
        Self(label.to_owned())
    }
}

/// One recorded entropy event.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TraceEvent {
    /// Session the event belongs to.
    pub session: SessionId,
    /// Event name: a mnemonic, `MNEMONIC_SUFFIX` on faults, or `MODE_CHANGE`.
    pub op: String,
    /// One-byte summary: low bits of the produced value, or a fault code.
    pub summary: u8,
}

/// Narrow interface the core writes trace events through.
///
/// Calls are non-blocking and fire-and-forget; implementations must not
/// panic and must serialize events internally.
pub trait TraceSink: Send + Sync {
    /// Record one entropy event.
    fn event(&self, session: &SessionId, op: &str, summary: u8);

    /// Announce a session before its first event; idempotent.
    fn register_session(&self, session: &SessionId) {
        let _ = session;
    }
}

/// Sink that drops everything; the default.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {
    fn event(&self, _session: &SessionId, _op: &str, _summary: u8) {}
}

/// In-memory ring buffer of the most recent events.
#[derive(Debug)]
pub struct RingSink {
    capacity: usize,
    events: Mutex<VecDeque<TraceEvent>>,
}

impl RingSink {
    /// Ring holding at most `capacity` events; older events are dropped.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            events: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Snapshot of the buffered events, oldest first.
    pub fn events(&self) -> Vec<TraceEvent> {
        match self.events.lock() {
            Ok(events) => events.iter().cloned().collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Number of buffered events.
    pub fn len(&self) -> usize {
        self.events.lock().map(|events| events.len()).unwrap_or(0)
    }

    /// Whether the ring is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Buffered events with the given name, oldest first.
    pub fn named(&self, op: &str) -> Vec<TraceEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.op == op)
            .collect()
    }
}

impl TraceSink for RingSink {
    fn event(&self, session: &SessionId, op: &str, summary: u8) {
        if let Ok(mut events) = self.events.lock() {
            if events.len() == self.capacity {
                events.pop_front();
            }
            events.push_back(TraceEvent {
                session: session.clone(),
                op: op.to_owned(),
                summary,
            });
        }
    }
}

/// Sink appending one line per event to a host-supplied writer.
#[derive(Debug)]
pub struct WriterSink<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> WriterSink<W> {
    /// Wrap a writer; the sink serializes access internally.
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Unwrap the writer.
    pub fn into_inner(self) -> Option<W> {
        self.writer.into_inner().ok()
    }
}

impl<W: Write + Send> TraceSink for WriterSink<W> {
    fn event(&self, session: &SessionId, op: &str, summary: u8) {
        // fire-and-forget: write failures are dropped, not surfaced
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{session} {op} {summary:#04x}");
        }
    }
}

/// Process-wide registry of known sessions.
///
/// Lock scope is bounded to single calls; the core never holds it across a
/// handler invocation.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashSet<SessionId>>,
}

impl SessionRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a session; idempotent.
    pub fn register(&self, session: &SessionId) {
        if let Ok(mut sessions) = self.sessions.write() {
            sessions.insert(session.clone());
        }
    }

    /// Whether the session has been registered.
    pub fn contains(&self, session: &SessionId) -> bool {
        self.sessions
            .read()
            .map(|sessions| sessions.contains(session))
            .unwrap_or(false)
    }

    /// Number of registered sessions.
    pub fn len(&self) -> usize {
        self.sessions.read().map(|sessions| sessions.len()).unwrap_or(0)
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_drops_oldest_events() {
        let ring = RingSink::new(2);
        let session = SessionId::from("HVM-test");
        ring.event(&session, "PUSH", 7);
        ring.event(&session, "PUSH", 5);
        ring.event(&session, "ADD", 12);
        let events = ring.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].op, "PUSH");
        assert_eq!(events[0].summary, 5);
        assert_eq!(events[1].op, "ADD");
        assert_eq!(events[1].summary, 12);
    }

    #[test]
    fn writer_sink_formats_one_line_per_event() {
        let sink = WriterSink::new(Vec::new());
        sink.event(&SessionId::from("HVM-abc"), "HALT", 0);
        let bytes = sink.into_inner().unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "HVM-abc HALT 0x00\n");
    }

    #[test]
    fn registry_is_idempotent() {
        let registry = SessionRegistry::new();
        let session = SessionId::from("HVM-abc");
        registry.register(&session);
        registry.register(&session);
        assert!(registry.contains(&session));
        assert_eq!(registry.len(), 1);
    }
}
