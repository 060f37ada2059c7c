//! Accumulating text sink consumed by the emitters and the diagnostic path.

use std::fmt::Write;

/// Severity tag written in front of a diagnostic message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// No prefix at all
    None,
    /// Recoverable oddity, translation continues
    Warning,
    /// User-shader error, translation aborts
    Error,
    /// Programming error inside a pass or emitter
    InternalError,
    /// Known construct with no implemented mapping yet
    Unimplemented,
    /// Informational follow-up to a previous message
    Note,
}

impl Severity {
    fn prefix(self) -> &'static str {
        match self {
            Severity::None => "",
            Severity::Warning => "WARNING: ",
            Severity::Error => "ERROR: ",
            Severity::InternalError => "INTERNAL ERROR: ",
            Severity::Unimplemented => "UNIMPLEMENTED: ",
            Severity::Note => "NOTE: ",
        }
    }
}

/// Append-only text accumulator.
///
/// Grows geometrically, supports appending string slices, repeated characters
/// and the contents of another sink. The only removal operation is [erase](Sink::erase).
#[derive(Debug, Default, Clone)]
pub struct Sink {
    buffer: String,
    mirror_to_stdout: bool,
}

impl Sink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle mirroring of every append to the process standard output
    pub fn set_stdout_mirror(&mut self, enabled: bool) {
        self.mirror_to_stdout = enabled;
    }

    /// Append a string slice
    pub fn push(&mut self, s: &str) {
        self.reserve(s.len());
        self.buffer.push_str(s);

        if self.mirror_to_stdout {
            print!("{}", s);
        }
    }

    /// Append a single character `count` times
    pub fn push_repeated(&mut self, ch: char, count: usize) {
        self.reserve(count * ch.len_utf8());
        for _ in 0..count {
            self.buffer.push(ch);
        }

        if self.mirror_to_stdout {
            for _ in 0..count {
                print!("{}", ch);
            }
        }
    }

    /// Append the accumulated contents of another sink
    pub fn push_sink(&mut self, other: &Sink) {
        self.push(other.as_str());
    }

    /// Append a formatted severity/location prefix followed by the message body
    /// and a terminating newline
    pub fn message(&mut self, severity: Severity, location: Option<(&str, u32)>, body: &str) {
        let mut line = String::from(severity.prefix());

        if let Some((context, line_no)) = location {
            // Ignoring the result: writing to a String cannot fail
            let _ = write!(line, "{}:{}: ", context, line_no);
        }

        line.push_str(body);
        line.push('\n');

        self.push(&line);
    }

    /// Reset the sink to empty, keeping the allocated capacity
    pub fn erase(&mut self) {
        self.buffer.clear();
    }

    /// Accumulated contents
    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    /// Number of accumulated bytes
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// True when nothing was appended since creation or the last erase
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Consume the sink, returning the accumulated string
    pub fn into_string(self) -> String {
        self.buffer
    }

    fn reserve(&mut self, additional: usize) {
        let needed = self.buffer.len() + additional;
        if needed > self.buffer.capacity() {
            // Doubling keeps the total cost of N appended bytes linear
            let target = (self.buffer.capacity() * 2).max(needed).max(64);
            self.buffer.reserve(target - self.buffer.len());
        }
    }
}

impl std::fmt::Display for Sink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_accumulate_in_order() {
        let mut sink = Sink::new();
        sink.push("void main()");
        sink.push_repeated(' ', 1);
        sink.push("{}");

        assert_eq!(sink.as_str(), "void main() {}");
    }

    #[test]
    fn message_prefixes_severity_and_location() {
        let mut sink = Sink::new();
        sink.message(Severity::Error, Some(("shader", 12)), "bad thing");
        sink.message(Severity::Note, None, "context");

        assert_eq!(sink.as_str(), "ERROR: shader:12: bad thing\nNOTE: context\n");
    }

    #[test]
    fn erase_resets_contents() {
        let mut sink = Sink::new();
        sink.push("stale");
        sink.erase();
        sink.push("fresh");

        assert_eq!(sink.as_str(), "fresh");
    }

    #[test]
    fn push_sink_copies_contents() {
        let mut prelude = Sink::new();
        prelude.push("float sx_helper();\n");

        let mut out = Sink::new();
        out.push_sink(&prelude);
        out.push("void main() {}\n");

        assert_eq!(out.as_str(), "float sx_helper();\nvoid main() {}\n");
    }
}
