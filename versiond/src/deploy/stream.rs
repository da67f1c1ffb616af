//! Publishing process output as progress events
//!
//! Every chunk is published twice: once as the cumulative buffer of its
//! stream, for views that render the whole output, and once per newly
//! completed line, for append-only log views.

use crate::deploy::process::ProcessEvent;
use crate::progress::reporter::{PhaseReporter, PhaseUpdate};

/// Splits a chunked stream into complete, non-blank lines
#[derive(Debug, Default)]
pub struct LineSplitter {
    partial: String,
    last: Option<String>,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return the lines it completed
    pub fn push(&mut self, chunk: &str) -> Vec<String> {
        self.partial.push_str(chunk);

        let mut lines = Vec::new();
        while let Some(idx) = self.partial.find('\n') {
            let line: String = self.partial.drain(..=idx).collect();
            self.accept(line, &mut lines);
        }
        lines
    }

    /// Flush a trailing line that had no newline
    pub fn finish(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        let rest = std::mem::take(&mut self.partial);
        self.accept(rest, &mut lines);
        lines
    }

    fn accept(&mut self, raw: String, lines: &mut Vec<String>) {
        let line = raw.trim_end_matches(['\n', '\r']);
        if line.trim().is_empty() {
            return;
        }
        // consecutive repeats are dropped
        if self.last.as_deref() == Some(line) {
            return;
        }
        self.last = Some(line.to_string());
        lines.push(line.to_string());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Channel {
    Stdout,
    Stderr,
}

#[derive(Debug, Default)]
struct StreamBuffer {
    cumulative: String,
    lines: LineSplitter,
}

/// Feeds process events into a phase reporter
#[derive(Debug, Default)]
pub struct StreamPublisher {
    stdout: StreamBuffer,
    stderr: StreamBuffer,
}

impl StreamPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish the output carried by `event`. Final events are ignored.
    pub fn publish(&mut self, reporter: &mut PhaseReporter<'_>, event: &ProcessEvent) {
        match event {
            ProcessEvent::Stdout(chunk) => self.chunk(reporter, Channel::Stdout, chunk),
            ProcessEvent::Stderr(chunk) => self.chunk(reporter, Channel::Stderr, chunk),
            _ => {}
        }
    }

    /// Publish lines still waiting for a newline
    pub fn flush(&mut self, reporter: &mut PhaseReporter<'_>) {
        for channel in [Channel::Stdout, Channel::Stderr] {
            let lines = self.buffer(channel).lines.finish();
            for line in lines {
                reporter.progress(update(channel, line));
            }
        }
    }

    pub fn stdout(&self) -> &str {
        &self.stdout.cumulative
    }

    /// Consume the publisher, returning the full stdout and stderr
    pub fn into_output(self) -> (String, String) {
        (self.stdout.cumulative, self.stderr.cumulative)
    }

    fn chunk(&mut self, reporter: &mut PhaseReporter<'_>, channel: Channel, chunk: &str) {
        let buffer = self.buffer(channel);
        buffer.cumulative.push_str(chunk);
        let cumulative = buffer.cumulative.clone();
        let lines = buffer.lines.push(chunk);

        reporter.progress(update(channel, cumulative));
        for line in lines {
            reporter.progress(update(channel, line));
        }
    }

    fn buffer(&mut self, channel: Channel) -> &mut StreamBuffer {
        match channel {
            Channel::Stdout => &mut self.stdout,
            Channel::Stderr => &mut self.stderr,
        }
    }
}

fn update(channel: Channel, text: String) -> PhaseUpdate {
    match channel {
        Channel::Stdout => PhaseUpdate::stdout(text),
        Channel::Stderr => PhaseUpdate::stderr(text),
    }
}
