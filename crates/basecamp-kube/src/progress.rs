//! Progress reporting for long-running waits
//!
//! The manager never depends on a particular rendering: wait loops compute
//! state-change events over plain data and hand human-readable lines to a
//! [`ProgressSink`]. The console sink drives an indicatif spinner; tests use
//! the recording sink and assert on the event sequence instead of captured
//! text.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Mutex;
use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Side channel for progress output. Fire-and-forget; nothing the manager
/// does depends on the sink's behaviour.
pub trait ProgressSink: Send + Sync {
    /// Begin a progress indicator with the given message.
    fn start(&self, message: &str);
    /// Stop the indicator.
    fn stop(&self);
    /// Emit a standalone line.
    fn line(&self, text: &str);
}

/// Sink that discards everything.
pub struct NoopSink;

impl ProgressSink for NoopSink {
    fn start(&self, _message: &str) {}
    fn stop(&self) {}
    fn line(&self, _text: &str) {}
}

/// Spinner-backed sink for interactive terminals.
pub struct ConsoleSink {
    spinner: Mutex<Option<ProgressBar>>,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self {
            spinner: Mutex::new(None),
        }
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for ConsoleSink {
    fn start(&self, message: &str) {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(120));
        if let Ok(mut guard) = self.spinner.lock() {
            *guard = Some(bar);
        }
    }

    fn stop(&self) {
        if let Ok(mut guard) = self.spinner.lock()
            && let Some(bar) = guard.take()
        {
            bar.finish_and_clear();
        }
    }

    fn line(&self, text: &str) {
        match self.spinner.lock() {
            Ok(guard) if guard.is_some() => {
                if let Some(bar) = guard.as_ref() {
                    bar.println(text);
                }
            }
            _ => eprintln!("{}", style(text).dim()),
        }
    }
}

/// Recording sink for tests.
#[derive(Default)]
pub struct RecordingSink {
    lines: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

impl ProgressSink for RecordingSink {
    fn start(&self, message: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(format!("start: {message}"));
        }
    }

    fn stop(&self) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push("stop".to_string());
        }
    }

    fn line(&self, text: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(text.to_string());
        }
    }
}

/// Classification of one requested node within a single poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// Absent from the status map: the node has not registered yet
    Missing,
    /// Present but reporting not ready
    NotReady,
    /// Present and ready
    Ready,
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            NodeState::Missing => "MISSING",
            NodeState::NotReady => "NOT READY",
            NodeState::Ready => "READY",
        };
        f.write_str(text)
    }
}

/// Classify every requested node against one poll's status map.
pub fn classify_nodes(
    requested: &[String],
    statuses: &HashMap<String, bool>,
) -> BTreeMap<String, NodeState> {
    requested
        .iter()
        .map(|name| {
            let state = match statuses.get(name) {
                None => NodeState::Missing,
                Some(false) => NodeState::NotReady,
                Some(true) => NodeState::Ready,
            };
            (name.clone(), state)
        })
        .collect()
}

/// State-change events between two polls, in name order. A node appears in
/// the output only when its classification differs from the previous poll
/// (every node on the first poll, when there is no previous snapshot).
pub fn transitions(
    previous: &BTreeMap<String, NodeState>,
    current: &BTreeMap<String, NodeState>,
) -> Vec<(String, NodeState)> {
    current
        .iter()
        .filter(|(name, state)| previous.get(*name) != Some(state))
        .map(|(name, state)| (name.clone(), *state))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn classification_covers_all_three_states() {
        let requested = names(&["a", "b", "c"]);
        let statuses = HashMap::from([("a".to_string(), true), ("b".to_string(), false)]);

        let classified = classify_nodes(&requested, &statuses);
        assert_eq!(classified["a"], NodeState::Ready);
        assert_eq!(classified["b"], NodeState::NotReady);
        assert_eq!(classified["c"], NodeState::Missing);
    }

    #[test]
    fn first_poll_emits_every_node() {
        let requested = names(&["a", "b"]);
        let current = classify_nodes(&requested, &HashMap::from([("a".to_string(), true)]));

        let events = transitions(&BTreeMap::new(), &current);
        assert_eq!(
            events,
            vec![
                ("a".to_string(), NodeState::Ready),
                ("b".to_string(), NodeState::Missing),
            ]
        );
    }

    #[test]
    fn unchanged_nodes_emit_nothing() {
        let requested = names(&["a", "b"]);
        let first = classify_nodes(&requested, &HashMap::from([("a".to_string(), false)]));
        let second = classify_nodes(
            &requested,
            &HashMap::from([("a".to_string(), true), ("b".to_string(), false)]),
        );

        // a: NotReady -> Ready, b: Missing -> NotReady, both changed.
        assert_eq!(transitions(&first, &second).len(), 2);
        // Identical polls produce no events.
        assert!(transitions(&second, &second).is_empty());
    }

    #[test]
    fn node_state_display() {
        assert_eq!(NodeState::Missing.to_string(), "MISSING");
        assert_eq!(NodeState::NotReady.to_string(), "NOT READY");
        assert_eq!(NodeState::Ready.to_string(), "READY");
    }

    #[test]
    fn recording_sink_captures_in_order() {
        let sink = RecordingSink::new();
        sink.start("waiting");
        sink.line("Node a: READY");
        sink.stop();

        assert_eq!(sink.lines(), vec!["start: waiting", "Node a: READY", "stop"]);
    }
}
