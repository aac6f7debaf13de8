//! # Listener registry
//!
//! Event name → listeners, ordered by priority and then by registration.
//!
//! Event names are namespaced with `:`. A listener registered on `element`
//! also hears `element:table`, and one on `attribute:bold` hears
//! `attribute:bold:$text`. Dispatchers fire only the most specific name.

use std::cmp::Reverse;
use std::fmt;

/// Listener priority; higher runs first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    Highest,
    High,
    #[default]
    Normal,
    Low,
    Lowest,
    Custom(i32),
}

impl Priority {
    pub fn value(self) -> i32 {
        match self {
            Priority::Highest => 100_000,
            Priority::High => 1_000,
            Priority::Normal => 0,
            Priority::Low => -1_000,
            Priority::Lowest => -100_000,
            Priority::Custom(value) => value,
        }
    }
}

/// Per-occurrence event state handed to every listener
#[derive(Debug, Clone, PartialEq)]
pub struct EventInfo {
    name: String,
    stopped: bool,
}

impl EventInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stopped: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Keep the remaining listeners from hearing this occurrence
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}

struct Entry<F: ?Sized> {
    event: String,
    priority: Priority,
    order: usize,
    callback: Box<F>,
}

pub struct ListenerRegistry<F: ?Sized> {
    entries: Vec<Entry<F>>,
}

impl<F: ?Sized> Default for ListenerRegistry<F> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<F: ?Sized> fmt::Debug for ListenerRegistry<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|entry| (&entry.event, entry.priority)))
            .finish()
    }
}

impl<F: ?Sized> ListenerRegistry<F> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&mut self, event: impl Into<String>, priority: Priority, callback: Box<F>) {
        let order = self.entries.len();
        self.entries.push(Entry {
            event: event.into(),
            priority,
            order,
            callback,
        });
    }

    /// Listeners that hear `event`, in call order
    pub fn listeners_for(&self, event: &str) -> Vec<&F> {
        let mut matching: Vec<&Entry<F>> = self
            .entries
            .iter()
            .filter(|entry| hears(&entry.event, event))
            .collect();
        matching.sort_by_key(|entry| (Reverse(entry.priority.value()), entry.order));
        matching.into_iter().map(|entry| entry.callback.as_ref()).collect()
    }

    pub fn has_listeners(&self, event: &str) -> bool {
        self.entries.iter().any(|entry| hears(&entry.event, event))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn hears(registered: &str, event: &str) -> bool {
    event == registered
        || event
            .strip_prefix(registered)
            .is_some_and(|rest| rest.starts_with(':'))
}
