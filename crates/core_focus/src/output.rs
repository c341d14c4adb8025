//! Output Registry
//!
//! Owns every live output and the output recency list. The head of that list
//! is the focused output.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SlotMap};
use tracing::{debug, trace};

use crate::recency::RecencyList;
use crate::window::WindowKey;
use crate::{FocusError, MonitorId, Rect};

new_key_type! {
    /// Stable handle to an attached output.
    pub struct OutputKey;
}

/// What the runtime tells us about an output when it is attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputInfo {
    pub monitor: MonitorId,
    #[serde(default)]
    pub name: String,
    pub bounds: Rect,
}

impl OutputInfo {
    pub fn new(monitor: MonitorId, name: impl Into<String>, bounds: Rect) -> Self {
        Self {
            monitor,
            name: name.into(),
            bounds,
        }
    }
}

/// An attached output.
#[derive(Debug, Clone)]
pub struct Output {
    pub info: OutputInfo,
    /// Window currently displayed. `None` means the output is blank.
    pub current: Option<WindowKey>,
}

impl Output {
    pub fn monitor(&self) -> MonitorId {
        self.info.monitor
    }

    pub fn bounds(&self) -> Rect {
        self.info.bounds
    }
}

/// Registry of live outputs.
#[derive(Debug, Clone, Default)]
pub struct OutputRegistry {
    outputs: SlotMap<OutputKey, Output>,
    by_monitor: HashMap<MonitorId, OutputKey>,
    recency: RecencyList<OutputKey>,
}

impl OutputRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an output. With `focus` it goes to the head of the recency list
    /// and becomes the focused output, otherwise it joins at the tail.
    pub fn register(&mut self, info: OutputInfo, focus: bool) -> Result<OutputKey, FocusError> {
        if self.by_monitor.contains_key(&info.monitor) {
            return Err(FocusError::OutputExists(info.monitor));
        }

        let monitor = info.monitor;
        let key = self.outputs.insert(Output {
            info,
            current: None,
        });
        self.by_monitor.insert(monitor, key);
        if focus {
            self.recency.push_front(key);
        } else {
            self.recency.push_back(key);
        }

        debug!("Registered output {} (focus: {})", monitor, focus);
        Ok(key)
    }

    /// Remove an output. Unknown handles return `None`.
    ///
    /// Windows assigned to it are left for the caller to orphan.
    pub fn unregister(&mut self, key: OutputKey) -> Option<Output> {
        let output = self.outputs.remove(key)?;
        self.by_monitor.remove(&output.info.monitor);
        self.recency.remove(key);

        debug!("Unregistered output {}", output.info.monitor);
        Some(output)
    }

    /// Make an output the focused one.
    pub fn touch(&mut self, key: OutputKey) {
        trace!("Touch output {:?}", key);
        self.recency.move_to_front(key);
    }

    /// The focused output, if any output is attached.
    pub fn focused(&self) -> Option<OutputKey> {
        self.recency.front()
    }

    /// The output that has gone longest without focus.
    pub fn least_recent(&self) -> Option<OutputKey> {
        self.recency.back()
    }

    pub fn current_window(&self, key: OutputKey) -> Option<WindowKey> {
        self.outputs.get(key).and_then(|output| output.current)
    }

    pub fn set_current(&mut self, key: OutputKey, window: Option<WindowKey>) {
        if let Some(output) = self.outputs.get_mut(key) {
            output.current = window;
        }
    }

    /// Clear every output whose current window is `window`.
    ///
    /// Returns the outputs that went blank.
    pub fn clear_window(&mut self, window: WindowKey) -> Vec<OutputKey> {
        let mut cleared = Vec::new();
        for (key, output) in self.outputs.iter_mut() {
            if output.current == Some(window) {
                output.current = None;
                cleared.push(key);
            }
        }
        cleared
    }

    pub fn get(&self, key: OutputKey) -> Option<&Output> {
        self.outputs.get(key)
    }

    pub fn get_mut(&mut self, key: OutputKey) -> Option<&mut Output> {
        self.outputs.get_mut(key)
    }

    pub fn contains(&self, key: OutputKey) -> bool {
        self.outputs.contains_key(key)
    }

    pub fn key_of(&self, monitor: MonitorId) -> Result<OutputKey, FocusError> {
        self.by_monitor
            .get(&monitor)
            .copied()
            .ok_or(FocusError::OutputNotFound(monitor))
    }

    pub fn monitor_of(&self, key: OutputKey) -> Option<MonitorId> {
        self.outputs.get(key).map(Output::monitor)
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// Iterate in recency order, focused output first.
    pub fn iter(&self) -> impl Iterator<Item = (OutputKey, &Output)> + '_ {
        self.recency
            .iter()
            .filter_map(move |key| self.outputs.get(key).map(|output| (key, output)))
    }

    pub fn recency(&self) -> &RecencyList<OutputKey> {
        &self.recency
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(monitor: MonitorId) -> OutputInfo {
        OutputInfo::new(monitor, format!("OUT-{}", monitor), Rect::new(0, 0, 1920, 1080))
    }

    fn monitors(registry: &OutputRegistry) -> Vec<MonitorId> {
        registry.iter().map(|(_, o)| o.monitor()).collect()
    }

    #[test]
    fn test_newest_output_takes_focus() {
        let mut registry = OutputRegistry::new();
        registry.register(info(1), true).unwrap();
        let second = registry.register(info(2), true).unwrap();

        assert_eq!(registry.focused(), Some(second));
        assert_eq!(monitors(&registry), vec![2, 1]);
    }

    #[test]
    fn test_register_without_focus_appends() {
        let mut registry = OutputRegistry::new();
        let first = registry.register(info(1), true).unwrap();
        let second = registry.register(info(2), false).unwrap();

        assert_eq!(registry.focused(), Some(first));
        assert_eq!(registry.least_recent(), Some(second));
    }

    #[test]
    fn test_first_output_is_focused_even_without_focus_flag() {
        let mut registry = OutputRegistry::new();
        let first = registry.register(info(1), false).unwrap();
        assert_eq!(registry.focused(), Some(first));
    }

    #[test]
    fn test_unregister_focused_moves_focus() {
        let mut registry = OutputRegistry::new();
        let first = registry.register(info(1), true).unwrap();
        let second = registry.register(info(2), true).unwrap();

        registry.unregister(second);
        assert_eq!(registry.focused(), Some(first));

        registry.unregister(first);
        assert_eq!(registry.focused(), None);
        assert!(registry.unregister(first).is_none());
    }

    #[test]
    fn test_duplicate_monitor() {
        let mut registry = OutputRegistry::new();
        registry.register(info(1), true).unwrap();
        assert_eq!(
            registry.register(info(1), true).unwrap_err(),
            FocusError::OutputExists(1)
        );
    }

    #[test]
    fn test_current_window_round_trip() {
        let mut windows: SlotMap<WindowKey, ()> = SlotMap::with_key();
        let w = windows.insert(());

        let mut registry = OutputRegistry::new();
        let out = registry.register(info(1), true).unwrap();
        assert_eq!(registry.current_window(out), None);

        registry.set_current(out, Some(w));
        assert_eq!(registry.current_window(out), Some(w));

        assert_eq!(registry.clear_window(w), vec![out]);
        assert_eq!(registry.current_window(out), None);
    }
}
