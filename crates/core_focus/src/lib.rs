//! wless Focus Core
//!
//! Window/output focus management for a minimal Wayland compositor.
//!
//! This crate decides which window is active, which output is current, and how
//! windows move between outputs as they appear, disappear, or are cycled
//! through with Alt-Tab style gestures:
//! - The window registry owns every live window and the window recency list
//! - The output registry owns every live output and the output recency list
//! - The focus ring walks the recency list and runs the two-phase cycling gesture
//! - The reassignment policy re-homes windows when a window or output goes away
//!
//! Nothing here talks to a display server directly. Events come in through
//! [`Desktop::handle_event`] and the resulting side effects are queued as
//! [`Action`]s for the host to apply once the registries are consistent again.

mod desktop;
mod event;
mod focus;
mod keys;
mod output;
mod reassign;
mod recency;
mod window;

pub use desktop::Desktop;
pub use event::{Action, Event, KeyState};
pub use focus::{find_candidate, CycleState, FocusRing, Gesture};
pub use keys::{Keymap, Keysym, Modifiers, Operation};
pub use output::{Output, OutputInfo, OutputKey, OutputRegistry};
pub use recency::RecencyList;
pub use window::{Window, WindowInfo, WindowKey, WindowRegistry};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of a window's drawable, as handed out by the display-server runtime.
pub type SurfaceId = u64;

/// Identifier of a physical or virtual display, as handed out by the runtime.
pub type MonitorId = u64;

/// Errors surfaced by lookups on the public API.
///
/// None of these are fatal: event handlers log them and carry on.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FocusError {
    #[error("Window {0} is not managed")]
    WindowNotFound(SurfaceId),

    #[error("Output {0} is not attached")]
    OutputNotFound(MonitorId),

    #[error("Window {0} is already managed")]
    WindowExists(SurfaceId),

    #[error("Output {0} is already attached")]
    OutputExists(MonitorId),
}

/// A rectangle in layout coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    /// Create a new rectangle.
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// A rectangle with no area.
    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Center a `width` x `height` box inside this rectangle.
    ///
    /// Computed in 64 bits and clamped, so runtime-supplied extremes cannot
    /// overflow.
    pub fn centered(&self, width: i32, height: i32) -> Rect {
        let offset = |origin: i32, outer: i32, inner: i32| {
            let value = i64::from(origin) + (i64::from(outer) - i64::from(inner)) / 2;
            value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
        };
        Rect::new(
            offset(self.x, self.width, width),
            offset(self.y, self.height, height),
            width,
            height,
        )
    }
}

/// Which way to walk a recency list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Toward less recently focused windows.
    Next,
    /// Toward more recently focused windows, wrapping to the least recent.
    Prev,
}

/// Which windows a traversal may stop on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Every window, regardless of the output it lives on.
    Global,
    /// Only windows on the target output (or orphans that may be adopted by it).
    Local,
}

/// What happens to output focus when a monitor is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NewOutputFocus {
    /// The newly attached output becomes the focused output.
    #[default]
    Newest,
    /// Focus stays where it was; the new output joins at the back of the list.
    Keep,
}

/// Whether traversals may pull windows without an output onto the target output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrphanAdoption {
    /// Orphans are eligible everywhere and get adopted by the output they are shown on.
    #[default]
    Adopt,
    /// Orphans are skipped by traversals and stay put until focused directly.
    Stay,
}

/// Injected focus policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusPolicy {
    pub new_output_focus: NewOutputFocus,
    pub orphan_adoption: OrphanAdoption,
    /// Place and focus windows as soon as they are mapped.
    pub focus_new_windows: bool,
    /// Focus the window under the pointer when the pointer enters it.
    pub focus_follows_pointer: bool,
}

impl Default for FocusPolicy {
    fn default() -> Self {
        Self {
            new_output_focus: NewOutputFocus::default(),
            orphan_adoption: OrphanAdoption::default(),
            focus_new_windows: true,
            focus_follows_pointer: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_centered() {
        let area = Rect::new(100, 0, 1000, 800);
        let dialog = area.centered(400, 200);
        assert_eq!(dialog, Rect::new(400, 300, 400, 200));
    }

    #[test]
    fn test_rect_centered_extremes_clamp() {
        let area = Rect::new(i32::MAX, i32::MIN, i32::MAX, 10);
        let dialog = area.centered(i32::MIN, i32::MAX);
        assert_eq!(dialog.x, i32::MAX);
        assert_eq!(dialog.y, i32::MIN);
        assert_eq!((dialog.width, dialog.height), (i32::MIN, i32::MAX));

        let bigger = Rect::new(0, 0, 100, 100).centered(300, 300);
        assert_eq!((bigger.x, bigger.y), (-100, -100));
    }

    #[test]
    fn test_rect_is_empty() {
        assert!(Rect::new(0, 0, 0, 100).is_empty());
        assert!(Rect::new(0, 0, 100, -1).is_empty());
        assert!(!Rect::new(-50, -50, 1, 1).is_empty());
    }

    #[test]
    fn test_default_policy() {
        let policy = FocusPolicy::default();
        assert_eq!(policy.new_output_focus, NewOutputFocus::Newest);
        assert_eq!(policy.orphan_adoption, OrphanAdoption::Adopt);
        assert!(policy.focus_new_windows);
        assert!(policy.focus_follows_pointer);
    }

    #[test]
    fn test_focus_error_messages() {
        assert_eq!(FocusError::WindowNotFound(7).to_string(), "Window 7 is not managed");
        assert_eq!(FocusError::OutputExists(2).to_string(), "Output 2 is already attached");
    }
}
