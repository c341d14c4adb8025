//! wless Runtime
//!
//! The seam between the focus core and the display server.
//!
//! This crate handles:
//! - Applying core actions through the [`Runtime`] trait
//! - A headless runtime that tracks what a display server would show
//! - A JSON-lines runtime that writes every action to a stream
//! - Reading newline-delimited JSON events for headless sessions

use std::collections::{HashMap, HashSet};
use std::io::Write;

use thiserror::Error;
use wless_core_focus::{Action, MonitorId, Rect, SurfaceId};

mod events;

pub use events::{parse_event, read_events};

/// Errors raised while talking to the display server.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid event on line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode action: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Surface {0} is gone")]
    SurfaceGone(SurfaceId),
}

/// The calls the focus core makes into the display server.
pub trait Runtime {
    fn raise_to_front(&mut self, surface: SurfaceId) -> Result<(), RuntimeError>;

    /// Deactivate `previous`, activate `window` and send it keyboard enter.
    fn set_input_focus(
        &mut self,
        window: Option<SurfaceId>,
        previous: Option<SurfaceId>,
    ) -> Result<(), RuntimeError>;

    fn set_window_bounds(&mut self, surface: SurfaceId, bounds: Rect) -> Result<(), RuntimeError>;

    fn set_display_target(
        &mut self,
        monitor: MonitorId,
        window: Option<SurfaceId>,
    ) -> Result<(), RuntimeError>;

    fn close_window(&mut self, surface: SurfaceId) -> Result<(), RuntimeError>;

    /// Dispatch one action. `Terminate` is left to the caller.
    fn apply(&mut self, action: &Action) -> Result<(), RuntimeError> {
        match *action {
            Action::RaiseToFront { surface } => self.raise_to_front(surface),
            Action::SetInputFocus { window, previous } => self.set_input_focus(window, previous),
            Action::SetWindowBounds { surface, bounds } => self.set_window_bounds(surface, bounds),
            Action::SetDisplayTarget { monitor, window } => {
                self.set_display_target(monitor, window)
            }
            Action::CloseWindow { surface } => self.close_window(surface),
            Action::Terminate => Ok(()),
        }
    }
}

/// A display server stand-in that logs every call and keeps the resulting
/// scene so it can be inspected.
#[derive(Debug, Default)]
pub struct HeadlessRuntime {
    focused: Option<SurfaceId>,
    /// Bottom to top.
    stacking: Vec<SurfaceId>,
    displayed: HashMap<MonitorId, SurfaceId>,
    bounds: HashMap<SurfaceId, Rect>,
    closed: HashSet<SurfaceId>,
}

impl HeadlessRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focused(&self) -> Option<SurfaceId> {
        self.focused
    }

    /// Topmost surface.
    pub fn top(&self) -> Option<SurfaceId> {
        self.stacking.last().copied()
    }

    pub fn displayed(&self, monitor: MonitorId) -> Option<SurfaceId> {
        self.displayed.get(&monitor).copied()
    }

    pub fn bounds(&self, surface: SurfaceId) -> Option<Rect> {
        self.bounds.get(&surface).copied()
    }

    fn check_alive(&self, surface: SurfaceId) -> Result<(), RuntimeError> {
        if self.closed.contains(&surface) {
            return Err(RuntimeError::SurfaceGone(surface));
        }
        Ok(())
    }
}

impl Runtime for HeadlessRuntime {
    fn raise_to_front(&mut self, surface: SurfaceId) -> Result<(), RuntimeError> {
        self.check_alive(surface)?;
        tracing::debug!("Would raise window {}", surface);
        self.stacking.retain(|s| *s != surface);
        self.stacking.push(surface);
        Ok(())
    }

    fn set_input_focus(
        &mut self,
        window: Option<SurfaceId>,
        previous: Option<SurfaceId>,
    ) -> Result<(), RuntimeError> {
        if let Some(surface) = window {
            self.check_alive(surface)?;
        }
        if let Some(previous) = previous {
            tracing::debug!("Would deactivate window {}", previous);
        }
        match window {
            Some(surface) => tracing::debug!("Would send keyboard enter to window {}", surface),
            None => tracing::debug!("Would clear keyboard focus"),
        }
        self.focused = window;
        Ok(())
    }

    fn set_window_bounds(&mut self, surface: SurfaceId, bounds: Rect) -> Result<(), RuntimeError> {
        self.check_alive(surface)?;
        tracing::debug!(
            "Would move window {} to ({}, {}) size {}x{}",
            surface,
            bounds.x,
            bounds.y,
            bounds.width,
            bounds.height
        );
        self.bounds.insert(surface, bounds);
        Ok(())
    }

    fn set_display_target(
        &mut self,
        monitor: MonitorId,
        window: Option<SurfaceId>,
    ) -> Result<(), RuntimeError> {
        match window {
            Some(surface) => {
                self.check_alive(surface)?;
                tracing::debug!("Would show window {} on output {}", surface, monitor);
                self.displayed.insert(monitor, surface);
            }
            None => {
                tracing::debug!("Would blank output {}", monitor);
                self.displayed.remove(&monitor);
            }
        }
        Ok(())
    }

    fn close_window(&mut self, surface: SurfaceId) -> Result<(), RuntimeError> {
        self.check_alive(surface)?;
        tracing::info!("Would close window {}", surface);
        self.closed.insert(surface);
        self.stacking.retain(|s| *s != surface);
        self.displayed.retain(|_, s| *s != surface);
        if self.focused == Some(surface) {
            self.focused = None;
        }
        Ok(())
    }
}

/// Writes every action as one JSON object per line.
///
/// Lets an external display server (or a test harness) drive `wless` over a
/// pair of pipes.
#[derive(Debug)]
pub struct JsonRuntime<W: Write> {
    writer: W,
}

impl<W: Write> JsonRuntime<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn emit(&mut self, action: &Action) -> Result<(), RuntimeError> {
        serde_json::to_writer(&mut self.writer, action).map_err(RuntimeError::Encode)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

impl<W: Write> Runtime for JsonRuntime<W> {
    fn raise_to_front(&mut self, surface: SurfaceId) -> Result<(), RuntimeError> {
        self.emit(&Action::RaiseToFront { surface })
    }

    fn set_input_focus(
        &mut self,
        window: Option<SurfaceId>,
        previous: Option<SurfaceId>,
    ) -> Result<(), RuntimeError> {
        self.emit(&Action::SetInputFocus { window, previous })
    }

    fn set_window_bounds(&mut self, surface: SurfaceId, bounds: Rect) -> Result<(), RuntimeError> {
        self.emit(&Action::SetWindowBounds { surface, bounds })
    }

    fn set_display_target(
        &mut self,
        monitor: MonitorId,
        window: Option<SurfaceId>,
    ) -> Result<(), RuntimeError> {
        self.emit(&Action::SetDisplayTarget { monitor, window })
    }

    fn close_window(&mut self, surface: SurfaceId) -> Result<(), RuntimeError> {
        self.emit(&Action::CloseWindow { surface })
    }

    fn apply(&mut self, action: &Action) -> Result<(), RuntimeError> {
        self.emit(action)
    }
}

/// Remembers every action it was asked to apply.
#[derive(Debug, Default)]
pub struct RecordingRuntime {
    pub actions: Vec<Action>,
}

impl RecordingRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the recorded actions, leaving the log empty.
    pub fn take(&mut self) -> Vec<Action> {
        std::mem::take(&mut self.actions)
    }
}

impl Runtime for RecordingRuntime {
    fn raise_to_front(&mut self, surface: SurfaceId) -> Result<(), RuntimeError> {
        self.actions.push(Action::RaiseToFront { surface });
        Ok(())
    }

    fn set_input_focus(
        &mut self,
        window: Option<SurfaceId>,
        previous: Option<SurfaceId>,
    ) -> Result<(), RuntimeError> {
        self.actions.push(Action::SetInputFocus { window, previous });
        Ok(())
    }

    fn set_window_bounds(&mut self, surface: SurfaceId, bounds: Rect) -> Result<(), RuntimeError> {
        self.actions.push(Action::SetWindowBounds { surface, bounds });
        Ok(())
    }

    fn set_display_target(
        &mut self,
        monitor: MonitorId,
        window: Option<SurfaceId>,
    ) -> Result<(), RuntimeError> {
        self.actions.push(Action::SetDisplayTarget { monitor, window });
        Ok(())
    }

    fn close_window(&mut self, surface: SurfaceId) -> Result<(), RuntimeError> {
        self.actions.push(Action::CloseWindow { surface });
        Ok(())
    }

    fn apply(&mut self, action: &Action) -> Result<(), RuntimeError> {
        self.actions.push(action.clone());
        Ok(())
    }
}
