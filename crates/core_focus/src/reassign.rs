//! Reassignment Policy
//!
//! Re-homes windows when a window or an output goes away, and the display
//! primitives shared with the focus ring.

use tracing::{debug, info};

use crate::desktop::Desktop;
use crate::focus::{find_candidate, CycleState};
use crate::output::OutputKey;
use crate::window::WindowKey;
use crate::{Action, Direction, Scope};

impl Desktop {
    /// Assign a window to an output and size it for that output.
    pub(crate) fn place_window(&mut self, key: WindowKey, output: OutputKey) {
        let Some(area) = self.outputs.get(output).map(|o| o.bounds()) else {
            return;
        };
        self.windows.assign(key, Some(output));

        if let Some(window) = self.windows.get(key) {
            let bounds = window.bounds_on(area);
            debug!("Placing window {} at {:?}", window.surface(), bounds);
            self.actions.push_back(Action::SetWindowBounds {
                surface: window.surface(),
                bounds,
            });
        }
    }

    /// Make `window` the output's current window.
    pub(crate) fn show(&mut self, output: OutputKey, window: WindowKey) {
        if self.outputs.current_window(output) == Some(window) {
            return;
        }
        self.outputs.set_current(output, Some(window));
        self.emit_display(output, Some(window));
    }

    pub(crate) fn raise(&mut self, window: WindowKey) {
        if let Some(surface) = self.windows.surface_of(window) {
            self.actions.push_back(Action::RaiseToFront { surface });
        }
    }

    pub(crate) fn emit_display(&mut self, output: OutputKey, window: Option<WindowKey>) {
        let Some(monitor) = self.outputs.monitor_of(output) else {
            return;
        };
        let window = window.and_then(|key| self.windows.surface_of(key));
        self.actions
            .push_back(Action::SetDisplayTarget { monitor, window });
    }

    /// Fill a blank output from its own windows, or adopt an orphan.
    ///
    /// Returns the window now displayed, or `None` if the output stays blank.
    /// Emits nothing when it stays blank; the caller decides whether the
    /// runtime needs to hear about it.
    pub(crate) fn pick_replacement(&mut self, output: OutputKey) -> Option<WindowKey> {
        if let Some(current) = self.outputs.current_window(output) {
            return Some(current);
        }

        let candidate = find_candidate(
            &self.windows,
            None,
            Direction::Next,
            Scope::Local,
            output,
            self.policy.orphan_adoption,
        )?;

        if self.windows.get(candidate).is_some_and(|w| w.output.is_none()) {
            info!(
                "Adopting orphaned window {:?} onto output {:?}",
                self.windows.surface_of(candidate),
                self.outputs.monitor_of(output)
            );
            self.place_window(candidate, output);
        }

        self.show(output, candidate);
        self.raise(candidate);
        Some(candidate)
    }

    /// Hand input focus to the focused output's current window.
    ///
    /// While a gesture is running input focus is only cleared; the commit
    /// will hand it to the pending window.
    pub(crate) fn refocus(&mut self) {
        let current = self
            .outputs
            .focused()
            .and_then(|output| self.outputs.current_window(output));

        match current {
            Some(window) if !self.focus.is_cycling() => self.focus_window(window),
            _ => self.handoff(None),
        }
    }

    /// Forget a window and repair everything that pointed at it.
    ///
    /// The window is unlinked before any replacement is chosen, so nothing
    /// below can observe it.
    pub(crate) fn unregister_window(&mut self, key: WindowKey) {
        let Some(window) = self.windows.unregister(key) else {
            return;
        };
        info!(
            "Window gone: {} [{}]",
            window.display_title(),
            window.display_app_id()
        );

        let blanked = self.outputs.clear_window(key);

        let had_focus = self.focus.input_focus == Some(key);
        if had_focus {
            self.focus.input_focus = None;
        }

        let interrupted = match self.focus.pending() {
            Some(pending) if pending == key => self.focus.cancel().map(|(_, gesture)| gesture),
            _ => None,
        };

        for output in blanked {
            if self.pick_replacement(output).is_none() {
                debug!("Output {:?} is now blank", self.outputs.monitor_of(output));
                self.emit_display(output, None);
            }
        }

        let mut ended = false;
        if let Some(gesture) = interrupted {
            if self.outputs.contains(gesture.target) && self.advance(gesture).is_some() {
                debug!("Gesture resumed after losing its pending window");
            } else {
                debug!("Gesture ended after losing its pending window");
                ended = true;
            }
        }

        if had_focus {
            self.refocus();
        } else if ended {
            self.settle_focus();
        }
    }

    /// Forget an output, orphan its windows and re-home them elsewhere.
    ///
    /// Emits `Terminate` when the last output goes away.
    pub(crate) fn unregister_output(&mut self, key: OutputKey) {
        let was_focused = self.outputs.focused() == Some(key);
        let Some(output) = self.outputs.unregister(key) else {
            return;
        };
        info!("Output detached: {} ({})", output.info.name, output.monitor());

        let mut cancelled = false;
        if let Some((pending, gesture)) = self.focus.cancel() {
            let pending_here = self.windows.get(pending).and_then(|w| w.output) == Some(key);
            if gesture.target == key || pending_here {
                debug!("Gesture cancelled with its output");
                cancelled = true;
            } else {
                self.focus.state = CycleState::Cycling { pending, gesture };
            }
        }

        let orphans = self.windows.on_output(key);
        for &orphan in &orphans {
            self.windows.assign(orphan, None);
        }
        debug!("{} window(s) orphaned", orphans.len());

        if self.outputs.is_empty() {
            info!("Last output detached, terminating");
            self.actions.push_back(Action::Terminate);
            return;
        }

        let blank: Vec<OutputKey> = self
            .outputs
            .iter()
            .filter(|(_, output)| output.current.is_none())
            .map(|(key, _)| key)
            .collect();
        for output in blank {
            self.pick_replacement(output);
        }

        let focus_orphaned = self
            .focus
            .input_focus
            .and_then(|window| self.windows.get(window))
            .is_some_and(|window| window.output.is_none());

        if was_focused || focus_orphaned {
            self.refocus();
        } else if cancelled {
            self.settle_focus();
        }
    }

    /// After a gesture ends without a commit its previews stay on screen.
    /// If that hid the window holding input focus, focus what is shown.
    pub(crate) fn settle_focus(&mut self) {
        let Some(focused) = self.focus.input_focus else {
            return;
        };
        let visible = self
            .outputs
            .iter()
            .any(|(_, output)| output.current == Some(focused));
        if !visible {
            debug!("Input focus is on a hidden window, refocusing");
            self.refocus();
        }
    }
}
