use std::collections::{HashSet, VecDeque};

use tracing::{debug, info, trace, warn};

use crate::event::{Action, Event, KeyState};
use crate::focus::FocusRing;
use crate::keys::{Keymap, Keysym, Modifiers, Operation};
use crate::output::{OutputInfo, OutputRegistry};
use crate::window::{Window, WindowInfo, WindowRegistry};
use crate::{FocusError, FocusPolicy, MonitorId, NewOutputFocus, Rect, SurfaceId};

/// The focus-management context: both registries, the focus ring, the
/// injected keymap and policy, and the queue of actions for the runtime.
#[derive(Debug, Clone)]
pub struct Desktop {
    pub(crate) windows: WindowRegistry,
    pub(crate) outputs: OutputRegistry,
    pub(crate) focus: FocusRing,
    pub(crate) keymap: Keymap,
    pub(crate) policy: FocusPolicy,
    pub(crate) actions: VecDeque<Action>,
}

impl Desktop {
    pub fn new(keymap: Keymap, policy: FocusPolicy) -> Self {
        Self {
            windows: WindowRegistry::new(),
            outputs: OutputRegistry::new(),
            focus: FocusRing::default(),
            keymap,
            policy,
            actions: VecDeque::new(),
        }
    }

    /// Process one event from the runtime.
    ///
    /// Returns `false` when the runtime should pass the event on to clients:
    /// unbound key presses, every key release and pointer events.
    pub fn handle_event(&mut self, event: Event) -> bool {
        trace!("Event: {:?}", event);

        let consumed = match event {
            Event::WindowMapped(info) => {
                self.map_window(info);
                true
            }
            Event::WindowUnmapped { surface } | Event::WindowDestroyed { surface } => {
                match self.windows.key_of(surface) {
                    Ok(key) => self.unregister_window(key),
                    Err(e) => debug!("{}", e),
                }
                true
            }
            Event::WindowTitleChanged {
                surface,
                title,
                app_id,
            } => {
                self.retitle(surface, title, app_id);
                true
            }
            Event::WindowResized {
                surface,
                width,
                height,
            } => {
                self.resize(surface, width, height);
                true
            }
            Event::OutputAttached(info) => {
                self.attach_output(info);
                true
            }
            Event::OutputDetached { monitor } => {
                match self.outputs.key_of(monitor) {
                    Ok(key) => self.unregister_output(key),
                    Err(e) => debug!("{}", e),
                }
                true
            }
            Event::OutputLayoutChanged { monitor, bounds } => {
                self.relayout(monitor, bounds);
                true
            }
            Event::Key {
                modifiers,
                keysym,
                state: KeyState::Pressed,
            } => self.key_pressed(modifiers, keysym),
            Event::Key {
                modifiers,
                keysym,
                state: KeyState::Released,
            } => {
                self.key_released(modifiers, keysym);
                false
            }
            Event::PointerEntered { surface } => {
                if self.policy.focus_follows_pointer && !self.focus.is_cycling() {
                    self.pointer_focus(surface);
                }
                false
            }
            Event::PointerButton { surface } => {
                self.pointer_focus(surface);
                false
            }
        };

        debug_assert_eq!(self.check_invariants(), Ok(()));
        consumed
    }

    /// Take every action queued so far, in order.
    pub fn drain_actions(&mut self) -> Vec<Action> {
        self.actions.drain(..).collect()
    }

    fn map_window(&mut self, info: WindowInfo) {
        let key = match self.windows.register(info) {
            Ok(key) => key,
            Err(e) => {
                warn!("Ignoring map: {}", e);
                return;
            }
        };

        if let Some(window) = self.windows.get(key) {
            info!(
                "Window mapped: {} [{}]",
                window.display_title(),
                window.display_app_id()
            );
        }

        if self.policy.focus_new_windows {
            self.commit_focus(key);
        } else if let Some(output) = self.outputs.focused() {
            self.pick_replacement(output);
        }
    }

    fn retitle(&mut self, surface: SurfaceId, title: Option<String>, app_id: Option<String>) {
        let Ok(key) = self.windows.key_of(surface) else {
            debug!("Title change for unknown window {}", surface);
            return;
        };
        if let Some(window) = self.windows.get_mut(key) {
            window.info.title = title;
            window.info.app_id = app_id;
            debug!(
                "Window {} is now {} [{}]",
                surface,
                window.display_title(),
                window.display_app_id()
            );
        }
    }

    /// Record a new client size. Dialogs are re-centred since their bounds
    /// follow their size; other windows keep filling their output.
    fn resize(&mut self, surface: SurfaceId, width: i32, height: i32) {
        let Ok(key) = self.windows.key_of(surface) else {
            debug!("Resize of unknown window {}", surface);
            return;
        };
        let Some(window) = self.windows.get_mut(key) else {
            return;
        };
        if (window.info.width, window.info.height) == (width, height) {
            return;
        }
        window.info.width = width;
        window.info.height = height;
        trace!("Window {} is now {}x{}", surface, width, height);

        let dialog_output = window.output.filter(|_| window.is_dialog());
        if let Some(output) = dialog_output {
            self.place_window(key, output);
        }
    }

    fn attach_output(&mut self, info: OutputInfo) {
        let focus =
            self.policy.new_output_focus == NewOutputFocus::Newest || self.outputs.is_empty();
        info!(
            "Output attached: {} ({}) at {:?}",
            info.name, info.monitor, info.bounds
        );

        let key = match self.outputs.register(info, focus) {
            Ok(key) => key,
            Err(e) => {
                warn!("Ignoring attach: {}", e);
                return;
            }
        };

        let shown = self.pick_replacement(key);
        if focus && !self.focus.is_cycling() {
            if let Some(window) = shown {
                self.focus_window(window);
            }
        }
    }

    fn relayout(&mut self, monitor: MonitorId, bounds: Rect) {
        let Ok(key) = self.outputs.key_of(monitor) else {
            debug!("Layout change for unknown output {}", monitor);
            return;
        };
        if let Some(output) = self.outputs.get_mut(key) {
            output.info.bounds = bounds;
        }
        debug!("Output {} moved to {:?}", monitor, bounds);

        for window in self.windows.on_output(key) {
            self.place_window(window, key);
        }
    }

    fn key_pressed(&mut self, modifiers: Modifiers, keysym: Keysym) -> bool {
        let Some(operation) = self.keymap.lookup(modifiers, keysym) else {
            return false;
        };
        debug!("Key {:?} + {:?} -> {:?}", modifiers, keysym, operation);
        self.run(operation, modifiers);
        true
    }

    /// Commit the gesture once its modifier is let go: either the released key
    /// drives one of the release modifiers, or the reported state no longer
    /// holds any of them.
    fn key_released(&mut self, modifiers: Modifiers, keysym: Keysym) {
        let Some(gesture) = self.focus.gesture() else {
            return;
        };
        let released = keysym
            .modifier()
            .is_some_and(|modifier| gesture.release.intersects(modifier));
        if released || !modifiers.intersects(gesture.release) {
            self.commit_pending();
        }
    }

    fn pointer_focus(&mut self, surface: SurfaceId) {
        match self.windows.key_of(surface) {
            Ok(key) => self.commit_focus(key),
            Err(e) => debug!("Pointer focus: {}", e),
        }
    }

    /// Run a bound operation. Anything but cycling first finishes a running
    /// gesture.
    pub fn run(&mut self, operation: Operation, modifiers: Modifiers) {
        if let Operation::CycleWindows { direction, scope } = operation {
            self.cycle(direction, scope, modifiers);
            return;
        }

        self.commit_pending();
        match operation {
            Operation::SwitchOutput => self.switch_output(),
            Operation::ShiftWindow => self.shift_window(),
            Operation::CloseWindow => self.close_window(),
            Operation::Quit => {
                info!("Quit requested");
                self.actions.push_back(Action::Terminate);
            }
            Operation::CycleWindows { .. } => {}
        }
    }

    /// Focus the least recently focused output and its current window.
    pub fn switch_output(&mut self) {
        if self.outputs.len() < 2 {
            debug!("Switch output: only {} output(s)", self.outputs.len());
            return;
        }
        let Some(target) = self.outputs.least_recent() else {
            return;
        };

        info!("Switching to output {:?}", self.outputs.monitor_of(target));
        self.outputs.touch(target);
        self.refocus();
    }

    /// Move the focused output's window to the least recently focused output.
    pub fn shift_window(&mut self) {
        if self.outputs.len() < 2 {
            debug!("Shift window: only {} output(s)", self.outputs.len());
            return;
        }
        let (Some(source), Some(dest)) = (self.outputs.focused(), self.outputs.least_recent())
        else {
            return;
        };
        let Some(window) = self.outputs.current_window(source) else {
            self.switch_output();
            return;
        };

        info!(
            "Shifting window {:?} to output {:?}",
            self.windows.surface_of(window),
            self.outputs.monitor_of(dest)
        );

        self.outputs.set_current(source, None);
        self.place_window(window, dest);
        if self.pick_replacement(source).is_none() {
            self.emit_display(source, None);
        }

        self.show(dest, window);
        self.raise(window);
        self.focus_window(window);
    }

    /// Ask the runtime to close the focused output's window.
    pub fn close_window(&mut self) {
        let current = self
            .outputs
            .focused()
            .and_then(|output| self.outputs.current_window(output))
            .and_then(|window| self.windows.surface_of(window));

        match current {
            Some(surface) => self.actions.push_back(Action::CloseWindow { surface }),
            None => debug!("Close window: focused output is blank"),
        }
    }

    /// Focus a window as if it had been clicked.
    pub fn focus_surface(&mut self, surface: SurfaceId) -> Result<(), FocusError> {
        let key = self.windows.key_of(surface)?;
        self.commit_focus(key);
        Ok(())
    }

    pub fn window(&self, surface: SurfaceId) -> Result<&Window, FocusError> {
        let key = self.windows.key_of(surface)?;
        self.windows
            .get(key)
            .ok_or(FocusError::WindowNotFound(surface))
    }

    /// The output a window is assigned to, `None` for orphans.
    pub fn window_output(&self, surface: SurfaceId) -> Result<Option<MonitorId>, FocusError> {
        let window = self.window(surface)?;
        Ok(window.output.and_then(|key| self.outputs.monitor_of(key)))
    }

    /// The window an output displays, `None` for a blank output.
    pub fn current_window(&self, monitor: MonitorId) -> Result<Option<SurfaceId>, FocusError> {
        let key = self.outputs.key_of(monitor)?;
        Ok(self
            .outputs
            .current_window(key)
            .and_then(|window| self.windows.surface_of(window)))
    }

    pub fn focused_output(&self) -> Option<MonitorId> {
        self.outputs
            .focused()
            .and_then(|key| self.outputs.monitor_of(key))
    }

    pub fn input_focus(&self) -> Option<SurfaceId> {
        self.focus
            .input_focus()
            .and_then(|key| self.windows.surface_of(key))
    }

    /// The window being previewed by a running gesture.
    pub fn pending(&self) -> Option<SurfaceId> {
        self.focus
            .pending()
            .and_then(|key| self.windows.surface_of(key))
    }

    pub fn is_cycling(&self) -> bool {
        self.focus.is_cycling()
    }

    /// Windows, most recently focused first.
    pub fn window_order(&self) -> Vec<SurfaceId> {
        self.windows.iter().map(|(_, w)| w.surface()).collect()
    }

    /// Outputs, focused first.
    pub fn output_order(&self) -> Vec<MonitorId> {
        self.outputs.iter().map(|(_, o)| o.monitor()).collect()
    }

    pub fn windows(&self) -> &WindowRegistry {
        &self.windows
    }

    pub fn outputs(&self) -> &OutputRegistry {
        &self.outputs
    }

    pub fn policy(&self) -> &FocusPolicy {
        &self.policy
    }

    pub fn keymap(&self) -> &Keymap {
        &self.keymap
    }

    /// Check every structural invariant, returning the first violation.
    pub fn check_invariants(&self) -> Result<(), String> {
        let linked = self.windows.recency().iter().count();
        if linked != self.windows.len() || self.windows.iter().count() != self.windows.len() {
            return Err(format!(
                "window recency list has {} entries for {} windows",
                linked,
                self.windows.len()
            ));
        }
        let linked = self.outputs.recency().iter().count();
        if linked != self.outputs.len() || self.outputs.iter().count() != self.outputs.len() {
            return Err(format!(
                "output recency list has {} entries for {} outputs",
                linked,
                self.outputs.len()
            ));
        }

        for (_, window) in self.windows.iter() {
            if let Some(output) = window.output {
                if !self.outputs.contains(output) {
                    return Err(format!(
                        "window {} is assigned to a detached output",
                        window.surface()
                    ));
                }
            }
        }

        let mut displayed = HashSet::new();
        for (key, output) in self.outputs.iter() {
            let Some(current) = output.current else {
                continue;
            };
            let Some(window) = self.windows.get(current) else {
                return Err(format!("output {} shows a dead window", output.monitor()));
            };
            if window.output != Some(key) {
                return Err(format!(
                    "output {} shows window {} which is assigned elsewhere",
                    output.monitor(),
                    window.surface()
                ));
            }
            if !displayed.insert(current) {
                return Err(format!("window {} is shown twice", window.surface()));
            }
        }

        if let Some(focus) = self.focus.input_focus() {
            if !self.windows.contains(focus) {
                return Err("input focus points at a dead window".to_string());
            }
        }
        if let Some(gesture) = self.focus.gesture() {
            if !self.outputs.contains(gesture.target) {
                return Err("gesture targets a detached output".to_string());
            }
        }
        if let Some(pending) = self.focus.pending() {
            match self.windows.get(pending) {
                None => return Err("pending window is dead".to_string()),
                Some(window) if window.output.is_none() => {
                    return Err(format!("pending window {} has no output", window.surface()))
                }
                Some(_) => {}
            }
        }

        Ok(())
    }
}
