//! Focus Ring
//!
//! Traversal of the window recency list and the two-phase cycling gesture:
//! - `advance` previews a candidate (display and raise only)
//! - releasing the gesture modifier commits it (recency and input focus)
//! - pointer and map-time focus commit directly with no preview

use tracing::{debug, info, trace};

use crate::desktop::Desktop;
use crate::keys::Modifiers;
use crate::output::OutputKey;
use crate::window::{WindowKey, WindowRegistry};
use crate::{Action, Direction, OrphanAdoption, Scope, SurfaceId};

/// An in-progress cycling gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gesture {
    pub direction: Direction,
    pub scope: Scope,
    /// Output that adopts orphans and bounds local traversal. Fixed for the
    /// whole gesture.
    pub target: OutputKey,
    /// Releasing any of these modifiers commits the gesture.
    pub release: Modifiers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CycleState {
    #[default]
    Idle,
    Cycling {
        pending: WindowKey,
        gesture: Gesture,
    },
}

/// Focus state that is not owned by either registry.
///
/// Both fields are weak: whoever unregisters a window clears them.
#[derive(Debug, Clone, Default)]
pub struct FocusRing {
    pub(crate) state: CycleState,
    pub(crate) input_focus: Option<WindowKey>,
}

impl FocusRing {
    pub fn state(&self) -> CycleState {
        self.state
    }

    pub fn pending(&self) -> Option<WindowKey> {
        match self.state {
            CycleState::Cycling { pending, .. } => Some(pending),
            CycleState::Idle => None,
        }
    }

    pub fn gesture(&self) -> Option<Gesture> {
        match self.state {
            CycleState::Cycling { gesture, .. } => Some(gesture),
            CycleState::Idle => None,
        }
    }

    pub fn is_cycling(&self) -> bool {
        matches!(self.state, CycleState::Cycling { .. })
    }

    pub fn input_focus(&self) -> Option<WindowKey> {
        self.input_focus
    }

    /// Drop the gesture without committing it.
    pub(crate) fn cancel(&mut self) -> Option<(WindowKey, Gesture)> {
        match std::mem::take(&mut self.state) {
            CycleState::Cycling { pending, gesture } => Some((pending, gesture)),
            CycleState::Idle => None,
        }
    }
}

/// Walk the window recency list from `origin` to the first eligible window.
///
/// With no origin the walk starts at the list boundary: `Next` tries the head
/// first, `Prev` the tail. The walk visits each entry at most once and gives
/// up when it comes back around to `origin`.
pub fn find_candidate(
    windows: &WindowRegistry,
    origin: Option<WindowKey>,
    direction: Direction,
    scope: Scope,
    target: OutputKey,
    adoption: OrphanAdoption,
) -> Option<WindowKey> {
    let recency = windows.recency();
    let origin = origin.filter(|key| recency.contains(*key));

    let step = |key: WindowKey| match direction {
        Direction::Next => recency.next(key),
        Direction::Prev => recency.prev(key),
    };

    let eligible = |key: WindowKey| match windows.get(key).map(|w| w.output) {
        Some(None) => adoption == OrphanAdoption::Adopt,
        Some(Some(output)) => scope == Scope::Global || output == target,
        None => false,
    };

    let mut cursor = match origin {
        Some(origin) => step(origin)?,
        None => match direction {
            Direction::Next => recency.front()?,
            Direction::Prev => recency.back()?,
        },
    };

    for _ in 0..recency.len() {
        if Some(cursor) == origin {
            return None;
        }
        if eligible(cursor) {
            return Some(cursor);
        }
        cursor = step(cursor)?;
    }
    None
}

impl Desktop {
    /// Step the cycling gesture once and preview the result.
    ///
    /// Starts from the pending window, or from the target output's current
    /// window when no gesture is running. The candidate is adopted by the
    /// target if it has no output, shown on its output and raised. Input
    /// focus and recency are left alone.
    pub(crate) fn advance(&mut self, gesture: Gesture) -> Option<WindowKey> {
        let origin = self
            .focus
            .pending()
            .or_else(|| self.outputs.current_window(gesture.target));

        let candidate = find_candidate(
            &self.windows,
            origin,
            gesture.direction,
            gesture.scope,
            gesture.target,
            self.policy.orphan_adoption,
        );
        let Some(candidate) = candidate else {
            debug!("Nothing to cycle to ({:?}, {:?})", gesture.direction, gesture.scope);
            return None;
        };

        let output = match self.windows.get(candidate).and_then(|w| w.output) {
            Some(output) => output,
            None => {
                self.place_window(candidate, gesture.target);
                gesture.target
            }
        };

        self.show(output, candidate);
        self.raise(candidate);
        self.focus.state = CycleState::Cycling {
            pending: candidate,
            gesture,
        };

        trace!("Previewing window {:?}", self.windows.surface_of(candidate));
        Some(candidate)
    }

    /// Handle a cycle key press.
    ///
    /// The first press fixes the gesture target to the focused output and
    /// records which held modifiers end the gesture. Without such a modifier
    /// the step commits immediately.
    pub fn cycle(&mut self, direction: Direction, scope: Scope, modifiers: Modifiers) {
        let (target, release) = match self.focus.gesture() {
            Some(gesture) => (gesture.target, gesture.release),
            None => {
                let Some(target) = self.outputs.focused() else {
                    debug!("No output to cycle on");
                    return;
                };
                let release = modifiers - (Modifiers::SHIFT | Modifiers::CAPS | Modifiers::MOD2);
                (target, release)
            }
        };

        self.advance(Gesture {
            direction,
            scope,
            target,
            release,
        });

        if release.is_empty() {
            self.commit_pending();
        }
    }

    /// Finish the gesture: the pending window gets recency and input focus.
    pub fn commit_pending(&mut self) {
        let Some((pending, _)) = self.focus.cancel() else {
            return;
        };

        if let Some(window) = self.windows.get(pending) {
            info!(
                "Committing focus to {} [{}]",
                window.display_title(),
                window.display_app_id()
            );
        }
        self.focus_window(pending);
    }

    /// Focus a window directly, bypassing the preview phase.
    ///
    /// Used for pointer focus and for newly mapped windows. Cancels any
    /// running gesture. Orphans are placed on the focused output first.
    pub(crate) fn commit_focus(&mut self, key: WindowKey) {
        if let Some((pending, _)) = self.focus.cancel() {
            debug!("Gesture cancelled at {:?}", self.windows.surface_of(pending));
        }

        let Some(assigned) = self.windows.get(key).map(|w| w.output) else {
            return;
        };
        let output = match assigned.or_else(|| self.outputs.focused()) {
            Some(output) => output,
            None => {
                debug!("No output for window {:?}, leaving it orphaned", self.windows.surface_of(key));
                return;
            }
        };
        if assigned.is_none() {
            self.place_window(key, output);
        }

        if self.focus.input_focus == Some(key) && self.outputs.current_window(output) == Some(key) {
            return;
        }

        self.show(output, key);
        self.raise(key);
        self.focus_window(key);
    }

    /// Give a window recency and input focus. Its output becomes focused too.
    pub(crate) fn focus_window(&mut self, key: WindowKey) {
        let Some(output) = self.windows.get(key).map(|w| w.output) else {
            return;
        };
        self.windows.touch(key);
        if let Some(output) = output {
            self.outputs.touch(output);
        }
        self.handoff(Some(key));
    }

    /// Move keyboard focus, deactivating whoever had it.
    pub(crate) fn handoff(&mut self, window: Option<WindowKey>) {
        if self.focus.input_focus == window {
            return;
        }

        let previous = self.focus.input_focus.and_then(|key| self.windows.surface_of(key));
        let next: Option<SurfaceId> = window.and_then(|key| self.windows.surface_of(key));
        self.focus.input_focus = window;

        debug!("Input focus {:?} -> {:?}", previous, next);
        self.actions.push_back(Action::SetInputFocus {
            window: next,
            previous,
        });
    }
}
