//! Window Registry
//!
//! Owns every live window and the global window recency list.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SlotMap};
use tracing::{debug, trace};

use crate::output::OutputKey;
use crate::recency::RecencyList;
use crate::{FocusError, Rect, SurfaceId};

new_key_type! {
    /// Stable handle to a managed window.
    pub struct WindowKey;
}

/// What the runtime tells us about a window when it is mapped.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WindowInfo {
    pub surface: SurfaceId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub app_id: Option<String>,
    /// Surface of the owning window, for dialogs.
    #[serde(default)]
    pub parent: Option<SurfaceId>,
    #[serde(default)]
    pub width: i32,
    #[serde(default)]
    pub height: i32,
}

impl WindowInfo {
    pub fn new(surface: SurfaceId) -> Self {
        Self {
            surface,
            ..Default::default()
        }
    }
}

/// A managed window.
#[derive(Debug, Clone)]
pub struct Window {
    pub info: WindowInfo,
    /// Assigned output. `None` means the window is orphaned.
    pub output: Option<OutputKey>,
}

impl Window {
    pub fn surface(&self) -> SurfaceId {
        self.info.surface
    }

    pub fn display_title(&self) -> &str {
        self.info.title.as_deref().unwrap_or("EMPTY")
    }

    pub fn display_app_id(&self) -> &str {
        self.info.app_id.as_deref().unwrap_or("EMPTY")
    }

    pub fn is_dialog(&self) -> bool {
        self.info.parent.is_some()
    }

    /// Where this window goes on an output with the given layout box.
    ///
    /// Regular windows fill the output. Dialogs keep their own size and are
    /// centred, falling back to the full box if they never reported a size.
    pub fn bounds_on(&self, area: Rect) -> Rect {
        if self.is_dialog() && self.info.width > 0 && self.info.height > 0 {
            area.centered(self.info.width, self.info.height)
        } else {
            area
        }
    }
}

/// Registry of live windows.
#[derive(Debug, Clone, Default)]
pub struct WindowRegistry {
    windows: SlotMap<WindowKey, Window>,
    by_surface: HashMap<SurfaceId, WindowKey>,
    recency: RecencyList<WindowKey>,
}

impl WindowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a window at the head of the recency list, unassigned.
    pub fn register(&mut self, info: WindowInfo) -> Result<WindowKey, FocusError> {
        if self.by_surface.contains_key(&info.surface) {
            return Err(FocusError::WindowExists(info.surface));
        }

        let surface = info.surface;
        let key = self.windows.insert(Window { info, output: None });
        self.by_surface.insert(surface, key);
        self.recency.push_front(key);

        debug!("Registered window {} ({} total)", surface, self.windows.len());
        Ok(key)
    }

    /// Remove a window. Unknown or already removed handles return `None`.
    ///
    /// This only unlinks the window; clearing an output's reference to it is
    /// up to the caller.
    pub fn unregister(&mut self, key: WindowKey) -> Option<Window> {
        let window = self.windows.remove(key)?;
        self.by_surface.remove(&window.info.surface);
        self.recency.remove(key);

        debug!("Unregistered window {}", window.info.surface);
        Some(window)
    }

    /// Mark a window as the most recently focused.
    pub fn touch(&mut self, key: WindowKey) {
        trace!("Touch window {:?}", key);
        self.recency.move_to_front(key);
    }

    pub fn get(&self, key: WindowKey) -> Option<&Window> {
        self.windows.get(key)
    }

    pub fn get_mut(&mut self, key: WindowKey) -> Option<&mut Window> {
        self.windows.get_mut(key)
    }

    pub fn contains(&self, key: WindowKey) -> bool {
        self.windows.contains_key(key)
    }

    pub fn key_of(&self, surface: SurfaceId) -> Result<WindowKey, FocusError> {
        self.by_surface
            .get(&surface)
            .copied()
            .ok_or(FocusError::WindowNotFound(surface))
    }

    pub fn surface_of(&self, key: WindowKey) -> Option<SurfaceId> {
        self.windows.get(key).map(Window::surface)
    }

    /// Set or clear a window's assigned output.
    pub fn assign(&mut self, key: WindowKey, output: Option<OutputKey>) {
        if let Some(window) = self.windows.get_mut(key) {
            window.output = output;
        }
    }

    /// Windows assigned to `output`, most recent first.
    pub fn on_output(&self, output: OutputKey) -> Vec<WindowKey> {
        self.iter()
            .filter(|(_, window)| window.output == Some(output))
            .map(|(key, _)| key)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Iterate in recency order, most recent first.
    pub fn iter(&self) -> impl Iterator<Item = (WindowKey, &Window)> + '_ {
        self.recency
            .iter()
            .filter_map(move |key| self.windows.get(key).map(|window| (key, window)))
    }

    pub fn recency(&self) -> &RecencyList<WindowKey> {
        &self.recency
    }
}
