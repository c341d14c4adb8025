//! Events from the display-server runtime and the actions sent back to it.

use serde::{Deserialize, Serialize};

use crate::keys::{Keysym, Modifiers};
use crate::output::OutputInfo;
use crate::window::WindowInfo;
use crate::{MonitorId, Rect, SurfaceId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyState {
    Pressed,
    Released,
}

/// Something that happened in the display server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    WindowMapped(WindowInfo),
    WindowUnmapped {
        surface: SurfaceId,
    },
    WindowDestroyed {
        surface: SurfaceId,
    },
    WindowTitleChanged {
        surface: SurfaceId,
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        app_id: Option<String>,
    },
    /// The client committed a new size.
    WindowResized {
        surface: SurfaceId,
        width: i32,
        height: i32,
    },
    OutputAttached(OutputInfo),
    OutputDetached {
        monitor: MonitorId,
    },
    OutputLayoutChanged {
        monitor: MonitorId,
        bounds: Rect,
    },
    Key {
        /// Modifier state reported with the key. For a release this may be
        /// the state before or after the key went up.
        #[serde(default)]
        modifiers: Modifiers,
        keysym: Keysym,
        state: KeyState,
    },
    PointerEntered {
        surface: SurfaceId,
    },
    PointerButton {
        surface: SurfaceId,
    },
}

/// A side effect the runtime should carry out.
///
/// Actions are queued while the registries are being mutated and handed out
/// only after the event has been fully processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Put the window on top of the display order.
    RaiseToFront { surface: SurfaceId },
    /// Move keyboard focus. `previous` is deactivated, `window` is activated and
    /// receives keyboard enter.
    SetInputFocus {
        window: Option<SurfaceId>,
        previous: Option<SurfaceId>,
    },
    SetWindowBounds { surface: SurfaceId, bounds: Rect },
    /// Show `window` on the output, or nothing.
    SetDisplayTarget {
        monitor: MonitorId,
        window: Option<SurfaceId>,
    },
    CloseWindow { surface: SurfaceId },
    /// Shut the compositor down.
    Terminate,
}
