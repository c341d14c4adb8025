//! End-to-end tests for the wless focus core.
//!
//! These drive a `Desktop` with JSON-lines event scripts, the same format the
//! daemon reads on stdin, and apply the resulting actions to a headless
//! runtime. They cover:
//! - Two-phase window cycling across outputs
//! - Reassignment when windows and outputs disappear
//! - Termination when the last output is detached
//! - The JSON action stream

use std::io::Cursor;

use wless_core_focus::{
    Action, Desktop, Direction, FocusPolicy, Keymap, Keysym, Modifiers, Operation, Rect, Scope,
};
use wless_runtime::{read_events, HeadlessRuntime, JsonRuntime, Runtime};

// ============================================================================
// Harness
// ============================================================================

struct Session<R: Runtime> {
    desktop: Desktop,
    runtime: R,
    terminated: bool,
}

impl<R: Runtime> Session<R> {
    fn new(policy: FocusPolicy, runtime: R) -> Self {
        Self {
            desktop: Desktop::new(keymap(), policy),
            runtime,
            terminated: false,
        }
    }

    /// Feed a script of JSON-lines events, applying actions after each one.
    fn feed(&mut self, script: &str) {
        let desktop = &mut self.desktop;
        let runtime = &mut self.runtime;
        let terminated = &mut self.terminated;

        read_events(Cursor::new(script), |event| {
            desktop.handle_event(event);
            assert_eq!(desktop.check_invariants(), Ok(()));
            for action in desktop.drain_actions() {
                runtime.apply(&action).expect("apply action");
                if action == Action::Terminate {
                    *terminated = true;
                }
            }
            !*terminated
        })
        .expect("read script");
    }
}

fn keymap() -> Keymap {
    let mut keymap = Keymap::new();
    let bindings = [
        (
            Modifiers::ALT,
            Keysym::TAB,
            Operation::CycleWindows {
                direction: Direction::Next,
                scope: Scope::Global,
            },
        ),
        (
            Modifiers::ALT | Modifiers::SHIFT,
            Keysym::TAB,
            Operation::CycleWindows {
                direction: Direction::Prev,
                scope: Scope::Global,
            },
        ),
        (
            Modifiers::LOGO,
            Keysym::TAB,
            Operation::CycleWindows {
                direction: Direction::Next,
                scope: Scope::Local,
            },
        ),
        (Modifiers::LOGO, Keysym::PERIOD, Operation::SwitchOutput),
        (Modifiers::LOGO, Keysym(0x0077), Operation::CloseWindow),
        (Modifiers::LOGO | Modifiers::SHIFT, Keysym::ESCAPE, Operation::Quit),
    ];
    for (modifiers, keysym, operation) in bindings {
        keymap.bind(modifiers, keysym, operation);
    }
    keymap
}

fn headless() -> Session<HeadlessRuntime> {
    Session::new(FocusPolicy::default(), HeadlessRuntime::new())
}

const ATTACH_O1: &str = r#"{"type":"output_attached","monitor":1,"name":"DP-1","bounds":{"x":0,"y":0,"width":1920,"height":1080}}"#;
const ATTACH_O2: &str = r#"{"type":"output_attached","monitor":2,"name":"HDMI-A-1","bounds":{"x":1920,"y":0,"width":1280,"height":1024}}"#;

// Alt = 8, Tab = 0xff09, Alt_L = 0xffe9
const ALT_TAB: &str = r#"{"type":"key","modifiers":8,"keysym":65289,"state":"pressed"}"#;
const ALT_RELEASE: &str = r#"{"type":"key","modifiers":8,"keysym":65513,"state":"released"}"#;

fn lines(lines: &[&str]) -> String {
    lines.join("\n")
}

// ============================================================================
// Cycling
// ============================================================================

/// Outputs O1 and O2; A on O1, B on O2, C unassigned. Cycling globally from A
/// previews B, then C, and C is adopted by the focused output.
#[test]
fn test_global_cycle_adopts_orphan_onto_focused_output() {
    let policy = FocusPolicy {
        focus_new_windows: false,
        ..FocusPolicy::default()
    };
    let mut session = Session::new(policy, HeadlessRuntime::new());

    session.feed(&lines(&[
        ATTACH_O1,
        r#"{"type":"window_mapped","surface":10,"title":"A"}"#,
        ATTACH_O2,
        r#"{"type":"window_mapped","surface":20,"title":"B"}"#,
        r#"{"type":"window_mapped","surface":30,"title":"C"}"#,
        // Bring the recency order to A, B, C
        r#"{"type":"pointer_button","surface":20}"#,
        r#"{"type":"pointer_button","surface":10}"#,
    ]));

    let desktop = &session.desktop;
    assert_eq!(desktop.window_output(10), Ok(Some(1)));
    assert_eq!(desktop.window_output(20), Ok(Some(2)));
    assert_eq!(desktop.window_output(30), Ok(None));
    assert_eq!(desktop.window_order(), vec![10, 20, 30]);
    assert_eq!(desktop.focused_output(), Some(1));

    session.feed(ALT_TAB);
    assert_eq!(session.desktop.pending(), Some(20));
    assert_eq!(session.runtime.top(), Some(20));
    // Preview only
    assert_eq!(session.desktop.input_focus(), Some(10));
    assert_eq!(session.runtime.focused(), Some(10));

    session.feed(ALT_TAB);
    assert_eq!(session.desktop.pending(), Some(30));
    assert_eq!(session.desktop.window_output(30), Ok(Some(1)));
    assert_eq!(session.desktop.current_window(1), Ok(Some(30)));
    assert_eq!(session.runtime.displayed(1), Some(30));
    assert_eq!(session.runtime.top(), Some(30));
    assert_eq!(session.runtime.bounds(30), Some(Rect::new(0, 0, 1920, 1080)));

    session.feed(ALT_RELEASE);
    assert!(!session.desktop.is_cycling());
    assert_eq!(session.desktop.input_focus(), Some(30));
    assert_eq!(session.runtime.focused(), Some(30));
    assert_eq!(session.desktop.window_order()[0], 30);
}

/// A full Alt+Tab, release returns to the previously focused window.
#[test]
fn test_alt_tab_toggles_between_two_windows() {
    let mut session = headless();
    session.feed(&lines(&[
        ATTACH_O1,
        r#"{"type":"window_mapped","surface":1}"#,
        r#"{"type":"window_mapped","surface":2}"#,
    ]));
    assert_eq!(session.runtime.focused(), Some(2));

    session.feed(&lines(&[ALT_TAB, ALT_RELEASE]));
    assert_eq!(session.runtime.focused(), Some(1));
    assert_eq!(session.runtime.displayed(1), Some(1));

    session.feed(&lines(&[ALT_TAB, ALT_RELEASE]));
    assert_eq!(session.runtime.focused(), Some(2));
    assert_eq!(session.desktop.window_order(), vec![2, 1]);
}

/// Releasing an unrelated key does not end the gesture.
#[test]
fn test_gesture_survives_unrelated_release() {
    let mut session = headless();
    session.feed(&lines(&[
        ATTACH_O1,
        r#"{"type":"window_mapped","surface":1}"#,
        r#"{"type":"window_mapped","surface":2}"#,
        ALT_TAB,
        r#"{"type":"key","modifiers":8,"keysym":65289,"state":"released"}"#,
    ]));
    assert!(session.desktop.is_cycling());
    assert_eq!(session.desktop.pending(), Some(1));
    assert_eq!(session.runtime.focused(), Some(2));
}

/// Destroying the previewed window keeps the gesture going on a replacement.
#[test]
fn test_pending_window_destroyed_mid_gesture() {
    let mut session = headless();
    session.feed(&lines(&[
        ATTACH_O1,
        r#"{"type":"window_mapped","surface":1}"#,
        r#"{"type":"window_mapped","surface":2}"#,
        r#"{"type":"window_mapped","surface":3}"#,
        ALT_TAB,
    ]));
    assert_eq!(session.desktop.pending(), Some(2));

    session.feed(r#"{"type":"window_destroyed","surface":2}"#);
    let pending = session.desktop.pending();
    assert!(pending.is_some());
    assert_ne!(pending, Some(2));
    assert!(session.desktop.is_cycling());

    session.feed(ALT_RELEASE);
    assert_eq!(session.runtime.focused(), pending);
}

// ============================================================================
// Reassignment
// ============================================================================

/// Single output with A and B; destroying B while it is shown leaves A shown.
#[test]
fn test_destroying_current_window_shows_replacement() {
    let mut session = headless();
    session.feed(&lines(&[
        ATTACH_O1,
        r#"{"type":"window_mapped","surface":10,"title":"A"}"#,
        r#"{"type":"window_mapped","surface":20,"title":"B"}"#,
    ]));
    assert_eq!(session.desktop.current_window(1), Ok(Some(20)));

    session.feed(r#"{"type":"window_destroyed","surface":20}"#);
    assert_eq!(session.desktop.current_window(1), Ok(Some(10)));
    assert_eq!(session.desktop.input_focus(), Some(10));
    assert_eq!(session.runtime.displayed(1), Some(10));
    assert_eq!(session.runtime.focused(), Some(10));
}

/// Two outputs, A on O1; detaching O1 moves A onto O2.
#[test]
fn test_detaching_output_moves_window_to_survivor() {
    let mut session = headless();
    session.feed(&lines(&[
        ATTACH_O1,
        r#"{"type":"window_mapped","surface":10,"title":"A"}"#,
        ATTACH_O2,
    ]));
    assert_eq!(session.desktop.current_window(2), Ok(None));

    session.feed(r#"{"type":"output_detached","monitor":1}"#);
    assert!(!session.terminated);
    assert_eq!(session.desktop.window_output(10), Ok(Some(2)));
    assert_eq!(session.desktop.current_window(2), Ok(Some(10)));
    assert_eq!(session.desktop.input_focus(), Some(10));
    assert_eq!(session.runtime.displayed(2), Some(10));
    assert_eq!(
        session.runtime.bounds(10),
        Some(Rect::new(1920, 0, 1280, 1024))
    );
}

/// Unmapping the last window blanks the output.
#[test]
fn test_last_window_unmapped_blanks_output() {
    let mut session = headless();
    session.feed(&lines(&[
        ATTACH_O1,
        r#"{"type":"window_mapped","surface":5}"#,
        r#"{"type":"window_unmapped","surface":5}"#,
    ]));
    assert_eq!(session.desktop.current_window(1), Ok(None));
    assert_eq!(session.desktop.input_focus(), None);
    assert_eq!(session.runtime.displayed(1), None);
    assert!(session.desktop.windows().is_empty());
}

/// Windows mapped before any output stay orphaned until one appears.
#[test]
fn test_orphans_adopted_when_first_output_attached() {
    let mut session = headless();
    session.feed(&lines(&[
        r#"{"type":"window_mapped","surface":1}"#,
        r#"{"type":"window_mapped","surface":2}"#,
    ]));
    assert_eq!(session.desktop.window_output(2), Ok(None));

    session.feed(ATTACH_O1);
    assert_eq!(session.desktop.current_window(1), Ok(Some(2)));
    assert_eq!(session.runtime.focused(), Some(2));
}

/// Layout changes move every window on the output.
#[test]
fn test_layout_change_rebounds_windows() {
    let mut session = headless();
    session.feed(&lines(&[
        ATTACH_O1,
        r#"{"type":"window_mapped","surface":1}"#,
        r#"{"type":"window_mapped","surface":2}"#,
        r#"{"type":"output_layout_changed","monitor":1,"bounds":{"x":0,"y":0,"width":2560,"height":1440}}"#,
    ]));
    assert_eq!(session.runtime.bounds(1), Some(Rect::new(0, 0, 2560, 1440)));
    assert_eq!(session.runtime.bounds(2), Some(Rect::new(0, 0, 2560, 1440)));
}

// ============================================================================
// Termination
// ============================================================================

#[test]
fn test_last_output_detached_terminates() {
    let mut session = headless();
    session.feed(&lines(&[
        ATTACH_O1,
        r#"{"type":"window_mapped","surface":1}"#,
        r#"{"type":"output_detached","monitor":1}"#,
        // Never processed
        ATTACH_O2,
    ]));
    assert!(session.terminated);
    assert!(session.desktop.outputs().is_empty());
    assert_eq!(session.desktop.window_output(1), Ok(None));
}

#[test]
fn test_quit_binding_terminates() {
    let mut session = headless();
    // Logo|Shift = 65, Escape = 0xff1b
    session.feed(&lines(&[
        ATTACH_O1,
        r#"{"type":"key","modifiers":65,"keysym":65307,"state":"pressed"}"#,
    ]));
    assert!(session.terminated);
}

// ============================================================================
// JSON action stream
// ============================================================================

#[test]
fn test_json_runtime_streams_actions() {
    let mut session = Session::new(FocusPolicy::default(), JsonRuntime::new(Vec::new()));
    session.feed(&lines(&[
        ATTACH_O1,
        r#"{"type":"window_mapped","surface":7}"#,
        r#"{"type":"output_detached","monitor":1}"#,
    ]));

    let output = String::from_utf8(session.runtime.into_inner()).unwrap();
    let actions: Vec<Action> = output
        .lines()
        .map(|line| serde_json::from_str(line).expect("action line"))
        .collect();

    assert_eq!(
        actions,
        vec![
            Action::SetWindowBounds {
                surface: 7,
                bounds: Rect::new(0, 0, 1920, 1080),
            },
            Action::SetDisplayTarget {
                monitor: 1,
                window: Some(7),
            },
            Action::RaiseToFront { surface: 7 },
            Action::SetInputFocus {
                window: Some(7),
                previous: None,
            },
            Action::Terminate,
        ]
    );
}
