//! Configuration management for the wless daemon.
//!
//! Configuration is loaded from TOML files in the following locations (in order):
//! 1. The platform config dir (`$XDG_CONFIG_HOME/wless/config.toml` on Linux)
//! 2. `~/.config/wless/config.toml`
//! 3. `./config.toml` (current directory, for development)

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use wless_core_focus::{
    Direction, FocusPolicy, Keymap, Keysym, Modifiers, NewOutputFocus, Operation, OrphanAdoption,
    Scope,
};

/// Main configuration structure for wless.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Focus behavior.
    pub behavior: BehaviorConfig,
    /// Key bindings.
    pub keybindings: KeybindingConfig,
    /// Where actions go.
    pub runtime: RuntimeConfig,
}

/// Behavior-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Whether new windows are placed and focused as soon as they map.
    #[serde(default = "default_true")]
    pub focus_new_windows: bool,

    /// Whether focus follows the pointer into a window.
    #[serde(default = "default_true")]
    pub focus_follows_pointer: bool,

    /// Which output is focused after a monitor is attached.
    #[serde(default)]
    pub new_output_focus: NewOutputFocus,

    /// Whether cycling may pull windows without an output onto the current one.
    #[serde(default)]
    pub orphan_adoption: OrphanAdoption,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            focus_new_windows: true,
            focus_follows_pointer: true,
            new_output_focus: NewOutputFocus::default(),
            orphan_adoption: OrphanAdoption::default(),
        }
    }
}

/// Runtime configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// How actions are delivered.
    #[serde(default)]
    pub output: RuntimeOutput,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeOutput {
    /// One JSON action per line on stdout.
    #[default]
    Json,
    /// Log actions and keep a headless scene.
    Headless,
}

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Key binding configuration.
///
/// Each key is a binding string (e.g., "Alt+Shift+Tab") and each value is a
/// command (e.g., "prev_window"). Supported commands:
/// - next_window, prev_window
/// - next_window_local, prev_window_local
/// - switch_output, shift_window
/// - close_window, quit
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeybindingConfig {
    /// Map of binding string to command name.
    #[serde(flatten)]
    pub bindings: HashMap<String, String>,
}

impl Default for KeybindingConfig {
    fn default() -> Self {
        let mut bindings = HashMap::new();

        // Cycling across every output
        bindings.insert("Alt+Tab".to_string(), "next_window".to_string());
        bindings.insert("Alt+Shift+Tab".to_string(), "prev_window".to_string());

        // Cycling on the focused output
        bindings.insert("Logo+Tab".to_string(), "next_window_local".to_string());
        bindings.insert("Logo+Shift+Tab".to_string(), "prev_window_local".to_string());

        // Outputs
        bindings.insert("Logo+period".to_string(), "switch_output".to_string());
        bindings.insert("Logo+Shift+greater".to_string(), "shift_window".to_string());

        bindings.insert("Logo+w".to_string(), "close_window".to_string());
        bindings.insert("Logo+Shift+Escape".to_string(), "quit".to_string());

        Self { bindings }
    }
}

/// Parse a command string into an Operation.
///
/// Returns None if the command is not recognized.
pub fn parse_command(cmd: &str) -> Option<Operation> {
    let cycle = |direction, scope| Some(Operation::CycleWindows { direction, scope });

    match cmd.to_lowercase().as_str() {
        "next_window" => cycle(Direction::Next, Scope::Global),
        "prev_window" => cycle(Direction::Prev, Scope::Global),
        "next_window_local" => cycle(Direction::Next, Scope::Local),
        "prev_window_local" => cycle(Direction::Prev, Scope::Local),
        "switch_output" => Some(Operation::SwitchOutput),
        "shift_window" => Some(Operation::ShiftWindow),
        "close_window" => Some(Operation::CloseWindow),
        "quit" => Some(Operation::Quit),
        _ => None,
    }
}

/// Parse a binding string such as "Logo+Shift+greater".
///
/// The last `+`-separated part is the key, everything before it a modifier.
/// At least one modifier is required.
pub fn parse_binding(binding: &str) -> Option<(Modifiers, Keysym)> {
    let mut parts: Vec<&str> = binding.split('+').map(str::trim).collect();
    let key = parts.pop()?;

    let mut modifiers = Modifiers::empty();
    for part in parts {
        modifiers |= Modifiers::parse_name(part)?;
    }
    if modifiers.is_empty() {
        return None;
    }

    Some((modifiers, Keysym::from_name(key)?))
}

impl Config {
    /// Load configuration from standard locations.
    ///
    /// Returns default config if no file is found.
    pub fn load() -> Result<Self> {
        let paths = config_paths();

        for path in &paths {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific path.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Build the key binding table. Bad entries are skipped with a warning.
    pub fn keymap(&self) -> Keymap {
        let mut keymap = Keymap::new();

        for (binding, command) in &self.keybindings.bindings {
            let Some((modifiers, keysym)) = parse_binding(binding) else {
                tracing::warn!("Invalid key binding: {}", binding);
                continue;
            };
            let Some(operation) = parse_command(command) else {
                tracing::warn!("Unknown command '{}' for binding {}", command, binding);
                continue;
            };
            if let Some(previous) = keymap.bind(modifiers, keysym, operation) {
                tracing::warn!("Binding {} overrides {:?}", binding, previous);
            }
        }

        keymap
    }

    /// The focus policy handed to the core.
    pub fn policy(&self) -> FocusPolicy {
        FocusPolicy {
            new_output_focus: self.behavior.new_output_focus,
            orphan_adoption: self.behavior.orphan_adoption,
            focus_new_windows: self.behavior.focus_new_windows,
            focus_follows_pointer: self.behavior.focus_follows_pointer,
        }
    }
}

/// Get all possible config file paths in priority order.
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Some(proj_dirs) = ProjectDirs::from("org", "wless", "wless") {
        paths.push(proj_dirs.config_dir().join("config.toml"));
    }

    if let Some(home) = dirs_home() {
        paths.push(home.join(".config").join("wless").join("config.toml"));
    }

    paths.push(PathBuf::from("config.toml"));

    paths
}

/// Get the user's home directory.
fn dirs_home() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf())
}
