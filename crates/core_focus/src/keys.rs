//! Key bindings: modifier masks, keysyms and the injected binding table.

use std::collections::HashMap;
use std::fmt;

use bitflags::bitflags;
use serde::{de::Visitor, Deserialize, Serialize};

use crate::{Direction, Scope};

bitflags! {
    /// Keyboard modifier state, bit-compatible with the runtime's modifier mask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u32 {
        const SHIFT = 1;
        const CAPS = 1 << 1;
        const CTRL = 1 << 2;
        /// Mod1
        const ALT = 1 << 3;
        /// Num Lock
        const MOD2 = 1 << 4;
        const MOD3 = 1 << 5;
        /// Mod4
        const LOGO = 1 << 6;
        const MOD5 = 1 << 7;
    }
}

impl Modifiers {
    /// Parse a single modifier name as written in key binding strings.
    ///
    /// Case-insensitive with aliases (`Super`, `Mod4` and `Win` all mean
    /// Logo). The generated `from_name` only takes exact flag names.
    pub fn parse_name(name: &str) -> Option<Modifiers> {
        match name.to_ascii_lowercase().as_str() {
            "shift" => Some(Modifiers::SHIFT),
            "caps" | "lock" => Some(Modifiers::CAPS),
            "ctrl" | "control" => Some(Modifiers::CTRL),
            "alt" | "mod1" => Some(Modifiers::ALT),
            "mod2" => Some(Modifiers::MOD2),
            "mod3" => Some(Modifiers::MOD3),
            "logo" | "super" | "win" | "mod4" => Some(Modifiers::LOGO),
            "mod5" => Some(Modifiers::MOD5),
            _ => None,
        }
    }
}

// serde impls: modifiers travel as their raw bit mask

impl Serialize for Modifiers {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u32(self.bits())
    }
}

impl<'de> Deserialize<'de> for Modifiers {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct ModifiersVisitor;

        impl<'de> Visitor<'de> for ModifiersVisitor {
            type Value = Modifiers;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a modifier bit mask")
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                let bits = u32::try_from(v).map_err(E::custom)?;
                Ok(Modifiers::from_bits_truncate(bits))
            }
        }

        deserializer.deserialize_u32(ModifiersVisitor)
    }
}

/// An XKB keysym.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Keysym(pub u32);

impl Keysym {
    pub const SPACE: Keysym = Keysym(0x0020);
    pub const COMMA: Keysym = Keysym(0x002c);
    pub const PERIOD: Keysym = Keysym(0x002e);
    pub const LESS: Keysym = Keysym(0x003c);
    pub const GREATER: Keysym = Keysym(0x003e);
    pub const ISO_LEVEL3_SHIFT: Keysym = Keysym(0xfe03);
    pub const ISO_LEFT_TAB: Keysym = Keysym(0xfe20);
    pub const BACKSPACE: Keysym = Keysym(0xff08);
    pub const TAB: Keysym = Keysym(0xff09);
    pub const RETURN: Keysym = Keysym(0xff0d);
    pub const ESCAPE: Keysym = Keysym(0xff1b);
    pub const LEFT: Keysym = Keysym(0xff51);
    pub const UP: Keysym = Keysym(0xff52);
    pub const RIGHT: Keysym = Keysym(0xff53);
    pub const DOWN: Keysym = Keysym(0xff54);
    pub const F1: Keysym = Keysym(0xffbe);
    pub const F12: Keysym = Keysym(0xffc9);
    pub const SHIFT_L: Keysym = Keysym(0xffe1);
    pub const SHIFT_R: Keysym = Keysym(0xffe2);
    pub const CONTROL_L: Keysym = Keysym(0xffe3);
    pub const CONTROL_R: Keysym = Keysym(0xffe4);
    pub const META_L: Keysym = Keysym(0xffe7);
    pub const META_R: Keysym = Keysym(0xffe8);
    pub const ALT_L: Keysym = Keysym(0xffe9);
    pub const ALT_R: Keysym = Keysym(0xffea);
    pub const SUPER_L: Keysym = Keysym(0xffeb);
    pub const SUPER_R: Keysym = Keysym(0xffec);
    pub const HYPER_L: Keysym = Keysym(0xffed);
    pub const HYPER_R: Keysym = Keysym(0xffee);

    const NAMED: &'static [(&'static str, Keysym)] = &[
        ("space", Keysym::SPACE),
        ("comma", Keysym::COMMA),
        ("period", Keysym::PERIOD),
        ("less", Keysym::LESS),
        ("greater", Keysym::GREATER),
        ("iso_left_tab", Keysym::ISO_LEFT_TAB),
        ("backspace", Keysym::BACKSPACE),
        ("tab", Keysym::TAB),
        ("return", Keysym::RETURN),
        ("enter", Keysym::RETURN),
        ("escape", Keysym::ESCAPE),
        ("esc", Keysym::ESCAPE),
        ("left", Keysym::LEFT),
        ("up", Keysym::UP),
        ("right", Keysym::RIGHT),
        ("down", Keysym::DOWN),
        ("shift_l", Keysym::SHIFT_L),
        ("shift_r", Keysym::SHIFT_R),
        ("control_l", Keysym::CONTROL_L),
        ("control_r", Keysym::CONTROL_R),
        ("alt_l", Keysym::ALT_L),
        ("alt_r", Keysym::ALT_R),
        ("super_l", Keysym::SUPER_L),
        ("super_r", Keysym::SUPER_R),
    ];

    /// Look up a keysym by its XKB name, case-insensitively.
    ///
    /// Single printable ASCII characters map to themselves, so `"w"` and
    /// `">"` both work.
    pub fn from_name(name: &str) -> Option<Keysym> {
        let mut chars = name.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            if c.is_ascii_graphic() {
                return Some(Keysym(c.to_ascii_lowercase() as u32));
            }
        }

        let lower = name.to_ascii_lowercase();
        if let Some((_, keysym)) = Self::NAMED.iter().find(|(n, _)| *n == lower) {
            return Some(*keysym);
        }

        // F1..F12
        let number = lower.strip_prefix('f')?.parse::<u32>().ok()?;
        (1..=12)
            .contains(&number)
            .then(|| Keysym(Keysym::F1.0 + number - 1))
    }

    /// The modifier this key drives, if it is a modifier key.
    pub fn modifier(self) -> Option<Modifiers> {
        match self {
            Keysym::SHIFT_L | Keysym::SHIFT_R => Some(Modifiers::SHIFT),
            Keysym::CONTROL_L | Keysym::CONTROL_R => Some(Modifiers::CTRL),
            // xkb reports Alt as Meta when Shift went down first
            Keysym::ALT_L | Keysym::ALT_R | Keysym::META_L | Keysym::META_R => {
                Some(Modifiers::ALT)
            }
            Keysym::SUPER_L | Keysym::SUPER_R | Keysym::HYPER_L | Keysym::HYPER_R => {
                Some(Modifiers::LOGO)
            }
            Keysym::ISO_LEVEL3_SHIFT => Some(Modifiers::MOD5),
            _ => None,
        }
    }
}

/// What a key binding triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Step the cycling gesture through the window recency list.
    CycleWindows { direction: Direction, scope: Scope },
    /// Focus the least recently focused output.
    SwitchOutput,
    /// Move the current window to the least recently focused output.
    ShiftWindow,
    /// Ask the runtime to close the current window.
    CloseWindow,
    Quit,
}

/// The injected `(modifiers, keysym) -> operation` table.
#[derive(Debug, Clone, Default)]
pub struct Keymap {
    bindings: HashMap<(Modifiers, Keysym), Operation>,
}

impl Keymap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a binding. Returns the operation previously bound, if any.
    pub fn bind(
        &mut self,
        modifiers: Modifiers,
        keysym: Keysym,
        operation: Operation,
    ) -> Option<Operation> {
        self.bindings.insert((modifiers, Self::normalize(keysym)), operation)
    }

    /// Find the operation for a key press. Caps Lock never affects a match.
    pub fn lookup(&self, modifiers: Modifiers, keysym: Keysym) -> Option<Operation> {
        let modifiers = modifiers - Modifiers::CAPS;
        self.bindings
            .get(&(modifiers, Self::normalize(keysym)))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(Modifiers, Keysym), &Operation)> {
        self.bindings.iter()
    }

    // Shift+Tab arrives as ISO_Left_Tab on most layouts
    fn normalize(keysym: Keysym) -> Keysym {
        match keysym {
            Keysym::ISO_LEFT_TAB => Keysym::TAB,
            other => other,
        }
    }
}
