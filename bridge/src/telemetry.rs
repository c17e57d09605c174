//! Remote-controller telemetry model.
//!
//! Mirrors the controller's key/value change stream: each physical input
//! (stick axis, momentary button, dial, mode switch, five-way pad) is a
//! key, and interested parties subscribe per key through [`KeyHub`].

use std::collections::HashMap;

use log::trace;

/// A subscribable telemetry field on the remote controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RcKey {
    StickLeftHorizontal,
    StickLeftVertical,
    StickRightHorizontal,
    StickRightVertical,
    ShutterButton,
    RecordButton,
    GoHomeButton,
    PauseButton,
    CustomButton1,
    CustomButton2,
    CustomButton3,
    AuthLedButton,
    FlightModeSwitch,
    LeftDial,
    RightDial,
    ScrollWheel,
    FiveWayPad,
    Connection,
}

impl RcKey {
    /// Human-readable label for status displays.
    pub fn label(&self) -> &'static str {
        match self {
            RcKey::StickLeftHorizontal => "left stick horizontal",
            RcKey::StickLeftVertical => "left stick vertical",
            RcKey::StickRightHorizontal => "right stick horizontal",
            RcKey::StickRightVertical => "right stick vertical",
            RcKey::ShutterButton => "shutter button",
            RcKey::RecordButton => "record button",
            RcKey::GoHomeButton => "go-home button",
            RcKey::PauseButton => "pause button",
            RcKey::CustomButton1 => "custom button C1",
            RcKey::CustomButton2 => "custom button C2",
            RcKey::CustomButton3 => "custom button C3",
            RcKey::AuthLedButton => "auth LED button",
            RcKey::FlightModeSwitch => "flight mode switch",
            RcKey::LeftDial => "left dial",
            RcKey::RightDial => "right dial",
            RcKey::ScrollWheel => "scroll wheel",
            RcKey::FiveWayPad => "five-way pad",
            RcKey::Connection => "controller connection",
        }
    }
}

/// A telemetry value, typed per key kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RcValue {
    /// Stick axis or dial position.
    Axis(i16),
    /// Momentary button pressed state.
    Button(bool),
    /// Five-way pad composite state.
    FiveWay(FiveWayStatus),
    /// Three-position flight mode switch.
    Mode(ModeSwitchPosition),
    /// Controller link presence.
    Connected(bool),
}

/// Composite state of the five-way pad: any subset of the four
/// directions plus the middle press can be active at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FiveWayStatus {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub middle: bool,
}

impl FiveWayStatus {
    /// Names of the currently active directions, in a fixed order.
    pub fn active_directions(&self) -> Vec<&'static str> {
        let mut active = Vec::new();
        if self.up {
            active.push("up");
        }
        if self.down {
            active.push("down");
        }
        if self.left {
            active.push("left");
        }
        if self.right {
            active.push("right");
        }
        if self.middle {
            active.push("middle");
        }
        active
    }

    pub fn is_idle(&self) -> bool {
        !(self.up || self.down || self.left || self.right || self.middle)
    }
}

impl std::fmt::Display for FiveWayStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_idle() {
            write!(f, "idle")
        } else {
            write!(f, "{}", self.active_directions().join("+"))
        }
    }
}

/// Position of the three-way flight mode switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeSwitchPosition {
    One,
    Two,
    Three,
}

impl std::fmt::Display for ModeSwitchPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModeSwitchPosition::One => write!(f, "position 1"),
            ModeSwitchPosition::Two => write!(f, "position 2"),
            ModeSwitchPosition::Three => write!(f, "position 3"),
        }
    }
}

/// Name of a physical shortcut key on the controller body, looked up by
/// its hardware key code. Codes 131 through 136 map to L1, L2, L3, R1,
/// R2, R3; anything else is unknown.
pub fn physical_button_name(key_code: u16) -> Option<&'static str> {
    match key_code {
        131 => Some("L1"),
        132 => Some("L2"),
        133 => Some("L3"),
        134 => Some("R1"),
        135 => Some("R2"),
        136 => Some("R3"),
        _ => None,
    }
}

type Listener = Box<dyn FnMut(&RcValue) + Send>;

/// Per-key listener registry for the telemetry change stream.
///
/// Dispatch is single-threaded: the source publishes one sample at a
/// time and listeners for that key run in registration order before
/// `publish` returns, so samples are always processed in arrival order.
#[derive(Default)]
pub struct KeyHub {
    listeners: HashMap<RcKey, Vec<Listener>>,
}

impl KeyHub {
    pub fn new() -> Self {
        KeyHub {
            listeners: HashMap::new(),
        }
    }

    /// Register a listener for one key.
    pub fn listen<F>(&mut self, key: RcKey, listener: F)
    where
        F: FnMut(&RcValue) + Send + 'static,
    {
        self.listeners.entry(key).or_default().push(Box::new(listener));
    }

    /// Deliver a sample to every listener registered for its key.
    pub fn publish(&mut self, key: RcKey, value: RcValue) {
        trace!("telemetry {:?} = {:?}", key, value);
        if let Some(listeners) = self.listeners.get_mut(&key) {
            for listener in listeners.iter_mut() {
                listener(&value);
            }
        }
    }

    /// Drop every registered listener. Used at session teardown so no
    /// callback outlives the screen it updates.
    pub fn clear(&mut self) {
        self.listeners.clear();
    }

    pub fn listener_count(&self, key: RcKey) -> usize {
        self.listeners.get(&key).map_or(0, Vec::len)
    }
}
