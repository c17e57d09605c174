//! Console rendering of the latest telemetry values.

use std::collections::BTreeMap;

use bridge::{LinkState, RcKey, RcValue};
use servo::ServoAngle;

/// Latest text per telemetry field plus the link status line. The hub
/// listeners write into this; the main loop renders it.
pub struct TelemetryPanel {
    values: BTreeMap<&'static str, String>,
    servo_angle: Option<ServoAngle>,
    link_status: String,
}

impl TelemetryPanel {
    pub fn new() -> Self {
        TelemetryPanel {
            values: BTreeMap::new(),
            servo_angle: None,
            link_status: LinkState::Disconnected.to_string(),
        }
    }

    /// Record the latest value for one field.
    pub fn update(&mut self, key: RcKey, value: &RcValue) {
        self.values.insert(key.label(), format_value(value));
    }

    pub fn set_servo_angle(&mut self, angle: ServoAngle) {
        self.servo_angle = Some(angle);
    }

    pub fn set_link_status(&mut self, state: &LinkState) {
        self.link_status = state.to_string();
        if !state.is_connected() {
            // mirror the link: no angle is meaningful without a peer
            self.servo_angle = None;
        }
    }

    pub fn link_status(&self) -> &str {
        &self.link_status
    }

    /// Render the panel as console lines.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("servo link: {}\n", self.link_status));
        match self.servo_angle {
            Some(angle) => out.push_str(&format!("servo angle: {}°\n", angle.degrees())),
            None => out.push_str("servo angle: --\n"),
        }
        for (label, value) in &self.values {
            out.push_str(&format!("{}: {}\n", label, value));
        }
        out
    }
}

impl Default for TelemetryPanel {
    fn default() -> Self {
        TelemetryPanel::new()
    }
}

fn format_value(value: &RcValue) -> String {
    match value {
        RcValue::Axis(v) => v.to_string(),
        RcValue::Button(true) => "pressed".to_string(),
        RcValue::Button(false) => "released".to_string(),
        RcValue::FiveWay(status) => status.to_string(),
        RcValue::Mode(position) => position.to_string(),
        RcValue::Connected(true) => "connected".to_string(),
        RcValue::Connected(false) => "disconnected".to_string(),
    }
}
