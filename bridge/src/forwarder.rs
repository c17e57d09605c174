//! Maps stick samples to servo angles and forwards qualifying changes.

use log::debug;
use servo::{stick_to_angle, SendGate, ServoAngle};

use crate::error::LinkError;
use crate::link::ServoLink;

/// Downstream consumer of servo angles. Seam between the forwarding
/// decision and the socket so the decision logic is testable without
/// a peer.
pub trait AngleSink {
    fn send_angle(&mut self, angle: ServoAngle) -> Result<(), LinkError>;
}

impl AngleSink for ServoLink {
    fn send_angle(&mut self, angle: ServoAngle) -> Result<(), LinkError> {
        self.send(angle)
    }
}

/// Rate-limited forwarder from stick samples to a sink.
///
/// Each sample is mapped to an angle; the angle goes downstream only when
/// it differs from the last sent one by at least the gate threshold. The
/// first sample after construction or [`reset`](Self::reset) always
/// qualifies. A failed send does not roll the gate back; the failure is
/// logged and surfaced to the link observer separately.
pub struct ServoForwarder<S: AngleSink> {
    gate: SendGate,
    sink: S,
}

impl<S: AngleSink> ServoForwarder<S> {
    pub fn new(sink: S) -> Self {
        ServoForwarder {
            gate: SendGate::new(),
            sink,
        }
    }

    pub fn with_gate(sink: S, gate: SendGate) -> Self {
        ServoForwarder { gate, sink }
    }

    /// Handle one stick sample. Returns the angle that was forwarded,
    /// or `None` when the gate suppressed it.
    pub fn on_sample(&mut self, value: i16) -> Option<ServoAngle> {
        let angle = stick_to_angle(value);
        if !self.gate.offer(angle) {
            return None;
        }
        if let Err(e) = self.sink.send_angle(angle) {
            debug!("forwarding {} failed: {}", angle, e);
        }
        Some(angle)
    }

    /// Clear the gate so the next sample is always forwarded. Called
    /// when a fresh connection comes up.
    pub fn reset(&mut self) {
        self.gate.reset();
    }

    pub fn last_sent(&self) -> Option<ServoAngle> {
        self.gate.last_sent()
    }

    /// Access the sink, e.g. to drive the link's connect/disconnect
    /// operations while the forwarder owns it.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}
