// Threshold gate that suppresses redundant servo angle sends
use thiserror::Error;

use crate::mapper::ServoAngle;

/// Default minimum change, in degrees, before an angle is forwarded again.
pub const SEND_THRESHOLD: u8 = 2;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum GateError {
    #[error("invalid send threshold {0}: must be at least 1 degree")]
    InvalidThreshold(u8),
}

/// Rate-limit gate over a stream of servo angles.
///
/// Holds the last angle that was handed downstream and admits a new one
/// only when it differs by at least the threshold. The cache starts empty
/// so the first offered angle is always admitted.
#[derive(Debug)]
pub struct SendGate {
    threshold: u8,
    last_sent: Option<ServoAngle>,
}

impl SendGate {
    pub fn new() -> Self {
        SendGate {
            threshold: SEND_THRESHOLD,
            last_sent: None,
        }
    }

    /// Create a gate with a custom threshold.
    ///
    /// A threshold of zero would admit every sample and defeat the gate,
    /// so it is rejected.
    pub fn with_threshold(threshold: u8) -> Result<Self, GateError> {
        if threshold == 0 {
            return Err(GateError::InvalidThreshold(threshold));
        }
        Ok(SendGate {
            threshold,
            last_sent: None,
        })
    }

    /// Decide whether `angle` should be forwarded.
    ///
    /// Returns true and records `angle` as last-sent when the cache is
    /// empty or the change meets the threshold. The cache is committed at
    /// decision time: a failed downstream send is not rolled back.
    pub fn offer(&mut self, angle: ServoAngle) -> bool {
        match self.last_sent {
            Some(last) if angle.distance(last) < self.threshold => false,
            _ => {
                self.last_sent = Some(angle);
                true
            }
        }
    }

    /// Clear the cache so the next offered angle is always admitted.
    /// Called when a fresh connection is established.
    pub fn reset(&mut self) {
        self.last_sent = None;
    }

    pub fn last_sent(&self) -> Option<ServoAngle> {
        self.last_sent
    }
}

impl Default for SendGate {
    fn default() -> Self {
        SendGate::new()
    }
}
