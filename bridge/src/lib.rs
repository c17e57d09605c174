mod error;
mod forwarder;
mod link;
mod telemetry;

pub use error::LinkError;
pub use forwarder::{AngleSink, ServoForwarder};
pub use link::{LinkEvent, LinkState, ServoLink, SERVO_PORT};
pub use telemetry::{
    physical_button_name, FiveWayStatus, KeyHub, ModeSwitchPosition, RcKey, RcValue,
};
