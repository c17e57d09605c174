mod gate;
mod mapper;

pub use gate::{GateError, SendGate, SEND_THRESHOLD};
pub use mapper::{stick_to_angle, ServoAngle, ANGLE_MAX, STICK_MAX, STICK_MIN};
