//! Operator console: displays live remote-controller telemetry and
//! forwards the left-stick horizontal axis to an external servo
//! controller over TCP.

use std::sync::{mpsc, Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::Context;
use bridge::{
    KeyHub, LinkEvent, LinkState, RcKey, RcValue, ServoForwarder, ServoLink, SERVO_PORT,
};
use log::{info, warn};

use crate::display::TelemetryPanel;
use crate::source::{wait_ready, RcSource, SweepSource, READY_CHECK_INTERVAL};

mod display;
mod source;

const DEFAULT_HOST: &str = "192.168.1.100";
const SAMPLE_PACING: Duration = Duration::from_millis(10);
const RENDER_INTERVAL: Duration = Duration::from_millis(500);

const DISPLAY_KEYS: [RcKey; 18] = [
    RcKey::StickLeftHorizontal,
    RcKey::StickLeftVertical,
    RcKey::StickRightHorizontal,
    RcKey::StickRightVertical,
    RcKey::ShutterButton,
    RcKey::RecordButton,
    RcKey::GoHomeButton,
    RcKey::PauseButton,
    RcKey::CustomButton1,
    RcKey::CustomButton2,
    RcKey::CustomButton3,
    RcKey::AuthLedButton,
    RcKey::FlightModeSwitch,
    RcKey::LeftDial,
    RcKey::RightDial,
    RcKey::ScrollWheel,
    RcKey::FiveWayPad,
    RcKey::Connection,
];

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let host = args.next().unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = match args.next() {
        Some(raw) => raw
            .parse::<u16>()
            .with_context(|| format!("invalid port '{}'", raw))?,
        None => SERVO_PORT,
    };

    let mut source = SweepSource::new();
    if !wait_ready(&source, READY_CHECK_INTERVAL) {
        anyhow::bail!("telemetry source did not become ready");
    }

    let (events_tx, events_rx) = mpsc::channel();
    let link = ServoLink::spawn(events_tx);
    let mut forwarder = ServoForwarder::new(link);

    let panel = Arc::new(Mutex::new(TelemetryPanel::new()));
    let mut hub = KeyHub::new();
    for key in DISPLAY_KEYS {
        let panel = Arc::clone(&panel);
        hub.listen(key, move |value| {
            panel.lock().unwrap().update(key, value);
        });
    }

    info!("connecting to servo controller at {}:{}", host, port);
    forwarder
        .sink()
        .connect(&host, port)
        .with_context(|| format!("connect to {}:{}", host, port))?;

    let mut last_render: Option<Instant> = None;
    while let Some((key, value)) = source.poll() {
        while let Ok(event) = events_rx.try_recv() {
            apply_link_event(&event, &mut forwarder, &panel);
        }

        if key == RcKey::StickLeftHorizontal {
            if let RcValue::Axis(raw) = &value {
                if forwarder.sink().state().is_connected() {
                    if let Some(angle) = forwarder.on_sample(*raw) {
                        panel.lock().unwrap().set_servo_angle(angle);
                    }
                }
            }
        }

        hub.publish(key, value);

        if last_render.map_or(true, |t| t.elapsed() >= RENDER_INTERVAL) {
            print!("----\n{}", panel.lock().unwrap().render());
            last_render = Some(Instant::now());
        }
        std::thread::sleep(SAMPLE_PACING);
    }

    // give a trailing transition a moment to arrive before the last frame
    std::thread::sleep(Duration::from_millis(100));
    while let Ok(event) = events_rx.try_recv() {
        apply_link_event(&event, &mut forwarder, &panel);
    }
    print!("----\n{}", panel.lock().unwrap().render());

    hub.clear();
    forwarder.sink().disconnect();
    Ok(())
}

fn apply_link_event(
    event: &LinkEvent,
    forwarder: &mut ServoForwarder<ServoLink>,
    panel: &Arc<Mutex<TelemetryPanel>>,
) {
    match event {
        LinkEvent::State(state) => {
            info!("servo link is now {}", state);
            panel.lock().unwrap().set_link_status(state);
            if matches!(state, LinkState::Connected) {
                // a fresh session must always receive the current angle
                forwarder.reset();
            }
        }
        LinkEvent::SendFailed(reason) => warn!("servo send failed: {}", reason),
    }
}
