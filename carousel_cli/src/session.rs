//! Session assembly: device wiring, home monitor, stdin loop, report printing.

use std::io::BufRead;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use carousel_config::Config;
use carousel_core::build_indexer;
use carousel_core::homing::{EdgeDetector, HomeMonitor};
use carousel_core::position::PositionCell;
use carousel_core::runner::{self, Mode, Report, RunParams};
use carousel_traits::{LimitSwitch, Motor, OpticalSensor};
use crossbeam_channel::unbounded;
use eyre::WrapErr;

use crate::cli::ModeArg;
use crate::commands::{LineAction, help_text, parse_line};

type BoxedMotor = Box<dyn Motor>;
type BoxedSensor = Box<dyn OpticalSensor>;
type BoxedSwitch = Box<dyn LimitSwitch + Send>;

#[cfg(all(feature = "hardware", target_os = "linux"))]
fn build_devices(cfg: &Config) -> eyre::Result<(BoxedMotor, BoxedSensor, BoxedSwitch)> {
    use carousel_hardware::gpio::{GpioLimitSwitch, GpioMotor, Mcp3008Sensor};
    let motor = GpioMotor::new(cfg.pins.motor_en, cfg.pins.motor_in1, cfg.pins.motor_in2)
        .wrap_err("open motor pins")?;
    let switch = GpioLimitSwitch::new(cfg.pins.limit_switch).wrap_err("open limit switch pin")?;
    let sensor = Mcp3008Sensor::new(cfg.pins.sensor_adc_channel).wrap_err("open adc")?;
    Ok((Box::new(motor), Box::new(sensor), Box::new(switch)))
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
fn build_devices(cfg: &Config) -> eyre::Result<(BoxedMotor, BoxedSensor, BoxedSwitch)> {
    let rotation = Duration::from_millis(cfg.motion.full_rotation_ms);
    // Start the simulated tab a quarter turn short of the switch.
    let rig = carousel_hardware::SimRig::new(rotation, rotation / 4);
    tracing::info!("using simulated rig");
    Ok((
        Box::new(rig.motor()),
        Box::new(carousel_hardware::SimSensor::default()),
        Box::new(rig.limit_switch()),
    ))
}

pub fn run_session(cfg: &Config, mode_override: Option<ModeArg>, json: bool) -> eyre::Result<()> {
    let (motor, sensor, switch) = build_devices(cfg)?;

    let position = Arc::new(PositionCell::new());
    let indexer = build_indexer(motor, (&cfg.motion).into(), position.clone(), None)?;

    let detector = EdgeDetector::new(
        position,
        indexer.clock(),
        Duration::from_millis(cfg.homing.debounce_ms),
    );
    let monitor = HomeMonitor::spawn(
        switch,
        detector,
        Duration::from_millis(cfg.homing.switch_poll_ms),
    );

    let shutdown = Arc::new(AtomicBool::new(false));
    let ctrlc_flag = shutdown.clone();
    ctrlc::set_handler(move || {
        ctrlc_flag.store(true, Ordering::Relaxed);
    })
    .wrap_err("install ctrl-c handler")?;

    let (cmd_tx, cmd_rx) = unbounded();
    let (rep_tx, rep_rx) = unbounded();

    // Stdin reader: tokenize lines, forward typed commands. `quit` and EOF
    // drop the sender; the runner drains queued commands and winds down on
    // its own. Ctrl-c stays the hard stop.
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            match parse_line(&line) {
                LineAction::Forward(cmd) => {
                    if cmd_tx.send(cmd).is_err() {
                        break;
                    }
                }
                LineAction::Help => println!("{}", help_text()),
                LineAction::Quit => break,
                LineAction::Ignore => {}
            }
        }
    });

    // Report printer: the reporting channel ends when the runner returns.
    let printer = std::thread::spawn(move || {
        for report in rep_rx.iter() {
            print_report(&report, json);
        }
    });

    let initial_mode = match mode_override {
        Some(ModeArg::Manual) => Mode::Manual,
        Some(ModeArg::Automatic) => Mode::Automatic,
        None => cfg.runner.initial_mode.into(),
    };
    let params = RunParams {
        initial_mode,
        opacity: (&cfg.sensor).into(),
        sensor_timeout: Duration::from_millis(cfg.sensor.read_timeout_ms),
        auto_tick: Duration::from_millis(cfg.runner.auto_tick_ms),
    };

    let result = runner::run(indexer, sensor, params, cmd_rx, rep_tx, shutdown.clone());

    shutdown.store(true, Ordering::Relaxed);
    drop(monitor);
    let _ = printer.join();
    result
}

pub fn self_check(cfg: &Config, json: bool) -> eyre::Result<()> {
    let (mut motor, mut sensor, _switch) = build_devices(cfg)?;

    motor
        .set_speed(cfg.motion.motor_speed)
        .and_then(|()| motor.forward())
        .and_then(|()| motor.release())
        .map_err(|e| eyre::eyre!("motor check failed: {e}"))?;
    let raw = sensor
        .read_raw(Duration::from_millis(cfg.sensor.read_timeout_ms))
        .map_err(|e| eyre::eyre!("sensor check failed: {e}"))?;

    tracing::info!(raw, "self-check sample");
    if json {
        println!("{}", serde_json::json!({ "self_check": "ok", "raw": raw }));
    } else {
        println!("self-check: ok (raw {raw})");
    }
    Ok(())
}

fn print_report(report: &Report, json: bool) {
    if json {
        let obj = match report {
            Report::Calibrated => serde_json::json!({ "event": "calibrated", "slot": 1 }),
            Report::ModeChanged(mode) => serde_json::json!({
                "event": "mode",
                "mode": match mode { Mode::Manual => "manual", Mode::Automatic => "automatic" },
            }),
            Report::Measurement { index, opacity } => serde_json::json!({
                "event": "measurement", "slot": index, "opacity": opacity,
            }),
            Report::AlignmentFault => serde_json::json!({ "event": "alignment_fault", "slot": 1 }),
            Report::Rejected(msg) => serde_json::json!({ "event": "rejected", "reason": msg }),
        };
        println!("{obj}");
        return;
    }
    match report {
        Report::Calibrated => println!("calibrated: turntable at slot 1"),
        Report::ModeChanged(Mode::Manual) => println!("mode: manual"),
        Report::ModeChanged(Mode::Automatic) => println!("mode: automatic"),
        Report::Measurement { index, opacity } => println!("slot {index} opacity {opacity:.3}"),
        Report::AlignmentFault => println!("alignment fault: recalibrated to slot 1"),
        Report::Rejected(msg) => println!("rejected: {msg}"),
    }
}
