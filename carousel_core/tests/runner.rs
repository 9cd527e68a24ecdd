use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use carousel_core::mocks::NoopSensor;
use carousel_core::position::{FAULT_INDEX, PositionCell};
use carousel_core::runner::{Command, Mode, Report, RunParams, run};
use carousel_core::{MotionCfg, OpacityCal, build_indexer};
use carousel_traits::{Motor, OpticalSensor};
use carousel_traits::clock::TestClock;
use crossbeam_channel::unbounded;

/// Motor that emulates the physical rig: the switch tab sits at the 4 → 1
/// boundary, so spinning up from a fresh start (index 0) or from slot 4
/// trips the home switch.
#[derive(Clone)]
struct RigMotor {
    position: Arc<PositionCell>,
    forwards: Arc<AtomicUsize>,
}

impl RigMotor {
    fn new(position: Arc<PositionCell>) -> Self {
        Self {
            position,
            forwards: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl Motor for RigMotor {
    fn set_speed(&mut self, _speed: u32) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
    fn forward(&mut self) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.forwards.fetch_add(1, Ordering::Relaxed);
        let idx = self.position.index();
        if idx == 0 || idx == 4 || idx >= FAULT_INDEX {
            self.position.accept_home();
        }
        Ok(())
    }
    fn release(&mut self) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}

/// Sensor returning a fixed raw count.
struct ConstSensor(i32);

impl OpticalSensor for ConstSensor {
    fn read_raw(&mut self, _timeout: Duration) -> Result<i32, Box<dyn Error + Send + Sync>> {
        Ok(self.0)
    }
}

fn rig(
    position: Arc<PositionCell>,
) -> (carousel_core::Indexer<RigMotor>, RigMotor) {
    let motor = RigMotor::new(position.clone());
    let clock = TestClock::new();
    let indexer = build_indexer(
        motor.clone(),
        MotionCfg::default(),
        position,
        Some(Box::new(clock.clone())),
    )
    .expect("build indexer");
    (indexer, motor)
}

fn params(initial_mode: Mode) -> RunParams {
    RunParams {
        initial_mode,
        opacity: OpacityCal::default(),
        sensor_timeout: Duration::from_millis(10),
        auto_tick: Duration::ZERO,
    }
}

#[test]
fn manual_slot_three_advances_twice_and_measures_once() {
    let position = Arc::new(PositionCell::new());
    let (indexer, motor) = rig(position.clone());

    let (cmd_tx, cmd_rx) = unbounded();
    let (rep_tx, rep_rx) = unbounded();
    cmd_tx.send(Command::MeasureSlot(3)).expect("send");
    drop(cmd_tx);

    run(
        indexer,
        ConstSensor(0),
        params(Mode::Manual),
        cmd_rx,
        rep_tx,
        Arc::new(AtomicBool::new(false)),
    )
    .expect("run");

    let reports: Vec<Report> = rep_rx.try_iter().collect();
    assert!(matches!(reports[0], Report::Calibrated));
    match &reports[1] {
        Report::Measurement { index, opacity } => {
            assert_eq!(*index, 3);
            assert!((opacity - (-0.2)).abs() < 1e-3, "opacity {opacity}");
        }
        other => panic!("expected Measurement, got {other:?}"),
    }
    assert_eq!(reports.len(), 2, "one measurement only: {reports:?}");

    // One calibration spin plus exactly two quarter advances (1→2→3).
    assert_eq!(motor.forwards.load(Ordering::Relaxed), 3);
}

#[test]
fn malformed_and_wrong_mode_commands_are_rejected_without_motion() {
    let position = Arc::new(PositionCell::new());
    let (indexer, motor) = rig(position.clone());

    let (cmd_tx, cmd_rx) = unbounded();
    let (rep_tx, rep_rx) = unbounded();
    cmd_tx.send(Command::MeasureSlot(9)).expect("send");
    cmd_tx
        .send(Command::Invalid("bogus".to_string()))
        .expect("send");
    cmd_tx
        .send(Command::SetMode(Mode::Automatic))
        .expect("send");
    cmd_tx.send(Command::MeasureSlot(2)).expect("send");
    drop(cmd_tx);

    // NoopSensor errors on read: proof that no rejection path measures.
    run(
        indexer,
        NoopSensor,
        params(Mode::Manual),
        cmd_rx,
        rep_tx,
        Arc::new(AtomicBool::new(false)),
    )
    .expect("run");

    let reports: Vec<Report> = rep_rx.try_iter().collect();
    assert!(matches!(reports[0], Report::Calibrated));
    assert!(
        matches!(&reports[1], Report::Rejected(msg) if msg.contains("1..=4")),
        "{reports:?}"
    );
    assert!(
        matches!(&reports[2], Report::Rejected(msg) if msg.contains("bogus")),
        "{reports:?}"
    );
    assert!(matches!(reports[3], Report::ModeChanged(Mode::Automatic)));
    assert!(
        matches!(&reports[4], Report::Rejected(msg) if msg.contains("manual mode")),
        "slot targeting outside manual must be rejected: {reports:?}"
    );
    assert_eq!(reports.len(), 5);

    // Calibration only; every rejected command left the table alone.
    assert_eq!(motor.forwards.load(Ordering::Relaxed), 1);
    assert_eq!(position.index(), 1);
}

#[test]
fn automatic_mode_sweeps_slots_in_order() {
    let position = Arc::new(PositionCell::new());
    let (indexer, _motor) = rig(position);

    let (cmd_tx, cmd_rx) = unbounded();
    let (rep_tx, rep_rx) = unbounded();
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_runner = shutdown.clone();

    let handle = std::thread::spawn(move || {
        run(
            indexer,
            ConstSensor(1023),
            params(Mode::Automatic),
            cmd_rx,
            rep_tx,
            shutdown_runner,
        )
    });

    let first = rep_rx
        .recv_timeout(Duration::from_secs(10))
        .expect("calibrated");
    assert!(matches!(first, Report::Calibrated));

    // The free-running sweep wraps 2, 3, 4, then home resets to 1.
    let mut indices = Vec::new();
    while indices.len() < 5 {
        match rep_rx.recv_timeout(Duration::from_secs(10)).expect("report") {
            Report::Measurement { index, opacity } => {
                assert!((opacity - 2.8303).abs() < 1e-3, "opacity {opacity}");
                indices.push(index);
            }
            other => panic!("unexpected report in automatic sweep: {other:?}"),
        }
    }
    assert_eq!(indices, vec![2, 3, 4, 1, 2]);

    shutdown.store(true, Ordering::Relaxed);
    drop(cmd_tx);
    handle.join().expect("join").expect("run ok");
}

#[test]
fn mode_switch_alone_never_measures() {
    let position = Arc::new(PositionCell::new());
    let (indexer, motor) = rig(position);

    let (cmd_tx, cmd_rx) = unbounded();
    let (rep_tx, rep_rx) = unbounded();
    cmd_tx.send(Command::SetMode(Mode::Manual)).expect("send");
    cmd_tx.send(Command::SetMode(Mode::Manual)).expect("send");
    drop(cmd_tx);

    run(
        indexer,
        NoopSensor,
        params(Mode::Manual),
        cmd_rx,
        rep_tx,
        Arc::new(AtomicBool::new(false)),
    )
    .expect("run");

    let reports: Vec<Report> = rep_rx.try_iter().collect();
    assert!(matches!(reports[0], Report::Calibrated));
    assert!(matches!(reports[1], Report::ModeChanged(Mode::Manual)));
    assert!(matches!(reports[2], Report::ModeChanged(Mode::Manual)));
    assert_eq!(reports.len(), 3);
    assert_eq!(motor.forwards.load(Ordering::Relaxed), 1, "calibration only");
}
