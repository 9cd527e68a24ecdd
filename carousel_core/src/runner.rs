//! Mode multiplexer: drives the indexing primitive either from a
//! free-running automatic loop or from operator commands.
//!
//! The text front-end lives in the CLI; this module only sees typed
//! `Command`s on a channel and emits typed `Report`s on another. Reports
//! are the line-oriented status/measurement feed; formatting is the
//! consumer's business.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use eyre::WrapErr;

use crate::error::Result;
use crate::position::{FIRST_SLOT, LAST_SLOT};
use crate::{Advance, Indexer, OpacityCal, map_hw_error_dyn};

/// Which driver owns the indexing primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Manual,
    Automatic,
}

/// Typed events from the command front-end.
#[derive(Debug, Clone)]
pub enum Command {
    SetMode(Mode),
    MeasureSlot(u8),
    /// Anything the front-end could not recognize; carries the raw text so
    /// the rejection names it.
    Invalid(String),
}

/// Typed events for the reporting channel.
#[derive(Debug, Clone)]
pub enum Report {
    Calibrated,
    ModeChanged(Mode),
    Measurement { index: u8, opacity: f32 },
    AlignmentFault,
    Rejected(String),
}

#[derive(Debug, Clone)]
pub struct RunParams {
    pub initial_mode: Mode,
    pub opacity: OpacityCal,
    /// Max wait per sensor read.
    pub sensor_timeout: Duration,
    /// Pause between automatic rounds (zero = back-to-back).
    pub auto_tick: Duration,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            initial_mode: Mode::Manual,
            opacity: OpacityCal::default(),
            sensor_timeout: Duration::from_millis(150),
            auto_tick: Duration::ZERO,
        }
    }
}

/// How long the manual loop blocks per command wait, so the shutdown flag
/// is honored promptly.
const COMMAND_POLL: Duration = Duration::from_millis(100);

/// Calibrate once, then multiplex between automatic sweeps and manual slot
/// targeting until the command channel disconnects or `shutdown` is set.
pub fn run<M, S>(
    mut indexer: Indexer<M>,
    mut sensor: S,
    params: RunParams,
    commands: Receiver<Command>,
    reports: Sender<Report>,
    shutdown: Arc<AtomicBool>,
) -> Result<()>
where
    M: carousel_traits::Motor,
    S: carousel_traits::OpticalSensor,
{
    indexer.calibrate()?;
    let _ = reports.send(Report::Calibrated);

    let mut mode = params.initial_mode;
    tracing::info!(?mode, "carousel run start");

    loop {
        if shutdown.load(Ordering::Relaxed) {
            tracing::info!("shutdown requested");
            return Ok(());
        }

        match mode {
            Mode::Automatic => match commands.try_recv() {
                Ok(cmd) => {
                    handle_command(cmd, &mut mode, &mut indexer, &mut sensor, &params, &reports)?;
                }
                Err(TryRecvError::Empty) => {
                    if let Advance::Recalibrated = indexer.advance_one()? {
                        let _ = reports.send(Report::AlignmentFault);
                    }
                    measure(&mut indexer, &mut sensor, &params, &reports)?;
                    if !params.auto_tick.is_zero() {
                        std::thread::sleep(params.auto_tick);
                    }
                }
                Err(TryRecvError::Disconnected) => return Ok(()),
            },
            Mode::Manual => match commands.recv_timeout(COMMAND_POLL) {
                Ok(cmd) => {
                    handle_command(cmd, &mut mode, &mut indexer, &mut sensor, &params, &reports)?;
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return Ok(()),
            },
        }
    }
}

fn handle_command<M, S>(
    cmd: Command,
    mode: &mut Mode,
    indexer: &mut Indexer<M>,
    sensor: &mut S,
    params: &RunParams,
    reports: &Sender<Report>,
) -> Result<()>
where
    M: carousel_traits::Motor,
    S: carousel_traits::OpticalSensor,
{
    match cmd {
        Command::SetMode(m) => {
            // A switch never triggers a measurement by itself.
            *mode = m;
            tracing::info!(?m, "mode set");
            let _ = reports.send(Report::ModeChanged(m));
        }
        Command::MeasureSlot(n) => {
            if *mode != Mode::Manual {
                let _ = reports.send(Report::Rejected(format!(
                    "slot targeting requires manual mode (got slot {n})"
                )));
                return Ok(());
            }
            if !(FIRST_SLOT..=LAST_SLOT).contains(&n) {
                let _ = reports.send(Report::Rejected(format!(
                    "slot {n} is outside the valid range 1..=4"
                )));
                return Ok(());
            }
            while indexer.index() != n {
                if let Advance::Recalibrated = indexer.advance_one()? {
                    let _ = reports.send(Report::AlignmentFault);
                }
            }
            measure(indexer, sensor, params, reports)?;
        }
        Command::Invalid(text) => {
            tracing::debug!(text, "invalid command rejected");
            let _ = reports.send(Report::Rejected(format!("unrecognized command: {text}")));
        }
    }
    Ok(())
}

fn measure<M, S>(
    indexer: &mut Indexer<M>,
    sensor: &mut S,
    params: &RunParams,
    reports: &Sender<Report>,
) -> Result<()>
where
    M: carousel_traits::Motor,
    S: carousel_traits::OpticalSensor,
{
    let raw = sensor
        .read_raw(params.sensor_timeout)
        .map_err(|e| eyre::Report::new(map_hw_error_dyn(&*e)))
        .wrap_err("reading sensor")?;
    let index = indexer.index();
    let opacity = params.opacity.opacity(raw);
    tracing::info!(index, raw, opacity, "measurement");
    let _ = reports.send(Report::Measurement { index, opacity });
    Ok(())
}
