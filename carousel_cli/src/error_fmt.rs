//! Human-readable error descriptions and structured JSON error formatting.

use std::error::Error as _;

use carousel_core::error::{BuildError, IndexerError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingMotor => {
                "What happened: No motor was provided to the indexer.\nLikely causes: The motor driver failed to initialize or was not wired into the builder.\nHow to fix: Ensure the motor is created successfully and passed via with_motor(...).".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See README for a sample."
            ),
        };
    }

    if let Some(ie) = err.downcast_ref::<IndexerError>() {
        return match ie {
            IndexerError::Timeout => {
                "What happened: Sensor read timed out.\nLikely causes: ADC not wired correctly, no power/ground, or timeout too low.\nHow to fix: Verify the sensor wiring and consider raising sensor.read_timeout_ms in the config.".to_string()
            }
            IndexerError::BadSlot(n) => format!(
                "What happened: Slot {n} was requested but the turntable has slots 1..=4.\nHow to fix: Pass a slot number between 1 and 4."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("open motor pins") || lower.contains("open limit switch") || lower.contains("open adc") {
        return "What happened: Failed to initialize hardware pins.\nLikely causes: Incorrect pin numbers or insufficient GPIO permissions.\nHow to fix: Fix the [pins] values in the config; ensure the process has permission to access GPIO.".to_string();
    }

    if lower.contains("parse config") || lower.contains("invalid configuration") {
        return "What happened: Configuration is invalid or incomplete.\nLikely causes: Malformed TOML or out-of-range values.\nHow to fix: Edit the config file and try again.".to_string();
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Map typed errors (if present) to stable exit codes; other errors return 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if let Some(ie) = err.downcast_ref::<IndexerError>() {
        return match ie {
            IndexerError::BadSlot(_) => 2,
            IndexerError::Timeout => 3,
            IndexerError::Hardware(_) | IndexerError::HardwareFault(_) => 4,
            _ => 1,
        };
    }
    1
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let reason = if let Some(ie) = err.downcast_ref::<IndexerError>() {
        match ie {
            IndexerError::BadSlot(_) => "BadSlot",
            IndexerError::Timeout => "Timeout",
            IndexerError::Hardware(_) => "Hardware",
            IndexerError::HardwareFault(_) => "HardwareFault",
            IndexerError::Config(_) => "Config",
        }
    } else if err.downcast_ref::<BuildError>().is_some() {
        "Build"
    } else {
        "Error"
    };

    json!({ "reason": reason, "message": humanize(err) }).to_string()
}
