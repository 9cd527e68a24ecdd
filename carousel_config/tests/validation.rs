use carousel_config::{StartMode, load_toml};
use rstest::rstest;

#[test]
fn defaults_parse_and_validate() {
    let cfg = load_toml("").expect("empty config should parse via defaults");
    cfg.validate().expect("defaults must be valid");
    assert_eq!(cfg.motion.full_rotation_ms, 19_000);
    assert_eq!(cfg.motion.settle_ms, 1_000);
    assert_eq!(cfg.homing.debounce_ms, 1_000);
    assert_eq!(cfg.runner.initial_mode, StartMode::Manual);
    assert!((cfg.sensor.offset_v - 0.33).abs() < 1e-6);
    assert!((cfg.sensor.scale_v - 1.65).abs() < 1e-6);
}

#[test]
fn full_document_round_trips() {
    let text = r#"
[pins]
motor_en = 12
motor_in1 = 5
motor_in2 = 6
limit_switch = 22
sensor_adc_channel = 1

[motion]
full_rotation_ms = 20000
settle_ms = 800
motor_speed = 180
poll_ms = 2

[homing]
debounce_ms = 500
switch_poll_ms = 25

[sensor]
offset_v = 0.3
scale_v = 1.7
full_scale_v = 3.3
adc_max = 4095
read_timeout_ms = 100

[runner]
initial_mode = "automatic"
auto_tick_ms = 250

[logging]
level = "debug"
"#;
    let cfg = load_toml(text).expect("parse");
    cfg.validate().expect("valid");
    assert_eq!(cfg.pins.limit_switch, 22);
    assert_eq!(cfg.motion.full_rotation_ms, 20_000);
    assert_eq!(cfg.runner.initial_mode, StartMode::Automatic);
    assert_eq!(cfg.runner.auto_tick_ms, 250);
    assert_eq!(cfg.sensor.adc_max, 4095);
    assert_eq!(cfg.logging.level.as_deref(), Some("debug"));
}

#[rstest]
#[case("[motion]\nsettle_ms = 5000", "settle_ms")]
#[case("[motion]\nfull_rotation_ms = 2", "full_rotation_ms")]
#[case("[motion]\nmotor_speed = 0", "motor_speed")]
#[case("[motion]\npoll_ms = 0", "poll_ms")]
#[case("[homing]\ndebounce_ms = 0", "debounce_ms")]
#[case("[homing]\nswitch_poll_ms = 0", "switch_poll_ms")]
#[case("[sensor]\nadc_max = 0", "adc_max")]
#[case("[sensor]\nscale_v = 0.0", "scale_v")]
#[case("[sensor]\nread_timeout_ms = 0", "read_timeout_ms")]
fn rejects_out_of_range_fields(#[case] text: &str, #[case] needle: &str) {
    let cfg = load_toml(text).expect("parse");
    let err = cfg.validate().expect_err("must be rejected");
    let msg = format!("{err}");
    assert!(msg.contains(needle), "error `{msg}` should mention {needle}");
}

#[test]
fn settle_equal_to_quarter_is_rejected() {
    // quarter = 4750; settle may not consume the whole quarter budget
    let cfg = load_toml("[motion]\nsettle_ms = 4750").expect("parse");
    assert!(cfg.validate().is_err());
}

#[test]
fn unknown_mode_string_fails_to_parse() {
    let err = load_toml("[runner]\ninitial_mode = \"turbo\"").expect_err("parse must fail");
    let msg = format!("{err}");
    assert!(msg.contains("initial_mode") || msg.to_lowercase().contains("unknown variant"));
}

#[test]
fn config_loads_from_disk() {
    use std::io::Write;
    let mut f = tempfile::NamedTempFile::new().expect("tempfile");
    writeln!(f, "[motion]\nfull_rotation_ms = 16000").expect("write");
    let text = std::fs::read_to_string(f.path()).expect("read back");
    let cfg = load_toml(&text).expect("parse");
    cfg.validate().expect("valid");
    assert_eq!(cfg.motion.full_rotation_ms, 16_000);
}
