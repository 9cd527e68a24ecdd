//! Operator line tokenizer.
//!
//! Turns raw stdin lines into typed `Command`s for the multiplexer. Only
//! `help` and `quit` are handled locally; everything else, including text
//! the tokenizer cannot make sense of, is forwarded so the core produces
//! the rejection on the reporting channel.

use carousel_core::runner::{Command, Mode};

#[derive(Debug, Clone)]
pub enum LineAction {
    Forward(Command),
    Help,
    Quit,
    Ignore,
}

pub fn parse_line(line: &str) -> LineAction {
    let text = line.trim();
    if text.is_empty() {
        return LineAction::Ignore;
    }
    match text.to_ascii_lowercase().as_str() {
        "auto" | "automatic" | "a" => LineAction::Forward(Command::SetMode(Mode::Automatic)),
        "manual" | "man" | "m" => LineAction::Forward(Command::SetMode(Mode::Manual)),
        "help" | "h" | "?" => LineAction::Help,
        "quit" | "exit" | "q" => LineAction::Quit,
        other => match other.parse::<u8>() {
            Ok(slot) => LineAction::Forward(Command::MeasureSlot(slot)),
            Err(_) => LineAction::Forward(Command::Invalid(text.to_string())),
        },
    }
}

pub fn help_text() -> &'static str {
    "commands:\n  \
     manual | m      switch to manual mode\n  \
     auto | a        switch to automatic mode (sweep all slots)\n  \
     1..4            measure that slot (manual mode)\n  \
     help | ?        show this help\n  \
     quit | q        stop the carousel and exit"
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("auto", Mode::Automatic)]
    #[case("  AUTO  ", Mode::Automatic)]
    #[case("a", Mode::Automatic)]
    #[case("manual", Mode::Manual)]
    #[case("M", Mode::Manual)]
    fn mode_keywords(#[case] line: &str, #[case] mode: Mode) {
        match parse_line(line) {
            LineAction::Forward(Command::SetMode(m)) => assert_eq!(m, mode),
            other => panic!("expected SetMode, got {other:?}"),
        }
    }

    #[rstest]
    #[case("1", 1)]
    #[case("4", 4)]
    #[case(" 3 ", 3)]
    #[case("9", 9)] // in-range checking is the core's business
    fn slot_numbers(#[case] line: &str, #[case] slot: u8) {
        match parse_line(line) {
            LineAction::Forward(Command::MeasureSlot(n)) => assert_eq!(n, slot),
            other => panic!("expected MeasureSlot, got {other:?}"),
        }
    }

    #[rstest]
    #[case("bogus")]
    #[case("-2")]
    #[case("1.5")]
    #[case("measure everything")]
    fn unrecognized_text_is_forwarded_as_invalid(#[case] line: &str) {
        match parse_line(line) {
            LineAction::Forward(Command::Invalid(text)) => assert_eq!(text, line.trim()),
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[test]
    fn local_actions() {
        assert!(matches!(parse_line("help"), LineAction::Help));
        assert!(matches!(parse_line("?"), LineAction::Help));
        assert!(matches!(parse_line("quit"), LineAction::Quit));
        assert!(matches!(parse_line(""), LineAction::Ignore));
        assert!(matches!(parse_line("   "), LineAction::Ignore));
    }
}
