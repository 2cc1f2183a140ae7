//! The `vtuber` chat command: `-u/--up [HISTORY_UID]` or `-d/--down`.

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "vtuber")]
#[command(about = "Connect this channel to the VTuber backend")]
struct VtuberArgs {
    /// Connect, optionally resuming a backend history
    #[arg(
        short,
        long,
        value_name = "HISTORY_UID",
        num_args = 0..=1,
        default_missing_value = "",
        conflicts_with = "down"
    )]
    up: Option<String>,

    /// Disconnect
    #[arg(short, long)]
    down: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlAction {
    Up { history_uid: Option<String> },
    Down,
    /// No option given: report the channel's connection state.
    Status,
}

/// Parse a chat line as a `vtuber` command.
///
/// Returns `None` if the line is not a `vtuber` command at all, and
/// `Some(Err(text))` with clap's usage or help text if it is but does not parse.
pub fn parse_command(line: &str) -> Option<Result<ControlAction, String>> {
    let mut words = line.split_whitespace();
    let first = words.next()?;
    if first.trim_start_matches('/') != "vtuber" {
        return None;
    }

    let args = std::iter::once("vtuber").chain(words);
    let parsed = match VtuberArgs::try_parse_from(args) {
        Ok(parsed) => parsed,
        Err(e) => return Some(Err(e.to_string())),
    };

    let action = match (parsed.up, parsed.down) {
        (Some(uid), _) => ControlAction::Up {
            history_uid: Some(uid).filter(|u| !u.is_empty()),
        },
        (None, true) => ControlAction::Down,
        (None, false) => ControlAction::Status,
    };
    Some(Ok(action))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_not_a_command() {
        assert_eq!(parse_command("hello there"), None);
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("vtubers are fun"), None);
    }

    #[test]
    fn up_without_history() {
        assert_eq!(
            parse_command("vtuber -u"),
            Some(Ok(ControlAction::Up { history_uid: None }))
        );
        assert_eq!(
            parse_command("/vtuber --up"),
            Some(Ok(ControlAction::Up { history_uid: None }))
        );
    }

    #[test]
    fn up_with_history() {
        assert_eq!(
            parse_command("vtuber --up 2025-05-01_12-00-00_abc"),
            Some(Ok(ControlAction::Up {
                history_uid: Some("2025-05-01_12-00-00_abc".into())
            }))
        );
    }

    #[test]
    fn down() {
        assert_eq!(parse_command("vtuber -d"), Some(Ok(ControlAction::Down)));
    }

    #[test]
    fn bare_command_is_status() {
        assert_eq!(parse_command("/vtuber"), Some(Ok(ControlAction::Status)));
    }

    #[test]
    fn up_and_down_conflict() {
        assert!(matches!(parse_command("vtuber -u -d"), Some(Err(_))));
    }

    #[test]
    fn unknown_option_is_an_error() {
        assert!(matches!(parse_command("vtuber --sideways"), Some(Err(_))));
    }
}
