//! Tutorial command parsing.
//!
//! Free text in, a closed set of commands out. Anything that is not a command
//! yields `None` and is left to the caller as ordinary chat.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// `<step> <score>`, optionally prefixed with `feedback`. Steps are 1-based.
static FEEDBACK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:feedback\s+)?([1-9]\d{0,5})\s+(\d{1,3})$").expect("valid feedback regex")
});

/// A command a user can send to drive their tutorial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum TutorialCommand {
    /// Begin (or re-show) the tutorial.
    Start,
    /// Finish the current step.
    Next,
    Skip,
    Pause,
    Resume,
    Help,
    /// Show the user's own progress.
    Status,
    /// Show aggregate statistics.
    Stats,
    /// List completed steps available for rating.
    FeedbackPrompt,
    /// Rate a step. `step` is 0-based.
    Feedback { step: usize, score: i64 },
}

/// Parses user text into tutorial commands.
pub struct CommandParser;

impl CommandParser {
    /// Parse message content into a command, if it is one.
    pub fn parse(content: &str) -> Option<TutorialCommand> {
        let lower = content.trim().to_lowercase();
        let token = lower
            .strip_prefix('!')
            .or_else(|| lower.strip_prefix('/'))
            .unwrap_or(&lower)
            .trim();

        let command = match token {
            "start" | "tutorial" => TutorialCommand::Start,
            "next" | "done" => TutorialCommand::Next,
            "skip" => TutorialCommand::Skip,
            "pause" => TutorialCommand::Pause,
            "resume" => TutorialCommand::Resume,
            "help" => TutorialCommand::Help,
            "status" | "progress" => TutorialCommand::Status,
            "stats" => TutorialCommand::Stats,
            "feedback" => TutorialCommand::FeedbackPrompt,
            _ => return parse_feedback(token),
        };
        Some(command)
    }
}

fn parse_feedback(token: &str) -> Option<TutorialCommand> {
    let caps = FEEDBACK_PATTERN.captures(token)?;
    let step_number: usize = caps.get(1)?.as_str().parse().ok()?;
    let score: i64 = caps.get(2)?.as_str().parse().ok()?;
    Some(TutorialCommand::Feedback {
        step: step_number - 1,
        score,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_tokens() {
        let cases = [
            ("next", TutorialCommand::Next),
            ("done", TutorialCommand::Next),
            ("skip", TutorialCommand::Skip),
            ("pause", TutorialCommand::Pause),
            ("resume", TutorialCommand::Resume),
            ("help", TutorialCommand::Help),
            ("start", TutorialCommand::Start),
            ("tutorial", TutorialCommand::Start),
            ("status", TutorialCommand::Status),
            ("stats", TutorialCommand::Stats),
            ("feedback", TutorialCommand::FeedbackPrompt),
        ];
        for (input, expected) in cases {
            assert_eq!(CommandParser::parse(input), Some(expected), "input: {input}");
        }
    }

    #[test]
    fn normalizes_case_whitespace_and_prefix() {
        assert_eq!(CommandParser::parse("  NEXT \n"), Some(TutorialCommand::Next));
        assert_eq!(CommandParser::parse("!skip"), Some(TutorialCommand::Skip));
        assert_eq!(CommandParser::parse("/Pause"), Some(TutorialCommand::Pause));
    }

    #[test]
    fn feedback_pattern_is_one_based() {
        assert_eq!(
            CommandParser::parse("1 5"),
            Some(TutorialCommand::Feedback { step: 0, score: 5 })
        );
        assert_eq!(
            CommandParser::parse("feedback 3   2"),
            Some(TutorialCommand::Feedback { step: 2, score: 2 })
        );
        // Out-of-range scores still parse; the tracker rejects them.
        assert_eq!(
            CommandParser::parse("2 6"),
            Some(TutorialCommand::Feedback { step: 1, score: 6 })
        );
    }

    #[test]
    fn non_commands_are_ignored() {
        for input in [
            "",
            "hello everyone",
            "what's next?",
            "next please",
            "0 5",
            "1 2 3",
            "skipping",
            "1 -3",
        ] {
            assert_eq!(CommandParser::parse(input), None, "input: {input:?}");
        }
    }

    #[test]
    fn command_serde_tagged() {
        let json = serde_json::to_string(&TutorialCommand::Feedback { step: 1, score: 4 }).unwrap();
        assert_eq!(json, r#"{"command":"feedback","step":1,"score":4}"#);
        let parsed: TutorialCommand = serde_json::from_str(r#"{"command":"next"}"#).unwrap();
        assert_eq!(parsed, TutorialCommand::Next);
    }
}
