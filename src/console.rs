//! Line-oriented front end standing in for the desktop GUI.

use thiserror::Error;

use crate::store::{RecommendationStatus, UnknownStatus};

pub const HELP: &str = "\
Commands:
  snapshot                                   show current telemetry
  recommend <algorithm> [goal...]            ask the model for settings
  list                                       past recommendations, newest first
  show <id>                                  full recommendation
  update <id> <status> [hash=<MH/s>] [power=<W>] [notes...]
                                             status: APPLIED | FAILED | REVERTED | CANCELLED
  history [n]                                last n logged snapshots (default 5)
  kb add <text>                              save a knowledge note
  kb list                                    list knowledge notes
  guide                                      how to turn outcomes into fine-tuning data
  help
  quit";

/// Workflow for turning recorded outcomes into fine-tuning data.
pub const GUIDE: &str = "\
--- LLM Fine-tuning Guidance ---

1. Collect data. Every recommendation you mark APPLIED, FAILED or REVERTED
   leaves a JSON document in <app_data_dir>/recommendations/ holding the
   model's text, the system snapshot at the time, the measured outcome and
   your notes.

2. Curate feedback.
   APPLIED records are positive examples to reinforce.
   FAILED and REVERTED records are the valuable ones: work out why the
   advice was wrong (too aggressive, missed a detail, unstable).

3. Build training pairs from the curated records.
   Failure: \"You recommended <text> for my <GPU> on <algorithm> in state
   <snapshot>. It caused <outcome>. What would you change?\" answered with a
   corrected, safer recommendation and why.
   Success: \"You recommended <text> ... and it achieved <outcome>. Why did it
   work?\" answered with the reasoning to keep.

4. Fine-tune an adapter (LoRA) on top of the local model rather than the
   whole model. Export the pairs as JSONL, train a few epochs with a PEFT
   tool such as peft or unsloth, then load the base model plus the adapter.

Repeat as outcomes accumulate; the model becomes specific to your hardware.";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Snapshot,
    Recommend {
        algorithm: String,
        goal: String,
    },
    List,
    Show(String),
    Update {
        id: String,
        status: RecommendationStatus,
        hash_rate_mhps: Option<f64>,
        power_draw_watts: Option<f64>,
        notes: String,
    },
    History(usize),
    KbAdd(String),
    KbList,
    Guide,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("unknown command '{0}' (type 'help')")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error(transparent)]
    Status(#[from] UnknownStatus),

    #[error("'{0}' is not a number")]
    NotANumber(String),
}

impl Command {
    /// Parse one input line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Ok(None);
        };
        let rest: Vec<&str> = words.collect();

        let cmd = match head.to_ascii_lowercase().as_str() {
            "snapshot" | "snap" => Command::Snapshot,
            "recommend" | "rec" => {
                let (algorithm, goal) = rest
                    .split_first()
                    .ok_or(CommandError::Usage("recommend <algorithm> [goal...]"))?;
                Command::Recommend {
                    algorithm: algorithm.to_string(),
                    goal: goal.join(" "),
                }
            }
            "list" | "ls" => Command::List,
            "show" => match rest.as_slice() {
                [id] => Command::Show(id.to_string()),
                _ => return Err(CommandError::Usage("show <id>")),
            },
            "update" => parse_update(&rest)?,
            "history" => match rest.as_slice() {
                [] => Command::History(5),
                [n] => Command::History(
                    n.parse()
                        .map_err(|_| CommandError::NotANumber(n.to_string()))?,
                ),
                _ => return Err(CommandError::Usage("history [n]")),
            },
            "kb" => match rest.split_first() {
                Some((&"add", text)) if !text.is_empty() => Command::KbAdd(text.join(" ")),
                Some((&"list", [])) => Command::KbList,
                _ => return Err(CommandError::Usage("kb add <text> | kb list")),
            },
            "guide" => Command::Guide,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(Some(cmd))
    }
}

fn parse_update(args: &[&str]) -> Result<Command, CommandError> {
    const USAGE: &str = "update <id> <status> [hash=<MH/s>] [power=<W>] [notes...]";
    let [id, status, tail @ ..] = args else {
        return Err(CommandError::Usage(USAGE));
    };

    let mut hash_rate_mhps = None;
    let mut power_draw_watts = None;
    let mut notes = Vec::new();
    for word in tail {
        if let Some(v) = word.strip_prefix("hash=") {
            hash_rate_mhps = Some(parse_number(v)?);
        } else if let Some(v) = word.strip_prefix("power=") {
            power_draw_watts = Some(parse_number(v)?);
        } else {
            notes.push(*word);
        }
    }

    Ok(Command::Update {
        id: id.to_string(),
        status: status.parse()?,
        hash_rate_mhps,
        power_draw_watts,
        notes: notes.join(" "),
    })
}

fn parse_number(s: &str) -> Result<f64, CommandError> {
    s.parse().map_err(|_| CommandError::NotANumber(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_recommend_with_goal() {
        assert_eq!(
            Command::parse("recommend Ethash max efficiency").unwrap(),
            Some(Command::Recommend {
                algorithm: "Ethash".to_string(),
                goal: "max efficiency".to_string(),
            })
        );
        assert_eq!(
            Command::parse("recommend"),
            Err(CommandError::Usage("recommend <algorithm> [goal...]"))
        );
    }

    #[test]
    fn parses_update_fields() {
        let cmd = Command::parse("update 20250101120000 applied hash=60.5 power=120 stable overnight")
            .unwrap()
            .unwrap();
        assert_eq!(
            cmd,
            Command::Update {
                id: "20250101120000".to_string(),
                status: RecommendationStatus::Applied,
                hash_rate_mhps: Some(60.5),
                power_draw_watts: Some(120.0),
                notes: "stable overnight".to_string(),
            }
        );
    }

    #[test]
    fn rejects_bad_status_and_numbers() {
        assert!(matches!(
            Command::parse("update x done"),
            Err(CommandError::Status(_))
        ));
        assert_eq!(
            Command::parse("update x applied hash=fast"),
            Err(CommandError::NotANumber("fast".to_string()))
        );
    }

    #[test]
    fn parses_guide() {
        assert_eq!(Command::parse("guide").unwrap(), Some(Command::Guide));
        assert!(GUIDE.contains("recommendations/"));
        assert!(HELP.contains("guide"));
    }

    #[test]
    fn blank_line_is_nothing() {
        assert_eq!(Command::parse("   ").unwrap(), None);
    }
}
