//! # Inbound command grammar
//!
//! Players talk to the engine over plain SMS. Every message is mapped onto a
//! small fixed set of commands; anything outside the grammar becomes
//! [`Command::Unknown`], which callers answer with the help text. Parsing never
//! fails.
//!
//! Rules are checked in this order (case-insensitive, surrounding whitespace
//! ignored):
//!
//! | Input                         | Command                    |
//! |-------------------------------|----------------------------|
//! | digits and spaces (`1 2`)     | `Join([1, 2])`             |
//! | `YES`, `Y`                    | `Yes`                      |
//! | `NO`, `N`                     | `No`                       |
//! | `MAYBE`                       | `Maybe`                    |
//! | `CANCEL <n>`                  | `Cancel(n)`                |
//! | `RATE <name...> <1-5>`        | `Rate { player, score }`   |
//! | `PLAY [text]`                 | `Play(text)`               |
//! | `MATCHES`                     | `ListMatches`              |
//! | `STATUS`                      | `Status`                   |
//! | `NEXT`                        | `Next`                     |
//! | `HELP`, `?`                   | `Help`                     |

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    Join(Vec<i32>),
    Yes,
    No,
    Maybe,
    Cancel(i32),
    Rate { player: String, score: u8 },
    Play(String),
    Status,
    ListMatches,
    Next,
    Help,
    Unknown,
}

impl Command {
    /// Short label for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Join(_) => "join",
            Command::Yes => "yes",
            Command::No => "no",
            Command::Maybe => "maybe",
            Command::Cancel(_) => "cancel",
            Command::Rate { .. } => "rate",
            Command::Play(_) => "play",
            Command::Status => "status",
            Command::ListMatches => "matches",
            Command::Next => "next",
            Command::Help => "help",
            Command::Unknown => "unknown",
        }
    }
}

pub fn parse(raw: &str) -> Command {
    let text = raw.trim();
    if text.is_empty() {
        return Command::Unknown;
    }

    if text.chars().all(|c| c.is_ascii_digit() || c.is_whitespace()) {
        return parse_join(text);
    }

    let mut tokens = text.split_whitespace();
    let head = match tokens.next() {
        Some(head) => head,
        None => return Command::Unknown,
    };
    let rest: Vec<&str> = tokens.collect();

    if rest.is_empty() {
        return match head.to_ascii_uppercase().as_str() {
            "YES" | "Y" => Command::Yes,
            "NO" | "N" => Command::No,
            "MAYBE" => Command::Maybe,
            "PLAY" => Command::Play(String::new()),
            "MATCHES" => Command::ListMatches,
            "STATUS" => Command::Status,
            "NEXT" => Command::Next,
            "HELP" | "?" => Command::Help,
            _ => Command::Unknown,
        };
    }

    if head.eq_ignore_ascii_case("CANCEL") {
        return match rest.as_slice() {
            [number] => number
                .parse::<i32>()
                .map(Command::Cancel)
                .unwrap_or(Command::Unknown),
            _ => Command::Unknown,
        };
    }

    if head.eq_ignore_ascii_case("RATE") {
        return parse_rate(&rest);
    }

    if head.eq_ignore_ascii_case("PLAY") {
        return Command::Play(rest.join(" "));
    }

    Command::Unknown
}

fn parse_join(text: &str) -> Command {
    let numbers: Result<Vec<i32>, _> = text.split_whitespace().map(str::parse::<i32>).collect();
    match numbers {
        Ok(numbers) if !numbers.is_empty() => Command::Join(numbers),
        _ => Command::Unknown,
    }
}

fn parse_rate(rest: &[&str]) -> Command {
    let Some((last, name)) = rest.split_last() else {
        return Command::Unknown;
    };
    if name.is_empty() {
        return Command::Unknown;
    }
    match last.parse::<u8>() {
        Ok(score) if (1..=5).contains(&score) => Command::Rate {
            player: name.join(" "),
            score,
        },
        _ => Command::Unknown,
    }
}
