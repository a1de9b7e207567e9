//! Wire description of player intents.
//!
//! Front-ends describe what the player wants either as a console line
//! (`c 3 4`, `f 0 0`, `s alice`, ...) or as JSON (`{"Click":{"x":3,"y":4}}`).
//! Coordinates are kept as plain signed integers here; whether they land on
//! the board is decided by the engine, not by the parser.

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raw coordinate as typed by the player, not yet checked against any board.
pub type RawCoord = i64;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intent {
    Click { x: RawCoord, y: RawCoord },
    Flag { x: RawCoord, y: RawCoord },
    SaveScore { name: String },
    RemoveScore { name: String },
    PersistLeaderboard,
    LoadLeaderboard,
    Exit,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Empty action")]
    Empty,
    #[error("Unknown action `{0}`")]
    UnknownVerb(String),
    #[error("Action `{verb}` takes {expected} argument(s), got {found}")]
    WrongArity {
        verb: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("`{0}` is not a number")]
    NotANumber(String),
    #[error("Malformed action: {0}")]
    Json(String),
}

pub type Result<T> = core::result::Result<T, ParseError>;

const CLICK: &str = "c";
const FLAG: &str = "f";
const SAVE_SCORE: &str = "s";
const REMOVE_SCORE: &str = "r";
const PERSIST: &str = "p";
const LOAD: &str = "l";
const EXIT: &str = "e";

impl Intent {
    pub fn from_json(input: &str) -> Result<Self> {
        serde_json::from_str(input).map_err(|err| ParseError::Json(err.to_string()))
    }

    pub fn to_json(&self) -> String {
        // an enum of plain fields always serializes
        serde_json::to_string(self).unwrap_or_default()
    }
}

fn expect_args<'a>(verb: &'static str, args: &'a [&'a str], expected: usize) -> Result<&'a [&'a str]> {
    if args.len() == expected {
        Ok(args)
    } else {
        Err(ParseError::WrongArity {
            verb,
            expected,
            found: args.len(),
        })
    }
}

fn parse_coord(token: &str) -> Result<RawCoord> {
    token
        .parse()
        .map_err(|_| ParseError::NotANumber(token.to_owned()))
}

impl FromStr for Intent {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self> {
        let mut tokens = line.split_whitespace();
        let verb = tokens.next().ok_or(ParseError::Empty)?;
        let args: Vec<&str> = tokens.collect();

        Ok(match verb {
            CLICK | FLAG => {
                let verb = if verb == CLICK { CLICK } else { FLAG };
                let args = expect_args(verb, &args, 2)?;
                let (x, y) = (parse_coord(args[0])?, parse_coord(args[1])?);
                if verb == CLICK {
                    Intent::Click { x, y }
                } else {
                    Intent::Flag { x, y }
                }
            }
            SAVE_SCORE => {
                let args = expect_args(SAVE_SCORE, &args, 1)?;
                Intent::SaveScore {
                    name: args[0].to_owned(),
                }
            }
            REMOVE_SCORE => {
                let args = expect_args(REMOVE_SCORE, &args, 1)?;
                Intent::RemoveScore {
                    name: args[0].to_owned(),
                }
            }
            PERSIST => {
                expect_args(PERSIST, &args, 0)?;
                Intent::PersistLeaderboard
            }
            LOAD => {
                expect_args(LOAD, &args, 0)?;
                Intent::LoadLeaderboard
            }
            EXIT => {
                expect_args(EXIT, &args, 0)?;
                Intent::Exit
            }
            other => return Err(ParseError::UnknownVerb(other.to_owned())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_console_click_and_flag() {
        assert_eq!("c 3 4".parse::<Intent>(), Ok(Intent::Click { x: 3, y: 4 }));
        assert_eq!("  f   0 -1 ".parse::<Intent>(), Ok(Intent::Flag { x: 0, y: -1 }));
    }

    #[test]
    fn parses_score_intents() {
        assert_eq!(
            "s alice".parse::<Intent>(),
            Ok(Intent::SaveScore {
                name: "alice".into()
            })
        );
        assert_eq!(
            "r bob".parse::<Intent>(),
            Ok(Intent::RemoveScore { name: "bob".into() })
        );
        assert_eq!("p".parse::<Intent>(), Ok(Intent::PersistLeaderboard));
        assert_eq!("l".parse::<Intent>(), Ok(Intent::LoadLeaderboard));
        assert_eq!("e".parse::<Intent>(), Ok(Intent::Exit));
    }

    #[test]
    fn rejects_wrong_arity() {
        assert_eq!(
            "c 1".parse::<Intent>(),
            Err(ParseError::WrongArity {
                verb: "c",
                expected: 2,
                found: 1
            })
        );
        assert_eq!(
            "e now".parse::<Intent>(),
            Err(ParseError::WrongArity {
                verb: "e",
                expected: 0,
                found: 1
            })
        );
    }

    #[test]
    fn rejects_non_numeric_coordinates() {
        assert_eq!(
            "f x 2".parse::<Intent>(),
            Err(ParseError::NotANumber("x".into()))
        );
    }

    #[test]
    fn rejects_empty_and_unknown() {
        assert_eq!("   ".parse::<Intent>(), Err(ParseError::Empty));
        assert_eq!(
            "jump 1 2".parse::<Intent>(),
            Err(ParseError::UnknownVerb("jump".into()))
        );
    }

    #[test]
    fn json_form_matches_enum_shape() {
        let intent = Intent::from_json(r#"{"Click":{"x":1,"y":2}}"#).unwrap();
        assert_eq!(intent, Intent::Click { x: 1, y: 2 });
        assert_eq!(Intent::from_json(r#""Exit""#).unwrap(), Intent::Exit);
        assert_eq!(intent.to_json(), r#"{"Click":{"x":1,"y":2}}"#);
        assert!(matches!(
            Intent::from_json(r#"{"Click":{"x":"a"}}"#),
            Err(ParseError::Json(_))
        ));
    }
}
