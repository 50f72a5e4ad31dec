pub mod list;
pub mod quit;
pub mod search;
pub mod translate;

use std::vec;
use thiserror::Error as ThisError;

use list::List;
use quit::Quit;
use search::Search;

/// A validated client command.
#[derive(Debug, PartialEq)]
pub enum Command {
    List(List),
    Search(Search),
    Quit(Quit),
}

impl TryFrom<&str> for Command {
    type Error = CommandParserError;

    fn try_from(line: &str) -> Result<Self, Self::Error> {
        let parts: Vec<String> = line.split_whitespace().map(String::from).collect();

        let parser = &mut CommandParser {
            parts: parts.into_iter(),
        };

        let command_name = parser.parse_command_name()?;

        match &command_name[..] {
            "list" => List::try_from(parser).map(Command::List),
            "search" => Search::try_from(parser).map(Command::Search),
            "quit" => Quit::try_from(parser).map(Command::Quit),
            _ => Err(CommandParserError::UnknownCommand {
                command: command_name,
            }),
        }
    }
}

pub struct CommandParser {
    parts: vec::IntoIter<String>,
}

impl CommandParser {
    fn parse_command_name(&mut self) -> Result<String, CommandParserError> {
        self.parts
            .next()
            .map(|name| name.to_lowercase())
            .ok_or(CommandParserError::Empty)
    }

    fn next_string(&mut self) -> Option<String> {
        self.parts.next()
    }

    fn remaining(&self) -> usize {
        self.parts.len()
    }
}

/// Reasons a client line is rejected before any data tier traffic happens. The messages are
/// sent to the client verbatim after the `ERROR: APPLICATION` prefix.
#[derive(Debug, ThisError, PartialEq)]
pub enum CommandParserError {
    #[error("Empty command")]
    Empty,
    #[error("Unknown command")]
    UnknownCommand { command: String },
    #[error("Usage: {usage}")]
    Usage { usage: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::translate::Translate;

    #[test]
    fn parse_list() {
        assert_eq!(Command::try_from("LIST"), Ok(Command::List(List)));
        assert_eq!(Command::try_from("list"), Ok(Command::List(List)));
        assert_eq!(Command::try_from("  LiSt  "), Ok(Command::List(List)));
    }

    #[test]
    fn parse_search() {
        let cmd = Command::try_from("search Lakewood 450000").unwrap();

        assert_eq!(
            cmd,
            Command::Search(Search {
                city: String::from("Lakewood"),
                max_price: String::from("450000"),
            })
        );
    }

    #[test]
    fn parse_quit() {
        assert_eq!(Command::try_from("Quit"), Ok(Command::Quit(Quit)));
    }

    #[test]
    fn empty_line() {
        assert_eq!(Command::try_from("   "), Err(CommandParserError::Empty));
    }

    #[test]
    fn unknown_command() {
        let err = Command::try_from("DELETE 1").unwrap_err();

        assert_eq!(
            err,
            CommandParserError::UnknownCommand {
                command: String::from("delete")
            }
        );
        assert_eq!(err.to_string(), "Unknown command");
    }

    #[test]
    fn translate_to_data_tier_requests() {
        let Ok(Command::List(list)) = Command::try_from("list") else {
            panic!("expected LIST");
        };
        assert_eq!(list.translate(), "RAW_LIST");

        let Ok(Command::Search(search)) = Command::try_from("SEARCH   lakewood 300000") else {
            panic!("expected SEARCH");
        };
        assert_eq!(search.translate(), "RAW_SEARCH lakewood 300000");
    }
}
