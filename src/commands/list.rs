use crate::commands::translate::Translate;
use crate::commands::{CommandParser, CommandParserError};

/// Every record held by the data tier.
#[derive(Debug, PartialEq)]
pub struct List;

impl Translate for List {
    fn translate(&self) -> String {
        String::from("RAW_LIST")
    }
}

impl TryFrom<&mut CommandParser> for List {
    type Error = CommandParserError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        // `LIST` takes no arguments, anything after it is not a command we know.
        if parser.remaining() > 0 {
            return Err(CommandParserError::UnknownCommand {
                command: String::from("list"),
            });
        }

        Ok(Self)
    }
}
