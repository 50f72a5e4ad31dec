use crate::commands::{CommandParser, CommandParserError};

/// Ends the client session. Answered by the gateway without contacting the data tier.
#[derive(Debug, PartialEq)]
pub struct Quit;

impl TryFrom<&mut CommandParser> for Quit {
    type Error = CommandParserError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        if parser.remaining() > 0 {
            return Err(CommandParserError::UnknownCommand {
                command: String::from("quit"),
            });
        }

        Ok(Self)
    }
}
