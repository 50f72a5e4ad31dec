use crate::commands::translate::Translate;
use crate::commands::{CommandParser, CommandParserError};

const USAGE: &str = "SEARCH <city> <max_price>";

/// Records in `city` priced at or below `max_price`.
///
/// `max_price` is kept as the client typed it; whether it is a number is for the data tier to
/// decide.
#[derive(Debug, PartialEq)]
pub struct Search {
    pub city: String,
    pub max_price: String,
}

impl Translate for Search {
    fn translate(&self) -> String {
        format!("RAW_SEARCH {} {}", self.city, self.max_price)
    }
}

impl TryFrom<&mut CommandParser> for Search {
    type Error = CommandParserError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        if parser.remaining() != 2 {
            return Err(CommandParserError::Usage { usage: USAGE });
        }

        let usage = || CommandParserError::Usage { usage: USAGE };
        let city = parser.next_string().ok_or_else(usage)?;
        let max_price = parser.next_string().ok_or_else(usage)?;

        Ok(Self { city, max_price })
    }
}
