use std::fmt;

/// Marker the tiers use on the wire for a field the record does not have.
pub const ABSENT: &str = "None";

/// A numeric field as it arrived. Values that do not parse as integers are kept verbatim
/// instead of rejecting the record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Number {
    Int(i64),
    Raw(String),
}

impl Number {
    fn parse(value: &str) -> Number {
        value
            .parse::<i64>()
            .map(Number::Int)
            .unwrap_or_else(|_| Number::Raw(value.to_string()))
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(n) => write!(f, "{}", n),
            Number::Raw(s) => f.write_str(s),
        }
    }
}

/// One listing line of a result set: `id=1;city=Lakewood;address=1 Elm;price=500000;bedrooms=3`.
///
/// Every field is optional. Parsing never fails on a bad value; see [`Record::parse`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Record {
    pub id: Option<Number>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub price: Option<Number>,
    pub bedrooms: Option<Number>,
}

impl Record {
    /// Parses a `;` separated list of `key=value` segments.
    ///
    /// Segments without `=` and unknown keys are skipped, keys and values are trimmed, a
    /// repeated key keeps its last value and the [`ABSENT`] marker leaves the field unset.
    /// Returns `None` when the line holds no `key=value` segment at all.
    pub fn parse(line: &str) -> Option<Record> {
        let mut record = Record::default();
        let mut seen = false;

        for segment in line.split(';') {
            let Some((key, value)) = segment.split_once('=') else {
                continue;
            };
            seen = true;

            let value = value.trim();
            if value == ABSENT {
                continue;
            }

            match key.trim() {
                "id" => record.id = Some(Number::parse(value)),
                "city" => record.city = Some(value.to_string()),
                "address" => record.address = Some(value.to_string()),
                "price" => record.price = Some(Number::parse(value)),
                "bedrooms" => record.bedrooms = Some(Number::parse(value)),
                _ => {}
            }
        }

        seen.then_some(record)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "id={};city={};address={};price={};bedrooms={}",
            Field(&self.id),
            Field(&self.city),
            Field(&self.address),
            Field(&self.price),
            Field(&self.bedrooms),
        )
    }
}

struct Field<'a, T>(&'a Option<T>);

impl<T: fmt::Display> fmt::Display for Field<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(value) => value.fmt(f),
            None => f.write_str(ABSENT),
        }
    }
}
