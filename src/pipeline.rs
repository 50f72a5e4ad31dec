use itertools::Itertools;
use std::cmp::{Ordering, Reverse};
use std::fmt::{self, Write};
use thiserror::Error as ThisError;
use tracing::{error, warn};

use crate::frame::Frame;
use crate::record::{Number, Record};

const RESULT_HEADER: &str = "OK RESULT";

#[derive(Debug, ThisError)]
pub enum PipelineError {
    #[error("neither an `OK RESULT` header nor a record in {body:?}")]
    Unrecognized { body: String },
    #[error("failed to render result set: {0}")]
    Render(#[from] fmt::Error),
}

/// An ordered sequence of records. Sorting yields a new set, the original is left as is.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResultSet {
    records: Vec<Record>,
}

impl ResultSet {
    /// Parses a data tier response, usually an `OK RESULT <N>` header followed by one
    /// record per line.
    ///
    /// Blank lines, the terminator and header lines are skipped wherever they appear, lines
    /// without any `key=value` segment are dropped. A response holding neither a header nor a
    /// single record is not a result set.
    pub fn parse(frame: &Frame) -> Result<ResultSet, PipelineError> {
        let mut expected = None;
        let mut header = false;
        let mut records = Vec::new();

        for line in frame.body().lines().map(str::trim) {
            if line.is_empty() || line == "END" {
                continue;
            }

            if let Some(count) = line.strip_prefix(RESULT_HEADER) {
                if !header {
                    header = true;
                    expected = count.trim().parse::<usize>().ok();
                }
                continue;
            }

            records.extend(Record::parse(line));
        }

        if !header && records.is_empty() {
            return Err(PipelineError::Unrecognized {
                body: frame.body().to_string(),
            });
        }

        if let Some(expected) = expected {
            if expected != records.len() {
                warn!(
                    expected,
                    parsed = records.len(),
                    "Data tier record count does not match its header"
                );
            }
        }

        Ok(ResultSet { records })
    }

    /// Ascending price, then descending bedrooms. The sort is stable.
    ///
    /// Records without a price go last and records without bedrooms count as having none.
    /// Values that are not integers order after every integer.
    pub fn sorted(&self) -> ResultSet {
        let records = self
            .records
            .iter()
            .cloned()
            .sorted_by(by_price_then_bedrooms)
            .collect();

        ResultSet { records }
    }

    /// `OK RESULT <N>` followed by one line per record and the terminator.
    pub fn render(&self) -> Result<Frame, PipelineError> {
        let mut out = String::new();

        writeln!(out, "{} {}", RESULT_HEADER, self.records.len())?;
        for record in &self.records {
            writeln!(out, "{}", record)?;
        }

        Ok(Frame::new(out))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }
}

impl From<Vec<Record>> for ResultSet {
    fn from(records: Vec<Record>) -> Self {
        ResultSet { records }
    }
}

/// Turns a successful data tier response into the client facing reply.
///
/// Failures never reach the client in detail: they are logged and answered with a generic
/// internal error.
pub fn process(response: &Frame) -> Frame {
    let rendered = ResultSet::parse(response).and_then(|set| set.sorted().render());

    match rendered {
        Ok(frame) => frame,
        Err(e) => {
            error!(error = %e, "Failed to process data tier response");
            Frame::application_error("Internal processing error")
        }
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum PriceRank<'a> {
    Int(i64),
    Raw(&'a str),
    Absent,
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum BedroomsRank<'a> {
    Int(Reverse<i64>),
    Raw(&'a str),
}

fn price_rank(record: &Record) -> PriceRank<'_> {
    match &record.price {
        Some(Number::Int(n)) => PriceRank::Int(*n),
        Some(Number::Raw(s)) => PriceRank::Raw(s),
        None => PriceRank::Absent,
    }
}

fn bedrooms_rank(record: &Record) -> BedroomsRank<'_> {
    match &record.bedrooms {
        Some(Number::Int(n)) => BedroomsRank::Int(Reverse(*n)),
        Some(Number::Raw(s)) => BedroomsRank::Raw(s),
        None => BedroomsRank::Int(Reverse(0)),
    }
}

fn by_price_then_bedrooms(a: &Record, b: &Record) -> Ordering {
    price_rank(a)
        .cmp(&price_rank(b))
        .then_with(|| bedrooms_rank(a).cmp(&bedrooms_rank(b)))
}
