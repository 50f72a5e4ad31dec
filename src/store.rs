use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error as ThisError;
use tracing::warn;

use crate::frame::Frame;
use crate::pipeline::ResultSet;
use crate::record::{Number, Record};

#[derive(Debug, ThisError)]
pub enum StoreError {
    #[error("failed to read listings: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse listings: {0}")]
    Json(#[from] serde_json::Error),
}

/// A listing as stored in the JSON database. Any field may be missing or of an unexpected
/// type; such listings are still served, they just never match a search on that field.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Listing {
    pub id: Option<Value>,
    pub city: Option<Value>,
    pub address: Option<Value>,
    pub price: Option<Value>,
    pub bedrooms: Option<Value>,
}

impl Listing {
    fn price(&self) -> Option<f64> {
        match self.price.as_ref()? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn in_city(&self, city: &str) -> bool {
        matches!(&self.city, Some(Value::String(c)) if c.to_lowercase() == city.to_lowercase())
    }

    fn to_record(&self) -> Record {
        Record {
            id: self.id.as_ref().map(number),
            city: self.city.as_ref().map(text),
            address: self.address.as_ref().map(text),
            price: self.price.as_ref().map(number),
            bedrooms: self.bedrooms.as_ref().map(number),
        }
    }
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn number(value: &Value) -> Number {
    value
        .as_i64()
        .map(Number::Int)
        .unwrap_or_else(|| Number::Raw(text(value)))
}

/// The data tier's in-memory record set. Read only once loaded, clones share the listings.
#[derive(Clone, Debug, Default)]
pub struct Store {
    listings: Arc<Vec<Listing>>,
}

impl Store {
    pub fn new(listings: Vec<Listing>) -> Store {
        Store {
            listings: Arc::new(listings),
        }
    }

    /// Reads a JSON array of listings.
    pub fn open(path: impl AsRef<Path>) -> Result<Store, StoreError> {
        let data = fs::read_to_string(path)?;
        let listings: Vec<Listing> = serde_json::from_str(&data)?;

        Ok(Store::new(listings))
    }

    /// Like [`Store::open`], but an unreadable or malformed file yields an empty store.
    pub fn load(path: impl AsRef<Path>) -> Store {
        let path = path.as_ref();

        Store::open(path).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "Serving an empty listing set");
            Store::default()
        })
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    /// Listings in `city` (case-insensitive) priced at or below `max_price`.
    pub fn search(&self, city: &str, max_price: f64) -> Vec<&Listing> {
        self.listings
            .iter()
            .filter(|listing| listing.in_city(city))
            .filter(|listing| listing.price().is_some_and(|price| price <= max_price))
            .collect()
    }

    /// Answers one `RAW_LIST` / `RAW_SEARCH` request line.
    pub fn execute(&self, line: &str) -> Frame {
        let parts: Vec<&str> = line.split_whitespace().collect();

        let Some(command) = parts.first() else {
            return error("malformed command");
        };

        match command.to_uppercase().as_str() {
            "RAW_LIST" if parts.len() == 1 => render(self.listings.iter()),
            "RAW_LIST" => error("malformed command"),
            "RAW_SEARCH" => {
                if parts.len() != 3 {
                    return error("SEARCH command requires 2 arguments: city and max_price");
                }

                let Ok(max_price) = parts[2].parse::<f64>() else {
                    return error("Invalid max_price value");
                };

                render(self.search(parts[1], max_price).into_iter())
            }
            _ => error("unknown command"),
        }
    }
}

fn render<'a>(listings: impl Iterator<Item = &'a Listing>) -> Frame {
    let records: Vec<Record> = listings.map(Listing::to_record).collect();

    ResultSet::from(records)
        .render()
        .unwrap_or_else(|e| error(&e.to_string()))
}

fn error(message: &str) -> Frame {
    Frame::new(format!("ERROR: {}", message))
}
