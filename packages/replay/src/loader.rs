//! CSV event loading.
//!
//! Rows are `user,item,rating[,timestamp]` without a header. Indices must be
//! non-negative integers; the timestamp column is accepted and ignored since
//! events are replayed in file order.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use streamrec_algo::Event;

use crate::error::ReplayError;

pub fn load_events(path: &Path) -> Result<Vec<Event>, ReplayError> {
    let file = File::open(path)?;
    let events = read_events(file)?;
    tracing::info!(path = %path.display(), events = events.len(), "loaded events");
    Ok(events)
}

pub fn read_events<R: Read>(reader: R) -> Result<Vec<Event>, ReplayError> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut events = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        events.push(parse_record(&record, line)?);
    }
    Ok(events)
}

fn parse_record(record: &StringRecord, line: u64) -> Result<Event, ReplayError> {
    if record.len() < 3 {
        return Err(ReplayError::Parse {
            line,
            message: format!("expected at least 3 fields, got {}", record.len()),
        });
    }

    let user = parse_field::<usize>(record, 0, "user", line)?;
    let item = parse_field::<usize>(record, 1, "item", line)?;
    let rating = parse_field::<f64>(record, 2, "rating", line)?;

    Ok(Event::new(user, item, rating))
}

fn parse_field<T>(
    record: &StringRecord,
    idx: usize,
    name: &str,
    line: u64,
) -> Result<T, ReplayError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = record.get(idx).unwrap_or_default();
    raw.parse::<T>().map_err(|e| ReplayError::Parse {
        line,
        message: format!("invalid {name} {raw:?}: {e}"),
    })
}
