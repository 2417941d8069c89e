// OpenFlights flat files, see https://openflights.org/data.php
// Neither file has a header row and `\N` stands for null.
use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord};
use log::debug;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

const NULL: &str = "\\N";

pub const AIRPORT_COLUMNS: usize = 14;
pub const ROUTE_COLUMNS: usize = 9;

/// The columns of airports.dat the dataset needs. The other columns are
/// still checked when a row is parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenFlightsAirport {
    /// OpenFlights internal ID
    pub id: i64,
    pub iata: Option<String>,
    pub icao: String,
    pub lat: f64,
    pub lon: f64,
}

/// The columns of routes.dat the dataset needs.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenFlightsRoute {
    pub src_airport_code: String,
    pub src_airport_id: Option<i64>,
    pub dst_airport_code: String,
    pub dst_airport_id: Option<i64>,
    pub stops: i64,
}

#[derive(Error, Debug, PartialEq)]
pub enum RowError {
    #[error("expected {expected} columns, found {found}")]
    ColumnCount { expected: usize, found: usize },
    #[error("null value in {0}")]
    Null(&'static str),
    #[error("empty value in {0}")]
    Empty(&'static str),
    #[error("invalid number {value:?} in {column}")]
    Number { column: &'static str, value: String },
    #[error("invalid integer {value:?} in {column}")]
    Integer { column: &'static str, value: String },
    #[error("invalid codeshare flag {0:?}")]
    Codeshare(String),
}

struct Row<'a> {
    record: &'a StringRecord,
}

impl<'a> Row<'a> {
    fn new(record: &'a StringRecord, expected: usize) -> Result<Self, RowError> {
        if record.len() != expected {
            return Err(RowError::ColumnCount {
                expected,
                found: record.len(),
            });
        }
        Ok(Self { record })
    }

    fn nullable_string(&self, ix: usize) -> Option<&'a str> {
        self.record.get(ix).filter(|value| *value != NULL)
    }

    fn string(&self, ix: usize, column: &'static str) -> Result<String, RowError> {
        self.nullable_string(ix)
            .map(str::to_string)
            .ok_or(RowError::Null(column))
    }

    fn non_empty(&self, ix: usize, column: &'static str) -> Result<String, RowError> {
        let value = self.string(ix, column)?;
        if value.is_empty() {
            return Err(RowError::Empty(column));
        }
        Ok(value)
    }

    fn nullable_non_empty(
        &self,
        ix: usize,
        column: &'static str,
    ) -> Result<Option<String>, RowError> {
        match self.nullable_string(ix) {
            None => Ok(None),
            Some("") => Err(RowError::Empty(column)),
            Some(value) => Ok(Some(value.to_string())),
        }
    }

    fn nullable_number(&self, ix: usize, column: &'static str) -> Result<Option<f64>, RowError> {
        self.nullable_string(ix)
            .map(|value| {
                value
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|n| n.is_finite())
                    .ok_or_else(|| RowError::Number {
                        column,
                        value: value.to_string(),
                    })
            })
            .transpose()
    }

    fn number(&self, ix: usize, column: &'static str) -> Result<f64, RowError> {
        self.nullable_number(ix, column)?.ok_or(RowError::Null(column))
    }

    fn nullable_integer(&self, ix: usize, column: &'static str) -> Result<Option<i64>, RowError> {
        self.nullable_string(ix)
            .map(|value| {
                value.trim().parse::<i64>().map_err(|_| RowError::Integer {
                    column,
                    value: value.to_string(),
                })
            })
            .transpose()
    }

    fn integer(&self, ix: usize, column: &'static str) -> Result<i64, RowError> {
        self.nullable_integer(ix, column)?.ok_or(RowError::Null(column))
    }
}

pub fn parse_airport(record: &StringRecord) -> Result<OpenFlightsAirport, RowError> {
    let row = Row::new(record, AIRPORT_COLUMNS)?;
    let airport = OpenFlightsAirport {
        id: row.integer(0, "id")?,
        iata: row.nullable_non_empty(4, "iata")?,
        icao: row.non_empty(5, "icao")?,
        lat: row.number(6, "lat")?,
        lon: row.number(7, "lon")?,
    };

    let required = [
        (1, "name"),
        (2, "city"),
        (3, "country"),
        (12, "type"),
        (13, "source"),
    ];
    for (ix, column) in required {
        row.string(ix, column)?;
    }
    row.number(8, "alt")?;
    row.nullable_number(9, "tzOffset")?;

    Ok(airport)
}

pub fn parse_route(record: &StringRecord) -> Result<OpenFlightsRoute, RowError> {
    let row = Row::new(record, ROUTE_COLUMNS)?;
    let route = OpenFlightsRoute {
        src_airport_code: row.non_empty(2, "srcAirportCode")?,
        src_airport_id: row.nullable_integer(3, "srcAirportId")?,
        dst_airport_code: row.non_empty(4, "dstAirportCode")?,
        dst_airport_id: row.nullable_integer(5, "dstAirportId")?,
        stops: row.integer(7, "stops")?,
    };

    row.non_empty(0, "airlineCode")?;
    row.nullable_integer(1, "airlineId")?;
    match row.string(6, "codeshare")?.as_str() {
        "" | "Y" => {}
        other => return Err(RowError::Codeshare(other.to_string())),
    }
    row.string(8, "equipment")?;

    Ok(route)
}

/// Feeds every valid row to `on_row`. Rows that do not match the schema are
/// logged and skipped. Returns the number of skipped rows.
pub fn parse_reader<R, T, P, F>(reader: R, parse_row: P, mut on_row: F) -> Result<usize>
where
    R: Read,
    P: Fn(&StringRecord) -> Result<T, RowError>,
    F: FnMut(T),
{
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut skipped = 0;
    for result in rdr.records() {
        let record = result?;
        match parse_row(&record) {
            Ok(value) => on_row(value),
            Err(e) => {
                debug!("Skipping row: {} {:?}", e, record);
                skipped += 1;
            }
        }
    }
    Ok(skipped)
}

pub fn parse_file<T, P, F>(path: &Path, parse_row: P, on_row: F) -> Result<usize>
where
    P: Fn(&StringRecord) -> Result<T, RowError>,
    F: FnMut(T),
{
    let file = std::fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    parse_reader(file, parse_row, on_row).with_context(|| format!("parsing {}", path.display()))
}
