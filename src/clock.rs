//! Exhibition-timezone helpers.
//!
//! The venue runs on America/Bogota, which has been a fixed UTC-05:00 with
//! no daylight-saving transitions since 1993, so a fixed offset is used
//! rather than a tzdb lookup. Every instant that leaves this crate is
//! serialised in the listings source's wire format, e.g.
//! `2024-09-12T20:40:00-05:00`.

use jiff::{
    Timestamp, Zoned,
    civil::{Date, DateTime},
    tz::{self, TimeZone},
};
use serde::Serializer;

pub const EXHIBITION_TZ_NAME: &str = "America/Bogota";

const WIRE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

pub fn exhibition_tz() -> TimeZone {
    TimeZone::fixed(tz::offset(-5))
}

/// Today's calendar date at the venue.
pub fn today() -> Date {
    Timestamp::now().to_zoned(exhibition_tz()).date()
}

pub fn to_exhibition(ts: Timestamp) -> Zoned {
    ts.to_zoned(exhibition_tz())
}

/// Parses an upstream start value. Values carrying an offset are instants;
/// bare wall-clock values are read as venue-local.
pub fn parse_start(raw: &str) -> Result<Zoned, jiff::Error> {
    let raw = raw.trim();
    match raw.parse::<Timestamp>() {
        Ok(ts) => Ok(to_exhibition(ts)),
        Err(_) => raw.parse::<DateTime>()?.to_zoned(exhibition_tz()),
    }
}

pub fn to_wire(zoned: &Zoned) -> String {
    zoned.strftime(WIRE_FORMAT).to_string()
}

/// Storage representation: the same instant, in UTC.
pub fn to_storage(zoned: &Zoned) -> String {
    zoned.timestamp().to_string()
}

pub fn from_storage(raw: &str) -> Result<Zoned, jiff::Error> {
    Ok(to_exhibition(raw.parse::<Timestamp>()?))
}

pub fn serialize_wire<S: Serializer>(zoned: &Zoned, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&to_wire(zoned))
}
