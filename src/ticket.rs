use std::fmt;

use rand::Rng;
use serde::{Serialize, Serializer};

use crate::models::{Performance, Title};

const SEAT_ROWS: &[u8] = b"ABCDEFGHIJKL";

/// Placeholder seat: a row letter `A`-`L` and a number `1`-`10`. There is
/// no seating map behind it.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SeatCode {
    row: char,
    number: u8,
}

impl SeatCode {
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let row = SEAT_ROWS[rng.random_range(0..SEAT_ROWS.len())] as char;
        let number = rng.random_range(1..=10);
        Self { row, number }
    }
}

impl fmt::Display for SeatCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.row, self.number)
    }
}

impl Serialize for SeatCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Everything the ticket view renders for one selected performance.
#[derive(Clone, Debug, Serialize)]
pub struct Ticket {
    pub title: String,
    pub original_title: String,
    pub rating: String,
    pub duration: i32,
    pub venue: String,
    pub date: String,
    pub time: String,
    pub format: String,
    pub language: String,
    pub hall: String,
    pub seats: u8,
    pub seat_number: SeatCode,
    pub poster_url: String,
}

impl Ticket {
    pub fn for_performance(
        title: &Title,
        performance: &Performance,
        venue: &str,
        seat: SeatCode,
    ) -> Self {
        Self {
            title: title.name.clone(),
            original_title: title.machine_name.clone(),
            rating: title.classification.clone(),
            duration: title.duration,
            venue: venue.to_string(),
            date: performance.start.strftime("%d %B %Y").to_string(),
            time: performance.start.strftime("%-I:%M %p").to_string(),
            format: performance.format.clone(),
            language: performance.language.clone(),
            hall: performance.hall.clone(),
            seats: 1,
            seat_number: seat,
            poster_url: title.poster.clone(),
        }
    }
}
