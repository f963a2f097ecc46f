use jiff::{Zoned, civil::Date};
use serde::Serialize;

/// One scheduled showing of a [`Title`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Performance {
    /// Upstream-assigned id, unique per title and date.
    pub performance_id: String,
    #[serde(serialize_with = "crate::clock::serialize_wire")]
    pub start: Zoned,
    pub format: String,
    pub language: String,
    pub hall: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Title {
    pub name: String,
    pub machine_name: String,
    pub duration: i32,
    pub classification: String,
    pub poster: String,
    pub last_updated: Date,
    pub performances: Vec<Performance>,
}

impl Title {
    pub fn performance(&self, performance_id: &str) -> Option<&Performance> {
        self.performances.iter().find(|p| p.performance_id == performance_id)
    }
}

/// Outcome of a single poster lookup, before the poster policy is applied.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PosterLookup {
    Found(String),
    Missing(String),
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum PosterPolicy {
    /// Substitute the configured placeholder image.
    #[default]
    Placeholder,
    /// Abort the refresh on the first miss.
    FailFast,
}

impl std::str::FromStr for PosterPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "placeholder" => Ok(PosterPolicy::Placeholder),
            "fail" | "fail-fast" => Ok(PosterPolicy::FailFast),
            other => anyhow::bail!("unknown poster failure policy: {other}"),
        }
    }
}
