use super::ScrapeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Key of the composite selector that expands to every catalog source.
pub const ALL_SOURCES_KEY: &str = "all";

/// A known external data feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrapeSource {
    /// Franchise listings.
    Franchise,
    /// Doroob training course catalog.
    Doroob,
    /// Entrepreneur support programs.
    Support,
}

impl ScrapeSource {
    pub const ALL: [ScrapeSource; 3] = [
        ScrapeSource::Franchise,
        ScrapeSource::Doroob,
        ScrapeSource::Support,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScrapeSource::Franchise => "franchise",
            ScrapeSource::Doroob => "doroob",
            ScrapeSource::Support => "support",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "franchise" => Some(ScrapeSource::Franchise),
            "doroob" => Some(ScrapeSource::Doroob),
            "support" => Some(ScrapeSource::Support),
            _ => None,
        }
    }

    /// Label used when the job definition does not provide its own.
    pub fn default_label(&self) -> &'static str {
        match self {
            ScrapeSource::Franchise => "Franchise listings",
            ScrapeSource::Doroob => "Doroob courses",
            ScrapeSource::Support => "Support programs",
        }
    }
}

impl fmt::Display for ScrapeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a trigger asked to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceSelector {
    All,
    One(ScrapeSource),
}

impl fmt::Display for SourceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceSelector::All => f.write_str(ALL_SOURCES_KEY),
            SourceSelector::One(source) => source.fmt(f),
        }
    }
}

impl FromStr for SourceSelector {
    type Err = ScrapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == ALL_SOURCES_KEY {
            return Ok(SourceSelector::All);
        }
        ScrapeSource::parse(s)
            .map(SourceSelector::One)
            .ok_or_else(|| ScrapeError::UnknownSource(s.to_string()))
    }
}
