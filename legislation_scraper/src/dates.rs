//! Dates as stored in output records.
//!
//! State websites write dates in many ways. Everything that goes into a record is
//! canonicalized to `MM/DD/YYYY`.

use std::fmt;
use std::str::FromStr;
use chrono::{Datelike, NaiveDate};

const CANONICAL_FORMAT : &'static str = "%m/%d/%Y";

/// Formats that [CanonicalDate::parse_loose] will accept, tried in order.
const ACCEPTED_FORMATS : &[&str] = &["%m/%d/%Y","%m-%d-%Y","%Y-%m-%d","%m/%d/%y","%B %d, %Y","%b %d, %Y","%d %b %Y"];

/// A calendar date that serializes as `MM/DD/YYYY`.
#[derive(Debug,Clone,Copy,Eq,PartialEq,Ord,PartialOrd,Hash,serde_with::SerializeDisplay,serde_with::DeserializeFromStr)]
pub struct CanonicalDate(pub NaiveDate);

impl CanonicalDate {
    pub fn from_ymd(year:i32,month:u32,day:u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year,month,day).map(CanonicalDate)
    }

    /// Try each of the formats commonly seen on state websites.
    pub fn parse_loose(raw:&str) -> Option<Self> {
        let raw = raw.trim().trim_end_matches('.');
        if raw.is_empty() { return None; }
        // %Y happily reads "07" as the year 7, so insist on a plausible year.
        ACCEPTED_FORMATS.iter()
            .filter_map(|format|NaiveDate::parse_from_str(raw,format).ok())
            .find(|date|date.year()>=1000)
            .map(CanonicalDate)
    }

}

impl fmt::Display for CanonicalDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(CANONICAL_FORMAT))
    }
}

impl FromStr for CanonicalDate {
    type Err = chrono::ParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(CanonicalDate(NaiveDate::parse_from_str(s.trim(),CANONICAL_FORMAT)?))
    }
}
