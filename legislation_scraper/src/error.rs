//! Errors that are scoped to a single unit of work (one chamber/year, or one bill within it).
//!
//! None of these should ever escape the [crate::driver::Driver]; they are caught at the unit
//! boundary, reported, and the run carries on. Run-level problems (bad configuration, an
//! unusable output directory) use `anyhow` instead.

use thiserror::Error;

/// Could not get a page from a state website.
#[derive(Debug,Clone,Error,PartialEq,Eq)]
#[error("could not fetch {url}{}: {reason}", .status.map(|s|format!(" (HTTP {})",s)).unwrap_or_default())]
pub struct FetchError {
    pub url : String,
    /// HTTP status, if the server answered at all.
    pub status : Option<u16>,
    pub reason : String,
}

impl FetchError {
    pub fn new(url:&str,status:Option<u16>,reason:impl Into<String>) -> Self {
        FetchError{ url: url.to_string(), status, reason: reason.into() }
    }
}

/// A fetched page does not have the structure the parser expects.
#[derive(Debug,Clone,Error,PartialEq,Eq)]
pub enum ParseError {
    #[error("page has no root container matching `{selector}`")]
    MissingRoot { selector : String },
    #[error("could not parse selector `{selector}`: {reason}")]
    BadSelector { selector : String, reason : String },
    #[error("malformed page: {what}")]
    Malformed { what : String },
}

impl ParseError {
    pub fn malformed(what:impl Into<String>) -> Self { ParseError::Malformed { what: what.into() } }
    pub fn missing_root(selector:&str) -> Self { ParseError::MissingRoot { selector: selector.to_string() } }
}

/// There is no known session for the requested year.
#[derive(Debug,Clone,Error,PartialEq,Eq)]
#[error("no data exists for {state} in {year}")]
pub struct UnsupportedYearError {
    pub state : String,
    pub year : i32,
}

/// Anything that can make a unit (or a bill inside a unit) fail.
#[derive(Debug,Clone,Error,PartialEq,Eq)]
pub enum UnitError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    UnsupportedYear(#[from] UnsupportedYearError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_message() {
        let e = FetchError::new("http://example.com/a",Some(404),"Not Found");
        assert_eq!("could not fetch http://example.com/a (HTTP 404): Not Found",e.to_string());
        let e = FetchError::new("http://example.com/a",None,"timed out");
        assert_eq!("could not fetch http://example.com/a: timed out",e.to_string());
    }

    #[test]
    fn test_unit_error_wraps_transparently() {
        let e : UnitError = UnsupportedYearError{ state: "wi".to_string(), year: 1850 }.into();
        assert_eq!("no data exists for wi in 1850",e.to_string());
        assert!(matches!(e,UnitError::UnsupportedYear(_)));
    }
}
