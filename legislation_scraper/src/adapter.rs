//! The interface each state website implements.
//!
//! An adapter knows two things about its site: which requests to make for a unit of work,
//! and how to pull structured fragments out of the pages that come back. Extraction is a
//! pure function of page content; adapters never fetch anything themselves.
//!
//! Extraction is best effort. A missing or malformed field is left unset. Only a page that
//! is unusable as a whole (its root container is missing) produces a [ParseError].

use crate::bill::SponsorType;
use crate::chamber::{Actor, Chamber};
use crate::error::{ParseError, UnsupportedYearError};
use crate::fetch::{Page, PageRequest};
use crate::metadata::StateMetadata;

/// A session resolved from a requested year.
#[derive(Debug,Clone,Eq,PartialEq)]
pub struct SessionUnit {
    /// The session name as written to records, e.g. `2007`.
    pub session : String,
    /// The first calendar year of the session.
    pub first_year : i32,
    /// Whatever the site uses to identify the session (a URL prefix, a database name...).
    pub site_key : String,
}

/// One (chamber, year) unit of work, after the year has been resolved to a session.
#[derive(Debug,Clone,Eq,PartialEq)]
pub struct ScrapeUnit {
    pub chamber : Chamber,
    pub year : i32,
    pub session : SessionUnit,
}

#[derive(Debug,Clone,Eq,PartialEq)]
pub struct ParsedSponsor {
    pub name : String,
    /// `None` if the source does not say.
    pub sponsor_type : Option<SponsorType>,
    pub chamber : Option<Chamber>,
}

#[derive(Debug,Clone,Eq,PartialEq)]
pub struct ParsedAction {
    pub actor : Actor,
    pub text : String,
    /// The date as written on the page, if the line had one.
    pub date : Option<String>,
}

/// A named link to a version of a bill or to some other document.
#[derive(Debug,Clone,Eq,PartialEq)]
pub struct ParsedLink {
    pub name : String,
    /// As found in the page; may be relative.
    pub href : String,
}

#[derive(Debug,Clone,Eq,PartialEq,Default)]
pub struct ParsedVote {
    pub chamber : Option<Chamber>,
    pub date : Option<String>,
    pub motion : String,
    /// `None` means work it out from the counts.
    pub passed : Option<bool>,
    pub yes_count : u32,
    pub no_count : u32,
    pub other_count : u32,
    pub yes_votes : Vec<String>,
    pub no_votes : Vec<String>,
    pub other_votes : Vec<String>,
}

/// Everything found on a bill detail page.
#[derive(Debug,Clone,Eq,PartialEq,Default)]
pub struct ParsedBillDetail {
    pub title : Option<String>,
    pub sponsors : Vec<ParsedSponsor>,
    pub actions : Vec<ParsedAction>,
    pub versions : Vec<ParsedLink>,
    pub documents : Vec<ParsedLink>,
    pub votes : Vec<ParsedVote>,
}

/// A legislator as found on a member list.
#[derive(Debug,Clone,Eq,PartialEq,Default)]
pub struct ParsedLegislator {
    pub full_name : String,
    pub first_name : Option<String>,
    pub middle_name : Option<String>,
    pub last_name : Option<String>,
    pub district : String,
    pub party : Option<String>,
    /// Link to the legislator's own page, if any. May be relative.
    pub href : Option<String>,
}

pub trait StateAdapter {
    /// Two letter abbreviation, lower case. Used for output directories and the `state` field.
    fn state(&self) -> &'static str;

    /// The first year `--all` should cover.
    fn earliest_year(&self) -> i32;

    fn metadata(&self) -> StateMetadata;

    fn session_for_year(&self,year:i32) -> Result<SessionUnit,UnsupportedYearError>;

    /// Requests that must be made, in order, before the listing for `unit` is available.
    fn session_setup(&self,_unit:&ScrapeUnit) -> Vec<PageRequest> { vec![] }

    /// The first (often only) page listing the bills for a unit.
    fn bill_listing(&self,unit:&ScrapeUnit) -> PageRequest;

    /// If the listing is paginated, the request for the page after `page_number` (1-based), if there is one.
    fn next_listing_page(&self,_unit:&ScrapeUnit,_listing:&Page,_page_number:u32) -> Result<Option<PageRequest>,ParseError> { Ok(None) }

    fn extract_bill_ids(&self,unit:&ScrapeUnit,listing:&Page) -> Result<Vec<String>,ParseError>;

    fn bill_detail(&self,unit:&ScrapeUnit,bill_id:&str) -> PageRequest;

    fn extract_bill_detail(&self,unit:&ScrapeUnit,detail:&Page) -> Result<ParsedBillDetail,ParseError>;

    /// Whether the member list can say who sat in `unit`'s session. Some sites only list the sitting legislature.
    fn legislators_available(&self,_unit:&ScrapeUnit) -> Result<(),UnsupportedYearError> { Ok(()) }

    fn legislator_listing(&self,unit:&ScrapeUnit) -> PageRequest;

    fn extract_legislators(&self,unit:&ScrapeUnit,page:&Page) -> Result<Vec<ParsedLegislator>,ParseError>;
}
