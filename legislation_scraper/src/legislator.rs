//! Legislators serving in a given session.

use std::fmt;
use serde::{Serialize,Deserialize};
use once_cell::sync::Lazy;
use regex::Regex;
use crate::bill::{DocType, Source};
use crate::chamber::Chamber;

/// The identity of a legislator within a state.
#[derive(Debug,Clone,Eq,PartialEq,Hash,Ord,PartialOrd)]
pub struct LegislatorKey {
    pub session : String,
    pub chamber : Chamber,
    pub district : String,
}

impl fmt::Display for LegislatorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.session, self.chamber, self.district)
    }
}

/// Information about a legislator in one session.
/// Not all fields are known perfectly for each person.
#[derive(Serialize,Deserialize,Debug,Clone,Eq,PartialEq)]
pub struct Legislator {
    #[serde(rename = "type")]
    pub doc_type : DocType,
    pub state : String,
    pub leg_id : String,
    pub session : String,
    pub chamber : Chamber,
    pub district : String,
    pub full_name : String,
    pub first_name : String,
    pub last_name : String,
    #[serde(default)]
    pub middle_name : Option<String>,
    #[serde(default,skip_serializing_if = "Option::is_none")]
    pub suffixes : Option<String>,
    pub party : String,
    #[serde(default)]
    pub sources : Vec<Source>,
}

impl Legislator {
    pub fn key(&self) -> LegislatorKey {
        LegislatorKey{ session: self.session.clone(), chamber: self.chamber, district: self.district.clone() }
    }
}

/// A personal name split into its parts.
#[derive(Debug,Clone,Eq,PartialEq,Default)]
pub struct NameParts {
    pub first : String,
    pub middle : Option<String>,
    pub last : String,
    pub suffixes : Option<String>,
}

static SUFFIX : Lazy<Regex> = Lazy::new(||Regex::new(r"(?i)^(jr|sr|ii|iii|iv|v|esq|md|phd)\.?$").unwrap());

/// Split a full name, written either `Last, First Middle` or `First Middle Last`,
/// with optional generational suffixes (`Jr.`, `III`) at the end of either form.
pub fn split_name(full_name:&str) -> NameParts {
    let full_name = full_name.split_whitespace().collect::<Vec<_>>().join(" ");
    let (last, given) = if let Some((last,given)) = full_name.split_once(',') {
        (Some(last.trim().to_string()),given.trim().to_string())
    } else { (None,full_name.clone()) };
    let mut words : Vec<&str> = given.split(' ').filter(|w|!w.is_empty()).collect();
    let mut suffixes = Vec::new();
    while words.len()>1 && SUFFIX.is_match(words[words.len()-1].trim_end_matches(',')) {
        suffixes.insert(0,words.pop().unwrap_or_default().trim_end_matches(','));
    }
    let last = match last {
        Some(last) => last,
        None => if words.len()>1 { words.pop().unwrap_or_default().to_string() } else { String::new() },
    };
    let first = if words.is_empty() { String::new() } else { words.remove(0).to_string() };
    let middle = if words.is_empty() { None } else { Some(words.join(" ")) };
    let (first,last) = if first.is_empty() || last.is_empty() { // single word name
        (first.clone(), if last.is_empty() { first } else { last })
    } else { (first,last) };
    NameParts { first, middle, last, suffixes: if suffixes.is_empty() { None } else { Some(suffixes.join(" ")) } }
}
