//! Bills and everything owned by a bill.

use std::fmt;
use serde::{Serialize,Deserialize};
use crate::chamber::{Actor, Chamber};
use crate::dates::CanonicalDate;

/// The `type` discriminator carried by every emitted document.
#[derive(Serialize,Deserialize,Debug,Clone,Copy,Eq,PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum DocType {
    Bill,
    Legislator,
    Metadata,
}

/// Where a record was scraped from.
#[derive(Serialize,Deserialize,Debug,Clone,Eq,PartialEq)]
pub struct Source {
    pub url : String,
}

/// The identity of a bill. Unique within the output of a single run.
#[derive(Debug,Clone,Eq,PartialEq,Hash,Ord,PartialOrd)]
pub struct BillKey {
    pub session : String,
    pub chamber : Chamber,
    pub bill_id : String,
}

impl fmt::Display for BillKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.session, self.chamber, self.bill_id)
    }
}

#[derive(Serialize,Deserialize,Debug,Clone,Copy,Eq,PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum SponsorType {
    Primary,
    Cosponsor,
}

#[derive(Serialize,Deserialize,Debug,Clone,Eq,PartialEq)]
pub struct Sponsorship {
    #[serde(rename = "type")]
    pub sponsor_type : SponsorType,
    pub name : String,
    /// The chamber the sponsor sits in, if the source says.
    #[serde(default,skip_serializing_if = "Option::is_none")]
    pub chamber : Option<Chamber>,
    #[serde(default)]
    pub leg_id : Option<String>,
}

/// A text revision of a bill.
#[derive(Serialize,Deserialize,Debug,Clone,Eq,PartialEq)]
pub struct Version {
    pub name : String,
    /// Always absolute.
    pub url : String,
}

/// Anything else linked from a bill: fiscal notes, statements, journal pages.
#[derive(Serialize,Deserialize,Debug,Clone,Eq,PartialEq)]
pub struct Document {
    pub name : String,
    /// Always absolute.
    pub url : String,
}

#[derive(Serialize,Deserialize,Debug,Clone,Eq,PartialEq)]
pub struct Action {
    pub actor : Actor,
    #[serde(rename = "action")]
    pub text : String,
    /// Only missing if no date at all had been seen before this action.
    #[serde(default)]
    pub date : Option<CanonicalDate>,
}

/// A legislator named in a roll call.
#[derive(Serialize,Deserialize,Debug,Clone,Eq,PartialEq)]
pub struct Voter {
    pub name : String,
    #[serde(default)]
    pub leg_id : Option<String>,
}

impl Voter {
    pub fn new(name:&str) -> Self { Voter{ name: name.to_string(), leg_id: None } }
}

#[derive(Serialize,Deserialize,Debug,Clone,Eq,PartialEq)]
pub struct Vote {
    pub chamber : Chamber,
    #[serde(default)]
    pub date : Option<CanonicalDate>,
    pub motion : String,
    pub passed : bool,
    pub yes_count : u32,
    pub no_count : u32,
    pub other_count : u32,
    #[serde(default)]
    pub yes_votes : Vec<Voter>,
    #[serde(default)]
    pub no_votes : Vec<Voter>,
    #[serde(default)]
    pub other_votes : Vec<Voter>,
}

/// A bill or resolution, normalized. Built once by [crate::builder::RecordBuilder] and not
/// changed after it is handed to a sink.
#[derive(Serialize,Deserialize,Debug,Clone,Eq,PartialEq)]
pub struct Bill {
    #[serde(rename = "type")]
    pub doc_type : DocType,
    pub state : String,
    pub session : String,
    pub chamber : Chamber,
    pub bill_id : String,
    pub title : String,
    pub sponsors : Vec<Sponsorship>,
    pub versions : Vec<Version>,
    #[serde(default)]
    pub documents : Vec<Document>,
    pub actions : Vec<Action>,
    pub votes : Vec<Vote>,
    #[serde(default)]
    pub sources : Vec<Source>,
}

impl Bill {
    pub fn new(state:&str,session:&str,chamber:Chamber,bill_id:&str,title:&str) -> Self {
        Bill {
            doc_type: DocType::Bill,
            state: state.to_string(),
            session: session.to_string(),
            chamber,
            bill_id: bill_id.to_string(),
            title: title.to_string(),
            sponsors: vec![],
            versions: vec![],
            documents: vec![],
            actions: vec![],
            votes: vec![],
            sources: vec![],
        }
    }

    pub fn key(&self) -> BillKey {
        BillKey{ session: self.session.clone(), chamber: self.chamber, bill_id: self.bill_id.clone() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bill_json_field_names() {
        let mut bill = Bill::new("wi","2007",Chamber::Upper,"SB1","An Act");
        bill.actions.push(Action{ actor: Actor::Chamber(Chamber::Upper), text: "Introduced".to_string(), date: CanonicalDate::from_ymd(2007,3,10) });
        bill.sponsors.push(Sponsorship{ sponsor_type: SponsorType::Primary, name: "Smith".to_string(), chamber: None, leg_id: None });
        let json = serde_json::to_value(&bill).unwrap();
        assert_eq!("bill",json["type"]);
        assert_eq!("upper",json["chamber"]);
        assert_eq!("Introduced",json["actions"][0]["action"]);
        assert_eq!("03/10/2007",json["actions"][0]["date"]);
        assert_eq!("primary",json["sponsors"][0]["type"]);
        assert!(json["sponsors"][0]["leg_id"].is_null());
        assert_eq!(0,json["documents"].as_array().unwrap().len());
        assert_eq!("2007:upper:SB1",bill.key().to_string());
    }
}
