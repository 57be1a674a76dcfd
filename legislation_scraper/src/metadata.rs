//! Static description of a state's legislature, written once per run.

use std::collections::BTreeMap;
use serde::{Serialize,Deserialize};
use crate::bill::DocType;

#[derive(Serialize,Deserialize,Debug,Clone,Eq,PartialEq)]
pub struct SessionDetails {
    pub years : Vec<i32>,
    #[serde(default)]
    pub sub_sessions : Vec<String>,
}

#[derive(Serialize,Deserialize,Debug,Clone,Eq,PartialEq)]
pub struct StateMetadata {
    #[serde(rename = "type")]
    pub doc_type : DocType,
    pub state : String,
    pub state_name : String,
    pub legislature_name : String,
    pub upper_chamber_name : String,
    pub lower_chamber_name : String,
    pub upper_title : String,
    pub lower_title : String,
    /// Term lengths, in years.
    pub upper_term : u32,
    pub lower_term : u32,
    pub sessions : Vec<String>,
    pub session_details : BTreeMap<String,SessionDetails>,
}
