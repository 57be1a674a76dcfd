//! Flat CSV tables, one file per kind of row, for loading into spreadsheets or SQL.
//!
//! Every table is held in memory grouped by the identity key of the record that produced
//! the rows, so writing a record again replaces its rows. Tables are loaded from disk when
//! the sink is opened, and changed tables are rewritten at the end of every unit.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use anyhow::{anyhow, Context};
use itertools::Itertools;
use serde::de::DeserializeOwned;
use serde::{Serialize,Deserialize};
use tracing::{debug, info};
use crate::bill::{Bill, SponsorType};
use crate::chamber::{Actor, Chamber};
use crate::dates::CanonicalDate;
use crate::legislator::Legislator;
use crate::metadata::StateMetadata;
use crate::sink::{persist_atomically, write_metadata_file, Sink};

/// (session, chamber, bill_id or district)
type RowKey = (String,Chamber,String);

trait Row : Serialize+DeserializeOwned {
    const FILE_NAME : &'static str;
    /// Must match the serialized field names, in order.
    const HEADERS : &'static [&'static str];
}

#[derive(Serialize,Deserialize,Debug,Clone,Eq,PartialEq)]
struct BillRow {
    state : String,
    chamber : Chamber,
    session : String,
    bill_id : String,
    title : String,
}

impl Row for BillRow {
    const FILE_NAME : &'static str = "legislation.csv";
    const HEADERS : &'static [&'static str] = &["state","chamber","session","bill_id","title"];
}

#[derive(Serialize,Deserialize,Debug,Clone,Eq,PartialEq)]
struct VersionRow {
    state : String,
    chamber : Chamber,
    session : String,
    bill_id : String,
    name : String,
    url : String,
}

impl Row for VersionRow {
    const FILE_NAME : &'static str = "bill_versions.csv";
    const HEADERS : &'static [&'static str] = &["state","chamber","session","bill_id","name","url"];
}

#[derive(Serialize,Deserialize,Debug,Clone,Eq,PartialEq)]
struct DocumentRow {
    state : String,
    chamber : Chamber,
    session : String,
    bill_id : String,
    name : String,
    url : String,
}

impl Row for DocumentRow {
    const FILE_NAME : &'static str = "bill_documents.csv";
    const HEADERS : &'static [&'static str] = &["state","chamber","session","bill_id","name","url"];
}

#[derive(Serialize,Deserialize,Debug,Clone,Eq,PartialEq)]
struct ActionRow {
    state : String,
    chamber : Chamber,
    session : String,
    bill_id : String,
    actor : Actor,
    action : String,
    date : Option<CanonicalDate>,
}

impl Row for ActionRow {
    const FILE_NAME : &'static str = "actions.csv";
    const HEADERS : &'static [&'static str] = &["state","chamber","session","bill_id","actor","action","date"];
}

#[derive(Serialize,Deserialize,Debug,Clone,Eq,PartialEq)]
struct SponsorshipRow {
    state : String,
    chamber : Chamber,
    session : String,
    bill_id : String,
    #[serde(rename = "type")]
    sponsor_type : SponsorType,
    name : String,
    sponsor_chamber : Option<Chamber>,
    leg_id : Option<String>,
}

impl Row for SponsorshipRow {
    const FILE_NAME : &'static str = "sponsorships.csv";
    const HEADERS : &'static [&'static str] = &["state","chamber","session","bill_id","type","name","sponsor_chamber","leg_id"];
}

/// Voter lists are flattened to `;` separated names.
#[derive(Serialize,Deserialize,Debug,Clone,Eq,PartialEq)]
struct VoteRow {
    state : String,
    chamber : Chamber,
    session : String,
    bill_id : String,
    vote_chamber : Chamber,
    date : Option<CanonicalDate>,
    motion : String,
    passed : bool,
    yes_count : u32,
    no_count : u32,
    other_count : u32,
    yes_votes : String,
    no_votes : String,
    other_votes : String,
}

impl Row for VoteRow {
    const FILE_NAME : &'static str = "votes.csv";
    const HEADERS : &'static [&'static str] = &["state","chamber","session","bill_id","vote_chamber","date","motion","passed","yes_count","no_count","other_count","yes_votes","no_votes","other_votes"];
}

#[derive(Serialize,Deserialize,Debug,Clone,Eq,PartialEq)]
struct LegislatorRow {
    state : String,
    chamber : Chamber,
    session : String,
    district : String,
    leg_id : String,
    full_name : String,
    first_name : String,
    middle_name : Option<String>,
    last_name : String,
    suffixes : Option<String>,
    party : String,
}

impl Row for LegislatorRow {
    const FILE_NAME : &'static str = "legislators.csv";
    const HEADERS : &'static [&'static str] = &["state","chamber","session","district","leg_id","full_name","first_name","middle_name","last_name","suffixes","party"];
}

/// All rows of one file, grouped by the identity key of the record they came from.
struct Table<R:Row> {
    rows : BTreeMap<RowKey,Vec<R>>,
    /// Changed since last saved.
    dirty : bool,
}

impl <R:Row> Table<R> {
    fn load(dir:&Path,key_of:impl Fn(&R)->RowKey) -> anyhow::Result<Self> {
        let path = dir.join(R::FILE_NAME);
        let mut rows : BTreeMap<RowKey,Vec<R>> = BTreeMap::new();
        if path.exists() {
            let mut reader = csv::Reader::from_path(&path).with_context(||format!("Could not open {}",path.display()))?;
            for row in reader.deserialize::<R>() {
                let row = row.with_context(||format!("Bad row in {}",path.display()))?;
                rows.entry(key_of(&row)).or_default().push(row);
            }
            debug!("Loaded {} groups from {}",rows.len(),path.display());
        }
        Ok(Table{ rows, dirty: false })
    }

    fn replace(&mut self,key:RowKey,rows:Vec<R>) {
        self.rows.insert(key,rows);
        self.dirty = true;
    }

    fn save(&mut self,dir:&Path) -> anyhow::Result<()> {
        if !self.dirty { return Ok(()); }
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(vec![]);
        writer.write_record(R::HEADERS)?;
        for row in self.rows.values().flatten() {
            writer.serialize(row)?;
        }
        let bytes = writer.into_inner().map_err(|e|anyhow!("Could not serialize {} : {}",R::FILE_NAME,e))?;
        persist_atomically(&dir.join(R::FILE_NAME),&bytes)?;
        self.dirty = false;
        Ok(())
    }

    fn len(&self) -> usize { self.rows.values().map(|v|v.len()).sum() }
}

pub struct CsvSink {
    dir : PathBuf,
    bills : Table<BillRow>,
    versions : Table<VersionRow>,
    documents : Table<DocumentRow>,
    actions : Table<ActionRow>,
    sponsorships : Table<SponsorshipRow>,
    votes : Table<VoteRow>,
    legislators : Table<LegislatorRow>,
}

impl CsvSink {
    pub fn open(dir:&Path) -> anyhow::Result<CsvSink> {
        std::fs::create_dir_all(dir).with_context(||format!("Could not create {}",dir.display()))?;
        Ok(CsvSink {
            dir: dir.to_path_buf(),
            bills: Table::load(dir,|r:&BillRow|(r.session.clone(),r.chamber,r.bill_id.clone()))?,
            versions: Table::load(dir,|r:&VersionRow|(r.session.clone(),r.chamber,r.bill_id.clone()))?,
            documents: Table::load(dir,|r:&DocumentRow|(r.session.clone(),r.chamber,r.bill_id.clone()))?,
            actions: Table::load(dir,|r:&ActionRow|(r.session.clone(),r.chamber,r.bill_id.clone()))?,
            sponsorships: Table::load(dir,|r:&SponsorshipRow|(r.session.clone(),r.chamber,r.bill_id.clone()))?,
            votes: Table::load(dir,|r:&VoteRow|(r.session.clone(),r.chamber,r.bill_id.clone()))?,
            legislators: Table::load(dir,|r:&LegislatorRow|(r.session.clone(),r.chamber,r.district.clone()))?,
        })
    }
}

fn voter_names(voters:&[crate::bill::Voter]) -> String {
    voters.iter().map(|v|v.name.as_str()).join("; ")
}

impl Sink for CsvSink {
    fn write_bill(&mut self,bill:&Bill) -> anyhow::Result<()> {
        let key : RowKey = (bill.session.clone(),bill.chamber,bill.bill_id.clone());
        let state = || bill.state.clone();
        let session = || bill.session.clone();
        let bill_id = || bill.bill_id.clone();
        self.bills.replace(key.clone(),vec![BillRow{ state: state(), chamber: bill.chamber, session: session(), bill_id: bill_id(), title: bill.title.clone() }]);
        self.versions.replace(key.clone(),bill.versions.iter().map(|v|VersionRow{
            state: state(), chamber: bill.chamber, session: session(), bill_id: bill_id(), name: v.name.clone(), url: v.url.clone()
        }).collect());
        self.documents.replace(key.clone(),bill.documents.iter().map(|d|DocumentRow{
            state: state(), chamber: bill.chamber, session: session(), bill_id: bill_id(), name: d.name.clone(), url: d.url.clone()
        }).collect());
        self.actions.replace(key.clone(),bill.actions.iter().map(|a|ActionRow{
            state: state(), chamber: bill.chamber, session: session(), bill_id: bill_id(), actor: a.actor.clone(), action: a.text.clone(), date: a.date
        }).collect());
        self.sponsorships.replace(key.clone(),bill.sponsors.iter().map(|s|SponsorshipRow{
            state: state(), chamber: bill.chamber, session: session(), bill_id: bill_id(), sponsor_type: s.sponsor_type, name: s.name.clone(), sponsor_chamber: s.chamber, leg_id: s.leg_id.clone()
        }).collect());
        self.votes.replace(key,bill.votes.iter().map(|v|VoteRow{
            state: state(), chamber: bill.chamber, session: session(), bill_id: bill_id(), vote_chamber: v.chamber, date: v.date, motion: v.motion.clone(), passed: v.passed,
            yes_count: v.yes_count, no_count: v.no_count, other_count: v.other_count,
            yes_votes: voter_names(&v.yes_votes), no_votes: voter_names(&v.no_votes), other_votes: voter_names(&v.other_votes),
        }).collect());
        Ok(())
    }

    fn write_legislator(&mut self,legislator:&Legislator) -> anyhow::Result<()> {
        let key : RowKey = (legislator.session.clone(),legislator.chamber,legislator.district.clone());
        self.legislators.replace(key,vec![LegislatorRow{
            state: legislator.state.clone(),
            chamber: legislator.chamber,
            session: legislator.session.clone(),
            district: legislator.district.clone(),
            leg_id: legislator.leg_id.clone(),
            full_name: legislator.full_name.clone(),
            first_name: legislator.first_name.clone(),
            middle_name: legislator.middle_name.clone(),
            last_name: legislator.last_name.clone(),
            suffixes: legislator.suffixes.clone(),
            party: legislator.party.clone(),
        }]);
        Ok(())
    }

    fn write_metadata(&mut self,metadata:&StateMetadata) -> anyhow::Result<()> {
        write_metadata_file(&self.dir,metadata)
    }

    fn flush(&mut self) -> anyhow::Result<()> {
        self.bills.save(&self.dir)?;
        self.versions.save(&self.dir)?;
        self.documents.save(&self.dir)?;
        self.actions.save(&self.dir)?;
        self.sponsorships.save(&self.dir)?;
        self.votes.save(&self.dir)?;
        self.legislators.save(&self.dir)
    }

    fn finish(&mut self) -> anyhow::Result<()> {
        self.flush()?;
        info!("Wrote {} bills and {} legislators to {}",self.bills.len(),self.legislators.len(),self.dir.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bill::{Action, Document, Sponsorship, Vote, Voter};
    use crate::builder::RecordBuilder;
    use crate::adapter::ParsedLegislator;

    fn bill(title:&str,actions:usize) -> Bill {
        let mut bill = Bill::new("nj","2006-2007",Chamber::Lower,"A100",title);
        for i in 0..actions {
            bill.actions.push(Action{ actor: Actor::Chamber(Chamber::Lower), text: format!("Action {}",i), date: CanonicalDate::from_ymd(2006,1,10+i as u32) });
        }
        bill.sponsors.push(Sponsorship{ sponsor_type: SponsorType::Primary, name: "Smith, John".to_string(), chamber: Some(Chamber::Lower), leg_id: None });
        bill.documents.push(Document{ name: "Statement".to_string(), url: "http://www.njleg.state.nj.us/2006/Bills/A0500/100_S1.HTM".to_string() });
        bill.votes.push(Vote{ chamber: Chamber::Lower, date: None, motion: "Passed, \"as amended\"".to_string(), passed: true, yes_count: 2, no_count: 0, other_count: 0,
            yes_votes: vec![Voter::new("Smith"),Voter::new("Jones")], no_votes: vec![], other_votes: vec![] });
        bill
    }

    fn count_rows(dir:&Path,file:&str) -> usize {
        csv::Reader::from_path(dir.join(file)).unwrap().records().count()
    }

    #[test]
    fn test_rerun_replaces_rows() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut sink = CsvSink::open(dir.path()).unwrap();
            sink.write_bill(&bill("Old title",3)).unwrap();
            sink.finish().unwrap();
        }
        assert_eq!(3,count_rows(dir.path(),"actions.csv"));
        {
            let mut sink = CsvSink::open(dir.path()).unwrap();
            sink.write_bill(&bill("New title",2)).unwrap();
            sink.finish().unwrap();
        }
        assert_eq!(1,count_rows(dir.path(),"legislation.csv"));
        assert_eq!(2,count_rows(dir.path(),"actions.csv"));
        assert_eq!(1,count_rows(dir.path(),"sponsorships.csv"));
        assert_eq!(1,count_rows(dir.path(),"votes.csv"));
        assert_eq!(1,count_rows(dir.path(),"bill_documents.csv"));
        let mut reader = csv::Reader::from_path(dir.path().join("legislation.csv")).unwrap();
        let rows : Vec<BillRow> = reader.deserialize().map(|r|r.unwrap()).collect();
        assert_eq!("New title",rows[0].title);
    }

    #[test]
    fn test_headers_and_values() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = CsvSink::open(dir.path()).unwrap();
        sink.write_bill(&bill("Title",1)).unwrap();
        let legislator = RecordBuilder::new("nj").build_legislator(ParsedLegislator{ full_name: "Smith, John".to_string(), district: "7".to_string(), party: Some("D".to_string()), ..Default::default() },"2006-2007",Chamber::Lower,"http://www.njleg.state.nj.us/members/roster.asp");
        sink.write_legislator(&legislator).unwrap();
        sink.finish().unwrap();
        let actions = std::fs::read_to_string(dir.path().join("actions.csv")).unwrap();
        assert_eq!("state,chamber,session,bill_id,actor,action,date\nnj,lower,2006-2007,A100,lower,Action 0,01/10/2006\n",actions);
        let mut reader = csv::Reader::from_path(dir.path().join("votes.csv")).unwrap();
        let votes : Vec<VoteRow> = reader.deserialize().map(|r|r.unwrap()).collect();
        assert_eq!("Smith; Jones",votes[0].yes_votes);
        assert_eq!("Passed, \"as amended\"",votes[0].motion);
        assert_eq!(None,votes[0].date);
        let mut reader = csv::Reader::from_path(dir.path().join("legislators.csv")).unwrap();
        let legislators : Vec<LegislatorRow> = reader.deserialize().map(|r|r.unwrap()).collect();
        assert_eq!("NJ:2006-2007:lower:7",legislators[0].leg_id);
        assert_eq!("Democratic",legislators[0].party);
    }

    #[test]
    fn test_flushed_rows_survive_without_finish() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut sink = CsvSink::open(dir.path()).unwrap();
            sink.write_bill(&bill("Title",2)).unwrap();
            sink.flush().unwrap();
            let mut second = bill("Second",1);
            second.bill_id = "A101".to_string();
            sink.write_bill(&second).unwrap();
            // dropped without finish, as when a run is killed mid unit
        }
        assert_eq!(1,count_rows(dir.path(),"legislation.csv"));
        assert_eq!(2,count_rows(dir.path(),"actions.csv"));
        assert_eq!(1,count_rows(dir.path(),"bill_documents.csv"));
        // untouched tables are not written
        assert!(!dir.path().join("legislators.csv").exists());
    }
}
