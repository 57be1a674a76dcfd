//! Wisconsin.
//!
//! Bills are listed on the proposals index at docs.legis.wisconsin.gov. The history of each
//! bill comes from the legacy plain text history page, a `<pre>` block that looks like
//!
//! ```text
//! 2007 SENATE BILL 1
//!  An Act to create 20.855 (4) (t) of the statutes; relating to: providing
//!  property tax relief to homeowners.
//! 2007
//! 01-10.  S.  Introduced by Senators Robson, Plale and Wirch; cosponsored by ...
//! 03-13.  S.  Read a third time and passed, Ayes 18, Noes 15 ............. 102
//! ```
//!
//! and is parsed by [HistoryParser].

use chrono::Datelike;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use tracing::debug;
use crate::adapter::{ParsedAction, ParsedBillDetail, ParsedLegislator, ParsedSponsor, ParsedLink, ParsedVote, ScrapeUnit, SessionUnit, StateAdapter};
use crate::bill::SponsorType;
use crate::chamber::{Actor, Chamber};
use crate::error::{ParseError, UnsupportedYearError};
use crate::fetch::{Page, PageRequest};
use crate::metadata::{SessionDetails, StateMetadata};
use crate::parse_util::{element_text, normalize_whitespace, root, selector};

const PROPOSALS_URL : &'static str = "http://docs.legis.wisconsin.gov";
const HISTORY_URL : &'static str = "http://www.legis.state.wi.us";
const MEMBERS_URL : &'static str = "http://legis.wi.gov/w3asp/contact/legislatorslist.aspx";

/// The first and last biennial sessions the history pages cover.
const FIRST_SESSION : i32 = 1999;
const LAST_SESSION : i32 = 2011;

pub struct Wisconsin {}

fn chamber_slug(chamber:Chamber) -> &'static str {
    match chamber {
        Chamber::Upper => "sen",
        Chamber::Lower => "asm",
        Chamber::Joint => "joint",
    }
}

fn chamber_from_code(code:&str) -> Chamber {
    if code=="S" { Chamber::Upper } else { Chamber::Lower }
}

static YEAR_LINE : Lazy<Regex> = Lazy::new(||Regex::new(r"^\s*(\d{4})\s?$").unwrap());
static DATED_LINE : Lazy<Regex> = Lazy::new(||Regex::new(r"^\s*(\d{2})-(\d{2})\.\s+([AS])\.(?:\s+(.*))?$").unwrap());

/// Remove the journal page reference (` ......... 220`) that ends many history lines.
fn strip_bookkeeping(line:&str) -> &str {
    let line = line.trim();
    if line.starts_with("..") { return ""; }
    match line.find(" ..") {
        Some(pos) => line[..pos].trim_end(),
        None => line,
    }
}

#[derive(Debug,Clone,Copy,Eq,PartialEq)]
enum HistoryState {
    AwaitingTitle,
    Accumulating,
}

/// An action whose text may still be continued by following lines.
struct PendingAction {
    chamber : Chamber,
    date : String,
    text : String,
}

/// Turns the lines of a history page into a title and a sequence of actions.
///
/// The first non-empty line starts the title. A bare year sets the year used by following
/// dated lines. A dated line ends whatever is being accumulated and starts a new action.
/// Anything else continues the current block: the title until the first action, and the
/// most recent action after that.
pub struct HistoryParser {
    state : HistoryState,
    year : i32,
    title : Vec<String>,
    pending : Option<PendingAction>,
    actions : Vec<ParsedAction>,
}

impl HistoryParser {
    /// `year` is the year in effect until the history says otherwise.
    pub fn new(year:i32) -> Self {
        HistoryParser{ state: HistoryState::AwaitingTitle, year, title: vec![], pending: None, actions: vec![] }
    }

    pub fn line(&mut self,line:&str) {
        if line.trim().is_empty() { return; }
        match self.state {
            HistoryState::AwaitingTitle => {
                self.title.push(line.trim().to_string());
                self.state = HistoryState::Accumulating;
            }
            HistoryState::Accumulating => {
                if let Some(cap) = YEAR_LINE.captures(line) {
                    if let Ok(year) = cap[1].parse::<i32>() { self.year = year; }
                } else if let Some(cap) = DATED_LINE.captures(line) {
                    self.flush();
                    self.pending = Some(PendingAction{
                        chamber: chamber_from_code(&cap[3]),
                        date: format!("{}-{}-{}",&cap[1],&cap[2],self.year),
                        text: cap.get(4).map(|m|strip_bookkeeping(m.as_str()).to_string()).unwrap_or_default(),
                    });
                } else {
                    let text = strip_bookkeeping(line);
                    if text.is_empty() { return; }
                    match &mut self.pending {
                        Some(pending) => { pending.text.push(' '); pending.text.push_str(text); }
                        None => self.title.push(text.to_string()),
                    }
                }
            }
        }
    }

    fn flush(&mut self) {
        if let Some(pending) = self.pending.take() {
            let text = normalize_whitespace(&pending.text);
            if !text.is_empty() {
                self.actions.push(ParsedAction{ actor: Actor::Chamber(pending.chamber), text, date: Some(pending.date) });
            }
        }
    }

    /// Flush any action still being accumulated and return (title, actions).
    pub fn finish(mut self) -> (Option<String>,Vec<ParsedAction>) {
        self.flush();
        let title = normalize_whitespace(&self.title.join(" "));
        (if title.is_empty() { None } else { Some(title) },self.actions)
    }
}

static SPONSOR_SEPARATOR : Lazy<Regex> = Lazy::new(||Regex::new(r"\sand\s|,|;").unwrap());
static SPONSOR_MARKER : Lazy<Regex> = Lazy::new(||Regex::new(r"(Introduced|cosponsored) by\s+(.*)$").unwrap());
static SPONSOR_TITLE : Lazy<Regex> = Lazy::new(||Regex::new(r"^(Senators?|Representatives?)\s+(.*)$").unwrap());

/// Sponsors named in an `Introduced by Senators A, B and C; cosponsored by Representatives D and E.` action.
fn parse_sponsors(text:&str) -> Vec<ParsedSponsor> {
    let mut res = vec![];
    let mut sponsor_type = None;
    let mut chamber = None;
    for part in SPONSOR_SEPARATOR.split(text) {
        let mut name = part.trim().trim_end_matches('.').trim();
        if let Some(cap) = SPONSOR_MARKER.captures(name) {
            sponsor_type = Some(if cap.get(1).map(|m|m.as_str())==Some("Introduced") { SponsorType::Primary } else { SponsorType::Cosponsor });
            chamber = None;
            name = cap.get(2).map(|m|m.as_str()).unwrap_or("");
        } else if sponsor_type.is_none() { continue; }
        if let Some(cap) = SPONSOR_TITLE.captures(name) {
            chamber = Some(if cap[1].starts_with("Senator") { Chamber::Upper } else { Chamber::Lower });
            name = cap.get(2).map(|m|m.as_str()).unwrap_or("");
        }
        let name = name.trim();
        if name.is_empty() || name.starts_with("by request") { continue; }
        res.push(ParsedSponsor{ name: name.to_string(), sponsor_type, chamber });
    }
    res
}

static VOTE_COUNTS : Lazy<Regex> = Lazy::new(||Regex::new(r"Ayes,?\s?(\d+)[,;]\s+N(?:oes|ays),?\s?(\d+)").unwrap());

/// A roll call recorded in an action's text.
fn parse_vote(action:&ParsedAction) -> Option<ParsedVote> {
    let cap = VOTE_COUNTS.captures(&action.text)?;
    let chamber = match &action.actor { Actor::Chamber(chamber) => Some(*chamber), Actor::Other(_) => None };
    Some(ParsedVote{
        chamber,
        date: action.date.clone(),
        motion: action.text.clone(),
        yes_count: cap[1].parse().ok()?,
        no_count: cap[2].parse().ok()?,
        ..Default::default()
    })
}

/// Whether the session starting in `first_year` is the one sitting in `current_year`.
fn member_list_covers(first_year:i32,current_year:i32) -> bool {
    current_year==first_year || current_year==first_year+1
}

static MEMBER_NAME : Lazy<Regex> = Lazy::new(||Regex::new(r"([\w\-,\s\.]+)\s+\((\w)\)").unwrap());

impl StateAdapter for Wisconsin {
    fn state(&self) -> &'static str { "wi" }

    fn earliest_year(&self) -> i32 { FIRST_SESSION }

    fn metadata(&self) -> StateMetadata {
        let sessions : Vec<i32> = (FIRST_SESSION..=LAST_SESSION).step_by(2).collect();
        StateMetadata {
            doc_type: crate::bill::DocType::Metadata,
            state: self.state().to_string(),
            state_name: "Wisconsin".to_string(),
            legislature_name: "Wisconsin State Legislature".to_string(),
            upper_chamber_name: "Senate".to_string(),
            lower_chamber_name: "Assembly".to_string(),
            upper_title: "Senator".to_string(),
            lower_title: "Representative".to_string(),
            upper_term: 4,
            lower_term: 2,
            sessions: sessions.iter().map(|y|y.to_string()).collect(),
            session_details: sessions.iter().map(|&y|(y.to_string(),SessionDetails{ years: vec![y,y+1], sub_sessions: vec![] })).collect(),
        }
    }

    /// Sessions are biennial, starting in odd years.
    fn session_for_year(&self,year:i32) -> Result<SessionUnit,UnsupportedYearError> {
        let first_year = if year%2==0 { year-1 } else { year };
        if first_year<FIRST_SESSION || first_year>LAST_SESSION {
            return Err(UnsupportedYearError{ state: self.state().to_string(), year });
        }
        Ok(SessionUnit{ session: first_year.to_string(), first_year, site_key: first_year.to_string() })
    }

    fn bill_listing(&self,unit:&ScrapeUnit) -> PageRequest {
        PageRequest::get(format!("{}/{}/proposals/reg/{}/bill",PROPOSALS_URL,unit.session.site_key,chamber_slug(unit.chamber)))
    }

    fn extract_bill_ids(&self,_unit:&ScrapeUnit,listing:&Page) -> Result<Vec<String>,ParseError> {
        let html = Html::parse_document(&listing.body);
        let list = root(&html,"ul.infoLinks")?;
        let mut res = vec![];
        for a in list.select(&selector("li div.row-fluid div.span3 a")?) {
            if let Some(href) = a.value().attr("href") {
                if let Some(id) = href.trim().trim_end_matches('/').rsplit('/').next().filter(|s|!s.is_empty()) {
                    res.push(id.to_uppercase());
                }
            }
        }
        Ok(res)
    }

    fn bill_detail(&self,unit:&ScrapeUnit,bill_id:&str) -> PageRequest {
        PageRequest::get(format!("{}/{}/data/{}hst.html",HISTORY_URL,unit.session.site_key,bill_id))
    }

    fn extract_bill_detail(&self,unit:&ScrapeUnit,detail:&Page) -> Result<ParsedBillDetail,ParseError> {
        let html = Html::parse_document(&detail.body);
        let pre = root(&html,"pre")?;
        let text : String = pre.text().collect();
        let mut lines = text.lines().filter(|l|!l.trim().is_empty());
        // the first line repeats the bill id
        let heading = lines.next().map(normalize_whitespace).unwrap_or_default();
        let mut parser = HistoryParser::new(unit.session.first_year);
        for line in lines {
            parser.line(line);
        }
        let (title,actions) = parser.finish();
        let sponsors = actions.iter()
            .filter(|a|a.text.contains("Introduced by") || a.text.contains("cosponsored by"))
            .flat_map(|a|parse_sponsors(&a.text))
            .collect();
        let votes = actions.iter().filter_map(parse_vote).collect();
        let mut versions = vec![];
        for a in html.select(&selector("ul.docLinks a")?) {
            let name = element_text(&a);
            if let (false,Some(href)) = (name.is_empty(),a.value().attr("href")) {
                versions.push(ParsedLink{ name, href: href.to_string() });
            }
        }
        // Links in the history itself point at journal pages and amendments.
        let mut documents = vec![];
        for a in pre.select(&selector("a[href]")?) {
            let name = element_text(&a);
            if name.is_empty() || name==heading { continue; }
            if let Some(href) = a.value().attr("href") {
                documents.push(ParsedLink{ name, href: href.to_string() });
            }
        }
        debug!("Found {} actions in {}",actions.len(),detail.url);
        Ok(ParsedBillDetail{ title, sponsors, actions, versions, documents, votes })
    }

    /// The member list only covers the sitting legislature, so it says nothing about earlier sessions.
    fn legislators_available(&self,unit:&ScrapeUnit) -> Result<(),UnsupportedYearError> {
        if member_list_covers(unit.session.first_year,chrono::Local::now().year()) { Ok(()) }
        else { Err(UnsupportedYearError{ state: self.state().to_string(), year: unit.year }) }
    }

    fn legislator_listing(&self,unit:&ScrapeUnit) -> PageRequest {
        let house = if unit.chamber==Chamber::Upper { "senate" } else { "assembly" };
        PageRequest::get(format!("{}?house={}",MEMBERS_URL,house))
    }

    fn extract_legislators(&self,_unit:&ScrapeUnit,page:&Page) -> Result<Vec<ParsedLegislator>,ParseError> {
        let html = Html::parse_document(&page.body);
        let table = root(&html,"#ctl00_C_dgLegData")?;
        let td = selector("td")?;
        let link = selector("a[href]")?;
        let mut res = vec![];
        for row in table.select(&selector("tr")?) {
            let cells : Vec<_> = row.select(&td).collect();
            if cells.len()<3 { continue; }
            let Some(a) = cells[0].select(&link).next() else { continue; }; // vacant seats have no link
            let name_text = element_text(&cells[0]);
            let Some(cap) = MEMBER_NAME.captures(&name_text) else { continue; };
            let district = element_text(&cells[2]);
            let district = district.parse::<u32>().map(|d|d.to_string()).unwrap_or(district);
            res.push(ParsedLegislator{
                full_name: normalize_whitespace(&cap[1]),
                district,
                party: Some(cap[2].to_string()),
                href: a.value().attr("href").map(|s|s.to_string()),
                ..Default::default()
            });
        }
        Ok(res)
    }
}
