//! New Jersey.
//!
//! The bill search on njleg.state.nj.us keeps the selected session in the server side
//! session. A session is chosen by visiting the site (to get a cookie) and then posting
//! `DBNAME=LIS2006` (or similar) to `bills0001.asp`. After that, listing pages and bill
//! detail pages are form POSTs that implicitly refer to that session.
//!
//! Detail pages are old style tables in which the interesting parts are runs of text
//! separated by `<br>`. See [segments].

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html};
use tracing::debug;
use crate::adapter::{ParsedAction, ParsedBillDetail, ParsedLegislator, ParsedSponsor, ParsedLink, ScrapeUnit, SessionUnit, StateAdapter};
use crate::bill::{DocType, SponsorType};
use crate::chamber::{Actor, Chamber};
use crate::error::{ParseError, UnsupportedYearError};
use crate::fetch::{Page, PageRequest};
use crate::metadata::{SessionDetails, StateMetadata};
use crate::parse_util::{element_text, normalize_whitespace, root, selector};

const BASE_URL : &'static str = "http://www.njleg.state.nj.us";

/// The first years of the two year sessions the bill search has databases for.
const FIRST_SESSION : i32 = 1996;
const LAST_SESSION : i32 = 2008;

pub struct NewJersey {}

/// The name of the bill search database for the session starting in `first_year`.
fn database_name(first_year:i32) -> String {
    if first_year<2000 { format!("LIS{:02}{:02}",first_year%100,(first_year+1)%100) } else { format!("LIS{}",first_year) }
}

fn bill_chamber(bill_id:&str) -> Option<Chamber> {
    match bill_id.chars().next() {
        Some('A') => Some(Chamber::Lower),
        Some('S') => Some(Chamber::Upper),
        _ => None,
    }
}

static SEGMENT_BREAK : Lazy<Regex> = Lazy::new(||Regex::new(r"(?i)<br\s*/?>|</tr>|</td>").unwrap());
static LINK_START : Lazy<Regex> = Lazy::new(||Regex::new(r"(?i)<a\s").unwrap());

/// A run of markup between line breaks or table cells.
struct Segment {
    /// The text content, whitespace normalized.
    text : String,
    /// Text before the first link.
    before_link : String,
    /// Links in the segment, in order.
    hrefs : Vec<String>,
}

/// Split the markup inside `element` at every `<br>` and cell boundary.
fn segments(element:&ElementRef) -> Result<Vec<Segment>,ParseError> {
    let link = selector("a[href]")?;
    let mut res = vec![];
    for markup in SEGMENT_BREAK.split(&element.inner_html()) {
        let fragment = Html::parse_fragment(markup);
        let text = element_text(&fragment.root_element());
        if text.is_empty() { continue; }
        let hrefs : Vec<String> = fragment.select(&link).filter_map(|a|a.value().attr("href")).map(|s|s.trim().to_string()).collect();
        let before_link = match LINK_START.find(markup) {
            Some(m) => element_text(&Html::parse_fragment(&markup[..m.start()]).root_element()),
            None => text.clone(),
        };
        res.push(Segment{ text, before_link, hrefs });
    }
    Ok(res)
}

static BILL_ID : Lazy<Regex> = Lazy::new(||Regex::new(r"[AS][0-9]+").unwrap());
static PAGE_COUNT : Lazy<Regex> = Lazy::new(||Regex::new(r"Page\s+(\d+)\s+of\s+(\d+)").unwrap());
static SPONSOR_LINE : Lazy<Regex> = Lazy::new(||Regex::new(r"^(.+?)\s+as\s+(Primary Sponsor|Co-Sponsor)\b").unwrap());
static ACTION_LINE : Lazy<Regex> = Lazy::new(||Regex::new(r"^(\d{1,2}/\d{1,2}/\d{4})\s+(.+)$").unwrap());
static ROSTER_LINE : Lazy<Regex> = Lazy::new(||Regex::new(r"^(.+?)\s+\((\w)\)\s+District\s+(\d+)").unwrap());
/// Statements, fiscal estimates and notes, vetoes, technical reports and the published laws. Everything else is bill text.
static DOCUMENT_NAME : Lazy<Regex> = Lazy::new(||Regex::new(r"(?i)statement|fiscal|veto|technical report|\blaw\b").unwrap());

impl NewJersey {
    fn listing_page(&self,page_number:u32) -> PageRequest {
        let page_number = page_number.to_string();
        PageRequest::post(format!("{}/bills/BillsByNumber.asp",BASE_URL),&[("GoToPage",page_number.as_str())])
    }
}

impl StateAdapter for NewJersey {
    fn state(&self) -> &'static str { "nj" }

    fn earliest_year(&self) -> i32 { FIRST_SESSION }

    fn metadata(&self) -> StateMetadata {
        let first_years : Vec<i32> = (FIRST_SESSION..=LAST_SESSION).step_by(2).collect();
        let session_name = |y:i32| format!("{}-{}",y,y+1);
        StateMetadata {
            doc_type: DocType::Metadata,
            state: self.state().to_string(),
            state_name: "New Jersey".to_string(),
            legislature_name: "New Jersey Legislature".to_string(),
            upper_chamber_name: "Senate".to_string(),
            lower_chamber_name: "General Assembly".to_string(),
            upper_title: "Senator".to_string(),
            lower_title: "Assembly Member".to_string(),
            upper_term: 4,
            lower_term: 2,
            sessions: first_years.iter().map(|&y|session_name(y)).collect(),
            session_details: first_years.iter().map(|&y|(session_name(y),SessionDetails{ years: vec![y,y+1], sub_sessions: vec![] })).collect(),
        }
    }

    /// Sessions start in even years. An odd year belongs to the session that started the year before.
    fn session_for_year(&self,year:i32) -> Result<SessionUnit,UnsupportedYearError> {
        let first_year = if year%2==0 { year } else { year-1 };
        if first_year<FIRST_SESSION || first_year>LAST_SESSION {
            return Err(UnsupportedYearError{ state: self.state().to_string(), year });
        }
        Ok(SessionUnit{ session: format!("{}-{}",first_year,first_year+1), first_year, site_key: database_name(first_year) })
    }

    fn session_setup(&self,unit:&ScrapeUnit) -> Vec<PageRequest> {
        vec![
            PageRequest::get(format!("{}/",BASE_URL)),
            PageRequest::post(format!("{}/bills/bills0001.asp",BASE_URL),&[("DBNAME",unit.session.site_key.as_str())]),
        ]
    }

    fn bill_listing(&self,_unit:&ScrapeUnit) -> PageRequest { self.listing_page(1) }

    fn next_listing_page(&self,_unit:&ScrapeUnit,listing:&Page,page_number:u32) -> Result<Option<PageRequest>,ParseError> {
        let html = Html::parse_document(&listing.body);
        let text = element_text(&html.root_element());
        match PAGE_COUNT.captures(&text) {
            Some(cap) => {
                let pages : u32 = cap[2].parse().map_err(|_|ParseError::malformed(format!("page count {}",&cap[2])))?;
                Ok(if page_number<pages { Some(self.listing_page(page_number+1)) } else { None })
            }
            None => {
                debug!("No page count in {}, assuming a single page",listing.url);
                Ok(None)
            }
        }
    }

    fn extract_bill_ids(&self,unit:&ScrapeUnit,listing:&Page) -> Result<Vec<String>,ParseError> {
        let html = Html::parse_document(&listing.body);
        let table = root(&html,r#"table[height="780"]"#)?;
        Ok(table.select(&selector(r#"a[title="View Detail Bill Information"]"#)?)
            .filter_map(|a|BILL_ID.find(&element_text(&a)).map(|m|m.as_str().to_string()))
            .filter(|id|bill_chamber(id)==Some(unit.chamber))
            .collect())
    }

    fn bill_detail(&self,_unit:&ScrapeUnit,bill_id:&str) -> PageRequest {
        PageRequest::post(format!("{}/bills/BillView.asp",BASE_URL),&[("BillNumber",bill_id),("LastSession","")])
    }

    fn extract_bill_detail(&self,unit:&ScrapeUnit,detail:&Page) -> Result<ParsedBillDetail,ParseError> {
        let html = Html::parse_document(&detail.body);
        let table = root(&html,r#"table[width="95%"]"#)?;
        let title = table.select(&selector(r##"td[bgcolor="#fede7e"] font[color="maroon"]"##)?).next().map(|f|element_text(&f)).filter(|t|!t.is_empty());
        let mut res = ParsedBillDetail{ title, ..Default::default() };
        for segment in segments(&table)? {
            if let Some(cap) = SPONSOR_LINE.captures(&segment.text) {
                let sponsor_type = if &cap[2]=="Primary Sponsor" { SponsorType::Primary } else { SponsorType::Cosponsor };
                res.sponsors.push(ParsedSponsor{ name: cap[1].to_string(), sponsor_type: Some(sponsor_type), chamber: None });
            } else if let Some(cap) = ACTION_LINE.captures(&segment.text) {
                res.actions.push(ParsedAction{ actor: Actor::Chamber(unit.chamber), text: cap[2].to_string(), date: Some(cap[1].to_string()) });
            } else if !segment.before_link.is_empty() {
                let links = if DOCUMENT_NAME.is_match(&segment.before_link) { &mut res.documents } else { &mut res.versions };
                for href in segment.hrefs.iter().filter(|h|!h.starts_with("javascript:")) {
                    links.push(ParsedLink{ name: segment.before_link.clone(), href: href.clone() });
                }
            }
        }
        Ok(res)
    }

    fn legislator_listing(&self,unit:&ScrapeUnit) -> PageRequest {
        let house = if unit.chamber==Chamber::Upper { "S" } else { "A" };
        PageRequest::get(format!("{}/members/roster.asp?House={}&DBNAME={}",BASE_URL,house,unit.session.site_key))
    }

    fn extract_legislators(&self,_unit:&ScrapeUnit,page:&Page) -> Result<Vec<ParsedLegislator>,ParseError> {
        let html = Html::parse_document(&page.body);
        let table = root(&html,r#"table[width="95%"]"#)?;
        Ok(segments(&table)?.into_iter().filter_map(|segment|{
            let cap = ROSTER_LINE.captures(&segment.text)?;
            Some(ParsedLegislator{
                full_name: normalize_whitespace(&cap[1]),
                district: cap[3].to_string(),
                party: Some(cap[2].to_string()),
                href: segment.hrefs.first().cloned(),
                ..Default::default()
            })
        }).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(chamber:Chamber,year:i32) -> ScrapeUnit {
        ScrapeUnit{ chamber, year, session: NewJersey{}.session_for_year(year).unwrap() }
    }

    fn page(url:&str,body:&str) -> Page { Page{ url: url.to_string(), body: body.to_string() } }

    #[test]
    fn test_sessions() {
        let nj = NewJersey{};
        assert_eq!("LIS9697",nj.session_for_year(1996).unwrap().site_key);
        assert_eq!("LIS9899",nj.session_for_year(1999).unwrap().site_key);
        assert_eq!("LIS2000",nj.session_for_year(2000).unwrap().site_key);
        let session = nj.session_for_year(2007).unwrap();
        assert_eq!(("2006-2007".to_string(),2006,"LIS2006".to_string()),(session.session,session.first_year,session.site_key));
        assert!(nj.session_for_year(1995).is_err());
        assert_eq!(Err(UnsupportedYearError{ state: "nj".to_string(), year: 2010 }),nj.session_for_year(2010));
        assert_eq!(7,nj.metadata().sessions.len());
        assert_eq!(vec![2008,2009],nj.metadata().session_details["2008-2009"].years);
    }

    #[test]
    fn test_session_setup() {
        let nj = NewJersey{};
        let setup = nj.session_setup(&unit(Chamber::Upper,2006));
        assert_eq!(2,setup.len());
        assert_eq!("GET http://www.njleg.state.nj.us/",setup[0].to_string());
        assert_eq!("POST http://www.njleg.state.nj.us/bills/bills0001.asp [DBNAME=LIS2006]",setup[1].to_string());
    }

    #[test]
    fn test_listing_and_paging() {
        let nj = NewJersey{};
        let upper = unit(Chamber::Upper,2006);
        let lower = unit(Chamber::Lower,2006);
        let first = page("http://www.njleg.state.nj.us/bills/BillsByNumber.asp",include_str!("../test_data/nj_2006_bills_page1.html"));
        let second = page("http://www.njleg.state.nj.us/bills/BillsByNumber.asp",include_str!("../test_data/nj_2006_bills_page2.html"));
        assert_eq!(vec!["S1","S2"],nj.extract_bill_ids(&upper,&first).unwrap());
        assert_eq!(vec!["A1"],nj.extract_bill_ids(&lower,&first).unwrap());
        assert!(nj.extract_bill_ids(&upper,&second).unwrap().is_empty());
        assert_eq!(Some(nj.listing_page(2)),nj.next_listing_page(&upper,&first,1).unwrap());
        assert_eq!(None,nj.next_listing_page(&upper,&second,2).unwrap());
        assert_eq!("POST http://www.njleg.state.nj.us/bills/BillsByNumber.asp [GoToPage=2]",nj.listing_page(2).to_string());
        assert_eq!(Err(ParseError::missing_root(r#"table[height="780"]"#)),nj.extract_bill_ids(&upper,&page("x","<html><body>Session expired</body></html>")));
    }

    #[test]
    fn test_detail() {
        let nj = NewJersey{};
        let unit = unit(Chamber::Upper,2006);
        assert_eq!("POST http://www.njleg.state.nj.us/bills/BillView.asp [BillNumber=S1&LastSession=]",nj.bill_detail(&unit,"S1").to_string());
        let detail = nj.extract_bill_detail(&unit,&page("http://www.njleg.state.nj.us/bills/BillView.asp",include_str!("../test_data/nj_2006_s1_detail.html"))).unwrap();
        assert_eq!(Some("Provides property tax relief for senior citizens.".to_string()),detail.title);
        assert_eq!(2,detail.sponsors.len());
        assert_eq!("Codey, Richard J.",detail.sponsors[0].name);
        assert_eq!(Some(SponsorType::Primary),detail.sponsors[0].sponsor_type);
        assert_eq!("Kean, Thomas H., Jr.",detail.sponsors[1].name);
        assert_eq!(Some(SponsorType::Cosponsor),detail.sponsors[1].sponsor_type);
        assert_eq!(3,detail.actions.len());
        assert_eq!(Some("3/02/2006".to_string()),detail.actions[1].date);
        assert_eq!("Passed by the Senate (38-0)",detail.actions[2].text);
        let versions : Vec<(&str,&str)> = detail.versions.iter().map(|v|(v.name.as_str(),v.href.as_str())).collect();
        assert_eq!(vec![("Introduced","/2006/Bills/S0500/1_I1.HTM"),("Introduced","/2006/Bills/S0500/1_I1.PDF")],versions);
        assert_eq!(vec![ParsedLink{ name: "Statement".to_string(), href: "/2006/Bills/S0500/1_S1.HTM".to_string() }],detail.documents);
        assert!(detail.votes.is_empty());
    }

    #[test]
    fn test_document_names() {
        for name in ["Statement","Sponsor's Statement","Legislative Fiscal Estimate","Fiscal Note","Veto","Technical Report","Advance Law","Pamphlet Law"] {
            assert!(DOCUMENT_NAME.is_match(name),"{}",name);
        }
        for name in ["Introduced","Reprint","Assembly Committee Substitute","Lawrence amendments"] {
            assert!(!DOCUMENT_NAME.is_match(name),"{}",name);
        }
    }

    #[test]
    fn test_roster() {
        let nj = NewJersey{};
        let unit = unit(Chamber::Upper,2006);
        assert_eq!("http://www.njleg.state.nj.us/members/roster.asp?House=S&DBNAME=LIS2006",nj.legislator_listing(&unit).url);
        assert_eq!(Ok(()),nj.legislators_available(&unit));
        let members = nj.extract_legislators(&unit,&page("http://www.njleg.state.nj.us/members/roster.asp?House=S&DBNAME=LIS2006",include_str!("../test_data/nj_senate_roster.html"))).unwrap();
        assert_eq!(3,members.len());
        assert_eq!("Codey, Richard J.",members[0].full_name);
        assert_eq!("27",members[0].district);
        assert_eq!(Some("D".to_string()),members[0].party);
        assert_eq!(Some("/members/bio.asp?Leg=27".to_string()),members[0].href);
    }
}
