//! Turn parsed page fragments into normalized records.
//!
//! Everything here is pure: no fetching, no writing. This is where the common schema's
//! rules are applied, whatever state the fragments came from:
//! * if the source marks no primary sponsor, the first sponsor with no stated type is primary; other unmarked ones are cosponsors,
//! * links are made absolute against the page they were found on,
//! * dates are canonicalized, and an action with no usable date inherits the previous one.

use tracing::warn;
use crate::adapter::{ParsedBillDetail, ParsedLegislator, ParsedVote};
use crate::bill::{Action, Bill, DocType, Document, Source, SponsorType, Sponsorship, Version, Vote, Voter};
use crate::chamber::Chamber;
use crate::dates::CanonicalDate;
use crate::legislator::{split_name, Legislator, LegislatorKey};
use crate::parse_util::{normalize_whitespace, relative_url};

pub struct RecordBuilder {
    state : &'static str,
}

impl RecordBuilder {
    pub fn new(state:&'static str) -> Self { RecordBuilder{ state } }

    /// The id by which other records (sponsorships, votes) refer to a legislator.
    pub fn leg_id(&self,key:&LegislatorKey) -> String {
        format!("{}:{}",self.state.to_uppercase(),key)
    }

    /// Build a bill from a parsed detail page found at `source_url`.
    pub fn build_bill(&self,bill_id:&str,session:&str,chamber:Chamber,detail:ParsedBillDetail,source_url:&str) -> Bill {
        let title = detail.title.as_deref().map(normalize_whitespace).unwrap_or_default();
        if title.is_empty() { warn!("No title found for {} {} {}",session,chamber,bill_id); }
        let mut bill = Bill::new(self.state,session,chamber,bill_id.trim(),&title);
        let mut need_primary = !detail.sponsors.iter().any(|s|s.sponsor_type==Some(SponsorType::Primary) && !normalize_whitespace(&s.name).is_empty());
        for sponsor in detail.sponsors {
            let name = normalize_whitespace(&sponsor.name);
            if name.is_empty() { continue; }
            let sponsor_type = match sponsor.sponsor_type {
                Some(sponsor_type) => sponsor_type,
                None if need_primary => SponsorType::Primary,
                None => SponsorType::Cosponsor,
            };
            if sponsor_type==SponsorType::Primary { need_primary = false; }
            bill.sponsors.push(Sponsorship{ sponsor_type, name, chamber: sponsor.chamber, leg_id: None });
        }
        for version in detail.versions {
            match relative_url(source_url,version.href.trim()) {
                Ok(url) => bill.versions.push(Version{ name: normalize_whitespace(&version.name), url }),
                Err(e) => warn!("Dropping version {} of {} with unusable url {} : {}",version.name,bill_id,version.href,e),
            }
        }
        for document in detail.documents {
            match relative_url(source_url,document.href.trim()) {
                Ok(url) => bill.documents.push(Document{ name: normalize_whitespace(&document.name), url }),
                Err(e) => warn!("Dropping document {} of {} with unusable url {} : {}",document.name,bill_id,document.href,e),
            }
        }
        let mut last_date : Option<CanonicalDate> = None;
        for action in detail.actions {
            let date = action.date.as_deref().and_then(CanonicalDate::parse_loose).or(last_date);
            last_date = date;
            bill.actions.push(Action{ actor: action.actor, text: normalize_whitespace(&action.text), date });
        }
        bill.votes = detail.votes.into_iter().map(|v|self.build_vote(v,chamber)).collect();
        bill.sources.push(Source{ url: source_url.to_string() });
        bill
    }

    fn build_vote(&self,vote:ParsedVote,bill_chamber:Chamber) -> Vote {
        let voters = |names:Vec<String>| names.iter().map(|n|normalize_whitespace(n)).filter(|n|!n.is_empty()).map(|n|Voter::new(&n)).collect::<Vec<_>>();
        Vote {
            chamber: vote.chamber.unwrap_or(bill_chamber),
            date: vote.date.as_deref().and_then(CanonicalDate::parse_loose),
            motion: normalize_whitespace(&vote.motion),
            passed: vote.passed.unwrap_or(vote.yes_count>vote.no_count),
            yes_count: vote.yes_count,
            no_count: vote.no_count,
            other_count: vote.other_count,
            yes_votes: voters(vote.yes_votes),
            no_votes: voters(vote.no_votes),
            other_votes: voters(vote.other_votes),
        }
    }

    /// Build a legislator from a member list entry found at `source_url`.
    pub fn build_legislator(&self,fragment:ParsedLegislator,session:&str,chamber:Chamber,source_url:&str) -> Legislator {
        let full_name = normalize_whitespace(&fragment.full_name);
        let parts = split_name(&full_name);
        let district = normalize_whitespace(&fragment.district);
        let key = LegislatorKey{ session: session.to_string(), chamber, district: district.clone() };
        let mut sources = vec![Source{ url: source_url.to_string() }];
        if let Some(href) = &fragment.href {
            match relative_url(source_url,href.trim()) {
                Ok(url) => sources.push(Source{ url }),
                Err(e) => warn!("Ignoring unusable link {} for {} : {}",href,full_name,e),
            }
        }
        Legislator {
            doc_type: DocType::Legislator,
            state: self.state.to_string(),
            leg_id: self.leg_id(&key),
            session: session.to_string(),
            chamber,
            district,
            first_name: fragment.first_name.unwrap_or(parts.first),
            last_name: fragment.last_name.unwrap_or(parts.last),
            middle_name: fragment.middle_name.or(parts.middle),
            suffixes: parts.suffixes,
            party: expand_party(fragment.party.as_deref().unwrap_or("")),
            full_name,
            sources,
        }
    }
}

/// Expand one letter party codes.
pub fn expand_party(party:&str) -> String {
    match party.trim() {
        "R" => "Republican".to_string(),
        "D" => "Democratic".to_string(),
        "I" => "Independent".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{ParsedAction, ParsedSponsor, ParsedLink};
    use crate::chamber::Actor;

    fn sponsor(name:&str,sponsor_type:Option<SponsorType>) -> ParsedSponsor {
        ParsedSponsor{ name: name.to_string(), sponsor_type, chamber: None }
    }

    #[test]
    fn test_first_unmarked_sponsor_is_primary() {
        let builder = RecordBuilder::new("wi");
        let detail = ParsedBillDetail{ title: Some("An Act".to_string()), sponsors: vec![sponsor("Smith",None),sponsor("Jones",None)], ..Default::default() };
        let bill = builder.build_bill("SB1","2007",Chamber::Upper,detail,"http://www.legis.state.wi.us/2007/data/SB1hst.html");
        assert_eq!(SponsorType::Primary,bill.sponsors[0].sponsor_type);
        assert_eq!(SponsorType::Cosponsor,bill.sponsors[1].sponsor_type);
    }

    #[test]
    fn test_marked_primary_suppresses_default() {
        let builder = RecordBuilder::new("wi");
        let detail = ParsedBillDetail{ sponsors: vec![sponsor("Smith",None),sponsor("Jones",Some(SponsorType::Primary))], ..Default::default() };
        let bill = builder.build_bill("SB1","2007",Chamber::Upper,detail,"http://www.legis.state.wi.us/");
        assert_eq!(SponsorType::Cosponsor,bill.sponsors[0].sponsor_type);
        assert_eq!(SponsorType::Primary,bill.sponsors[1].sponsor_type);
    }

    #[test]
    fn test_blank_sponsor_does_not_take_primary() {
        let builder = RecordBuilder::new("wi");
        let detail = ParsedBillDetail{ sponsors: vec![sponsor("",None),sponsor("Smith",None),sponsor("Jones",None)], ..Default::default() };
        let bill = builder.build_bill("SB1","2007",Chamber::Upper,detail,"http://www.legis.state.wi.us/");
        assert_eq!(2,bill.sponsors.len());
        assert_eq!("Smith",bill.sponsors[0].name);
        assert_eq!(SponsorType::Primary,bill.sponsors[0].sponsor_type);
        assert_eq!(SponsorType::Cosponsor,bill.sponsors[1].sponsor_type);
    }

    #[test]
    fn test_explicit_sponsor_types_are_kept() {
        let builder = RecordBuilder::new("nj");
        let detail = ParsedBillDetail{ sponsors: vec![sponsor("Smith",Some(SponsorType::Cosponsor)),sponsor("Jones",Some(SponsorType::Primary)),sponsor("  ",None)], ..Default::default() };
        let bill = builder.build_bill("A100","2006-2007",Chamber::Lower,detail,"http://www.njleg.state.nj.us/bills/BillView.asp");
        assert_eq!(2,bill.sponsors.len());
        assert_eq!(SponsorType::Cosponsor,bill.sponsors[0].sponsor_type);
        assert_eq!(SponsorType::Primary,bill.sponsors[1].sponsor_type);
    }

    #[test]
    fn test_urls_dates_and_carry_forward() {
        let builder = RecordBuilder::new("nj");
        let action = |text:&str,date:Option<&str>| ParsedAction{ actor: Actor::Chamber(Chamber::Lower), text: text.to_string(), date: date.map(|s|s.to_string()) };
        let detail = ParsedBillDetail{
            title: Some("  Makes   appropriation ".to_string()),
            versions: vec![ParsedLink{ name: "Introduced".to_string(), href: "/2006/Bills/A0500/100_I1.HTM".to_string() }],
            documents: vec![ParsedLink{ name: "Statement".to_string(), href: "../2006/Bills/A0500/100_S1.HTM".to_string() },ParsedLink{ name: "Broken".to_string(), href: "http://[".to_string() }],
            actions: vec![action("Introduced",Some("01/10/2006")),action("Referred to Committee",None),action("Reported",Some("garbage")),action("Passed",Some("03/02/2006"))],
            ..Default::default()
        };
        let bill = builder.build_bill("A100","2006-2007",Chamber::Lower,detail,"http://www.njleg.state.nj.us/bills/BillView.asp");
        assert_eq!("Makes appropriation",bill.title);
        assert_eq!("http://www.njleg.state.nj.us/2006/Bills/A0500/100_I1.HTM",bill.versions[0].url);
        assert_eq!(vec![Document{ name: "Statement".to_string(), url: "http://www.njleg.state.nj.us/2006/Bills/A0500/100_S1.HTM".to_string() }],bill.documents);
        let dates : Vec<String> = bill.actions.iter().map(|a|a.date.map(|d|d.to_string()).unwrap_or_default()).collect();
        assert_eq!(vec!["01/10/2006","01/10/2006","01/10/2006","03/02/2006"],dates);
        assert_eq!(vec![Source{ url: "http://www.njleg.state.nj.us/bills/BillView.asp".to_string() }],bill.sources);
    }

    #[test]
    fn test_vote_defaults() {
        let builder = RecordBuilder::new("wi");
        let detail = ParsedBillDetail{ votes: vec![ParsedVote{ motion: "Read a third time and passed".to_string(), yes_count: 20, no_count: 13, ..Default::default() }], ..Default::default() };
        let bill = builder.build_bill("SB1","2007",Chamber::Upper,detail,"http://www.legis.state.wi.us/");
        assert!(bill.votes[0].passed);
        assert_eq!(Chamber::Upper,bill.votes[0].chamber);
    }

    #[test]
    fn test_build_legislator() {
        let builder = RecordBuilder::new("wi");
        let fragment = ParsedLegislator{ full_name: "Wirch,  Robert W.".to_string(), district: " 22 ".to_string(), party: Some("D".to_string()), href: Some("contact.aspx?id=7".to_string()), ..Default::default() };
        let leg = builder.build_legislator(fragment,"2007",Chamber::Upper,"http://legis.wi.gov/w3asp/contact/legislatorslist.aspx?house=senate");
        assert_eq!("Robert",leg.first_name);
        assert_eq!("Wirch",leg.last_name);
        assert_eq!(Some("W.".to_string()),leg.middle_name);
        assert_eq!("Democratic",leg.party);
        assert_eq!("22",leg.district);
        assert_eq!("WI:2007:upper:22",leg.leg_id);
        assert_eq!("http://legis.wi.gov/w3asp/contact/contact.aspx?id=7",leg.sources[1].url);
    }
}
