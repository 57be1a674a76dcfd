//! Match the names used in sponsor lists and roll calls to legislators.
//!
//! Sources refer to legislators inconsistently ("Stephens", "Stephens, M", "Michael J. Stephens").
//! Every plausible form of each registered legislator's name is stored, per chamber. A form
//! that two legislators share is ambiguous and matches nobody.

use std::collections::HashMap;
use crate::bill::Bill;
use crate::chamber::Chamber;
use crate::legislator::Legislator;

#[derive(Default)]
pub struct NameMatcher {
    /// map from (chamber, lower cased form without dots) to leg_id, or None if ambiguous.
    names : HashMap<(Chamber,String),Option<String>>,
}

fn normalize_form(form:&str) -> String {
    form.replace('.',"").split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

impl NameMatcher {
    pub fn new() -> Self { Default::default() }

    pub fn clear(&mut self) { self.names.clear(); }

    /// Add all forms of a legislator's name.
    pub fn insert(&mut self,legislator:&Legislator) {
        let first = legislator.first_name.as_str();
        let last = legislator.last_name.as_str();
        let initial = first.chars().next().map(|c|c.to_string()).unwrap_or_default();
        let mut forms = vec![
            legislator.full_name.clone(),
            last.to_string(),
            format!("{}, {}",last,first),
            format!("{} {}",first,last),
            format!("{} {}",initial,last),
            format!("{}, {}",last,initial),
            format!("{} ({})",last,first),
            format!("{} ({})",last,initial),
        ];
        if let Some(middle) = legislator.middle_name.as_deref().filter(|m|!m.is_empty()) {
            let middle_initial = middle.chars().next().map(|c|c.to_string()).unwrap_or_default();
            forms.push(format!("{}, {} {}",last,first,middle));
            forms.push(format!("{}, {} {}",last,initial,middle));
            forms.push(format!("{} {} {}",first,middle,last));
            forms.push(format!("{}, {} {}",last,initial,middle_initial));
            forms.push(format!("{} {} {}",first,middle_initial,last));
            forms.push(format!("{}, {} {}",last,first,middle_initial));
            forms.push(format!("{}, {}{}",last,initial,middle_initial));
        }
        let mut forms : Vec<String> = forms.iter().map(|f|normalize_form(f)).filter(|f|!f.is_empty()).collect();
        forms.sort();
        forms.dedup(); // the same person may generate the same form twice; that is not ambiguity.
        for form in forms {
            let key = (legislator.chamber,form);
            let ambiguous = self.names.get(&key).map(|existing|existing.as_deref()!=Some(legislator.leg_id.as_str())).unwrap_or(false);
            self.names.insert(key,if ambiguous { None } else { Some(legislator.leg_id.clone()) });
        }
    }

    /// The leg_id uniquely identified by `name` in `chamber`, if any.
    pub fn get(&self,chamber:Chamber,name:&str) -> Option<&str> {
        self.names.get(&(chamber,normalize_form(name))).and_then(|v|v.as_deref())
    }

    /// Fill in the leg_id of every sponsor and voter on a bill that can be matched.
    pub fn link_bill(&self,bill:&mut Bill) {
        let bill_chamber = bill.chamber;
        for sponsor in &mut bill.sponsors {
            sponsor.leg_id = self.get(sponsor.chamber.unwrap_or(bill_chamber),&sponsor.name).map(|s|s.to_string());
        }
        for vote in &mut bill.votes {
            let chamber = vote.chamber;
            for voter in vote.yes_votes.iter_mut().chain(vote.no_votes.iter_mut()).chain(vote.other_votes.iter_mut()) {
                voter.leg_id = self.get(chamber,&voter.name).map(|s|s.to_string());
            }
        }
    }
}
