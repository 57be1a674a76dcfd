//! Walk the requested years and chambers for one state, and get everything found into a sink.
//!
//! Work is done in units of one (chamber, year). Within a year, legislators for every
//! requested chamber are scraped before any bills, so that sponsors and roll calls can be
//! linked to them. A failure (a page that cannot be fetched or parsed, a year with no known
//! session) is recorded against the unit, or the bill within it, and the run carries on.
//! Only problems with the sink end the run early. The sink is flushed after every unit, so
//! the output of finished units survives a run that is killed part way through.
//!
//! A page that was fetched but could not be parsed is saved under the error directory,
//! as `error-page.html`, `error-page-1.html` and so on, for someone to look at later.

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use anyhow::{bail, Context};
use itertools::Itertools;
use tracing::{debug, error, info, warn};
use crate::adapter::{ScrapeUnit, StateAdapter};
use crate::bill::{Bill, BillKey};
use crate::builder::RecordBuilder;
use crate::chamber::Chamber;
use crate::config::Config;
use crate::error::{FetchError, ParseError, UnitError};
use crate::fetch::{Page, PageRequest, PageSource};
use crate::legislator::LegislatorKey;
use crate::name_matcher::NameMatcher;
use crate::sink::{persist_atomically, Sink};

/// Stop following "next page" links after this many listing pages.
const MAX_LISTING_PAGES : u32 = 1000;

/// What a run should cover. Checked before any work starts.
#[derive(Debug,Clone,Eq,PartialEq)]
pub struct RunPlan {
    pub years : Vec<i32>,
    pub chambers : Vec<Chamber>,
    pub legislators : bool,
}

impl RunPlan {
    pub fn new(years:Vec<i32>,chambers:Vec<Chamber>,legislators:bool) -> anyhow::Result<RunPlan> {
        if years.is_empty() { bail!("No years to scrape"); }
        if chambers.is_empty() { bail!("No chambers to scrape"); }
        Ok(RunPlan{ years: years.into_iter().unique().collect(), chambers: chambers.into_iter().unique().collect(), legislators })
    }
}

/// Something that went wrong in a unit. The rest of the run was unaffected.
#[derive(Debug,Clone,Eq,PartialEq)]
pub struct UnitFailure {
    pub state : String,
    pub chamber : Chamber,
    pub year : i32,
    /// None if the year could not be resolved to a session.
    pub session : Option<String>,
    /// The bill being scraped, if the failure was specific to one bill.
    pub bill_id : Option<String>,
    pub error : String,
}

impl fmt::Display for UnitFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.state, self.chamber, self.year)?;
        if let Some(session) = &self.session { write!(f, " (session {})", session)?; }
        if let Some(bill_id) = &self.bill_id { write!(f, " bill {}", bill_id)?; }
        write!(f, ": {}", self.error)
    }
}

#[derive(Debug,Clone,Default)]
pub struct RunReport {
    pub units_attempted : usize,
    /// Units in which nothing failed.
    pub units_completed : usize,
    pub bills_written : usize,
    pub legislators_written : usize,
    pub failures : Vec<UnitFailure>,
}

impl RunReport {
    pub fn success(&self) -> bool { self.failures.is_empty() }
}

pub struct Driver<'a> {
    adapter : &'a dyn StateAdapter,
    source : &'a mut dyn PageSource,
    sink : &'a mut dyn Sink,
    retries : u32,
    retry_delay : Duration,
    builder : RecordBuilder,
    matcher : NameMatcher,
    /// Bills already written this run.
    written : HashSet<BillKey>,
    /// Legislators already written this run. Two years of one session share a member list.
    written_legislators : HashSet<LegislatorKey>,
    /// Units already reported as having no session.
    unsupported : HashSet<(Chamber,i32)>,
    error_dir : Option<PathBuf>,
    report : RunReport,
}

impl <'a> Driver<'a> {
    pub fn new(adapter:&'a dyn StateAdapter,source:&'a mut dyn PageSource,sink:&'a mut dyn Sink,config:&Config) -> Self {
        Driver {
            adapter,
            source,
            sink,
            retries: config.retries,
            retry_delay: Duration::from_secs(config.retry_delay_secs),
            builder: RecordBuilder::new(adapter.state()),
            matcher: NameMatcher::new(),
            written: HashSet::new(),
            written_legislators: HashSet::new(),
            unsupported: HashSet::new(),
            error_dir: config.error_dir.as_ref().map(|dir|dir.join(adapter.state())),
            report: RunReport::default(),
        }
    }

    /// Do everything in the plan. Fails only if the sink cannot be written.
    pub fn run(mut self,plan:&RunPlan) -> anyhow::Result<RunReport> {
        self.sink.write_metadata(&self.adapter.metadata()).context("Could not write state metadata")?;
        for &year in &plan.years {
            self.matcher.clear();
            if plan.legislators {
                for &chamber in &plan.chambers {
                    self.legislator_unit(chamber,year)?;
                    self.flush()?;
                }
            }
            for &chamber in &plan.chambers {
                self.bill_unit(chamber,year)?;
                self.flush()?;
            }
        }
        self.sink.finish().context("Could not finish writing output")?;
        info!("{} of {} units completed, {} bills and {} legislators written, {} failures",
            self.report.units_completed,self.report.units_attempted,self.report.bills_written,self.report.legislators_written,self.report.failures.len());
        Ok(self.report)
    }

    fn flush(&mut self) -> anyhow::Result<()> {
        self.sink.flush().context("Could not write output")
    }

    /// Keep a page that could not be parsed. Failing to save it is only worth a warning.
    fn save_error_page(&self,page:&Page,e:&ParseError) {
        let Some(dir) = &self.error_dir else { return; };
        let mut path = dir.join("error-page.html");
        let mut n = 0;
        while path.exists() {
            n+=1;
            path = dir.join(format!("error-page-{}.html",n));
        }
        match std::fs::create_dir_all(dir).map_err(anyhow::Error::from).and_then(|_|persist_atomically(&path,page.body.as_bytes())) {
            Ok(()) => error!("Could not parse {} ({}). Page saved in {}",page.url,e,path.display()),
            Err(save_error) => warn!("Could not save unparseable page {} : {}",page.url,save_error),
        }
    }

    /// Parse a fetched page, saving it if it can't be parsed.
    fn parse<T>(&self,page:&Page,parse:impl FnOnce(&Page)->Result<T,ParseError>) -> Result<T,ParseError> {
        parse(page).map_err(|e|{ self.save_error_page(page,&e); e })
    }

    fn fail(&mut self,chamber:Chamber,year:i32,session:Option<&str>,bill_id:Option<&str>,e:&UnitError) {
        let failure = UnitFailure {
            state: self.adapter.state().to_string(),
            chamber,
            year,
            session: session.map(|s|s.to_string()),
            bill_id: bill_id.map(|s|s.to_string()),
            error: e.to_string(),
        };
        error!("{}",failure);
        self.report.failures.push(failure);
    }

    /// The unit for (chamber, year), or None (having reported it, once per unit) if there is no session for the year.
    fn resolve(&mut self,chamber:Chamber,year:i32) -> Option<ScrapeUnit> {
        match self.adapter.session_for_year(year) {
            Ok(session) => Some(ScrapeUnit{ chamber, year, session }),
            Err(e) => {
                if self.unsupported.insert((chamber,year)) {
                    self.fail(chamber,year,None,None,&UnitError::from(e.clone()));
                } else { debug!("Skipping {} {} : {}",chamber,year,e); }
                None
            }
        }
    }

    fn fetch(&mut self,request:&PageRequest) -> Result<Page,FetchError> {
        let mut attempt = 0;
        loop {
            match self.source.fetch(request) {
                Ok(page) => return Ok(page),
                Err(e) if attempt<self.retries => {
                    attempt+=1;
                    warn!("{}, retrying ({} of {})",e,attempt,self.retries);
                    std::thread::sleep(self.retry_delay);
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn legislator_unit(&mut self,chamber:Chamber,year:i32) -> anyhow::Result<()> {
        self.report.units_attempted+=1;
        let Some(unit) = self.resolve(chamber,year) else { return Ok(()); };
        let adapter = self.adapter;
        if let Err(e) = adapter.legislators_available(&unit) {
            self.fail(chamber,year,Some(&unit.session.session),None,&UnitError::from(e));
            return Ok(());
        }
        info!("Scraping {} {} legislators for session {}",adapter.state(),chamber,unit.session.session);
        let request = adapter.legislator_listing(&unit);
        let listing = self.fetch(&request).map_err(UnitError::from)
            .and_then(|page|Ok((self.parse(&page,|page|adapter.extract_legislators(&unit,page))?,page.url)));
        let (fragments,url) = match listing {
            Ok(found) => found,
            Err(e) => {
                self.fail(chamber,year,Some(&unit.session.session),None,&e);
                return Ok(());
            }
        };
        for fragment in fragments {
            let legislator = self.builder.build_legislator(fragment,&unit.session.session,chamber,&url);
            if self.written_legislators.insert(legislator.key()) {
                self.sink.write_legislator(&legislator).with_context(||format!("Could not write legislator {}",legislator.key()))?;
                self.report.legislators_written+=1;
            }
            self.matcher.insert(&legislator);
        }
        self.report.units_completed+=1;
        Ok(())
    }

    /// The distinct ids of the bills in a unit, following pagination.
    fn list_bills(&mut self,unit:&ScrapeUnit) -> Result<Vec<String>,UnitError> {
        let adapter = self.adapter;
        for request in adapter.session_setup(unit) {
            self.fetch(&request)?;
        }
        let mut request = adapter.bill_listing(unit);
        let mut ids = vec![];
        let mut page_number = 1;
        loop {
            let page = self.fetch(&request)?;
            ids.extend(self.parse(&page,|page|adapter.extract_bill_ids(unit,page))?);
            match self.parse(&page,|page|adapter.next_listing_page(unit,page,page_number))? {
                Some(next) if page_number<MAX_LISTING_PAGES => {
                    request = next;
                    page_number+=1;
                }
                _ => break,
            }
        }
        Ok(ids.into_iter().map(|id|id.trim().to_string()).filter(|id|!id.is_empty()).unique().collect())
    }

    fn scrape_bill(&mut self,unit:&ScrapeUnit,bill_id:&str) -> Result<Bill,UnitError> {
        let adapter = self.adapter;
        let page = self.fetch(&adapter.bill_detail(unit,bill_id))?;
        let detail = self.parse(&page,|page|adapter.extract_bill_detail(unit,page))?;
        let mut bill = self.builder.build_bill(bill_id,&unit.session.session,unit.chamber,detail,&page.url);
        self.matcher.link_bill(&mut bill);
        Ok(bill)
    }

    fn bill_unit(&mut self,chamber:Chamber,year:i32) -> anyhow::Result<()> {
        self.report.units_attempted+=1;
        let Some(unit) = self.resolve(chamber,year) else { return Ok(()); };
        info!("Scraping {} {} bills for {} (session {})",self.adapter.state(),chamber,year,unit.session.session);
        let ids = match self.list_bills(&unit) {
            Ok(ids) => ids,
            Err(e) => {
                self.fail(chamber,year,Some(&unit.session.session),None,&e);
                return Ok(());
            }
        };
        info!("Found {} bills",ids.len());
        let mut all_ok = true;
        for bill_id in ids {
            let key = BillKey{ session: unit.session.session.clone(), chamber, bill_id: bill_id.clone() };
            if self.written.contains(&key) {
                debug!("Already have {}",key);
                continue;
            }
            match self.scrape_bill(&unit,&bill_id) {
                Ok(bill) => {
                    self.sink.write_bill(&bill).with_context(||format!("Could not write bill {}",key))?;
                    self.written.insert(key);
                    self.report.bills_written+=1;
                }
                Err(e) => {
                    self.fail(chamber,year,Some(&unit.session.session),Some(&bill_id),&e);
                    all_ok = false;
                }
            }
        }
        if all_ok { self.report.units_completed+=1; }
        Ok(())
    }
}
