//! Command line handling shared by the per-state binaries.

use std::path::PathBuf;
use anyhow::{anyhow, Context};
use chrono::Datelike;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use crate::adapter::StateAdapter;
use crate::chamber::Chamber;
use crate::config::{Config, OutputFormat};
use crate::driver::{Driver, RunPlan, RunReport};
use crate::fetch::Fetcher;
use crate::sink::{open_sink, state_output_dir};

/// Scrape bills and legislators from a state legislature website.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// Years to scrape, separated by commas or spaces. May be given more than once.
    #[clap(long, value_parser, value_name = "YEARS")]
    pub years: Vec<String>,
    /// Scrape every year from the earliest the state has data for up to this year.
    #[clap(long, action)]
    pub all: bool,
    /// Scrape the upper chamber. If neither --upper nor --lower is given, both are scraped.
    #[clap(long, action)]
    pub upper: bool,
    /// Scrape the lower chamber.
    #[clap(long, action)]
    pub lower: bool,
    /// Don't scrape legislators.
    #[clap(long, action)]
    pub nolegislators: bool,
    /// More logging. -v for progress, -vv for every request. RUST_LOG overrides this.
    #[clap(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
    /// Directory to write output into. A subdirectory is made for the state.
    #[clap(short = 'd', long, value_parser)]
    pub output_dir: Option<PathBuf>,
    /// json or csv
    #[clap(long, value_parser)]
    pub format: Option<OutputFormat>,
    /// Always fetch pages from the network, ignoring any cache.
    #[clap(short = 'n', long, action)]
    pub no_cache: bool,
    /// Pause between requests.
    #[clap(short, long, action)]
    pub sleep: bool,
    /// TOML configuration file. Defaults to scraper.toml if it exists.
    #[clap(long, value_parser)]
    pub config: Option<PathBuf>,
}

/// Split year lists like `2007,2008 2009` into years.
pub fn parse_years(values:&[String]) -> anyhow::Result<Vec<i32>> {
    let mut res = vec![];
    for value in values {
        for year in value.split(|c:char|c==',' || c.is_whitespace()).filter(|s|!s.is_empty()) {
            res.push(year.parse::<i32>().map_err(|_|anyhow!("{} is not a year",year))?);
        }
    }
    Ok(res)
}

impl Args {
    /// The years asked for. `--all` means `earliest..=current_year`.
    pub fn years(&self,earliest:i32,current_year:i32) -> anyhow::Result<Vec<i32>> {
        let mut years = parse_years(&self.years)?;
        if self.all { years.extend(earliest..=current_year); }
        Ok(years)
    }

    pub fn chambers(&self) -> Vec<Chamber> {
        match (self.upper,self.lower) {
            (true,false) => vec![Chamber::Upper],
            (false,true) => vec![Chamber::Lower],
            _ => vec![Chamber::Upper,Chamber::Lower],
        }
    }

    /// The configuration file, with command line flags applied on top.
    pub fn config(&self) -> anyhow::Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;
        if let Some(dir) = &self.output_dir { config.output_dir = dir.clone(); }
        if let Some(format) = self.format { config.format = format; }
        config.no_cache |= self.no_cache;
        config.sleep |= self.sleep;
        config.legislators &= !self.nolegislators;
        Ok(config)
    }
}

/// Log to stderr. The filter comes from RUST_LOG if set, otherwise from the number of `-v` flags.
pub fn init_logging(verbose:u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_|EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .try_init();
}

/// Do everything the command line asks for, for one state.
pub fn run_state(adapter:&dyn StateAdapter,args:&Args) -> anyhow::Result<RunReport> {
    let config = args.config()?;
    let years = args.years(adapter.earliest_year(),chrono::Local::now().year())?;
    let plan = RunPlan::new(years,args.chambers(),config.legislators).context("Use --years or --all")?;
    let mut fetcher = Fetcher::new(&config)?;
    let mut sink = open_sink(&config,adapter.state())?;
    println!("Writing {} output to {}",adapter.state(),state_output_dir(&config,adapter.state()).display());
    Driver::new(adapter,&mut fetcher,sink.as_mut(),&config).run(&plan)
}

/// Print what went wrong, if anything. Returns the process exit code.
pub fn summarize(report:&RunReport) -> i32 {
    println!("Wrote {} bills and {} legislators. {} of {} units completed.",report.bills_written,report.legislators_written,report.units_completed,report.units_attempted);
    if report.success() { return 0; }
    println!("{} failures:",report.failures.len());
    for failure in &report.failures {
        println!("  {}",failure);
    }
    1
}
