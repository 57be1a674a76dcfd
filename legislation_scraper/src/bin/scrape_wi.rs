use clap::Parser;
use legislation_scraper::cli::{init_logging, run_state, summarize, Args};
use legislation_scraper::parse_wisconsin::Wisconsin;

/// Scrape Wisconsin bills and legislators.
fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    println!("Scraping Wisconsin");
    let report = run_state(&Wisconsin{},&args)?;
    let code = summarize(&report);
    if code!=0 { std::process::exit(code); }
    println!("Ran successfully");
    Ok(())
}
