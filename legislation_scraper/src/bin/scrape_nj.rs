use clap::Parser;
use legislation_scraper::cli::{init_logging, run_state, summarize, Args};
use legislation_scraper::parse_new_jersey::NewJersey;

/// Scrape New Jersey bills and legislators.
fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    println!("Scraping New Jersey");
    let report = run_state(&NewJersey{},&args)?;
    let code = summarize(&report);
    if code!=0 { std::process::exit(code); }
    println!("Ran successfully");
    Ok(())
}
