//! Run configuration.
//!
//! Read from an optional TOML file (by default `scraper.toml` in the working directory),
//! then overridden by command line flags. The resulting [Config] is passed explicitly to
//! everything that needs it.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use anyhow::Context;
use serde::Deserialize;

pub const CONFIG_FILE_NAME: &str = "scraper.toml";
const DEFAULT_USER_AGENT : &'static str = "legislation-scraper/0.1 (state legislative data; polite robot)";

/// How records are laid out on disk.
#[derive(Deserialize,Debug,Clone,Copy,Eq,PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One JSON file per bill or legislator.
    Json,
    /// A set of CSV tables.
    Csv,
}

impl FromStr for OutputFormat {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown output format {}, expecting json or csv",s)),
        }
    }
}

#[derive(Deserialize,Debug,Clone)]
#[serde(default)]
pub struct Config {
    /// Each state writes into a subdirectory of this.
    pub output_dir : PathBuf,
    pub format : OutputFormat,
    pub user_agent : String,
    pub timeout_secs : u64,
    /// Extra attempts for a failed fetch. 0 means a failure skips the unit or bill straight away.
    pub retries : u32,
    pub retry_delay_secs : u64,
    /// If present, fetched pages are cached here and reused on later runs.
    pub cache_dir : Option<PathBuf>,
    pub no_cache : bool,
    /// Pages that could not be parsed are saved under `{error_dir}/{state}` for inspection.
    pub error_dir : Option<PathBuf>,
    /// Insert random delays between requests.
    pub sleep : bool,
    /// Scrape legislators as well as bills.
    pub legislators : bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            output_dir: PathBuf::from("data"),
            format: OutputFormat::Json,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 30,
            retries: 0,
            retry_delay_secs: 5,
            cache_dir: Some(PathBuf::from("cache")),
            no_cache: false,
            error_dir: Some(PathBuf::from("errors")),
            sleep: false,
            legislators: true,
        }
    }
}

impl Config {
    /// Load the configuration from `path`. If no path is given, use [CONFIG_FILE_NAME] if it exists, or the defaults.
    pub fn load(path:Option<&Path>) -> anyhow::Result<Config> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(CONFIG_FILE_NAME);
                if !default.exists() { return Ok(Config::default()); }
                default
            }
        };
        let file = fs::read_to_string(&path).with_context(||format!("Could not read {}",path.display()))?;
        Config::parse(&file).with_context(||format!("Could not parse {}",path.display()))
    }

    pub fn parse(text:&str) -> anyhow::Result<Config> {
        Ok(toml::de::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_partial_config() {
        let config = Config::parse(r#"
            output_dir = "/tmp/out"
            format = "csv"
            retries = 2
        "#).unwrap();
        assert_eq!(PathBuf::from("/tmp/out"),config.output_dir);
        assert_eq!(OutputFormat::Csv,config.format);
        assert_eq!(2,config.retries);
        assert_eq!(30,config.timeout_secs); // default retained
        assert!(config.legislators);
        assert_eq!(Some(PathBuf::from("errors")),config.error_dir);
        assert_eq!(Some(PathBuf::from("/tmp/err")),Config::parse("error_dir = \"/tmp/err\"").unwrap().error_dir);
    }

    #[test]
    fn test_bad_config() {
        assert!(Config::parse("format = \"xml\"").is_err());
        assert!(Config::load(Some(Path::new("/definitely/not/here.toml"))).is_err());
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(Ok(OutputFormat::Json),"JSON".parse());
        assert!("xml".parse::<OutputFormat>().is_err());
    }
}
