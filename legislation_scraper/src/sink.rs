//! Where finished records go.
//!
//! A sink owns one state's output directory. Writing a record whose identity key was
//! already written (in this run or a previous one) replaces the old output rather than
//! adding to it. Directories are created when the sink is opened; nothing is ever removed.

use std::io::Write;
use std::path::{Path, PathBuf};
use anyhow::{anyhow, Context};
use tempfile::NamedTempFile;
use crate::bill::Bill;
use crate::config::{Config, OutputFormat};
use crate::csv_sink::CsvSink;
use crate::json_sink::JsonSink;
use crate::legislator::Legislator;
use crate::metadata::StateMetadata;

pub const METADATA_FILE_NAME : &'static str = "state_metadata.json";

pub trait Sink {
    fn write_bill(&mut self,bill:&Bill) -> anyhow::Result<()>;
    fn write_legislator(&mut self,legislator:&Legislator) -> anyhow::Result<()>;
    fn write_metadata(&mut self,metadata:&StateMetadata) -> anyhow::Result<()>;
    /// Called at the end of every unit. Everything written so far must be on disk afterwards.
    fn flush(&mut self) -> anyhow::Result<()> { Ok(()) }
    /// Called once at the end of a run.
    fn finish(&mut self) -> anyhow::Result<()> { self.flush() }
}

/// The directory a state's output goes in.
pub fn state_output_dir(config:&Config,state:&str) -> PathBuf {
    config.output_dir.join(state)
}

/// Open the sink for the configured output format.
pub fn open_sink(config:&Config,state:&str) -> anyhow::Result<Box<dyn Sink>> {
    let dir = state_output_dir(config,state);
    Ok(match config.format {
        OutputFormat::Json => Box::new(JsonSink::open(&dir)?),
        OutputFormat::Csv => Box::new(CsvSink::open(&dir)?),
    })
}

/// Replace the file at `path` with `contents`, so that readers see either the old file or the new one, never half of one.
pub(crate) fn persist_atomically(path:&Path,contents:&[u8]) -> anyhow::Result<()> {
    let dir = path.parent().ok_or_else(||anyhow!("No parent directory for {}",path.display()))?;
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(contents)?;
    file.flush()?;
    file.persist(path).with_context(||format!("Could not write {}",path.display()))?;
    Ok(())
}

/// Make one component of an identity key safe to use in a file name.
pub(crate) fn file_safe(part:&str) -> String {
    part.chars().map(|c| if c=='/' || c=='\\' || c.is_control() { '_' } else { c }).collect()
}

pub(crate) fn write_metadata_file(dir:&Path,metadata:&StateMetadata) -> anyhow::Result<()> {
    persist_atomically(&dir.join(METADATA_FILE_NAME),&serde_json::to_vec_pretty(metadata)?)
}
