//! One JSON document per record, the layout the CouchDB importer reads.
//!
//! ```text
//! {dir}/bills/{session}:{chamber}:{bill_id}.json
//! {dir}/legislators/{session}:{chamber}:{district}.json
//! {dir}/state_metadata.json
//! ```

use std::path::{Path, PathBuf};
use anyhow::Context;
use tracing::debug;
use crate::bill::{Bill, BillKey};
use crate::legislator::{Legislator, LegislatorKey};
use crate::metadata::StateMetadata;
use crate::sink::{file_safe, persist_atomically, write_metadata_file, Sink};

pub struct JsonSink {
    dir : PathBuf,
}

impl JsonSink {
    pub fn open(dir:&Path) -> anyhow::Result<JsonSink> {
        for sub in ["bills","legislators"] {
            std::fs::create_dir_all(dir.join(sub)).with_context(||format!("Could not create {}",dir.join(sub).display()))?;
        }
        Ok(JsonSink{ dir: dir.to_path_buf() })
    }

    pub fn bill_path(&self,key:&BillKey) -> PathBuf {
        self.dir.join("bills").join(format!("{}:{}:{}.json",file_safe(&key.session),key.chamber,file_safe(&key.bill_id)))
    }

    pub fn legislator_path(&self,key:&LegislatorKey) -> PathBuf {
        self.dir.join("legislators").join(format!("{}:{}:{}.json",file_safe(&key.session),key.chamber,file_safe(&key.district)))
    }

    pub fn read_bill(&self,key:&BillKey) -> anyhow::Result<Bill> {
        let path = self.bill_path(key);
        let file = std::fs::File::open(&path).with_context(||format!("Could not open {}",path.display()))?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }
}

impl Sink for JsonSink {
    fn write_bill(&mut self,bill:&Bill) -> anyhow::Result<()> {
        let path = self.bill_path(&bill.key());
        debug!("Writing {}",path.display());
        persist_atomically(&path,&serde_json::to_vec_pretty(bill)?)
    }

    fn write_legislator(&mut self,legislator:&Legislator) -> anyhow::Result<()> {
        let path = self.legislator_path(&legislator.key());
        debug!("Writing {}",path.display());
        persist_atomically(&path,&serde_json::to_vec_pretty(legislator)?)
    }

    fn write_metadata(&mut self,metadata:&StateMetadata) -> anyhow::Result<()> {
        write_metadata_file(&self.dir,metadata)
    }
}
