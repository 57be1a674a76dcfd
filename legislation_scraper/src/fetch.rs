//! Getting pages from state websites.
//!
//! A [Fetcher] owns one HTTP client, and with it one cookie jar, for the duration of a run.
//! Some sites (New Jersey) need a session-establishing POST before detail pages work, so
//! the cookie jar must not be shared between runs for different states.
//!
//! GET responses may be cached on disk between runs, one JSON file per request holding the
//! decoded body and the URL it finally came from. The fetcher never retries. Whether
//! a failure is worth retrying is up to the driver.

use std::fmt;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use rand::Rng;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};
use crate::config::Config;
use crate::error::FetchError;

#[derive(Debug,Clone,Copy,Eq,PartialEq)]
pub enum Method {
    Get,
    Post,
}

/// A description of a page to get. Form fields are only sent for POST.
#[derive(Debug,Clone,Eq,PartialEq)]
pub struct PageRequest {
    pub method : Method,
    pub url : String,
    pub form : Vec<(String,String)>,
}

impl PageRequest {
    pub fn get(url:impl Into<String>) -> Self {
        PageRequest{ method: Method::Get, url: url.into(), form: vec![] }
    }
    pub fn post(url:impl Into<String>,form:&[(&str,&str)]) -> Self {
        PageRequest{ method: Method::Post, url: url.into(), form: form.iter().map(|(k,v)|(k.to_string(),v.to_string())).collect() }
    }

    /// A stable key for the page cache.
    fn cache_key(&self) -> String {
        let mut hasher = Sha256::default();
        hasher.update(self.to_string().as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl fmt::Display for PageRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.method {
            Method::Get => write!(f, "GET {}", self.url),
            Method::Post => {
                let form = self.form.iter().map(|(k,v)|format!("{}={}",k,v)).collect::<Vec<_>>().join("&");
                write!(f, "POST {} [{}]", self.url, form)
            }
        }
    }
}

/// A fetched page, decoded to text.
#[derive(Serialize,Deserialize,Debug,Clone,Eq,PartialEq)]
pub struct Page {
    /// The URL the content actually came from, after redirects. Relative links resolve against this.
    pub url : String,
    pub body : String,
}

/// Anything that can produce pages. [Fetcher] goes to the network; tests use canned pages.
pub trait PageSource {
    fn fetch(&mut self,request:&PageRequest) -> Result<Page,FetchError>;
}

/// Every this many requests, take a longer break when being polite.
const LONG_SLEEP_EVERY : u32 = 50;

pub struct Fetcher {
    client : Client,
    cache_dir : Option<PathBuf>,
    sleep : bool,
    requests : u32,
}

impl Fetcher {
    pub fn new(config:&Config) -> anyhow::Result<Fetcher> {
        let client = Client::builder()
            .cookie_store(true)
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let cache_dir = if config.no_cache { None } else { config.cache_dir.clone() };
        if let Some(dir) = &cache_dir { std::fs::create_dir_all(dir)?; }
        Ok(Fetcher{ client, cache_dir, sleep: config.sleep, requests: 0 })
    }

    /// Only GETs are cached. A POST may change server side session state, and what it
    /// returns may depend on earlier POSTs made with the same cookies.
    fn cache_path(&self,request:&PageRequest) -> Option<PathBuf> {
        if request.method!=Method::Get { return None; }
        self.cache_dir.as_ref().map(|dir|dir.join(request.cache_key()+".json"))
    }

    /// The cached page for a request, if there is a readable one.
    fn from_cache(&self,request:&PageRequest) -> Option<Page> {
        let path = self.cache_path(request)?;
        let contents = std::fs::read(&path).ok()?;
        match serde_json::from_slice::<Page>(&contents) {
            Ok(page) => Some(page),
            Err(e) => {
                warn!("Ignoring unreadable cache file {} : {}",path.display(),e);
                None
            }
        }
    }

    fn store_in_cache(&self,request:&PageRequest,page:&Page) -> anyhow::Result<()> {
        if let (Some(dir),Some(path)) = (&self.cache_dir,self.cache_path(request)) {
            let mut file = NamedTempFile::new_in(dir)?;
            file.write_all(&serde_json::to_vec(page)?)?;
            file.flush()?;
            file.persist(path)?;
        }
        Ok(())
    }

    /// Insert a short random delay before each request and a longer one every so often.
    fn polite_delay(&mut self) {
        if !self.sleep { return; }
        self.requests+=1;
        let mut rng = rand::thread_rng();
        let secs = if self.requests>=LONG_SLEEP_EVERY {
            self.requests=0;
            rng.gen_range(10.0..15.0)
        } else { rng.gen_range(1.0..4.0) };
        debug!("Sleeping {:.1} seconds",secs);
        std::thread::sleep(Duration::from_secs_f64(secs));
    }

    fn fetch_from_network(&mut self,request:&PageRequest) -> Result<Page,FetchError> {
        self.polite_delay();
        info!("Retrieving {}",request);
        let builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url).form(&request.form),
        };
        let to_fetch_error = |e:reqwest::Error| FetchError::new(&request.url,e.status().map(|s|s.as_u16()),e.to_string());
        let response = builder.send().map_err(to_fetch_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(&request.url,Some(status.as_u16()),status.canonical_reason().unwrap_or("unsuccessful response")));
        }
        let url = response.url().to_string();
        let content_type = response.headers().get(CONTENT_TYPE).and_then(|v|v.to_str().ok()).map(|s|s.to_string());
        let bytes = response.bytes().map_err(to_fetch_error)?;
        if bytes.is_empty() {
            return Err(FetchError::new(&request.url,Some(status.as_u16()),"empty body"));
        }
        Ok(Page{ url, body: decode_body(&bytes,content_type.as_deref()) })
    }
}

impl PageSource for Fetcher {
    fn fetch(&mut self,request:&PageRequest) -> Result<Page,FetchError> {
        if let Some(page) = self.from_cache(request) {
            debug!("Getting {} from cache",request);
            return Ok(page);
        }
        let page = self.fetch_from_network(request)?;
        if let Err(e) = self.store_in_cache(request,&page) {
            warn!("Could not cache {} : {}",request,e);
        }
        Ok(page)
    }
}

/// Decode a response body. Use the declared charset if there is one; otherwise UTF-8 if
/// it is valid, and windows-1252 (a superset of the Latin-1 many legacy sites use) if not.
pub fn decode_body(bytes:&[u8],content_type:Option<&str>) -> String {
    let declared = content_type
        .and_then(|ct|ct.split(';').find_map(|part|{
            let (name,value) = part.split_once('=')?;
            if name.trim().eq_ignore_ascii_case("charset") { Some(value.trim().trim_matches('"').to_string()) } else { None }
        }))
        .and_then(|label|encoding_rs::Encoding::for_label(label.as_bytes()));
    if let Some(encoding) = declared {
        return encoding.decode(bytes).0.into_owned();
    }
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_body() {
        assert_eq!("caf\u{e9}",decode_body("caf\u{e9}".as_bytes(),None));
        assert_eq!("caf\u{e9}",decode_body(b"caf\xe9",None)); // Latin-1 without a declared charset
        assert_eq!("caf\u{e9}",decode_body(b"caf\xe9",Some("text/html; charset=ISO-8859-1")));
        assert_eq!("caf\u{e9}",decode_body("caf\u{e9}".as_bytes(),Some("text/html; charset=\"utf-8\"")));
        assert_eq!("caf\u{e9}",decode_body(b"caf\xe9",Some("text/html; Charset=ISO-8859-1")));
        assert_eq!("caf\u{e9}",decode_body(b"caf\xe9",Some("text/html;CHARSET = iso-8859-1")));
        assert_eq!("caf\u{e9}",decode_body(b"caf\xe9",Some("text/html; boundary=x")));
    }

    /// Nothing listens on the discard port, so anything that reaches the network fails fast.
    const UNREACHABLE : &str = "http://127.0.0.1:9/bills";

    fn fetcher(cache_dir:&std::path::Path,no_cache:bool) -> Fetcher {
        let config = Config{ cache_dir: Some(cache_dir.to_path_buf()), no_cache, sleep: false, timeout_secs: 1, ..Config::default() };
        Fetcher::new(&config).unwrap()
    }

    /// Put a page in the cache as if an earlier run had fetched it.
    fn seed(fetcher:&Fetcher,request:&PageRequest,page:&Page) {
        fetcher.store_in_cache(request,page).unwrap();
    }

    #[test]
    fn test_cached_get_keeps_final_url() {
        let dir = tempfile::tempdir().unwrap();
        let mut fetcher = fetcher(dir.path(),false);
        let request = PageRequest::get(UNREACHABLE);
        let page = Page{ url: "http://127.0.0.1:9/bills/index.html".to_string(), body: "<html>cached</html>".to_string() };
        seed(&fetcher,&request,&page);
        assert_eq!(page,fetcher.fetch(&request).unwrap());
        assert_eq!(page,fetcher.fetch(&request).unwrap());
        // a different page is not in the cache
        assert!(fetcher.fetch(&PageRequest::get("http://127.0.0.1:9/other")).is_err());
    }

    #[test]
    fn test_unreadable_cache_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let mut fetcher = fetcher(dir.path(),false);
        let request = PageRequest::get(UNREACHABLE);
        std::fs::write(fetcher.cache_path(&request).unwrap(),"not json").unwrap();
        assert!(fetcher.fetch(&request).is_err());
    }

    #[test]
    fn test_post_is_never_cached() {
        let dir = tempfile::tempdir().unwrap();
        let mut fetcher = fetcher(dir.path(),false);
        let request = PageRequest::post(UNREACHABLE,&[("GoToPage","1")]);
        assert_eq!(None,fetcher.cache_path(&request));
        let path = dir.path().join(request.cache_key()+".json");
        std::fs::write(&path,serde_json::to_vec(&Page{ url: UNREACHABLE.to_string(), body: "stale".to_string() }).unwrap()).unwrap();
        assert!(fetcher.fetch(&request).is_err());
    }

    #[test]
    fn test_no_cache_goes_to_the_network() {
        let dir = tempfile::tempdir().unwrap();
        let request = PageRequest::get(UNREACHABLE);
        seed(&fetcher(dir.path(),false),&request,&Page{ url: UNREACHABLE.to_string(), body: "cached".to_string() });
        let mut uncached = fetcher(dir.path(),true);
        assert_eq!(None,uncached.cache_path(&request));
        assert!(uncached.fetch(&request).is_err());
        // and the cache is still there for a run that wants it
        assert_eq!("cached",fetcher(dir.path(),false).fetch(&request).unwrap().body);
    }

    #[test]
    fn test_request_display_and_cache_key() {
        let get = PageRequest::get("http://www.njleg.state.nj.us/");
        let post = PageRequest::post("http://www.njleg.state.nj.us/bills/bills0001.asp",&[("DBNAME","LIS2006")]);
        assert_eq!("GET http://www.njleg.state.nj.us/",get.to_string());
        assert_eq!("POST http://www.njleg.state.nj.us/bills/bills0001.asp [DBNAME=LIS2006]",post.to_string());
        assert_ne!(get.cache_key(),post.cache_key());
        assert_eq!(64,post.cache_key().len());
        let other_db = PageRequest::post("http://www.njleg.state.nj.us/bills/bills0001.asp",&[("DBNAME","LIS2008")]);
        assert_ne!(post.cache_key(),other_db.cache_key());
    }
}
