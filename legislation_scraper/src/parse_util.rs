//! Utilities shared by the per-state page parsers.

use scraper::{ElementRef, Html, Selector};
use crate::error::ParseError;

/// Resolve a possibly relative `url` against the page it was found on.
pub fn relative_url(base_url:&str,url:&str) -> anyhow::Result<String> {
    let base = url::Url::parse(base_url)?;
    let res = base.join(url)?;
    Ok(res.to_string())
}

/// Parse a CSS selector, turning failure into a [ParseError] rather than a panic.
pub fn selector(selector:&str) -> Result<Selector,ParseError> {
    Selector::parse(selector).map_err(|e|ParseError::BadSelector{ selector: selector.to_string(), reason: format!("{:?}",e) })
}

/// Find the first element matching `selector`, which the page must have.
pub fn root<'a>(html:&'a Html,selector_text:&str) -> Result<ElementRef<'a>,ParseError> {
    html.select(&selector(selector_text)?).next().ok_or_else(||ParseError::missing_root(selector_text))
}

/// All the text inside an element, with runs of whitespace collapsed to a single space.
pub fn element_text(element:&ElementRef) -> String {
    normalize_whitespace(&element.text().collect::<String>())
}

pub fn normalize_whitespace(text:&str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_url() {
        assert_eq!("http://www.legis.state.wi.us/2007/data/SB1.pdf",relative_url("http://www.legis.state.wi.us/2007/data/SB1hst.html","SB1.pdf").unwrap());
        assert_eq!("http://www.njleg.state.nj.us/2006/Bills/A0500/100_I1.HTM",relative_url("http://www.njleg.state.nj.us/bills/BillView.asp","/2006/Bills/A0500/100_I1.HTM").unwrap());
        assert_eq!("https://other.example/x",relative_url("http://www.njleg.state.nj.us/","https://other.example/x").unwrap());
        assert!(relative_url("not a url","x").is_err());
    }

    #[test]
    fn test_root_and_text() {
        let html = Html::parse_document("<html><body><pre>  Some\n   text  here </pre></body></html>");
        let pre = root(&html,"pre").unwrap();
        assert_eq!("Some text here",element_text(&pre));
        assert_eq!(Err(ParseError::missing_root("table.history")),root(&html,"table.history").map(|_|()));
        assert!(matches!(selector("a[["),Err(ParseError::BadSelector{..})));
    }
}
