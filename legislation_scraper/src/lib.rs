//! Scrapers for state legislature websites, producing bills and legislators in one common format.

pub mod error;
pub mod chamber;
pub mod dates;
pub mod bill;
pub mod legislator;
pub mod metadata;
pub mod config;
pub mod fetch;
mod parse_util;
pub mod adapter;
pub mod builder;
pub mod name_matcher;
pub mod sink;
pub mod json_sink;
pub mod csv_sink;
pub mod driver;
pub mod cli;
pub mod parse_wisconsin;
pub mod parse_new_jersey;
