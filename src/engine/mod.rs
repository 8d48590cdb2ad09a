//! The extraction engine: path resolution, field extraction and record
//! assembly over a parsed HTML document.
//!
//! Everything in here is a pure function over an immutable
//! [`scraper::Html`]; there is no I/O and no shared state, so each stage can
//! be exercised directly against an HTML fixture.
//!
//! # Stages
//!
//! | Stage | Module | Input | Output |
//! |-------|--------|-------|--------|
//! | Path Resolver | [`resolve`] | element + `[PathStep]` | element or nothing |
//! | Field Extractor | [`field`] | element or nothing + `ExtractKind` | string or null |
//! | Record Builder | [`builder`] | document + `ScrapeConfig` | `Vec<Record>` |

pub mod builder;
pub mod field;
pub mod resolve;

pub use builder::{build, find_containers};
