//! mf-parser: transformation URL grammar for mediaforge.
//!
//! Turns a request path into an asset identifier plus an ordered chain of
//! typed transformation specs.
//!
//! # Quick start
//!
//! ```
//! let parsed = mf_parser::parse("/image/upload/c_fill,w_200,h_200/photo.jpg").unwrap();
//! assert_eq!(parsed.domain(), Some("image"));
//! assert_eq!(parsed.public_id(), "photo.jpg");
//!
//! let spec = &parsed.chain().specs()[0];
//! assert_eq!(spec.kind(), "c_fill");
//! assert_eq!(spec.params().number("w"), Some(200.0));
//! ```

pub mod coerce;
pub mod grammar;

pub use coerce::coerce;
pub use grammar::{parse, ParsedUrl, DELIMITER};
