// ucdx-core/src/lib.rs
//
// Parser for the UCD text format: a line-oriented grammar of `#` header
// directives, `@` segment markers, and semicolon-delimited data rows. The
// parser is pure and synchronous; fetching and caching live in ucdx-net.

pub mod parser;

pub use parser::parse;
pub use ucdx_common::error::ParseError;
pub use ucdx_common::model::{Entry, Field, FieldDef, UcdFile};
