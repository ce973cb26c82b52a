//! This crate parses BibTeX bibliography files into a structured,
//! queryable in-memory model, in pure, safe Rust.
//!
//! `.bib` files are popular in reference management since many resources
//! allow to export metadata in a BibTeX file. One entry in such a file
//! can look like this:
//!
//! ```tex
//! @book{DBLP:books/aw/Knuth73a,
//!     author    = {Donald E. Knuth},
//!     title     = {The Art of Computer Programming, Volume {I:} Fundamental Algorithms,
//!                  2nd Edition},
//!     publisher = {Addison-Wesley},
//!     year      = {1973},
//! }
//! ```
//!
//! In this example, we call `book` the entry type (`kind`) and
//! `DBLP:books/aw/Knuth73a` the citation key (`id`). Then we have a
//! sequence of fields with a name (like `year`) and a value (like
//! `1973`). The formal grammar is not well-specified, but
//! [Tame the BeaST](https://ftp.rrze.uni-erlangen.de/ctan/info/bibtex/tamethebeast/ttb_en.pdf)
//! provides some insights.
//!
//! The API is a single one-shot call: [`parse`] takes the full source
//! text and returns the [`Bibliography`] together with non-fatal
//! [`Diagnostic`]s (schema gaps, duplicate citation keys, unresolved
//! `@string` macros). Malformed input aborts with a positioned
//! [`ParseError`] instead; no partial model is ever returned.
//!
//! ```rust
//! use bibliograph::parse;
//!
//! fn main() -> Result<(), bibliograph::ParseError> {
//!     let (bibliography, diagnostics) = parse(r#"
//!         @string{aw = "Addison-Wesley"}
//!         @book{knuth1973,
//!             author    = {Donald E. Knuth},
//!             title     = {The Art of Computer Programming},
//!             publisher = aw,
//!             year      = 1973,
//!         }
//!     "#)?;
//!     let entry = bibliography.get("knuth1973").unwrap();
//!     println!("type = {}", entry.kind);
//!     for (name, value) in entry.fields.iter() {
//!         println!("\t{}\t= {}", name, value.flattened());
//!     }
//!     assert!(diagnostics.is_empty());
//!     Ok(())
//! }
//! ```
//!
//! Field values preserve the original framing of every `#`-joined part
//! (braced, quoted, number or macro reference), so entries can be
//! re-serialized faithfully; `flattened()` gives the normalized text.
//!
//! The entire source is kept in memory and parsed in a single
//! synchronous pass. Loading a file into that buffer is the caller's
//! job (the bundled `cli` example shows one way to do it).

mod errors;
mod lexer;
mod parser;
mod schema;
mod types;

pub use crate::errors::{ParseError, Position};
pub use crate::schema::{mandatory_fields, optional_fields, validate, Requirement};
pub use crate::types::{
    Bibliography, Diagnostic, DiagnosticKind, Entry, FieldValue, ValuePart,
};

/// Parses the contents of one `.bib` source into a [`Bibliography`]
/// plus the non-fatal [`Diagnostic`]s collected along the way.
///
/// The first lexical or structural error aborts the whole parse; see
/// [`ParseError`]. Diagnostics never prevent a bibliography from being
/// produced.
pub fn parse(src: &str) -> Result<(Bibliography, Vec<Diagnostic>), ParseError> {
    parser::parse(src)
}
