//! Per-entry-type field schemas.
//!
//! The classic BibTeX entry types each prescribe a set of mandatory and
//! optional fields (see “Tame the BeaST”,
//! <http://ctan.cs.uu.nl/info/bibtex/tamethebeast/ttb_en.pdf>). The
//! tables below reproduce those rules; [`validate`] checks an entry
//! against the mandatory table of its type and reports gaps as
//! diagnostics. Unknown entry types are skipped silently.

use crate::types::{Diagnostic, DiagnosticKind, Entry};

// Field names used by the schema tables. The tables are built from
// these constants so a typo cannot silently introduce a new name.
const ADDRESS: &str = "address";
const AUTHOR: &str = "author";
const BOOKTITLE: &str = "booktitle";
const CHAPTER: &str = "chapter";
const EDITION: &str = "edition";
const EDITOR: &str = "editor";
const HOWPUBLISHED: &str = "howpublished";
const INSTITUTION: &str = "institution";
const JOURNAL: &str = "journal";
const MONTH: &str = "month";
const NOTE: &str = "note";
const NUMBER: &str = "number";
const ORGANIZATION: &str = "organization";
const PAGES: &str = "pages";
const PUBLISHER: &str = "publisher";
const SCHOOL: &str = "school";
const SERIES: &str = "series";
const TITLE: &str = "title";
const TYPE: &str = "type";
const VOLUME: &str = "volume";
const YEAR: &str = "year";

/// One row of a schema table: either a single field, or a group
/// satisfied by any one of its alternatives. Groups may nest; a check
/// flattens a group to its field names.
#[derive(Clone, Copy, Debug)]
pub enum Requirement {
    Field(&'static str),
    OneOf(&'static [Requirement]),
}

use Requirement::{Field, OneOf};

impl Requirement {
    /// All field names reachable from this requirement, in table order.
    pub fn field_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        self.collect(&mut names);
        names
    }

    fn collect(&self, out: &mut Vec<&'static str>) {
        match *self {
            Field(name) => out.push(name),
            OneOf(alternatives) => {
                for alternative in alternatives {
                    alternative.collect(out);
                }
            }
        }
    }

    fn is_satisfied_by(&self, entry: &Entry) -> bool {
        match *self {
            Field(name) => entry.fields.contains_key(name),
            OneOf(alternatives) => alternatives
                .iter()
                .any(|alternative| alternative.is_satisfied_by(entry)),
        }
    }
}

/// Mandatory fields per (lowercase) entry type. `None` for types
/// unknown to the classic schema.
pub fn mandatory_fields(kind: &str) -> Option<&'static [Requirement]> {
    Some(match kind {
        "article" => &[Field(AUTHOR), Field(TITLE), Field(YEAR), Field(JOURNAL)],
        "book" => &[
            OneOf(&[Field(AUTHOR), Field(EDITOR)]),
            Field(TITLE),
            Field(PUBLISHER),
            Field(YEAR),
        ],
        "booklet" => &[Field(TITLE)],
        "conference" | "inproceedings" => &[
            Field(AUTHOR),
            Field(TITLE),
            Field(BOOKTITLE),
            Field(YEAR),
        ],
        "inbook" => &[
            OneOf(&[Field(AUTHOR), Field(EDITOR)]),
            Field(TITLE),
            OneOf(&[Field(CHAPTER), Field(PAGES)]),
        ],
        "incollection" => &[
            Field(AUTHOR),
            Field(TITLE),
            Field(BOOKTITLE),
            Field(PUBLISHER),
            Field(YEAR),
        ],
        "manual" => &[Field(TITLE)],
        "mastersthesis" | "phdthesis" => &[
            Field(AUTHOR),
            Field(TITLE),
            Field(SCHOOL),
            Field(YEAR),
        ],
        "misc" => &[OneOf(&[
            Field(AUTHOR),
            Field(TITLE),
            Field(HOWPUBLISHED),
            Field(YEAR),
            Field(MONTH),
            Field(NOTE),
        ])],
        "proceedings" => &[Field(YEAR), Field(TITLE)],
        "techreport" => &[
            Field(AUTHOR),
            Field(TITLE),
            Field(INSTITUTION),
            Field(YEAR),
        ],
        "unpublished" => &[Field(AUTHOR), Field(TITLE), Field(NOTE)],
        _ => return None,
    })
}

/// Optional fields per (lowercase) entry type. Queryable data for
/// downstream tooling; validation never consults this table.
pub fn optional_fields(kind: &str) -> Option<&'static [Requirement]> {
    Some(match kind {
        "book" => &[
            OneOf(&[Field(VOLUME), Field(NUMBER)]),
            Field(SERIES),
            Field(ADDRESS),
            Field(EDITION),
            Field(MONTH),
            Field(NOTE),
        ],
        "booklet" => &[
            Field(AUTHOR),
            Field(HOWPUBLISHED),
            Field(ADDRESS),
            Field(MONTH),
            Field(YEAR),
            Field(NOTE),
        ],
        "conference" | "inproceedings" => &[
            Field(EDITOR),
            OneOf(&[Field(VOLUME), Field(NUMBER)]),
            Field(SERIES),
            Field(PAGES),
            Field(ADDRESS),
            Field(MONTH),
            Field(ORGANIZATION),
            Field(PUBLISHER),
            Field(NOTE),
        ],
        "inbook" => &[
            Field(VOLUME),
            Field(NUMBER),
            Field(SERIES),
            Field(TYPE),
            Field(ADDRESS),
            Field(EDITION),
            Field(MONTH),
            Field(NOTE),
        ],
        "incollection" => &[
            Field(EDITOR),
            OneOf(&[Field(VOLUME), Field(NUMBER)]),
            Field(SERIES),
            Field(TYPE),
            Field(CHAPTER),
            Field(PAGES),
            Field(ADDRESS),
            Field(EDITION),
            Field(MONTH),
            Field(NOTE),
        ],
        "manual" => &[
            Field(AUTHOR),
            Field(ORGANIZATION),
            Field(YEAR),
            Field(ADDRESS),
            Field(EDITION),
            Field(MONTH),
            Field(NOTE),
        ],
        "mastersthesis" | "phdthesis" => &[
            Field(TYPE),
            Field(ADDRESS),
            Field(MONTH),
            Field(NOTE),
        ],
        "misc" => &[],
        "proceedings" => &[
            Field(EDITOR),
            OneOf(&[Field(VOLUME), Field(NUMBER)]),
            Field(SERIES),
            Field(ADDRESS),
            Field(MONTH),
            Field(ORGANIZATION),
            Field(PUBLISHER),
            Field(NOTE),
        ],
        "techreport" => &[
            Field(TYPE),
            Field(ADDRESS),
            Field(NUMBER),
            Field(MONTH),
            Field(NOTE),
        ],
        "unpublished" => &[Field(MONTH), Field(YEAR)],
        _ => return None,
    })
}

/// Checks an entry's fields against the mandatory table of its type.
/// Purely additive: returns diagnostics, never rejects or mutates the
/// entry. Types absent from the table validate as a no-op.
pub fn validate(entry: &Entry) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let requirements = match mandatory_fields(&entry.kind) {
        Some(requirements) => requirements,
        None => return diagnostics,
    };

    for requirement in requirements {
        if requirement.is_satisfied_by(entry) {
            continue;
        }
        match requirement {
            Field(name) => diagnostics.push(Diagnostic {
                kind: DiagnosticKind::MissingMandatoryField,
                entry: entry.id.clone(),
                message: format!(
                    "expected {} entry '{}' to have the field '{}'",
                    entry.kind, entry.id, name
                ),
            }),
            group @ OneOf(_) => diagnostics.push(Diagnostic {
                kind: DiagnosticKind::MissingMandatoryFieldGroup,
                entry: entry.id.clone(),
                message: format!(
                    "expected {} entry '{}' to have one of the following fields: {}",
                    entry.kind,
                    entry.id,
                    group.field_names().join(", ")
                ),
            }),
        }
    }
    diagnostics
}
