use std::collections::HashMap;
use std::fmt;

/// One concatenation segment of a field value.
///
/// BibTeX joins value segments with `#`, e.g.
/// `month = jan # "~1st"`. The original framing of every segment is
/// preserved so an entry can be re-serialized faithfully; use
/// [`FieldValue::flattened`] for the normalized text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValuePart {
    /// A `{...}` literal; inner brace pairs are kept verbatim.
    Braced(String),
    /// A `"..."` literal.
    Quoted(String),
    /// A bare numeric literal, e.g. `1973`.
    Number(String),
    /// A reference to an `@string` macro. `expansion` holds the
    /// macro's value if it was defined before the point of use.
    Macro {
        name: String,
        expansion: Option<String>,
    },
}

impl ValuePart {
    /// The text this part contributes to the flattened value. An
    /// unresolved macro contributes its literal name.
    pub fn text(&self) -> &str {
        match self {
            Self::Braced(text) | Self::Quoted(text) | Self::Number(text) => text,
            Self::Macro { name, expansion } => expansion.as_deref().unwrap_or(name),
        }
    }
}

impl fmt::Display for ValuePart {
    /// Re-emits the part with its original framing.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Braced(text) => write!(f, "{{{text}}}"),
            Self::Quoted(text) => write!(f, "\"{text}\""),
            Self::Number(text) => write!(f, "{text}"),
            Self::Macro { name, .. } => write!(f, "{name}"),
        }
    }
}

/// The value of one field: an ordered sequence of parts joined by `#`.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct FieldValue {
    pub parts: Vec<ValuePart>,
}

impl FieldValue {
    /// The normalized string form used for comparison and validation:
    /// all parts concatenated, macros replaced by their expansion
    /// where one was available.
    pub fn flattened(&self) -> String {
        let mut out = String::new();
        for part in &self.parts {
            out.push_str(part.text());
        }
        out
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                write!(f, " # ")?;
            }
            write!(f, "{part}")?;
        }
        Ok(())
    }
}

/// One entry in a `.bib` file
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    /// entry type, canonicalized to lowercase, e.g. “article”
    pub kind: String,
    /// citation key (case-sensitive), e.g. “DBLP:books/lib/Knuth97”
    pub id: String,
    /// map of lowercase field names to values, e.g. “author” mapped to
    /// the value “Donald Ervin Knuth”
    pub fields: HashMap<String, FieldValue>,
}

impl Entry {
    /// Looks up a field by name, case-insensitively.
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(&name.to_lowercase())
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Re-emits the entry as BibTeX text, keeping every value's
    /// original framing. Field order follows map iteration order.
    pub fn to_bib_string(&self) -> String {
        let mut out = format!("@{}{{{},\n", self.kind, self.id);
        for (name, value) in &self.fields {
            out.push_str(&format!("  {name} = {value},\n"));
        }
        out.push('}');
        out
    }
}

/// The kind of a non-fatal finding recorded while building the model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum DiagnosticKind {
    /// a single mandatory field of the entry's type is absent
    MissingMandatoryField,
    /// none of a group of alternative mandatory fields is present
    MissingMandatoryFieldGroup,
    /// a citation key was defined a second time; the first definition
    /// was kept
    DuplicateKey,
    /// a value referenced a macro that was not (yet) defined
    UnresolvedMacro,
}

/// A non-fatal finding attached to a successful parse. Diagnostics are
/// collected, never thrown; the caller decides whether to surface,
/// ignore or escalate them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// citation key (or macro/preamble label) the finding concerns
    pub entry: String,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// The parsed model of one `.bib` source: entries in file order plus an
/// index from citation key to entry.
#[derive(Clone, Debug, Default)]
pub struct Bibliography {
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
    preambles: Vec<FieldValue>,
}

impl Bibliography {
    pub(crate) fn insert(&mut self, entry: Entry) {
        self.index.insert(entry.id.clone(), self.entries.len());
        self.entries.push(entry);
    }

    pub(crate) fn push_preamble(&mut self, value: FieldValue) {
        self.preambles.push(value);
    }

    /// Looks up an entry by its citation key (case-sensitive).
    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.index.get(key).and_then(|&i| self.entries.get(i))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Iterates over entries in file order.
    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `@preamble` values in file order, passed through unvalidated.
    pub fn preambles(&self) -> &[FieldValue] {
        &self.preambles
    }

    /// Groups entries by entry type. Computed on demand; the groups
    /// preserve file order.
    pub fn group_by_kind(&self) -> HashMap<&str, Vec<&Entry>> {
        let mut groups: HashMap<&str, Vec<&Entry>> = HashMap::new();
        for entry in &self.entries {
            groups.entry(entry.kind.as_str()).or_default().push(entry);
        }
        groups
    }

    /// Re-emits the whole bibliography as BibTeX text.
    pub fn to_bib_string(&self) -> String {
        let mut blocks = Vec::new();
        for preamble in &self.preambles {
            blocks.push(format!("@preamble{{{preamble}}}"));
        }
        for entry in &self.entries {
            blocks.push(entry.to_bib_string());
        }
        blocks.join("\n\n")
    }
}

impl<'b> IntoIterator for &'b Bibliography {
    type Item = &'b Entry;
    type IntoIter = std::slice::Iter<'b, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
