//! External-collaborator contracts: TSV parsing for isotope tables and
//! metabolite/derivative flat-file databases, and the shape of a single
//! measurement record. Nothing in this module participates in the
//! correction math; it exists so front-ends (out of scope for this crate)
//! and [`crate::batch`] have real types to call into.
use std::collections::HashMap;
use std::fmt::{self, Display};
use std::fs;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use fnv::FnvBuildHasher;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::isotope_table::{IsotopeTable, IsotopeTableError};

#[derive(Debug)]
pub enum IoError {
    Read(String),
    MalformedRow { line: usize, content: String },
    MissingField { line: usize, field: &'static str },
    InvalidIsotopeTable(IsotopeTableError),
}

impl Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read(msg) => write!(f, "failed to read input: {msg}"),
            Self::MalformedRow { line, content } => {
                write!(f, "malformed row at line {line}: {content:?}")
            }
            Self::MissingField { line, field } => {
                write!(f, "row at line {line} is missing required field {field:?}")
            }
            Self::InvalidIsotopeTable(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for IoError {}

impl From<IsotopeTableError> for IoError {
    fn from(value: IsotopeTableError) -> Self {
        Self::InvalidIsotopeTable(value)
    }
}

/// Parse a tab-separated isotope table: each non-blank line is `symbol
/// <TAB> abundance_0 <TAB> abundance_1 ...`. Lines starting with `#` are
/// treated as comments, mirroring how the bundled default table documents
/// itself.
pub fn parse_isotope_table_tsv<R: Read>(reader: R) -> Result<IsotopeTable, IoError> {
    let mut pairs = Vec::new();
    for (lineno, line) in BufReader::new(reader).lines().enumerate() {
        let line = line.map_err(|e| IoError::Read(e.to_string()))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let mut fields = trimmed.split('\t');
        let symbol = fields
            .next()
            .ok_or_else(|| IoError::MalformedRow {
                line: lineno + 1,
                content: line.clone(),
            })?
            .to_string();
        let abundances: Vec<f64> = fields
            .map(|value| {
                value.trim().parse::<f64>().map_err(|_| IoError::MalformedRow {
                    line: lineno + 1,
                    content: line.clone(),
                })
            })
            .collect::<Result<_, _>>()?;
        pairs.push((symbol, abundances));
    }
    IsotopeTable::from_pairs(pairs).map_err(IoError::from)
}

pub fn load_isotope_table_tsv(path: impl AsRef<Path>) -> Result<IsotopeTable, IoError> {
    let file = fs::File::open(path).map_err(|e| IoError::Read(e.to_string()))?;
    parse_isotope_table_tsv(file)
}

/// One entry of a metabolite or derivative database: `name`, `formula`, and
/// optional `charge`/`inchi`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DatabaseEntry {
    pub name: String,
    pub formula: String,
    pub charge: Option<i32>,
    pub inchi: Option<String>,
}

/// A metabolite or derivative flat-file database, keyed by name.
///
/// Lookup is case-sensitive; later rows with the same name override earlier
/// ones, which falls out for free from `HashMap::insert`.
#[derive(Debug, Clone, Default)]
pub struct MetaboliteDatabase {
    entries: HashMap<String, DatabaseEntry, FnvBuildHasher>,
}

impl MetaboliteDatabase {
    pub fn get(&self, name: &str) -> Option<&DatabaseEntry> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parse a tab-separated metabolite/derivative database: `name`, `formula`,
/// optionally `charge`, `inchi`, in that column order. A header row is
/// tolerated by skipping any row whose `name` field is literally `name`.
pub fn parse_database_tsv<R: Read>(reader: R) -> Result<MetaboliteDatabase, IoError> {
    let mut entries = HashMap::default();
    for (lineno, line) in BufReader::new(reader).lines().enumerate() {
        let line = line.map_err(|e| IoError::Read(e.to_string()))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let mut fields = trimmed.split('\t');
        let name = fields
            .next()
            .ok_or_else(|| IoError::MissingField {
                line: lineno + 1,
                field: "name",
            })?
            .to_string();
        if name == "name" {
            continue; // header row
        }
        let formula = fields
            .next()
            .ok_or_else(|| IoError::MissingField {
                line: lineno + 1,
                field: "formula",
            })?
            .to_string();
        let charge = fields.next().filter(|s| !s.is_empty()).and_then(|s| s.parse().ok());
        let inchi = fields.next().filter(|s| !s.is_empty()).map(str::to_string);

        entries.insert(
            name.clone(),
            DatabaseEntry {
                name,
                formula,
                charge,
                inchi,
            },
        );
    }
    Ok(MetaboliteDatabase { entries })
}

pub fn load_metabolite_database_tsv(path: impl AsRef<Path>) -> Result<MetaboliteDatabase, IoError> {
    let file = fs::File::open(path).map_err(|e| IoError::Read(e.to_string()))?;
    parse_database_tsv(file)
}

/// The shape of a single fit's input: a metabolite formula, an optional
/// derivative formula, the measured intensities, the tracer element, its
/// purity vector, and the correction flags. This is the unit of work
/// [`crate::batch::correct_batch`] iterates over.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MeasurementRecord {
    pub metabolite_formula: String,
    pub derivative_formula: String,
    pub v_measured: Vec<f64>,
    pub tracer_element: String,
    pub purity: Vec<f64>,
    pub exclude_tracer_natab: bool,
    pub want_mean_enrichment: bool,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_isotope_table_skipping_comments_and_blanks() {
        let src = "# comment\nC\t0.9893\t0.0107\n\nH\t1.0\n";
        let table = parse_isotope_table_tsv(src.as_bytes()).unwrap();
        assert!(table.contains("C"));
        assert!(table.contains("H"));
    }

    #[test]
    fn rejects_malformed_isotope_row() {
        let src = "C\tnot-a-number\n";
        let err = parse_isotope_table_tsv(src.as_bytes()).unwrap_err();
        assert!(matches!(err, IoError::MalformedRow { .. }));
    }

    #[test]
    fn duplicate_names_override_earlier_rows() {
        let src = "name\tformula\nGlc\tC6H12O6\nGlc\tC6H12O6N1\n";
        let db = parse_database_tsv(src.as_bytes()).unwrap();
        assert_eq!(db.len(), 1);
        assert_eq!(db.get("Glc").unwrap().formula, "C6H12O6N1");
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let src = "Glc\tC6H12O6\n";
        let db = parse_database_tsv(src.as_bytes()).unwrap();
        assert!(db.get("glc").is_none());
        assert!(db.get("Glc").is_some());
    }

    #[test]
    fn parses_optional_charge_and_inchi() {
        let src = "Glc\tC6H12O6\t-1\tINCHI=XYZ\n";
        let db = parse_database_tsv(src.as_bytes()).unwrap();
        let entry = db.get("Glc").unwrap();
        assert_eq!(entry.charge, Some(-1));
        assert_eq!(entry.inchi.as_deref(), Some("INCHI=XYZ"));
    }
}
