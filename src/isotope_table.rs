//! The isotope abundance table: an immutable, read-only mapping from
//! element symbol to its ordered natural-abundance vector.
use std::collections::HashMap;
use std::fmt::{self, Display};
use std::sync::LazyLock;

use fnv::FnvBuildHasher;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const SUM_TOLERANCE: f64 = 1e-9;

/// Bundled natural-abundance table covering the elements common to
/// metabolomics formulas. See `data/isotopes.tsv`.
static DEFAULT_TABLE_SOURCE: &str = include_str!("../data/isotopes.tsv");

/// The default isotope table, parsed once on first use.
pub static DEFAULT_ISOTOPE_TABLE: LazyLock<IsotopeTable> = LazyLock::new(|| {
    crate::io::parse_isotope_table_tsv(DEFAULT_TABLE_SOURCE.as_bytes())
        .expect("bundled data/isotopes.tsv must be well-formed")
});

#[derive(Debug)]
pub enum IsotopeTableError {
    EmptyVector { symbol: String },
    NegativeAbundance { symbol: String, index: usize, value: f64 },
    SumNotOne { symbol: String, sum: f64 },
}

impl Display for IsotopeTableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyVector { symbol } => {
                write!(f, "element {symbol:?} has an empty abundance vector")
            }
            Self::NegativeAbundance { symbol, index, value } => write!(
                f,
                "element {symbol:?} has a negative abundance {value} at index {index}"
            ),
            Self::SumNotOne { symbol, sum } => write!(
                f,
                "element {symbol:?} abundance vector sums to {sum}, expected 1.0 within tolerance"
            ),
        }
    }
}

impl std::error::Error for IsotopeTableError {}

impl From<IsotopeTableError> for crate::error::CorrectionError {
    fn from(value: IsotopeTableError) -> Self {
        crate::error::CorrectionError::IsotopeTableInvalid {
            reason: value.to_string(),
        }
    }
}

/// A read-only mapping `{element symbol -> isotope abundance vector}`.
///
/// Immutable after construction (no setters), and `Sync` + `Send`, so a
/// single table can be shared by `&` reference across worker threads
/// running [`crate::correct::correct`] in parallel.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IsotopeTable {
    abundances: HashMap<String, Vec<f64>, FnvBuildHasher>,
}

impl IsotopeTable {
    /// Validate and wrap a set of `(symbol, abundance vector)` pairs.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self, IsotopeTableError>
    where
        I: IntoIterator<Item = (S, Vec<f64>)>,
        S: Into<String>,
    {
        let mut abundances = HashMap::default();
        for (symbol, vector) in pairs {
            let symbol = symbol.into();
            validate_abundance_vector(&symbol, &vector)?;
            abundances.insert(symbol, vector);
        }
        Ok(Self { abundances })
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.abundances.contains_key(symbol)
    }

    pub fn get(&self, symbol: &str) -> Option<&[f64]> {
        self.abundances.get(symbol).map(Vec::as_slice)
    }

    /// The length of `symbol`'s abundance vector, i.e. `k_e`. Panics-free:
    /// returns `None` for an unknown symbol (callers must have already
    /// validated the formula against this table).
    pub fn isotope_count(&self, symbol: &str) -> Option<usize> {
        self.abundances.get(symbol).map(Vec::len)
    }

    pub fn len(&self) -> usize {
        self.abundances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.abundances.is_empty()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.abundances.keys().map(String::as_str)
    }
}

pub(crate) fn validate_abundance_vector(symbol: &str, vector: &[f64]) -> Result<(), IsotopeTableError> {
    if vector.is_empty() {
        return Err(IsotopeTableError::EmptyVector {
            symbol: symbol.to_string(),
        });
    }
    for (index, &value) in vector.iter().enumerate() {
        if value < 0.0 {
            return Err(IsotopeTableError::NegativeAbundance {
                symbol: symbol.to_string(),
                index,
                value,
            });
        }
    }
    let sum: f64 = vector.iter().sum();
    if (sum - 1.0).abs() > SUM_TOLERANCE {
        return Err(IsotopeTableError::SumNotOne {
            symbol: symbol.to_string(),
            sum,
        });
    }
    Ok(())
}
