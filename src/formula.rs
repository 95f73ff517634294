//! Elemental formula parsing.
//!
//! Grammar: one or more occurrences of an element symbol (one uppercase
//! letter optionally followed by one lowercase letter) followed by an
//! optional decimal integer count (absent means 1). Whitespace is not
//! significant. No parenthesized groups, no isotope selectors - the
//! correction core only ever sees flat atom counts.
use std::collections::HashMap;
use std::fmt::{self, Display};

use fnv::FnvBuildHasher;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::isotope_table::IsotopeTable;

/// A parsed elemental formula: element symbol -> atom count.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ElementCounts {
    counts: HashMap<String, u32, FnvBuildHasher>,
}

impl ElementCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// The atom count for `symbol`, or 0 if the formula doesn't mention it.
    pub fn get(&self, symbol: &str) -> u32 {
        self.counts.get(symbol).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.counts.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    fn add(&mut self, symbol: &str, count: u32) {
        *self.counts.entry(symbol.to_string()).or_insert(0) += count;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParserState {
    New,
    /// Just consumed the symbol's uppercase letter; a lowercase letter may follow.
    SymbolHead,
    /// Consumed the optional lowercase letter; only a count/new-token/end may follow.
    SymbolTail,
    Count,
}

#[derive(Debug)]
pub enum FormulaParserError {
    /// A token did not start with an uppercase letter, or digits appeared
    /// before any element symbol.
    MalformedFormula { formula: String },
    /// A token's symbol is not present in the isotope table.
    UnknownElement { symbol: String },
}

impl Display for FormulaParserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedFormula { formula } => {
                write!(f, "malformed formula {formula:?}")
            }
            Self::UnknownElement { symbol } => write!(f, "unknown element {symbol:?}"),
        }
    }
}

impl std::error::Error for FormulaParserError {}

impl From<FormulaParserError> for crate::error::CorrectionError {
    fn from(value: FormulaParserError) -> Self {
        match value {
            FormulaParserError::MalformedFormula { formula } => {
                crate::error::CorrectionError::MalformedFormula { formula }
            }
            FormulaParserError::UnknownElement { symbol } => {
                crate::error::CorrectionError::UnknownElement { symbol }
            }
        }
    }
}

/// Parse `formula` against `table`, failing if a symbol is not known to it.
///
/// The empty string is legal and yields an empty [`ElementCounts`].
pub fn parse_formula_with_table(
    formula: &str,
    table: &IsotopeTable,
) -> Result<ElementCounts, FormulaParserError> {
    let mut acc = ElementCounts::new();
    let mut state = ParserState::New;
    let mut symbol_start = 0usize;
    let mut count_start = 0usize;

    let bytes_len = formula.len();

    macro_rules! flush_symbol_only {
        ($end:expr) => {{
            let symbol = &formula[symbol_start..$end];
            if !table.contains(symbol) {
                return Err(FormulaParserError::UnknownElement {
                    symbol: symbol.to_string(),
                });
            }
            acc.add(symbol, 1);
        }};
    }

    macro_rules! flush_symbol_and_count {
        ($sym_end:expr, $count_end:expr) => {{
            let symbol = &formula[symbol_start..$sym_end];
            if !table.contains(symbol) {
                return Err(FormulaParserError::UnknownElement {
                    symbol: symbol.to_string(),
                });
            }
            let count: u32 = formula[count_start..$count_end].parse().map_err(|_| {
                FormulaParserError::MalformedFormula {
                    formula: formula.to_string(),
                }
            })?;
            acc.add(symbol, count);
        }};
    }

    for (i, c) in formula.char_indices() {
        match state {
            ParserState::New => {
                if c.is_ascii_uppercase() {
                    symbol_start = i;
                    state = ParserState::SymbolHead;
                } else if c.is_whitespace() {
                    continue;
                } else {
                    return Err(FormulaParserError::MalformedFormula {
                        formula: formula.to_string(),
                    });
                }
            }
            ParserState::SymbolHead => {
                if c.is_ascii_lowercase() {
                    state = ParserState::SymbolTail;
                } else if c.is_ascii_digit() {
                    count_start = i;
                    state = ParserState::Count;
                } else if c.is_ascii_uppercase() {
                    flush_symbol_only!(i);
                    symbol_start = i;
                    state = ParserState::SymbolHead;
                } else if c.is_whitespace() {
                    flush_symbol_only!(i);
                    state = ParserState::New;
                } else {
                    return Err(FormulaParserError::MalformedFormula {
                        formula: formula.to_string(),
                    });
                }
            }
            ParserState::SymbolTail => {
                if c.is_ascii_digit() {
                    count_start = i;
                    state = ParserState::Count;
                } else if c.is_ascii_uppercase() {
                    flush_symbol_only!(i);
                    symbol_start = i;
                    state = ParserState::SymbolHead;
                } else if c.is_whitespace() {
                    flush_symbol_only!(i);
                    state = ParserState::New;
                } else {
                    return Err(FormulaParserError::MalformedFormula {
                        formula: formula.to_string(),
                    });
                }
            }
            ParserState::Count => {
                if c.is_ascii_digit() {
                    continue;
                } else if c.is_ascii_uppercase() {
                    flush_symbol_and_count!(count_start, i);
                    symbol_start = i;
                    state = ParserState::SymbolHead;
                } else if c.is_whitespace() {
                    flush_symbol_and_count!(count_start, i);
                    state = ParserState::New;
                } else {
                    return Err(FormulaParserError::MalformedFormula {
                        formula: formula.to_string(),
                    });
                }
            }
        }
    }

    match state {
        ParserState::New => {}
        ParserState::SymbolHead | ParserState::SymbolTail => flush_symbol_only!(bytes_len),
        ParserState::Count => flush_symbol_and_count!(count_start, bytes_len),
    }

    Ok(acc)
}
