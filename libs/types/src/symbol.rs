//! Trading symbols
//!
//! A symbol is immutable after registration: a 32-bit id plus a short name.
//! Names longer than eight characters are truncated at ingress.

use crate::ids::SymbolId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum symbol name length; longer names are truncated.
pub const MAX_SYMBOL_NAME_LEN: usize = 8;

/// A trading symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub id: SymbolId,
    pub name: String,
}

impl Symbol {
    /// Create a new symbol, truncating the name to eight bytes.
    pub fn new(id: SymbolId, name: impl Into<String>) -> Self {
        let mut name = name.into();
        if name.len() > MAX_SYMBOL_NAME_LEN {
            let mut cut = MAX_SYMBOL_NAME_LEN;
            while !name.is_char_boundary(cut) {
                cut -= 1;
            }
            name.truncate(cut);
        }
        Self {
            id,
            name: name.trim().to_string(),
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol(id={}, name={})", self.id, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_name_truncation() {
        let sym = Symbol::new(SymbolId::new(1), "VERYLONGNAME");
        assert_eq!(sym.name, "VERYLONG");
    }

    #[test]
    fn test_symbol_name_trim() {
        let sym = Symbol::new(SymbolId::new(2), "AAPL   ");
        assert_eq!(sym.name, "AAPL");
    }
}
