// ── Symbol table ──
//
// Lets one batch create a row under a caller-chosen `@name` and refer to
// it from later commands before the row has a permanent identity in the
// store. A fresh table is built for every attempt.

use indexmap::IndexMap;
use uuid::Uuid;

use crate::error::CoreError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    /// UUID the row will be inserted with.
    pub uuid: Uuid,
    pub created: bool,
    pub strong_ref: bool,
    pub weak_ref: bool,
}

impl Symbol {
    fn new() -> Self {
        Self {
            uuid: Uuid::new_v4(),
            created: false,
            strong_ref: false,
            weak_ref: false,
        }
    }

    pub fn mark_created(&mut self) {
        self.created = true;
    }

    pub fn mark_strong_reference(&mut self) {
        self.strong_ref = true;
    }

    /// Every reference column in the northbound schema is strong, so the
    /// built-in commands never call this.
    pub fn mark_weak_reference(&mut self) {
        self.weak_ref = true;
    }
}

/// A created row that nothing durable points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolWarning {
    Unreferenced(String),
    WeakOnly(String),
}

impl std::fmt::Display for SymbolWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unreferenced(name) => write!(
                f,
                "row id \"{name}\" was created but no reference to it was inserted, \
                 so it will not actually appear in the database"
            ),
            Self::WeakOnly(name) => write!(
                f,
                "row id \"{name}\" was created but only a weak reference to it was \
                 inserted, so it will not actually appear in the database"
            ),
        }
    }
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: IndexMap<String, Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The symbol for `name`, created on first use.
    pub fn declare(&mut self, name: &str) -> &mut Symbol {
        self.symbols.entry(name.to_owned()).or_insert_with(Symbol::new)
    }

    /// Bind `name` to a row about to be created (`--id=@name`).
    pub fn create(&mut self, name: &str) -> Result<&mut Symbol, CoreError> {
        if !name.starts_with('@') {
            return Err(CoreError::invalid(format!(
                "row id \"{name}\" does not begin with \"@\""
            )));
        }
        let symbol = self.declare(name);
        if symbol.created {
            return Err(CoreError::invalid(format!(
                "row id \"{name}\" may only be specified on one --id option"
            )));
        }
        symbol.mark_created();
        Ok(symbol)
    }

    /// End-of-run check. A symbol referenced but never created is fatal;
    /// created rows without a strong reference only produce warnings.
    pub fn audit(&self) -> Result<Vec<SymbolWarning>, CoreError> {
        let mut warnings = Vec::new();
        for (name, symbol) in &self.symbols {
            if !symbol.created {
                return Err(CoreError::UnresolvedSymbol { name: name.clone() });
            }
            if !symbol.strong_ref {
                warnings.push(if symbol.weak_ref {
                    SymbolWarning::WeakOnly(name.clone())
                } else {
                    SymbolWarning::Unreferenced(name.clone())
                });
            }
        }
        Ok(warnings)
    }
}
