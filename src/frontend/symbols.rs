//! Symbol table for C scoping
//!
//! A stack of scopes rooted at a persistent global scope. Each scope keeps
//! its symbols in declaration order plus a name index, and a separate tag
//! namespace for struct/union/enum tags.

use std::collections::HashMap;

use log::debug;

pub use crate::frontend::ast::StorageClass;
use crate::types::{CType, RecordId};
use crate::utils::{Error, Result, Span};

/// Kind of symbol
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolKind {
    Variable,
    Function,
    /// typedef name
    Type,
    /// Enumerator with its value
    EnumConstant(i64),
    Label,
}

/// Symbol information
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub ty: CType,
    pub storage: Option<StorageClass>,
    /// Depth of the owning scope (0 = global)
    pub scope_level: usize,
    /// Has a definition (function body, or an object definition)
    pub is_defined: bool,
    pub is_used: bool,
    pub is_parameter: bool,
    pub span: Span,
}

impl Symbol {
    pub fn new(name: impl Into<String>, kind: SymbolKind, ty: CType, span: Span) -> Self {
        Self {
            name: name.into(),
            kind,
            ty,
            storage: None,
            scope_level: 0,
            is_defined: false,
            is_used: false,
            is_parameter: false,
            span,
        }
    }

    pub fn with_storage(mut self, storage: Option<StorageClass>) -> Self {
        self.storage = storage;
        self
    }

    pub fn defined(mut self, is_defined: bool) -> Self {
        self.is_defined = is_defined;
        self
    }

    pub fn parameter(mut self) -> Self {
        self.is_parameter = true;
        self.is_defined = true;
        self
    }
}

/// Entry of the tag namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Record(RecordId),
    Enum,
}

/// A scope containing symbols
#[derive(Debug, Default)]
pub struct Scope {
    symbols: Vec<Symbol>,
    index: HashMap<String, usize>,
    tags: HashMap<String, Tag>,
}

impl Scope {
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn into_symbols(self) -> Vec<Symbol> {
        self.symbols
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.index.get(name).map(|&i| &self.symbols[i])
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut Symbol> {
        match self.index.get(name) {
            Some(&i) => self.symbols.get_mut(i),
            None => None,
        }
    }
}

/// Symbol table with nested scopes
pub struct SymbolTable {
    scopes: Vec<Scope>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::default()],
        }
    }

    /// Current scope depth (0 = global)
    pub fn level(&self) -> usize {
        self.scopes.len() - 1
    }

    /// Enter a new scope and return its level
    pub fn enter_scope(&mut self) -> usize {
        self.scopes.push(Scope::default());
        debug!("enter scope {}", self.level());
        self.level()
    }

    /// Exit the current scope and hand it back. The global scope is never popped.
    pub fn exit_scope(&mut self) -> Option<Scope> {
        if self.scopes.len() == 1 {
            return None;
        }
        debug!("exit scope {}", self.level());
        self.scopes.pop()
    }

    fn current(&mut self) -> &mut Scope {
        let last = self.scopes.len() - 1;
        &mut self.scopes[last]
    }

    /// Declare a symbol in the current scope
    pub fn declare(&mut self, mut symbol: Symbol) -> Result<()> {
        if self.lookup_local(&symbol.name).is_some() {
            return Err(Error::Redeclaration {
                name: symbol.name.clone(),
                span: symbol.span,
            });
        }
        symbol.scope_level = self.level();
        debug!("declare {:?} '{}' at level {}", symbol.kind, symbol.name, symbol.scope_level);

        let scope = self.current();
        scope.index.insert(symbol.name.clone(), scope.symbols.len());
        scope.symbols.push(symbol);
        Ok(())
    }

    /// Look up a symbol, searching from current scope outward
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    pub fn lookup_mut(&mut self, name: &str) -> Option<&mut Symbol> {
        self.scopes.iter_mut().rev().find_map(|scope| scope.get_mut(name))
    }

    /// Look up a symbol only in the current scope
    pub fn lookup_local(&self, name: &str) -> Option<&Symbol> {
        self.scopes.last().and_then(|scope| scope.get(name))
    }

    pub fn lookup_local_mut(&mut self, name: &str) -> Option<&mut Symbol> {
        self.current().get_mut(name)
    }

    /// Mark the nearest binding of `name` as used
    pub fn mark_used(&mut self, name: &str) -> bool {
        match self.lookup_mut(name) {
            Some(symbol) => {
                symbol.is_used = true;
                true
            }
            None => false,
        }
    }

    /// Declare a struct/union/enum tag in the current scope
    pub fn declare_tag(&mut self, name: &str, tag: Tag, span: Span) -> Result<()> {
        if self.lookup_tag_local(name).is_some() {
            return Err(Error::Redefinition {
                name: name.to_string(),
                span,
            });
        }
        self.current().tags.insert(name.to_string(), tag);
        Ok(())
    }

    pub fn lookup_tag(&self, name: &str) -> Option<Tag> {
        self.scopes.iter().rev().find_map(|scope| scope.tags.get(name).copied())
    }

    pub fn lookup_tag_local(&self, name: &str) -> Option<Tag> {
        self.scopes.last().and_then(|scope| scope.tags.get(name).copied())
    }

    /// Symbols of the global scope, in declaration order
    pub fn globals(&self) -> &[Symbol] {
        self.scopes[0].symbols()
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RecordId;

    fn var(name: &str, ty: CType) -> Symbol {
        Symbol::new(name, SymbolKind::Variable, ty, Span::dummy())
    }

    #[test]
    fn test_shadowing() {
        let mut table = SymbolTable::new();
        table.declare(var("x", CType::int())).unwrap();
        table.enter_scope();
        table.declare(var("x", CType::double())).unwrap();
        assert_eq!(table.lookup("x").unwrap().ty, CType::double());
        assert_eq!(table.lookup("x").unwrap().scope_level, 1);

        let popped = table.exit_scope().unwrap();
        assert_eq!(popped.symbols().len(), 1);
        assert_eq!(table.lookup("x").unwrap().ty, CType::int());
        assert_eq!(table.lookup("x").unwrap().scope_level, 0);
    }

    #[test]
    fn test_same_scope_redeclaration_is_error() {
        let mut table = SymbolTable::new();
        table.declare(var("x", CType::int())).unwrap();
        assert!(matches!(
            table.declare(var("x", CType::int())),
            Err(Error::Redeclaration { name, .. }) if name == "x"
        ));

        table.enter_scope();
        table.declare(var("y", CType::int())).unwrap();
        assert!(table.declare(var("y", CType::long())).is_err());
    }

    #[test]
    fn test_global_scope_cannot_be_popped() {
        let mut table = SymbolTable::new();
        assert_eq!(table.level(), 0);
        assert!(table.exit_scope().is_none());
        assert_eq!(table.enter_scope(), 1);
        assert!(table.exit_scope().is_some());
        assert!(table.exit_scope().is_none());
    }

    #[test]
    fn test_lookup_local_only_sees_current_scope() {
        let mut table = SymbolTable::new();
        table.declare(var("g", CType::int())).unwrap();
        table.enter_scope();
        assert!(table.lookup_local("g").is_none());
        assert!(table.lookup("g").is_some());
    }

    #[test]
    fn test_mark_used() {
        let mut table = SymbolTable::new();
        table.declare(var("x", CType::int())).unwrap();
        table.enter_scope();
        table.declare(var("x", CType::int())).unwrap();
        assert!(table.mark_used("x"));
        assert!(!table.mark_used("missing"));
        let inner = table.exit_scope().unwrap();
        assert!(inner.get("x").unwrap().is_used);
        assert!(!table.lookup("x").unwrap().is_used);
    }

    #[test]
    fn test_tags_are_a_separate_namespace() {
        let mut table = SymbolTable::new();
        table.declare(var("point", CType::int())).unwrap();
        table.declare_tag("point", Tag::Record(RecordId(0)), Span::dummy()).unwrap();
        assert_eq!(table.lookup_tag("point"), Some(Tag::Record(RecordId(0))));
        assert!(table.declare_tag("point", Tag::Enum, Span::dummy()).is_err());

        table.enter_scope();
        table.declare_tag("point", Tag::Enum, Span::dummy()).unwrap();
        assert_eq!(table.lookup_tag("point"), Some(Tag::Enum));
        table.exit_scope();
        assert_eq!(table.lookup_tag("point"), Some(Tag::Record(RecordId(0))));
    }

    #[test]
    fn test_globals_keep_declaration_order() {
        let mut table = SymbolTable::new();
        for name in ["c", "a", "b"] {
            table.declare(var(name, CType::int())).unwrap();
        }
        let names: Vec<&str> = table.globals().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }
}
