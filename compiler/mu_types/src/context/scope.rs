//! Scopes and name lookup.

use super::Context;
use mu_ir::{split_qualified, FunctionId, Name, ScopeId, TypeId};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// What a scope belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ScopeOwner {
    Global,
    Namespace,
    /// Member scope of a class, interface, or generated type.
    Type(TypeId),
}

/// A declaration visible under some name.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SymbolRef {
    Type(TypeId),
    Function(FunctionId),
    Namespace(ScopeId),
}

#[derive(Clone, Debug)]
pub struct Scope {
    pub name: Name,
    pub parent: Option<ScopeId>,
    pub owner: ScopeOwner,
    /// Overload sets in declaration order.
    pub(crate) symbols: FxHashMap<Name, Vec<SymbolRef>>,
    pub(crate) imports: Vec<ScopeId>,
}

impl Scope {
    pub(crate) fn new(name: Name, parent: Option<ScopeId>, owner: ScopeOwner) -> Self {
        Self {
            name,
            parent,
            owner,
            symbols: FxHashMap::default(),
            imports: Vec::new(),
        }
    }

    pub fn imports(&self) -> &[ScopeId] {
        &self.imports
    }
}

/// Result of a lookup: usually zero or one symbol.
pub type Symbols = SmallVec<[SymbolRef; 2]>;

impl Context {
    pub(crate) fn new_scope(&mut self, name: Name, parent: Option<ScopeId>, owner: ScopeOwner) -> ScopeId {
        let id = ScopeId::from_raw(super::next_raw(self.scopes.len()));
        self.scopes.push(Scope::new(name, parent, owner));
        id
    }

    pub(crate) fn insert_symbol(&mut self, scope: ScopeId, name: Name, symbol: SymbolRef) {
        self.scopes[scope.index()]
            .symbols
            .entry(name)
            .or_default()
            .push(symbol);
    }

    pub fn scope(&self, scope: ScopeId) -> &Scope {
        &self.scopes[scope.index()]
    }

    /// Symbols declared directly in `scope`.
    pub fn lookup_local(&self, scope: ScopeId, name: Name) -> &[SymbolRef] {
        self.scopes[scope.index()]
            .symbols
            .get(&name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Symbols of `scope` plus those of the scopes it imports.
    fn lookup_with_imports(&self, scope: ScopeId, name: Name) -> Symbols {
        let mut found: Symbols = self.lookup_local(scope, name).iter().copied().collect();
        for &imported in &self.scopes[scope.index()].imports {
            for &symbol in self.lookup_local(imported, name) {
                if !found.contains(&symbol) {
                    found.push(symbol);
                }
            }
        }
        found
    }

    /// Innermost non-empty overload set for `name`, walking outward from `scope`.
    pub fn lookup(&self, scope: ScopeId, name: Name) -> Symbols {
        let mut current = Some(scope);
        while let Some(id) = current {
            let found = self.lookup_with_imports(id, name);
            if !found.is_empty() {
                return found;
            }
            current = self.scopes[id.index()].parent;
        }
        Symbols::new()
    }

    /// Scope holding the members of whatever `symbol` names.
    fn member_scope(&self, symbol: SymbolRef) -> Option<ScopeId> {
        match symbol {
            SymbolRef::Namespace(scope) => Some(scope),
            SymbolRef::Type(ty) => self.type_entry(ty).own_scope,
            SymbolRef::Function(_) => None,
        }
    }

    /// Look up a dot-qualified name. The first component is found from
    /// `scope` outward; later components are members of the previous one.
    pub fn lookup_qualified(&self, scope: ScopeId, qualified: &str) -> Symbols {
        let mut parts = split_qualified(qualified);
        let Some(first) = parts.next() else {
            return Symbols::new();
        };
        let Some(first) = self.interner().get(first) else {
            return Symbols::new();
        };
        let mut found = self.lookup(scope, first);

        for part in parts {
            let Some(name) = self.interner().get(part) else {
                return Symbols::new();
            };
            let mut next = Symbols::new();
            for symbol in found {
                let Some(container) = self.member_scope(symbol) else {
                    continue;
                };
                for &member in self.lookup_with_imports(container, name).iter() {
                    if !next.contains(&member) {
                        next.push(member);
                    }
                }
            }
            found = next;
        }
        found
    }

    /// Distinct types visible from `scope` under a qualified name.
    pub fn find_types(&self, scope: ScopeId, qualified: &str) -> SmallVec<[TypeId; 2]> {
        self.lookup_qualified(scope, qualified)
            .into_iter()
            .filter_map(|symbol| match symbol {
                SymbolRef::Type(ty) => Some(ty),
                _ => None,
            })
            .collect()
    }

    /// Functions called `name` visible from `scope`, in declaration order.
    pub fn overloads(&self, scope: ScopeId, name: Name) -> Vec<FunctionId> {
        self.lookup(scope, name)
            .into_iter()
            .filter_map(|symbol| match symbol {
                SymbolRef::Function(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    /// Overload of `name` whose resolved argument types are exactly `args`.
    pub fn find_overload(&self, scope: ScopeId, name: &str, args: &[TypeId]) -> Option<FunctionId> {
        let name = self.interner().get(name)?;
        self.overloads(scope, name)
            .into_iter()
            .find(|&id| self.function(id).signature.arg_types() == Some(args))
    }
}
