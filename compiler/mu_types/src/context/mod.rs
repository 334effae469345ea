//! The symbol table.
//!
//! A `Context` owns every scope, type, and function of one program. Scopes
//! form a tree rooted at the global scope; each maps names to overload sets
//! of symbols. Types and functions are addressed by `TypeId`/`FunctionId`
//! handles whose identity never changes once issued.
//!
//! Declaration, resolution, and freezing take `&mut self` and happen before
//! evaluation. Evaluation only reads the context, except for the dispatch
//! table memo, which sits behind its own lock.

mod cache;
mod resolve;
mod scope;

pub use scope::{Scope, ScopeOwner, SymbolRef, Symbols};

pub(crate) use cache::TypeCache;

use crate::class::ClassDef;
use crate::errors::Fault;
use crate::function::{Function, FunctionAttributes};
use crate::interface::{DispatchTable, InterfaceDef};
use crate::types::{TypeEntry, TypeKind};
use crate::value::FunctionRef;
use mu_ir::{FunctionId, MachineRep, Name, ScopeId, SharedInterner, TypeId, WellKnownNames};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;

type ImplementationMemo = FxHashMap<(TypeId, TypeId), Option<Arc<DispatchTable>>>;

pub struct Context {
    interner: SharedInterner,
    names: WellKnownNames,
    pub(crate) scopes: Vec<Scope>,
    pub(crate) types: Vec<TypeEntry>,
    pub(crate) functions: Vec<Function>,
    pub(crate) cache: TypeCache,
    pub(crate) implementations: RwLock<ImplementationMemo>,
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "handle spaces are bounded well below u32::MAX"
)]
#[inline]
fn next_raw(len: usize) -> u32 {
    len as u32
}

impl Context {
    pub fn new() -> Self {
        Self::with_interner(SharedInterner::new())
    }

    /// Context sharing an existing interner.
    pub fn with_interner(interner: SharedInterner) -> Self {
        let names = WellKnownNames::new(&interner);
        let mut ctx = Self {
            interner,
            names,
            scopes: vec![Scope::new(Name::EMPTY, None, ScopeOwner::Global)],
            types: Vec::with_capacity(64),
            functions: Vec::with_capacity(256),
            cache: TypeCache::default(),
            implementations: RwLock::new(FxHashMap::default()),
        };

        let primitives = [
            (names.void, MachineRep::Void),
            (names.nil, MachineRep::Pointer),
            (names.bool, MachineRep::Bool),
            (names.byte, MachineRep::Byte),
            (names.short, MachineRep::Short),
            (names.char, MachineRep::Char),
            (names.int, MachineRep::Int),
            (names.int64, MachineRep::Int64),
            (names.float, MachineRep::Float),
            (names.double, MachineRep::Double),
        ];
        for ((name, rep), expected) in primitives.into_iter().zip(TypeId::PRIMITIVES) {
            let id = ctx.push_type(ScopeId::GLOBAL, name, rep, TypeKind::Primitive, false);
            debug_assert_eq!(id, expected);
        }
        ctx
    }

    pub fn interner(&self) -> &SharedInterner {
        &self.interner
    }

    pub fn names(&self) -> &WellKnownNames {
        &self.names
    }

    pub fn intern(&self, text: &str) -> Name {
        self.interner.intern(text)
    }

    pub fn type_entry(&self, ty: TypeId) -> &TypeEntry {
        &self.types[ty.index()]
    }

    pub fn type_ids(&self) -> impl Iterator<Item = TypeId> {
        (0..next_raw(self.types.len())).map(TypeId::from_raw)
    }

    pub fn num_types(&self) -> usize {
        self.types.len()
    }

    pub fn function(&self, function: FunctionId) -> &Function {
        &self.functions[function.index()]
    }

    pub fn function_mut(&mut self, function: FunctionId) -> &mut Function {
        &mut self.functions[function.index()]
    }

    pub fn function_ids(&self) -> impl Iterator<Item = FunctionId> {
        (0..next_raw(self.functions.len())).map(FunctionId::from_raw)
    }

    /// The function a `FunctionRef` designates.
    pub fn resolve_function_ref<'a>(&'a self, function: &'a FunctionRef) -> &'a Function {
        match function {
            FunctionRef::Declared(id) => self.function(*id),
            FunctionRef::Synthesized(function) => function,
        }
    }

    pub(crate) fn push_type(
        &mut self,
        scope: ScopeId,
        name: Name,
        rep: MachineRep,
        kind: TypeKind,
        with_scope: bool,
    ) -> TypeId {
        let id = TypeId::from_raw(next_raw(self.types.len()));
        let own_scope = with_scope.then(|| self.new_scope(name, Some(scope), ScopeOwner::Type(id)));
        self.types.push(TypeEntry {
            name,
            scope,
            own_scope,
            rep,
            kind,
        });
        self.insert_symbol(scope, name, SymbolRef::Type(id));
        id
    }

    /// Declare (or reopen) the namespace `name` inside `parent`.
    pub fn declare_namespace(&mut self, parent: ScopeId, name: &str) -> ScopeId {
        let name = self.intern(name);
        let existing = self.lookup_local(parent, name).iter().find_map(|symbol| match symbol {
            SymbolRef::Namespace(scope) => Some(*scope),
            _ => None,
        });
        if let Some(scope) = existing {
            return scope;
        }
        let scope = self.new_scope(name, Some(parent), ScopeOwner::Namespace);
        self.insert_symbol(parent, name, SymbolRef::Namespace(scope));
        scope
    }

    /// Make the symbols of `imported` visible from `scope`.
    pub fn import(&mut self, scope: ScopeId, imported: ScopeId) {
        let imports = &mut self.scopes[scope.index()].imports;
        if !imports.contains(&imported) {
            imports.push(imported);
        }
    }

    /// Declare a host-provided value type with the given representation.
    pub fn declare_primitive(&mut self, scope: ScopeId, name: &str, rep: MachineRep) -> TypeId {
        let name = self.intern(name);
        self.push_type(scope, name, rep, TypeKind::Primitive, false)
    }

    /// Declare a class. The superclass, if any, must already be a class.
    pub fn declare_class(
        &mut self,
        scope: ScopeId,
        name: &str,
        super_class: Option<TypeId>,
    ) -> Result<TypeId, Fault> {
        if let Some(parent) = super_class {
            if !self.type_entry(parent).is_class() {
                return Err(Fault::not_a_class(self.qualified_type_name(parent)));
            }
        }
        let name = self.intern(name);
        let def = ClassDef {
            super_class,
            ..ClassDef::default()
        };
        let id = self.push_type(scope, name, MachineRep::Pointer, TypeKind::Class(def), true);
        tracing::debug!(class = %self.qualified_type_name(id), "declared class");
        Ok(id)
    }

    pub fn declare_interface(&mut self, scope: ScopeId, name: &str) -> TypeId {
        let name = self.intern(name);
        self.push_type(
            scope,
            name,
            MachineRep::Pointer,
            TypeKind::Interface(InterfaceDef::default()),
            true,
        )
    }

    /// Add `function` to `scope`.
    ///
    /// In a class scope a function marked `METHOD` joins the class's
    /// methods. In an interface scope every function becomes the next slot.
    pub fn declare_function(&mut self, scope: ScopeId, mut function: Function) -> Result<FunctionId, Fault> {
        let id = FunctionId::from_raw(next_raw(self.functions.len()));
        function.scope = scope;

        if let ScopeOwner::Type(owner) = self.scopes[scope.index()].owner {
            let owner_name = self.qualified_type_name(owner);
            match &mut self.types[owner.index()].kind {
                TypeKind::Interface(def) => {
                    function.owner = Some(owner);
                    function.interface_slot = Some(def.functions.len());
                    function.attributes |= FunctionAttributes::METHOD;
                    def.functions.push(id);
                }
                TypeKind::Class(def) if function.is_method() => {
                    if def.is_frozen() {
                        return Err(Fault::class_frozen(owner_name));
                    }
                    function.owner = Some(owner);
                    def.methods.push(id);
                }
                _ => {}
            }
        }

        let name = function.name;
        self.functions.push(function);
        self.insert_symbol(scope, name, SymbolRef::Function(id));
        Ok(id)
    }

    /// Dot-qualified name of a type, e.g. `geometry.Point`.
    pub fn qualified_type_name(&self, ty: TypeId) -> String {
        let entry = self.type_entry(ty);
        self.qualify(entry.scope, self.interner.lookup(entry.name))
    }

    pub fn qualified_function_name(&self, function: FunctionId) -> String {
        let function = self.function(function);
        self.qualify(function.scope, self.interner.lookup(function.name))
    }

    pub fn function_ref_name(&self, function: &FunctionRef) -> String {
        match function {
            FunctionRef::Declared(id) => self.qualified_function_name(*id),
            FunctionRef::Synthesized(function) => {
                self.qualify(function.scope, self.interner.lookup(function.name))
            }
        }
    }

    pub(crate) fn qualify(&self, scope: ScopeId, leaf: &str) -> String {
        let mut parts = vec![leaf];
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = &self.scopes[id.index()];
            if !scope.name.is_empty() {
                parts.push(self.interner.lookup(scope.name));
            }
            current = scope.parent;
        }
        parts.reverse();
        parts.join(".")
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests;
