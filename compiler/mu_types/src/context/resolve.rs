//! Deferred resolution of type names.
//!
//! Declarations may name types that are declared later. `resolve_all` runs
//! passes over every unresolved member, parameter, and signature until a
//! full pass makes no progress. A pass can make progress by resolving a
//! slot or by generating an array type (`T[]`) whose element type has
//! become resolvable, which may unlock further slots in the next pass.
//! Whatever is still unresolved after the last pass is reported as one
//! fault; everything resolved so far stays resolved, so the caller may
//! declare the missing types and run it again.

use super::Context;
use crate::errors::Fault;
use crate::function::Function;
use crate::member::StorageRef;
use crate::node::Node;
use crate::signature::SlotTypes;
use crate::types::TypeKind;
use mu_ir::{FunctionId, Name, ScopeId, TypeId};

/// Split `T[,]` into `("T", 2)`.
fn parse_array_name(text: &str) -> Option<(&str, usize)> {
    let inner = text.strip_suffix(']')?;
    let open = inner.rfind('[')?;
    let commas = &inner[open + 1..];
    if open == 0 || !commas.chars().all(|c| c == ',') {
        return None;
    }
    Some((&inner[..open], commas.len() + 1))
}

/// Where a pending resolution is written back.
enum Target {
    Member { class: TypeId, index: usize },
    Parameter { function: FunctionId, index: usize },
}

impl Context {
    /// Resolve a type name visible from the global scope.
    ///
    /// `Ok(None)` means no type has this name yet. `Name::EMPTY` is `void`.
    pub fn resolve_type_name(&self, name: Name) -> Result<Option<TypeId>, Fault> {
        self.resolve_type_name_from(ScopeId::GLOBAL, name)
    }

    /// Resolve a type name visible from `scope`.
    pub fn resolve_type_name_from(&self, scope: ScopeId, name: Name) -> Result<Option<TypeId>, Fault> {
        if name.is_empty() {
            return Ok(Some(TypeId::VOID));
        }
        let text = self.interner().lookup(name);
        if let Some((element, rank)) = parse_array_name(text) {
            let element = self.intern(element);
            return Ok(self
                .resolve_type_name_from(scope, element)?
                .and_then(|element| self.cached_array_type(element, rank)));
        }

        let found = self.find_types(scope, text);
        match found.as_slice() {
            [] => Ok(None),
            [ty] => Ok(Some(*ty)),
            many => Err(Fault::ambiguous_symbol(text, many.len())),
        }
    }

    /// Array type that `name` denotes once generated, if its element resolves.
    fn pending_array(&self, scope: ScopeId, name: Name) -> Result<Option<(TypeId, usize)>, Fault> {
        let text = self.interner().lookup(name);
        let Some((element, rank)) = parse_array_name(text) else {
            return Ok(None);
        };
        let element_name = self.intern(element);
        if let Some(element) = self.resolve_type_name_from(scope, element_name)? {
            if self.cached_array_type(element, rank).is_none() {
                return Ok(Some((element, rank)));
            }
            return Ok(None);
        }
        self.pending_array(scope, element_name)
    }

    /// Resolve one function's signature in place.
    pub fn resolve_signature(&mut self, function: FunctionId) -> Result<bool, Fault> {
        let resolved = self.function(function).signature.try_resolve(self)?;
        match resolved {
            Some(types) => {
                self.function_mut(function).signature.apply(types);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Member variables and parameters still naming an unresolved type,
    /// with the scope their names are looked up from. Parameters resolve
    /// globally, like the signature slots they mirror.
    fn unresolved_slots(&self) -> Vec<(Target, ScopeId, Name)> {
        let mut slots = Vec::new();
        for class in self.type_ids() {
            let entry = self.type_entry(class);
            let Some(def) = entry.class_def() else {
                continue;
            };
            if def.is_frozen() {
                continue;
            }
            let scope = entry.own_scope.unwrap_or(entry.scope);
            for (index, member) in def.members.iter().enumerate() {
                if let StorageRef::Unresolved(name) = member.storage {
                    slots.push((Target::Member { class, index }, scope, name));
                }
            }
        }
        for function in self.function_ids() {
            let f = self.function(function);
            for (index, parameter) in f.parameters.iter().enumerate() {
                if let StorageRef::Unresolved(name) = parameter.storage {
                    slots.push((Target::Parameter { function, index }, ScopeId::GLOBAL, name));
                }
            }
        }
        slots
    }

    /// Run resolution passes to a fixed point.
    pub fn resolve_all(&mut self) -> Result<(), Fault> {
        let mut passes = 0usize;
        loop {
            passes += 1;
            let mut storage_updates: Vec<(Target, TypeId)> = Vec::new();
            let mut signature_updates: Vec<(FunctionId, SlotTypes)> = Vec::new();
            let mut arrays: Vec<(TypeId, usize)> = Vec::new();

            for (target, scope, name) in self.unresolved_slots() {
                match self.resolve_type_name_from(scope, name)? {
                    Some(ty) => storage_updates.push((target, ty)),
                    None => arrays.extend(self.pending_array(scope, name)?),
                }
            }
            for function in self.function_ids() {
                let signature = &self.function(function).signature;
                if signature.is_resolved() {
                    continue;
                }
                match signature.try_resolve(self)? {
                    Some(types) => signature_updates.push((function, types)),
                    None => {
                        for &name in signature.names().unwrap_or(&[]) {
                            arrays.extend(self.pending_array(ScopeId::GLOBAL, name)?);
                        }
                    }
                }
            }

            let progress =
                !storage_updates.is_empty() || !signature_updates.is_empty() || !arrays.is_empty();

            for (element, rank) in arrays {
                self.array_type(element, rank)?;
            }
            for (target, ty) in storage_updates {
                match target {
                    Target::Member { class, index } => {
                        if let Some(def) = self.types[class.index()].class_def_mut() {
                            def.members[index].storage = StorageRef::Resolved(ty);
                        }
                    }
                    Target::Parameter { function, index } => {
                        self.function_mut(function).parameters[index].storage = StorageRef::Resolved(ty);
                    }
                }
            }
            for (function, types) in signature_updates {
                self.function_mut(function).signature.apply(types);
            }

            if !progress {
                break;
            }
        }

        let remaining = self.unresolved_names();
        tracing::debug!(passes, unresolved = remaining.len(), "resolution reached fixed point");
        match remaining.split_first() {
            None => Ok(()),
            Some((first, rest)) => {
                tracing::warn!(unresolved = remaining.len(), "unresolved names remain");
                let mut fault = Fault::unresolved_symbol(first.clone());
                for name in rest {
                    fault = fault.with_note(format!("also unresolved: `{name}`"));
                }
                Err(fault)
            }
        }
    }

    /// Every type name still unresolved, deduplicated. Member and parameter
    /// types come first, then signature slots.
    pub fn unresolved_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        let mut push = |name: Name| {
            let text = self.interner().lookup(name).to_string();
            if !names.contains(&text) {
                names.push(text);
            }
        };
        for (_, _, name) in self.unresolved_slots() {
            push(name);
        }
        for function in self.function_ids() {
            let signature = &self.function(function).signature;
            if signature.is_resolved() {
                continue;
            }
            for &name in signature.names().unwrap_or(&[]) {
                if !matches!(self.resolve_type_name(name), Ok(Some(_))) {
                    push(name);
                }
            }
        }
        names
    }

    /// Check a call of `function` with arguments of `args` types.
    pub fn check_call(&self, function: &Function, args: &[TypeId]) -> Result<(), Fault> {
        let name = self.interner().lookup(function.name);
        if !function.accepts(args.len()) {
            return Err(Fault::arity_mismatch(name, function.arity_text(), args.len()));
        }
        let Some(expected) = function.signature.arg_types() else {
            return Err(Fault::unresolved_symbol(name));
        };
        for (&arg, &param) in args.iter().zip(expected) {
            if !self.substitutable(arg, param) {
                return Err(Fault::type_mismatch(
                    self.qualified_type_name(param),
                    self.qualified_type_name(arg),
                ));
            }
        }
        Ok(())
    }

    /// Static type of the value `node` evaluates to.
    ///
    /// Reference nodes have the reference type when one has been generated.
    pub fn node_type(&self, node: &Node) -> TypeId {
        match node {
            Node::Constant { ty, .. }
            | Node::StackValue { ty, .. }
            | Node::FieldValue { ty, .. }
            | Node::Dereference { ty, .. }
            | Node::Sequence { ty, .. } => *ty,
            Node::StackReference { ty, .. } | Node::FieldReference { ty, .. } => {
                self.cached_reference_type(*ty).unwrap_or(*ty)
            }
            Node::Call { function, .. } => self
                .resolve_function_ref(function)
                .return_type()
                .unwrap_or(TypeId::VOID),
            Node::CallMethod { function, .. } => {
                self.function(*function).return_type().unwrap_or(TypeId::VOID)
            }
            Node::CallInterface {
                interface, slot, ..
            } => self
                .interface_function(*interface, *slot)
                .and_then(|f| self.function(f).return_type())
                .unwrap_or(TypeId::VOID),
            Node::CallIndirect { callee, .. } => match &self.type_entry(self.node_type(callee)).kind {
                TypeKind::Function(types) => types.first().copied().unwrap_or(TypeId::VOID),
                _ => TypeId::VOID,
            },
            Node::Assign { target, .. } => self.node_type(target),
            Node::If {
                then,
                otherwise: Some(_),
                ..
            } => self.node_type(then),
            Node::And(..) | Node::Or(..) => TypeId::BOOL,
            Node::If { otherwise: None, .. }
            | Node::While { .. }
            | Node::Return(_)
            | Node::Unresolved { .. } => TypeId::VOID,
            Node::New { class } => *class,
            Node::DynamicCast { target, .. } => *target,
            Node::Annotated { node, .. } => self.node_type(node),
            Node::Curry { function, args, .. } => {
                let function = self.resolve_function_ref(function);
                let Some(types) = function.signature.types() else {
                    return TypeId::VOID;
                };
                let reduced: Vec<TypeId> = types
                    .iter()
                    .take(1)
                    .chain(types.iter().skip(1).zip(args).filter(|(_, a)| a.is_none()).map(|(t, _)| t))
                    .copied()
                    .collect();
                self.cached_function_type(&reduced).unwrap_or(TypeId::VOID)
            }
        }
    }

    /// One-line rendering of a function's signature, e.g. `int add(int a, int b)`.
    ///
    /// Slots that are still unresolved print as `*unresolved*:Name`.
    pub fn describe_function(&self, function: FunctionId) -> String {
        let f = self.function(function);
        let slot_text = |index: usize| -> String {
            if let Some(types) = f.signature.types() {
                return types
                    .get(index)
                    .map_or_else(|| "void".to_string(), |&t| self.qualified_type_name(t));
            }
            match f.signature.names().and_then(|names| names.get(index)) {
                Some(&name) => match self.resolve_type_name(name) {
                    Ok(Some(ty)) => self.qualified_type_name(ty),
                    _ => format!("*unresolved*:{}", self.interner().lookup(name)),
                },
                None => "void".to_string(),
            }
        };
        let params: Vec<String> = f
            .parameters
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.free)
            .map(|(i, p)| format!("{} {}", slot_text(i + 1), self.interner().lookup(p.name)))
            .collect();
        format!(
            "{} {}({})",
            slot_text(0),
            self.qualified_function_name(function),
            params.join(", ")
        )
    }
}
