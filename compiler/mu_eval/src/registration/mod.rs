//! Registration API for hosts and front ends.
//!
//! Natives are declared with an ordered keyword list, mirroring how a
//! binding describes a function it exports:
//!
//! ```text
//! Return "int", Args ["int", "int"], Parameters ["a", "b"], Optional [Int(1)], End
//! ```
//!
//! Keywords must appear in that order, each at most once, and the list must
//! finish with `End`. Type names may refer to types that are not declared
//! yet; such slots stay unresolved until [`Context::resolve_all`] finds them.

mod arrays;
mod primitives;

pub use arrays::{install_all_array_natives, install_array_natives};
pub use primitives::load_primitives;

use mu_ir::{FunctionId, Name, ScopeId, TypeId};
use mu_types::{
    Context, Fault, Function, FunctionAttributes, FunctionBody, MemberVariable, NativeFn,
    Parameter, Signature, StorageRef, Value,
};
use smallvec::{smallvec, SmallVec};

/// One entry of a registration keyword list.
#[derive(Clone, Debug)]
pub enum Keyword<'a> {
    /// Return type name. Defaults to `void`.
    Return(&'a str),
    /// Argument type names, in order.
    Args(&'a [&'a str]),
    /// Parameter names, one per argument. Defaults to `_0`, `_1`, ...
    Parameters(&'a [&'a str]),
    /// Default values for the trailing parameters.
    Optional(&'a [Value]),
    /// Upper bound on the argument count; `None` accepts any number.
    Maximum(Option<usize>),
    End,
}

impl Keyword<'_> {
    fn rank(&self) -> u8 {
        match self {
            Keyword::Return(_) => 0,
            Keyword::Args(_) => 1,
            Keyword::Parameters(_) => 2,
            Keyword::Optional(_) => 3,
            Keyword::Maximum(_) => 4,
            Keyword::End => 5,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Keyword::Return(_) => "Return",
            Keyword::Args(_) => "Args",
            Keyword::Parameters(_) => "Parameters",
            Keyword::Optional(_) => "Optional",
            Keyword::Maximum(_) => "Maximum",
            Keyword::End => "End",
        }
    }
}

/// A parsed keyword list.
#[derive(Clone, Debug, Default)]
pub struct FunctionDecl<'a> {
    pub return_type: Option<&'a str>,
    pub args: SmallVec<[&'a str; 4]>,
    pub parameter_names: SmallVec<[&'a str; 4]>,
    pub defaults: Vec<Value>,
    /// `Some(None)` when the argument count is unbounded.
    pub maximum: Option<Option<usize>>,
}

impl<'a> FunctionDecl<'a> {
    /// Parse and validate a keyword list for the function `name`.
    pub fn parse(name: &str, keywords: &[Keyword<'a>]) -> Result<Self, Fault> {
        let fail = |detail: String| Fault::bad_registration(name, detail);

        match keywords.last() {
            Some(Keyword::End) => {}
            _ => return Err(fail("keyword list must finish with `End`".to_owned())),
        }

        let mut decl = FunctionDecl::default();
        let mut last_rank = None;
        for keyword in keywords {
            if last_rank.is_some_and(|last| keyword.rank() <= last) {
                return Err(fail(format!("`{}` is out of order or repeated", keyword.label())));
            }
            last_rank = Some(keyword.rank());
            match keyword {
                Keyword::Return(ty) => decl.return_type = Some(ty),
                Keyword::Args(args) => decl.args = args.iter().copied().collect(),
                Keyword::Parameters(names) => decl.parameter_names = names.iter().copied().collect(),
                Keyword::Optional(values) => decl.defaults = values.to_vec(),
                Keyword::Maximum(max) => decl.maximum = Some(*max),
                Keyword::End => {}
            }
        }

        if !decl.parameter_names.is_empty() && decl.parameter_names.len() != decl.args.len() {
            return Err(fail(format!(
                "{} parameter names for {} arguments",
                decl.parameter_names.len(),
                decl.args.len()
            )));
        }
        if decl.defaults.len() > decl.args.len() {
            return Err(fail(format!(
                "{} defaults for {} arguments",
                decl.defaults.len(),
                decl.args.len()
            )));
        }
        if let Some(Some(max)) = decl.maximum {
            if max < decl.args.len() {
                return Err(fail(format!(
                    "maximum of {max} is below the {} declared arguments",
                    decl.args.len()
                )));
            }
        }
        Ok(decl)
    }

    /// Parameters in declaration order, defaults on the trailing ones.
    ///
    /// Type names resolve from the global scope, the scope signature slots
    /// resolve from, so a parameter and its slot always agree.
    fn parameters(&self, ctx: &Context) -> Result<Vec<Parameter>, Fault> {
        let first_default = self.args.len() - self.defaults.len();
        let mut parameters = Vec::with_capacity(self.args.len());
        for (index, type_name) in self.args.iter().enumerate() {
            let name = match self.parameter_names.get(index) {
                Some(name) => ctx.intern(name),
                None => ctx.intern(&format!("_{index}")),
            };
            let storage = storage_for(ctx, ScopeId::GLOBAL, ctx.intern(type_name))?;
            let mut parameter = Parameter::new(name, storage);
            if index >= first_default {
                parameter.default = Some(self.defaults[index - first_default].clone());
            }
            parameters.push(parameter);
        }
        Ok(parameters)
    }
}

/// Resolved storage when `type_name` already names a type, else a forward
/// reference.
fn storage_for(ctx: &Context, scope: ScopeId, type_name: Name) -> Result<StorageRef, Fault> {
    Ok(match ctx.resolve_type_name_from(scope, type_name)? {
        Some(ty) => StorageRef::Resolved(ty),
        None => StorageRef::Unresolved(type_name),
    })
}

/// Declares natives, classes, and members into a [`Context`].
pub struct Registrar<'ctx> {
    ctx: &'ctx mut Context,
}

impl<'ctx> Registrar<'ctx> {
    pub fn new(ctx: &'ctx mut Context) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &Context {
        &*self.ctx
    }

    pub fn context_mut(&mut self) -> &mut Context {
        &mut *self.ctx
    }

    /// Declare a native function in `scope`.
    pub fn function(
        &mut self,
        scope: ScopeId,
        name: &str,
        native: NativeFn,
        keywords: &[Keyword<'_>],
    ) -> Result<FunctionId, Fault> {
        let decl = FunctionDecl::parse(name, keywords)?;
        let function = self.build(name, FunctionBody::Native(native), &decl, None)?;
        self.declare(scope, function)
    }

    /// Declare a native method of `owner`, a class or generated type.
    ///
    /// The receiver is prepended as parameter `this`; the keyword list
    /// describes the remaining arguments.
    pub fn method(
        &mut self,
        owner: TypeId,
        name: &str,
        native: NativeFn,
        keywords: &[Keyword<'_>],
    ) -> Result<FunctionId, Fault> {
        let decl = FunctionDecl::parse(name, keywords)?;
        let scope = self.member_scope(owner)?;
        let function = self
            .build(name, FunctionBody::Native(native), &decl, Some(owner))?
            .with_attributes(FunctionAttributes::METHOD);
        self.declare(scope, function)
    }

    /// Declare the next abstract slot of `interface`.
    pub fn interface_function(
        &mut self,
        interface: TypeId,
        name: &str,
        keywords: &[Keyword<'_>],
    ) -> Result<FunctionId, Fault> {
        if !self.ctx.type_entry(interface).is_interface() {
            return Err(Fault::not_an_interface(self.ctx.qualified_type_name(interface)));
        }
        let decl = FunctionDecl::parse(name, keywords)?;
        let scope = self.member_scope(interface)?;
        let function = self.build(name, FunctionBody::Abstract, &decl, Some(interface))?;
        self.declare(scope, function)
    }

    /// Declare a class, naming its superclass by qualified name.
    pub fn class(&mut self, scope: ScopeId, name: &str, super_class: Option<&str>) -> Result<TypeId, Fault> {
        let super_class = match super_class {
            Some(parent) => {
                let parent_name = self.ctx.intern(parent);
                Some(
                    self.ctx
                        .resolve_type_name_from(scope, parent_name)?
                        .ok_or_else(|| Fault::unresolved_symbol(parent))?,
                )
            }
            None => None,
        };
        self.ctx.declare_class(scope, name, super_class)
    }

    pub fn interface(&mut self, scope: ScopeId, name: &str) -> TypeId {
        self.ctx.declare_interface(scope, name)
    }

    pub fn implements(&mut self, class: TypeId, interface: TypeId) -> Result<(), Fault> {
        self.ctx.add_interface(class, interface)
    }

    /// Add a field to `class`. Returns its position among the own members.
    pub fn member(&mut self, class: TypeId, name: &str, type_name: &str) -> Result<usize, Fault> {
        let scope = self.member_scope(class)?;
        let name = self.ctx.intern(name);
        let type_name = self.ctx.intern(type_name);
        let storage = storage_for(&*self.ctx, scope, type_name)?;
        self.ctx.add_member(class, MemberVariable::new(name, storage))
    }

    /// Array type of `element` with its native methods installed.
    pub fn array_type(&mut self, element: TypeId, rank: usize) -> Result<TypeId, Fault> {
        let ty = self.ctx.array_type(element, rank)?;
        install_array_natives(self.ctx, ty)?;
        Ok(ty)
    }

    fn member_scope(&self, owner: TypeId) -> Result<ScopeId, Fault> {
        self.ctx
            .type_entry(owner)
            .own_scope
            .ok_or_else(|| Fault::not_a_class(self.ctx.qualified_type_name(owner)))
    }

    fn build(
        &self,
        name: &str,
        body: FunctionBody,
        decl: &FunctionDecl<'_>,
        receiver: Option<TypeId>,
    ) -> Result<Function, Fault> {
        let ctx = &*self.ctx;
        let mut names: SmallVec<[Name; 4]> = smallvec![ctx.intern(decl.return_type.unwrap_or("void"))];
        let mut parameters = decl.parameters(ctx)?;
        let mut maximum = decl.maximum;

        if let Some(owner) = receiver {
            names.push(ctx.intern(&ctx.qualified_type_name(owner)));
            parameters.insert(0, Parameter::typed(ctx.names().this, owner));
            maximum = maximum.map(|max| max.map(|max| max + 1));
        }
        names.extend(decl.args.iter().map(|ty| ctx.intern(ty)));
        let signature = Signature::from_names(names);

        let mut function = Function::new(ctx.intern(name), signature, parameters, body);
        if let Some(max) = maximum {
            function.max_args = max;
        }
        Ok(function)
    }

    /// Declare `function` and resolve its signature when every slot is
    /// already known.
    fn declare(&mut self, scope: ScopeId, function: Function) -> Result<FunctionId, Fault> {
        let id = self.ctx.declare_function(scope, function)?;
        let resolved = self.ctx.resolve_signature(id)?;
        tracing::debug!(
            function = %self.ctx.qualified_function_name(id),
            resolved,
            "registered native"
        );
        Ok(id)
    }
}

#[cfg(test)]
mod tests;
