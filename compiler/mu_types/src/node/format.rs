//! Printing node trees.
//!
//! `Tree` is an indented s-expression for diagnostics, one node per line.
//! `Lisp` is a single-line form using fully-qualified names. Neither fails
//! on placeholder nodes; they print as `*unresolved*`.

use super::Node;
use crate::context::Context;
use std::fmt::Write;

const UNRESOLVED_MARKER: &str = "*unresolved*";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NodeStyle {
    Tree,
    Lisp,
}

pub struct NodeFormatter<'a> {
    ctx: &'a Context,
    style: NodeStyle,
}

impl<'a> NodeFormatter<'a> {
    pub fn new(ctx: &'a Context, style: NodeStyle) -> Self {
        Self { ctx, style }
    }

    pub fn format(&self, node: &Node) -> String {
        let mut out = String::new();
        match self.style {
            NodeStyle::Tree => self.tree(node, 0, &mut out),
            NodeStyle::Lisp => self.lisp(node, &mut out),
        }
        out
    }

    fn type_name(&self, ty: mu_ir::TypeId) -> String {
        self.ctx.qualified_type_name(ty)
    }

    fn label(&self, node: &Node) -> String {
        let ctx = self.ctx;
        match node {
            Node::Constant { ty, value } => format!("constant {value} : {}", self.type_name(*ty)),
            Node::Call { function, .. } => format!("call {}", ctx.function_ref_name(function)),
            Node::CallMethod { function, .. } => {
                format!("call-method {}", ctx.qualified_function_name(*function))
            }
            Node::CallInterface {
                interface, slot, ..
            } => format!("call-interface {}[{slot}]", self.type_name(*interface)),
            Node::CallIndirect { .. } => "call-indirect".to_string(),
            Node::StackReference { slot, ty } => format!("stack-ref {slot} : {}&", self.type_name(*ty)),
            Node::StackValue { slot, ty } => format!("stack {slot} : {}", self.type_name(*ty)),
            Node::FieldReference { index, ty, .. } => {
                format!("field-ref {index} : {}&", self.type_name(*ty))
            }
            Node::FieldValue { index, ty, .. } => format!("field {index} : {}", self.type_name(*ty)),
            Node::Assign { .. } => "assign".to_string(),
            Node::Dereference { ty, .. } => format!("deref : {}", self.type_name(*ty)),
            Node::Sequence { ty, .. } => format!("sequence : {}", self.type_name(*ty)),
            Node::If { .. } => "if".to_string(),
            Node::And(..) => "and".to_string(),
            Node::Or(..) => "or".to_string(),
            Node::While { .. } => "while".to_string(),
            Node::Return(_) => "return".to_string(),
            Node::New { class } => format!("new {}", self.type_name(*class)),
            Node::DynamicCast { target, .. } => format!("dynamic-cast {}", self.type_name(*target)),
            Node::Annotated { position, .. } => format!(
                "at {}:{}:{}",
                ctx.interner().lookup(position.file),
                position.line,
                position.column
            ),
            Node::Unresolved { name } => {
                format!("{UNRESOLVED_MARKER} {}", ctx.interner().lookup(*name))
            }
            Node::Curry {
                function, dynamic, ..
            } => {
                let dispatch = if *dynamic { " dynamic" } else { "" };
                format!("curry {}{dispatch}", ctx.function_ref_name(function))
            }
        }
    }

    fn tree(&self, node: &Node, depth: usize, out: &mut String) {
        let indent = "  ".repeat(depth);
        let _ = write!(out, "{indent}({}", self.label(node));
        if let Node::Curry { args, .. } = node {
            for arg in args {
                out.push('\n');
                match arg {
                    Some(arg) => self.tree(arg, depth + 1, out),
                    None => {
                        let _ = write!(out, "{indent}  _");
                    }
                }
            }
        } else {
            for child in node.children() {
                out.push('\n');
                self.tree(child, depth + 1, out);
            }
        }
        out.push(')');
    }

    fn lisp_list<'n>(&self, head: &str, children: impl IntoIterator<Item = &'n Node>, out: &mut String) {
        out.push('(');
        out.push_str(head);
        for child in children {
            out.push(' ');
            self.lisp(child, out);
        }
        out.push(')');
    }

    fn lisp(&self, node: &Node, out: &mut String) {
        let ctx = self.ctx;
        match node {
            Node::Constant { value, .. } => {
                let _ = write!(out, "{value}");
            }
            Node::Call { function, args } => {
                self.lisp_list(&ctx.function_ref_name(function), args, out);
            }
            Node::CallMethod { function, args } => {
                let head = format!("virtual {}", ctx.qualified_function_name(*function));
                self.lisp_list(&head, args, out);
            }
            Node::CallInterface {
                interface,
                slot,
                args,
            } => {
                let head = match ctx.interface_function(*interface, *slot) {
                    Some(function) => ctx.qualified_function_name(function),
                    None => format!("{}[{slot}]", self.type_name(*interface)),
                };
                self.lisp_list(&head, args, out);
            }
            Node::CallIndirect { callee, args } => {
                self.lisp_list("funcall", std::iter::once(callee.as_ref()).chain(args), out);
            }
            Node::StackReference { slot, .. } => {
                let _ = write!(out, "&${slot}");
            }
            Node::StackValue { slot, .. } => {
                let _ = write!(out, "${slot}");
            }
            Node::FieldReference { object, index, .. } => {
                out.push_str("(&. ");
                self.lisp(object, out);
                let _ = write!(out, " {index})");
            }
            Node::FieldValue { object, index, .. } => {
                out.push_str("(. ");
                self.lisp(object, out);
                let _ = write!(out, " {index})");
            }
            Node::Assign { target, value } => {
                self.lisp_list("=", [target.as_ref(), value.as_ref()], out);
            }
            Node::Dereference { reference, .. } => self.lisp_list("deref", [reference.as_ref()], out),
            Node::Sequence { nodes, .. } => self.lisp_list("begin", nodes, out),
            Node::If { .. } => self.lisp_list("if", node.children(), out),
            Node::And(..) => self.lisp_list("and", node.children(), out),
            Node::Or(..) => self.lisp_list("or", node.children(), out),
            Node::While { .. } => self.lisp_list("while", node.children(), out),
            Node::Return(_) => self.lisp_list("return", node.children(), out),
            Node::New { class } => {
                let _ = write!(out, "(new {})", self.type_name(*class));
            }
            Node::DynamicCast { object, target } => {
                let head = format!("cast {}", self.type_name(*target));
                self.lisp_list(&head, [object.as_ref()], out);
            }
            Node::Annotated { node, .. } => self.lisp(node, out),
            Node::Unresolved { name } => {
                let _ = write!(out, "{UNRESOLVED_MARKER}:{}", ctx.interner().lookup(*name));
            }
            Node::Curry { function, args, .. } => {
                let _ = write!(out, "(curry {}", ctx.function_ref_name(function));
                for arg in args {
                    out.push(' ');
                    match arg {
                        Some(arg) => self.lisp(arg, out),
                        None => out.push('_'),
                    }
                }
                out.push(')');
            }
        }
    }
}
