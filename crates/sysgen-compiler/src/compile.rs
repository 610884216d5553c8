//! Type resolution and per-target layout.
//!
//! Compilation resolves every type expression against the OS's resources and
//! structs, computes sizes and alignment for the target's pointer width, and
//! assigns syscall numbers from `__NR_<call>` constants. A constant missing
//! from the target's tables makes every syscall that needs it (directly or
//! through a struct) unsupported on that target: the syscall is dropped and
//! the constant name is reported in [`Program::unsupported`].

use std::collections::{BTreeSet, HashMap, HashSet};

use sysgen_prog::{
    ConstMap, ConstValue, Diagnostics, Field, Pos, Program, Resource, StructDesc, Syscall, Type,
    SYNTHETIC_PREFIX,
};
use sysgen_targets::Target;

use crate::ast::{Ast, FieldNode, ResourceNode, StructNode, TypeExpr};
use crate::consts::parse_value;
use crate::Compiler;

/// Syscall number given to synthetic calls (prints as -1 in C tables).
pub const SYNTHETIC_NR: u64 = u64::MAX;

/// Resolves descriptions into a [`Program`] laid out for one target.
#[derive(Debug, Clone, Copy, Default)]
pub struct LayoutCompiler;

impl Compiler for LayoutCompiler {
    fn compile(&self, ast: &Ast, consts: &ConstMap, target: &Target) -> Result<Program, Diagnostics> {
        let mut ctx = Context::new(ast, consts, target);
        let program = ctx.compile();
        ctx.diags.into_result(program)
    }
}

/// Symbols a type depends on.
#[derive(Debug, Default)]
struct Refs {
    missing: BTreeSet<String>,
    structs: BTreeSet<String>,
}

struct Context<'a> {
    ast: &'a Ast,
    consts: &'a ConstMap,
    target: &'a Target,
    diags: Diagnostics,
    resources: HashMap<&'a str, &'a ResourceNode>,
    structs: HashMap<&'a str, &'a StructNode>,
    resource_types: HashMap<&'a str, Type>,
    /// `None` marks a struct whose layout failed.
    layouts: HashMap<&'a str, Option<(u64, u64)>>,
    in_progress: HashSet<&'a str>,
    struct_refs: HashMap<&'a str, Refs>,
    descs: HashMap<&'a str, StructDesc>,
}

impl<'a> Context<'a> {
    fn new(ast: &'a Ast, consts: &'a ConstMap, target: &'a Target) -> Self {
        Self {
            ast,
            consts,
            target,
            diags: Diagnostics::new(),
            resources: ast.resources.iter().map(|r| (r.name.as_str(), r)).collect(),
            structs: ast.structs.iter().map(|s| (s.name.as_str(), s)).collect(),
            resource_types: HashMap::new(),
            layouts: HashMap::new(),
            in_progress: HashSet::new(),
            struct_refs: HashMap::new(),
            descs: HashMap::new(),
        }
    }

    fn compile(&mut self) -> Program {
        let ast = self.ast;
        let mut unsupported = BTreeSet::new();

        let mut resources = Vec::new();
        for node in &ast.resources {
            if let Some(resource) = self.compile_resource(node, &mut unsupported) {
                resources.push(resource);
            }
        }

        for node in &ast.structs {
            self.struct_layout(&node.name);
        }

        let mut struct_descs = Vec::new();
        for node in &ast.structs {
            let missing = self.transitive_missing(&node.name, &Refs::default());
            if missing.is_empty() {
                if let Some(desc) = self.descs.remove(node.name.as_str()) {
                    struct_descs.push(desc);
                }
            } else {
                unsupported.extend(missing);
            }
        }

        let mut syscalls = Vec::new();
        for node in &ast.syscalls {
            let mut refs = Refs::default();
            let mut ok = true;
            let mut args = Vec::with_capacity(node.args.len());
            for arg in &node.args {
                match self.resolve_field(arg, &mut refs) {
                    Some(field) => args.push(field),
                    None => ok = false,
                }
            }
            let ret = match &node.ret {
                Some((pos, expr)) => match self.resolve(expr, pos, &mut refs) {
                    Some(ty @ (Type::Int { .. } | Type::Resource { .. })) => Some(ty),
                    Some(_) => {
                        self.diags.push(
                            pos.clone(),
                            format!("{}: return type must be an integer or resource", node.name),
                        );
                        ok = false;
                        None
                    }
                    None => {
                        ok = false;
                        None
                    }
                },
                None => None,
            };

            let call_name = node.call_name();
            let nr = if call_name.starts_with(SYNTHETIC_PREFIX) {
                SYNTHETIC_NR
            } else if self.target.syscall_numbers {
                self.lookup(&format!("__NR_{call_name}"), &mut refs)
            } else {
                0
            };

            let missing = self.transitive_missing("", &refs);
            if !missing.is_empty() {
                unsupported.extend(missing);
                continue;
            }
            if ok {
                syscalls.push(Syscall {
                    id: 0,
                    nr,
                    name: node.name.clone(),
                    call_name: call_name.to_string(),
                    args,
                    ret,
                });
            }
        }

        syscalls.sort_by(|a, b| a.name.cmp(&b.name));
        for (id, call) in syscalls.iter_mut().enumerate() {
            call.id = id;
        }

        Program {
            syscalls,
            resources,
            struct_descs,
            unsupported,
        }
    }

    fn compile_resource(
        &mut self,
        node: &'a ResourceNode,
        unsupported: &mut BTreeSet<String>,
    ) -> Option<Resource> {
        let base = self.int_type(&node.base, &node.pos)?;
        self.resource_types.insert(
            &node.name,
            Type::Resource {
                name: node.name.clone(),
                size: base.size(),
            },
        );

        let mut values = Vec::new();
        for (pos, value) in &node.values {
            if let Some(v) = parse_value(value) {
                values.push(v);
            } else if let Some(&v) = self.consts.get(value) {
                values.push(v);
            } else if value.starts_with(|c: char| c.is_ascii_digit() || c == '-') {
                self.diags.push(pos.clone(), format!("bad resource value '{value}'"));
            } else {
                unsupported.insert(value.clone());
            }
        }

        Some(Resource {
            name: node.name.clone(),
            base,
            values,
        })
    }

    fn int_type(&mut self, expr: &TypeExpr, pos: &Pos) -> Option<Type> {
        let size = match expr {
            TypeExpr::Ident(name) => match name.as_str() {
                "int8" => Some(1),
                "int16" => Some(2),
                "int32" => Some(4),
                "int64" => Some(8),
                "intptr" => Some(self.target.ptr_size),
                _ => None,
            },
            TypeExpr::Apply { .. } => None,
        };
        if size.is_none() {
            self.diags
                .push(pos.clone(), format!("'{expr}' is not an integer type"));
        }
        size.map(|size| Type::Int { size })
    }

    fn resolve_field(&mut self, node: &'a FieldNode, refs: &mut Refs) -> Option<Field> {
        let ty = self.resolve(&node.ty, &node.pos, refs)?;
        Some(Field {
            name: node.name.clone(),
            ty,
        })
    }

    fn lookup(&mut self, name: &str, refs: &mut Refs) -> u64 {
        match self.consts.get(name) {
            Some(&v) => v,
            None => {
                refs.missing.insert(name.to_string());
                0
            }
        }
    }

    /// Resolve a constant argument: an integer literal or a constant name.
    fn const_value(&mut self, arg: &TypeExpr, pos: &Pos, refs: &mut Refs) -> Option<ConstValue> {
        match arg {
            TypeExpr::Ident(name) => {
                let value = match parse_value(name) {
                    Some(v) => v,
                    None => self.lookup(name, refs),
                };
                Some(ConstValue::new(name.clone(), value))
            }
            TypeExpr::Apply { .. } => {
                self.diags
                    .push(pos.clone(), format!("expected a constant, got '{arg}'"));
                None
            }
        }
    }

    fn resolve(&mut self, expr: &'a TypeExpr, pos: &Pos, refs: &mut Refs) -> Option<Type> {
        match expr {
            TypeExpr::Ident(name) => match name.as_str() {
                "int8" | "int16" | "int32" | "int64" | "intptr" => self.int_type(expr, pos),
                "const" | "flags" | "ptr" => {
                    self.diags
                        .push(pos.clone(), format!("'{name}' requires arguments"));
                    None
                }
                _ if self.resources.contains_key(name.as_str()) => {
                    // Resources that failed to compile were already reported.
                    self.resource_types.get(name.as_str()).cloned()
                }
                _ if self.structs.contains_key(name.as_str()) => {
                    refs.structs.insert(name.clone());
                    let (size, align) = self.struct_layout(name)?;
                    Some(Type::Struct {
                        name: name.clone(),
                        size,
                        align,
                    })
                }
                _ => {
                    self.diags.push(pos.clone(), format!("unknown type '{name}'"));
                    None
                }
            },
            TypeExpr::Apply { name, args } => match name.as_str() {
                "const" => {
                    if args.len() > 2 {
                        self.diags
                            .push(pos.clone(), format!("'{expr}': const takes 1 or 2 arguments"));
                        return None;
                    }
                    let value = self.const_value(&args[0], pos, refs)?;
                    let size = match args.get(1) {
                        Some(size) => self.int_type(size, pos)?.size(),
                        None => self.target.ptr_size,
                    };
                    Some(Type::Const {
                        name: value.name,
                        value: value.value,
                        size,
                    })
                }
                "flags" => {
                    let mut values = Vec::with_capacity(args.len());
                    for arg in args {
                        values.push(self.const_value(arg, pos, refs)?);
                    }
                    Some(Type::Flags {
                        values,
                        size: self.target.ptr_size,
                    })
                }
                "ptr" => {
                    if args.len() != 1 {
                        self.diags
                            .push(pos.clone(), format!("'{expr}': ptr takes 1 argument"));
                        return None;
                    }
                    let elem = match &args[0] {
                        TypeExpr::Ident(elem) if self.structs.contains_key(elem.as_str()) => {
                            refs.structs.insert(elem.clone());
                            Type::StructRef { name: elem.clone() }
                        }
                        other => self.resolve(other, pos, refs)?,
                    };
                    Some(Type::Ptr {
                        elem: Box::new(elem),
                        size: self.target.ptr_size,
                    })
                }
                _ => {
                    self.diags
                        .push(pos.clone(), format!("'{name}' does not take arguments"));
                    None
                }
            },
        }
    }

    /// Compute (size, align) of a struct, memoized. Direct self-embedding is
    /// an error; recursion through pointers is fine.
    fn struct_layout(&mut self, name: &str) -> Option<(u64, u64)> {
        let node: &'a StructNode = self.structs.get(name).copied()?;
        let name = node.name.as_str();
        if let Some(layout) = self.layouts.get(name) {
            return *layout;
        }
        if !self.in_progress.insert(name) {
            self.diags
                .push(node.pos.clone(), format!("struct '{name}' is recursive"));
            self.layouts.insert(name, None);
            return None;
        }

        let mut refs = Refs::default();
        let mut fields = Vec::with_capacity(node.fields.len());
        let mut ok = true;
        for field in &node.fields {
            match self.resolve_field(field, &mut refs) {
                Some(f) => fields.push(f),
                None => ok = false,
            }
        }
        self.in_progress.remove(name);
        self.struct_refs.insert(name, refs);

        if !ok || self.layouts.get(name) == Some(&None) {
            self.layouts.insert(name, None);
            return None;
        }

        let align = fields.iter().map(|f| f.ty.align()).max().unwrap_or(1);
        let size = if node.union {
            fields.iter().map(|f| f.ty.size()).max().unwrap_or(0)
        } else {
            fields.iter().fold(0, |offset, f| {
                round_up(offset, f.ty.align()) + f.ty.size()
            })
        };
        let size = round_up(size, align);

        self.layouts.insert(name, Some((size, align)));
        self.descs.insert(
            name,
            StructDesc {
                name: name.to_string(),
                union: node.union,
                size,
                align,
                fields,
            },
        );
        Some((size, align))
    }

    /// Missing constants of `start` (a struct name, or "" for none) plus
    /// `extra`, following struct references transitively.
    fn transitive_missing(&self, start: &str, extra: &Refs) -> BTreeSet<String> {
        let mut missing = extra.missing.clone();
        let mut visited: HashSet<&str> = HashSet::new();
        let mut stack: Vec<&str> = extra.structs.iter().map(String::as_str).collect();
        if !start.is_empty() {
            stack.push(start);
        }
        while let Some(name) = stack.pop() {
            if !visited.insert(name) {
                continue;
            }
            if let Some(refs) = self.struct_refs.get(name) {
                missing.extend(refs.missing.iter().cloned());
                stack.extend(refs.structs.iter().map(String::as_str));
            }
        }
        missing
    }
}

fn round_up(value: u64, align: u64) -> u64 {
    let align = align.max(1);
    value.div_ceil(align) * align
}
