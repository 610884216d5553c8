//! Description files and their syntax tree.
//!
//! Each OS keeps its descriptions as TOML files:
//!
//! ```toml
//! [[resource]]
//! name = "fd"
//! base = "int32"
//! values = ["AT_FDCWD", "-1"]
//!
//! [[struct]]
//! name = "timespec"
//! fields = [{ name = "sec", type = "intptr" }, { name = "nsec", type = "intptr" }]
//!
//! [[syscall]]
//! name = "open"
//! args = [{ name = "file", type = "ptr[int8]" }, { name = "flags", type = "flags[O_RDONLY, O_CREAT]" }]
//! ret = "fd"
//! ```
//!
//! Type expressions are an identifier optionally followed by bracketed,
//! comma-separated arguments (`ptr[timespec]`, `const[AT_FDCWD, int32]`).

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::Deserialize;
use toml::Spanned;

use sysgen_prog::{Diagnostics, Pos};

use crate::pattern;
use crate::DescriptionParser;

/// Names with a fixed meaning in type expressions.
pub const BUILTIN_TYPES: &[&str] = &[
    "int8", "int16", "int32", "int64", "intptr", "const", "flags", "ptr",
];

/// A parsed type expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    Ident(String),
    Apply { name: String, args: Vec<TypeExpr> },
}

impl TypeExpr {
    /// Parse a type expression.
    pub fn parse(input: &str) -> Result<Self, String> {
        let mut parser = TypeParser {
            src: input.as_bytes(),
            at: 0,
        };
        let expr = parser.expr()?;
        parser.skip_ws();
        if parser.at != parser.src.len() {
            return Err(format!(
                "unexpected '{}' in type '{input}'",
                input[parser.at..].chars().next().unwrap_or(' ')
            ));
        }
        Ok(expr)
    }

    pub fn name(&self) -> &str {
        match self {
            TypeExpr::Ident(name) | TypeExpr::Apply { name, .. } => name,
        }
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Ident(name) => f.write_str(name),
            TypeExpr::Apply { name, args } => {
                write!(f, "{name}[")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str("]")
            }
        }
    }
}

struct TypeParser<'a> {
    src: &'a [u8],
    at: usize,
}

impl TypeParser<'_> {
    fn skip_ws(&mut self) {
        while self.at < self.src.len() && self.src[self.at].is_ascii_whitespace() {
            self.at += 1;
        }
    }

    fn ident(&mut self) -> Result<String, String> {
        self.skip_ws();
        let start = self.at;
        while self.at < self.src.len() {
            let c = self.src[self.at];
            if c.is_ascii_alphanumeric() || c == b'_' || c == b'-' {
                self.at += 1;
            } else {
                break;
            }
        }
        if start == self.at {
            return Err(format!("expected identifier at offset {start}"));
        }
        Ok(String::from_utf8_lossy(&self.src[start..self.at]).into_owned())
    }

    fn expr(&mut self) -> Result<TypeExpr, String> {
        let name = self.ident()?;
        self.skip_ws();
        if self.src.get(self.at) != Some(&b'[') {
            return Ok(TypeExpr::Ident(name));
        }
        self.at += 1;
        let mut args = vec![self.expr()?];
        loop {
            self.skip_ws();
            match self.src.get(self.at) {
                Some(b',') => {
                    self.at += 1;
                    args.push(self.expr()?);
                }
                Some(b']') => {
                    self.at += 1;
                    return Ok(TypeExpr::Apply { name, args });
                }
                _ => return Err(format!("unterminated argument list for '{name}'")),
            }
        }
    }
}

/// A struct field or syscall argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldNode {
    pub pos: Pos,
    pub name: String,
    pub ty: TypeExpr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceNode {
    pub pos: Pos,
    pub name: String,
    pub base: TypeExpr,
    /// Special values: integer literals or constant names.
    pub values: Vec<(Pos, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructNode {
    pub pos: Pos,
    pub name: String,
    pub union: bool,
    pub fields: Vec<FieldNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyscallNode {
    pub pos: Pos,
    /// Full name, possibly `call$variant`.
    pub name: String,
    pub args: Vec<FieldNode>,
    pub ret: Option<(Pos, TypeExpr)>,
}

impl SyscallNode {
    /// The underlying call name, without any `$variant` suffix.
    pub fn call_name(&self) -> &str {
        self.name.split('$').next().unwrap_or(&self.name)
    }
}

/// All descriptions of one OS.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ast {
    pub files: Vec<String>,
    pub resources: Vec<ResourceNode>,
    pub structs: Vec<StructNode>,
    pub syscalls: Vec<SyscallNode>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawFile {
    #[serde(default)]
    resource: Vec<RawResource>,
    #[serde(default, rename = "struct")]
    structs: Vec<RawStruct>,
    #[serde(default)]
    syscall: Vec<RawSyscall>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawField {
    name: Spanned<String>,
    #[serde(rename = "type")]
    ty: Spanned<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawResource {
    name: Spanned<String>,
    base: Spanned<String>,
    #[serde(default)]
    values: Vec<Spanned<String>>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawStruct {
    name: Spanned<String>,
    #[serde(default)]
    union: bool,
    fields: Vec<RawField>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSyscall {
    name: Spanned<String>,
    #[serde(default)]
    args: Vec<RawField>,
    ret: Option<Spanned<String>>,
}

/// Reads description files as TOML.
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlDescriptionParser;

impl DescriptionParser for TomlDescriptionParser {
    fn parse(&self, pattern: &Path) -> Result<Ast, Diagnostics> {
        let mut diags = Diagnostics::new();
        let files = pattern::expand(pattern).map_err(|e| {
            let mut d = Diagnostics::new();
            d.push(Pos::file(pattern.display().to_string()), e.to_string());
            d
        })?;

        let mut ast = Ast::default();
        for path in &files {
            let file = path.display().to_string();
            match std::fs::read_to_string(path) {
                Ok(source) => parse_source(&file, &source, &mut ast, &mut diags),
                Err(e) => diags.push(Pos::file(&file), format!("failed to read: {e}")),
            }
            ast.files.push(file);
        }
        check_duplicates(&ast, &mut diags);
        diags.into_result(ast)
    }
}

/// Parse one description file's contents into `ast`.
pub fn parse_source(file: &str, source: &str, ast: &mut Ast, diags: &mut Diagnostics) {
    let raw: RawFile = match toml::from_str(source) {
        Ok(raw) => raw,
        Err(e) => {
            let pos = match e.span() {
                Some(span) => Pos::from_offset(file, source, span.start),
                None => Pos::file(file),
            };
            diags.push(pos, e.message().trim().to_string());
            return;
        }
    };
    let pos_of = |span: std::ops::Range<usize>| Pos::from_offset(file, source, span.start);

    let field = |f: RawField, diags: &mut Diagnostics| -> Option<FieldNode> {
        let pos = pos_of(f.ty.span());
        match TypeExpr::parse(f.ty.get_ref()) {
            Ok(ty) => Some(FieldNode {
                pos,
                name: f.name.into_inner(),
                ty,
            }),
            Err(msg) => {
                diags.push(pos, msg);
                None
            }
        }
    };

    for r in raw.resource {
        let base_pos = pos_of(r.base.span());
        let base = match TypeExpr::parse(r.base.get_ref()) {
            Ok(base) => base,
            Err(msg) => {
                diags.push(base_pos, msg);
                continue;
            }
        };
        ast.resources.push(ResourceNode {
            pos: pos_of(r.name.span()),
            name: r.name.into_inner(),
            base,
            values: r
                .values
                .into_iter()
                .map(|v| (pos_of(v.span()), v.into_inner()))
                .collect(),
        });
    }

    for s in raw.structs {
        let fields = s.fields.into_iter().filter_map(|f| field(f, diags)).collect();
        ast.structs.push(StructNode {
            pos: pos_of(s.name.span()),
            name: s.name.into_inner(),
            union: s.union,
            fields,
        });
    }

    for c in raw.syscall {
        let args = c.args.into_iter().filter_map(|f| field(f, diags)).collect();
        let ret = match c.ret {
            Some(ret) => {
                let pos = pos_of(ret.span());
                match TypeExpr::parse(ret.get_ref()) {
                    Ok(ty) => Some((pos, ty)),
                    Err(msg) => {
                        diags.push(pos, msg);
                        None
                    }
                }
            }
            None => None,
        };
        ast.syscalls.push(SyscallNode {
            pos: pos_of(c.name.span()),
            name: c.name.into_inner(),
            args,
            ret,
        });
    }
}

fn check_duplicates(ast: &Ast, diags: &mut Diagnostics) {
    let mut types: HashMap<&str, &Pos> = HashMap::new();
    let type_names = ast
        .resources
        .iter()
        .map(|r| (r.name.as_str(), &r.pos))
        .chain(ast.structs.iter().map(|s| (s.name.as_str(), &s.pos)));
    for (name, pos) in type_names {
        if BUILTIN_TYPES.contains(&name) {
            diags.push(pos.clone(), format!("'{name}' redefines a builtin type"));
        } else if let Some(prev) = types.insert(name, pos) {
            diags.push(pos.clone(), format!("type '{name}' redefined, previously at {prev}"));
        }
    }

    let mut calls: HashMap<&str, &Pos> = HashMap::new();
    for c in &ast.syscalls {
        if let Some(prev) = calls.insert(c.name.as_str(), &c.pos) {
            diags.push(c.pos.clone(), format!("syscall '{}' redefined, previously at {prev}", c.name));
        }
    }
}
