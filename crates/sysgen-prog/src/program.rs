//! Compiled program for one target.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::consts::ConstValue;

/// Call-name prefix of synthetic calls implemented by the executor itself.
pub const SYNTHETIC_PREFIX: &str = "syz_";

/// A resolved argument or field type with its target-specific layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Type {
    /// Plain integer of `size` bytes.
    Int { size: u64 },
    /// A single named constant value.
    Const { name: String, value: u64, size: u64 },
    /// A set of named flag values.
    Flags { values: Vec<ConstValue>, size: u64 },
    /// Pointer to `elem`.
    Ptr { elem: Box<Type>, size: u64 },
    /// A resource handle.
    Resource { name: String, size: u64 },
    /// An embedded struct or union.
    Struct { name: String, size: u64, align: u64 },
    /// A struct named through a pointer; its layout lives in the struct table.
    StructRef { name: String },
}

impl Type {
    pub fn size(&self) -> u64 {
        match self {
            Type::Int { size }
            | Type::Const { size, .. }
            | Type::Flags { size, .. }
            | Type::Ptr { size, .. }
            | Type::Resource { size, .. }
            | Type::Struct { size, .. } => *size,
            Type::StructRef { .. } => 0,
        }
    }

    /// Natural alignment: scalars align to their size, structs carry their own.
    pub fn align(&self) -> u64 {
        match self {
            Type::Struct { align, .. } => *align,
            other => other.size().max(1),
        }
    }
}

/// A named syscall argument or struct field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: Type,
}

/// A compiled syscall.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Syscall {
    /// Index in the program's syscall table.
    pub id: usize,
    /// Numeric code used for dispatch.
    pub nr: u64,
    /// Full name including any `$variant` suffix.
    pub name: String,
    /// Name of the underlying call.
    pub call_name: String,
    pub args: Vec<Field>,
    pub ret: Option<Type>,
}

impl Syscall {
    /// Synthetic calls have no kernel entry point and always dispatch
    /// through a callback.
    pub fn is_synthetic(&self) -> bool {
        self.call_name.starts_with(SYNTHETIC_PREFIX)
    }
}

/// A compiled resource kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub name: String,
    pub base: Type,
    /// Special values usable in place of a real resource.
    pub values: Vec<u64>,
}

/// A compiled struct or union layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructDesc {
    pub name: String,
    pub union: bool,
    pub size: u64,
    pub align: u64,
    pub fields: Vec<Field>,
}

/// Everything compiled for one target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    pub syscalls: Vec<Syscall>,
    pub resources: Vec<Resource>,
    pub struct_descs: Vec<StructDesc>,
    /// Symbols the target could not represent.
    pub unsupported: BTreeSet<String>,
}

impl Program {
    pub fn syscall(&self, name: &str) -> Option<&Syscall> {
        self.syscalls.iter().find(|s| s.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_accessors() {
        let ptr = Type::Ptr {
            elem: Box::new(Type::Int { size: 1 }),
            size: 8,
        };
        assert_eq!(ptr.size(), 8);
        assert_eq!(ptr.align(), 8);

        let st = Type::Struct {
            name: "timespec".into(),
            size: 16,
            align: 8,
        };
        assert_eq!(st.size(), 16);
        assert_eq!(st.align(), 8);

        let empty = Type::Struct {
            name: "empty".into(),
            size: 0,
            align: 1,
        };
        assert_eq!(empty.align(), 1);
    }

    #[test]
    fn type_serializes_with_kind_tag() {
        let field = Field {
            name: "flags".into(),
            ty: Type::Const {
                name: "O_RDONLY".into(),
                value: 0,
                size: 4,
            },
        };
        let json = serde_json::to_string(&field).unwrap();
        assert!(json.contains("\"type\""));
        assert!(json.contains("\"kind\":\"const\""));
    }
}
