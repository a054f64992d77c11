// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowpack contributors

//! Type tags and literal values
//!
//! [`LiteralType`] is the closed set of types a parameter can declare.
//! [`Literal`] is a concrete value, used for defaults, fixed launch plan
//! inputs and static bindings.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Primitive kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimpleKind {
    Integer,
    Float,
    String,
    Boolean,
    Datetime,
    Duration,
    Binary,
    None,
}

impl fmt::Display for SimpleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => write!(f, "integer"),
            Self::Float => write!(f, "float"),
            Self::String => write!(f, "string"),
            Self::Boolean => write!(f, "boolean"),
            Self::Datetime => write!(f, "datetime"),
            Self::Duration => write!(f, "duration"),
            Self::Binary => write!(f, "binary"),
            Self::None => write!(f, "none"),
        }
    }
}

/// Blob dimensionality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlobDimensionality {
    #[default]
    Single,
    Multipart,
}

/// A named, typed column of a schema (dataframe) type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: SimpleKind,
}

/// Declared type of a parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiteralType {
    Simple(SimpleKind),
    Collection(Box<LiteralType>),
    Map(Box<LiteralType>),
    Blob {
        /// Empty format means "any format"
        #[serde(default)]
        format: String,
        #[serde(default)]
        dimensionality: BlobDimensionality,
    },
    Schema {
        /// Empty column list means "any schema"
        #[serde(default)]
        columns: Vec<SchemaColumn>,
    },
    Struct,
    Union(Vec<LiteralType>),
    /// Generic placeholder, resolved at runtime
    Generic(String),
}

impl LiteralType {
    pub fn simple(kind: SimpleKind) -> Self {
        Self::Simple(kind)
    }

    pub fn collection_of(inner: LiteralType) -> Self {
        Self::Collection(Box::new(inner))
    }

    pub fn map_of(inner: LiteralType) -> Self {
        Self::Map(Box::new(inner))
    }

    /// Whether this type (or anything nested in it) is a generic placeholder
    pub fn contains_generic(&self) -> bool {
        match self {
            Self::Generic(_) => true,
            Self::Collection(inner) | Self::Map(inner) => inner.contains_generic(),
            Self::Union(members) => members.iter().any(LiteralType::contains_generic),
            Self::Simple(_) | Self::Blob { .. } | Self::Schema { .. } | Self::Struct => false,
        }
    }

    /// Whether values of this type can be compared in a branch condition
    pub fn is_primitive(&self) -> bool {
        match self {
            Self::Simple(_) | Self::Generic(_) => true,
            Self::Union(members) => members.iter().all(LiteralType::is_primitive),
            _ => false,
        }
    }
}

impl fmt::Display for LiteralType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simple(kind) => write!(f, "{}", kind),
            Self::Collection(inner) => write!(f, "collection<{}>", inner),
            Self::Map(inner) => write!(f, "map<{}>", inner),
            Self::Blob {
                format,
                dimensionality,
            } => {
                let dim = match dimensionality {
                    BlobDimensionality::Single => "single",
                    BlobDimensionality::Multipart => "multipart",
                };
                if format.is_empty() {
                    write!(f, "blob({})", dim)
                } else {
                    write!(f, "blob({}, {})", format, dim)
                }
            }
            Self::Schema { columns } => {
                if columns.is_empty() {
                    write!(f, "schema")
                } else {
                    let cols: Vec<String> = columns
                        .iter()
                        .map(|c| format!("{}: {}", c.name, c.column_type))
                        .collect();
                    write!(f, "schema{{{}}}", cols.join(", "))
                }
            }
            Self::Struct => write!(f, "struct"),
            Self::Union(members) => {
                let parts: Vec<String> = members.iter().map(ToString::to_string).collect();
                write!(f, "union<{}>", parts.join(" | "))
            }
            Self::Generic(name) => write!(f, "generic<{}>", name),
        }
    }
}

/// A concrete literal value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Literal {
    Integer(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Datetime(String),
    Duration(String),
    /// Base64-encoded bytes
    Binary(String),
    None,
    Collection(Vec<Literal>),
    Map(BTreeMap<String, Literal>),
    Blob { uri: String },
    Schema { uri: String },
    Struct(serde_json::Value),
}

impl Literal {
    /// Short description of the value's shape, for diagnostics
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Boolean(_) => "boolean",
            Self::Datetime(_) => "datetime",
            Self::Duration(_) => "duration",
            Self::Binary(_) => "binary",
            Self::None => "none",
            Self::Collection(_) => "collection",
            Self::Map(_) => "map",
            Self::Blob { .. } => "blob",
            Self::Schema { .. } => "schema",
            Self::Struct(_) => "struct",
        }
    }

    /// Whether this value can be assigned to a parameter of type `ty`.
    ///
    /// Integers widen to float. A union accepts a value conforming to any
    /// member and a generic placeholder accepts anything.
    pub fn conforms_to(&self, ty: &LiteralType) -> bool {
        match (self, ty) {
            (_, LiteralType::Generic(_)) => true,
            (_, LiteralType::Union(members)) => members.iter().any(|m| self.conforms_to(m)),
            (Self::Integer(_), LiteralType::Simple(SimpleKind::Integer | SimpleKind::Float)) => {
                true
            }
            (Self::Float(_), LiteralType::Simple(SimpleKind::Float)) => true,
            (Self::String(_), LiteralType::Simple(SimpleKind::String)) => true,
            (Self::Boolean(_), LiteralType::Simple(SimpleKind::Boolean)) => true,
            (Self::Datetime(_), LiteralType::Simple(SimpleKind::Datetime)) => true,
            (Self::Duration(_), LiteralType::Simple(SimpleKind::Duration)) => true,
            (Self::Binary(_), LiteralType::Simple(SimpleKind::Binary)) => true,
            (Self::None, LiteralType::Simple(SimpleKind::None)) => true,
            (Self::Collection(items), LiteralType::Collection(inner)) => {
                items.iter().all(|item| item.conforms_to(inner))
            }
            (Self::Map(entries), LiteralType::Map(inner)) => {
                entries.values().all(|value| value.conforms_to(inner))
            }
            (Self::Blob { .. }, LiteralType::Blob { .. }) => true,
            (Self::Schema { .. }, LiteralType::Schema { .. }) => true,
            (Self::Struct(_), LiteralType::Struct) => true,
            _ => false,
        }
    }

    /// Whether the value is a scalar usable as a branch operand
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Self::Integer(_)
                | Self::Float(_)
                | Self::String(_)
                | Self::Boolean(_)
                | Self::Datetime(_)
                | Self::Duration(_)
                | Self::Binary(_)
                | Self::None
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_type_tags() {
        let json = r#"{"collection": {"map": {"simple": "integer"}}}"#;
        let ty: LiteralType = serde_json::from_str(json).unwrap();
        assert_eq!(
            ty,
            LiteralType::collection_of(LiteralType::map_of(LiteralType::simple(
                SimpleKind::Integer
            )))
        );
        assert_eq!(ty.to_string(), "collection<map<integer>>");

        let st: LiteralType = serde_json::from_str(r#""struct""#).unwrap();
        assert_eq!(st, LiteralType::Struct);
    }

    #[test]
    fn test_integer_widens_to_float_but_not_back() {
        let float = LiteralType::simple(SimpleKind::Float);
        let int = LiteralType::simple(SimpleKind::Integer);
        assert!(Literal::Integer(3).conforms_to(&float));
        assert!(!Literal::Float(3.0).conforms_to(&int));
    }

    #[test]
    fn test_collection_conformance_is_elementwise() {
        let ty = LiteralType::collection_of(LiteralType::simple(SimpleKind::String));
        let good = Literal::Collection(vec![Literal::String("a".into())]);
        let bad = Literal::Collection(vec![Literal::String("a".into()), Literal::Integer(1)]);
        assert!(good.conforms_to(&ty));
        assert!(!bad.conforms_to(&ty));
    }

    #[test]
    fn test_optional_union_accepts_none() {
        let optional = LiteralType::Union(vec![
            LiteralType::simple(SimpleKind::String),
            LiteralType::simple(SimpleKind::None),
        ]);
        assert!(Literal::None.conforms_to(&optional));
        assert!(!Literal::Boolean(true).conforms_to(&optional));
    }

    #[test]
    fn test_binary_literal() {
        let literal: Literal = serde_json::from_str(r#"{"binary": "3q2+7w=="}"#).unwrap();
        assert_eq!(literal.shape(), "binary");
        assert!(literal.conforms_to(&LiteralType::simple(SimpleKind::Binary)));
        assert!(!literal.conforms_to(&LiteralType::simple(SimpleKind::String)));
    }

    #[test]
    fn test_contains_generic() {
        let ty = LiteralType::map_of(LiteralType::Generic("T".into()));
        assert!(ty.contains_generic());
        assert!(!LiteralType::Struct.contains_generic());
    }
}
