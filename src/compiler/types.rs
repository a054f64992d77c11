// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowpack contributors

//! Binding type compatibility

use crate::config::UnionVariance;
use crate::model::{Literal, LiteralType, SimpleKind};

/// Whether a value of type `producer` may be bound to a parameter of type
/// `consumer`.
///
/// Primitives must match exactly, containers are checked element-wise and
/// generic placeholders match anything (they are resolved at runtime). A
/// union producer matches according to `variance`; a union consumer accepts
/// any producer that matches one of its members.
pub fn is_compatible(producer: &LiteralType, consumer: &LiteralType, variance: UnionVariance) -> bool {
    if producer == consumer {
        return true;
    }

    match (producer, consumer) {
        (LiteralType::Generic(_), _) | (_, LiteralType::Generic(_)) => true,

        (LiteralType::Union(members), _) => match variance {
            UnionVariance::AnyMember => members
                .iter()
                .any(|m| is_compatible(m, consumer, variance)),
            UnionVariance::AllMembers => {
                !members.is_empty()
                    && members
                        .iter()
                        .all(|m| is_compatible(m, consumer, variance))
            }
        },
        (_, LiteralType::Union(members)) => members
            .iter()
            .any(|m| is_compatible(producer, m, variance)),

        (LiteralType::Simple(a), LiteralType::Simple(b)) => a == b,
        (LiteralType::Collection(a), LiteralType::Collection(b))
        | (LiteralType::Map(a), LiteralType::Map(b)) => is_compatible(a, b, variance),

        (
            LiteralType::Blob {
                format: pf,
                dimensionality: pd,
            },
            LiteralType::Blob {
                format: cf,
                dimensionality: cd,
            },
        ) => pd == cd && (pf.is_empty() || cf.is_empty() || pf == cf),

        (LiteralType::Schema { columns: pc }, LiteralType::Schema { columns: cc }) => {
            pc.is_empty() || cc.iter().all(|c| pc.contains(c))
        }

        (LiteralType::Struct, LiteralType::Struct) => true,
        _ => false,
    }
}

/// Type of a scalar literal, as used for branch operands
pub fn literal_type(literal: &Literal) -> Option<LiteralType> {
    let kind = match literal {
        Literal::Integer(_) => SimpleKind::Integer,
        Literal::Float(_) => SimpleKind::Float,
        Literal::String(_) => SimpleKind::String,
        Literal::Boolean(_) => SimpleKind::Boolean,
        Literal::Datetime(_) => SimpleKind::Datetime,
        Literal::Duration(_) => SimpleKind::Duration,
        Literal::Binary(_) => SimpleKind::Binary,
        Literal::None => SimpleKind::None,
        _ => return None,
    };
    Some(LiteralType::Simple(kind))
}

/// Whether two operand types can be compared in a branch condition
pub fn is_comparable(left: &LiteralType, right: &LiteralType, variance: UnionVariance) -> bool {
    let numeric = |t: &LiteralType| {
        matches!(
            t,
            LiteralType::Simple(SimpleKind::Integer | SimpleKind::Float)
        )
    };

    (numeric(left) && numeric(right))
        || is_compatible(left, right, variance)
        || is_compatible(right, left, variance)
}
