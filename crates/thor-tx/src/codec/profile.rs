//! Declarative profiles and the recursive pack/unpack engine.

use std::{collections::BTreeMap, sync::Arc};

use super::{CodecError, RlpItem, ScalarKind, Value};

/// Shape of a profile node.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Kind {
    /// Leaf codec.
    Scalar(ScalarKind),
    /// Named fields whose declaration order is the wire order.
    Struct(Vec<Profile>),
    /// Homogeneous list sharing one item kind.
    Array(Arc<Kind>),
}

/// Named schema node.
///
/// Profiles hold no runtime state; build them once (typically in a `LazyLock` static) and
/// reuse them for every encode and decode.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Profile {
    /// Field name in the parent record and segment of the error context path.
    pub name: &'static str,
    /// Node shape.
    pub kind: Kind,
}

impl Profile {
    /// Scalar leaf profile.
    #[must_use]
    pub const fn scalar(name: &'static str, kind: ScalarKind) -> Self {
        Self {
            name,
            kind: Kind::Scalar(kind),
        }
    }

    /// Struct profile with `fields` in wire order.
    #[must_use]
    pub const fn structure(name: &'static str, fields: Vec<Self>) -> Self {
        Self {
            name,
            kind: Kind::Struct(fields),
        }
    }

    /// Array profile whose elements all use `item`.
    #[must_use]
    pub fn array(name: &'static str, item: Kind) -> Self {
        Self {
            name,
            kind: Kind::Array(Arc::new(item)),
        }
    }

    /// Packs `value` into a nested item tree.
    ///
    /// `context` is the path of the parent node; errors report `context.name...`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] with the dotted path of the first node that rejects its value.
    pub fn pack(&self, value: &Value, context: &str) -> Result<RlpItem, CodecError> {
        self.kind.pack(value, &join(context, self.name))
    }

    /// Unpacks a nested item tree into a value.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] with the dotted path of the first node whose item has the wrong
    /// shape or content.
    pub fn unpack(&self, item: &RlpItem, context: &str) -> Result<Value, CodecError> {
        self.kind.unpack(item, &join(context, self.name))
    }

    /// Packs `value` and serializes it to RLP bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] when packing fails.
    pub fn encode_object(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        Ok(self.pack(value, "")?.to_rlp())
    }

    /// Parses RLP bytes and unpacks them into a value.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] for malformed RLP, trailing bytes, or unpack failures.
    pub fn decode_object(&self, bytes: &[u8]) -> Result<Value, CodecError> {
        let item = RlpItem::from_rlp(bytes)?;
        self.unpack(&item, "")
    }
}

impl Kind {
    /// Packs `value` at the node addressed by `context`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] naming the failing node.
    pub fn pack(&self, value: &Value, context: &str) -> Result<RlpItem, CodecError> {
        match self {
            Self::Scalar(kind) => kind.encode(value, context).map(RlpItem::Bytes),
            Self::Struct(fields) => {
                let Value::Record(record) = value else {
                    return Err(mismatch(context, "record", value.type_name()));
                };
                let null = Value::Null;
                fields
                    .iter()
                    .map(|field| field.pack(record.get(field.name).unwrap_or(&null), context))
                    .collect::<Result<Vec<_>, _>>()
                    .map(RlpItem::List)
            }
            Self::Array(item) => {
                let Value::List(elements) = value else {
                    return Err(mismatch(context, "list", value.type_name()));
                };
                elements
                    .iter()
                    .enumerate()
                    .map(|(index, element)| item.pack(element, &element_context(context, index)))
                    .collect::<Result<Vec<_>, _>>()
                    .map(RlpItem::List)
            }
        }
    }

    /// Unpacks `item` at the node addressed by `context`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] naming the failing node.
    pub fn unpack(&self, item: &RlpItem, context: &str) -> Result<Value, CodecError> {
        match (self, item) {
            (Self::Scalar(kind), RlpItem::Bytes(bytes)) => kind.decode(bytes, context),
            (Self::Scalar(_), RlpItem::List(_)) => {
                Err(mismatch(context, "byte string", item.type_name()))
            }
            (Self::Struct(fields), RlpItem::List(items)) => {
                if items.len() != fields.len() {
                    return Err(CodecError::FieldCount {
                        context: context.to_owned(),
                        expected: fields.len(),
                        actual: items.len(),
                    });
                }
                let mut record = BTreeMap::new();
                for (field, item) in fields.iter().zip(items) {
                    let value = field.unpack(item, context)?;
                    record.insert(field.name.to_owned(), value);
                }
                Ok(Value::Record(record))
            }
            (Self::Array(kind), RlpItem::List(items)) => items
                .iter()
                .enumerate()
                .map(|(index, element)| kind.unpack(element, &element_context(context, index)))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            (Self::Struct(_) | Self::Array(_), RlpItem::Bytes(_)) => {
                Err(mismatch(context, "list", item.type_name()))
            }
        }
    }
}

/// Appends `name` to a dotted context path.
fn join(context: &str, name: &str) -> String {
    if context.is_empty() {
        name.to_owned()
    } else {
        format!("{context}.{name}")
    }
}

/// Context path of the `index`-th array element.
fn element_context(context: &str, index: usize) -> String {
    join(context, &format!("#{index}"))
}

/// Structural mismatch at `context`.
fn mismatch(context: &str, expected: &'static str, actual: &'static str) -> CodecError {
    CodecError::UnexpectedType {
        context: context.to_owned(),
        expected,
        actual,
    }
}
