//! Ports and the data shapes that flow through them.
//!
//! A port is a named, typed, directional attachment point on a flow element.
//! Input ports additionally carry the grouping (shuffle) key, a connectivity
//! constraint, a buffering mode for list-typed inputs, and — on join-family
//! operators — the master/transaction role the rewrite pass keys on.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Scalar field types understood by the compiler.
///
/// Join-key compatibility is equality on this enum; there are no implicit
/// widening conversions between key fields.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum FieldType {
    Boolean,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    Decimal,
    Text,
    Date,
    DateTime,
}

impl FieldType {
    /// Whether a key field of this type can be matched against `other`.
    #[must_use]
    pub fn compatible_with(self, other: FieldType) -> bool {
        self == other
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Boolean => "boolean",
            Self::Byte => "byte",
            Self::Short => "short",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::Decimal => "decimal",
            Self::Text => "text",
            Self::Date => "date",
            Self::DateTime => "datetime",
        };
        f.write_str(name)
    }
}

/// One named field of a record type.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub ty: FieldType,
}

impl Field {
    #[must_use]
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// A record data type: a name plus ordered field accessors.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct DataType {
    pub name: String,
    pub fields: Vec<Field>,
}

impl DataType {
    #[must_use]
    pub fn new(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// Look up a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Sort directive for one shuffle-key property.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct SortOrder {
    pub field: String,
    pub ascending: bool,
}

/// Grouping key of an input port: the ordered property names the stream is
/// partitioned by, plus per-group ordering directives.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct ShuffleKey {
    pub group: Vec<String>,
    pub ordering: Vec<SortOrder>,
}

impl ShuffleKey {
    #[must_use]
    pub fn grouped_by<S: Into<String>>(group: impl IntoIterator<Item = S>) -> Self {
        Self {
            group: group.into_iter().map(Into::into).collect(),
            ordering: Vec::new(),
        }
    }

    #[must_use]
    pub fn ordered_by(mut self, field: impl Into<String>, ascending: bool) -> Self {
        self.ordering.push(SortOrder {
            field: field.into(),
            ascending,
        });
        self
    }
}

/// Whether a port must end up connected for the plan to be valid.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub enum Connectivity {
    Optional,
    #[default]
    Mandatory,
}

/// Buffering mode of a list-typed operator input.
///
/// `Heap` materializes the whole group in memory. `Swap` is a single-pass
/// streaming view holding at most one element at a time; consuming more than
/// one element from the same group without copying is unsafe under it.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub enum InputBuffer {
    #[default]
    Heap,
    Swap,
}

/// Role of an input port on a join-family operator.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum JoinRole {
    /// The side that would be hash-loaded by a side-data join.
    Master,
    /// The main stream.
    Transaction,
}

/// Declared shape of one port, before it is attached to an element.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PortDescription {
    pub name: String,
    pub data_type: DataType,
    pub connectivity: Connectivity,
    /// Whether this input accepts more than one incoming connection.
    /// Per-port capability, not a global rule; meaningless on outputs.
    pub fan_in: bool,
    pub shuffle_key: Option<ShuffleKey>,
    pub buffer: Option<InputBuffer>,
    pub join_role: Option<JoinRole>,
}

impl PortDescription {
    /// A plain port: mandatory, single-valued, no shuffle key.
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            connectivity: Connectivity::default(),
            fan_in: false,
            shuffle_key: None,
            buffer: None,
            join_role: None,
        }
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.connectivity = Connectivity::Optional;
        self
    }

    #[must_use]
    pub fn with_fan_in(mut self) -> Self {
        self.fan_in = true;
        self
    }

    #[must_use]
    pub fn with_shuffle_key(mut self, key: ShuffleKey) -> Self {
        self.shuffle_key = Some(key);
        self
    }

    #[must_use]
    pub fn with_buffer(mut self, buffer: InputBuffer) -> Self {
        self.buffer = Some(buffer);
        self
    }

    #[must_use]
    pub fn with_role(mut self, role: JoinRole) -> Self {
        self.join_role = Some(role);
        self
    }
}

/// A port attached to an element. The description is immutable once built;
/// live connections are tracked by the owning graph, in insertion order.
#[derive(Clone, Debug)]
pub struct Port {
    pub(crate) description: PortDescription,
    pub(crate) connections: Vec<crate::element_id::ConnectionId>,
}

impl Port {
    pub(crate) fn new(description: PortDescription) -> Self {
        Self {
            description,
            connections: Vec::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.description.name
    }

    #[must_use]
    pub fn data_type(&self) -> &DataType {
        &self.description.data_type
    }

    #[must_use]
    pub fn connectivity(&self) -> Connectivity {
        self.description.connectivity
    }

    #[must_use]
    pub fn shuffle_key(&self) -> Option<&ShuffleKey> {
        self.description.shuffle_key.as_ref()
    }

    #[must_use]
    pub fn buffer(&self) -> Option<InputBuffer> {
        self.description.buffer
    }

    #[must_use]
    pub fn join_role(&self) -> Option<JoinRole> {
        self.description.join_role
    }

    #[must_use]
    pub fn description(&self) -> &PortDescription {
        &self.description
    }

    /// Live connections on this port, in the order they were made.
    #[must_use]
    pub fn connections(&self) -> &[crate::element_id::ConnectionId] {
        &self.connections
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        !self.connections.is_empty()
    }
}
