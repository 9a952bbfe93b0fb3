//! Contracts with the collaborators outside this crate.
//!
//! Upstream, the model builder attaches importer/exporter descriptions to
//! flow inputs and outputs. Downstream, the code emitter implements
//! [`ResourceResolver`] to materialize side-data lookup artifacts. The core
//! never parses text and never emits code; it only reads these descriptions
//! and calls the resolver seam.

use crate::port::DataType;
use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared size category of an imported dataset.
///
/// `Tiny` enables the side-data join rewrite. `Small` is a documented future
/// extension of that gate and is not yet enabled — the policy check rejects
/// it regardless of compiler options. `Large` never qualifies.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum SizeCategory {
    Tiny,
    Small,
    Large,
}

impl fmt::Display for SizeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Tiny => "tiny",
            Self::Small => "small",
            Self::Large => "large",
        };
        f.write_str(name)
    }
}

/// Wire format of an imported or exported dataset.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum WireFormat {
    /// The platform's internal record format; the only format the side-data
    /// rewrite recognizes.
    Temporary,
    /// Externally-defined direct I/O; opaque to the optimizer.
    Direct,
}

impl fmt::Display for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Temporary => "temporary",
            Self::Direct => "direct",
        };
        f.write_str(name)
    }
}

/// Import settings attached to a flow input by the upstream model builder.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct ImporterDescription {
    pub name: String,
    pub size: SizeCategory,
    pub format: WireFormat,
}

impl ImporterDescription {
    #[must_use]
    pub fn new(name: impl Into<String>, size: SizeCategory, format: WireFormat) -> Self {
        Self {
            name: name.into(),
            size,
            format,
        }
    }
}

/// Export settings attached to a flow output.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct ExporterDescription {
    pub name: String,
    pub format: WireFormat,
}

impl ExporterDescription {
    #[must_use]
    pub fn new(name: impl Into<String>, format: WireFormat) -> Self {
        Self {
            name: name.into(),
            format,
        }
    }
}

/// Description of a side-data join resource: which input to pre-materialize,
/// the field shape and ordered join keys of the master side, and the same for
/// the transaction stream.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct JoinResourceDescription {
    /// Name of the flow input the lookup structure is built from.
    pub cache_name: String,
    pub master_type: DataType,
    pub master_keys: Vec<String>,
    pub transaction_type: DataType,
    pub transaction_keys: Vec<String>,
}

impl JoinResourceDescription {
    /// Check the join-key invariant: both key lists have equal length, every
    /// key names a declared field, and paired fields have compatible types.
    ///
    /// # Errors
    ///
    /// On arity mismatch, an unknown key field, or a type-incompatible pair.
    pub fn validate(&self) -> Result<()> {
        if self.master_keys.len() != self.transaction_keys.len() {
            bail!(
                "join-key arity mismatch for '{}': master has {} keys, transaction has {}",
                self.cache_name,
                self.master_keys.len(),
                self.transaction_keys.len(),
            );
        }
        for (master_key, transaction_key) in self.master_keys.iter().zip(&self.transaction_keys) {
            let Some(master_field) = self.master_type.field(master_key) else {
                bail!(
                    "join key '{}' is not a field of master type '{}'",
                    master_key,
                    self.master_type.name,
                );
            };
            let Some(transaction_field) = self.transaction_type.field(transaction_key) else {
                bail!(
                    "join key '{}' is not a field of transaction type '{}'",
                    transaction_key,
                    self.transaction_type.name,
                );
            };
            if !master_field.ty.compatible_with(transaction_field.ty) {
                bail!(
                    "join keys '{}: {}' and '{}: {}' have incompatible types",
                    master_key,
                    master_field.ty,
                    transaction_key,
                    transaction_field.ty,
                );
            }
        }
        Ok(())
    }
}

/// A resolved side-data dependency attached to a rewritten operator.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct SideDataResource {
    pub description: JoinResourceDescription,
    /// Globally addressable name of the generated lookup artifact, as
    /// returned by the code emitter.
    pub resolved_name: String,
}

/// Seam to the external code emitter.
///
/// `resolve` accepts a join-resource description and returns a globally
/// addressable name for the generated lookup artifact. Failure is an I/O
/// error while emitting the artifact and is fatal for the enclosing rewrite.
///
/// `Send + Sync` so independent flow-graph compilations on separate threads
/// can share one emitter.
pub trait ResourceResolver: Send + Sync {
    /// Materialize (or schedule) the lookup artifact for `resource`.
    ///
    /// # Errors
    ///
    /// Any emitter-side I/O failure; the caller propagates it as a fatal
    /// compilation error.
    fn resolve(&self, resource: &JoinResourceDescription) -> Result<String>;
}
