//! Flow element descriptions: kinds, names, attributes and parameters.
//!
//! The operator kind set is a closed enum matched exhaustively everywhere it
//! is inspected — adding a kind is a compile-time exhaustiveness error in the
//! rewrite pass rather than a silently unhandled runtime case.

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of operator carried by an [`ElementKind::Operator`] element.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum OperatorKind {
    MasterJoin,
    MasterBranch,
    MasterCheck,
    MasterJoinUpdate,
    SideDataJoin,
    SideDataBranch,
    SideDataCheck,
    SideDataJoinUpdate,
    Other,
}

impl OperatorKind {
    /// Whether this is one of the four shuffle-join family kinds the
    /// side-data rewrite targets.
    #[must_use]
    pub fn is_master_family(self) -> bool {
        self.side_data_variant().is_some()
    }

    /// The side-data counterpart of a master-family kind.
    #[must_use]
    pub fn side_data_variant(self) -> Option<OperatorKind> {
        match self {
            Self::MasterJoin => Some(Self::SideDataJoin),
            Self::MasterBranch => Some(Self::SideDataBranch),
            Self::MasterCheck => Some(Self::SideDataCheck),
            Self::MasterJoinUpdate => Some(Self::SideDataJoinUpdate),
            Self::SideDataJoin
            | Self::SideDataBranch
            | Self::SideDataCheck
            | Self::SideDataJoinUpdate
            | Self::Other => None,
        }
    }

    /// Whether this kind consults a pre-materialized side-data resource.
    #[must_use]
    pub fn is_side_data(self) -> bool {
        matches!(
            self,
            Self::SideDataJoin
                | Self::SideDataBranch
                | Self::SideDataCheck
                | Self::SideDataJoinUpdate
        )
    }
}

impl fmt::Display for OperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MasterJoin => "MasterJoin",
            Self::MasterBranch => "MasterBranch",
            Self::MasterCheck => "MasterCheck",
            Self::MasterJoinUpdate => "MasterJoinUpdate",
            Self::SideDataJoin => "SideDataJoin",
            Self::SideDataBranch => "SideDataBranch",
            Self::SideDataCheck => "SideDataCheck",
            Self::SideDataJoinUpdate => "SideDataJoinUpdate",
            Self::Other => "Other",
        };
        f.write_str(name)
    }
}

/// Kind of pass-through marker element.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum PseudoKind {
    /// 1-in/1-out identity; traversals look straight through it.
    Identity,
    /// Terminates a dangling output so dead branches are visibly closed off.
    Stop,
}

/// Kind of a flow element.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum ElementKind {
    Operator(OperatorKind),
    Input,
    Output,
    Pseudo(PseudoKind),
    Component,
}

impl ElementKind {
    #[must_use]
    pub fn operator_kind(self) -> Option<OperatorKind> {
        match self {
            Self::Operator(kind) => Some(kind),
            Self::Input | Self::Output | Self::Pseudo(_) | Self::Component => None,
        }
    }
}

/// Source origin of an element, carried for diagnostics: the declaring type
/// and method of the user code the element was built from.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Origin {
    pub declaring: String,
    pub method: String,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.declaring, self.method)
    }
}

/// Immutable specification of a flow element: its kind and name.
///
/// The name is mutable exactly once, through
/// [`ElementResolver::rename`](crate::resolver::ElementResolver::rename);
/// pseudo/marker elements forbid renaming entirely.
#[derive(Clone, Debug)]
pub struct ElementDescription {
    kind: ElementKind,
    name: String,
    origin: Option<Origin>,
    rename_allowed: bool,
    renamed: bool,
}

impl ElementDescription {
    /// An operator description; the default name is derived as
    /// `DeclaringType.methodName`.
    #[must_use]
    pub fn operator(
        kind: OperatorKind,
        declaring: impl Into<String>,
        method: impl Into<String>,
    ) -> Self {
        let origin = Origin {
            declaring: declaring.into(),
            method: method.into(),
        };
        Self {
            kind: ElementKind::Operator(kind),
            name: origin.to_string(),
            origin: Some(origin),
            rename_allowed: true,
            renamed: false,
        }
    }

    /// An operator description with an explicit name, used when a rewrite
    /// replaces an operator and must preserve its (possibly renamed) identity.
    #[must_use]
    pub fn operator_named(
        kind: OperatorKind,
        name: impl Into<String>,
        origin: Option<Origin>,
    ) -> Self {
        Self {
            kind: ElementKind::Operator(kind),
            name: name.into(),
            origin,
            rename_allowed: true,
            renamed: false,
        }
    }

    #[must_use]
    pub fn input(name: impl Into<String>) -> Self {
        Self {
            kind: ElementKind::Input,
            name: name.into(),
            origin: None,
            rename_allowed: true,
            renamed: false,
        }
    }

    #[must_use]
    pub fn output(name: impl Into<String>) -> Self {
        Self {
            kind: ElementKind::Output,
            name: name.into(),
            origin: None,
            rename_allowed: true,
            renamed: false,
        }
    }

    #[must_use]
    pub fn pseudo(kind: PseudoKind) -> Self {
        let name = match kind {
            PseudoKind::Identity => "identity",
            PseudoKind::Stop => "stop",
        };
        Self {
            kind: ElementKind::Pseudo(kind),
            name: name.to_string(),
            origin: None,
            rename_allowed: false,
            renamed: false,
        }
    }

    #[must_use]
    pub fn component(name: impl Into<String>) -> Self {
        Self {
            kind: ElementKind::Component,
            name: name.into(),
            origin: None,
            rename_allowed: true,
            renamed: false,
        }
    }

    #[must_use]
    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn origin(&self) -> Option<&Origin> {
        self.origin.as_ref()
    }

    /// A diagnostic label: the name, plus the origin when it adds anything.
    #[must_use]
    pub fn label(&self) -> String {
        match &self.origin {
            Some(origin) if origin.to_string() != self.name => {
                format!("{} (at {})", self.name, origin)
            }
            _ => self.name.clone(),
        }
    }

    /// Rename this description. Allowed exactly once, and never on
    /// descriptions that forbid it (pseudo markers).
    ///
    /// # Errors
    ///
    /// If renaming is forbidden or has already happened.
    pub fn rename(&mut self, name: impl Into<String>) -> Result<()> {
        if !self.rename_allowed {
            bail!("element '{}' does not support renaming", self.label());
        }
        if self.renamed {
            bail!("element '{}' has already been renamed once", self.label());
        }
        self.name = name.into();
        self.renamed = true;
        Ok(())
    }
}

/// A non-port invocation parameter: name, type name, and a nullable literal.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub type_name: String,
    pub value: Option<String>,
}

impl Parameter {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        type_name: impl Into<String>,
        value: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            value,
        }
    }
}

/// Data-movement requirement between an operator and the next stage.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub enum FlowBoundary {
    #[default]
    Default,
    Shuffle,
}

/// How often an operator may observe each element.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub enum ObservationCount {
    #[default]
    DontCare,
    AtLeastOnce,
    AtMostOnce,
    ExactlyOnce,
}

/// One element attribute. The set of attribute kinds is closed and known at
/// compile time, so the "bag keyed by runtime class" of richer systems
/// collapses to one slot per variant in [`AttributeMap`].
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Attribute {
    Boundary(FlowBoundary),
    Observation(ObservationCount),
}

impl Attribute {
    fn kind_name(self) -> &'static str {
        match self {
            Self::Boundary(_) => "Boundary",
            Self::Observation(_) => "Observation",
        }
    }
}

/// At most one attribute per kind.
///
/// [`AttributeMap::from_attributes`] treats a duplicate kind as a caller
/// inconsistency and fails; the builder-style [`set`](AttributeMap::set)
/// overwrites by key instead.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeMap {
    boundary: Option<FlowBoundary>,
    observation: Option<ObservationCount>,
}

impl AttributeMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a list of attributes.
    ///
    /// # Errors
    ///
    /// If the same attribute kind appears twice.
    pub fn from_attributes(attributes: impl IntoIterator<Item = Attribute>) -> Result<Self> {
        let mut map = Self::new();
        for attribute in attributes {
            let occupied = match attribute {
                Attribute::Boundary(_) => map.boundary.is_some(),
                Attribute::Observation(_) => map.observation.is_some(),
            };
            if occupied {
                bail!("attribute kind '{}' declared twice", attribute.kind_name());
            }
            map.set(attribute);
        }
        Ok(map)
    }

    /// Insert or overwrite by kind.
    pub fn set(&mut self, attribute: Attribute) {
        match attribute {
            Attribute::Boundary(b) => self.boundary = Some(b),
            Attribute::Observation(o) => self.observation = Some(o),
        }
    }

    /// The flow boundary, defaulting to [`FlowBoundary::Default`].
    #[must_use]
    pub fn boundary(&self) -> FlowBoundary {
        self.boundary.unwrap_or_default()
    }

    #[must_use]
    pub fn observation(&self) -> ObservationCount {
        self.observation.unwrap_or_default()
    }

    /// Copy of this map with a `Shuffle` boundary downgraded to `Default`.
    /// Used when a rewrite removes the need for data movement.
    #[must_use]
    pub fn without_shuffle(&self) -> Self {
        let mut out = self.clone();
        if out.boundary == Some(FlowBoundary::Shuffle) {
            out.boundary = Some(FlowBoundary::Default);
        }
        out
    }
}
