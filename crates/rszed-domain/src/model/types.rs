//! Core relation tuple types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::revision::Revision;

/// Subject relation used when a tuple points at an object rather than a userset.
pub const ELLIPSIS: &str = "...";

/// A reference to a relation within a namespace (e.g., `document#viewer`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationReference {
    /// The namespace (object type) the relation is defined on.
    pub namespace: String,
    /// The relation name.
    pub relation: String,
}

impl RelationReference {
    /// Creates a new relation reference.
    pub fn new(namespace: impl Into<String>, relation: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            relation: relation.into(),
        }
    }
}

impl fmt::Display for RelationReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.namespace, self.relation)
    }
}

/// One side of a relation tuple: `namespace:object_id#relation`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectAndRelation {
    /// The namespace (object type).
    pub namespace: String,
    /// The object identifier within the namespace.
    pub object_id: String,
    /// The relation name.
    pub relation: String,
}

impl ObjectAndRelation {
    /// Creates a new object-and-relation endpoint.
    pub fn new(
        namespace: impl Into<String>,
        object_id: impl Into<String>,
        relation: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            object_id: object_id.into(),
            relation: relation.into(),
        }
    }

    /// Parses an endpoint from `namespace:object_id#relation` format.
    pub fn parse(value: &str) -> DomainResult<Self> {
        let invalid = || DomainError::InvalidTupleFormat {
            value: value.to_string(),
        };

        let (namespace, rest) = value.split_once(':').ok_or_else(invalid)?;
        let (object_id, relation) = rest.rsplit_once('#').ok_or_else(invalid)?;
        if namespace.is_empty() || object_id.is_empty() || relation.is_empty() {
            return Err(invalid());
        }
        Ok(Self::new(namespace, object_id, relation))
    }
}

impl fmt::Display for ObjectAndRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}#{}", self.namespace, self.object_id, self.relation)
    }
}

/// A relation fact: `resource` has `resource.relation` to `subject`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationTuple {
    /// The resource side of the tuple. Its namespace is the unit of watch filtering.
    pub resource: ObjectAndRelation,
    /// The subject side of the tuple.
    pub subject: ObjectAndRelation,
}

impl RelationTuple {
    /// Creates a new relation tuple.
    pub fn new(resource: ObjectAndRelation, subject: ObjectAndRelation) -> Self {
        Self { resource, subject }
    }

    /// Parses a tuple from `ns:id#rel@ns:id#rel` format.
    ///
    /// A subject without a `#relation` suffix gets the [`ELLIPSIS`] relation.
    pub fn parse(value: &str) -> DomainResult<Self> {
        let (resource, subject) =
            value
                .split_once('@')
                .ok_or_else(|| DomainError::InvalidTupleFormat {
                    value: value.to_string(),
                })?;

        let resource = ObjectAndRelation::parse(resource)?;
        let subject = if subject.contains('#') {
            ObjectAndRelation::parse(subject)?
        } else {
            ObjectAndRelation::parse(&format!("{subject}#{ELLIPSIS}"))?
        };

        Ok(Self { resource, subject })
    }

    /// Returns the namespace of the resource side.
    pub fn namespace(&self) -> &str {
        &self.resource.namespace
    }
}

impl fmt::Display for RelationTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.resource, self.subject)
    }
}

/// The nature of a tuple mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UpdateOperation {
    /// Insert the tuple if absent, otherwise leave it.
    Touch,
    /// Insert the tuple; it must not already exist.
    Create,
    /// Remove the tuple.
    Delete,
}

/// A single mutation of a relation tuple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TupleUpdate {
    pub operation: UpdateOperation,
    pub tuple: RelationTuple,
}

impl TupleUpdate {
    pub fn touch(tuple: RelationTuple) -> Self {
        Self {
            operation: UpdateOperation::Touch,
            tuple,
        }
    }

    pub fn create(tuple: RelationTuple) -> Self {
        Self {
            operation: UpdateOperation::Create,
            tuple,
        }
    }

    pub fn delete(tuple: RelationTuple) -> Self {
        Self {
            operation: UpdateOperation::Delete,
            tuple,
        }
    }
}

/// An ordered group of tuple updates committed at a single revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeBatch {
    /// The revision marking the end of this batch.
    pub revision: Revision,
    /// Updates in commit order.
    pub changes: Vec<TupleUpdate>,
}

impl ChangeBatch {
    pub fn new(revision: Revision, changes: Vec<TupleUpdate>) -> Self {
        Self { revision, changes }
    }
}
