//! Dispatch request shapes and their cache identity.
//!
//! A dispatch request is a sub-problem routed to some node of the cluster.
//! Results are cached under a [`DispatchCacheKey`] derived from the
//! request's fields, so two logically identical requests must derive the
//! same key even when their set-valued fields arrive in different orders.

pub mod keys;

use serde::{Deserialize, Serialize};

use crate::model::{ObjectAndRelation, RelationReference};
use crate::revision::Revision;

pub use keys::{CacheKeyed, DispatchCacheKey, HashWriter, KeyHasher};

/// How much detail a check result must carry.
///
/// Different settings produce results that are not interchangeable, so the
/// setting is part of the cache identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultsSetting {
    /// Every resource ID must be resolved.
    RequireAllResults,
    /// Resolution may stop at the first positive result.
    AllowSingleResult,
}

impl ResultsSetting {
    /// Stable canonical name, independent of `Debug` formatting.
    pub fn as_str(self) -> &'static str {
        match self {
            ResultsSetting::RequireAllResults => "REQUIRE_ALL_RESULTS",
            ResultsSetting::AllowSingleResult => "ALLOW_SINGLE_RESULT",
        }
    }
}

/// How deep an expand request walks the userset tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpansionMode {
    Shallow,
    Recursive,
}

impl ExpansionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ExpansionMode::Shallow => "SHALLOW",
            ExpansionMode::Recursive => "RECURSIVE",
        }
    }
}

/// Does `subject` have `resource_relation` on any of `resource_ids`?
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchCheckRequest {
    pub at_revision: Revision,
    pub resource_relation: RelationReference,
    pub resource_ids: Vec<String>,
    pub subject: ObjectAndRelation,
    pub results_setting: ResultsSetting,
}

/// Expand the userset tree rooted at `resource_and_relation`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchExpandRequest {
    pub at_revision: Revision,
    pub resource_and_relation: ObjectAndRelation,
    pub expansion_mode: ExpansionMode,
}

/// Find objects of `object_relation` reachable by `subject`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchLookupRequest {
    pub at_revision: Revision,
    pub object_relation: RelationReference,
    pub subject: ObjectAndRelation,
    pub limit: u32,
}

/// Find resources of `resource_relation` reachable from any of `subject_ids`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReachableResourcesRequest {
    pub at_revision: Revision,
    pub resource_relation: RelationReference,
    pub subject_relation: RelationReference,
    pub subject_ids: Vec<String>,
}
