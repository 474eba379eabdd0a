//! Dispatch cache key derivation.
//!
//! # Key Layout
//!
//! Every request shape writes the same framing, then its own fragments in
//! a fixed order:
//!
//! ```text
//! <prefix> "/" <at_revision> "@" <fragment> "@" <fragment> "@" ...
//! ```
//!
//! | Request | Prefix | Fragments |
//! |---|---|---|
//! | Check | `cr` | resource relation, resource ids, subject, results setting |
//! | Expand | `er` | resource and relation, expansion mode |
//! | Lookup | `lr` | object relation, subject, limit |
//! | ReachableResources | `rr` | resource relation, subject relation, subject ids |
//!
//! The prefix keeps request shapes with coincidentally equal fragments apart.
//!
//! # Example
//!
//! ```
//! use rszed_domain::dispatch::{CacheKeyed, DispatchCheckRequest, ResultsSetting};
//! use rszed_domain::model::{ObjectAndRelation, RelationReference};
//! use rszed_domain::Revision;
//!
//! let request = DispatchCheckRequest {
//!     at_revision: Revision::new(7),
//!     resource_relation: RelationReference::new("document", "viewer"),
//!     resource_ids: vec!["b".to_string(), "a".to_string()],
//!     subject: ObjectAndRelation::new("user", "alice", "..."),
//!     results_setting: ResultsSetting::AllowSingleResult,
//! };
//!
//! assert_eq!(
//!     request.canonical_key(),
//!     "cr/7@document#viewer@a,b,@user:alice#...@ALLOW_SINGLE_RESULT@"
//! );
//! ```

mod hashable;
mod hasher;

pub use hashable::{
    Hashable, HashableIds, HashableOnr, HashableRelationReference, HashableResultsSetting,
    HashableString,
};
pub use hasher::{DispatchCacheKey, HashWriter, KeyHasher};

use crate::revision::Revision;

use super::{
    DispatchCheckRequest, DispatchExpandRequest, DispatchLookupRequest,
    DispatchReachableResourcesRequest,
};

/// Request-type prefixes.
const CHECK_PREFIX: &str = "cr";
const EXPAND_PREFIX: &str = "er";
const LOOKUP_PREFIX: &str = "lr";
const REACHABLE_RESOURCES_PREFIX: &str = "rr";

/// A request with a canonical cache identity.
pub trait CacheKeyed {
    /// Writes the request's framing and fragments to `writer`.
    fn write_key(&self, writer: &mut dyn HashWriter);

    /// Derives the fixed-width cache key.
    fn cache_key(&self) -> DispatchCacheKey {
        let mut hasher = KeyHasher::new();
        self.write_key(&mut hasher);
        hasher.finalize()
    }

    /// Returns the canonical text the cache key is derived from.
    fn canonical_key(&self) -> String {
        let mut text = String::new();
        self.write_key(&mut text);
        text
    }
}

fn write_framed(
    writer: &mut dyn HashWriter,
    prefix: &str,
    at_revision: Revision,
    fragments: &[&dyn Hashable],
) {
    writer.write_str(prefix);
    writer.write_str("/");
    writer.write_str(&at_revision.to_string());
    writer.write_str("@");
    for fragment in fragments {
        fragment.append_to_hash(writer);
        writer.write_str("@");
    }
}

impl CacheKeyed for DispatchCheckRequest {
    fn write_key(&self, writer: &mut dyn HashWriter) {
        write_framed(
            writer,
            CHECK_PREFIX,
            self.at_revision,
            &[
                &HashableRelationReference(&self.resource_relation),
                &HashableIds(&self.resource_ids),
                &HashableOnr(&self.subject),
                &HashableResultsSetting(self.results_setting),
            ],
        );
    }
}

impl CacheKeyed for DispatchExpandRequest {
    fn write_key(&self, writer: &mut dyn HashWriter) {
        write_framed(
            writer,
            EXPAND_PREFIX,
            self.at_revision,
            &[
                &HashableOnr(&self.resource_and_relation),
                &HashableString(self.expansion_mode.as_str()),
            ],
        );
    }
}

impl CacheKeyed for DispatchLookupRequest {
    fn write_key(&self, writer: &mut dyn HashWriter) {
        let limit = self.limit.to_string();
        write_framed(
            writer,
            LOOKUP_PREFIX,
            self.at_revision,
            &[
                &HashableRelationReference(&self.object_relation),
                &HashableOnr(&self.subject),
                &HashableString(&limit),
            ],
        );
    }
}

impl CacheKeyed for DispatchReachableResourcesRequest {
    fn write_key(&self, writer: &mut dyn HashWriter) {
        write_framed(
            writer,
            REACHABLE_RESOURCES_PREFIX,
            self.at_revision,
            &[
                &HashableRelationReference(&self.resource_relation),
                &HashableRelationReference(&self.subject_relation),
                &HashableIds(&self.subject_ids),
            ],
        );
    }
}
