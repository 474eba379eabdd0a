//! Typed fragments that know their canonical hash form.
//!
//! | Fragment | Canonical form |
//! |---|---|
//! | [`HashableRelationReference`] | `namespace#relation` |
//! | [`HashableOnr`] | `namespace:object_id#relation` |
//! | [`HashableResultsSetting`] | the setting's canonical name |
//! | [`HashableIds`] | ids sorted ascending, each followed by `,` |
//! | [`HashableString`] | the string verbatim |
//!
//! Separators are appended raw. Identifiers containing `#`, `:`, `,` or `@`
//! can therefore collide across logically different requests.

use crate::dispatch::ResultsSetting;
use crate::model::{ObjectAndRelation, RelationReference};

use super::hasher::HashWriter;

/// A value that can append itself to a [`HashWriter`] canonically.
pub trait Hashable {
    fn append_to_hash(&self, hasher: &mut dyn HashWriter);
}

pub struct HashableRelationReference<'a>(pub &'a RelationReference);

impl Hashable for HashableRelationReference<'_> {
    fn append_to_hash(&self, hasher: &mut dyn HashWriter) {
        hasher.write_str(&self.0.namespace);
        hasher.write_str("#");
        hasher.write_str(&self.0.relation);
    }
}

pub struct HashableOnr<'a>(pub &'a ObjectAndRelation);

impl Hashable for HashableOnr<'_> {
    fn append_to_hash(&self, hasher: &mut dyn HashWriter) {
        hasher.write_str(&self.0.namespace);
        hasher.write_str(":");
        hasher.write_str(&self.0.object_id);
        hasher.write_str("#");
        hasher.write_str(&self.0.relation);
    }
}

pub struct HashableResultsSetting(pub ResultsSetting);

impl Hashable for HashableResultsSetting {
    fn append_to_hash(&self, hasher: &mut dyn HashWriter) {
        hasher.write_str(self.0.as_str());
    }
}

/// An ID set. Hashing sorts a private copy; the borrowed slice is never reordered.
pub struct HashableIds<'a>(pub &'a [String]);

impl Hashable for HashableIds<'_> {
    fn append_to_hash(&self, hasher: &mut dyn HashWriter) {
        // Duplicates are kept: ["a", "a"] and ["a"] are different inputs.
        let mut sorted: Vec<&str> = self.0.iter().map(String::as_str).collect();
        sorted.sort_unstable();

        for id in sorted {
            hasher.write_str(id);
            hasher.write_str(",");
        }
    }
}

pub struct HashableString<'a>(pub &'a str);

impl Hashable for HashableString<'_> {
    fn append_to_hash(&self, hasher: &mut dyn HashWriter) {
        hasher.write_str(self.0);
    }
}
