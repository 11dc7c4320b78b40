//! The process-wide type member cache.
//!
//! Member tables are built at most once per concrete type and then shared.
//! Lookups take a read lock; a miss builds the table without holding any
//! lock and publishes it under the write lock. When two threads race on the
//! same type, the first table to be published wins and both callers end up
//! with that same table.

use core::any::TypeId;

use hashbrown::HashMap;
use rustc_hash::FxBuildHasher;
use triomphe::Arc;

use crate::{
    cache_lock::CacheLock,
    members::{self, TypeMembers},
    shape::ErrorShape,
};

type CacheMap = HashMap<TypeId, Arc<TypeMembers>, FxBuildHasher>;

static CACHE: CacheLock<CacheMap> = CacheLock::new(CacheMap::with_hasher(FxBuildHasher));

/// Returns the member table of `E`, building it on first use.
///
/// Every call for the same `E` returns the same table, including calls that
/// race on first use.
pub fn members_of<E: ErrorShape>() -> Arc<TypeMembers> {
    let type_id = TypeId::of::<E>();

    if let Some(members) = CACHE.with_read(|map| map.get(&type_id).cloned()) {
        return members;
    }

    if E::ERROR_TYPE.type_id() != type_id {
        tracing::warn!(
            rust_type = core::any::type_name::<E>(),
            error_type = E::ERROR_TYPE.name(),
            "ERROR_TYPE was built for a different type; subtype checks for its members will be wrong"
        );
    }

    let built = Arc::new(members::build::<E>());

    CACHE.with_write(|map| Arc::clone(map.entry(type_id).or_insert(built)))
}

/// Returns the number of types whose member table has been built.
pub fn cached_type_count() -> usize {
    CACHE.with_read(HashMap::len)
}
