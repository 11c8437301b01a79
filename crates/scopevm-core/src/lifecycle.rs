#![forbid(unsafe_code)]

//! Release of an owner's view-models at the end of its scope.
//!
//! # Protocol
//!
//! 1. The host calls [`tear_down`] once, right before the owner is destroyed.
//! 2. An owner that never materialized a store is left alone.
//! 3. Otherwise the store is drained and `release` is called on each entry.
//!    View-models created by a `release` callback land in the emptied store
//!    and are drained and released in a further pass, until the store stays
//!    empty. No entry leaves the store without being released.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | `release` returns `Err` | View-model cleanup failed | Remaining view-models are still released, the store is still cleared, then a [`TeardownError`] lists every failure |
//! | Repeated teardown | Host fired the hook twice | Store is already empty, nothing is released |
//! | Unmanaged owner | Owner never resolved a view-model | No-op, `Ok(0)` |
//! | `release` resolves view-models on the same owner | Cleanup needs a sibling | The new instance is released in the next pass |
//! | `release` always recreates its own kind | Cleanup cycle | Teardown never finishes |
//!
//! Release order between sibling view-models is unspecified.

use crate::error::{ReleaseFailure, TeardownError};
use crate::owner::ViewModelStoreOwner;
use crate::store::ViewModelStore;

/// Release every view-model held by `owner` and empty its store.
///
/// Returns the number of view-models released.
///
/// # Errors
///
/// [`TeardownError`] if one or more `release` calls failed. All view-models
/// have still been released and the store cleared.
pub fn tear_down<O>(owner: &O) -> Result<usize, TeardownError>
where
    O: ViewModelStoreOwner + ?Sized,
{
    match owner.materialized_store() {
        Some(store) => release_store(&store),
        None => {
            tracing::trace!("teardown skipped: no view-model store");
            Ok(0)
        }
    }
}

/// Release and clear a single store.
///
/// # Errors
///
/// See [`tear_down`].
pub fn release_store(store: &ViewModelStore) -> Result<usize, TeardownError> {
    let _span = tracing::debug_span!("view_model_teardown", held = store.len()).entered();

    let mut released = 0;
    let mut passes = 0u32;
    let mut failures = Vec::new();
    loop {
        let batch = store.drain();
        if batch.is_empty() {
            break;
        }
        passes += 1;
        released += batch.len();
        for (key, instance) in batch {
            if let Err(error) = instance.release() {
                tracing::warn!(kind = key.type_name(), %error, "view-model release failed");
                failures.push(ReleaseFailure { key, error });
            }
        }
    }

    tracing::debug!(
        released,
        passes,
        failed = failures.len(),
        "view-model store torn down"
    );
    if failures.is_empty() {
        Ok(released)
    } else {
        Err(TeardownError::new(released, failures))
    }
}
