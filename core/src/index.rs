//! Helpers for domain modules that keep entities indexed by id

use std::collections::HashMap;
use std::hash::Hash;

/// An entity with a stable identifier
pub trait Identified {
    /// Identifier type
    type Id: Eq + Hash;

    /// The entity's identifier
    fn id(&self) -> Self::Id;
}

/// Index entities by their id
///
/// Later entities replace earlier ones with the same id.
///
/// # Examples
///
/// ```
/// use action_meta_core::index::{Identified, index_by_id};
///
/// struct Application { id: u64, status: &'static str }
///
/// impl Identified for Application {
///     type Id = u64;
///     fn id(&self) -> u64 { self.id }
/// }
///
/// let indexed = index_by_id([
///     Application { id: 1, status: "pending" },
///     Application { id: 2, status: "accepted" },
/// ]);
/// assert_eq!(indexed[&2].status, "accepted");
/// ```
pub fn index_by_id<I, T>(items: I) -> HashMap<T::Id, T>
where
    I: IntoIterator<Item = T>,
    T: Identified,
{
    items.into_iter().map(|item| (item.id(), item)).collect()
}
