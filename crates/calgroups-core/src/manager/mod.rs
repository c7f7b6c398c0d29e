//! Group management over persistent storage.
//!
//! `GroupManager` owns a `GroupStore` and a single cached `GroupsSchema`.
//! Reads are served from the cache; every write persists the whole schema
//! through the store (backup, then atomic replace) before returning.

pub mod group_manager;

pub use group_manager::GroupManager;
