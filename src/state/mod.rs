/// Catalog state
///
/// This module handles the product records:
/// - Shared data structures (data.rs)
/// - Storage backends (store.rs)
/// - Queries, validation and change notifications (library.rs)
/// - Detail view paging (pager.rs)

pub mod data;
pub mod library;
pub mod pager;
pub mod store;
