//! Query-side building blocks: filter compilation, sorting and paging.
//!
//! # Responsibility
//! - Turn sparse caller filters into one composable employee predicate.
//! - Describe page/sort requests and derive consistent page metadata.
//!
//! # Invariants
//! - An empty filter compiles to the universal predicate.
//! - Sort fields are a closed set; raw caller text never reaches SQL.

pub mod filter;
pub mod page;
