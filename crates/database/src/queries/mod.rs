//! Query modules, one per table

pub mod authors;
pub mod books;
pub mod cross_refs;
pub mod tracks;
