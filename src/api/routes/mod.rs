//! Route handlers, grouped by resource

pub mod index;
pub mod ping;
pub mod update;
pub mod value;
