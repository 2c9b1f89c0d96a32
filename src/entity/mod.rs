//! SeaORM entity definitions.

pub mod build;
pub mod project;
pub mod spec_result;
