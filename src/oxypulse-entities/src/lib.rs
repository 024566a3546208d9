//! `SeaORM` entities for the oxypulse store.

pub mod prelude;

pub mod sessions;
pub mod settings;
