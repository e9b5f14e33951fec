//! Build board data models.

pub mod build;
