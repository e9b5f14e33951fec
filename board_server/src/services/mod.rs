//! Build board services: upstream fetching and page rendering.

pub mod buddybuild_service;
pub mod render_service;
