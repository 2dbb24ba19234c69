//! Read entities definitions.

pub mod post;
