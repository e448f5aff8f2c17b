//! CLI operation handlers.
//!
//! - [`dashboard`]: Load the open pull request listing once or in watch mode
//!
//! Output formatting utilities are in [`output`].

pub mod dashboard;
pub mod output;
