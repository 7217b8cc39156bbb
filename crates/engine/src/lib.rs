//! StoryForge Engine library.
//!
//! This crate contains all server-side code for the StoryForge interactive
//! story generator.
//!
//! ## Structure
//!
//! - `use_cases/` - User story orchestration (generation pipeline, gates,
//!   story runs)
//! - `infrastructure/` - External dependency implementations (ports +
//!   adapters)
//! - `api/` - HTTP entry points
//! - `app` - Application composition

pub mod api;
pub mod app;
pub mod infrastructure;
pub mod use_cases;

pub use app::App;
