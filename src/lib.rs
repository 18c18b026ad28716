//! foldersort - sort files into category folders by extension
//!
//! This library resolves a category configuration into an extension lookup
//! table, organizes a folder by moving files into `<folder>/<category>/`
//! (or simulating it in a dry run), and runs that work once or repeatedly
//! on a background worker with cooperative cancellation.

pub mod cli;
pub mod config;
pub mod file_category;
pub mod file_organizer;
pub mod output;
pub mod runner;

pub use config::{ConfigDocument, ConfigError, ConfigOptions, OrganizerConfig};
pub use file_category::ExtensionIndex;
pub use file_organizer::{
    FileOrganizer, OrganizeError, OrganizeResult, Outcome, RunOptions, organize,
    organize_with_progress, unique_path,
};
pub use runner::{CancellationToken, OrganizeJob, RunEvent, RunHandle, spawn_auto, spawn_once};

pub use cli::{Args, run_cli};
