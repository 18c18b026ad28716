/// Organizing engine that moves files into category directories.
///
/// This module walks a folder, classifies every regular file by extension
/// and either simulates or performs a move into `<folder>/<category>/`.
/// Each file produces a typed [`Outcome`], and the outcomes of a run are
/// tallied into an [`OrganizeResult`].
use crate::config::OrganizerConfig;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

/// Errors that can occur during file organization.
#[derive(Debug, Error)]
pub enum OrganizeError {
    /// The folder to organize does not exist or is not a directory.
    #[error("Folder does not exist or is not a directory: {}", .0.display())]
    InvalidFolder(PathBuf),
    /// Failed to create a category directory.
    #[error("Failed to create directory {}: {source}", .path.display())]
    DirectoryCreationFailed { path: PathBuf, source: io::Error },
    /// Failed to check whether a destination candidate exists.
    #[error("Failed to inspect destination {}: {source}", .path.display())]
    DestinationCheckFailed { path: PathBuf, source: io::Error },
    /// Failed to move a file to its category directory.
    #[error("Failed to move {} to {}: {source}", .from.display(), .to.display())]
    FileMoveFailure {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },
    /// The path has no file name component.
    #[error("Path has no file name: {}", .0.display())]
    MissingFileName(PathBuf),
}

/// Per-invocation options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Visit the whole subtree instead of only direct children.
    pub recursive: bool,
    /// Report what would happen without touching the filesystem.
    pub dry_run: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            dry_run: false,
        }
    }
}

/// What happened to a single regular file during a run.
#[derive(Debug)]
pub enum Outcome {
    /// Moved (or, in a dry run, would be moved) into a category directory.
    Moved {
        from: PathBuf,
        to: PathBuf,
        category: String,
        dry_run: bool,
    },
    /// Already inside its category directory.
    AlreadyPlaced { path: PathBuf },
    /// No category is configured for the file's extension.
    Unmapped { path: PathBuf },
    /// Hidden file skipped because hidden files are ignored.
    Hidden { path: PathBuf },
    /// Processing failed; the run continues with the next file.
    Failed { path: PathBuf, error: OrganizeError },
}

impl Outcome {
    pub fn path(&self) -> &Path {
        match self {
            Outcome::Moved { from, .. } => from,
            Outcome::AlreadyPlaced { path }
            | Outcome::Unmapped { path }
            | Outcome::Hidden { path }
            | Outcome::Failed { path, .. } => path,
        }
    }

    /// Renders a human-readable progress line with paths relative to `root`.
    ///
    /// Returns `None` for outcomes that are not reported as progress.
    pub fn describe(&self, root: &Path) -> Option<String> {
        let rel = |p: &Path| p.strip_prefix(root).unwrap_or(p).display().to_string();
        match self {
            Outcome::Moved {
                from,
                to,
                dry_run: true,
                ..
            } => Some(format!("[DRY-RUN] {} -> {}", rel(from), rel(to))),
            Outcome::Moved { from, to, .. } => Some(format!("Moved: {} -> {}", rel(from), rel(to))),
            Outcome::Failed { path, error } => {
                Some(format!("Skipping '{}': {}", path.display(), error))
            }
            Outcome::AlreadyPlaced { .. } | Outcome::Unmapped { .. } | Outcome::Hidden { .. } => {
                None
            }
        }
    }
}

/// Counts produced by one organizing run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrganizeResult {
    /// Files moved (or that would be moved) per category.
    pub moved: HashMap<String, usize>,
    /// Files whose extension has no category.
    pub skipped_unmapped: usize,
    /// Files skipped for any other reason (hidden, processing error).
    pub skipped_other: usize,
}

impl OrganizeResult {
    /// Adds a single outcome to the tally.
    pub fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Moved { category, .. } => {
                *self.moved.entry(category.clone()).or_insert(0) += 1;
            }
            Outcome::Unmapped { .. } => self.skipped_unmapped += 1,
            Outcome::Hidden { .. } | Outcome::Failed { .. } => self.skipped_other += 1,
            Outcome::AlreadyPlaced { .. } => {}
        }
    }

    pub fn total_moved(&self) -> usize {
        self.moved.values().sum()
    }

    /// Number of files that were counted in any bucket.
    pub fn total_counted(&self) -> usize {
        self.total_moved() + self.skipped_unmapped + self.skipped_other
    }
}

/// Returns `true` if the name of `path` starts with the hidden marker.
pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| name.to_string_lossy().starts_with('.'))
}

/// Returns a path that does not exist yet, based on `target`.
///
/// If `target` is free it is returned unchanged; otherwise `name (1).ext`,
/// `name (2).ext`, ... are tried in the same directory. The check and the
/// later move are not atomic.
///
/// # Errors
///
/// Returns the I/O error if existence of a candidate cannot be determined.
///
/// # Examples
///
/// ```no_run
/// use foldersort::file_organizer::unique_path;
/// use std::path::Path;
///
/// // With "Docs/report.txt" already present:
/// let free = unique_path(Path::new("Docs/report.txt")).unwrap();
/// assert_eq!(free, Path::new("Docs/report (1).txt"));
/// ```
pub fn unique_path(target: &Path) -> io::Result<PathBuf> {
    if !target.try_exists()? {
        return Ok(target.to_path_buf());
    }

    let parent = target.parent().unwrap_or_else(|| Path::new(""));
    let stem = target
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let suffix = target
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    let mut counter: u64 = 1;
    loop {
        let candidate = parent.join(format!("{stem} ({counter}){suffix}"));
        if !candidate.try_exists()? {
            return Ok(candidate);
        }
        counter += 1;
    }
}

/// Moves a file, falling back to copy and delete across filesystems.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
        Err(e) => Err(e),
    }
}

/// Organizes the files of one folder according to a configuration.
///
/// The folder is validated on construction; a `FileOrganizer` can then run
/// any number of times.
#[derive(Debug)]
pub struct FileOrganizer<'a> {
    folder: &'a Path,
    config: &'a OrganizerConfig,
    options: RunOptions,
}

impl<'a> FileOrganizer<'a> {
    /// Creates an organizer for `folder`.
    ///
    /// # Errors
    ///
    /// Returns `OrganizeError::InvalidFolder` if `folder` is not an existing directory.
    pub fn new(
        folder: &'a Path,
        config: &'a OrganizerConfig,
        options: RunOptions,
    ) -> Result<Self, OrganizeError> {
        if !folder.is_dir() {
            return Err(OrganizeError::InvalidFolder(folder.to_path_buf()));
        }
        Ok(Self {
            folder,
            config,
            options,
        })
    }

    pub fn folder(&self) -> &Path {
        self.folder
    }

    /// Lists the regular files this run will examine.
    ///
    /// The walk is collected up front so category directories created during
    /// the run are not walked again. Hidden directories below the root are
    /// pruned when `ignore_hidden_folders` is set.
    ///
    /// Symbolic links are not followed and are not returned, even when they
    /// point at regular files, so they are never moved or counted.
    pub fn collect_files(&self) -> Vec<PathBuf> {
        let max_depth = if self.options.recursive { usize::MAX } else { 1 };
        let prune_hidden = self.config.ignore_hidden_folders;

        WalkDir::new(self.folder)
            .min_depth(1)
            .max_depth(max_depth)
            .into_iter()
            .filter_entry(|entry| !(prune_hidden && is_hidden_dir(entry)))
            .filter_map(|result| match result {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    None
                }
            })
            .filter(|entry| {
                let file_type = entry.file_type();
                if !file_type.is_dir() && !file_type.is_file() {
                    debug!("Ignoring non-regular entry {}", entry.path().display());
                }
                file_type.is_file()
            })
            .map(DirEntry::into_path)
            .collect()
    }

    /// Runs once over the folder, handing each outcome to `on_outcome`.
    pub fn run<F>(&self, mut on_outcome: F) -> OrganizeResult
    where
        F: FnMut(Outcome),
    {
        info!(
            folder = %self.folder.display(),
            recursive = self.options.recursive,
            dry_run = self.options.dry_run,
            "organize run started"
        );

        let mut result = OrganizeResult::default();
        for file_path in self.collect_files() {
            let outcome = self.process_entry(&file_path);
            debug!(?outcome, "processed entry");
            result.record(&outcome);
            on_outcome(outcome);
        }

        info!(
            moved = result.total_moved(),
            unmapped = result.skipped_unmapped,
            other = result.skipped_other,
            "organize run finished"
        );
        result
    }

    /// Classifies a single regular file and moves it when appropriate.
    ///
    /// Failures never propagate; they come back as `Outcome::Failed`.
    pub fn process_entry(&self, file_path: &Path) -> Outcome {
        if self.config.ignore_hidden_files && is_hidden(file_path) {
            return Outcome::Hidden {
                path: file_path.to_path_buf(),
            };
        }

        let Some(category) = self.config.extension_index.category_for(file_path) else {
            return Outcome::Unmapped {
                path: file_path.to_path_buf(),
            };
        };

        let target_dir = self.folder.join(category);
        if file_path.parent() == Some(target_dir.as_path()) {
            return Outcome::AlreadyPlaced {
                path: file_path.to_path_buf(),
            };
        }

        match self.move_to_category(file_path, category) {
            Ok(destination) => Outcome::Moved {
                from: file_path.to_path_buf(),
                to: destination,
                category: category.to_string(),
                dry_run: self.options.dry_run,
            },
            Err(error) => Outcome::Failed {
                path: file_path.to_path_buf(),
                error,
            },
        }
    }

    /// Moves a file into `<folder>/<category>/`, renaming on collision.
    ///
    /// In a dry run nothing is created or moved; the returned path is where
    /// the file would go.
    ///
    /// # Errors
    ///
    /// Returns an `OrganizeError` if the directory cannot be created, the
    /// destination cannot be inspected, or the move fails.
    pub fn move_to_category(
        &self,
        file_path: &Path,
        category: &str,
    ) -> Result<PathBuf, OrganizeError> {
        let target_dir = self.folder.join(category);

        if !self.options.dry_run {
            fs::create_dir_all(&target_dir).map_err(|source| {
                OrganizeError::DirectoryCreationFailed {
                    path: target_dir.clone(),
                    source,
                }
            })?;
        }

        let file_name = file_path
            .file_name()
            .ok_or_else(|| OrganizeError::MissingFileName(file_path.to_path_buf()))?;

        let candidate = target_dir.join(file_name);
        let destination =
            unique_path(&candidate).map_err(|source| OrganizeError::DestinationCheckFailed {
                path: candidate.clone(),
                source,
            })?;

        if !self.options.dry_run {
            move_file(file_path, &destination).map_err(|source| {
                OrganizeError::FileMoveFailure {
                    from: file_path.to_path_buf(),
                    to: destination.clone(),
                    source,
                }
            })?;
        }

        Ok(destination)
    }
}

fn is_hidden_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_type().is_dir() && is_hidden(entry.path())
}

/// Organizes `folder` once and returns the counts.
///
/// # Errors
///
/// Returns `OrganizeError::InvalidFolder` if `folder` is not an existing
/// directory. Problems with individual files are counted, not returned.
///
/// # Examples
///
/// ```no_run
/// use foldersort::config::OrganizerConfig;
/// use foldersort::file_organizer::{organize, RunOptions};
/// use std::path::Path;
///
/// let config = OrganizerConfig::load(Path::new("config.json")).unwrap();
/// let result = organize(
///     Path::new("/home/user/Downloads"),
///     &config,
///     RunOptions { recursive: false, dry_run: true },
/// )
/// .unwrap();
/// println!("would move {} files", result.total_moved());
/// ```
pub fn organize(
    folder: &Path,
    config: &OrganizerConfig,
    options: RunOptions,
) -> Result<OrganizeResult, OrganizeError> {
    organize_with_progress(folder, config, options, |_| {})
}

/// Like [`organize`], calling `on_outcome` for every regular file examined.
pub fn organize_with_progress<F>(
    folder: &Path,
    config: &OrganizerConfig,
    options: RunOptions,
    on_outcome: F,
) -> Result<OrganizeResult, OrganizeError>
where
    F: FnMut(Outcome),
{
    let organizer = FileOrganizer::new(folder, config, options)?;
    Ok(organizer.run(on_outcome))
}
