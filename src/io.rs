use std::fmt::Display;
use std::fs;
use std::io::ErrorKind;
use std::time::Instant;

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use console::Style;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::Settings;
use crate::error::CleanError;

const ANSI_BLUE: Style = Style::new().blue();

pub fn as_overhead(s: Instant) -> impl Display {
    let e = Instant::now();
    let f = format!("(+{}ms)", e.duration_since(s).as_millis());
    ANSI_BLUE.apply_to(f)
}

/// What a cleanup pass removed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanReport {
    /// Whether the output directory existed before it was wiped.
    pub output_existed: bool,
    /// Generated top-level files that were deleted, sorted.
    pub purged: Vec<Utf8PathBuf>,
}

/// Wipe the output directory and purge generated top-level files from the
/// project root. Running this twice in a row leaves the same state as running
/// it once.
pub fn stage_clean_output(settings: &Settings) -> Result<CleanReport, CleanError> {
    let s = Instant::now();

    guard_output(settings)?;

    let output_existed = clear_output(&settings.output_path())?;
    let purged = purge_generated(settings)?;

    tracing::info!(
        output = %settings.output_path(),
        purged = purged.len(),
        "cleared stale output"
    );
    eprintln!("Cleaned the output directory {}", as_overhead(s));

    Ok(CleanReport {
        output_existed,
        purged,
    })
}

/// Refuse an output directory that is the project root or one of its
/// ancestors; wiping it would take the sources with it.
fn guard_output(settings: &Settings) -> Result<(), CleanError> {
    let root = absolute(&settings.root)?;
    let output = absolute(&settings.output_path())?;

    if root.starts_with(&output) {
        return Err(CleanError::OutputContainsRoot { output, root });
    }

    Ok(())
}

fn absolute(path: &Utf8Path) -> Result<Utf8PathBuf, CleanError> {
    let path = std::path::absolute(path).map_err(|e| CleanError::Enumerate(path.to_owned(), e))?;
    let path = Utf8PathBuf::try_from(path)?;

    Ok(normalize_path(&path))
}

/// Normalize a path, removing things like `.` and `..`.
///
/// CAUTION: This does not resolve symlinks (unlike [`std::fs::canonicalize`]).
fn normalize_path(path: &Utf8Path) -> Utf8PathBuf {
    let mut components = path.components().peekable();
    let mut ret = if let Some(c @ Utf8Component::Prefix(..)) = components.peek().cloned() {
        components.next();
        Utf8PathBuf::from(c.as_str())
    } else {
        Utf8PathBuf::new()
    };

    for component in components {
        match component {
            Utf8Component::Prefix(..) => unreachable!(),
            Utf8Component::RootDir => ret.push(Utf8Component::RootDir),
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => {
                ret.pop();
            }
            Utf8Component::Normal(c) => ret.push(c),
        }
    }

    ret
}

/// Delete `path` recursively if it exists, then recreate it empty. Returns
/// whether anything was there before.
pub fn clear_output(path: &Utf8Path) -> Result<bool, CleanError> {
    let existed = match fs::remove_dir_all(path) {
        Ok(()) => true,
        Err(e) if e.kind() == ErrorKind::NotFound => false,
        Err(e) => return Err(CleanError::Remove(path.to_owned(), e)),
    };

    fs::create_dir_all(path) //
        .map_err(|e| CleanError::Create(path.to_owned(), e))?;

    Ok(existed)
}

/// Delete every regular file directly under the root whose name carries the
/// generated suffix, except the preserved names.
pub fn purge_generated(settings: &Settings) -> Result<Vec<Utf8PathBuf>, CleanError> {
    let root = settings.root.as_path();

    fs::metadata(root).map_err(|e| CleanError::Enumerate(root.to_owned(), e))?;

    let mut matches = find_generated(settings)?;
    matches.sort();

    matches
        .par_iter()
        .try_for_each(|path| match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CleanError::Remove(path.clone(), e)),
        })?;

    for path in &matches {
        tracing::debug!(%path, "purged generated file");
    }

    Ok(matches)
}

fn find_generated(settings: &Settings) -> Result<Vec<Utf8PathBuf>, CleanError> {
    let pattern = format!(
        "{}/*{}",
        glob::Pattern::escape(settings.root.as_str()),
        glob::Pattern::escape(&settings.generated_suffix),
    );

    let mut found = Vec::new();

    for entry in glob::glob(&pattern)? {
        let path = entry.map_err(|e| {
            let path = Utf8PathBuf::from_path_buf(e.path().to_path_buf())
                .unwrap_or_else(|_| settings.root.clone());
            CleanError::Enumerate(path, std::io::Error::from(e))
        })?;
        let path = Utf8PathBuf::try_from(path)?;

        let Some(name) = path.file_name() else {
            continue;
        };

        if path.is_file() && settings.is_generated(name) {
            found.push(path);
        }
    }

    Ok(found)
}
