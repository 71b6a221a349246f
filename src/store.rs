use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use std::fs::{self, Permissions};
use std::io::{ErrorKind, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tempfile::NamedTempFile;

/// Date format of the last-commit-date file.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Read the counter value. Surrounding whitespace is ignored.
///
/// # Errors
/// Returns an error naming the file if it cannot be read or does not hold
/// a single integer.
pub fn read_number(path: &Path) -> Result<i64> {
    let txt = fs::read_to_string(path)
        .with_context(|| format!("counter file not found: {}", path.display()))?;
    txt.trim()
        .parse()
        .with_context(|| format!("counter file {} is not an integer: {:?}", path.display(), txt.trim()))
}

/// Replace the counter file contents with `n` (no trailing newline).
pub fn write_number(path: &Path, n: i64) -> Result<()> {
    write_atomic(path, &n.to_string())
}

/// Read, add exactly one, persist, and return the new counter value.
pub fn increment(path: &Path) -> Result<i64> {
    let current = read_number(path)?;
    let next = current
        .checked_add(1)
        .ok_or_else(|| anyhow!("counter overflow in {}", path.display()))?;
    write_number(path, next)?;
    Ok(next)
}

/// Read the last recorded commit date (`YYYY-MM-DD`).
pub fn read_last_commit_date(path: &Path) -> Result<NaiveDate> {
    let txt = fs::read_to_string(path)
        .with_context(|| format!("date file not found: {}", path.display()))?;
    NaiveDate::parse_from_str(txt.trim(), DATE_FORMAT).with_context(|| {
        format!(
            "date file {} does not hold a YYYY-MM-DD date: {:?}",
            path.display(),
            txt.trim()
        )
    })
}

pub fn write_last_commit_date(path: &Path, date: NaiveDate) -> Result<()> {
    write_atomic(path, &date.format(DATE_FORMAT).to_string())
}

/// Write `contents` to a temp file next to `path`, then rename it over `path`.
///
/// A reader never observes a half-written file.
fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temp file in {}", dir.display()))?;
    tmp.write_all(contents.as_bytes())?;
    tmp.as_file().set_permissions(target_permissions(path)?)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}

/// Permissions the replaced file should end up with: the existing file's,
/// or `0644` for a new one (temp files start out as `0600`).
fn target_permissions(path: &Path) -> Result<Permissions> {
    match fs::metadata(path) {
        Ok(meta) => Ok(meta.permissions()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Permissions::from_mode(0o644)),
        Err(e) => Err(e).with_context(|| format!("cannot stat {}", path.display())),
    }
}
