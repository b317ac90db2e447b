//! Destination file names for recognized tracks.
//!
//! A recognized file is renamed to `Title - Artist - Album.ext`. When that
//! name is already taken, a counter is inserted before the extension:
//! `Title - Artist - Album (1).ext`, `(2)`, ... up to [`MAX_COLLISION_SUFFIX`].

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::{AutotagError, Result};

/// Highest counter tried before giving up on a file.
pub const MAX_COLLISION_SUFFIX: u32 = 999;

/// Separator between the name components.
const SEPARATOR: &str = " - ";

/// Join the non-empty components with `" - "`.
pub fn compose_base_name(components: &[&str]) -> String {
    components
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}

/// The extension of `path` exactly as written on disk (`"MP3"` stays `"MP3"`).
pub fn original_extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|e| e.to_str())
}

fn with_extension(base: &str, extension: Option<&str>) -> String {
    match extension {
        Some(ext) if !ext.is_empty() => format!("{}.{}", base, ext),
        _ => base.to_string(),
    }
}

/// Pick a free destination for `current` in its own directory.
///
/// A candidate is taken when a file exists at that path or it was already
/// handed out earlier in this run (`claimed`). When the candidate equals the
/// current file name the current path is returned: no rename is needed.
///
/// # Example
/// With `A.mp3` and `A (1).mp3` present, base `A` resolves to `A (2).mp3`.
pub fn resolve_destination(
    current: &Path,
    base: &str,
    extension: Option<&str>,
    claimed: &HashSet<PathBuf>,
) -> Result<PathBuf> {
    let dir = current.parent().unwrap_or_else(|| Path::new(""));
    let current_name = current.file_name().and_then(|n| n.to_str());

    for counter in 0..=MAX_COLLISION_SUFFIX {
        let name = if counter == 0 {
            with_extension(base, extension)
        } else {
            with_extension(&format!("{} ({})", base, counter), extension)
        };

        if current_name == Some(name.as_str()) {
            return Ok(current.to_path_buf());
        }

        let candidate = dir.join(&name);
        if !candidate.exists() && !claimed.contains(&candidate) {
            return Ok(candidate);
        }
    }

    Err(AutotagError::CollisionExhausted {
        candidate: dir.join(with_extension(base, extension)),
        limit: MAX_COLLISION_SUFFIX,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, b"x").unwrap();
        path
    }

    #[test]
    fn test_compose_base_name() {
        assert_eq!(
            compose_base_name(&["Drive My Car", "The Beatles", "Rubber Soul"]),
            "Drive My Car - The Beatles - Rubber Soul"
        );
        assert_eq!(compose_base_name(&["Song", "", "Album"]), "Song - Album");
    }

    #[test]
    fn test_original_extension_keeps_case() {
        assert_eq!(original_extension(Path::new("/x/a.MP3")), Some("MP3"));
        assert_eq!(original_extension(Path::new("/x/noext")), None);
    }

    #[test]
    fn test_free_name_used_directly() {
        let dir = TempDir::new().unwrap();
        let current = touch(dir.path(), "track01.mp3");
        let dest = resolve_destination(&current, "A", Some("mp3"), &HashSet::new()).unwrap();
        assert_eq!(dest, dir.path().join("A.mp3"));
    }

    #[test]
    fn test_collision_counter() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "A.mp3");
        touch(dir.path(), "A (1).mp3");
        let current = touch(dir.path(), "track01.mp3");

        let dest = resolve_destination(&current, "A", Some("mp3"), &HashSet::new()).unwrap();
        assert_eq!(dest, dir.path().join("A (2).mp3"));
    }

    #[test]
    fn test_already_named_correctly() {
        let dir = TempDir::new().unwrap();
        let current = touch(dir.path(), "A.mp3");
        let dest = resolve_destination(&current, "A", Some("mp3"), &HashSet::new()).unwrap();
        assert_eq!(dest, current);
    }

    #[test]
    fn test_current_name_with_counter_is_kept() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "A.mp3");
        let current = touch(dir.path(), "A (1).mp3");
        let dest = resolve_destination(&current, "A", Some("mp3"), &HashSet::new()).unwrap();
        assert_eq!(dest, current);
    }

    #[test]
    fn test_claimed_paths_collide() {
        let dir = TempDir::new().unwrap();
        let current = touch(dir.path(), "track02.mp3");
        let mut claimed = HashSet::new();
        claimed.insert(dir.path().join("A.mp3"));

        let dest = resolve_destination(&current, "A", Some("mp3"), &claimed).unwrap();
        assert_eq!(dest, dir.path().join("A (1).mp3"));
    }

    #[test]
    fn test_exhaustion() {
        let dir = TempDir::new().unwrap();
        let current = touch(dir.path(), "track.mp3");
        let mut claimed = HashSet::new();
        claimed.insert(dir.path().join("A.mp3"));
        for i in 1..=MAX_COLLISION_SUFFIX {
            claimed.insert(dir.path().join(format!("A ({}).mp3", i)));
        }

        let err = resolve_destination(&current, "A", Some("mp3"), &claimed).unwrap_err();
        assert!(matches!(err, AutotagError::CollisionExhausted { limit: MAX_COLLISION_SUFFIX, .. }));
    }
}
