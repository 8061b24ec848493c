//! Track table
//!
//! Maps the small track indices carried by commands and alarms to files
//! under the library root. Indices are the stable identifiers the
//! device's triggers use; paths are an internal detail.

use std::path::{Component, Path, PathBuf};

/// Immutable track index → path table.
#[derive(Debug)]
pub struct TrackTable {
    root: PathBuf,
    tracks: Vec<PathBuf>,
}

impl TrackTable {
    pub fn new(root: PathBuf, tracks: &[String]) -> Self {
        let tracks = tracks.iter().map(PathBuf::from).collect();
        Self { root, tracks }
    }

    /// Resolve a track index to its absolute path.
    pub fn resolve(&self, index: usize) -> Option<PathBuf> {
        self.tracks.get(index).map(|t| self.root.join(t))
    }

    /// Resolve a caller-supplied relative path under the root.
    ///
    /// Absolute paths and parent-directory components are rejected so the
    /// command surface cannot reach outside the library.
    pub fn resolve_path(&self, relative: &str) -> Option<PathBuf> {
        let path = Path::new(relative);
        let safe = path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !safe {
            return None;
        }
        Some(self.root.join(path))
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Relative paths, for listing endpoints.
    pub fn entries(&self) -> impl Iterator<Item = (usize, &Path)> {
        self.tracks.iter().enumerate().map(|(i, p)| (i, p.as_path()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> TrackTable {
        TrackTable::new(
            PathBuf::from("/srv/audio"),
            &["chime.wav".to_string(), "songs/one.wav".to_string()],
        )
    }

    #[test]
    fn test_resolve_index() {
        let t = table();
        assert_eq!(t.resolve(0), Some(PathBuf::from("/srv/audio/chime.wav")));
        assert_eq!(t.resolve(1), Some(PathBuf::from("/srv/audio/songs/one.wav")));
        assert_eq!(t.resolve(2), None);
    }

    #[test]
    fn test_resolve_path_stays_under_root() {
        let t = table();
        assert_eq!(
            t.resolve_path("extra/two.wav"),
            Some(PathBuf::from("/srv/audio/extra/two.wav"))
        );
        assert_eq!(t.resolve_path("../etc/passwd"), None);
        assert_eq!(t.resolve_path("/etc/passwd"), None);
    }
}
