//! Named model files in a preset directory.

use crate::{LoadError, Result};
use std::path::{Path, PathBuf};

/// Presets shipped in `assets/models`.
pub const BUILTIN_PRESETS: [&str; 7] = [
    "conv",
    "dense",
    "full_model",
    "gru",
    "gru_1d",
    "lstm",
    "lstm_1d",
];

const PRESET_EXTENSION: &str = "json";

/// A directory of `<name>.json` model documents.
#[derive(Debug, Clone)]
pub struct PresetLibrary {
    dir: PathBuf,
}

impl PresetLibrary {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Preset names found on disk, sorted. An unreadable directory yields an
    /// empty list.
    pub fn names(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == PRESET_EXTENSION))
            .filter_map(|path| path.file_stem()?.to_str().map(str::to_owned))
            .collect();
        names.sort();
        names
    }

    /// Resolve `name` to a file in the library. Names are bare file stems;
    /// anything that could escape the directory is rejected.
    pub fn path(&self, name: &str) -> Result<PathBuf> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(LoadError::UnknownPreset(name.to_string()));
        }

        let path = self.dir.join(format!("{}.{}", name, PRESET_EXTENSION));
        if path.is_file() {
            Ok(path)
        } else {
            Err(LoadError::UnknownPreset(name.to_string()))
        }
    }

    pub fn read(&self, name: &str) -> Result<String> {
        let path = self.path(name)?;
        std::fs::read_to_string(&path).map_err(|e| LoadError::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundled() -> PresetLibrary {
        PresetLibrary::new(Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/models"))
    }

    #[test]
    fn test_bundled_presets_present() {
        let names = bundled().names();
        for preset in BUILTIN_PRESETS {
            assert!(names.iter().any(|n| n == preset), "missing preset {}", preset);
        }
    }

    #[test]
    fn test_bundled_presets_parse_and_build() {
        let library = bundled();
        for preset in BUILTIN_PRESETS {
            let text = library.read(preset).unwrap();
            let descriptor = ampnet_neural::parse(&text).unwrap();
            ampnet_neural::DynamicModel::build(&descriptor).unwrap();
        }
    }

    #[test]
    fn test_rejects_unknown_and_traversal() {
        let library = bundled();
        assert!(matches!(library.path("fuzz"), Err(LoadError::UnknownPreset(_))));
        assert!(matches!(library.path("../Cargo"), Err(LoadError::UnknownPreset(_))));
        assert!(matches!(library.path(""), Err(LoadError::UnknownPreset(_))));
    }

    #[test]
    fn test_missing_directory_lists_nothing() {
        assert!(PresetLibrary::new("/nonexistent/ampnet").names().is_empty());
    }
}
