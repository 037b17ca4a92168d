/// Sound sources
///
/// Symbolic effect names, their throttle gaps, and the fixed asset catalog.
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Short UI and feedback effects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EffectName {
    /// Button tap
    Tap,

    /// Answer option picked
    Select,

    /// Correct answer feedback
    Correct,

    /// Wrong answer feedback
    Wrong,
}

impl EffectName {
    /// Every effect, in preload order
    pub const ALL: [EffectName; 4] = [
        EffectName::Tap,
        EffectName::Select,
        EffectName::Correct,
        EffectName::Wrong,
    ];

    /// Minimum gap between two triggers of this effect.
    ///
    /// Feedback sounds have no gap and always fire.
    pub fn min_gap(&self) -> Duration {
        match self {
            EffectName::Tap => Duration::from_millis(160),
            EffectName::Select => Duration::from_millis(140),
            EffectName::Correct => Duration::ZERO,
            EffectName::Wrong => Duration::ZERO,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EffectName::Tap => "tap",
            EffectName::Select => "select",
            EffectName::Correct => "correct",
            EffectName::Wrong => "wrong",
        }
    }

    /// File name used by [`SoundCatalog::from_dir`]
    pub fn file_name(&self) -> &'static str {
        match self {
            EffectName::Tap => "ui_tap.mp3",
            EffectName::Select => "option_select.mp3",
            EffectName::Correct => "correct.mp3",
            EffectName::Wrong => "wrong.mp3",
        }
    }
}

impl fmt::Display for EffectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EffectName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tap" => Ok(EffectName::Tap),
            "select" => Ok(EffectName::Select),
            "correct" => Ok(EffectName::Correct),
            "wrong" => Ok(EffectName::Wrong),
            other => Err(format!("unknown effect: {other}")),
        }
    }
}

/// Reference to an audio resource
#[derive(Debug, Clone)]
pub enum AssetRef {
    /// File on disk, read at load time
    File(PathBuf),

    /// Audio already held in memory
    Bytes {
        label: &'static str,
        data: Arc<Vec<u8>>,
    },
}

impl AssetRef {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        AssetRef::File(path.into())
    }

    pub fn bytes(label: &'static str, data: Vec<u8>) -> Self {
        AssetRef::Bytes {
            label,
            data: Arc::new(data),
        }
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetRef::File(path) => write!(f, "{}", path.display()),
            AssetRef::Bytes { label, data } => write!(f, "{} ({} bytes)", label, data.len()),
        }
    }
}

/// Background track plus one asset per effect, fixed once built
#[derive(Debug, Clone)]
pub struct SoundCatalog {
    background: AssetRef,
    effects: HashMap<EffectName, AssetRef>,
}

impl SoundCatalog {
    pub const BACKGROUND_FILE: &'static str = "fondo.mp3";

    /// Build a catalog from a complete set of assets
    pub fn new(background: AssetRef, mut effect: impl FnMut(EffectName) -> AssetRef) -> Self {
        Self {
            background,
            effects: EffectName::ALL
                .into_iter()
                .map(|name| (name, effect(name)))
                .collect(),
        }
    }

    /// Catalog with the standard file names under `dir`
    pub fn from_dir(dir: &Path) -> Self {
        Self::new(AssetRef::file(dir.join(Self::BACKGROUND_FILE)), |name| {
            AssetRef::file(dir.join(name.file_name()))
        })
    }

    pub fn background(&self) -> &AssetRef {
        &self.background
    }

    pub fn effect(&self, name: EffectName) -> &AssetRef {
        // Every name is inserted by `new`
        &self.effects[&name]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effect_display_and_parse() {
        for name in EffectName::ALL {
            assert_eq!(name.to_string().parse::<EffectName>(), Ok(name));
        }
        assert_eq!(" TAP ".parse::<EffectName>(), Ok(EffectName::Tap));
        assert!("boom".parse::<EffectName>().is_err());
    }

    #[test]
    fn test_effect_gaps() {
        assert_eq!(EffectName::Tap.min_gap(), Duration::from_millis(160));
        assert_eq!(EffectName::Select.min_gap(), Duration::from_millis(140));
        assert!(EffectName::Correct.min_gap().is_zero());
        assert!(EffectName::Wrong.min_gap().is_zero());
    }

    #[test]
    fn test_catalog_from_dir() {
        let catalog = SoundCatalog::from_dir(Path::new("assets/audio"));
        match catalog.effect(EffectName::Select) {
            AssetRef::File(path) => assert!(path.ends_with("option_select.mp3")),
            other => panic!("unexpected asset {other}"),
        }
        assert_eq!(
            catalog.background().to_string(),
            Path::new("assets/audio").join("fondo.mp3").display().to_string()
        );
    }
}
