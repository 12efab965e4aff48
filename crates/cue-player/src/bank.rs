//! In-memory sound bank.
//!
//! Built once from a name → path table. Loading is best-effort: an entry that fails to
//! open or decode is logged, recorded in [`SoundBank::failures`], and left out.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::volume::AtomicVolume;
use crate::wav::{self, DecodeError, DecodedWave, WaveFormat};

/// One preloaded clip.
#[derive(Debug)]
pub struct SoundAsset {
    format: WaveFormat,
    samples: Arc<[u8]>,
    volume: AtomicVolume,
}

impl SoundAsset {
    pub fn new(format: WaveFormat, samples: impl Into<Arc<[u8]>>) -> Self {
        Self {
            format,
            samples: samples.into(),
            volume: AtomicVolume::default(),
        }
    }

    pub fn format(&self) -> &WaveFormat {
        &self.format
    }

    /// Shared handle to the raw sample bytes.
    pub fn samples(&self) -> Arc<[u8]> {
        self.samples.clone()
    }

    pub fn volume(&self) -> &AtomicVolume {
        &self.volume
    }
}

impl From<DecodedWave> for SoundAsset {
    fn from(wave: DecodedWave) -> Self {
        Self::new(wave.format, wave.samples)
    }
}

/// A clip that could not be loaded.
#[derive(Debug)]
pub struct LoadFailure {
    pub name: String,
    pub path: PathBuf,
    pub error: DecodeError,
}

#[derive(Debug, Default)]
pub struct SoundBank {
    clips: HashMap<String, SoundAsset>,
    failures: Vec<LoadFailure>,
}

impl SoundBank {
    /// Load every clip in `table`. Later entries for the same name replace earlier ones
    /// before anything is read from disk.
    pub fn load<I, K, P>(table: I) -> Self
    where
        I: IntoIterator<Item = (K, P)>,
        K: Into<String>,
        P: AsRef<Path>,
    {
        let table: BTreeMap<String, PathBuf> = table
            .into_iter()
            .map(|(name, path)| (name.into(), path.as_ref().to_path_buf()))
            .collect();

        let mut bank = Self::default();
        for (name, path) in table {
            match wav::load_file(&path) {
                Ok(wave) => {
                    tracing::debug!(
                        clip = %name,
                        path = ?path,
                        channels = wave.format.channels,
                        rate_hz = wave.format.sample_rate,
                        bytes = wave.samples.len(),
                        "clip loaded"
                    );
                    bank.clips.insert(name, wave.into());
                }
                Err(error) => {
                    tracing::warn!(clip = %name, path = ?path, "failed to load clip: {error}");
                    bank.failures.push(LoadFailure { name, path, error });
                }
            }
        }
        bank
    }

    pub(crate) fn insert(&mut self, name: impl Into<String>, asset: SoundAsset) {
        self.clips.insert(name.into(), asset);
    }

    pub fn get(&self, name: &str) -> Option<&SoundAsset> {
        self.clips.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.clips.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Loaded clip names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.clips.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn failures(&self) -> &[LoadFailure] {
        &self.failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wav::tests::wav_bytes;

    fn write(dir: &Path, file: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.join(file);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn load_keeps_good_clips_and_records_bad_ones() {
        let dir = tempfile::tempdir().unwrap();
        let good = write(dir.path(), "good.wav", &wav_bytes(1, 8_000, 8, &[], &[1, 2, 3]));
        let corrupt = write(dir.path(), "corrupt.wav", b"RIFX0000WAVE");
        let missing = dir.path().join("missing.wav");

        let bank = SoundBank::load([("good", &good), ("corrupt", &corrupt), ("missing", &missing)]);

        assert_eq!(bank.names(), vec!["good"]);
        assert_eq!(&*bank.get("good").unwrap().samples(), &[1, 2, 3]);
        assert!(bank.get("corrupt").is_none());

        let mut failed: Vec<&str> = bank.failures().iter().map(|f| f.name.as_str()).collect();
        failed.sort_unstable();
        assert_eq!(failed, vec!["corrupt", "missing"]);
        let missing_failure = bank.failures().iter().find(|f| f.name == "missing").unwrap();
        assert!(matches!(missing_failure.error, DecodeError::Io(_)));
        assert_eq!(missing_failure.path, missing);
    }

    #[test]
    fn later_duplicate_entry_wins() {
        let dir = tempfile::tempdir().unwrap();
        let first = write(dir.path(), "a.wav", &wav_bytes(1, 8_000, 8, &[], &[1]));
        let second = write(dir.path(), "b.wav", &wav_bytes(1, 8_000, 8, &[], &[2, 2]));

        let bank = SoundBank::load(vec![("clip", first), ("clip", second)]);
        assert_eq!(bank.len(), 1);
        assert_eq!(&*bank.get("clip").unwrap().samples(), &[2, 2]);
    }

    #[test]
    fn later_bad_duplicate_replaces_earlier_good_one() {
        let dir = tempfile::tempdir().unwrap();
        let good = write(dir.path(), "a.wav", &wav_bytes(1, 8_000, 8, &[], &[1]));
        let bad = dir.path().join("absent.wav");

        let bank = SoundBank::load(vec![("clip", good), ("clip", bad)]);
        assert!(bank.is_empty());
        assert_eq!(bank.failures().len(), 1);
    }

    #[test]
    fn new_assets_start_at_unity_volume() {
        let mut bank = SoundBank::default();
        let wave = wav::decode(wav_bytes(2, 48_000, 16, &[], &[0; 4]).as_slice()).unwrap();
        bank.insert("x", wave.into());
        assert_eq!(bank.get("x").unwrap().volume().get(), 1.0);
        assert!(bank.contains("x"));
        assert!(!bank.contains("y"));
    }
}
