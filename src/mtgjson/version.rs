//! Snapshot version tracking and download management
//!
//! Tracks which bulk snapshot version is cached locally, compares it against
//! the remote version identifier and downloads the archive when a newer one
//! is published. Uses async reqwest for non-blocking HTTP requests.

use crate::error::{Error, Result};
use crate::mtgjson::snapshot::CardSnapshot;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::io::{BufReader, Cursor};
use std::path::PathBuf;
use std::str::FromStr;

/// Download URL for the version identifier of the bulk snapshot
const VERSION_URL: &str = "https://mtgjson.com/json/version-full.json";
/// Download URL for the zipped bulk snapshot
const SNAPSHOT_URL: &str = "https://mtgjson.com/json/AllSets-x.json.zip";

const USER_AGENT: &str = "mtg_collector/1.0";

/// A dot-delimited snapshot version, compared numerically per component.
///
/// Plain string comparison would order "3.10" before "3.9"; versions are
/// parsed into their numeric components so that 3.10 > 3.9 holds.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version(Vec<u32>);

impl FromStr for Version {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        let components: std::result::Result<Vec<u32>, _> =
            value.split('.').map(str::parse).collect();
        match components {
            Ok(components) if !components.is_empty() => Ok(Version(components)),
            _ => Err(Error::InvalidVersion(value.to_string())),
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.0.iter().map(u32::to_string).collect();
        write!(f, "{}", rendered.join("."))
    }
}

/// Remote version file structure
#[derive(Debug, Deserialize)]
struct VersionFile {
    version: String,
}

/// Manages downloaded snapshot files in a local directory.
///
/// Snapshots are stored as `cards-{version}.json`, one file per downloaded
/// version; old versions are kept (never deleted) so a failed pass can fall
/// back to the previous snapshot.
pub struct SnapshotStore {
    download_dir: PathBuf,
}

impl SnapshotStore {
    /// Open a store rooted at the given directory, creating it if needed.
    pub fn new(download_dir: impl Into<PathBuf>) -> Result<Self> {
        let download_dir = download_dir.into();
        fs::create_dir_all(&download_dir)?;
        Ok(Self { download_dir })
    }

    /// The file path for a given snapshot version.
    pub fn snapshot_path(&self, version: &Version) -> PathBuf {
        self.download_dir.join(format!("cards-{}.json", version))
    }

    /// The highest snapshot version present on disk, if any.
    pub fn latest_local_version(&self) -> Result<Option<Version>> {
        let mut latest: Option<Version> = None;

        for entry in fs::read_dir(&self.download_dir)? {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            let Some(stem) = name
                .strip_prefix("cards-")
                .and_then(|rest| rest.strip_suffix(".json"))
            else {
                continue;
            };
            // Unrelated files in the download directory are not an error
            let Ok(version) = stem.parse::<Version>() else {
                continue;
            };
            if latest.as_ref().is_none_or(|current| version > *current) {
                latest = Some(version);
            }
        }

        Ok(latest)
    }

    /// Decode the snapshot stored for the given version.
    pub fn load(&self, version: &Version) -> Result<CardSnapshot> {
        let path = self.snapshot_path(version);
        log::debug!("Loading snapshot from {}", path.display());
        let file = fs::File::open(path)?;
        CardSnapshot::from_reader(BufReader::new(file))
    }

    /// Decode the most recent locally stored snapshot.
    pub fn load_latest(&self) -> Result<(Version, CardSnapshot)> {
        let version = self.latest_local_version()?.ok_or(Error::NoSnapshot)?;
        let snapshot = self.load(&version)?;
        Ok((version, snapshot))
    }

    /// Extract the JSON document from a downloaded bulk archive and store it
    /// under the given version.
    pub fn save_archive(&self, version: &Version, data: &[u8]) -> Result<PathBuf> {
        let mut archive = zip::ZipArchive::new(Cursor::new(data))?;
        // The archive contains exactly one JSON document
        let mut entry = archive.by_index(0)?;
        let path = self.snapshot_path(version);
        let mut file = fs::File::create(&path)?;
        std::io::copy(&mut entry, &mut file)?;
        log::info!("Stored snapshot {} at {}", version, path.display());
        Ok(path)
    }

    /// Fetch the latest published version identifier.
    pub async fn fetch_remote_version(client: &reqwest::Client) -> Result<Version> {
        log::debug!("Checking remote snapshot version...");
        let response = client
            .get(VERSION_URL)
            .header("User-Agent", USER_AGENT)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::HttpStatus(response.status()));
        }

        let file: VersionFile = response.json().await?;
        file.version.parse()
    }

    /// Check whether a newer snapshot is available and download it if so.
    ///
    /// Returns the new version when one was fetched and stored. A failed
    /// version check is not fatal: the local snapshot stays authoritative
    /// and `None` is returned. A failed archive download propagates.
    pub async fn check_update(&self, client: &reqwest::Client) -> Result<Option<Version>> {
        let remote = match Self::fetch_remote_version(client).await {
            Ok(version) => version,
            Err(e) => {
                log::warn!("Version check failed, keeping local snapshot: {}", e);
                return Ok(None);
            }
        };

        let local = self.latest_local_version()?;
        if local.as_ref().is_some_and(|current| *current >= remote) {
            log::debug!("Local snapshot {} is up to date", remote);
            return Ok(None);
        }

        match &local {
            Some(local) => log::info!("New snapshot version {} available (local: {})", remote, local),
            None => log::info!("No local snapshot, downloading version {}", remote),
        }

        let data = Self::download_archive(client).await?;
        self.save_archive(&remote, &data)?;
        Ok(Some(remote))
    }

    /// Download the zipped bulk snapshot.
    async fn download_archive(client: &reqwest::Client) -> Result<Vec<u8>> {
        log::info!("Downloading bulk snapshot archive...");
        let response = client
            .get(SNAPSHOT_URL)
            .header("User-Agent", USER_AGENT)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::HttpStatus(response.status()));
        }

        let data = response.bytes().await?.to_vec();
        log::info!("Downloaded {} bytes", data.len());
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn version_parses_dotted_components() {
        let version: Version = "3.3.3".parse().unwrap();
        assert_eq!(version, Version(vec![3, 3, 3]));
        assert_eq!(version.to_string(), "3.3.3");
    }

    #[test]
    fn version_rejects_garbage() {
        assert!("".parse::<Version>().is_err());
        assert!("3.x".parse::<Version>().is_err());
        assert!("3..1".parse::<Version>().is_err());
    }

    #[test]
    fn version_compares_numerically_not_lexically() {
        let old: Version = "3.9".parse().unwrap();
        let new: Version = "3.10".parse().unwrap();
        // lexicographic string comparison would invert this
        assert!(new > old);
        assert!("10.0".parse::<Version>().unwrap() > "9.9".parse::<Version>().unwrap());
        assert!("3.3.3".parse::<Version>().unwrap() > "3.3".parse::<Version>().unwrap());
        assert_eq!(
            "3.3.3".parse::<Version>().unwrap(),
            "3.3.3".parse::<Version>().unwrap()
        );
    }

    #[test]
    fn latest_local_version_scans_download_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path()).unwrap();
        assert!(store.latest_local_version().unwrap().is_none());

        for name in ["cards-3.9.json", "cards-3.10.json", "notes.txt", "cards-bad.json"] {
            fs::File::create(dir.path().join(name)).unwrap();
        }

        let latest = store.latest_local_version().unwrap().unwrap();
        assert_eq!(latest.to_string(), "3.10");
    }

    #[test]
    fn save_archive_extracts_the_json_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path()).unwrap();

        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("AllSets-x.json", zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(br#"{"LEA": {"code": "LEA", "cards": []}}"#).unwrap();
        let archive = writer.finish().unwrap().into_inner();

        let version: Version = "3.3.3".parse().unwrap();
        let path = store.save_archive(&version, &archive).unwrap();
        assert!(path.ends_with("cards-3.3.3.json"));

        let snapshot = store.load(&version).unwrap();
        assert_eq!(snapshot.len(), 1);

        let (latest, _) = store.load_latest().unwrap();
        assert_eq!(latest, version);
    }

    #[test]
    fn load_latest_without_snapshot_errors() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path()).unwrap();
        assert!(matches!(store.load_latest(), Err(Error::NoSnapshot)));
    }
}
