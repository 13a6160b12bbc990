//! A [`CacheStore`] backed by one JSON file per key.

use super::cache::{CacheStore, Clock};
use super::cache_key::CacheKey;
use super::cache_lock::{CacheLockGuard, acquire_cache_lock};
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use core::fmt::Write as _;
use core::time::Duration;
use ohno::IntoAppError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::PathBuf;
use std::sync::Arc;

const LOG_TARGET: &str = "     cache";

/// Longest encoded stem kept verbatim; most file systems cap a name at 255 bytes.
const MAX_STEM_LEN: usize = 160;

/// Verbatim prefix kept in front of the digest when a stem is too long.
const TRUNCATED_PREFIX_LEN: usize = 96;

/// On-disk representation of a cache entry.
#[derive(Debug, Deserialize, Serialize)]
struct Envelope {
    key: String,
    written_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    value: serde_json::Value,
}

/// Directory-backed cache store.
///
/// Entries live at `{dir}/{operation}/{encoded params}.json`. Overlong names are cut
/// short and suffixed with a digest of the full parameters. The directory is locked
/// exclusively for as long as the store is alive so that concurrent runs of the tool
/// don't trample each other's entries.
#[derive(Debug)]
pub struct FileCacheStore {
    dir: PathBuf,
    clock: Arc<dyn Clock>,
    _lock: CacheLockGuard,
}

impl FileCacheStore {
    /// Open (creating if needed) the cache directory and lock it.
    pub async fn open(dir: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).into_app_err_with(|| format!("creating cache directory '{}'", dir.display()))?;
        let lock = acquire_cache_lock(&dir).await?;

        Ok(Self { dir, clock, _lock: lock })
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.operation().name()).join(encode_file_name(key.params()))
    }
}

/// Turn the key parameters into a single file name with no path separators or dots.
///
/// Short names are reversible. Longer ones keep a readable prefix followed by `~` and a
/// SHA-256 digest of the parameters; `~` never appears in the escaped form, so the two
/// shapes can't collide.
fn encode_file_name(params: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(params.as_bytes()).collect();
    let mut name = encoded.replace('.', "%2E").replace('*', "%2A").replace('~', "%7E");

    if name.len() > MAX_STEM_LEN {
        // the escaped form is ASCII, so any byte index is a char boundary
        name.truncate(TRUNCATED_PREFIX_LEN);
        name.push('~');
        for byte in Sha256::digest(params.as_bytes()) {
            let _ = write!(name, "{byte:02x}");
        }
    }

    name.push_str(".json");
    name
}

#[async_trait]
impl CacheStore for FileCacheStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>> {
        let path = self.entry_path(key);

        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::trace!(target: LOG_TARGET, "No cache file for {key}");
                return Ok(None);
            }
            Err(e) => return Err(e).into_app_err_with(|| format!("opening cache file '{}'", path.display())),
        };

        let envelope: Envelope = match serde_json::from_reader(BufReader::new(file)) {
            Ok(envelope) => envelope,
            Err(e) => {
                log::debug!(target: LOG_TARGET, "Ignoring corrupt cache file '{}': {e:#}", path.display());
                return Ok(None);
            }
        };

        if envelope.key != key.as_str() {
            log::debug!(target: LOG_TARGET, "Cache file '{}' holds '{}', not '{key}'", path.display(), envelope.key);
            return Ok(None);
        }

        let now = self.clock.now();
        if now >= envelope.expires_at {
            log::debug!(
                target: LOG_TARGET,
                "Cache expired for {key} (written {}, expired {})",
                envelope.written_at,
                envelope.expires_at
            );
            return Ok(None);
        }

        Ok(Some(envelope.value.to_string()))
    }

    async fn set(&self, key: &CacheKey, value: String, ttl: Duration) -> Result<()> {
        let path = self.entry_path(key);
        let written_at = self.clock.now();
        let ttl = chrono::Duration::from_std(ttl).into_app_err("cache TTL out of range")?;

        let envelope = Envelope {
            key: key.as_str().to_string(),
            written_at,
            expires_at: written_at + ttl,
            value: serde_json::from_str(&value).into_app_err_with(|| format!("cache value for '{key}' is not JSON"))?,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).into_app_err_with(|| format!("creating directory '{}'", parent.display()))?;
        }

        let file = File::create(&path).into_app_err_with(|| format!("creating cache file '{}'", path.display()))?;
        let mut writer = BufWriter::new(file);

        #[cfg(debug_assertions)]
        let result = serde_json::to_writer_pretty(&mut writer, &envelope);
        #[cfg(not(debug_assertions))]
        let result = serde_json::to_writer(&mut writer, &envelope);

        result.into_app_err_with(|| format!("writing cache file '{}'", path.display()))?;
        writer
            .flush()
            .into_app_err_with(|| format!("flushing cache file '{}'", path.display()))?;

        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::facts::{Cache, DEFAULT_CACHE_TTL, ManualClock, Operation};

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(Utc::now()))
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileCacheStore::open(tmp.path(), clock()).await.unwrap();
        let key = CacheKey::repo(Operation::Contributors, "owner", "repo");

        store.set(&key, r#"[{"login":"alice"}]"#.to_string(), DEFAULT_CACHE_TTL).await.unwrap();

        let text = store.get(&key).await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value[0]["login"], "alice");
    }

    #[tokio::test]
    async fn missing_entry_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileCacheStore::open(tmp.path(), clock()).await.unwrap();
        let key = CacheKey::repo(Operation::Contributors, "owner", "repo");

        assert!(store.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn entry_expires_after_ttl() {
        let tmp = tempfile::tempdir().unwrap();
        let clock = clock();
        let store = FileCacheStore::open(tmp.path(), Arc::clone(&clock) as Arc<dyn Clock>).await.unwrap();
        let key = CacheKey::repo(Operation::PrsInPastYear, "owner", "repo");

        store.set(&key, "12".to_string(), Duration::from_secs(3600)).await.unwrap();

        clock.advance(Duration::from_secs(3599));
        assert_eq!(store.get(&key).await.unwrap().as_deref(), Some("12"));

        clock.advance(Duration::from_secs(2));
        assert!(store.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_entry_is_a_miss() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileCacheStore::open(tmp.path(), clock()).await.unwrap();
        let key = CacheKey::repo(Operation::Contributors, "owner", "repo");

        let path = store.entry_path(&key);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "not valid json").unwrap();

        assert!(store.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn nested_paths_stay_in_one_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileCacheStore::open(tmp.path(), clock()).await.unwrap();
        let key = CacheKey::repo_resource(Operation::FileContent, "owner", "repo", "../../etc/package.json");

        let path = store.entry_path(&key);
        assert_eq!(path.parent().unwrap(), tmp.path().join("file_content"));

        store.set(&key, r#""{}""#.to_string(), DEFAULT_CACHE_TTL).await.unwrap();
        assert_eq!(store.get(&key).await.unwrap().as_deref(), Some(r#""{}""#));
    }

    #[tokio::test]
    async fn similar_keys_do_not_collide() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileCacheStore::open(tmp.path(), clock()).await.unwrap();
        let a = CacheKey::repo_resource(Operation::FileContent, "owner", "repo", "a/b.json");
        let b = CacheKey::repo_resource(Operation::FileContent, "owner", "repo", "a_b.json");

        store.set(&a, "1".to_string(), DEFAULT_CACHE_TTL).await.unwrap();
        store.set(&b, "2".to_string(), DEFAULT_CACHE_TTL).await.unwrap();

        assert_eq!(store.get(&a).await.unwrap().as_deref(), Some("1"));
        assert_eq!(store.get(&b).await.unwrap().as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn non_json_value_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileCacheStore::open(tmp.path(), clock()).await.unwrap();
        let key = CacheKey::repo(Operation::Contributors, "owner", "repo");

        let _ = store.set(&key, "not json".to_string(), DEFAULT_CACHE_TTL).await.unwrap_err();
    }

    #[test]
    fn encode_file_name_escapes_separators_and_dots() {
        assert_eq!(encode_file_name("owner/repo"), "owner%2Frepo.json");
        assert_eq!(encode_file_name("o/r/package.json"), "o%2Fr%2Fpackage%2Ejson.json");
        assert!(!encode_file_name("../..").contains(".."));
    }

    #[test]
    fn encode_file_name_bounds_long_paths() {
        let long = format!("o/r/{}", "packages/some-rather-long-workspace-name/".repeat(6));
        let long_a = format!("{long}a/package.json");
        let long_b = format!("{long}b/package.json");

        let a = encode_file_name(&long_a);
        let b = encode_file_name(&long_b);

        assert!(a.len() <= TRUNCATED_PREFIX_LEN + 1 + 64 + ".json".len(), "{a}");
        assert_ne!(a, b);
        assert_eq!(a, encode_file_name(&long_a));
        assert!(a.contains('~'));
        assert!(!encode_file_name("o/r/~").contains('~'));
    }

    #[tokio::test]
    async fn deep_manifest_paths_are_cached() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileCacheStore::open(tmp.path(), clock()).await.unwrap();
        let cache = Cache::new(Arc::new(store), DEFAULT_CACHE_TTL, false);

        let manifest = format!(
            "{}package.json",
            "node_modules/@some-organization/some-very-long-package-name-for-testing/".repeat(3)
        );
        assert!(manifest.len() > 200);
        let key = CacheKey::repo_resource(Operation::FileContent, "SomeOrganization", "some-monorepo", &manifest);

        let first: String = cache
            .get_or_compute(key.clone(), || async { Ok(r#"{"name":"deep"}"#.to_string()) })
            .await
            .unwrap();
        let second: String = cache
            .get_or_compute(key, || async { Ok("recomputed".to_string()) })
            .await
            .unwrap();

        assert_eq!(first, r#"{"name":"deep"}"#);
        assert_eq!(second, first);
    }

    #[tokio::test]
    async fn single_long_segment_is_cached() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileCacheStore::open(tmp.path(), clock()).await.unwrap();
        let key = CacheKey::repo_resource(Operation::FileContent, "owner", "repo", &"x.".repeat(150));

        store.set(&key, "7".to_string(), DEFAULT_CACHE_TTL).await.unwrap();
        assert_eq!(store.get(&key).await.unwrap().as_deref(), Some("7"));
    }
}
