// ============================================================
// Layer 6 — Pretrained Module Store
// ============================================================
// Resolves the pretrained ELMo weights and loads them into a
// freshly built embedder.
//
// A module reference is either
//   - an http(s) URL → downloaded once into the cache directory
//     as modules/<sha256(url)>.mpk, then read from there
//   - a local path   → read as-is (file:// prefix allowed)
//
// The reference comes from --module, then ELMO_MODULE_URL, then
// DEFAULT_MODULE_URL. The default names the hosted ELMo v2 module;
// it is not published as a burn record, so a usable run points one
// of the overrides at a converted `.mpk`. When
// ELMO_MODULE_SHA256 is set the bytes must match that digest.
// Any failure here is a ModuleFetch error and ends the run.

use std::{
    env, fs,
    io::Read,
    path::{Path, PathBuf},
    time::Duration,
};

use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkBytesRecorder, Recorder},
};
use sha2::{Digest, Sha256};

use crate::domain::error::PipelineError;
use crate::ml::embedder::ElmoEmbedder;

pub const MODULE_URL_ENV: &str = "ELMO_MODULE_URL";
pub const DEFAULT_MODULE_URL: &str = "https://tfhub.dev/google/elmo/2";
pub const MODULE_SHA256_ENV: &str = "ELMO_MODULE_SHA256";

const MAX_MODULE_BYTES: u64 = 2 * 1024 * 1024 * 1024;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const READ_TIMEOUT: Duration = Duration::from_secs(300);

// ─── ModuleReference ──────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleReference {
    Remote(String),
    Local(PathBuf),
}

impl ModuleReference {
    pub fn parse(value: &str) -> Result<Self, PipelineError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(PipelineError::module_fetch(value, "empty module reference"));
        }
        if value.starts_with("https://") || value.starts_with("http://") {
            return Ok(ModuleReference::Remote(value.to_string()));
        }
        let path = value.strip_prefix("file://").unwrap_or(value);
        Ok(ModuleReference::Local(PathBuf::from(path)))
    }

    /// Explicit reference first, then ELMO_MODULE_URL, then the default.
    pub fn resolve(explicit: Option<&str>) -> Result<Self, PipelineError> {
        Self::resolve_from(explicit, env::var(MODULE_URL_ENV).ok())
    }

    fn resolve_from(explicit: Option<&str>, from_env: Option<String>) -> Result<Self, PipelineError> {
        let explicit = explicit.map(str::trim).filter(|v| !v.is_empty());
        match (explicit, from_env.as_deref().map(str::trim)) {
            (Some(value), _) => Self::parse(value),
            (None, Some(value)) if !value.is_empty() => Self::parse(value),
            _ => {
                tracing::info!(
                    "No --module or {} given, using {}",
                    MODULE_URL_ENV,
                    DEFAULT_MODULE_URL
                );
                Self::parse(DEFAULT_MODULE_URL)
            }
        }
    }

    pub fn as_str(&self) -> String {
        match self {
            ModuleReference::Remote(url) => url.clone(),
            ModuleReference::Local(path) => path.display().to_string(),
        }
    }
}

// ─── ModuleStore ──────────────────────────────────────────────────────────────
pub struct ModuleStore {
    cache_dir: PathBuf,
    expected_sha256: Option<String>,
}

impl ModuleStore {
    /// `cache_dir` overrides the platform cache directory.
    pub fn new(cache_dir: Option<PathBuf>) -> Self {
        let store = Self {
            cache_dir: cache_dir.unwrap_or_else(default_cache_dir),
            expected_sha256: None,
        };
        match env::var(MODULE_SHA256_ENV) {
            Ok(digest) if !digest.trim().is_empty() => store.with_expected_sha256(digest),
            _ => store,
        }
    }

    pub fn with_expected_sha256(mut self, sha256: impl Into<String>) -> Self {
        self.expected_sha256 = Some(sha256.into().trim().to_ascii_lowercase());
        self
    }

    /// Where a remote reference is cached.
    pub fn cache_path(&self, url: &str) -> PathBuf {
        self.cache_dir
            .join("modules")
            .join(format!("{}.mpk", sha256_hex(url.as_bytes())))
    }

    /// Bytes of the referenced module, downloading on first access.
    pub fn fetch(&self, reference: &ModuleReference) -> Result<Vec<u8>, PipelineError> {
        let bytes = match reference {
            ModuleReference::Local(path) => read_file(reference, path)?,
            ModuleReference::Remote(url) => {
                let cached = self.cache_path(url);
                if cached.exists() {
                    tracing::info!("Using cached module '{}'", cached.display());
                    read_file(reference, &cached)?
                } else {
                    let bytes = download(url)?;
                    self.verify(reference, &bytes)?;
                    write_atomic(&cached, &bytes)?;
                    tracing::info!("Cached module at '{}'", cached.display());
                    return Ok(bytes);
                }
            }
        };
        self.verify(reference, &bytes)?;
        Ok(bytes)
    }

    /// Fetch the referenced record and load it into `embedder`.
    pub fn load_embedder<B: Backend>(
        &self,
        reference: &ModuleReference,
        embedder: ElmoEmbedder<B>,
        device: &B::Device,
    ) -> Result<ElmoEmbedder<B>, PipelineError> {
        let bytes = self.fetch(reference)?;
        let expected_params = embedder.num_params();

        let record = Recorder::<B>::load(&NamedMpkBytesRecorder::<FullPrecisionSettings>::default(), bytes, device)
            .map_err(|e| PipelineError::module_fetch(reference.as_str(), format!("unreadable record: {e:?}")))?;
        let embedder = embedder.load_record(record);

        if embedder.num_params() != expected_params {
            return Err(PipelineError::module_fetch(
                reference.as_str(),
                format!(
                    "record has {} parameters, the configured embedder has {}",
                    embedder.num_params(),
                    expected_params
                ),
            ));
        }

        tracing::info!(
            "Loaded pretrained module '{}' ({} parameters)",
            reference.as_str(),
            expected_params
        );
        Ok(embedder)
    }

    fn verify(&self, reference: &ModuleReference, bytes: &[u8]) -> Result<(), PipelineError> {
        if let Some(expected) = &self.expected_sha256 {
            let actual = sha256_hex(bytes);
            if &actual != expected {
                return Err(PipelineError::module_fetch(
                    reference.as_str(),
                    format!("SHA-256 mismatch: expected {expected}, got {actual}"),
                ));
            }
        }
        Ok(())
    }
}

fn default_cache_dir() -> PathBuf {
    match directories::ProjectDirs::from("", "", "elmo-classifier") {
        Some(dirs) => dirs.cache_dir().to_path_buf(),
        None => {
            tracing::warn!("No platform cache directory; caching modules under ./.cache");
            PathBuf::from(".cache").join("elmo-classifier")
        }
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

fn read_file(reference: &ModuleReference, path: &Path) -> Result<Vec<u8>, PipelineError> {
    fs::read(path).map_err(|e| {
        PipelineError::module_fetch(reference.as_str(), format!("cannot read '{}': {e}", path.display()))
    })
}

fn download(url: &str) -> Result<Vec<u8>, PipelineError> {
    tracing::info!("Downloading pretrained module from {}", url);
    let agent = ureq::AgentBuilder::new()
        .timeout_connect(CONNECT_TIMEOUT)
        .timeout_read(READ_TIMEOUT)
        .build();
    let response = agent
        .get(url)
        .call()
        .map_err(|e| PipelineError::module_fetch(url, e.to_string()))?;

    let mut bytes = Vec::new();
    response
        .into_reader()
        .take(MAX_MODULE_BYTES + 1)
        .read_to_end(&mut bytes)
        .map_err(|e| PipelineError::module_fetch(url, format!("read failed: {e}")))?;
    if bytes.len() as u64 > MAX_MODULE_BYTES {
        return Err(PipelineError::module_fetch(
            url,
            format!("response exceeded {MAX_MODULE_BYTES} bytes"),
        ));
    }
    Ok(bytes)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
    }
    let partial = path.with_extension("part");
    fs::write(&partial, bytes).map_err(|e| PipelineError::io(&partial, e))?;
    fs::rename(&partial, path).map_err(|e| PipelineError::io(path, e))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::embedder::ElmoEmbedderConfig;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn tiny_embedder() -> ElmoEmbedder<TestBackend> {
        ElmoEmbedderConfig::new(vec![[1, 3]])
            .with_char_dim(2)
            .with_max_chars(4)
            .with_n_highway(1)
            .with_projection_dim(2)
            .with_n_lstm_layers(1)
            .init(&Default::default())
    }

    fn record_bytes(embedder: &ElmoEmbedder<TestBackend>) -> Vec<u8> {
        Recorder::<TestBackend>::record(
            &NamedMpkBytesRecorder::<FullPrecisionSettings>::default(),
            embedder.clone().into_record(),
            (),
        )
        .unwrap()
    }

    fn weights(embedder: &ElmoEmbedder<TestBackend>) -> Vec<f32> {
        embedder.char_embedding.weight.val().into_data().iter::<f32>().collect()
    }

    #[test]
    fn test_parse_reference() {
        assert_eq!(
            ModuleReference::parse("https://example.org/elmo.mpk").unwrap(),
            ModuleReference::Remote("https://example.org/elmo.mpk".into())
        );
        assert_eq!(
            ModuleReference::parse("file:///tmp/elmo.mpk").unwrap(),
            ModuleReference::Local(PathBuf::from("/tmp/elmo.mpk"))
        );
        assert!(ModuleReference::parse("  ").is_err());
    }

    #[test]
    fn test_resolve_prefers_explicit_then_env() {
        let r = ModuleReference::resolve_from(Some("a.mpk"), Some("b.mpk".into())).unwrap();
        assert_eq!(r, ModuleReference::Local("a.mpk".into()));
        let r = ModuleReference::resolve_from(None, Some("b.mpk".into())).unwrap();
        assert_eq!(r, ModuleReference::Local("b.mpk".into()));
    }

    #[test]
    fn test_resolve_falls_back_to_default_module() {
        let expected = ModuleReference::Remote(DEFAULT_MODULE_URL.to_string());
        assert_eq!(ModuleReference::resolve_from(None, None).unwrap(), expected);
        assert_eq!(ModuleReference::resolve_from(Some("  "), Some(String::new())).unwrap(), expected);
    }

    #[test]
    fn test_loads_local_record() {
        let dir = tempfile::tempdir().unwrap();
        let source = tiny_embedder();
        let path = dir.path().join("elmo.mpk");
        fs::write(&path, record_bytes(&source)).unwrap();

        let store = ModuleStore::new(Some(dir.path().join("cache")));
        let loaded = store
            .load_embedder(&ModuleReference::Local(path), tiny_embedder(), &Default::default())
            .unwrap();
        assert_eq!(weights(&loaded), weights(&source));
    }

    #[test]
    fn test_missing_local_file_is_fetch_error() {
        let store = ModuleStore::new(Some(PathBuf::from("/nonexistent-cache")));
        let err = store
            .fetch(&ModuleReference::Local("/nonexistent/elmo.mpk".into()))
            .unwrap_err();
        assert!(matches!(err, PipelineError::ModuleFetch { .. }));
    }

    #[test]
    fn test_remote_reference_served_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModuleStore::new(Some(dir.path().to_path_buf()));
        let url = "https://modules.invalid/elmo.mpk";
        let cached = store.cache_path(url);
        fs::create_dir_all(cached.parent().unwrap()).unwrap();
        fs::write(&cached, b"cached bytes").unwrap();

        let bytes = store.fetch(&ModuleReference::Remote(url.into())).unwrap();
        assert_eq!(bytes, b"cached bytes");
    }

    #[test]
    fn test_digest_mismatch_is_fetch_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("elmo.mpk");
        fs::write(&path, b"payload").unwrap();

        let store = ModuleStore::new(None).with_expected_sha256("00".repeat(32));
        let err = store.fetch(&ModuleReference::Local(path.clone())).unwrap_err();
        assert!(matches!(err, PipelineError::ModuleFetch { .. }));

        let store = ModuleStore::new(None).with_expected_sha256(sha256_hex(b"payload"));
        assert_eq!(store.fetch(&ModuleReference::Local(path)).unwrap(), b"payload");
    }

    #[test]
    fn test_garbage_record_is_fetch_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("elmo.mpk");
        fs::write(&path, b"definitely not messagepack").unwrap();

        let store = ModuleStore::new(Some(dir.path().join("cache")));
        let err = store
            .load_embedder(&ModuleReference::Local(path), tiny_embedder(), &Default::default())
            .unwrap_err();
        assert!(matches!(err, PipelineError::ModuleFetch { .. }));
    }
}
