//! Strava credential lifecycle.
//!
//! `TokenManager` is the single owner of the OAuth credential: it loads it
//! from disk at startup, hands out valid access tokens (refreshing when the
//! stored one has expired), and persists every replacement. It is cloned
//! into request handlers through axum state.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::errors::AppError;
use crate::services::strava::StravaClient;

/// OAuth credential as issued by Strava's token endpoint.
///
/// Fields other than the three used here (e.g. `token_type`, `athlete`) are
/// kept and written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: String,
    /// Expiry as Unix epoch seconds
    pub expires_at: i64,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Credential {
    /// Whether the access token expired strictly before `now` (epoch seconds).
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at < now
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("no Strava credential stored, authorize via /auth/strava first")]
    NotAuthorized,

    #[error("failed to refresh access token: {0}")]
    Refresh(AppError),

    #[error("credential file {path}: {message}")]
    Storage { path: String, message: String },
}

/// JSON file holding a single credential object.
#[derive(Debug, Clone)]
pub struct CredentialFile {
    path: PathBuf,
}

impl CredentialFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored credential. A missing file, an empty file, or an
    /// empty JSON object all mean "no credential".
    pub fn load(&self) -> Result<Option<Credential>, CredentialError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let bytes = fs::read(&self.path).map_err(|e| self.storage_error("read", e))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        let value: serde_json::Value =
            serde_json::from_slice(&bytes).map_err(|e| self.storage_error("parse", e))?;
        if value.as_object().is_some_and(|o| o.is_empty()) {
            return Ok(None);
        }

        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| self.storage_error("parse", e))
    }

    /// Write the credential atomically (temp file, then rename).
    pub fn save(&self, credential: &Credential) -> Result<(), CredentialError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.storage_error("create directory", e))?;
        }

        let serialized =
            serde_json::to_vec_pretty(credential).map_err(|e| self.storage_error("serialize", e))?;

        let mut tmp_path = self.path.clone();
        tmp_path.set_extension("tmp");

        {
            let mut file = File::create(&tmp_path).map_err(|e| self.storage_error("create", e))?;
            file.write_all(&serialized)
                .map_err(|e| self.storage_error("write", e))?;
            file.sync_all().map_err(|e| self.storage_error("sync", e))?;
        }

        fs::rename(&tmp_path, &self.path).map_err(|e| self.storage_error("replace", e))
    }

    fn storage_error(&self, action: &str, err: impl std::fmt::Display) -> CredentialError {
        CredentialError::Storage {
            path: self.path.display().to_string(),
            message: format!("failed to {}: {}", action, err),
        }
    }
}

/// Shared handle to the current credential.
#[derive(Debug, Clone)]
pub struct TokenManager {
    file: CredentialFile,
    strava: StravaClient,
    current: Arc<Mutex<Option<Credential>>>,
}

impl TokenManager {
    /// Create a manager seeded from the credential file.
    pub fn load(file: CredentialFile, strava: StravaClient) -> Result<Self, CredentialError> {
        let current = file.load()?;
        match &current {
            Some(c) => tracing::info!(
                "Loaded Strava credential from {} (expires_at={})",
                file.path().display(),
                c.expires_at
            ),
            None => tracing::info!(
                "No Strava credential at {}, authorization required",
                file.path().display()
            ),
        }
        Ok(Self {
            file,
            strava,
            current: Arc::new(Mutex::new(current)),
        })
    }

    pub fn strava(&self) -> &StravaClient {
        &self.strava
    }

    /// Whether any credential is currently held (it may be expired).
    pub async fn is_authorized(&self) -> bool {
        self.current.lock().await.is_some()
    }

    /// Replace the credential with a freshly authorized one and persist it.
    ///
    /// The in-memory credential is replaced even when writing the file fails.
    pub async fn store_authorization(&self, credential: Credential) -> Result<(), CredentialError> {
        let mut guard = self.current.lock().await;
        *guard = Some(credential.clone());
        tracing::info!("Stored new Strava credential");
        self.persist(credential).await
    }

    /// Return an access token that has not expired, refreshing first if needed.
    ///
    /// The lock is held across the refresh so concurrent callers wait for a
    /// single refresh instead of racing with the same refresh token.
    pub async fn get_valid_access_token(&self) -> Result<String, CredentialError> {
        let mut guard = self.current.lock().await;
        let credential = guard.as_ref().ok_or(CredentialError::NotAuthorized)?;

        if !credential.is_expired_at(Utc::now().timestamp()) {
            return Ok(credential.access_token.clone());
        }

        tracing::info!(
            "Strava access token expired at {}, refreshing",
            credential.expires_at
        );
        let refreshed = self
            .strava
            .refresh(&credential.refresh_token)
            .await
            .map_err(CredentialError::Refresh)?;

        // The old refresh token is revoked now; memory must hold the new pair.
        let token = refreshed.access_token.clone();
        *guard = Some(refreshed.clone());

        if let Err(e) = self.persist(refreshed).await {
            tracing::error!("Refreshed Strava credential kept in memory only: {}", e);
        }

        Ok(token)
    }

    /// Write the credential file on the blocking pool.
    async fn persist(&self, credential: Credential) -> Result<(), CredentialError> {
        let file = self.file.clone();
        tokio::task::spawn_blocking(move || file.save(&credential))
            .await
            .map_err(|e| CredentialError::Storage {
                path: self.file.path().display().to_string(),
                message: format!("persist task failed: {}", e),
            })?
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::services::strava::tests::client as strava_client;
    use std::{env, process};
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub(crate) fn temp_path(label: &str) -> PathBuf {
        let unique = format!(
            "wind_route_api_{}_{}_{}.json",
            label,
            process::id(),
            Utc::now().timestamp_nanos_opt().unwrap_or_default(),
        );
        env::temp_dir().join(unique)
    }

    pub(crate) fn credential(access: &str, refresh: &str, expires_at: i64) -> Credential {
        Credential {
            access_token: access.to_string(),
            refresh_token: refresh.to_string(),
            expires_at,
            extra: serde_json::Map::new(),
        }
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let file = CredentialFile::new(temp_path("missing"));
        assert_eq!(tokio_test::assert_ok!(file.load()), None);
    }

    #[test]
    fn test_load_empty_object_is_empty() {
        let path = temp_path("empty_object");
        fs::write(&path, "{}").unwrap();
        assert_eq!(CredentialFile::new(&path).load().unwrap(), None);
        fs::write(&path, "  \n").unwrap();
        assert_eq!(CredentialFile::new(&path).load().unwrap(), None);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_corrupt_file_is_error() {
        let path = temp_path("corrupt");
        fs::write(&path, "{ not json").unwrap();
        let err = CredentialFile::new(&path).load().unwrap_err();
        assert!(matches!(err, CredentialError::Storage { .. }));
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_save_and_reload_keeps_extra_fields() {
        let path = temp_path("round_trip");
        let file = CredentialFile::new(&path);
        let mut stored = credential("a", "r", 1_700_000_000);
        stored
            .extra
            .insert("athlete".to_string(), serde_json::json!({ "id": 7 }));

        tokio_test::assert_ok!(file.save(&stored));
        let raw: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw["access_token"], "a");
        assert_eq!(raw["expires_at"], 1_700_000_000);
        assert_eq!(raw["athlete"]["id"], 7);

        assert_eq!(file.load().unwrap(), Some(stored));
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_is_expired_at_is_strict() {
        let c = credential("a", "r", 100);
        assert!(!c.is_expired_at(99));
        assert!(!c.is_expired_at(100));
        assert!(c.is_expired_at(101));
    }

    #[tokio::test]
    async fn test_valid_token_is_returned_without_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let path = temp_path("valid");
        let file = CredentialFile::new(&path);
        file.save(&credential("fresh", "r", Utc::now().timestamp() + 3600))
            .unwrap();

        let manager = TokenManager::load(file, strava_client(&server)).unwrap();
        assert!(manager.is_authorized().await);
        assert_eq!(manager.get_valid_access_token().await.unwrap(), "fresh");
        fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn test_expired_token_is_refreshed_and_persisted() {
        let server = MockServer::start().await;
        let new_expiry = Utc::now().timestamp() + 21600;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=old-refresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "token_type": "Bearer",
                "access_token": "new-access",
                "refresh_token": "new-refresh",
                "expires_at": new_expiry,
                "expires_in": 21600
            })))
            .expect(1)
            .mount(&server)
            .await;

        let path = temp_path("expired");
        let file = CredentialFile::new(&path);
        file.save(&credential("old-access", "old-refresh", 0)).unwrap();

        let manager = TokenManager::load(file.clone(), strava_client(&server)).unwrap();
        assert_eq!(manager.get_valid_access_token().await.unwrap(), "new-access");
        // Second call uses the refreshed credential; the mock expects one refresh only.
        assert_eq!(manager.get_valid_access_token().await.unwrap(), "new-access");

        let persisted = file.load().unwrap().unwrap();
        assert_eq!(persisted.access_token, "new-access");
        assert_eq!(persisted.refresh_token, "new-refresh");
        assert_eq!(persisted.expires_at, new_expiry);
        fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "new-access",
                "refresh_token": "new-refresh",
                "expires_at": Utc::now().timestamp() + 3600
            })))
            .expect(1)
            .mount(&server)
            .await;

        let path = temp_path("concurrent");
        let file = CredentialFile::new(&path);
        file.save(&credential("old", "old-refresh", 0)).unwrap();
        let manager = TokenManager::load(file, strava_client(&server)).unwrap();

        let (a, b) = tokio::join!(
            manager.get_valid_access_token(),
            manager.get_valid_access_token()
        );
        assert_eq!(a.unwrap(), "new-access");
        assert_eq!(b.unwrap(), "new-access");
        fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_old_credential() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let path = temp_path("failed_refresh");
        let file = CredentialFile::new(&path);
        let old = credential("old", "old-refresh", 0);
        file.save(&old).unwrap();
        let manager = TokenManager::load(file.clone(), strava_client(&server)).unwrap();

        let err = manager.get_valid_access_token().await.unwrap_err();
        assert!(matches!(err, CredentialError::Refresh(_)));
        assert_eq!(file.load().unwrap(), Some(old));
        fs::remove_file(&path).unwrap();
    }

    /// A path whose parent is a regular file, so every write fails.
    fn unwritable_path(label: &str) -> (PathBuf, PathBuf) {
        let blocker = temp_path(label);
        fs::write(&blocker, "not a directory").unwrap();
        let path = blocker.join("tokens.json");
        (blocker, path)
    }

    #[tokio::test]
    async fn test_refreshed_credential_survives_failed_write() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(body_string_contains("refresh_token=old-refresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "new-access",
                "refresh_token": "new-refresh",
                "expires_at": Utc::now().timestamp() + 3600
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (blocker, token_path) = unwritable_path("unwritable_refresh");
        let manager = TokenManager {
            file: CredentialFile::new(&token_path),
            strava: strava_client(&server),
            current: Arc::new(Mutex::new(Some(credential("old-access", "old-refresh", 0)))),
        };

        assert_eq!(manager.get_valid_access_token().await.unwrap(), "new-access");
        // No second refresh with the stale token; the mock expects exactly one.
        assert_eq!(manager.get_valid_access_token().await.unwrap(), "new-access");

        let held = manager.current.lock().await.clone().unwrap();
        assert_eq!(held.refresh_token, "new-refresh");
        assert!(!token_path.exists());
        fs::remove_file(&blocker).unwrap();
    }

    #[tokio::test]
    async fn test_store_authorization_keeps_credential_when_write_fails() {
        let server = MockServer::start().await;
        let (blocker, token_path) = unwritable_path("unwritable_store");
        let manager =
            TokenManager::load(CredentialFile::new(&token_path), strava_client(&server)).unwrap();

        let granted = credential("granted", "r", Utc::now().timestamp() + 3600);
        let err = manager.store_authorization(granted).await.unwrap_err();

        assert!(matches!(err, CredentialError::Storage { .. }));
        assert_eq!(manager.get_valid_access_token().await.unwrap(), "granted");
        fs::remove_file(&blocker).unwrap();
    }

    #[tokio::test]
    async fn test_no_credential_is_not_authorized() {
        let server = MockServer::start().await;
        let manager =
            TokenManager::load(CredentialFile::new(temp_path("none")), strava_client(&server))
                .unwrap();

        assert!(!manager.is_authorized().await);
        assert!(matches!(
            manager.get_valid_access_token().await,
            Err(CredentialError::NotAuthorized)
        ));
    }

    #[tokio::test]
    async fn test_store_authorization_persists() {
        let server = MockServer::start().await;
        let path = temp_path("store");
        let manager =
            TokenManager::load(CredentialFile::new(&path), strava_client(&server)).unwrap();

        let fresh = credential("granted", "r", Utc::now().timestamp() + 3600);
        manager.store_authorization(fresh.clone()).await.unwrap();

        assert_eq!(manager.get_valid_access_token().await.unwrap(), "granted");
        assert_eq!(CredentialFile::new(&path).load().unwrap(), Some(fresh));
        fs::remove_file(&path).unwrap();
    }
}
