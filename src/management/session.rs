use serde_json::{Value, json};

use crate::{error::StorageError, management::Storage, types::TokenPair};

pub const KEY_ACCESS_TOKEN: &str = "accessToken";
pub const KEY_REFRESH_TOKEN: &str = "refreshToken";
pub const KEY_USER_DATA: &str = "userData";
pub const KEY_TOP_ARTISTS: &str = "topArtists";
pub const KEY_TOP_SONGS: &str = "topSongs";

/// Session-scoped cache of tokens and fetched documents.
///
/// Documents are stored verbatim under their own key. The session ends when
/// the user runs `spotme logout`.
pub struct SessionCache {
    storage: Storage,
}

impl SessionCache {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    pub fn in_memory() -> Self {
        Self::new(Storage::in_memory())
    }

    pub async fn save(&mut self, key: &str, value: Value) -> Result<(), StorageError> {
        self.storage.save(key, value).await
    }

    pub fn load(&self, key: &str) -> Option<Value> {
        self.storage.load(key)
    }

    pub fn access_token(&self) -> Option<String> {
        self.storage.load_str(KEY_ACCESS_TOKEN)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.storage.load_str(KEY_REFRESH_TOKEN)
    }

    /// Writes both tokens. A pair without a refresh token leaves any
    /// previously stored one untouched.
    pub async fn store_tokens(&mut self, tokens: &TokenPair) -> Result<(), StorageError> {
        self.storage
            .save(KEY_ACCESS_TOKEN, json!(tokens.access_token))
            .await?;
        if let Some(refresh) = &tokens.refresh_token {
            self.storage.save(KEY_REFRESH_TOKEN, json!(refresh)).await?;
        }
        Ok(())
    }

    /// Drops the access token after the resource API rejected it.
    pub async fn forget_access_token(&mut self) -> Result<(), StorageError> {
        self.storage.remove(KEY_ACCESS_TOKEN).await.map(|_| ())
    }

    /// The profile, top artists and top tracks, only if all three are cached.
    pub fn cached_documents(&self) -> Option<(Value, Value, Value)> {
        Some((
            self.load(KEY_USER_DATA)?,
            self.load(KEY_TOP_ARTISTS)?,
            self.load(KEY_TOP_SONGS)?,
        ))
    }

    pub async fn clear(&mut self) -> Result<(), StorageError> {
        self.storage.clear().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(refresh: Option<&str>) -> TokenPair {
        TokenPair {
            access_token: "tok1".to_string(),
            refresh_token: refresh.map(str::to_string),
            scope: None,
            expires_in: Some(3600),
            obtained_at: 0,
        }
    }

    #[tokio::test]
    async fn store_tokens_keeps_previous_refresh_token() {
        let mut session = SessionCache::in_memory();
        session.store_tokens(&tokens(Some("r1"))).await.unwrap();
        session.store_tokens(&tokens(None)).await.unwrap();

        assert_eq!(session.access_token().as_deref(), Some("tok1"));
        assert_eq!(session.refresh_token().as_deref(), Some("r1"));
    }

    #[tokio::test]
    async fn cached_documents_requires_all_three() {
        let mut session = SessionCache::in_memory();
        session.save(KEY_USER_DATA, json!({"id": "u1"})).await.unwrap();
        session.save(KEY_TOP_ARTISTS, json!({"items": []})).await.unwrap();
        assert!(session.cached_documents().is_none());

        session.save(KEY_TOP_SONGS, json!({"items": []})).await.unwrap();
        assert!(session.cached_documents().is_some());
    }
}
