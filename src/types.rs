use serde::{Deserialize, Serialize};
use serde_json::Value;
use tabled::Tabled;

use crate::error::FetchError;

/// Tokens obtained from the token endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
    pub expires_in: Option<u64>,
    pub obtained_at: u64,
}

/// Raw token endpoint body. Every field is optional so that error bodies
/// and partial successes deserialize alike.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
    pub expires_in: Option<u64>,
    /// Either a bare error code (`"invalid_grant"`) or an object carrying
    /// `status` and `message`.
    pub error: Option<Value>,
    pub error_description: Option<String>,
}

/// Query parameters delivered to the callback listener.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub error: Option<String>,
}

/// What the callback listener has received so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    Code(String),
    Denied(String),
}

/// State shared between the callback listener and the waiting flow.
#[derive(Debug, Clone, Default)]
pub struct CallbackState {
    pub outcome: Option<CallbackOutcome>,
}

/// Result of a single resource request.
pub type Resource = Result<Value, FetchError>;

/// The three documents handed to the presentation layer.
#[derive(Debug)]
pub struct Dashboard {
    pub profile: Resource,
    pub top_artists: Resource,
    pub top_tracks: Resource,
}

impl Dashboard {
    /// A dashboard built entirely from cached documents.
    pub fn cached(profile: Value, top_artists: Value, top_tracks: Value) -> Self {
        Self {
            profile: Ok(profile),
            top_artists: Ok(top_artists),
            top_tracks: Ok(top_tracks),
        }
    }

    pub fn resources(&self) -> [(&'static str, &Resource); 3] {
        [
            ("profile", &self.profile),
            ("top artists", &self.top_artists),
            ("top tracks", &self.top_tracks),
        ]
    }

    pub fn needs_reauthorization(&self) -> bool {
        self.resources()
            .iter()
            .any(|(_, r)| matches!(r, Err(e) if e.requires_reauthorization()))
    }
}

/// Rendering view of the `/me` document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub display_name: Option<String>,
    pub id: String,
    pub email: Option<String>,
    pub uri: String,
    pub href: Option<String>,
    pub country: Option<String>,
    pub product: Option<String>,
    pub external_urls: ExternalUrls,
    pub images: Vec<Image>,
    pub followers: Option<Followers>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExternalUrls {
    pub spotify: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Image {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Followers {
    pub total: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ArtistList {
    pub items: Vec<Artist>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Artist {
    pub id: String,
    pub name: String,
    pub genres: Vec<String>,
    pub popularity: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TrackList {
    pub items: Vec<Track>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Track {
    pub id: String,
    pub name: String,
    pub artists: Vec<TrackArtist>,
    pub album: Album,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TrackArtist {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Album {
    pub name: String,
    pub images: Vec<Image>,
}

#[derive(Tabled)]
pub struct ArtistTableRow {
    #[tabled(rename = "#")]
    pub rank: usize,
    pub name: String,
    pub genres: String,
}

#[derive(Tabled)]
pub struct TrackTableRow {
    #[tabled(rename = "#")]
    pub rank: usize,
    pub name: String,
    pub artists: String,
    pub album: String,
    pub cover: String,
}
