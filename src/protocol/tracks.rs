//! Track metadata and download variants.
//!
//! # Wire Format
//!
//! `POST tracks` with `track_ids=38633706,2806532`:
//! ```json
//! [{
//!     "id": "38633706",
//!     "durationMs": 225390,
//!     "available": true,
//!     "availableAsRbt": false,
//!     "explicit": false,
//!     "storageDir": "49431_7a2a4e12.43208016.3.38633706",
//!     "title": "Tanzen",
//!     "version": "Radio Edit",
//!     "regions": ["RUSSIA", "RUSSIA_PREMIUM"],
//!     "albums": [{ "id": 4766522, "title": "Tanzen", "trackPosition": { "volume": 1, "index": 1 }, ... }],
//!     "artists": [{ "id": 218095, "name": "Scooter", "cover": { "type": "from-album-cover", ... }, ... }],
//!     "coverUri": "avatars.yandex.net/get-music-content/49876/b6a5bd67.a.4766522-1/%%",
//!     "type": "music"
//! }]
//! ```
//!
//! `GET tracks/{id}/download-info`:
//! ```json
//! [{
//!     "codec": "mp3",
//!     "bitrateInKbps": 320,
//!     "downloadInfoUrl": "https://storage.mds.yandex.net/download-info/..."
//! }]
//! ```
//!
//! The service does not promise that tracks come back in the order they
//! were requested. Use [`by_id`] to match results to requested ids.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Metadata of a single track.
///
/// Missing fields decode to their defaults. Fields are declared in wire
/// order so that re-encoding a decoded track reproduces the original JSON.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct TrackElement {
    pub id: String,
    pub duration_ms: u64,
    pub available: bool,
    pub available_as_rbt: bool,
    pub explicit: bool,
    pub storage_dir: String,
    pub title: String,

    /// Edition of the track, e.g. "Radio Edit". Absent and empty are
    /// different things on the wire.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Regions the track is licensed in
    pub regions: Vec<String>,

    pub albums: Vec<Album>,
    pub artists: Vec<Artist>,
    pub cover_uri: String,

    #[serde(rename = "type")]
    pub typ: String,
}

/// Album a track appears on.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct Album {
    pub id: u64,
    pub storage_dir: String,
    pub original_release_year: u64,
    pub year: u64,
    pub title: String,

    /// Album artists; the shape varies between endpoints.
    pub artists: Vec<serde_json::Value>,

    pub cover_uri: String,
    pub track_count: u64,
    pub genre: String,
    pub available: bool,
    pub track_position: TrackPosition,
}

/// Position of a track within an album.
#[derive(Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Debug, Hash)]
#[serde(default)]
pub struct TrackPosition {
    /// Disc number, starting at 1
    pub volume: u64,
    /// Track number on the disc, starting at 1
    pub index: u64,
}

/// Artist performing a track.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize, Debug)]
#[serde(default)]
pub struct Artist {
    pub id: u64,
    pub cover: Cover,
    pub composer: bool,
    pub various: bool,
    pub name: String,

    /// Name split into linked parts, e.g. for "A feat. B".
    pub decomposed: Vec<serde_json::Value>,
}

/// Artist picture descriptor.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize, Debug, Hash)]
#[serde(default)]
pub struct Cover {
    #[serde(rename = "type")]
    pub typ: String,
    pub prefix: String,
    pub uri: String,
}

/// One encoding of a track that can be downloaded.
///
/// `download_info_url` points at a second document describing the actual
/// storage location; it is not the audio itself.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize, Debug, Hash)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct DownloadInfo {
    pub codec: String,
    pub bitrate_in_kbps: u64,
    pub download_info_url: String,
}

/// Indexes tracks by their id.
///
/// When the service returns the same id more than once, the last one wins.
#[must_use]
pub fn by_id(tracks: &[TrackElement]) -> HashMap<&str, &TrackElement> {
    tracks
        .iter()
        .map(|track| (track.id.as_str(), track))
        .collect()
}

/// Picks the variant with the highest bitrate for `codec`.
#[must_use]
pub fn best_for_codec<'a>(variants: &'a [DownloadInfo], codec: &str) -> Option<&'a DownloadInfo> {
    variants
        .iter()
        .filter(|variant| variant.codec.eq_ignore_ascii_case(codec))
        .max_by_key(|variant| variant.bitrate_in_kbps)
}
