//! Saved playback queues.
//!
//! # Wire Format
//!
//! `GET queues`:
//! ```json
//! {
//!     "queues": [
//!         { "id": "5d2c1b0e8b5c6a0e3c000001", "modified": "2019-07-15T09:24:30.121Z" }
//!     ]
//! }
//! ```
//!
//! `GET queues/{id}`:
//! ```json
//! {
//!     "tracks": [
//!         { "trackId": "38633706", "albumId": "4766522", "from": "desktop_win-home-playlist_of_the_day-playlist-default" }
//!     ],
//!     "currentIndex": 0,
//!     "modified": "2019-07-15T09:24:30.121Z"
//! }
//! ```

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Result of listing the queues of the current user.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize, Debug, Hash)]
pub struct QueueList {
    /// Queues in the order reported by the service
    #[serde(default)]
    pub queues: Vec<QueueElement>,
}

/// One saved queue and its last modification time.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize, Debug, Hash)]
pub struct QueueElement {
    #[serde(default)]
    pub id: String,

    #[serde(default, with = "time::serde::rfc3339::option")]
    pub modified: Option<OffsetDateTime>,
}

/// Contents of a single queue.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize, Debug, Hash)]
#[serde(rename_all = "camelCase")]
pub struct QueueDetail {
    /// Tracks in playback order
    #[serde(default)]
    pub tracks: Vec<QueueTrack>,

    /// Position of the current track within `tracks`; may be negative
    /// when nothing is playing.
    #[serde(default)]
    pub current_index: i64,

    #[serde(default, with = "time::serde::rfc3339::option")]
    pub modified: Option<OffsetDateTime>,
}

impl QueueDetail {
    /// The track at `current_index`, if the index is in range.
    #[must_use]
    pub fn current(&self) -> Option<&QueueTrack> {
        usize::try_from(self.current_index)
            .ok()
            .and_then(|index| self.tracks.get(index))
    }
}

/// Reference to a track inside a queue.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize, Debug, Hash)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct QueueTrack {
    pub track_id: String,

    /// Empty for tracks uploaded by the user
    pub album_id: String,

    /// Client context the track was queued from
    pub from: String,
}
