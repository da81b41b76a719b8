//! Track metadata and download variants.

use reqwest::{header::CONTENT_TYPE, Method};
use tokio_util::sync::CancellationToken;

use crate::{
    error::Result,
    http::{Client, Reply},
    protocol::tracks::{DownloadInfo, TrackElement},
};

/// Service for the `tracks` resource.
#[derive(Clone, Copy)]
pub struct Tracks<'a> {
    client: &'a Client,
}

impl<'a> Tracks<'a> {
    /// Collection endpoint, relative to the base URL.
    const PATH: &'static str = "tracks";

    /// Form field carrying the comma-separated track ids.
    const TRACK_IDS_FIELD: &'static str = "track_ids";

    #[must_use]
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Fetches metadata for a batch of tracks in a single request.
    ///
    /// The ids are sent comma-joined, in the given order, as the form field
    /// `track_ids`. An empty batch is sent as is. The service decides the
    /// order of the returned tracks; match them up with
    /// [`tracks::by_id`](crate::protocol::tracks::by_id) rather than by
    /// position.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the request cannot be built, is cancelled, or
    /// the response cannot be transported or decoded.
    pub async fn get_tracks<S>(
        self,
        cancel: &CancellationToken,
        track_ids: &[S],
    ) -> Result<Reply<Vec<TrackElement>>>
    where
        S: AsRef<str>,
    {
        let track_ids = track_ids
            .iter()
            .map(AsRef::<str>::as_ref)
            .collect::<Vec<_>>()
            .join(",");

        let mut request = self.client.new_request(
            Method::POST,
            Self::PATH,
            Some(&[(Self::TRACK_IDS_FIELD, track_ids.as_str())]),
        )?;
        request
            .headers_mut()
            .try_insert(CONTENT_TYPE, Client::FORM_CONTENT)?;

        self.client.execute(cancel, request).await
    }

    /// Lists the codec and bitrate variants a track can be downloaded in.
    ///
    /// # Errors
    ///
    /// As [`get_tracks`](Self::get_tracks).
    pub async fn get_download_info(
        self,
        cancel: &CancellationToken,
        track_id: &str,
    ) -> Result<Reply<Vec<DownloadInfo>>> {
        let path = format!("{}/{track_id}/download-info", Self::PATH);
        let request = self.client.new_request(Method::GET, &path, None)?;
        self.client.execute(cancel, request).await
    }
}

impl Client {
    /// Returns the tracks service bound to this client.
    #[must_use]
    pub fn tracks(&self) -> Tracks<'_> {
        Tracks::new(self)
    }
}
