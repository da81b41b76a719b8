//! Read-only access to the saved playback queues of the current user.

use reqwest::Method;
use tokio_util::sync::CancellationToken;

use crate::{
    error::Result,
    http::{Client, Reply},
    protocol::queues::{QueueDetail, QueueList},
};

/// Service for the `queues` resource.
#[derive(Clone, Copy)]
pub struct Queues<'a> {
    client: &'a Client,
}

impl<'a> Queues<'a> {
    /// Collection endpoint, relative to the base URL.
    const PATH: &'static str = "queues";

    #[must_use]
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Lists the queues of the current user, in the order the service
    /// reports them.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the request cannot be built, is cancelled, or
    /// the response cannot be transported or decoded. A failure reported
    /// by the service is returned in [`Response::error`](crate::protocol::Response::error).
    pub async fn list(self, cancel: &CancellationToken) -> Result<Reply<QueueList>> {
        let request = self.client.new_request(Method::GET, Self::PATH, None)?;
        self.client.execute(cancel, request).await
    }

    /// Fetches the tracks and current position of a single queue.
    ///
    /// `queue_id` is embedded in the path as is.
    ///
    /// # Errors
    ///
    /// As [`list`](Self::list).
    pub async fn get(self, cancel: &CancellationToken, queue_id: &str) -> Result<Reply<QueueDetail>> {
        let path = format!("{}/{queue_id}", Self::PATH);
        let request = self.client.new_request(Method::GET, &path, None)?;
        self.client.execute(cancel, request).await
    }
}

impl Client {
    /// Returns the queues service bound to this client.
    #[must_use]
    pub fn queues(&self) -> Queues<'_> {
        Queues::new(self)
    }
}
