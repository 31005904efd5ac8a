use tokio::sync::mpsc::UnboundedSender;
use tungstenite::protocol::Message as WsMessage;

use crate::broker::ListingReader;

/// One connected WebSocket client.
///
/// Besides its id and outbound channel a session may hold one open
/// subscribers listing. Dropping the session (disconnect) drops the reader,
/// which releases the listing gate.
#[derive(Debug)]
pub struct Session {
    /// Unique identifier, `session-<uuid>`.
    pub id: String,

    /// Channel to send WebSocket messages to the client.
    pub sender: UnboundedSender<WsMessage>,

    listing: Option<ListingReader>,
}

impl Session {
    pub fn new(sender: UnboundedSender<WsMessage>) -> Self {
        Self {
            id: format!("session-{}", uuid::Uuid::new_v4()),
            sender,
            listing: None,
        }
    }

    pub fn listing_mut(&mut self) -> Option<&mut ListingReader> {
        self.listing.as_mut()
    }

    pub fn has_listing(&self) -> bool {
        self.listing.is_some()
    }

    /// Replaces any open listing with `reader`.
    pub fn set_listing(&mut self, reader: ListingReader) {
        self.listing = Some(reader);
    }

    /// Closes the open listing, if any. Returns whether one was open.
    pub fn close_listing(&mut self) -> bool {
        self.listing.take().is_some()
    }
}
