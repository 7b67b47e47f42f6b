//! Client protocol
//!
//! Inbound frames are JSON objects tagged by `op`; outbound frames use the
//! same `{"route", "body"}` envelope as channel pushes.

mod messages;

pub use messages::{ClientMessage, ServerReply, ACK_ROUTE, ERROR_ROUTE};
