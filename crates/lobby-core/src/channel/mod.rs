//! Channels
//!
//! A [`Channel`] groups member uids by the front-end server each one is
//! connected through; [`ChannelService`] owns the channels of this process.

mod channel;
mod service;

pub use channel::{Channel, ChannelState, Member};
pub use service::{
    ChannelService, ChannelServiceBuilder, RestoreFailure, RestoreReport, DEFAULT_CHANNEL_PREFIX,
};
