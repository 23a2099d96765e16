//! In-process session transport.

mod channel_transport;

pub use channel_transport::{ChannelClient, ChannelTransport};
