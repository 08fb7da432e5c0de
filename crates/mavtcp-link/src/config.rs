use std::sync::Arc;

use mavtcp_frame::{ChannelPool, FrameConfig, Identity};

/// Default MAVLink TCP port.
pub const DEFAULT_PORT: u16 = 5760;

/// Default size of each connection's receive scratch buffer.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 4096;

/// Default local identity: system 1, UDP/TCP bridge component.
pub const DEFAULT_IDENTITY: Identity = Identity::new(1, 240);

/// Per-connection behavior.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Identity this link presents; frames from other senders are re-finalized.
    pub identity: Identity,
    /// Size of the receive scratch buffer. Default: 4 KiB.
    pub read_buffer_size: usize,
    /// Set `TCP_NODELAY` on every socket. Default: true.
    pub nodelay: bool,
    /// Codec configuration shared by parser and serializer.
    pub frame: FrameConfig,
    /// Pool channel slots are leased from. Default: the process-wide pool.
    pub channels: Arc<ChannelPool>,
}

impl LinkConfig {
    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = identity;
        self
    }

    pub fn with_channel_pool(mut self, channels: Arc<ChannelPool>) -> Self {
        self.channels = channels;
        self
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            identity: DEFAULT_IDENTITY,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            nodelay: true,
            frame: FrameConfig::default(),
            channels: ChannelPool::global(),
        }
    }
}

/// Listening-side behavior.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    /// Configuration applied to every accepted connection.
    pub link: LinkConfig,
    /// Maximum simultaneously registered clients. Default: pool capacity.
    pub max_clients: Option<usize>,
}

impl ServerConfig {
    pub fn with_link(mut self, link: LinkConfig) -> Self {
        self.link = link;
        self
    }

    pub fn with_max_clients(mut self, max_clients: usize) -> Self {
        self.max_clients = Some(max_clients);
        self
    }

    /// Effective client capacity, never larger than the channel pool.
    pub fn capacity(&self) -> usize {
        let pool = self.link.channels.capacity();
        self.max_clients.map_or(pool, |max| max.min(pool))
    }
}
