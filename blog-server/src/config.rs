//! Service configuration

/// Default number of ListBlogs responses buffered ahead of the client
pub const DEFAULT_STREAM_BUFFER: usize = 32;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Capacity of the channel between the ListBlogs producer and the client.
    /// Values below 1 are treated as 1.
    pub stream_buffer: usize,
}

impl ServiceConfig {
    pub fn with_stream_buffer(mut self, stream_buffer: usize) -> Self {
        self.stream_buffer = stream_buffer;
        self
    }

    pub(crate) fn channel_capacity(&self) -> usize {
        self.stream_buffer.max(1)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            stream_buffer: DEFAULT_STREAM_BUFFER,
        }
    }
}
