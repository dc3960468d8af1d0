/// Errors raised by the transport layer.
///
/// A refused upgrade never reaches the caller of
/// [`Transport::accept`](crate::Transport::accept); it is answered with
/// `400` and logged. The variants that do surface are socket failures.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The listener could not be bound.
    #[error("bind failed: {0}")]
    Bind(#[source] std::io::Error),

    /// The listener has shut down and no further connections will arrive.
    #[error("transport closed")]
    Closed,

    /// Writing a frame to the peer failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Reading a frame from the peer failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),
}
