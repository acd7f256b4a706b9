/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The peer did not finish the WebSocket upgrade in time.
    #[error("handshake with {addr} timed out after {after:?}")]
    HandshakeTimedOut {
        /// Remote address of the peer.
        addr: std::net::SocketAddr,
        /// The limit that elapsed.
        after: std::time::Duration,
    },

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// Binding the listener, accepting a socket, or completing the
    /// WebSocket upgrade failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_failed_keeps_source() {
        use std::error::Error;
        let err = TransportError::SendFailed(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "pipe",
        ));
        assert!(err.to_string().starts_with("send failed"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_handshake_timeout_names_peer() {
        let err = TransportError::HandshakeTimedOut {
            addr: "127.0.0.1:4000".parse().unwrap(),
            after: std::time::Duration::from_secs(5),
        };
        assert_eq!(err.to_string(), "handshake with 127.0.0.1:4000 timed out after 5s");
    }
}
