//! Unified error type for the Typerace server.

use typerace_protocol::ProtocolError;
use typerace_room::RoomError;
use typerace_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates a `From` impl, so
/// `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum TyperaceError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room-level error.
    #[error(transparent)]
    Room(#[from] RoomError),

    /// Socket setup outside the transport, such as reading the bound address.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use typerace_protocol::{ClientEvent, Codec, JsonCodec, RoomId};

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::HandshakeTimedOut {
            addr: "10.0.0.7:5123".parse().unwrap(),
            after: std::time::Duration::from_secs(5),
        };
        let typerace_err: TyperaceError = err.into();
        assert!(matches!(typerace_err, TyperaceError::Transport(_)));
        assert!(typerace_err.to_string().contains("10.0.0.7:5123"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = JsonCodec.decode::<ClientEvent>(b"{not json").unwrap_err();
        let typerace_err: TyperaceError = err.into();
        assert!(matches!(typerace_err, TyperaceError::Protocol(_)));
        assert!(typerace_err.to_string().starts_with("decode failed"));
    }

    #[test]
    fn test_from_room_error() {
        let err = RoomError::NotFound(RoomId::new("R1"));
        let typerace_err: TyperaceError = err.into();
        assert!(matches!(typerace_err, TyperaceError::Room(_)));
        assert_eq!(typerace_err.to_string(), "room R1 not found");
    }
}
