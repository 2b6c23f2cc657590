//! Unified error type for the client.

use cavern_net::NetError;
use cavern_protocol::ProtocolError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Net(#[from] NetError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The server could not be reached.
    #[error("could not reach {0}")]
    Unreachable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_protocol_error() {
        let err: ClientError = ProtocolError::UnknownMessageId(cavern_protocol::MessageId(42)).into();
        assert!(matches!(err, ClientError::Protocol(_)));
    }

    #[test]
    fn test_unreachable_names_the_server() {
        let err = ClientError::Unreachable("ws://127.0.0.1:1".into());
        assert_eq!(err.to_string(), "could not reach ws://127.0.0.1:1");
    }
}
