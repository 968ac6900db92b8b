//! Channel used on platforms without datagram sockets.

use crate::scheme::Scheme;

use super::{TransportChannel, TransportError};

/// A channel that refuses every bind, leaving the server unbound.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedChannel;

impl TransportChannel for UnsupportedChannel {
    fn bind(&mut self, scheme: &Scheme) -> Result<(), TransportError> {
        Err(TransportError::Unsupported {
            scheme: scheme.to_string(),
        })
    }

    fn unbind(&mut self, _scheme: &Scheme) {}

    fn poll(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_always_fails() {
        let mut channel = UnsupportedChannel;
        let scheme = Scheme::sanitize("hue4").expect("valid scheme");
        assert!(matches!(
            channel.bind(&scheme),
            Err(TransportError::Unsupported { .. })
        ));
        assert!(channel.poll().expect("poll").is_none());
    }
}
