//! Tunnel framing
//!
//! Packets for tunneled candidates travel behind a four byte all-ones
//! prefix so they can share a socket with another protocol.

use std::borrow::Cow;

/// Prefix marking a tunneled datagram.
pub const TUNNEL_PREFIX: [u8; 4] = [0xFF; 4];

/// Session id used for every tunneled datagram.
pub const TUNNEL_SESSION: u32 = u32::from_be_bytes(TUNNEL_PREFIX);

/// Bytes to put on the wire for `packet`.
pub fn frame(packet: &[u8], tunneled: bool) -> Cow<'_, [u8]> {
    if tunneled {
        let mut framed = Vec::with_capacity(TUNNEL_PREFIX.len() + packet.len());
        framed.extend_from_slice(&TUNNEL_PREFIX);
        framed.extend_from_slice(packet);
        Cow::Owned(framed)
    } else {
        Cow::Borrowed(packet)
    }
}

/// Split a received datagram into its tunnel flag and packet.
pub fn strip(datagram: Vec<u8>) -> (bool, Vec<u8>) {
    if datagram.starts_with(&TUNNEL_PREFIX) {
        (true, datagram[TUNNEL_PREFIX.len()..].to_vec())
    } else {
        (false, datagram)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_and_strip() {
        let framed = frame(b"abc", true);
        assert_eq!(&framed[..], &[0xFF, 0xFF, 0xFF, 0xFF, b'a', b'b', b'c']);
        assert_eq!(strip(framed.into_owned()), (true, b"abc".to_vec()));

        assert!(matches!(frame(b"abc", false), Cow::Borrowed(_)));
        assert_eq!(strip(b"abc".to_vec()), (false, b"abc".to_vec()));
    }

    #[test]
    fn test_partial_prefix_is_not_a_tunnel() {
        assert_eq!(
            strip(vec![0xFF, 0xFF, 0xFF, 0x00, 1]),
            (false, vec![0xFF, 0xFF, 0xFF, 0x00, 1])
        );
        assert_eq!(TUNNEL_SESSION, 0xFFFF_FFFF);
    }
}
