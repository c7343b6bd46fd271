use std::io;

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use super::packet::{Packet, MAX_PACKET_SIZE};

/// MySQL packet codec for use with tokio Framed
#[derive(Debug, Default)]
pub struct PacketCodec;

impl Decoder for PacketCodec {
    type Item = Packet;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        Ok(Packet::decode(src))
    }
}

impl Encoder<Packet> for PacketCodec {
    type Error = io::Error;

    fn encode(&mut self, item: Packet, dst: &mut BytesMut) -> Result<(), Self::Error> {
        // Introspection statements never need multi-packet payloads
        if item.payload.len() >= MAX_PACKET_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("packet payload too large: {} bytes", item.payload.len()),
            ));
        }
        item.encode(dst);
        Ok(())
    }
}
