//! Stream framing.
//!
//! [`InformCodec`] plugs a [`PacketReader`] into `tokio_util::codec` so a
//! connection can be read as a stream of [`Packet`]s. A frame is yielded only
//! once its whole declared payload is buffered.

use crate::core::packet::{Packet, PacketReader};
use crate::core::structure::HEADER_LENGTH;
use crate::error::InformError;
use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

/// Frames inform packets on a byte stream.
///
/// Decoding waits until a full header and payload are buffered, then splits
/// the frame off without copying the payload.
#[derive(Debug, Clone, Default)]
pub struct InformCodec {
    reader: PacketReader,
}

impl InformCodec {
    pub fn new(reader: PacketReader) -> Self {
        Self { reader }
    }
}

impl Decoder for InformCodec {
    type Item = Packet;
    type Error = InformError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < HEADER_LENGTH {
            src.reserve(HEADER_LENGTH - src.len());
            return Ok(None);
        }

        // Validate the header as soon as it is complete so bad magic or an
        // oversized length is reported before the payload arrives
        let (header, consumed, variant) = self.reader.parse_header(&src[..HEADER_LENGTH])?;
        let total = consumed + header.payload_length as usize;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        let variant = variant.clone();
        src.advance(consumed);
        let payload = src.split_to(total - consumed).freeze();
        trace!(payload_length = payload.len(), "Framed inform packet");

        Ok(Some(Packet::assemble(
            header,
            payload,
            variant,
            self.reader.max_payload_size(),
        )))
    }
}

impl Encoder<Packet> for InformCodec {
    type Error = InformError;

    fn encode(&mut self, item: Packet, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(HEADER_LENGTH + item.payload.len());
        dst.extend_from_slice(item.header_bytes());
        dst.extend_from_slice(&item.payload);
        Ok(())
    }
}
