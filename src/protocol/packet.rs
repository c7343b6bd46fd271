use bytes::{Buf, BufMut, Bytes, BytesMut};

/// MySQL packet header size: 3 bytes length + 1 byte sequence
pub const PACKET_HEADER_SIZE: usize = 4;
/// Maximum payload carried by a single packet (16MB - 1)
pub const MAX_PACKET_SIZE: usize = 0xFF_FF_FF;

/// MySQL wire protocol packet
#[derive(Debug, Clone)]
pub struct Packet {
    pub sequence_id: u8,
    pub payload: Bytes,
}

impl Packet {
    pub fn new(sequence_id: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            sequence_id,
            payload: payload.into(),
        }
    }

    /// Build a command packet (always sequence 0)
    pub fn command(command: u8, body: &[u8]) -> Self {
        let mut payload = BytesMut::with_capacity(body.len() + 1);
        payload.put_u8(command);
        payload.extend_from_slice(body);
        Self::new(0, payload.freeze())
    }

    /// Write header + payload into `dst`
    pub fn encode(&self, dst: &mut BytesMut) {
        let len = self.payload.len();
        dst.reserve(PACKET_HEADER_SIZE + len);
        dst.put_uint_le(len as u64, 3);
        dst.put_u8(self.sequence_id);
        dst.extend_from_slice(&self.payload);
    }

    /// Split one packet off the front of `src`, or `None` if it is incomplete
    pub fn decode(src: &mut BytesMut) -> Option<Self> {
        if src.len() < PACKET_HEADER_SIZE {
            return None;
        }

        let len = src[0] as usize | ((src[1] as usize) << 8) | ((src[2] as usize) << 16);
        if src.len() < PACKET_HEADER_SIZE + len {
            src.reserve(PACKET_HEADER_SIZE + len - src.len());
            return None;
        }

        let sequence_id = src[3];
        src.advance(PACKET_HEADER_SIZE);
        let payload = src.split_to(len).freeze();

        Some(Self {
            sequence_id,
            payload,
        })
    }

    pub fn is_ok(&self) -> bool {
        self.payload.first() == Some(&0x00)
    }

    pub fn is_err(&self) -> bool {
        self.payload.first() == Some(&0xFF)
    }

    /// EOF marker (0xFE with a short payload; longer 0xFE payloads are data)
    pub fn is_eof(&self) -> bool {
        self.payload.first() == Some(&0xFE) && self.payload.len() < 9
    }
}

/// Command bytes used by the client
pub mod command {
    pub const COM_QUIT: u8 = 0x01;
    pub const COM_QUERY: u8 = 0x03;
    pub const COM_PING: u8 = 0x0e;
}

/// MySQL capability flags
pub mod capabilities {
    pub const CLIENT_LONG_PASSWORD: u32 = 1;
    pub const CLIENT_LONG_FLAG: u32 = 1 << 2;
    pub const CLIENT_CONNECT_WITH_DB: u32 = 1 << 3;
    pub const CLIENT_PROTOCOL_41: u32 = 1 << 9;
    pub const CLIENT_TRANSACTIONS: u32 = 1 << 13;
    pub const CLIENT_SECURE_CONNECTION: u32 = 1 << 15;
    pub const CLIENT_MULTI_RESULTS: u32 = 1 << 17;
    pub const CLIENT_PLUGIN_AUTH: u32 = 1 << 19;
    pub const CLIENT_DEPRECATE_EOF: u32 = 1 << 24;

    /// Capabilities requested from the server.
    ///
    /// CLIENT_DEPRECATE_EOF is left out so every result set keeps its EOF
    /// markers, which the text result set reader depends on.
    pub const CLIENT_CAPABILITIES: u32 = CLIENT_LONG_PASSWORD
        | CLIENT_LONG_FLAG
        | CLIENT_PROTOCOL_41
        | CLIENT_TRANSACTIONS
        | CLIENT_SECURE_CONNECTION
        | CLIENT_MULTI_RESULTS
        | CLIENT_PLUGIN_AUTH;
}

/// Error raised when a payload ends before a field is complete
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Truncated payload while reading {0}")]
pub struct Truncated(pub &'static str);

/// Bounds-checked cursor over a packet payload
#[derive(Debug)]
pub struct PayloadReader<'a> {
    buf: &'a [u8],
}

impl<'a> PayloadReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn peek_u8(&self) -> Option<u8> {
        self.buf.first().copied()
    }

    pub fn read_u8(&mut self) -> Result<u8, Truncated> {
        Ok(self.take(1, "u8")?[0])
    }

    pub fn read_u16_le(&mut self) -> Result<u16, Truncated> {
        let b = self.take(2, "u16")?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_u32_le(&mut self) -> Result<u32, Truncated> {
        let b = self.take(4, "u32")?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn take(&mut self, n: usize, what: &'static str) -> Result<&'a [u8], Truncated> {
        if self.buf.len() < n {
            return Err(Truncated(what));
        }
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    pub fn skip(&mut self, n: usize) -> Result<(), Truncated> {
        self.take(n, "filler").map(|_| ())
    }

    /// Bytes up to the next NUL; the NUL is consumed. A missing NUL takes
    /// the rest of the payload.
    pub fn read_null_terminated(&mut self) -> &'a [u8] {
        match self.buf.iter().position(|&b| b == 0) {
            Some(pos) => {
                let s = &self.buf[..pos];
                self.buf = &self.buf[pos + 1..];
                s
            }
            None => self.read_rest(),
        }
    }

    pub fn read_rest(&mut self) -> &'a [u8] {
        let rest = self.buf;
        self.buf = &[];
        rest
    }

    /// Length-encoded integer. `Ok(None)` is the NULL marker (0xFB).
    pub fn read_lenenc_int(&mut self) -> Result<Option<u64>, Truncated> {
        let first = self.read_u8()?;
        let value = match first {
            0..=0xFA => first as u64,
            0xFB => return Ok(None),
            0xFC => {
                let b = self.take(2, "lenenc u16")?;
                u16::from_le_bytes([b[0], b[1]]) as u64
            }
            0xFD => {
                let b = self.take(3, "lenenc u24")?;
                u32::from_le_bytes([b[0], b[1], b[2], 0]) as u64
            }
            0xFE => {
                let b = self.take(8, "lenenc u64")?;
                u64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
            }
            0xFF => return Err(Truncated("lenenc int (0xFF is not a length)")),
        };
        Ok(Some(value))
    }

    /// Length-encoded string. `Ok(None)` is SQL NULL.
    pub fn read_lenenc_bytes(&mut self) -> Result<Option<&'a [u8]>, Truncated> {
        match self.read_lenenc_int()? {
            Some(len) => self.take(len as usize, "lenenc string").map(Some),
            None => Ok(None),
        }
    }
}

/// Append a length-encoded integer
pub fn put_lenenc_int(buf: &mut BytesMut, value: u64) {
    if value < 251 {
        buf.put_u8(value as u8);
    } else if value < 1 << 16 {
        buf.put_u8(0xFC);
        buf.put_u16_le(value as u16);
    } else if value < 1 << 24 {
        buf.put_u8(0xFD);
        buf.put_uint_le(value, 3);
    } else {
        buf.put_u8(0xFE);
        buf.put_u64_le(value);
    }
}

/// Append a length-encoded string
pub fn put_lenenc_bytes(buf: &mut BytesMut, value: &[u8]) {
    put_lenenc_int(buf, value.len() as u64);
    buf.extend_from_slice(value);
}

/// Server ERR packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrPacket {
    pub error_code: u16,
    pub sql_state: String,
    pub error_message: String,
}

impl ErrPacket {
    /// Parse an ERR payload (CLIENT_PROTOCOL_41 layout)
    pub fn parse(payload: &[u8]) -> Option<Self> {
        let mut reader = PayloadReader::new(payload);
        if reader.read_u8().ok()? != 0xFF {
            return None;
        }
        let error_code = reader.read_u16_le().ok()?;

        let sql_state = if reader.peek_u8() == Some(b'#') && reader.remaining() >= 6 {
            reader.skip(1).ok()?;
            String::from_utf8_lossy(reader.take(5, "sql state").ok()?).into_owned()
        } else {
            "HY000".to_string()
        };
        let error_message = String::from_utf8_lossy(reader.read_rest()).into_owned();

        Some(Self {
            error_code,
            sql_state,
            error_message,
        })
    }
}
