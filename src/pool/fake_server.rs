//! Minimal in-process MySQL server for pool tests
//!
//! Greets with `mysql_native_password`, checks the password `secret` and
//! answers a handful of fixed statements. A rejecting server answers every
//! accept with an ERR packet instead of a greeting.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::{BufMut, BytesMut};
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;

use crate::protocol::{
    capabilities::CLIENT_CAPABILITIES,
    command,
    handshake::scramble_native_password,
    packet::{put_lenenc_bytes, put_lenenc_int},
    Packet, PacketCodec, PayloadReader, NATIVE_PASSWORD_PLUGIN,
};

const PASSWORD: &str = "secret";
const NONCE: &[u8; 20] = b"abcdefghij0123456789";

pub(crate) struct FakeServer {
    addr: SocketAddr,
    accepted: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl FakeServer {
    pub(crate) async fn start() -> Self {
        Self::spawn(None).await
    }

    /// Server that refuses every connection with the given error
    pub(crate) async fn start_rejecting(code: u16, message: &'static str) -> Self {
        Self::spawn(Some((code, message))).await
    }

    async fn spawn(reject: Option<(u16, &'static str)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accepted = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&accepted);
        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(serve(stream, reject));
            }
        });

        Self {
            addr,
            accepted,
            task,
        }
    }

    pub(crate) fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Number of accepted TCP connections
    pub(crate) fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }
}

impl Drop for FakeServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(stream: TcpStream, reject: Option<(u16, &'static str)>) {
    let mut framed = Framed::new(stream, PacketCodec);
    if let Some((code, message)) = reject {
        let _ = framed
            .send(Packet::new(0, err_payload(code, "HY000", message)))
            .await;
        return;
    }
    if framed.send(greeting()).await.is_err() {
        return;
    }

    let Some(Ok(response)) = framed.next().await else {
        return;
    };
    if auth_response(&response.payload) != scramble_native_password(PASSWORD, NONCE) {
        let _ = framed
            .send(Packet::new(2, err_payload(1045, "28000", "Access denied")))
            .await;
        return;
    }
    if framed.send(Packet::new(2, ok_payload())).await.is_err() {
        return;
    }

    while let Some(Ok(packet)) = framed.next().await {
        let packets = match packet.payload.first().copied() {
            Some(command::COM_QUIT) | None => return,
            Some(command::COM_PING) => vec![ok_payload()],
            Some(command::COM_QUERY) => match &packet.payload[1..] {
                b"SELECT 1, NULL" => result_set(&[vec![Some("1"), None]]),
                b"SHOW SLAVE STATUS" => result_set(&[]),
                b"SELECT overflow" => vec![overflowing_column_count()],
                b"SELECT broken" => vec![err_payload(1064, "42000", "You have an error")],
                _ => vec![ok_payload()],
            },
            Some(_) => vec![err_payload(1047, "08S01", "Unknown command")],
        };

        for (seq, payload) in packets.into_iter().enumerate() {
            if framed.send(Packet::new(seq as u8 + 1, payload)).await.is_err() {
                return;
            }
        }
    }
}

fn greeting() -> Packet {
    let mut buf = BytesMut::new();
    buf.put_u8(10);
    buf.extend_from_slice(b"8.0.36-fake\0");
    buf.put_u32_le(7);
    buf.extend_from_slice(&NONCE[..8]);
    buf.put_u8(0);
    buf.put_u16_le(CLIENT_CAPABILITIES as u16);
    buf.put_u8(0x21);
    buf.put_u16_le(0x0002);
    buf.put_u16_le((CLIENT_CAPABILITIES >> 16) as u16);
    buf.put_u8(21);
    buf.extend_from_slice(&[0u8; 10]);
    buf.extend_from_slice(&NONCE[8..]);
    buf.put_u8(0);
    buf.extend_from_slice(NATIVE_PASSWORD_PLUGIN.as_bytes());
    buf.put_u8(0);
    Packet::new(0, buf.freeze())
}

/// Extract the auth response from a HandshakeResponse41 payload
fn auth_response(payload: &[u8]) -> Vec<u8> {
    let mut reader = PayloadReader::new(payload);
    if reader.skip(32).is_err() {
        return Vec::new();
    }
    reader.read_null_terminated();
    let Ok(len) = reader.read_u8() else {
        return Vec::new();
    };
    reader
        .take(len as usize, "auth response")
        .map(|b| b.to_vec())
        .unwrap_or_default()
}

fn ok_payload() -> BytesMut {
    let mut buf = BytesMut::new();
    buf.extend_from_slice(&[0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00]);
    buf
}

fn eof_payload() -> BytesMut {
    let mut buf = BytesMut::new();
    buf.extend_from_slice(&[0xFE, 0x00, 0x00, 0x02, 0x00]);
    buf
}

fn err_payload(code: u16, sql_state: &str, message: &str) -> BytesMut {
    let mut buf = BytesMut::new();
    buf.put_u8(0xFF);
    buf.put_u16_le(code);
    buf.put_u8(b'#');
    buf.extend_from_slice(sql_state.as_bytes());
    buf.extend_from_slice(message.as_bytes());
    buf
}

/// Column count of `u64::MAX`
fn overflowing_column_count() -> BytesMut {
    let mut buf = BytesMut::new();
    put_lenenc_int(&mut buf, u64::MAX);
    buf
}

fn column(name: &str) -> BytesMut {
    let mut buf = BytesMut::new();
    put_lenenc_bytes(&mut buf, b"def");
    for _ in 0..3 {
        put_lenenc_bytes(&mut buf, b"");
    }
    put_lenenc_bytes(&mut buf, name.as_bytes());
    put_lenenc_bytes(&mut buf, name.as_bytes());
    buf.put_u8(0x0c);
    buf.put_u16_le(0x21);
    buf.put_u32_le(64);
    buf.put_u8(0xFD); // VAR_STRING
    buf.put_u16_le(0);
    buf.put_u8(0);
    buf.put_u16_le(0);
    buf
}

/// Two-column (`a`, `b`) result set
fn result_set(rows: &[Vec<Option<&str>>]) -> Vec<BytesMut> {
    let mut packets = Vec::new();

    let mut count = BytesMut::new();
    put_lenenc_int(&mut count, 2);
    packets.push(count);
    packets.push(column("a"));
    packets.push(column("b"));
    packets.push(eof_payload());

    for values in rows {
        let mut row = BytesMut::new();
        for value in values {
            match value {
                Some(v) => put_lenenc_bytes(&mut row, v.as_bytes()),
                None => row.put_u8(0xFB),
            }
        }
        packets.push(row);
    }

    packets.push(eof_payload());
    packets
}
