use bytes::{BufMut, BytesMut};
use sha1::Sha1;
use sha2::{Digest, Sha256};

use super::packet::{capabilities::*, Packet, PayloadReader, Truncated};

pub const NATIVE_PASSWORD_PLUGIN: &str = "mysql_native_password";
pub const CACHING_SHA2_PLUGIN: &str = "caching_sha2_password";

/// Initial handshake (protocol v10) sent by the server on connect
#[derive(Debug, Clone)]
pub struct ServerGreeting {
    pub protocol_version: u8,
    pub server_version: String,
    pub connection_id: u32,
    pub capability_flags: u32,
    pub character_set: u8,
    pub status_flags: u16,
    /// Full scramble (part 1 + part 2, without the trailing NUL)
    pub auth_plugin_data: Vec<u8>,
    pub auth_plugin_name: String,
}

impl ServerGreeting {
    pub fn parse(payload: &[u8]) -> Result<Self, Truncated> {
        let mut reader = PayloadReader::new(payload);

        let protocol_version = reader.read_u8()?;
        let server_version = String::from_utf8_lossy(reader.read_null_terminated()).into_owned();
        let connection_id = reader.read_u32_le()?;

        let mut auth_plugin_data = reader.take(8, "auth plugin data part 1")?.to_vec();
        reader.skip(1)?;

        let mut capability_flags = reader.read_u16_le()? as u32;
        let mut character_set = 0;
        let mut status_flags = 0;
        let mut auth_plugin_name = NATIVE_PASSWORD_PLUGIN.to_string();

        // Pre-4.1 servers stop after the lower capability flags
        if !reader.is_empty() {
            character_set = reader.read_u8()?;
            status_flags = reader.read_u16_le()?;
            capability_flags |= (reader.read_u16_le()? as u32) << 16;
            let auth_data_len = reader.read_u8()? as usize;
            reader.skip(10)?;

            if capability_flags & CLIENT_SECURE_CONNECTION != 0 {
                let len = std::cmp::max(13, auth_data_len.saturating_sub(8));
                let available = reader.remaining();
                let part2 = reader.take(len.min(available), "auth plugin data part 2")?;
                let end = part2.iter().position(|&b| b == 0).unwrap_or(part2.len());
                auth_plugin_data.extend_from_slice(&part2[..end]);
            }

            if capability_flags & CLIENT_PLUGIN_AUTH != 0 && !reader.is_empty() {
                auth_plugin_name =
                    String::from_utf8_lossy(reader.read_null_terminated()).into_owned();
            }
        }

        Ok(Self {
            protocol_version,
            server_version,
            connection_id,
            capability_flags,
            character_set,
            status_flags,
            auth_plugin_data,
            auth_plugin_name,
        })
    }
}

/// Handshake response sent by the client
#[derive(Debug, Clone)]
pub struct HandshakeResponse {
    pub capability_flags: u32,
    pub max_packet_size: u32,
    pub character_set: u8,
    pub username: String,
    pub auth_response: Vec<u8>,
    pub database: Option<String>,
    pub auth_plugin_name: String,
}

impl HandshakeResponse {
    pub fn encode(&self, sequence_id: u8) -> Packet {
        let mut buf = BytesMut::new();

        buf.put_u32_le(self.capability_flags);
        buf.put_u32_le(self.max_packet_size);
        buf.put_u8(self.character_set);
        buf.extend_from_slice(&[0u8; 23]);

        buf.extend_from_slice(self.username.as_bytes());
        buf.put_u8(0);

        buf.put_u8(self.auth_response.len() as u8);
        buf.extend_from_slice(&self.auth_response);

        if self.capability_flags & CLIENT_CONNECT_WITH_DB != 0 {
            if let Some(ref db) = self.database {
                buf.extend_from_slice(db.as_bytes());
            }
            buf.put_u8(0);
        }

        if self.capability_flags & CLIENT_PLUGIN_AUTH != 0 {
            buf.extend_from_slice(self.auth_plugin_name.as_bytes());
            buf.put_u8(0);
        }

        Packet::new(sequence_id, buf.freeze())
    }
}

/// Auth switch request (0xFE) sent by the server during authentication
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSwitchRequest {
    pub plugin_name: String,
    pub plugin_data: Vec<u8>,
}

impl AuthSwitchRequest {
    pub fn parse(payload: &[u8]) -> Option<Self> {
        let mut reader = PayloadReader::new(payload);
        if reader.read_u8().ok()? != 0xFE {
            return None;
        }
        let plugin_name = String::from_utf8_lossy(reader.read_null_terminated()).into_owned();
        let mut plugin_data = reader.read_rest().to_vec();
        if plugin_data.last() == Some(&0) {
            plugin_data.pop();
        }
        Some(Self {
            plugin_name,
            plugin_data,
        })
    }
}

/// Compute the auth response for a plugin, or `None` if it is unsupported
pub fn scramble_for_plugin(plugin: &str, password: &str, nonce: &[u8]) -> Option<Vec<u8>> {
    match plugin {
        NATIVE_PASSWORD_PLUGIN => Some(scramble_native_password(password, nonce)),
        CACHING_SHA2_PLUGIN => Some(scramble_caching_sha2(password, nonce)),
        _ => None,
    }
}

/// mysql_native_password: SHA1(pw) XOR SHA1(nonce + SHA1(SHA1(pw)))
pub fn scramble_native_password(password: &str, nonce: &[u8]) -> Vec<u8> {
    if password.is_empty() {
        return Vec::new();
    }

    let hash1 = Sha1::digest(password.as_bytes());
    let hash2 = Sha1::digest(hash1);

    let mut hasher = Sha1::new();
    hasher.update(nonce);
    hasher.update(hash2);
    let hash3 = hasher.finalize();

    hash1.iter().zip(hash3.iter()).map(|(a, b)| a ^ b).collect()
}

/// caching_sha2_password fast path: SHA256(pw) XOR SHA256(SHA256(SHA256(pw)) + nonce)
pub fn scramble_caching_sha2(password: &str, nonce: &[u8]) -> Vec<u8> {
    if password.is_empty() {
        return Vec::new();
    }

    let hash1 = Sha256::digest(password.as_bytes());
    let hash2 = Sha256::digest(hash1);

    let mut hasher = Sha256::new();
    hasher.update(hash2);
    hasher.update(nonce);
    let hash3 = hasher.finalize();

    hash1.iter().zip(hash3.iter()).map(|(a, b)| a ^ b).collect()
}
