//! Client side of the MySQL wire protocol
//!
//! Only what status collection needs: connection handshake, `COM_QUERY`
//! with text result sets, `COM_PING` and `COM_QUIT`.

pub mod codec;
pub mod handshake;
pub mod packet;
pub mod resultset;

pub use codec::PacketCodec;
pub use handshake::{
    scramble_for_plugin, AuthSwitchRequest, HandshakeResponse, ServerGreeting,
    CACHING_SHA2_PLUGIN, NATIVE_PASSWORD_PLUGIN,
};
pub use packet::{capabilities, command, ErrPacket, Packet, PayloadReader};
pub use resultset::{parse_text_row, ColumnDefinition, ResultSet, Row};

/// Quote a value as a single-quoted SQL string literal
pub fn quote_literal(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for c in value.chars() {
        match c {
            '\'' => quoted.push_str("''"),
            '\\' => quoted.push_str("\\\\"),
            '\0' => quoted.push_str("\\0"),
            _ => quoted.push(c),
        }
    }
    quoted.push('\'');
    quoted
}
