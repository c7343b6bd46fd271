use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::{debug, error};

use crate::config::InstanceConfig;
use crate::protocol::{
    capabilities::{CLIENT_CAPABILITIES, CLIENT_PROTOCOL_41},
    command, parse_text_row, scramble_for_plugin, AuthSwitchRequest, ColumnDefinition, ErrPacket,
    HandshakeResponse, Packet, PacketCodec, PayloadReader, ResultSet, ServerGreeting,
    NATIVE_PASSWORD_PLUGIN,
};
use crate::status::{QueryError, QueryExecutor};

/// Upper bound on result set width (the server's table column limit)
const MAX_COLUMNS: u64 = 4096;

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Connection is available for a new command
    Idle,
    /// A command was sent and its response is not fully read
    InUse,
    /// Connection is broken/closed
    Closed,
}

/// An authenticated text-protocol connection to one MySQL instance
pub struct MySqlConnection {
    framed: Framed<TcpStream, PacketCodec>,
    state: ConnectionState,
    created_at: Instant,
    last_used_at: Instant,
    server_version: String,
}

impl MySqlConnection {
    /// Connect and authenticate, bounded by `timeout`
    pub async fn connect(
        config: &InstanceConfig,
        timeout: Duration,
    ) -> Result<Self, ConnectionError> {
        let addr = config.addr();
        debug!(addr = %addr, "Connecting to instance");

        tokio::time::timeout(timeout, Self::connect_inner(&addr, config))
            .await
            .map_err(|_| {
                error!(addr = %addr, timeout_ms = timeout.as_millis() as u64, "Connect timed out");
                ConnectionError::Timeout(timeout)
            })?
    }

    async fn connect_inner(addr: &str, config: &InstanceConfig) -> Result<Self, ConnectionError> {
        let stream = TcpStream::connect(addr).await.map_err(|e| {
            error!(addr = %addr, error = %e, "Failed to connect to instance");
            ConnectionError::Connect(e.to_string())
        })?;
        stream.set_nodelay(true).ok();

        let mut framed = Framed::new(stream, PacketCodec);

        let greeting_packet = Self::read_packet(&mut framed).await?;
        if greeting_packet.is_err() {
            let err = server_error(&greeting_packet);
            error!(
                addr = %addr,
                error_code = err.error_code,
                error_message = %err.error_message,
                "Instance rejected connection"
            );
            return Err(ConnectionError::Server(err));
        }
        let greeting = ServerGreeting::parse(&greeting_packet.payload)
            .map_err(|e| ConnectionError::Protocol(format!("Invalid server greeting: {}", e)))?;

        if greeting.capability_flags & CLIENT_PROTOCOL_41 == 0 {
            return Err(ConnectionError::Protocol(
                "Server does not support protocol 4.1".into(),
            ));
        }

        debug!(
            addr = %addr,
            server_version = %greeting.server_version,
            auth_plugin = %greeting.auth_plugin_name,
            "Received server greeting"
        );

        let caps = CLIENT_CAPABILITIES & greeting.capability_flags;

        // Unknown plugins get a native scramble; the server answers with an auth switch
        let (plugin, auth_response) = match scramble_for_plugin(
            &greeting.auth_plugin_name,
            &config.password,
            &greeting.auth_plugin_data,
        ) {
            Some(scramble) => (greeting.auth_plugin_name.clone(), scramble),
            None => (
                NATIVE_PASSWORD_PLUGIN.to_string(),
                scramble_for_plugin(
                    NATIVE_PASSWORD_PLUGIN,
                    &config.password,
                    &greeting.auth_plugin_data,
                )
                .unwrap_or_default(),
            ),
        };

        let response = HandshakeResponse {
            capability_flags: caps,
            max_packet_size: 16 * 1024 * 1024,
            character_set: 0x21, // utf8_general_ci
            username: config.user.clone(),
            auth_response,
            database: None,
            auth_plugin_name: plugin,
        };
        framed
            .send(response.encode(greeting_packet.sequence_id.wrapping_add(1)))
            .await
            .map_err(|e| ConnectionError::Io(e.to_string()))?;

        Self::finish_auth(&mut framed, &config.password).await?;
        debug!(addr = %addr, "Authentication successful");

        let now = Instant::now();
        Ok(Self {
            framed,
            state: ConnectionState::Idle,
            created_at: now,
            last_used_at: now,
            server_version: greeting.server_version,
        })
    }

    /// Drive the auth exchange until the server sends OK or ERR
    async fn finish_auth(
        framed: &mut Framed<TcpStream, PacketCodec>,
        password: &str,
    ) -> Result<(), ConnectionError> {
        loop {
            let packet = Self::read_packet(framed).await?;
            match packet.payload.first() {
                Some(0x00) => return Ok(()),
                Some(0xFF) => {
                    let err = server_error(&packet);
                    error!(
                        error_code = err.error_code,
                        error_message = %err.error_message,
                        "Instance authentication failed"
                    );
                    return Err(ConnectionError::Auth(err.error_message));
                }
                Some(0xFE) => {
                    let switch = AuthSwitchRequest::parse(&packet.payload).ok_or_else(|| {
                        ConnectionError::Protocol("Malformed auth switch request".into())
                    })?;
                    debug!(plugin = %switch.plugin_name, "Server requested auth switch");
                    let scramble =
                        scramble_for_plugin(&switch.plugin_name, password, &switch.plugin_data)
                            .ok_or_else(|| {
                                ConnectionError::Auth(format!(
                                    "Unsupported auth plugin {}",
                                    switch.plugin_name
                                ))
                            })?;
                    framed
                        .send(Packet::new(packet.sequence_id.wrapping_add(1), scramble))
                        .await
                        .map_err(|e| ConnectionError::Io(e.to_string()))?;
                }
                // caching_sha2_password: 0x03 fast auth succeeded (OK follows),
                // 0x04 full auth needs TLS or RSA key exchange
                Some(0x01) => match packet.payload.get(1) {
                    Some(0x03) => continue,
                    Some(0x04) => {
                        return Err(ConnectionError::Auth(
                            "caching_sha2_password full authentication is not supported \
                             over plaintext connections"
                                .into(),
                        ))
                    }
                    _ => {
                        return Err(ConnectionError::Protocol(
                            "Unexpected auth more-data packet".into(),
                        ))
                    }
                },
                _ => {
                    return Err(ConnectionError::Protocol(
                        "Unexpected packet during authentication".into(),
                    ))
                }
            }
        }
    }

    async fn read_packet(
        framed: &mut Framed<TcpStream, PacketCodec>,
    ) -> Result<Packet, ConnectionError> {
        framed
            .next()
            .await
            .ok_or(ConnectionError::Disconnected)?
            .map_err(|e| ConnectionError::Io(e.to_string()))
    }

    /// Run a text query and read the whole result set
    pub async fn query(&mut self, sql: &str) -> Result<ResultSet, ConnectionError> {
        if self.state == ConnectionState::Closed {
            return Err(ConnectionError::Disconnected);
        }

        self.state = ConnectionState::InUse;
        self.last_used_at = Instant::now();
        self.send(Packet::command(command::COM_QUERY, sql.as_bytes()))
            .await?;

        let first = self.recv().await?;
        if first.is_err() {
            self.state = ConnectionState::Idle;
            return Err(ConnectionError::Server(server_error(&first)));
        }
        if first.is_ok() {
            self.state = ConnectionState::Idle;
            return Ok(ResultSet::empty());
        }

        let column_count = PayloadReader::new(&first.payload)
            .read_lenenc_int()
            .ok()
            .flatten()
            .ok_or_else(|| self.protocol_error("Invalid column count"))?;
        if column_count == 0 || column_count > MAX_COLUMNS {
            return Err(self.protocol_error(&format!("Column count {} out of range", column_count)));
        }
        let column_count = column_count as usize;

        let mut columns = Vec::with_capacity(column_count);
        for _ in 0..column_count {
            let packet = self.recv().await?;
            let column = ColumnDefinition::parse(&packet.payload)
                .map_err(|e| self.protocol_error(&e.to_string()))?;
            columns.push(column.name);
        }

        let eof = self.recv().await?;
        if !eof.is_eof() {
            return Err(self.protocol_error("Expected EOF after column definitions"));
        }

        let mut rows = Vec::new();
        loop {
            let packet = self.recv().await?;
            if packet.is_eof() {
                break;
            }
            if packet.is_err() {
                self.state = ConnectionState::Idle;
                return Err(ConnectionError::Server(server_error(&packet)));
            }
            let row = parse_text_row(&packet.payload, column_count)
                .map_err(|e| self.protocol_error(&e.to_string()))?;
            rows.push(row);
        }

        self.state = ConnectionState::Idle;
        debug!(sql = %sql, rows = rows.len(), "Query completed");
        Ok(ResultSet::new(columns, rows))
    }

    /// Check if connection is healthy by sending a ping
    pub async fn ping(&mut self) -> bool {
        self.state = ConnectionState::InUse;
        if self
            .send(Packet::command(command::COM_PING, &[]))
            .await
            .is_err()
        {
            return false;
        }

        match self.recv().await {
            Ok(packet) if packet.is_ok() => {
                self.state = ConnectionState::Idle;
                self.last_used_at = Instant::now();
                true
            }
            _ => {
                self.state = ConnectionState::Closed;
                false
            }
        }
    }

    /// Send COM_QUIT; the server closes the socket afterwards
    pub async fn quit(mut self) {
        let _ = self.send(Packet::command(command::COM_QUIT, &[])).await;
        self.state = ConnectionState::Closed;
    }

    /// Check if connection has exceeded max age
    pub fn is_expired(&self, max_age: Duration) -> bool {
        self.created_at.elapsed() > max_age
    }

    /// Check if connection has been idle too long
    pub fn is_idle_too_long(&self, max_idle: Duration) -> bool {
        self.last_used_at.elapsed() > max_idle
    }

    /// Whether the connection can take a new command
    pub fn is_usable(&self) -> bool {
        self.state == ConnectionState::Idle
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn server_version(&self) -> &str {
        &self.server_version
    }

    fn protocol_error(&mut self, message: &str) -> ConnectionError {
        self.state = ConnectionState::Closed;
        ConnectionError::Protocol(message.to_string())
    }

    async fn send(&mut self, packet: Packet) -> Result<(), ConnectionError> {
        self.framed.send(packet).await.map_err(|e| {
            self.state = ConnectionState::Closed;
            ConnectionError::Io(e.to_string())
        })
    }

    async fn recv(&mut self) -> Result<Packet, ConnectionError> {
        match self.framed.next().await {
            Some(Ok(packet)) => Ok(packet),
            Some(Err(e)) => {
                self.state = ConnectionState::Closed;
                Err(ConnectionError::Io(e.to_string()))
            }
            None => {
                self.state = ConnectionState::Closed;
                Err(ConnectionError::Disconnected)
            }
        }
    }
}

#[async_trait]
impl QueryExecutor for MySqlConnection {
    async fn query(&mut self, sql: &str) -> Result<ResultSet, QueryError> {
        MySqlConnection::query(self, sql).await.map_err(Into::into)
    }
}

fn server_error(packet: &Packet) -> ErrPacket {
    ErrPacket::parse(&packet.payload).unwrap_or_else(|| ErrPacket {
        error_code: 2027,
        sql_state: "HY000".to_string(),
        error_message: "Malformed error packet".to_string(),
    })
}

/// Connection errors
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Connection timed out after {0:?}")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Server error {} ({}): {}", .0.error_code, .0.sql_state, .0.error_message)]
    Server(ErrPacket),

    #[error("Connection disconnected")]
    Disconnected,
}

impl From<ConnectionError> for QueryError {
    fn from(err: ConnectionError) -> Self {
        match err {
            ConnectionError::Server(e) => QueryError::Server {
                code: e.error_code,
                sql_state: e.sql_state,
                message: e.error_message,
            },
            ConnectionError::Protocol(message) => QueryError::Protocol(message),
            other => QueryError::Connection(other.to_string()),
        }
    }
}
