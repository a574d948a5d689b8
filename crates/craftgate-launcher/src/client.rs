//! Network client for the Craftgate server.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use craftgate_protocol::{
    Codec, ConfigVersionRequest, ConfigurationVersion, ForgeDownloadRequest, JsonCodec,
    LaunchConfiguration, LaunchConfigurationRequest, LoginRequest, LoginResponse, Message,
    MessageKind, RegistrationRequest, RegistrationResponse, decode_frame, encode_message,
};
use craftgate_transport::{Connection, Frame, FrameLimits, TcpConnection};
use tokio::sync::Mutex;

use crate::LauncherError;

/// One connection to the server, used request by request.
///
/// Requests on one client are answered in order; the client never has
/// more than one request in flight at a time. Concurrent callers queue on
/// the exchange lock.
///
/// Dropping a request future (a timeout, a `select!` on cancellation)
/// before its reply arrives leaves that reply on the socket. The client
/// notices on its next use, closes the connection and returns
/// [`LauncherError::Desynchronized`].
pub struct LauncherClient<C = JsonCodec> {
    conn: TcpConnection,
    codec: C,
    /// Held from the first byte sent until the reply is read.
    exchange: Mutex<()>,
    /// Set while an exchange is underway; still set afterwards only if
    /// that exchange was abandoned.
    in_exchange: AtomicBool,
}

impl LauncherClient<JsonCodec> {
    /// Connects with default frame limits and the JSON codec.
    pub async fn connect(addr: &str) -> Result<Self, LauncherError> {
        Self::connect_with(addr, FrameLimits::default(), JsonCodec).await
    }
}

impl<C: Codec> LauncherClient<C> {
    pub async fn connect_with(
        addr: &str,
        limits: FrameLimits,
        codec: C,
    ) -> Result<Self, LauncherError> {
        let conn = TcpConnection::connect(addr, limits).await?;
        tracing::debug!(conn_id = %conn.id(), addr, "connected to server");
        Ok(Self {
            conn,
            codec,
            exchange: Mutex::new(()),
            in_exchange: AtomicBool::new(false),
        })
    }

    /// Asks the server to create an account. A refusal is not an error:
    /// check `accepted` and `reason`.
    pub async fn register(
        &self,
        nickname: &str,
        password: &str,
    ) -> Result<RegistrationResponse, LauncherError> {
        let request = RegistrationRequest {
            nickname: nickname.to_string(),
            password: password.to_string(),
        };
        match self.call(request.into()).await? {
            Message::RegistrationResponse(response) => Ok(response),
            other => Err(unexpected(MessageKind::RegistrationResponse, &other)),
        }
    }

    /// Logs in. On success the response carries the user's profile.
    pub async fn login(
        &self,
        nickname: &str,
        password: &str,
    ) -> Result<LoginResponse, LauncherError> {
        let request = LoginRequest {
            nickname: nickname.to_string(),
            password: password.to_string(),
        };
        match self.call(request.into()).await? {
            Message::LoginResponse(response) => Ok(response),
            other => Err(unexpected(MessageKind::LoginResponse, &other)),
        }
    }

    pub async fn fetch_launch_configuration(&self) -> Result<LaunchConfiguration, LauncherError> {
        match self.call(LaunchConfigurationRequest {}.into()).await? {
            Message::LaunchConfigurationResponse(response) => Ok(response.config),
            other => Err(unexpected(MessageKind::LaunchConfigurationResponse, &other)),
        }
    }

    pub async fn fetch_config_version(&self) -> Result<ConfigurationVersion, LauncherError> {
        match self.call(ConfigVersionRequest {}.into()).await? {
            Message::ConfigVersionResponse(response) => Ok(response.version),
            other => Err(unexpected(MessageKind::ConfigVersionResponse, &other)),
        }
    }

    /// Tells the server which loader build this client is fetching.
    /// One-way: the server does not answer.
    pub async fn request_forge_download(&self, forge_name: &str) -> Result<(), LauncherError> {
        let request = ForgeDownloadRequest {
            forge_name: forge_name.to_string(),
        };
        let _exchange = self.begin().await?;
        self.send(request.into()).await?;
        self.finish();
        Ok(())
    }

    /// Uploads a PNG skin for `nickname` over the side channel. One-way.
    pub async fn upload_skin(&self, nickname: &str, data: Vec<u8>) -> Result<(), LauncherError> {
        let bytes = data.len();
        let _exchange = self.begin().await?;
        self.conn
            .send(&Frame::Skin {
                nickname: nickname.to_string(),
                data,
            })
            .await?;
        self.finish();
        tracing::debug!(%nickname, bytes, "skin uploaded");
        Ok(())
    }

    /// Reads a PNG from disk and uploads it.
    pub async fn upload_skin_file(
        &self,
        nickname: &str,
        path: impl AsRef<Path>,
    ) -> Result<(), LauncherError> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await.map_err(|source| LauncherError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.upload_skin(nickname, data).await
    }

    /// Closes the connection.
    pub async fn close(&self) -> Result<(), LauncherError> {
        self.conn.close().await?;
        Ok(())
    }

    async fn send(&self, message: Message) -> Result<(), LauncherError> {
        let kind = message.kind();
        let frame = encode_message(&self.codec, message)?;
        self.conn.send(&frame).await?;
        tracing::debug!(conn_id = %self.conn.id(), %kind, "request sent");
        Ok(())
    }

    /// Sends a request and waits for exactly one answer.
    async fn call(&self, message: Message) -> Result<Message, LauncherError> {
        let kind = message.kind();
        let _exchange = self.begin().await?;
        self.send(message).await?;

        let frame = self
            .conn
            .recv()
            .await?
            .ok_or(LauncherError::NoResponse(kind))?;
        self.finish();
        let response = decode_frame(&self.codec, &frame)?;
        tracing::debug!(conn_id = %self.conn.id(), kind = %response.kind(), "response received");
        Ok(response)
    }
}

impl<C> LauncherClient<C> {
    /// Takes the exchange lock and marks the connection busy. Fails if a
    /// previous exchange never reached [`finish`](Self::finish).
    async fn begin(&self) -> Result<tokio::sync::MutexGuard<'_, ()>, LauncherError> {
        let guard = self.exchange.lock().await;
        if self.in_exchange.swap(true, Ordering::AcqRel) {
            tracing::warn!(conn_id = %self.conn.id(), "abandoned exchange, closing connection");
            let _ = self.conn.close().await;
            return Err(LauncherError::Desynchronized);
        }
        Ok(guard)
    }

    fn finish(&self) {
        self.in_exchange.store(false, Ordering::Release);
    }
}

fn unexpected(expected: MessageKind, actual: &Message) -> LauncherError {
    LauncherError::UnexpectedResponse {
        expected,
        actual: actual.kind(),
    }
}
