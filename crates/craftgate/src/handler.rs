//! Per-connection handler: frame loop and request dispatch.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Wait for the next frame (bounded by the idle timeout)
//!   2. Skin frame → persist the image, no reply
//!   3. Typed frame → decode through the registry → dispatch → reply if
//!      the request kind has a response

use std::sync::Arc;

use craftgate_protocol::{
    Codec, ConfigVersionResponse, Envelope, LaunchConfigurationResponse, LoginRequest,
    LoginResponse, Message, MessageRegistry, ProtocolError, RegistrationRequest,
    RegistrationResponse, User,
};
use craftgate_repository::{RepositoryError, validate_nickname};
use craftgate_transport::{Connection, ConnectionId, Frame, TcpConnection};

use crate::CraftgateError;
use crate::server::ServerState;

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: TcpConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), CraftgateError> {
    let conn_id = conn.id();
    tracing::debug!(%conn_id, peer = %conn.peer_addr(), "handling new connection");

    loop {
        let frame = match tokio::time::timeout(state.idle_timeout, conn.recv()).await {
            Ok(Ok(Some(frame))) => frame,
            Ok(Ok(None)) => {
                tracing::debug!(%conn_id, "connection closed cleanly");
                break;
            }
            Ok(Err(e)) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                return Err(e.into());
            }
            Err(_) => {
                tracing::info!(%conn_id, "connection idle, closing");
                break;
            }
        };

        let outcome = match frame {
            Frame::Skin { nickname, data } => {
                store_skin(&state, conn_id, &nickname, &data).await
            }
            Frame::Message { key, payload } => {
                handle_message(&conn, &state, conn_id, key, &payload).await
            }
        };

        if let Err(e) = outcome {
            tracing::warn!(%conn_id, error = %e, "closing connection");
            // Best effort; the peer may already be gone.
            let _ = conn.close().await;
            return Err(e);
        }
    }

    Ok(())
}

/// Decodes one typed frame, dispatches it and sends the reply, if any.
async fn handle_message<C: Codec>(
    conn: &TcpConnection,
    state: &ServerState<C>,
    conn_id: ConnectionId,
    key: u8,
    payload: &[u8],
) -> Result<(), CraftgateError> {
    let registry = MessageRegistry::global();
    let envelope = Envelope::from_parts(registry, &state.codec, key, payload)?;
    let kind = envelope.kind();
    tracing::debug!(%conn_id, key, %kind, bytes = payload.len(), "request received");

    let Some(reply) = dispatch(state, conn_id, envelope.message).await? else {
        return Ok(());
    };

    let frame = Envelope::new(registry, reply)?.to_frame(&state.codec)?;
    conn.send(&frame).await?;
    tracing::debug!(%conn_id, request = %kind, "response sent");
    Ok(())
}

/// Routes a decoded message. Returns the reply to send back, if any.
async fn dispatch<C: Codec>(
    state: &ServerState<C>,
    conn_id: ConnectionId,
    message: Message,
) -> Result<Option<Message>, CraftgateError> {
    match message {
        Message::RegistrationRequest(req) => {
            Ok(Some(register(state, conn_id, req).await?.into()))
        }
        Message::LoginRequest(req) => Ok(Some(login(state, conn_id, req).await?.into())),
        // Notification only: the client fetches the loader itself and
        // tells the server which build it chose. Nothing is sent back.
        Message::ForgeDownloadRequest(req) => {
            tracing::info!(%conn_id, forge = %req.forge_name, "forge download requested");
            Ok(None)
        }
        Message::LaunchConfigurationRequest(_) => {
            let config = state.repository.get_launch_config().await?;
            Ok(Some(LaunchConfigurationResponse { config }.into()))
        }
        Message::ConfigVersionRequest(_) => {
            let version = state.repository.get_config_version().await?;
            Ok(Some(ConfigVersionResponse { version }.into()))
        }
        other => Err(ProtocolError::InvalidMessage(format!(
            "{} is not something a client may send",
            other.kind()
        ))
        .into()),
    }
}

async fn register<C: Codec>(
    state: &ServerState<C>,
    conn_id: ConnectionId,
    req: RegistrationRequest,
) -> Result<RegistrationResponse, CraftgateError> {
    if req.nickname.trim().is_empty() || req.password.trim().is_empty() {
        return Ok(rejected_registration("nickname and password are required"));
    }
    if let Err(e) = validate_nickname(&req.nickname) {
        return Ok(rejected_registration(&e.to_string()));
    }

    let _registration = state.registration.lock().await;
    if state.repository.user_exists(&req.nickname).await {
        tracing::debug!(%conn_id, nickname = %req.nickname, "nickname taken");
        return Ok(rejected_registration("nickname is already taken"));
    }

    let user = User::new(req.nickname, &req.password, 0);
    state.repository.upsert_user(&user).await?;
    tracing::info!(%conn_id, nickname = %user.nickname, "user registered");

    Ok(RegistrationResponse {
        accepted: true,
        reason: None,
    })
}

fn rejected_registration(reason: &str) -> RegistrationResponse {
    RegistrationResponse {
        accepted: false,
        reason: Some(reason.to_string()),
    }
}

async fn login<C: Codec>(
    state: &ServerState<C>,
    conn_id: ConnectionId,
    req: LoginRequest,
) -> Result<LoginResponse, CraftgateError> {
    let user = match state.repository.get_user(&req.nickname).await {
        Ok(user) => user,
        Err(RepositoryError::NotFound(_) | RepositoryError::InvalidInput(_)) => {
            tracing::debug!(%conn_id, nickname = %req.nickname, "login for unknown user");
            return Ok(rejected_login());
        }
        Err(e) => return Err(e.into()),
    };

    if !user.verify_password(&req.password) {
        tracing::debug!(%conn_id, nickname = %req.nickname, "wrong password");
        return Ok(rejected_login());
    }

    tracing::info!(%conn_id, nickname = %user.nickname, "user logged in");
    Ok(LoginResponse {
        accepted: true,
        profile: Some(user.profile()),
        reason: None,
    })
}

fn rejected_login() -> LoginResponse {
    LoginResponse {
        accepted: false,
        profile: None,
        reason: Some("invalid nickname or password".to_string()),
    }
}

/// Persists an uploaded skin. Uploads for unknown users and images that
/// are not PNGs are dropped; only storage failures end the connection.
async fn store_skin<C: Codec>(
    state: &ServerState<C>,
    conn_id: ConnectionId,
    nickname: &str,
    data: &[u8],
) -> Result<(), CraftgateError> {
    if !state.repository.user_exists(nickname).await {
        tracing::warn!(%conn_id, %nickname, "skin for unknown user dropped");
        return Ok(());
    }

    match state.repository.save_skin(nickname, data).await {
        Ok(path) => {
            tracing::info!(%conn_id, %nickname, path = ?path, "skin stored");
            Ok(())
        }
        Err(RepositoryError::InvalidInput(reason)) => {
            tracing::warn!(%conn_id, %nickname, %reason, "skin rejected");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
