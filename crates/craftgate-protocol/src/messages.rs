//! The message family that travels inside typed frames.
//!
//! Each message kind owns one payload struct. [`Message`] is the closed
//! sum of all of them and [`MessageKind`] names a variant without
//! carrying data, which is what the registry maps keys to.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Codec, ConfigurationVersion, LaunchConfiguration, ProtocolError, UserProfile};

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// Client → Server: create an account.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub nickname: String,
    pub password: String,
}

/// Server → Client: outcome of a registration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RegistrationResponse {
    pub accepted: bool,
    /// Why the registration was refused; `None` when accepted.
    pub reason: Option<String>,
}

/// Client → Server: log in with an existing account.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LoginRequest {
    pub nickname: String,
    pub password: String,
}

/// Server → Client: outcome of a login.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LoginResponse {
    pub accepted: bool,
    /// Present only when `accepted`.
    pub profile: Option<UserProfile>,
    pub reason: Option<String>,
}

/// Client → Server: the client is about to install this mod-loader build.
///
/// One-way; the server does not answer it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ForgeDownloadRequest {
    pub forge_name: String,
}

/// Client → Server: send me the launch configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LaunchConfigurationRequest {}

/// Server → Client: the current launch configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LaunchConfigurationResponse {
    pub config: LaunchConfiguration,
}

/// Client → Server: send me the configuration version stamp.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConfigVersionRequest {}

/// Server → Client: the current configuration version stamp.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConfigVersionResponse {
    pub version: ConfigurationVersion,
}

// ---------------------------------------------------------------------------
// Message / MessageKind
// ---------------------------------------------------------------------------

// Generates the `Message` enum, the data-less `MessageKind` mirror, the
// `From<Payload> for Message` impls, and the per-variant codec dispatch.
// Listing each payload once keeps the three in lockstep.
macro_rules! message_family {
    ($($variant:ident),+ $(,)?) => {
        /// Any message that can travel in a typed frame.
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub enum Message {
            $($variant($variant),)+
        }

        /// Identifies a message variant without its data.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum MessageKind {
            $($variant,)+
        }

        impl MessageKind {
            /// Every kind, in declaration order.
            pub const ALL: &'static [MessageKind] = &[$(MessageKind::$variant,)+];

            /// The Rust type name of the payload, for diagnostics.
            pub fn name(self) -> &'static str {
                match self {
                    $(MessageKind::$variant => stringify!($variant),)+
                }
            }
        }

        impl Message {
            /// Which variant this is.
            pub fn kind(&self) -> MessageKind {
                match self {
                    $(Message::$variant(_) => MessageKind::$variant,)+
                }
            }

            /// Serializes only the payload; the key travels in the header.
            pub fn encode_payload<C: Codec>(&self, codec: &C) -> Result<Vec<u8>, ProtocolError> {
                match self {
                    $(Message::$variant(inner) => codec.encode(inner),)+
                }
            }

            /// Decodes `data` as a payload of the same kind as `self`.
            ///
            /// `self` is normally the default instance the registry built
            /// for the header key; its fields are replaced wholesale.
            pub fn decode_payload<C: Codec>(
                self,
                codec: &C,
                data: &[u8],
            ) -> Result<Message, ProtocolError> {
                match self {
                    $(Message::$variant(_) => Ok(Message::$variant(codec.decode(data)?)),)+
                }
            }
        }

        $(
            impl From<$variant> for Message {
                fn from(payload: $variant) -> Self {
                    Message::$variant(payload)
                }
            }
        )+
    };
}

message_family! {
    RegistrationRequest,
    RegistrationResponse,
    LoginRequest,
    LoginResponse,
    ForgeDownloadRequest,
    LaunchConfigurationRequest,
    LaunchConfigurationResponse,
    ConfigVersionRequest,
    ConfigVersionResponse,
}

impl MessageKind {
    /// The kind a peer answers this request with, if any.
    ///
    /// `None` for responses and for one-way requests.
    pub fn response_kind(self) -> Option<MessageKind> {
        match self {
            MessageKind::RegistrationRequest => Some(MessageKind::RegistrationResponse),
            MessageKind::LoginRequest => Some(MessageKind::LoginResponse),
            MessageKind::LaunchConfigurationRequest => {
                Some(MessageKind::LaunchConfigurationResponse)
            }
            MessageKind::ConfigVersionRequest => Some(MessageKind::ConfigVersionResponse),
            _ => None,
        }
    }

    /// Returns `true` for kinds a client sends to the server.
    pub fn is_request(self) -> bool {
        matches!(
            self,
            MessageKind::RegistrationRequest
                | MessageKind::LoginRequest
                | MessageKind::ForgeDownloadRequest
                | MessageKind::LaunchConfigurationRequest
                | MessageKind::ConfigVersionRequest
        )
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Message {
    /// The Rust type name of the payload, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.kind().name()
    }
}
