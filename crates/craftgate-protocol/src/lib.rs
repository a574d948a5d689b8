//! Wire protocol for Craftgate.
//!
//! - **Records** ([`User`], [`LaunchConfiguration`], [`ConfigurationVersion`])
//!   shared by the server, the repository and the launcher.
//! - **Messages** ([`Message`], [`MessageKind`] and one payload struct per
//!   kind) exchanged in typed frames.
//! - **Registry** ([`MessageRegistry`]): the validated, immutable
//!   key ↔ kind table.
//! - **Envelope** ([`Envelope`]): a message plus its header key, and the
//!   conversions to and from transport [`Frame`](craftgate_transport::Frame)s.
//! - **Codec** ([`Codec`], [`JsonCodec`]): how payloads become bytes.
//!
//! ```text
//! Transport (frames) → Protocol (Envelope / Message) → Server handler
//! ```

mod codec;
mod envelope;
mod error;
mod messages;
mod registry;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use craftgate_transport::MessageHeader;
pub use envelope::{Envelope, decode_frame, encode_message};
pub use error::ProtocolError;
pub use messages::{
    ConfigVersionRequest, ConfigVersionResponse, ForgeDownloadRequest,
    LaunchConfigurationRequest, LaunchConfigurationResponse, LoginRequest, LoginResponse,
    Message, MessageKind, RegistrationRequest, RegistrationResponse,
};
pub use registry::{Constructor, MessageRegistry, RegistryEntry, standard_entries};
pub use types::{
    ConfigurationVersion, LaunchConfiguration, PasswordDigest, User, UserProfile,
};
