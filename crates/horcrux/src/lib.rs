//! # horcrux
//!
//! threshold recovery of a master secret from independent shard holders.
//!
//! the secret is split into n shards, one per holder. any t of them
//! recombine it; fewer reveal nothing. a holder only releases its shard
//! to a client that proves itself with a one-time code and a signature,
//! and only ever as ciphertext sealed to that client's ephemeral key.
//!
//! ## architecture
//!
//! ```text
//!              ┌──────────────┐
//!              │ master secret│
//!              └──────┬───────┘
//!                     │ shamir over gf(256)
//!       ┌─────────────┼─────────────┐
//!       ▼             ▼             ▼
//!    ┌─────┐       ┌─────┐       ┌─────┐
//!    │ foo │       │ bar │       │ egg │   (3 holders, 2-of-3)
//!    └──┬──┘       └──┬──┘       └──┬──┘
//!       │ totp + ed25519 + x25519 box │
//!       └──────┬──────┴──────┬──────┘
//!              ▼             ▼
//!        first 2 shards, rest cancelled
//!              │
//!              ▼
//!       ┌──────────────┐
//!       │ master secret│
//!       └──────────────┘
//! ```
//!
//! ## security properties
//!
//! - shards never travel in the clear
//! - every request is bound to one holder's name and identifier
//! - responses are signed, so a man in the middle cannot substitute shards
//! - a holder compromise leaks at most one shard
//!
//! ## usage
//!
//! ```rust,ignore
//! use horcrux::{provision, Client, Encoding, HttpTransport};
//!
//! let holders = vec![
//!     ("foo".to_string(), "http://localhost:3001".to_string()),
//!     ("bar".to_string(), "http://localhost:3002".to_string()),
//!     ("egg".to_string(), "http://localhost:3003".to_string()),
//! ];
//! let deployment = provision("hello", Encoding::Utf8, 2, &holders)?;
//!
//! // hand deployment.servers[i] to each holder ...
//!
//! let client = Client::new(deployment.client, HttpTransport::new());
//! let secret = client.recompose_secret().await?;
//! assert_eq!(secret, "hello");
//! ```

pub mod cipher;
pub mod client;
pub mod codec;
pub mod crypto;
pub mod env;
pub mod error;
pub mod handler;
pub mod handshake;
pub mod hash;
pub mod report;
pub mod signature;
pub mod state;
pub mod totp;
pub mod transport;
pub mod tss;

pub use error::{Error, Result};
pub use client::{find_horcruxes, Client, DEFAULT_TIMEOUT};
pub use codec::Encoding;
pub use env::{
    configure_client_environment, configure_handler_environment, decode_state_env,
    encode_state_env, Audience,
};
pub use handler::{Handler, Request, Response};
pub use handshake::{
    generate_request, verify_request_and_generate_response, verify_response, RequestParams,
    ResponseMessage,
};
pub use report::{AttemptReport, AttemptStatus, Report};
pub use state::{
    generate_horcrux, provision, HorcruxList, HorcruxServer, PrivateState, ProtectedState,
    Provisioned, PublicState, StatePair,
};
pub use transport::{Reply, Transport, TransportError};
pub use tss::{combine, split};

#[cfg(feature = "http")]
pub use transport::HttpTransport;
