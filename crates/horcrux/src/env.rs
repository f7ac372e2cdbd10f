//! provisioning tokens
//!
//! state is handed to processes as a single opaque string,
//! `v1.<audience>.<id>.<base64url(json)>`, usually through an environment
//! variable. the audience keeps a client token from being loaded by a
//! holder and the other way round.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec;
use crate::state::{HorcruxList, PrivateState};
use crate::{Error, Result};

const VERSION_PREFIX: &str = "v1.";

pub const CLIENT_CONFIG_VAR: &str = "HORCRUX_CLIENT_CONFIG";
pub const SERVER_CONFIG_VAR: &str = "HORCRUX_SERVER_CONFIG";

/// who a token is meant for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Audience {
    Client,
    Server,
}

impl Audience {
    pub fn as_str(&self) -> &'static str {
        match self {
            Audience::Client => "horcrux-client",
            Audience::Server => "horcrux-server",
        }
    }
}

impl fmt::Display for Audience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn encode_state_env<T: Serialize>(state: &T, audience: Audience, id: &str) -> Result<String> {
    let json = serde_json::to_vec(state)?;
    Ok(format!(
        "{}{}.{}.{}",
        VERSION_PREFIX,
        audience,
        id,
        codec::b64_encode(&json)
    ))
}

pub fn decode_state_env<T: DeserializeOwned>(input: &str, audience: Audience) -> Result<T> {
    let rest = input
        .trim()
        .strip_prefix(VERSION_PREFIX)
        .ok_or(Error::UnknownFormat)?;

    let (received, rest) = rest.split_once('.').ok_or(Error::UnknownFormat)?;
    if received != audience.as_str() {
        return Err(Error::InvalidAudience {
            expected: audience.to_string(),
            received: received.to_string(),
        });
    }

    // the id is free-form, the payload never contains a dot
    let (_id, payload) = rest.rsplit_once('.').ok_or(Error::UnknownFormat)?;
    let json = codec::b64_decode(payload)?;
    Ok(serde_json::from_slice(&json)?)
}

fn configure_environment<T, F>(name: &str, audience: Audience, lookup: F) -> Result<T>
where
    T: DeserializeOwned,
    F: Fn(&str) -> Option<String>,
{
    let token = lookup(name)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| Error::MissingEnvironment(name.to_string()))?;
    decode_state_env(&token, audience)
}

/// load the client configuration from `HORCRUX_CLIENT_CONFIG`
pub fn configure_client_environment() -> Result<HorcruxList> {
    configure_client_environment_with(|name| std::env::var(name).ok())
}

pub fn configure_client_environment_with<F>(lookup: F) -> Result<HorcruxList>
where
    F: Fn(&str) -> Option<String>,
{
    configure_environment(CLIENT_CONFIG_VAR, Audience::Client, lookup)
}

/// load the holder state from `HORCRUX_SERVER_CONFIG`
pub fn configure_handler_environment() -> Result<PrivateState> {
    configure_handler_environment_with(|name| std::env::var(name).ok())
}

pub fn configure_handler_environment_with<F>(lookup: F) -> Result<PrivateState>
where
    F: Fn(&str) -> Option<String>,
{
    configure_environment(SERVER_CONFIG_VAR, Audience::Server, lookup)
}
