//! shard holder state and provisioning
//!
//! each holder has two halves generated together:
//! - the client keeps a [`ProtectedState`] (never transmitted)
//! - the holder keeps a [`PrivateState`] (the only place its shard lives)
//!
//! both share the one-time code secret; each side's `verification_key` is
//! the other side's signing public key.

use ed25519_dalek::{SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::codec::{self, Encoding};
use crate::crypto::random_bytes;
use crate::signature::{encode_signing_key, encode_verifying_key, parse_signing_key, parse_verifying_key};
use crate::{totp, tss};
use crate::{Error, Result};

/// identifies one shard holder
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Zeroize)]
pub struct PublicState {
    pub name: String,
    pub identifier: String,
    /// the peer's ed25519 public key, base64url
    #[serde(rename = "ed25519Public")]
    pub verification_key: String,
}

impl PublicState {
    pub fn verifying_key(&self) -> Result<VerifyingKey> {
        parse_verifying_key(&self.verification_key)
    }
}

/// client-held credentials for one holder
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct ProtectedState {
    #[serde(flatten)]
    pub public: PublicState,
    /// shared one-time code secret
    #[serde(rename = "totpSecret")]
    pub totp_secret: String,
    /// own ed25519 secret key, base64url
    #[serde(rename = "ed25519Secret")]
    pub signing_secret: String,
}

impl ProtectedState {
    pub fn name(&self) -> &str {
        &self.public.name
    }

    pub fn identifier(&self) -> &str {
        &self.public.identifier
    }

    pub fn signing_key(&self) -> Result<SigningKey> {
        parse_signing_key(&self.signing_secret)
    }

    pub fn verifying_key(&self) -> Result<VerifyingKey> {
        self.public.verifying_key()
    }
}

impl std::fmt::Debug for ProtectedState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtectedState")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

/// holder-held state, one per process
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct PrivateState {
    #[serde(flatten)]
    pub protected: ProtectedState,
    #[serde(rename = "secretShard")]
    pub secret_shard: String,
}

impl PrivateState {
    pub fn name(&self) -> &str {
        self.protected.name()
    }

    pub fn public(&self) -> &PublicState {
        &self.protected.public
    }
}

impl std::fmt::Debug for PrivateState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateState")
            .field("public", &self.protected.public)
            .finish_non_exhaustive()
    }
}

/// one configured holder, as seen by the client
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HorcruxServer {
    pub url: String,
    pub state: ProtectedState,
}

/// client configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HorcruxList {
    pub num_shards: usize,
    pub threshold: usize,
    pub servers: Vec<HorcruxServer>,
}

impl HorcruxList {
    /// check `1 ≤ threshold ≤ num_shards` and that enough servers are configured
    pub fn validate(&self) -> Result<()> {
        if self.threshold == 0 || self.threshold > self.num_shards {
            return Err(Error::InvalidThreshold {
                threshold: self.threshold,
                num_shards: self.num_shards,
            });
        }
        if self.servers.len() < self.threshold {
            return Err(Error::ConfigurationError {
                have: self.servers.len(),
                need: self.threshold,
            });
        }
        Ok(())
    }

    /// number of failed holders that can still be tolerated
    pub fn fault_tolerance(&self) -> usize {
        self.num_shards.saturating_sub(self.threshold)
    }
}

/// the two halves of one holder
#[derive(Clone, Debug)]
pub struct StatePair {
    pub client_state: ProtectedState,
    pub server_state: PrivateState,
}

/// generate complementary client and holder states around `secret_shard`
///
/// `identifier` defaults to 8 random bytes, base64url
pub fn generate_horcrux(secret_shard: &str, name: &str, identifier: Option<&str>) -> StatePair {
    let client_key = SigningKey::generate(&mut OsRng);
    let server_key = SigningKey::generate(&mut OsRng);
    let totp_secret = totp::new_secret(totp::SECRET_LENGTH);
    let identifier = identifier
        .map(str::to_string)
        .unwrap_or_else(|| codec::b64_encode(&random_bytes::<8>()));

    let server_state = PrivateState {
        protected: ProtectedState {
            public: PublicState {
                name: name.to_string(),
                identifier: identifier.clone(),
                verification_key: encode_verifying_key(&client_key.verifying_key()),
            },
            totp_secret: totp_secret.clone(),
            signing_secret: encode_signing_key(&server_key),
        },
        secret_shard: secret_shard.to_string(),
    };

    let client_state = ProtectedState {
        public: PublicState {
            name: name.to_string(),
            identifier,
            verification_key: encode_verifying_key(&server_key.verifying_key()),
        },
        totp_secret,
        signing_secret: encode_signing_key(&client_key),
    };

    StatePair {
        client_state,
        server_state,
    }
}

/// a complete deployment: client configuration plus one state per holder
#[derive(Clone, Debug)]
pub struct Provisioned {
    pub client: HorcruxList,
    /// holder states, in the same order as `client.servers`
    pub servers: Vec<PrivateState>,
}

/// split `secret` across `holders` (name, url) with the given threshold
pub fn provision(
    secret: &str,
    encoding: Encoding,
    threshold: usize,
    holders: &[(String, String)],
) -> Result<Provisioned> {
    let shards = tss::split(secret, holders.len(), threshold, encoding)?;

    let mut servers = Vec::with_capacity(holders.len());
    let mut states = Vec::with_capacity(holders.len());
    for ((name, url), shard) in holders.iter().zip(shards.iter()) {
        let pair = generate_horcrux(shard, name, None);
        servers.push(HorcruxServer {
            url: url.clone(),
            state: pair.client_state.clone(),
        });
        states.push(pair.server_state.clone());
    }

    Ok(Provisioned {
        client: HorcruxList {
            num_shards: holders.len(),
            threshold,
            servers,
        },
        servers: states,
    })
}
