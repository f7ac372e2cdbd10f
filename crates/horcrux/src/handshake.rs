//! three-message handshake between the client and one shard holder
//!
//! ```text
//! client                                   holder
//!   │ generate_request                       │
//!   │   fresh x25519 keypair                 │
//!   │   code = totp(shared secret)           │
//!   │   sig  = sign(name‖id‖pub‖code)        │
//!   │ ── RequestParams {totp, sig, pub} ───▶ │
//!   │                                        │ check code, then sig
//!   │                                        │ message = box(shard → pub)
//!   │ ◀── ResponseMessage {message, sig} ─── │ sig = sign(message)
//!   │ verify_response                        │
//!   │   check sig, then open box             │
//! ```
//!
//! `name` and `identifier` are bound into every signed hash so a captured
//! request cannot be replayed against another holder.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cipher::{self, BoxKeyPair};
use crate::codec::Encoding;
use crate::signature;
use crate::state::{PrivateState, ProtectedState, PublicState};
use crate::totp;
use crate::{Error, Result};

/// client → holder, single use
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestParams {
    pub totp: String,
    pub sig: String,
    /// ephemeral x25519 public key the shard is encrypted to
    #[serde(rename = "pub")]
    pub public_key: String,
}

/// holder → client, single use
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMessage {
    /// shard ciphertext, base64url
    pub message: String,
    pub sig: String,
}

/// the string both sides sign and verify for a request
fn request_message(public: &PublicState, box_public: &str, code: &str) -> String {
    let mut message = String::with_capacity(
        public.name.len() + public.identifier.len() + box_public.len() + code.len(),
    );
    message.push_str(&public.name);
    message.push_str(&public.identifier);
    message.push_str(box_public);
    message.push_str(code);
    message
}

/// build request params for one attempt
///
/// the returned keypair must be kept to open the response
pub fn generate_request(state: &ProtectedState) -> Result<(RequestParams, BoxKeyPair)> {
    let keypair = BoxKeyPair::generate();
    let box_public = keypair.public_b64();
    let code = totp::generate_code(&state.totp_secret)?;

    let message = request_message(&state.public, &box_public, &code);
    let sig = signature::sign(&message, Encoding::Utf8, &state.signing_key()?)?;

    Ok((
        RequestParams {
            totp: code,
            sig,
            public_key: box_public,
        },
        keypair,
    ))
}

/// holder side: authenticate the request and seal the shard to the caller
///
/// the code is checked before the signature
pub fn verify_request_and_generate_response(
    params: &RequestParams,
    state: &PrivateState,
) -> Result<ResponseMessage> {
    let protected = &state.protected;

    totp::verify_code(&params.totp, &protected.totp_secret)?;

    let message = request_message(&protected.public, &params.public_key, &params.totp);
    signature::verify(&message, &params.sig, &protected.verifying_key()?, Encoding::Utf8)?;
    debug!(name = %protected.name(), "request authenticated");

    let recipient = cipher::parse_public_key(&params.public_key)?;
    let ciphertext = cipher::encrypt(state.secret_shard.as_bytes(), &recipient)?;
    let sig = signature::sign(&ciphertext, Encoding::Utf8, &protected.signing_key()?)?;

    Ok(ResponseMessage {
        message: ciphertext,
        sig,
    })
}

/// client side: authenticate the response, then open it
pub fn verify_response(
    response: &ResponseMessage,
    state: &ProtectedState,
    keypair: &BoxKeyPair,
) -> Result<String> {
    signature::verify(
        &response.message,
        &response.sig,
        &state.verifying_key()?,
        Encoding::Utf8,
    )?;

    let shard = cipher::decrypt(&response.message, &keypair.secret)?;
    String::from_utf8(shard).map_err(|_| Error::DecryptionFailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;
    use crate::state::generate_horcrux;

    #[test]
    fn test_full_handshake() {
        let pair = generate_horcrux("secret shard", "foo", Some("bar"));

        let (params, keypair) = generate_request(&pair.client_state).unwrap();
        let response = verify_request_and_generate_response(&params, &pair.server_state).unwrap();
        let shard = verify_response(&response, &pair.client_state, &keypair).unwrap();

        assert_eq!(shard, "secret shard");
    }

    #[test]
    fn test_wire_field_names() {
        let pair = generate_horcrux("shard", "foo", None);
        let (params, _) = generate_request(&pair.client_state).unwrap();
        let json = serde_json::to_value(&params).unwrap();
        assert!(json.get("totp").is_some());
        assert!(json.get("sig").is_some());
        assert!(json.get("pub").is_some());
        assert_eq!(params.totp.len(), 6);
    }

    #[test]
    fn test_wrong_code_rejected() {
        let pair = generate_horcrux("shard", "foo", None);
        let (mut params, _) = generate_request(&pair.client_state).unwrap();
        // outside the 6-digit alphabet, can never collide with a real window
        params.totp = "00000a".into();
        assert!(matches!(
            verify_request_and_generate_response(&params, &pair.server_state),
            Err(Error::InvalidCode)
        ));
    }

    #[test]
    fn test_mismatched_totp_secret_rejected() {
        let pair = generate_horcrux("shard", "foo", None);
        let mut client = pair.client_state.clone();
        client.totp_secret = totp::new_secret(totp::SECRET_LENGTH);

        // a foreign secret only matches one of the three accepted windows by chance
        let (params, _) = generate_request(&client).unwrap();
        assert!(matches!(
            verify_request_and_generate_response(&params, &pair.server_state),
            Err(Error::InvalidCode)
        ));
    }

    #[test]
    fn test_wrong_signing_key_rejected() {
        let pair = generate_horcrux("shard", "foo", None);
        let other = generate_horcrux("shard", "foo", None);

        let mut impostor = pair.client_state.clone();
        impostor.signing_secret = other.client_state.signing_secret.clone();

        let (params, _) = generate_request(&impostor).unwrap();
        assert!(matches!(
            verify_request_and_generate_response(&params, &pair.server_state),
            Err(Error::InvalidSignature)
        ));
    }

    #[test]
    fn test_request_bound_to_holder_name() {
        let pair = generate_horcrux("shard", "foo", Some("bar"));
        let mut renamed = pair.client_state.clone();
        renamed.public.name = "egg".into();

        let (params, _) = generate_request(&renamed).unwrap();
        assert!(matches!(
            verify_request_and_generate_response(&params, &pair.server_state),
            Err(Error::InvalidSignature)
        ));
    }

    #[test]
    fn test_swapped_public_key_rejected() {
        let pair = generate_horcrux("shard", "foo", None);
        let (mut params, _) = generate_request(&pair.client_state).unwrap();
        params.public_key = BoxKeyPair::generate().public_b64();
        assert!(matches!(
            verify_request_and_generate_response(&params, &pair.server_state),
            Err(Error::InvalidSignature)
        ));
    }

    #[test]
    fn test_forged_response_rejected() {
        let pair = generate_horcrux("shard", "foo", None);
        let impostor = generate_horcrux("evil shard", "foo", None);

        let (params, keypair) = generate_request(&pair.client_state).unwrap();
        let recipient = cipher::parse_public_key(&params.public_key).unwrap();
        let message = cipher::encrypt(b"evil shard", &recipient).unwrap();
        let sig = signature::sign(
            &message,
            Encoding::Utf8,
            &impostor.server_state.protected.signing_key().unwrap(),
        )
        .unwrap();

        let forged = ResponseMessage { message, sig };
        assert!(matches!(
            verify_response(&forged, &pair.client_state, &keypair),
            Err(Error::InvalidSignature)
        ));
    }

    #[test]
    fn test_response_for_other_keypair_fails_to_decrypt() {
        let pair = generate_horcrux("shard", "foo", None);
        let (params, _) = generate_request(&pair.client_state).unwrap();
        let response = verify_request_and_generate_response(&params, &pair.server_state).unwrap();

        let stranger = BoxKeyPair::generate();
        assert!(matches!(
            verify_response(&response, &pair.client_state, &stranger),
            Err(Error::DecryptionFailed)
        ));
    }

    #[test]
    fn test_tampered_message_rejected() {
        let pair = generate_horcrux("shard", "foo", None);
        let (params, keypair) = generate_request(&pair.client_state).unwrap();
        let mut response =
            verify_request_and_generate_response(&params, &pair.server_state).unwrap();

        let mut bytes = codec::b64_decode(&response.message).unwrap();
        bytes[40] ^= 1;
        response.message = codec::b64_encode(&bytes);

        assert!(matches!(
            verify_response(&response, &pair.client_state, &keypair),
            Err(Error::InvalidSignature)
        ));
    }
}
