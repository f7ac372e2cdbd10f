//! holder-side request handling, independent of any http framework
//!
//! a server adapter turns its native request into a [`Request`] (any body
//! that fails to parse becomes `None`) and writes back the [`Response`].

use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::handshake::{verify_request_and_generate_response, RequestParams};
use crate::state::{PrivateState, PublicState};
use crate::Error;

#[derive(Clone, Debug)]
pub struct Request {
    pub method: String,
    pub body: Option<RequestParams>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: Value,
}

impl Response {
    fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "error": message.into() }),
        }
    }
}

/// the one shard holder hosted by this process
pub struct Handler {
    state: PrivateState,
}

impl Handler {
    pub fn new(state: PrivateState) -> Self {
        Self { state }
    }

    pub fn name(&self) -> &str {
        self.state.name()
    }

    /// non-secret identity, safe to expose
    pub fn public_state(&self) -> &PublicState {
        self.state.public()
    }

    pub fn handle(&self, request: Request) -> Response {
        if request.method != "POST" {
            return Response::error(405, "Only POST is allowed");
        }

        let params = match request.body {
            Some(params) => params,
            None => return Response::error(400, "Missing request body"),
        };

        match verify_request_and_generate_response(&params, &self.state) {
            Ok(message) => match serde_json::to_value(&message) {
                Ok(body) => {
                    debug!(name = %self.name(), "shard released");
                    Response { status: 200, body }
                }
                Err(e) => Response::error(500, e.to_string()),
            },
            Err(e @ (Error::InvalidCode | Error::InvalidSignature)) => {
                warn!(name = %self.name(), error = %e, "handshake rejected");
                Response::error(403, e.to_string())
            }
            Err(e) => {
                warn!(name = %self.name(), error = %e, "handshake failed");
                Response::error(500, e.to_string())
            }
        }
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler")
            .field("name", &self.name())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handshake::{generate_request, verify_response, ResponseMessage};
    use crate::state::generate_horcrux;

    #[test]
    fn test_wrong_method() {
        let pair = generate_horcrux("shard", "foo", None);
        let handler = Handler::new(pair.server_state);
        for method in ["GET", "PUT", "OPTIONS", "post"] {
            let response = handler.handle(Request {
                method: method.into(),
                body: None,
            });
            assert_eq!(response.status, 405);
            assert_eq!(response.body["error"], "Only POST is allowed");
        }
    }

    #[test]
    fn test_missing_body() {
        let pair = generate_horcrux("shard", "foo", None);
        let handler = Handler::new(pair.server_state);
        let response = handler.handle(Request {
            method: "POST".into(),
            body: None,
        });
        assert_eq!(response.status, 400);
        assert_eq!(response.body["error"], "Missing request body");
    }

    #[test]
    fn test_rejected_handshake() {
        let pair = generate_horcrux("shard", "foo", None);
        let (mut params, _) = generate_request(&pair.client_state).unwrap();
        params.totp = "abcdef".into();

        let handler = Handler::new(pair.server_state);
        let response = handler.handle(Request {
            method: "POST".into(),
            body: Some(params),
        });
        assert_eq!(response.status, 403);
        assert_eq!(response.body["error"], "Invalid TOTP code");
    }

    #[test]
    fn test_bad_signature_is_forbidden() {
        let pair = generate_horcrux("shard", "foo", None);
        let (mut params, _) = generate_request(&pair.client_state).unwrap();
        params.sig = "AAAA".into();

        let handler = Handler::new(pair.server_state);
        let response = handler.handle(Request {
            method: "POST".into(),
            body: Some(params),
        });
        assert_eq!(response.status, 403);
        assert_eq!(response.body["error"], "Invalid signature");
    }

    #[test]
    fn test_shard_released() {
        let pair = generate_horcrux("secret shard", "foo", None);
        let (params, keypair) = generate_request(&pair.client_state).unwrap();

        let handler = Handler::new(pair.server_state.clone());
        let response = handler.handle(Request {
            method: "POST".into(),
            body: Some(params),
        });
        assert_eq!(response.status, 200);

        let message: ResponseMessage = serde_json::from_value(response.body).unwrap();
        let shard = verify_response(&message, &pair.client_state, &keypair).unwrap();
        assert_eq!(shard, "secret shard");
    }

    #[test]
    fn test_debug_hides_state() {
        let pair = generate_horcrux("secret shard", "foo", None);
        let handler = Handler::new(pair.server_state);
        assert!(!format!("{:?}", handler).contains("secret shard"));
        assert_eq!(handler.public_state().name, "foo");
    }
}
