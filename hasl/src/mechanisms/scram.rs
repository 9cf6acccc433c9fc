//! Provides the SASL "SCRAM-*" mechanisms and a way to implement more.

use std::marker::PhantomData;

use base64::{engine::general_purpose::STANDARD as Base64, Engine};

use crate::common::scram::{generate_nonce, ScramProvider};
use super::non_empty;
use crate::common::{escape_saslname, parse_frame, xor};
use crate::error::{ConfigurationError, Error, MechanismError};
use crate::{Context, Mechanism, Response};

// No channel binding, so the gs2 header is always the same.
const GS2_HEADER: &[u8] = b"n,,";

enum ScramState {
    Init,
    SentInitialMessage {
        client_nonce: String,
        initial_message: Vec<u8>,
    },
    GotServerData {
        server_signature: Vec<u8>,
    },
    Done,
}

/// A struct for the SASL SCRAM-* mechanisms.
///
/// This takes three steps: the client first message, the answer to the
/// server challenge, and the verification of the server signature. Only the
/// last one returns [`Response::Success`].
pub struct Scram<S: ScramProvider> {
    nonce: Option<String>,
    state: ScramState,
    _marker: PhantomData<S>,
}

impl<S: ScramProvider> Default for Scram<S> {
    fn default() -> Scram<S> {
        Scram::new()
    }
}

impl<S: ScramProvider> Scram<S> {
    /// Constructs a new struct for authenticating using the SASL SCRAM-*
    /// mechanisms. The nonce is generated on the first step.
    pub fn new() -> Scram<S> {
        Scram {
            nonce: None,
            state: ScramState::Init,
            _marker: PhantomData,
        }
    }

    // Used for testing.
    #[doc(hidden)]
    pub fn new_with_nonce(nonce: String) -> Scram<S> {
        Scram {
            nonce: Some(nonce),
            ..Scram::new()
        }
    }

    /// The name of the mechanism, e.g. `SCRAM-SHA-256`.
    pub fn name() -> String {
        format!("SCRAM-{}", S::name())
    }

    fn credentials(context: &Context) -> Result<(&str, &str), Error> {
        let username = non_empty(context.username()).ok_or(ConfigurationError::NoUsername)?;
        let password = non_empty(context.password()).ok_or(ConfigurationError::NoPassword)?;
        Ok((username, password))
    }

    fn initial(&mut self, context: &Context) -> Result<Vec<u8>, Error> {
        let (username, _) = Self::credentials(context)?;
        let client_nonce = match self.nonce.take() {
            Some(nonce) => nonce,
            None => generate_nonce()?,
        };

        // TODO: SASLprep the username before sending it.
        let mut bare = Vec::new();
        bare.extend(b"n=");
        bare.extend(escape_saslname(username).bytes());
        bare.extend(b",r=");
        bare.extend(client_nonce.bytes());

        let mut data = Vec::new();
        data.extend(GS2_HEADER);
        data.extend(&bare);

        self.state = ScramState::SentInitialMessage {
            client_nonce,
            initial_message: bare,
        };
        Ok(data)
    }

    fn response(
        context: &Context,
        client_nonce: &str,
        initial_message: &[u8],
        challenge: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>), Error> {
        let (_, password) = Self::credentials(context)?;

        let frame = parse_frame(challenge).map_err(|_| MechanismError::CannotDecodeChallenge)?;
        let server_nonce = frame.get("r").ok_or(MechanismError::NoServerNonce)?;
        // The server must append its own part to our nonce.
        if server_nonce.len() <= client_nonce.len() || !server_nonce.starts_with(client_nonce) {
            return Err(MechanismError::InvalidServerNonce.into());
        }
        let salt = frame
            .get("s")
            .and_then(|v| Base64.decode(v).ok())
            .ok_or(MechanismError::NoServerSalt)?;
        let iterations = frame
            .get("i")
            .and_then(|v| v.parse().ok())
            .filter(|&i: &u32| i > 0)
            .ok_or(MechanismError::NoServerIterations)?;

        let mut client_final_message_bare = Vec::new();
        client_final_message_bare.extend(b"c=");
        client_final_message_bare.extend(Base64.encode(GS2_HEADER).bytes());
        client_final_message_bare.extend(b",r=");
        client_final_message_bare.extend(server_nonce.bytes());

        let salted_password = S::derive(password, &salt, iterations)?;
        let client_key = S::hmac(b"Client Key", &salted_password)?;
        let server_key = S::hmac(b"Server Key", &salted_password)?;

        let mut auth_message = Vec::new();
        auth_message.extend(initial_message);
        auth_message.push(b',');
        auth_message.extend(challenge);
        auth_message.push(b',');
        auth_message.extend(&client_final_message_bare);

        let stored_key = S::hash(&client_key);
        let client_signature = S::hmac(&auth_message, &stored_key)?;
        let client_proof = xor(&client_key, &client_signature);
        let server_signature = S::hmac(&auth_message, &server_key)?;

        let mut client_final_message = Vec::new();
        client_final_message.extend(&client_final_message_bare);
        client_final_message.extend(b",p=");
        client_final_message.extend(Base64.encode(client_proof).bytes());

        Ok((client_final_message, server_signature))
    }

    fn success(server_signature: &[u8], data: &[u8]) -> Result<(), Error> {
        let frame = parse_frame(data).map_err(|_| MechanismError::CannotDecodeSuccessResponse)?;
        if let Some(err) = frame.get("e") {
            return Err(MechanismError::ServerError(err.to_owned()).into());
        }
        let sig = frame
            .get("v")
            .and_then(|v| Base64.decode(v).ok())
            .ok_or(MechanismError::NoSignatureInSuccessResponse)?;
        if sig == server_signature {
            Ok(())
        } else {
            Err(MechanismError::InvalidSignatureInSuccessResponse.into())
        }
    }
}

impl<S: ScramProvider> Mechanism for Scram<S> {
    fn possible(&self, context: &Context) -> Result<(), Error> {
        if non_empty(context.username()).is_none() {
            return Err(MechanismError::MissingUsername.into());
        }
        if non_empty(context.password()).is_none() {
            return Err(MechanismError::MissingPassword.into());
        }
        Ok(())
    }

    fn step(&mut self, context: &Context, input: &[u8]) -> Result<Response, Error> {
        // Any failure ends the exchange.
        let state = std::mem::replace(&mut self.state, ScramState::Done);
        match state {
            ScramState::Init => Ok(Response::Continue(self.initial(context)?)),
            ScramState::SentInitialMessage {
                client_nonce,
                initial_message,
            } => {
                let (data, server_signature) =
                    Self::response(context, &client_nonce, &initial_message, input)?;
                self.state = ScramState::GotServerData { server_signature };
                Ok(Response::Continue(data))
            }
            ScramState::GotServerData { server_signature } => {
                Self::success(&server_signature, input)?;
                Ok(Response::Success(Vec::new()))
            }
            ScramState::Done => Err(MechanismError::InvalidState.into()),
        }
    }
}
