//! Provides the SASL "PLAIN" mechanism.

use super::non_empty;
use crate::error::{ConfigurationError, Error, MechanismError, PolicyError};
use crate::{Context, Mechanism, Response};

/// A struct for the SASL PLAIN mechanism.
///
/// PLAIN sends the password as is, so it is only attempted over TLS unless
/// the context allows clear text.
#[derive(Debug, Default)]
pub struct Plain;

impl Plain {
    /// Constructs a new struct for authenticating using the SASL PLAIN mechanism.
    pub fn new() -> Plain {
        Plain
    }
}

impl Mechanism for Plain {
    fn possible(&self, context: &Context) -> Result<(), Error> {
        if non_empty(context.username()).is_none() {
            return Err(MechanismError::MissingUsername.into());
        }

        if non_empty(context.password()).is_none() {
            return Err(MechanismError::MissingPassword.into());
        }

        if !context.allow_clear_text() && !context.tls() {
            return Err(PolicyError::ClearTextWithoutTls.into());
        }

        Ok(())
    }

    fn step(&mut self, context: &Context, _input: &[u8]) -> Result<Response, Error> {
        // The context may have changed since possible() was checked.
        let username = non_empty(context.username()).ok_or(ConfigurationError::NoUsername)?;
        let password = non_empty(context.password()).ok_or(ConfigurationError::NoPassword)?;

        let mut auth = Vec::new();
        if let Some(authzid) = non_empty(context.authzid()) {
            auth.extend(authzid.bytes());
        }
        auth.push(0);
        auth.extend(username.bytes());
        auth.push(0);
        auth.extend(password.bytes());
        Ok(Response::Success(auth))
    }
}
