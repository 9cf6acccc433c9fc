//! Provides the SASL "EXTERNAL" mechanism.

use crate::error::Error;
use crate::{Context, Mechanism, Response};

/// A struct for the SASL EXTERNAL mechanism.
///
/// Authentication happens outside of SASL, usually with a TLS client
/// certificate, so the only thing sent is the optional authorization identity.
#[derive(Debug, Default)]
pub struct External;

impl External {
    /// Constructs a new struct for authenticating using the SASL EXTERNAL mechanism.
    pub fn new() -> External {
        External
    }
}

impl Mechanism for External {
    fn step(&mut self, context: &Context, _input: &[u8]) -> Result<Response, Error> {
        let data = context
            .authzid()
            .map(|authzid| authzid.as_bytes().to_vec())
            .unwrap_or_default();
        Ok(Response::Success(data))
    }
}
