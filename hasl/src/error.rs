//! Error types returned by the negotiation engine and its mechanisms.

use std::error::Error as StdError;
use std::fmt;

/// The caller passed an invalid configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// The allowed mechanisms list was empty.
    EmptyMechanismList,
    /// A mechanism was registered with an empty name.
    EmptyMechanismName,
    /// A mechanism needed a username at step time and none was set.
    NoUsername,
    /// A mechanism needed a password at step time and none was set.
    NoPassword,
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(
            fmt,
            "{}",
            match self {
                ConfigurationError::EmptyMechanismList => "allowed mechanisms must not be empty",
                ConfigurationError::EmptyMechanismName => "mechanism name must not be empty",
                ConfigurationError::NoUsername => "no username provided",
                ConfigurationError::NoPassword => "no password provided",
            }
        )
    }
}

impl StdError for ConfigurationError {}

/// A mechanism would work, but the security policy of the context forbids it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    /// Credentials would be sent in the clear over a connection without TLS.
    ClearTextWithoutTls,
}

impl fmt::Display for PolicyError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PolicyError::ClearTextWithoutTls => {
                write!(fmt, "plain text is not allowed without TLS")
            }
        }
    }
}

impl StdError for PolicyError {}

/// The engine was driven out of sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// `step` was called while no mechanism was selected.
    NoCurrentMechanism,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ProtocolError::NoCurrentMechanism => {
                write!(fmt, "no active mechanism, current mechanism is absent")
            }
        }
    }
}

impl StdError for ProtocolError {}

/// A failure specific to one mechanism.
#[derive(Debug, PartialEq)]
pub enum MechanismError {
    /// The mechanism needs a username.
    MissingUsername,
    /// The mechanism needs a password.
    MissingPassword,

    /// Free-form failure, for mechanisms implemented outside of this crate.
    Other(String),

    /// The random source failed while building a nonce.
    #[cfg(feature = "scram")]
    RandomFailure(getrandom::Error),

    /// The server challenge wasn't a valid attribute list.
    CannotDecodeChallenge,
    /// The server challenge lacks a nonce.
    NoServerNonce,
    /// The server nonce doesn't extend the client nonce.
    InvalidServerNonce,
    /// The server challenge lacks a salt.
    NoServerSalt,
    /// The server challenge lacks an iteration count.
    NoServerIterations,
    /// Key derivation was given a key of the wrong size.
    #[cfg(feature = "scram")]
    InvalidKeyLength(hmac::digest::InvalidLength),
    /// The mechanism received input it didn't expect at this point.
    InvalidState,

    /// The server final message wasn't a valid attribute list.
    CannotDecodeSuccessResponse,
    /// The server signature doesn't match the one we computed.
    InvalidSignatureInSuccessResponse,
    /// The server final message carries no signature.
    NoSignatureInSuccessResponse,
    /// The server reported an error in its final message.
    ServerError(String),
}

#[cfg(feature = "scram")]
impl From<getrandom::Error> for MechanismError {
    fn from(err: getrandom::Error) -> MechanismError {
        MechanismError::RandomFailure(err)
    }
}

#[cfg(feature = "scram")]
impl From<hmac::digest::InvalidLength> for MechanismError {
    fn from(err: hmac::digest::InvalidLength) -> MechanismError {
        MechanismError::InvalidKeyLength(err)
    }
}

impl fmt::Display for MechanismError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MechanismError::MissingUsername => write!(fmt, "missing username"),
            MechanismError::MissingPassword => write!(fmt, "missing password"),

            MechanismError::Other(msg) => write!(fmt, "{}", msg),

            #[cfg(feature = "scram")]
            MechanismError::RandomFailure(err) => {
                write!(fmt, "failure to get random data: {}", err)
            }

            MechanismError::CannotDecodeChallenge => write!(fmt, "can't decode challenge"),
            MechanismError::NoServerNonce => write!(fmt, "no server nonce"),
            MechanismError::InvalidServerNonce => {
                write!(fmt, "server nonce doesn't start with the client nonce")
            }
            MechanismError::NoServerSalt => write!(fmt, "no server salt"),
            MechanismError::NoServerIterations => write!(fmt, "no server iterations"),
            #[cfg(feature = "scram")]
            MechanismError::InvalidKeyLength(err) => write!(fmt, "invalid key length: {}", err),
            MechanismError::InvalidState => {
                write!(fmt, "not in the right state to receive this response")
            }

            MechanismError::CannotDecodeSuccessResponse => {
                write!(fmt, "can't decode success response")
            }
            MechanismError::InvalidSignatureInSuccessResponse => {
                write!(fmt, "invalid signature in success response")
            }
            MechanismError::NoSignatureInSuccessResponse => {
                write!(fmt, "no signature in success response")
            }
            MechanismError::ServerError(err) => write!(fmt, "server error: {}", err),
        }
    }
}

impl StdError for MechanismError {}

/// Umbrella error for everything that can go wrong during a negotiation.
#[derive(Debug, PartialEq)]
pub enum Error {
    /// Invalid or missing configuration.
    Configuration(ConfigurationError),
    /// Disallowed by the security policy.
    Policy(PolicyError),
    /// Engine used out of sequence.
    Protocol(ProtocolError),
    /// Mechanism-specific failure.
    Mechanism(MechanismError),
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Configuration(e) => write!(fmt, "configuration error: {}", e),
            Error::Policy(e) => write!(fmt, "policy error: {}", e),
            Error::Protocol(e) => write!(fmt, "protocol error: {}", e),
            Error::Mechanism(e) => write!(fmt, "mechanism error: {}", e),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Configuration(e) => Some(e),
            Error::Policy(e) => Some(e),
            Error::Protocol(e) => Some(e),
            Error::Mechanism(e) => Some(e),
        }
    }
}

impl From<ConfigurationError> for Error {
    fn from(e: ConfigurationError) -> Self {
        Error::Configuration(e)
    }
}

impl From<PolicyError> for Error {
    fn from(e: PolicyError) -> Self {
        Error::Policy(e)
    }
}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        Error::Protocol(e)
    }
}

impl From<MechanismError> for Error {
    fn from(e: MechanismError) -> Self {
        Error::Mechanism(e)
    }
}
