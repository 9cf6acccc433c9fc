#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! This crate negotiates a SASL mechanism with a server and drives the
//! challenge/response exchange for it.
//!
//! The server's list of mechanisms is fed to a [`Context`] together with the
//! credentials and the security policy of the connection. [`Context::next`]
//! then walks that list and hands back the first mechanism that is both
//! supported and usable, skipping the rest, and [`Context::step`] turns server
//! challenges into client responses. Framing and encoding of these messages
//! on the wire is up to the protocol implementation.
//!
//! # Examples
//!
//! ```rust
//! use hasl::{Context, Response};
//!
//! let mut context = Context::builder()
//!     .with_allowed_mechanisms("PLAIN,EXTERNAL")
//!     .with_authzid("alice")
//!     .build()
//!     .unwrap();
//!
//! // There is no password, so PLAIN isn't even attempted.
//! assert_eq!(context.next(), Some("EXTERNAL"));
//! assert_eq!(context.step(&[]).unwrap(), Response::Success(b"alice".to_vec()));
//!
//! // Nothing left to try.
//! assert_eq!(context.next(), None);
//! ```
//!
//! Extra mechanisms are plugged in through [`Context::add_mechanism`]. They
//! are created afresh for every attempt, and may take as many rounds as they
//! need by answering with [`Response::Continue`]:
//!
//! ```rust
//! # #[cfg(feature = "scram")]
//! # {
//! use hasl::Context;
//! use hasl::mechanisms::Scram;
//! use hasl::common::scram::Sha256;
//!
//! let mut context = Context::new();
//! context
//!     .add_mechanism("SCRAM-SHA-256", || Box::new(Scram::<Sha256>::new()))
//!     .unwrap();
//! assert_eq!(context.supported_mechanisms(), "EXTERNAL PLAIN SCRAM-SHA-256");
//! # }
//! ```
//!
//! # Usage
//!
//! You can use this in your crate by adding this under `dependencies` in your `Cargo.toml`:
//!
//! ```toml,ignore
//! hasl = "*"
//! ```

mod context;
pub mod error;

#[cfg(feature = "scram")]
#[cfg_attr(docsrs, doc(cfg(feature = "scram")))]
pub mod common;
pub mod mechanisms;

pub use crate::context::{Context, ContextBuilder, MechanismFactory};
pub use crate::error::Error;

/// What a mechanism wants sent back to the server after one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// The mechanism is done on our side.
    Success(Vec<u8>),
    /// The mechanism expects another message from the server.
    Continue(Vec<u8>),
}

impl Response {
    /// The payload to send to the server.
    pub fn data(&self) -> &[u8] {
        match self {
            Response::Success(data) | Response::Continue(data) => data,
        }
    }

    /// Takes the payload out of this response.
    pub fn into_data(self) -> Vec<u8> {
        match self {
            Response::Success(data) | Response::Continue(data) => data,
        }
    }

    /// Whether the mechanism is done.
    pub fn is_success(&self) -> bool {
        matches!(self, Response::Success(_))
    }
}

/// A trait which defines SASL mechanisms.
///
/// An instance is created for a single attempt and dropped when the
/// [`Context`] moves on, so it may keep whatever state it needs between calls
/// to [`Mechanism::step`].
pub trait Mechanism: Send {
    /// Checks whether this mechanism can work with the credentials and policy
    /// of `context`, so we don't bother the server with an attempt that can't
    /// succeed. Must not have side effects.
    fn possible(&self, _context: &Context) -> Result<(), Error> {
        Ok(())
    }

    /// Processes `input` received from the server, and returns the data to
    /// send back.
    fn step(&mut self, context: &Context, input: &[u8]) -> Result<Response, Error>;
}
