//! The negotiation context: credentials, policy, the mechanism registry, and the
//! state of the current negotiation.

use std::collections::HashMap;
use std::fmt;

use log::{debug, info, warn};

use crate::error::{ConfigurationError, Error, ProtocolError};
use crate::mechanisms::{External, Plain};
use crate::{Mechanism, Response};

/// Builds a fresh mechanism instance for every attempt.
pub type MechanismFactory = Box<dyn Fn() -> Box<dyn Mechanism> + Send + Sync>;

/// Position of the negotiation within the allowed mechanisms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    NotStarted,
    At(usize),
    Exhausted,
}

impl Cursor {
    fn advance(self) -> Cursor {
        match self {
            Cursor::NotStarted => Cursor::At(0),
            Cursor::At(index) => Cursor::At(index + 1),
            Cursor::Exhausted => Cursor::Exhausted,
        }
    }
}

/// Drives the selection of a SASL mechanism and the exchange with the server.
///
/// A context lives for one authentication handshake. Configure it, then call
/// [`Context::next`] to pick the next usable mechanism, and [`Context::step`]
/// with every server message until the mechanism reports
/// [`Response::Success`] or an error.
///
/// ```rust
/// use hasl::{Context, Response};
///
/// let mut context = Context::new();
/// context.set_username(Some("alice"));
/// context.set_password(Some("secret"));
/// context.set_tls(true);
/// context.set_allowed_mechanisms("SCRAM-SHA-1 PLAIN").unwrap();
///
/// assert_eq!(context.next(), Some("PLAIN"));
/// assert_eq!(
///     context.step(&[]).unwrap(),
///     Response::Success(b"\0alice\0secret".to_vec())
/// );
/// ```
pub struct Context {
    allowed_mechanisms: Option<String>,
    available_mechanisms: Vec<String>,

    authzid: Option<String>,
    username: Option<String>,
    password: Option<String>,

    tls: bool,
    allow_clear_text: bool,

    mechanisms: HashMap<String, MechanismFactory>,

    cursor: Cursor,
    current_mechanism: Option<Box<dyn Mechanism>>,
}

impl Default for Context {
    fn default() -> Context {
        let mut context = Context {
            allowed_mechanisms: None,
            available_mechanisms: Vec::new(),
            authzid: None,
            username: None,
            password: None,
            tls: false,
            allow_clear_text: false,
            mechanisms: HashMap::new(),
            cursor: Cursor::NotStarted,
            current_mechanism: None,
        };
        context.register(
            "EXTERNAL",
            Box::new(|| Box::new(External::new()) as Box<dyn Mechanism>),
        );
        context.register(
            "PLAIN",
            Box::new(|| Box::new(Plain::new()) as Box<dyn Mechanism>),
        );
        context
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct("Context")
            .field("allowed_mechanisms", &self.allowed_mechanisms)
            .field("authzid", &self.authzid)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("tls", &self.tls)
            .field("allow_clear_text", &self.allow_clear_text)
            .field("supported_mechanisms", &self.supported_mechanisms())
            .field("cursor", &self.cursor)
            .finish()
    }
}

impl Context {
    /// Creates a context with the built-in `EXTERNAL` and `PLAIN` mechanisms
    /// registered and nothing else configured.
    pub fn new() -> Context {
        Context::default()
    }

    /// Starts building a context in a single expression.
    pub fn builder() -> ContextBuilder {
        ContextBuilder::default()
    }

    /// The list of allowed mechanisms, as last passed to
    /// [`Context::set_allowed_mechanisms`].
    pub fn allowed_mechanisms(&self) -> Option<&str> {
        self.allowed_mechanisms.as_deref()
    }

    /// Sets the mechanisms the server offers, in the order they should be
    /// attempted. Names may be separated by white space or commas.
    ///
    /// This restarts the negotiation: the current mechanism is dropped and the
    /// next call to [`Context::next`] starts from the first name again.
    pub fn set_allowed_mechanisms(&mut self, allowed_mechanisms: &str) -> Result<(), Error> {
        if allowed_mechanisms.is_empty() {
            return Err(ConfigurationError::EmptyMechanismList.into());
        }

        self.available_mechanisms = allowed_mechanisms
            .split(|c: char| c == ',' || c.is_whitespace())
            .map(String::from)
            .collect();
        self.allowed_mechanisms = Some(allowed_mechanisms.to_owned());

        self.cursor = Cursor::NotStarted;
        self.current_mechanism = None;

        debug!(
            "allowed mechanisms set to {:?}, negotiation restarted",
            self.available_mechanisms
        );

        Ok(())
    }

    /// The authorization identity, the user to act as.
    pub fn authzid(&self) -> Option<&str> {
        self.authzid.as_deref()
    }

    /// Sets the authorization identity. This can differ from the username when
    /// e.g. an administrator authenticates on behalf of another user.
    pub fn set_authzid(&mut self, authzid: Option<&str>) {
        self.authzid = authzid.map(String::from);
    }

    /// The username of the authenticating user.
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Sets the username of the authenticating user.
    pub fn set_username(&mut self, username: Option<&str>) {
        self.username = username.map(String::from);
    }

    /// The password of the authenticating user.
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Sets the password of the authenticating user.
    pub fn set_password(&mut self, password: Option<&str>) {
        self.password = password.map(String::from);
    }

    /// Whether the connection is already encrypted.
    pub fn tls(&self) -> bool {
        self.tls
    }

    /// Tells the context whether the connection is already encrypted.
    pub fn set_tls(&mut self, tls: bool) {
        self.tls = tls;
    }

    /// Whether mechanisms that send credentials in the clear may be used
    /// without TLS.
    pub fn allow_clear_text(&self) -> bool {
        self.allow_clear_text
    }

    /// Allows or forbids mechanisms like `PLAIN` on a connection without TLS.
    pub fn set_allow_clear_text(&mut self, allow_clear_text: bool) {
        self.allow_clear_text = allow_clear_text;
    }

    /// Registers a mechanism under `name`, replacing any previous one with the
    /// same name. The built-ins can be overridden this way.
    ///
    /// Returns `true` if no mechanism was registered under this name before.
    pub fn add_mechanism<F>(&mut self, name: &str, factory: F) -> Result<bool, Error>
    where
        F: Fn() -> Box<dyn Mechanism> + Send + Sync + 'static,
    {
        if name.is_empty() {
            return Err(ConfigurationError::EmptyMechanismName.into());
        }

        Ok(self.register(name, Box::new(factory)))
    }

    fn register(&mut self, name: &str, factory: MechanismFactory) -> bool {
        self.mechanisms.insert(name.to_owned(), factory).is_none()
    }

    /// The names of all registered mechanisms, sorted and separated by spaces.
    pub fn supported_mechanisms(&self) -> String {
        let mut names: Vec<&str> = self.mechanisms.keys().map(String::as_str).collect();
        names.sort_unstable();
        names.join(" ")
    }

    /// The name of the mechanism currently being attempted, if any.
    pub fn current_mechanism(&self) -> Option<&str> {
        match self.cursor {
            Cursor::At(index) => self.available_mechanisms.get(index).map(String::as_str),
            Cursor::NotStarted | Cursor::Exhausted => None,
        }
    }

    /// Moves on to the next allowed mechanism that is both registered and
    /// possible with the current configuration, and returns its name.
    ///
    /// Returns `None` once every allowed mechanism has been tried, and keeps
    /// returning `None` until [`Context::set_allowed_mechanisms`] is called
    /// again.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<&str> {
        if self.allowed_mechanisms.is_none() {
            return None;
        }

        loop {
            self.current_mechanism = None;

            self.cursor = self.cursor.advance();
            let index = match self.cursor {
                Cursor::At(index) if index < self.available_mechanisms.len() => index,
                Cursor::Exhausted => return None,
                _ => {
                    debug!("all allowed mechanisms have been tried");
                    self.cursor = Cursor::Exhausted;
                    return None;
                }
            };

            let name = &self.available_mechanisms[index];
            let factory = match self.mechanisms.get(name) {
                Some(factory) => factory,
                None => {
                    debug!("skipping mechanism '{}': not supported", name);
                    continue;
                }
            };

            let mechanism = factory();
            if let Err(err) = mechanism.possible(self) {
                info!("skipping mechanism '{}': {}", name, err);
                continue;
            }

            debug!("trying mechanism '{}'", name);
            self.current_mechanism = Some(mechanism);
            return Some(name);
        }
    }

    /// Feeds `server_in` to the current mechanism and returns what to send
    /// back to the server.
    ///
    /// Errors are final for the current mechanism. Whether to try the next
    /// one or give up is left to the caller.
    pub fn step(&mut self, server_in: &[u8]) -> Result<Response, Error> {
        let mut mechanism = match self.current_mechanism.take() {
            Some(mechanism) => mechanism,
            None => {
                warn!("step called without an active mechanism");
                return Err(ProtocolError::NoCurrentMechanism.into());
            }
        };

        let ret = mechanism.step(self, server_in);
        self.current_mechanism = Some(mechanism);
        ret
    }
}

/// Configures a [`Context`] in one go.
///
/// ```rust
/// use hasl::Context;
///
/// let context = Context::builder()
///     .with_allowed_mechanisms("PLAIN, EXTERNAL")
///     .with_username("alice")
///     .with_password("secret")
///     .with_tls(true)
///     .build()
///     .unwrap();
///
/// assert_eq!(context.username(), Some("alice"));
/// ```
#[derive(Default)]
pub struct ContextBuilder {
    allowed_mechanisms: Option<String>,
    authzid: Option<String>,
    username: Option<String>,
    password: Option<String>,
    tls: bool,
    allow_clear_text: bool,
    mechanisms: Vec<(String, MechanismFactory)>,
}

impl ContextBuilder {
    /// Sets the mechanisms the server offers.
    pub fn with_allowed_mechanisms<S: Into<String>>(mut self, allowed_mechanisms: S) -> Self {
        self.allowed_mechanisms = Some(allowed_mechanisms.into());
        self
    }

    /// Sets the authorization identity.
    pub fn with_authzid<S: Into<String>>(mut self, authzid: S) -> Self {
        self.authzid = Some(authzid.into());
        self
    }

    /// Sets the username.
    pub fn with_username<S: Into<String>>(mut self, username: S) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Sets the password.
    pub fn with_password<S: Into<String>>(mut self, password: S) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Marks the connection as encrypted or not.
    pub fn with_tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    /// Allows clear text mechanisms without TLS.
    pub fn with_allow_clear_text(mut self, allow_clear_text: bool) -> Self {
        self.allow_clear_text = allow_clear_text;
        self
    }

    /// Registers an extra mechanism, or overrides a built-in one.
    pub fn with_mechanism<N, F>(mut self, name: N, factory: F) -> Self
    where
        N: Into<String>,
        F: Fn() -> Box<dyn Mechanism> + Send + Sync + 'static,
    {
        self.mechanisms.push((name.into(), Box::new(factory)));
        self
    }

    /// Creates the context, validating the mechanism names and list.
    pub fn build(self) -> Result<Context, Error> {
        let mut context = Context::new();

        for (name, factory) in self.mechanisms {
            if name.is_empty() {
                return Err(ConfigurationError::EmptyMechanismName.into());
            }
            context.register(&name, factory);
        }

        if let Some(allowed_mechanisms) = self.allowed_mechanisms {
            context.set_allowed_mechanisms(&allowed_mechanisms)?;
        }

        context.authzid = self.authzid;
        context.username = self.username;
        context.password = self.password;
        context.tls = self.tls;
        context.allow_clear_text = self.allow_clear_text;

        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{MechanismError, PolicyError};

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    struct TestMechanism {
        possible: bool,
    }

    impl Mechanism for TestMechanism {
        fn possible(&self, _context: &Context) -> Result<(), Error> {
            if self.possible {
                Ok(())
            } else {
                Err(MechanismError::Other("error".to_owned()).into())
            }
        }

        fn step(&mut self, context: &Context, input: &[u8]) -> Result<Response, Error> {
            assert_eq!(input, b"server-in");
            assert_eq!(context.current_mechanism(), Some("TEST"));
            Err(MechanismError::Other("this is an error".to_owned()).into())
        }
    }

    /// Needs two rounds before succeeding.
    struct TwoRounds {
        round: u8,
    }

    impl Mechanism for TwoRounds {
        fn step(&mut self, _context: &Context, input: &[u8]) -> Result<Response, Error> {
            self.round += 1;
            match self.round {
                1 => Ok(Response::Continue(b"hello".to_vec())),
                2 => {
                    assert_eq!(input, b"challenge");
                    Ok(Response::Success(b"answer".to_vec()))
                }
                _ => Err(MechanismError::InvalidState.into()),
            }
        }
    }

    #[test]
    fn new_context_is_empty() {
        let context = Context::new();
        assert_eq!(context.allowed_mechanisms(), None);
        assert_eq!(context.authzid(), None);
        assert_eq!(context.username(), None);
        assert_eq!(context.password(), None);
        assert!(!context.tls());
        assert!(!context.allow_clear_text());
        assert_eq!(context.current_mechanism(), None);
    }

    #[test]
    fn properties() {
        let mut context = Context::new();
        context.set_allowed_mechanisms("PLAIN").unwrap();
        context.set_authzid(Some("authzid"));
        context.set_username(Some("username"));
        context.set_password(Some("password"));
        context.set_tls(true);
        context.set_allow_clear_text(true);

        assert_eq!(context.allowed_mechanisms(), Some("PLAIN"));
        assert_eq!(context.authzid(), Some("authzid"));
        assert_eq!(context.username(), Some("username"));
        assert_eq!(context.password(), Some("password"));
        assert!(context.tls());
        assert!(context.allow_clear_text());

        context.set_authzid(None);
        assert_eq!(context.authzid(), None);
        context.set_username(Some(""));
        assert_eq!(context.username(), Some(""));
    }

    #[test]
    fn builder_configures_everything() {
        let context = Context::builder()
            .with_allowed_mechanisms("PLAIN")
            .with_authzid("authzid")
            .with_username("username")
            .with_password("password")
            .with_tls(true)
            .with_allow_clear_text(true)
            .with_mechanism("TEST", || Box::new(TestMechanism { possible: true }))
            .build()
            .unwrap();

        assert_eq!(context.allowed_mechanisms(), Some("PLAIN"));
        assert_eq!(context.authzid(), Some("authzid"));
        assert_eq!(context.username(), Some("username"));
        assert_eq!(context.password(), Some("password"));
        assert!(context.tls());
        assert!(context.allow_clear_text());
        assert_eq!(context.supported_mechanisms(), "EXTERNAL PLAIN TEST");
    }

    #[test]
    fn builder_rejects_empty_values() {
        let err = Context::builder()
            .with_allowed_mechanisms("")
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            Error::Configuration(ConfigurationError::EmptyMechanismList)
        );

        let err = Context::builder()
            .with_mechanism("", || Box::new(External::new()))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            Error::Configuration(ConfigurationError::EmptyMechanismName)
        );
    }

    #[test]
    fn debug_hides_password() {
        let mut context = Context::new();
        context.set_username(Some("alice"));
        context.set_password(Some("hunter2"));
        let debug = format!("{:?}", context);
        assert!(debug.contains("alice"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn allowed_mechanisms_empty() {
        let mut context = Context::new();
        assert_eq!(
            context.set_allowed_mechanisms(""),
            Err(Error::Configuration(ConfigurationError::EmptyMechanismList))
        );
        assert_eq!(context.allowed_mechanisms(), None);
    }

    #[test]
    fn allowed_mechanisms_split() {
        let mut context = Context::new();
        context
            .set_allowed_mechanisms("PLAIN,EXTERNAL  X-TEST\tPLAIN")
            .unwrap();
        assert_eq!(
            context.available_mechanisms,
            ["PLAIN", "EXTERNAL", "", "X-TEST", "PLAIN"]
        );
    }

    #[test]
    fn add_mechanism_empty_name() {
        let mut context = Context::new();
        let err = context
            .add_mechanism("", || Box::new(External::new()))
            .unwrap_err();
        assert_eq!(
            err,
            Error::Configuration(ConfigurationError::EmptyMechanismName)
        );
        assert_eq!(context.supported_mechanisms(), "EXTERNAL PLAIN");
    }

    #[test]
    fn add_mechanism_override() {
        let mut context = Context::new();
        let added = context
            .add_mechanism("PLAIN", || Box::new(External::new()))
            .unwrap();
        assert!(!added);
        assert_eq!(context.supported_mechanisms(), "EXTERNAL PLAIN");

        // PLAIN now behaves like EXTERNAL and no longer needs credentials.
        context.set_authzid(Some("bob"));
        context.set_allowed_mechanisms("PLAIN").unwrap();
        assert_eq!(context.next(), Some("PLAIN"));
        assert_eq!(context.step(&[]), Ok(Response::Success(b"bob".to_vec())));
    }

    #[test]
    fn supported_mechanisms_default() {
        let context = Context::new();
        assert_eq!(context.supported_mechanisms(), "EXTERNAL PLAIN");
    }

    #[test]
    fn supported_mechanisms_custom() {
        let mut context = Context::new();
        assert!(context
            .add_mechanism("TEST", || Box::new(TestMechanism { possible: true }))
            .unwrap());
        assert!(context
            .add_mechanism("DEBUG", || Box::new(TestMechanism { possible: true }))
            .unwrap());
        assert_eq!(
            context.supported_mechanisms(),
            "DEBUG EXTERNAL PLAIN TEST"
        );
    }

    #[test]
    fn current_mechanism() {
        init_logger();
        let mut context = Context::new();
        context.set_username(Some("bob"));
        context.set_password(Some("hunter2"));
        context.set_tls(true);

        assert_eq!(context.current_mechanism(), None);

        context.set_allowed_mechanisms("PLAIN,EXTERNAL").unwrap();
        assert_eq!(context.current_mechanism(), None);

        context.next();
        assert_eq!(context.current_mechanism(), Some("PLAIN"));

        context.next();
        assert_eq!(context.current_mechanism(), Some("EXTERNAL"));

        context.next();
        assert_eq!(context.current_mechanism(), None);

        context.next();
        assert_eq!(context.current_mechanism(), None);
    }

    #[test]
    fn reset_on_new_allowed_mechanisms() {
        let mut context = Context::new();
        context.set_allowed_mechanisms("EXTERNAL").unwrap();
        assert_eq!(context.next(), Some("EXTERNAL"));
        assert_eq!(context.current_mechanism(), Some("EXTERNAL"));

        context.set_allowed_mechanisms("EXTERNAL").unwrap();
        assert_eq!(context.current_mechanism(), None);
        assert_eq!(
            context.step(&[]),
            Err(Error::Protocol(ProtocolError::NoCurrentMechanism))
        );

        assert_eq!(context.next(), Some("EXTERNAL"));
        assert_eq!(context.next(), None);

        // Exhaustion is left behind by a new list as well.
        context.set_allowed_mechanisms("PLAIN EXTERNAL").unwrap();
        assert_eq!(context.next(), Some("EXTERNAL"));
    }

    #[test]
    fn next_without_allowed_mechanisms() {
        let mut context = Context::new();
        assert_eq!(context.next(), None);
        assert_eq!(context.next(), None);
        assert_eq!(context.current_mechanism(), None);

        // Nothing was consumed, the list starts from the top once set.
        context.set_allowed_mechanisms("EXTERNAL").unwrap();
        assert_eq!(context.next(), Some("EXTERNAL"));
    }

    #[test]
    fn next_plain_and_external() {
        let mut context = Context::new();
        context.set_username(Some("alice"));
        context.set_password(Some("hunter2"));
        context.set_allowed_mechanisms("PLAIN,EXTERNAL").unwrap();
        context.set_allow_clear_text(true);

        assert_eq!(context.next(), Some("PLAIN"));
        assert_eq!(context.next(), Some("EXTERNAL"));
        assert_eq!(context.next(), None);
        assert_eq!(context.next(), None);
    }

    #[test]
    fn next_space_separated_with_tls() {
        let mut context = Context::new();
        context.set_username(Some("alice"));
        context.set_password(Some("hunter2"));
        context.set_tls(true);
        context.set_allowed_mechanisms("PLAIN EXTERNAL").unwrap();

        assert_eq!(context.next(), Some("PLAIN"));
        assert_eq!(context.next(), Some("EXTERNAL"));
        assert_eq!(context.next(), None);
        assert_eq!(context.next(), None);
    }

    #[test]
    fn next_plain_not_possible() {
        init_logger();
        let mut context = Context::new();
        context.set_allowed_mechanisms("PLAIN,EXTERNAL").unwrap();

        assert_eq!(context.next(), Some("EXTERNAL"));
        assert_eq!(context.next(), None);
        assert_eq!(context.next(), None);
    }

    #[test]
    fn next_plain_not_possible_only_mechanism() {
        let mut context = Context::new();
        context.set_allowed_mechanisms("PLAIN").unwrap();

        assert_eq!(context.next(), None);
        assert_eq!(context.current_mechanism(), None);
        assert_eq!(context.next(), None);
    }

    #[test]
    fn next_plain_refused_without_tls() {
        let mut context = Context::new();
        context.set_username(Some("alice"));
        context.set_password(Some("hunter2"));
        context.set_allowed_mechanisms("PLAIN").unwrap();

        let plain = Plain::new();
        assert_eq!(
            plain.possible(&context),
            Err(Error::Policy(PolicyError::ClearTextWithoutTls))
        );
        assert_eq!(context.next(), None);
    }

    #[test]
    fn next_skips_unknown_mechanisms() {
        init_logger();
        let mut context = Context::new();
        context
            .set_allowed_mechanisms("SCRAM-SHA-512,,X-UNKNOWN EXTERNAL")
            .unwrap();

        assert_eq!(context.next(), Some("EXTERNAL"));
        assert_eq!(context.current_mechanism(), Some("EXTERNAL"));
        assert_eq!(context.next(), None);
    }

    #[test]
    fn next_skips_impossible_custom_mechanism() {
        let mut context = Context::new();
        context
            .add_mechanism("TEST", || Box::new(TestMechanism { possible: false }))
            .unwrap();
        context.set_allowed_mechanisms("TEST EXTERNAL").unwrap();

        assert_eq!(context.next(), Some("EXTERNAL"));
    }

    #[test]
    fn step_without_mechanism() {
        let mut context = Context::new();
        let err = context.step(b"server-in").unwrap_err();
        assert_eq!(err, Error::Protocol(ProtocolError::NoCurrentMechanism));
        assert!(err.to_string().contains("no active mechanism"));
    }

    #[test]
    fn step_after_exhaustion() {
        let mut context = Context::new();
        context.set_allowed_mechanisms("EXTERNAL").unwrap();
        assert_eq!(context.next(), Some("EXTERNAL"));
        assert_eq!(context.next(), None);
        assert_eq!(
            context.step(&[]),
            Err(Error::Protocol(ProtocolError::NoCurrentMechanism))
        );
    }

    #[test]
    fn step_error_is_surfaced() {
        let mut context = Context::new();
        context
            .add_mechanism("TEST", || Box::new(TestMechanism { possible: true }))
            .unwrap();
        context.set_allowed_mechanisms("TEST EXTERNAL").unwrap();

        assert_eq!(context.next(), Some("TEST"));
        assert_eq!(
            context.step(b"server-in"),
            Err(Error::Mechanism(MechanismError::Other(
                "this is an error".to_owned()
            )))
        );
        // No fallback happened on our behalf.
        assert_eq!(context.current_mechanism(), Some("TEST"));

        assert_eq!(context.next(), Some("EXTERNAL"));
    }

    #[test]
    fn step_keeps_mechanism_state_between_rounds() {
        let mut context = Context::new();
        context
            .add_mechanism("X-TWO-ROUNDS", || Box::new(TwoRounds { round: 0 }))
            .unwrap();
        context.set_allowed_mechanisms("X-TWO-ROUNDS").unwrap();

        assert_eq!(context.next(), Some("X-TWO-ROUNDS"));
        assert_eq!(
            context.step(&[]),
            Ok(Response::Continue(b"hello".to_vec()))
        );
        assert_eq!(
            context.step(b"challenge"),
            Ok(Response::Success(b"answer".to_vec()))
        );
        assert_eq!(
            context.step(&[]),
            Err(Error::Mechanism(MechanismError::InvalidState))
        );
    }

    #[test]
    fn fresh_instance_per_attempt() {
        let mut context = Context::new();
        context
            .add_mechanism("X-TWO-ROUNDS", || Box::new(TwoRounds { round: 0 }))
            .unwrap();
        context.set_allowed_mechanisms("X-TWO-ROUNDS").unwrap();
        assert_eq!(context.next(), Some("X-TWO-ROUNDS"));
        context.step(&[]).unwrap();

        context.set_allowed_mechanisms("X-TWO-ROUNDS").unwrap();
        assert_eq!(context.next(), Some("X-TWO-ROUNDS"));
        assert_eq!(
            context.step(&[]),
            Ok(Response::Continue(b"hello".to_vec()))
        );
    }

    #[test]
    fn full_plain_only() {
        let mut context = Context::new();
        context.set_allowed_mechanisms("PLAIN").unwrap();
        context.set_username(Some("alice"));
        context.set_password(Some("hunter2"));
        context.set_allow_clear_text(true);

        assert_eq!(context.next(), Some("PLAIN"));
        assert_eq!(
            context.step(&[]),
            Ok(Response::Success(b"\0alice\0hunter2".to_vec()))
        );
    }

    #[test]
    fn full_plain_with_tls() {
        let mut context = Context::new();
        context.set_username(Some("alice"));
        context.set_password(Some("secret"));
        context.set_tls(true);
        context.set_allowed_mechanisms("PLAIN").unwrap();

        assert_eq!(context.next(), Some("PLAIN"));
        let response = context.step(&[]).unwrap();
        assert!(response.is_success());
        assert_eq!(response.data(), b"\0alice\0secret");
        assert_eq!(response.data().len(), 13);
    }

    #[test]
    fn full_plain_external_plain_not_possible() {
        let mut context = Context::new();
        context.set_allowed_mechanisms("PLAIN,EXTERNAL").unwrap();
        context.set_authzid(Some("bob"));
        context.set_allow_clear_text(true);

        assert_eq!(context.next(), Some("EXTERNAL"));
        assert_eq!(context.step(&[]), Ok(Response::Success(b"bob".to_vec())));
    }

    #[test]
    fn full_plain_external_plain_failed() {
        let mut context = Context::new();
        context.set_allowed_mechanisms("PLAIN,EXTERNAL").unwrap();
        context.set_authzid(Some("alice"));
        context.set_username(Some("chad"));
        context.set_password(Some("hunter2"));
        context.set_allow_clear_text(true);

        assert_eq!(context.next(), Some("PLAIN"));
        assert_eq!(
            context.step(&[]),
            Ok(Response::Success(b"alice\0chad\0hunter2".to_vec()))
        );

        // The server refused PLAIN, so move on to EXTERNAL.
        assert_eq!(context.next(), Some("EXTERNAL"));
        assert_eq!(context.step(&[]), Ok(Response::Success(b"alice".to_vec())));
    }

    #[test]
    fn context_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Context>();
    }
}
