//! Provides a few SASL mechanisms.

mod external;
mod plain;

#[cfg(feature = "scram")]
mod scram;

pub use self::external::External;
pub use self::plain::Plain;

#[cfg(feature = "scram")]
#[cfg_attr(docsrs, doc(cfg(feature = "scram")))]
pub use self::scram::Scram;

/// Treats an empty credential the same as a missing one.
pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

