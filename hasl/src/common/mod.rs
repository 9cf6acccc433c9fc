//! Helpers shared by the mechanisms that need more than string concatenation.

use std::collections::HashMap;
use std::string::FromUtf8Error;

pub mod scram;

#[cfg(test)]
#[test]
fn xor_works() {
    assert_eq!(
        xor(
            &[135, 94, 53, 134, 73, 233, 140, 221, 150, 12, 96, 111, 54, 66, 11, 76],
            &[163, 9, 122, 180, 107, 44, 22, 252, 248, 134, 112, 82, 84, 122, 56, 209]
        ),
        &[36, 87, 79, 50, 34, 197, 154, 33, 110, 138, 16, 61, 98, 56, 51, 157]
    );
}

#[cfg(test)]
#[test]
fn parse_frame_works() {
    let frame = parse_frame(b"r=abc,s=QSXC=,i=4096,broken").unwrap();
    assert_eq!(frame.len(), 3);
    assert_eq!(frame["r"], "abc");
    assert_eq!(frame["s"], "QSXC=");
    assert_eq!(frame["i"], "4096");

    assert!(parse_frame(&[0xff, 0xfe]).is_err());
}

#[cfg(test)]
#[test]
fn escape_saslname_works() {
    assert_eq!(escape_saslname("user"), "user");
    assert_eq!(escape_saslname("a,b=c"), "a=2Cb=3Dc");
    assert_eq!(escape_saslname("=,"), "=3D=2C");
}

/// Escapes `=` and `,` in a name sent in a SCRAM attribute (RFC 5802, 5.1).
#[doc(hidden)]
pub fn escape_saslname(name: &str) -> String {
    let mut escaped = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '=' => escaped.push_str("=3D"),
            ',' => escaped.push_str("=2C"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[doc(hidden)]
pub fn xor(a: &[u8], b: &[u8]) -> Vec<u8> {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(a, b)| a ^ b).collect()
}

/// Splits a `key=value,key=value` SCRAM message into its attributes.
#[doc(hidden)]
pub fn parse_frame(frame: &[u8]) -> Result<HashMap<String, String>, FromUtf8Error> {
    let inner = String::from_utf8(frame.to_owned())?;
    let mut ret = HashMap::new();
    for s in inner.split(',') {
        if let Some((k, v)) = s.split_once('=') {
            ret.insert(k.to_owned(), v.to_owned());
        }
    }
    Ok(ret)
}
