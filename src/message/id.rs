use std::fmt;
use std::ops::Deref;

use nom::error::{Error, ErrorKind};
use nom::{Err, IResult};
use rand::RngCore;

use crate::util::u8_prefixed;

/// An opaque value outside the length bounds of its wire field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidLength {
    pub field: &'static str,
    pub min: usize,
    pub max: usize,
    pub actual: usize,
}

impl std::error::Error for InvalidLength {}

impl fmt::Display for InvalidLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} length {} outside {}..={}",
            self.field, self.actual, self.min, self.max
        )
    }
}

impl From<InvalidLength> for crate::Error {
    fn from(value: InvalidLength) -> Self {
        crate::Error::internal(value.to_string())
    }
}

macro_rules! var_array {
    ($name:ident, $min:expr, $max:expr) => {
        #[derive(Clone, Copy)]
        pub struct $name([u8; $max], usize);

        impl $name {
            pub const fn empty() -> Self {
                $name([0; $max], 0)
            }

            pub fn try_new(data: &[u8]) -> Result<Self, InvalidLength> {
                #[allow(unused_comparisons)]
                if data.len() < $min || data.len() > $max {
                    return Err(InvalidLength {
                        field: stringify!($name),
                        min: $min,
                        max: $max,
                        actual: data.len(),
                    });
                }
                let mut array = [0; $max];
                array[..data.len()].copy_from_slice(data);
                Ok($name(array, data.len()))
            }

            /// Random value of `len` bytes, clamped to the field bounds.
            pub fn random(len: usize) -> Self {
                let len = len.clamp($min, $max);
                let mut array = [0; $max];
                rand::thread_rng().fill_bytes(&mut array[..len]);
                $name(array, len)
            }

            pub fn parse(input: &[u8]) -> IResult<&[u8], Self> {
                let (rest, data) = u8_prefixed(input)?;
                match Self::try_new(data) {
                    Ok(v) => Ok((rest, v)),
                    Err(_) => Err(Err::Failure(Error::new(input, ErrorKind::LengthValue))),
                }
            }

            pub fn serialize(&self, output: &mut Vec<u8>) {
                output.push(self.1 as u8);
                output.extend_from_slice(self);
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::empty()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({:02x?})", stringify!($name), &self.0[..self.1])
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.deref() == other.deref()
            }
        }

        impl Eq for $name {}

        impl Deref for $name {
            type Target = [u8];

            fn deref(&self) -> &Self::Target {
                &self.0[..self.1]
            }
        }

        impl<'a> TryFrom<&'a [u8]> for $name {
            type Error = InvalidLength;

            fn try_from(value: &'a [u8]) -> Result<Self, Self::Error> {
                Self::try_new(value)
            }
        }
    };
}

var_array!(SessionId, 0, 32);
var_array!(Cookie, 0, 255);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_bounds() {
        assert!(SessionId::try_new(&[0; 32]).is_ok());
        let err = SessionId::try_new(&[0; 33]).unwrap_err();
        assert_eq!(err.actual, 33);
        assert_eq!(SessionId::random(64).len(), 32);
    }

    #[test]
    fn parse_rejects_long_session_id() {
        let mut data = vec![33];
        data.extend_from_slice(&[0; 33]);
        assert!(SessionId::parse(&data).is_err());
    }

    #[test]
    fn cookie_serialize() {
        let cookie = Cookie::try_new(&[0xBB, 0xCC]).unwrap();
        let mut out = Vec::new();
        cookie.serialize(&mut out);
        assert_eq!(out, vec![0x02, 0xBB, 0xCC]);
        assert_eq!(Cookie::parse(&out).unwrap().1, cookie);
    }
}
