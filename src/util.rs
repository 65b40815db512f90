use nom::bytes::complete::take;
use nom::error::{make_error, ErrorKind, ParseError};
use nom::number::complete::{be_u16, be_u24, be_u8};
use nom::{Err, IResult, InputLength, Parser};
use tinyvec::{Array, ArrayVec};

/// Apply `f` until the input is exhausted, collecting at least one item.
///
/// Items beyond the capacity of `A` are a parse failure rather than a panic.
pub fn many1<I, O, E, F, A>(mut f: F) -> impl FnMut(I) -> IResult<I, ArrayVec<A>, E>
where
    I: Clone + InputLength,
    F: Parser<I, O, E>,
    E: ParseError<I>,
    A: Array<Item = O>,
{
    move |mut i: I| {
        let mut acc: ArrayVec<A> = ArrayVec::default();
        while i.input_len() > 0 {
            let len = i.input_len();
            let (rest, o) = f.parse(i.clone())?;
            // the parser must always consume
            if rest.input_len() == len || acc.len() == acc.capacity() {
                return Err(Err::Failure(E::from_error_kind(i, ErrorKind::Many1)));
            }
            acc.push(o);
            i = rest;
        }
        if acc.is_empty() {
            return Err(Err::Error(E::from_error_kind(i, ErrorKind::Many1)));
        }
        Ok((i, acc))
    }
}

/// Apply `f` to a whole slice, collecting every item into a `Vec`.
pub fn all_of<'a, O, F>(mut f: F) -> impl FnMut(&'a [u8]) -> IResult<&'a [u8], Vec<O>>
where
    F: Parser<&'a [u8], O, nom::error::Error<&'a [u8]>>,
{
    move |mut i: &'a [u8]| {
        let mut acc = Vec::new();
        while !i.is_empty() {
            let (rest, o) = f.parse(i)?;
            if rest.len() == i.len() {
                return Err(Err::Failure(make_error(i, ErrorKind::Many0)));
            }
            acc.push(o);
            i = rest;
        }
        Ok((i, acc))
    }
}

pub fn u8_prefixed(input: &[u8]) -> IResult<&[u8], &[u8]> {
    let (input, len) = be_u8(input)?;
    take(len)(input)
}

pub fn u16_prefixed(input: &[u8]) -> IResult<&[u8], &[u8]> {
    let (input, len) = be_u16(input)?;
    take(len)(input)
}

pub fn u24_prefixed(input: &[u8]) -> IResult<&[u8], &[u8]> {
    let (input, len) = be_u24(input)?;
    take(len)(input)
}

/// Fail unless the parser left nothing behind.
pub fn exhausted(rest: &[u8]) -> Result<(), Err<nom::error::Error<&[u8]>>> {
    if rest.is_empty() {
        Ok(())
    } else {
        Err(Err::Failure(make_error(rest, ErrorKind::LengthValue)))
    }
}

pub fn be_u48(input: &[u8]) -> IResult<&[u8], u64> {
    let (rest, bytes) = take(6_usize)(input)?;
    let v = bytes.iter().fold(0u64, |acc, b| (acc << 8) | *b as u64);
    Ok((rest, v))
}

pub fn push_u8_prefixed(output: &mut Vec<u8>, data: &[u8]) {
    output.push(data.len() as u8);
    output.extend_from_slice(data);
}

pub fn push_u16_prefixed(output: &mut Vec<u8>, data: &[u8]) {
    output.extend_from_slice(&(data.len() as u16).to_be_bytes());
    output.extend_from_slice(data);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CompressionMethod;

    #[test]
    fn many1_rejects_empty_and_overflow() {
        let r: IResult<&[u8], ArrayVec<[CompressionMethod; 2]>> =
            many1(CompressionMethod::parse)(&[][..]);
        assert!(r.is_err());

        let r: IResult<&[u8], ArrayVec<[CompressionMethod; 2]>> =
            many1(CompressionMethod::parse)(&[0, 1, 0][..]);
        assert!(r.is_err());

        let (_, v): (_, ArrayVec<[CompressionMethod; 2]>) =
            many1(CompressionMethod::parse)(&[0, 1][..]).unwrap();
        assert_eq!(v.as_slice(), &[CompressionMethod::Null, CompressionMethod::Deflate]);
    }

    #[test]
    fn be_u48_reads_six_bytes() {
        let (rest, v) = be_u48(&[0, 0, 0, 0, 1, 2, 9]).unwrap();
        assert_eq!(v, 0x0102);
        assert_eq!(rest, &[9]);
    }

    #[test]
    fn prefixed_slices() {
        let (rest, v) = u16_prefixed(&[0, 2, 7, 8, 9]).unwrap();
        assert_eq!(v, &[7, 8]);
        assert_eq!(rest, &[9]);
        assert!(u8_prefixed(&[3, 1]).is_err());
    }
}
