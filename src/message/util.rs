use nom::bytes::complete::take;
use nom::error::{ErrorKind, ParseError};
use nom::number::complete::{be_u16, be_u8};
use nom::{Err, IResult, InputLength, Parser};

/// Repeat `f` until it fails, collecting into a `Vec`.
pub fn many0<I, O, E, F>(mut f: F) -> impl FnMut(I) -> IResult<I, Vec<O>, E>
where
    I: Clone + InputLength,
    F: Parser<I, O, E>,
    E: ParseError<I>,
{
    move |mut i: I| {
        let mut acc = Vec::new();
        loop {
            let len = i.input_len();
            match f.parse(i.clone()) {
                Err(Err::Error(_)) => return Ok((i, acc)),
                Err(e) => return Err(e),
                Ok((i1, o)) => {
                    // infinite loop check: the parser must always consume
                    if i1.input_len() == len {
                        return Err(Err::Error(E::from_error_kind(i, ErrorKind::Many0)));
                    }

                    i = i1;
                    acc.push(o);
                }
            }
        }
    }
}

/// Parse every element of a sized block, failing on leftovers.
fn all_of<'a, O, F>(block: &'a [u8], f: F) -> Result<Vec<O>, Err<nom::error::Error<&'a [u8]>>>
where
    F: Parser<&'a [u8], O, nom::error::Error<&'a [u8]>>,
{
    let (rest, items) = many0(f)(block)?;
    if !rest.is_empty() {
        return Err(Err::Failure(nom::error::Error::new(
            rest,
            ErrorKind::LengthValue,
        )));
    }
    Ok(items)
}

/// `u8` length prefixed list of `f`.
pub fn list_u8<'a, O, F>(f: F) -> impl FnMut(&'a [u8]) -> IResult<&'a [u8], Vec<O>>
where
    F: Parser<&'a [u8], O, nom::error::Error<&'a [u8]>> + Clone,
{
    move |input: &'a [u8]| {
        let (input, len) = be_u8(input)?;
        let (input, block) = take(len)(input)?;
        Ok((input, all_of(block, f.clone())?))
    }
}

/// `u16` length prefixed list of `f`.
pub fn list_u16<'a, O, F>(f: F) -> impl FnMut(&'a [u8]) -> IResult<&'a [u8], Vec<O>>
where
    F: Parser<&'a [u8], O, nom::error::Error<&'a [u8]>> + Clone,
{
    move |input: &'a [u8]| {
        let (input, len) = be_u16(input)?;
        let (input, block) = take(len)(input)?;
        Ok((input, all_of(block, f.clone())?))
    }
}

/// `u8` length prefixed opaque bytes.
pub fn opaque_u8(input: &[u8]) -> IResult<&[u8], &[u8]> {
    let (input, len) = be_u8(input)?;
    take(len)(input)
}

/// `u16` length prefixed opaque bytes.
pub fn opaque_u16(input: &[u8]) -> IResult<&[u8], &[u8]> {
    let (input, len) = be_u16(input)?;
    take(len)(input)
}
