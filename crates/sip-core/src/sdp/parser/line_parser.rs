//! SDP line parsing utilities
//!
//! Each SDP line has the format `<type>=<value>` where type is a single
//! character. This module parses single lines and the values of the line
//! types the session model keeps (`o=`, `c=`, `t=`, `m=`, `a=`), using `nom`.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_till1, take_while1},
    character::complete::{anychar, char, digit1, not_line_ending, space0, space1},
    combinator::{all_consuming, map_res, opt},
    multi::many0,
    sequence::{preceded, tuple},
    IResult,
};

use crate::error::{Error, Result};
use crate::sdp::session::{Attribute, ConnectionData, MediaDescription, Origin, TimeDescription};

/// Parse an SDP line into a key-value pair
///
/// ```
/// use sipbridge_sip_core::sdp::parser::parse_sdp_line;
///
/// let (_, (key, value)) = parse_sdp_line("a=rtpmap:96 opus/48000/2").unwrap();
/// assert_eq!(key, 'a');
/// assert_eq!(value, "rtpmap:96 opus/48000/2");
/// ```
pub fn parse_sdp_line(input: &str) -> IResult<&str, (char, &str)> {
    let (input, key) = anychar(input)?;
    let (input, _) = char('=')(input)?;
    let (input, value) = not_line_ending(input)?;

    // Handle different line endings (CRLF, LF)
    let input = input.trim_start_matches(['\r', '\n']);

    Ok((input, (key, value.trim())))
}

fn token(input: &str) -> IResult<&str, &str> {
    take_till1(|c: char| c == ' ' || c == '\t')(input)
}

fn number<T: std::str::FromStr>(input: &str) -> IResult<&str, T> {
    map_res(digit1, str::parse::<T>)(input)
}

fn parse_origin_nom(input: &str) -> IResult<&str, Origin> {
    let (input, (username, _, sess_id, _, sess_version, _, net_type, _, addr_type, _, addr)) =
        tuple((
            token,
            space1,
            number::<u64>,
            space1,
            number::<u64>,
            space1,
            tag("IN"),
            space1,
            alt((tag("IP4"), tag("IP6"))),
            space1,
            token,
        ))(input)?;
    Ok((
        input,
        Origin {
            username: username.to_string(),
            sess_id,
            sess_version,
            net_type: net_type.to_string(),
            addr_type: addr_type.to_string(),
            unicast_address: addr.to_string(),
        },
    ))
}

/// Parses the value of an origin line (o=).
pub fn parse_origin_line(value: &str) -> Result<Origin> {
    all_consuming(parse_origin_nom)(value.trim())
        .map(|(_, origin)| origin)
        .map_err(|_| Error::SdpParse(format!("Invalid o= line format: {}", value)))
}

/// Parses the value of a connection line (c=).
pub fn parse_connection_line(value: &str) -> Result<ConnectionData> {
    let parsed: IResult<&str, (&str, &str, &str, &str, &str)> =
        all_consuming(tuple((tag("IN"), space1, alt((tag("IP4"), tag("IP6"))), space1, token)))(value.trim());
    match parsed {
        Ok((_, (net_type, _, addr_type, _, addr))) => Ok(ConnectionData {
            net_type: net_type.to_string(),
            addr_type: addr_type.to_string(),
            connection_address: addr.to_string(),
        }),
        Err(_) => Err(Error::SdpParse(format!("Invalid c= line format: {}", value))),
    }
}

/// Parses the value of a timing line (t=).
pub fn parse_time_line(value: &str) -> Result<TimeDescription> {
    let parsed: IResult<&str, (u64, &str, u64)> =
        all_consuming(tuple((number::<u64>, space1, number::<u64>)))(value.trim());
    match parsed {
        Ok((_, (start_time, _, stop_time))) => Ok(TimeDescription { start_time, stop_time }),
        Err(_) => Err(Error::SdpParse(format!("Invalid t= line format: {}", value))),
    }
}

fn parse_media_nom(input: &str) -> IResult<&str, MediaDescription> {
    let (input, (media, _, port, port_count, _, protocol, formats, _)) = tuple((
        take_while1(|c: char| c.is_ascii_alphanumeric()),
        space1,
        number::<u16>,
        opt(preceded(char('/'), number::<u16>)),
        space1,
        token,
        many0(preceded(space1, token)),
        space0,
    ))(input)?;

    let mut description = MediaDescription::new(
        media,
        port,
        protocol,
        formats.into_iter().map(str::to_string).collect(),
    );
    description.port_count = port_count;
    Ok((input, description))
}

/// Parses the value of a media line (m=). Zero formats is accepted here and
/// left for the caller to judge.
pub fn parse_media_line(value: &str) -> Result<MediaDescription> {
    all_consuming(parse_media_nom)(value.trim())
        .map(|(_, media)| media)
        .map_err(|_| Error::SdpParse(format!("Invalid m= line format: {}", value)))
}

/// Parses the value of an attribute line (a=).
pub fn parse_attribute(value: &str) -> Result<Attribute> {
    if value.is_empty() {
        return Err(Error::SdpParse("Empty a= line".to_string()));
    }
    Ok(match value.split_once(':') {
        Some((key, val)) => Attribute::new(key, val),
        None => Attribute::flag(value),
    })
}
