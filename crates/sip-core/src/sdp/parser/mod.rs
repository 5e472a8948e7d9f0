//! SDP text parser.
//!
//! Walks the body line by line. Session-level lines come first; every `m=`
//! opens a new media section that collects the `c=` and `a=` lines after it.

mod line_parser;

pub use line_parser::{
    parse_attribute, parse_connection_line, parse_media_line, parse_origin_line, parse_sdp_line,
    parse_time_line,
};

use tracing::trace;

use crate::error::{Error, Result};
use crate::sdp::session::{MediaDescription, SdpSession};

/// Parses a complete SDP description.
///
/// `v=`, `o=` and `s=` are required and must appear in that order. Line types
/// the model does not keep (`i=`, `u=`, `e=`, `p=`, `b=`, `r=`, `z=`, `k=`)
/// are accepted and skipped; any other line is an error.
pub fn parse_sdp(input: &str) -> Result<SdpSession> {
    if input.trim().is_empty() {
        return Err(Error::SdpParse("empty SDP body".to_string()));
    }

    let mut lines = Vec::new();
    for raw in input.lines() {
        let raw = raw.trim_end_matches('\r');
        if raw.trim().is_empty() {
            continue;
        }
        let (_, (key, value)) = parse_sdp_line(raw)
            .map_err(|_| Error::SdpParse(format!("Invalid SDP line: {}", raw)))?;
        lines.push((key, value));
    }

    let mut iter = lines.into_iter();
    let version = match iter.next() {
        Some(('v', value)) if value == "0" => value.to_string(),
        other => return Err(Error::SdpParse(format!("expected v=0 as first line, found {:?}", other))),
    };
    let origin = match iter.next() {
        Some(('o', value)) => parse_origin_line(value)?,
        other => return Err(Error::SdpParse(format!("expected o= line, found {:?}", other))),
    };
    let session_name = match iter.next() {
        Some(('s', value)) => value.to_string(),
        other => return Err(Error::SdpParse(format!("expected s= line, found {:?}", other))),
    };

    let mut session = SdpSession {
        version,
        origin,
        session_name,
        connection: None,
        time_descriptions: Vec::new(),
        attributes: Vec::new(),
        media_descriptions: Vec::new(),
    };
    let mut current: Option<MediaDescription> = None;

    for (key, value) in iter {
        match (key, current.as_mut()) {
            ('m', _) => {
                if let Some(done) = current.take() {
                    session.media_descriptions.push(done);
                }
                current = Some(parse_media_line(value)?);
            }
            ('c', Some(media)) => media.connection = Some(parse_connection_line(value)?),
            ('c', None) => session.connection = Some(parse_connection_line(value)?),
            ('a', Some(media)) => media.attributes.push(parse_attribute(value)?),
            ('a', None) => session.attributes.push(parse_attribute(value)?),
            ('t', None) => session.time_descriptions.push(parse_time_line(value)?),
            ('i' | 'b' | 'k', _) | ('u' | 'e' | 'p' | 'r' | 'z', None) => {
                trace!("Skipping SDP line {}={}", key, value);
            }
            (other, _) => {
                return Err(Error::SdpParse(format!("unexpected SDP line type '{}' in this position", other)))
            }
        }
    }
    if let Some(done) = current.take() {
        session.media_descriptions.push(done);
    }

    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    const OFFER: &str = "v=0\r\n\
        o=alice 2890844526 2890844526 IN IP4 atlanta.example.com\r\n\
        s=-\r\n\
        c=IN IP4 192.0.2.101\r\n\
        t=0 0\r\n\
        m=audio 49172 RTP/AVP 0 8 97\r\n\
        a=rtpmap:0 PCMU/8000\r\n\
        a=rtpmap:8 PCMA/8000\r\n\
        a=rtpmap:97 iLBC/8000\r\n\
        a=ptime:30\r\n\
        a=rtcp:53020 IN IP4 192.0.2.101\r\n";

    #[test]
    fn test_parse_offer() {
        let session = parse_sdp(OFFER).unwrap();
        assert_eq!(session.origin.unicast_address, "atlanta.example.com");
        assert_eq!(session.connection.as_ref().and_then(|c| c.ip()), Some("192.0.2.101".parse().unwrap()));
        assert_eq!(session.time_descriptions.len(), 1);
        assert_eq!(session.media_descriptions.len(), 1);

        let audio = &session.media_descriptions[0];
        assert_eq!(audio.port, 49172);
        assert_eq!(audio.formats, vec!["0", "8", "97"]);
        assert_eq!(audio.attributes_named("rtpmap").count(), 3);
        assert_eq!(audio.attribute_value("ptime"), Some("30"));
    }

    #[test]
    fn test_parse_lf_only_and_media_level_connection() {
        let body = "v=0\no=- 1 1 IN IP6 ::1\ns=x\nt=0 0\nm=audio 4000 RTP/AVP 0\nc=IN IP6 2001:db8::5\n";
        let session = parse_sdp(body).unwrap();
        assert!(session.connection.is_none());
        let conn = session.media_descriptions[0].connection.as_ref().unwrap();
        assert_eq!(conn.addr_type, "IP6");
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_sdp("").is_err());
        assert!(parse_sdp("   \r\n").is_err());
        assert!(parse_sdp("o=- 1 1 IN IP4 1.2.3.4\r\nv=0\r\n").is_err());
        assert!(parse_sdp("v=0\r\no=- 1 1 IN IP4 1.2.3.4\r\ns=-\r\nthis is not sdp\r\n").is_err());
        assert!(parse_sdp("v=0\r\no=- 1 1 IN IP4 1.2.3.4\r\ns=-\r\nx=unknown\r\n").is_err());
    }

    #[test]
    fn test_round_trip_through_display() {
        let session = parse_sdp(OFFER).unwrap();
        let reparsed = parse_sdp(&session.to_string()).unwrap();
        assert_eq!(session, reparsed);
    }
}
