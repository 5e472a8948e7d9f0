//! SDP offer/answer (RFC 3264) against the codec table.
//!
//! # Format selection
//!
//! The answer lists every offered format we know, **in the offer's order**,
//! and the selected format is the first of them. Local preference is only
//! applied when we are the offerer ([`NegotiationEngine::build_offer`]).
//!
//! ```rust
//! use sipbridge_gateway_core::{GatewayConfig, NegotiationEngine, DEFAULT_CODECS};
//! use sipbridge_sip_core::sdp::SdpSession;
//!
//! let offer: SdpSession = "v=0\r\no=- 1 1 IN IP4 203.0.113.5\r\ns=-\r\nc=IN IP4 203.0.113.5\r\n\
//!     t=0 0\r\nm=audio 40000 RTP/AVP 18 0 8\r\n".parse().unwrap();
//!
//! let config = GatewayConfig::default();
//! let engine = NegotiationEngine::new(&DEFAULT_CODECS, &config);
//! let (answer, selected) = engine.build_answer(
//!     &offer,
//!     "192.0.2.10:30000".parse().unwrap(),
//!     "192.0.2.10:30001".parse().unwrap(),
//! );
//!
//! assert_eq!(selected, "0");
//! assert_eq!(answer.media_descriptions[0].formats, vec!["0", "8"]);
//! ```

use std::fmt;
use std::net::{IpAddr, SocketAddr};

use sipbridge_rtp_core::{allocate_for, Endpoint, MediaPair};
use sipbridge_sip_core::prelude::*;
use sipbridge_sip_core::sdp::{address_type, Attribute, ConnectionData, MediaDescription, Origin};
use tracing::{debug, info, warn};

use crate::codec::CodecTable;
use crate::config::{GatewayConfig, DEFAULT_PTIME};
use crate::error::{Error, Result};
use crate::ids::{IdGenerator, RandomIds};

pub const MEDIA_AUDIO: &str = "audio";
pub const PROTO_RTP_AVP: &str = "RTP/AVP";
pub const CONTENT_TYPE_SDP: &str = "application/sdp";

static RANDOM_IDS: RandomIds = RandomIds;

/// A remote media address. The IP is absent when the peer only sent a port
/// (`a=rtcp:40001`); callers then fall back to the RTP address's IP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaAddress {
    pub ip: Option<IpAddr>,
    pub port: u16,
}

impl MediaAddress {
    pub fn socket_addr(&self) -> Option<SocketAddr> {
        self.ip.map(|ip| SocketAddr::new(ip, self.port))
    }

    pub fn or_ip(&self, default: IpAddr) -> SocketAddr {
        SocketAddr::new(self.ip.unwrap_or(default), self.port)
    }
}

/// What we learned from the remote description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteMedia {
    /// The first format of the first media description
    pub selected_format: String,
    /// Packetization interval in milliseconds
    pub ptime: u32,
    pub rtp: MediaAddress,
    pub rtcp: Option<MediaAddress>,
}

/// A completed negotiation for one call leg
#[derive(Debug, Clone)]
pub struct Negotiated {
    /// `200 OK` carrying our answer
    pub response: Response,
    /// Empty when nothing offered is in the codec table
    pub selected_format: String,
    pub ptime: u32,
}

/// Reads the remote media parameters out of an SDP body.
///
/// The RTP address is the session-level `c=` address, or the origin address
/// when there is none, combined with the first media port. An `a=rtcp`
/// attribute whose port does not parse leaves the RTCP address unset.
pub fn parse_remote(body: &[u8]) -> Result<RemoteMedia> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(Error::Parse("empty SDP body".to_string()));
    }
    let remote = SdpSession::parse(body).map_err(|e| Error::Parse(e.to_string()))?;

    let media = remote.media_descriptions.first().ok_or(Error::NoMedia)?;
    let session_ip = remote.connection.as_ref().and_then(ConnectionData::ip);
    let rtp = MediaAddress {
        ip: session_ip.or_else(|| remote.origin.unicast_address.parse().ok()),
        port: media.port,
    };

    let selected_format = media.formats.first().ok_or(Error::NoFormats)?.clone();

    let mut ptime = DEFAULT_PTIME;
    let mut rtcp = None;
    for attribute in &media.attributes {
        let value = attribute.value.as_deref().unwrap_or_default();
        match attribute.key.as_str() {
            "ptime" => {
                if let Ok(parsed) = value.trim().parse() {
                    ptime = parsed;
                }
            }
            "rtcp" => rtcp = parse_rtcp_attribute(value),
            _ => {}
        }
    }

    debug!(
        "Remote media: format {} ptime {} rtp {:?} rtcp {:?}",
        selected_format, ptime, rtp, rtcp
    );
    Ok(RemoteMedia {
        selected_format,
        ptime,
        rtp,
        rtcp,
    })
}

// `<port> [<nettype> <addrtype> <address>]` (RFC 3605)
fn parse_rtcp_attribute(value: &str) -> Option<MediaAddress> {
    let parts: Vec<&str> = value.split_whitespace().collect();
    let port = match parts.first().map(|p| p.parse::<u16>()) {
        Some(Ok(port)) => port,
        _ => {
            debug!("Ignoring malformed rtcp attribute {:?}", value);
            return None;
        }
    };
    let ip = parts.get(3).and_then(|addr| addr.parse().ok());
    Some(MediaAddress { ip, port })
}

/// Closes `pair` after `primary`, keeping any close failure alongside it
pub(crate) fn close_after_failure<S: Endpoint>(primary: Error, pair: MediaPair<S>) -> Error {
    match pair.close() {
        Ok(()) => primary,
        Err(cleanup) => {
            warn!("Media sockets did not close cleanly after: {}", primary);
            Error::MediaCleanup {
                primary: Box::new(primary),
                cleanup,
            }
        }
    }
}

fn parse_offer(request: &Request) -> Result<SdpSession> {
    if request.body().is_empty() {
        return Err(Error::Parse("no SDP in the request".to_string()));
    }
    SdpSession::parse(request.body()).map_err(|e| Error::Parse(e.to_string()))
}

/// A failed [`NegotiationEngine::renegotiate`].
///
/// `pair` is `Some` when the offer was rejected before the media was
/// touched; the caller still owns those sockets. It is `None` once the pair
/// has been closed. Converting into [`Error`] drops a returned pair.
#[derive(Debug)]
pub struct RenegotiateError<S> {
    pub error: Error,
    pub pair: Option<MediaPair<S>>,
}

impl<S> fmt::Display for RenegotiateError<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl<S: fmt::Debug> std::error::Error for RenegotiateError<S> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(&self.error)
    }
}

impl<S> From<RenegotiateError<S>> for Error {
    fn from(failed: RenegotiateError<S>) -> Self {
        failed.error
    }
}

/// Builds answers and offers for one codec table and configuration
#[derive(Clone, Copy)]
pub struct NegotiationEngine<'a> {
    codecs: &'a CodecTable,
    config: &'a GatewayConfig,
    ids: &'a dyn IdGenerator,
}

impl<'a> NegotiationEngine<'a> {
    pub fn new(codecs: &'a CodecTable, config: &'a GatewayConfig) -> Self {
        NegotiationEngine {
            codecs,
            config,
            ids: &RANDOM_IDS,
        }
    }

    pub fn with_ids(mut self, ids: &'a dyn IdGenerator) -> Self {
        self.ids = ids;
        self
    }

    /// Builds our answer to `remote`, bound to the given local media
    /// addresses. Returns the answer and the selected format, which is empty
    /// when no offered format is supported.
    pub fn build_answer(
        &self,
        remote: &SdpSession,
        rtp_local: SocketAddr,
        rtcp_local: SocketAddr,
    ) -> (SdpSession, String) {
        let mut formats = Vec::new();
        let mut rtpmaps = Vec::new();
        if let Some(offered) = remote.media_descriptions.first() {
            for format in &offered.formats {
                if let Some(codec) = self.codecs.lookup(format) {
                    formats.push(format.clone());
                    rtpmaps.push(Attribute::new("rtpmap", codec.rtpmap));
                }
            }
        }
        let selected_format = formats.first().cloned().unwrap_or_default();

        let rtp_ip = rtp_local.ip().to_canonical();
        let rtcp_ip = rtcp_local.ip().to_canonical();

        let mut media = MediaDescription::new(MEDIA_AUDIO, rtp_local.port(), PROTO_RTP_AVP, formats);
        media.attributes = rtpmaps;
        media.attributes.extend([
            Attribute::new("ptime", self.config.ptime.to_string()),
            Attribute::new("minptime", self.config.minptime.to_string()),
            Attribute::flag("sendrecv"),
            Attribute::new(
                "rtcp",
                format!("{} IN {} {}", rtcp_local.port(), address_type(&rtcp_ip), rtcp_ip),
            ),
        ]);

        let origin = Origin::new(self.ids.session_id(), self.ids.session_id(), rtp_ip);
        let answer = SdpSession::new(origin, self.config.session_name.clone())
            .with_connection(ConnectionData::new(rtp_ip))
            .with_media(media);

        debug!("Built SDP answer on {} selecting {:?}", rtp_local, selected_format);
        (answer, selected_format)
    }

    /// Builds an offer listing every non-experimental codec in local
    /// preference order
    pub fn build_offer(&self, rtp_local: SocketAddr, rtcp_local: SocketAddr) -> SdpSession {
        let formats = self
            .codecs
            .offer_formats()
            .into_iter()
            .map(String::from)
            .collect();
        let wanted = SdpSession::new(Origin::new(0, 0, rtp_local.ip()), "-")
            .with_media(MediaDescription::new(MEDIA_AUDIO, 0, PROTO_RTP_AVP, formats));
        self.build_answer(&wanted, rtp_local, rtcp_local).0
    }

    /// Answers the offer in `request` on an already allocated media pair.
    ///
    /// The pair is handed back on success. When the offer itself is unusable
    /// (no body, malformed SDP) the pair is untouched and returned inside the
    /// error. When the answer cannot be built the pair is closed, and close
    /// failures are reported with the error.
    pub fn renegotiate<E: Endpoint, S: Endpoint>(
        &self,
        request: &Request,
        sip: &E,
        pair: MediaPair<S>,
    ) -> std::result::Result<(Negotiated, MediaPair<S>), RenegotiateError<S>> {
        let remote = match parse_offer(request) {
            Ok(remote) => remote,
            Err(error) => {
                debug!("Rejected offer, media pair left open: {}", error);
                return Err(RenegotiateError {
                    error,
                    pair: Some(pair),
                });
            }
        };

        match self.answer_offer(&remote, request, sip, &pair) {
            Ok((response, selected_format)) => {
                info!(
                    "Negotiated format {:?} for call {}",
                    selected_format,
                    request.call_id().map(CallId::value).unwrap_or("-")
                );
                let negotiated = Negotiated {
                    response,
                    selected_format,
                    ptime: self.config.ptime,
                };
                Ok((negotiated, pair))
            }
            Err(primary) => Err(RenegotiateError {
                error: close_after_failure(primary, pair),
                pair: None,
            }),
        }
    }

    /// Allocates a media pair on the SIP endpoint's IP and answers on it.
    /// The pair is closed on any failure.
    pub async fn negotiate_fresh<E: Endpoint>(
        &self,
        request: &Request,
        sip: &E,
    ) -> Result<(Negotiated, MediaPair)> {
        let pair = allocate_for(sip)
            .await
            .map_err(|e| Error::from(e).context("generating RTP and RTCP connections"))?;
        self.renegotiate(request, sip, pair).map_err(|failed| match failed.pair {
            Some(pair) => close_after_failure(failed.error, pair),
            None => failed.error,
        })
    }

    fn answer_offer<E: Endpoint, S: Endpoint>(
        &self,
        remote: &SdpSession,
        request: &Request,
        sip: &E,
        pair: &MediaPair<S>,
    ) -> Result<(Response, String)> {
        let (local, selected_format) = self.build_answer(remote, pair.rtp_addr()?, pair.rtcp_addr()?);
        let response = self
            .sdp_response(&local, request, sip)
            .map_err(|e| e.context("creating SDP response"))?;
        Ok((response, selected_format))
    }

    /// `200 OK` to `request` carrying `local` as its body
    pub fn sdp_response<E: Endpoint>(
        &self,
        local: &SdpSession,
        request: &Request,
        sip: &E,
    ) -> Result<Response> {
        let mut response = Response::from_request(request, StatusCode::OK)?;
        if let Some(to) = response.to_mut() {
            if to.tag().is_none() {
                to.set_tag(self.ids.tag());
            }
        }

        let contact = Uri::sip_addr(sip.local_addr()?).with_user(self.config.contact_user.clone());
        Ok(response
            .with_header(TypedHeader::Contact(Address::new(contact)))
            .with_header(TypedHeader::UserAgent(self.config.user_agent.clone()))
            .with_header(TypedHeader::ContentType(CONTENT_TYPE_SDP.to_string()))
            .with_body(local.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::DEFAULT_CODECS;
    use crate::ids::SequentialIds;

    fn offer(formats: &str, extra: &str) -> SdpSession {
        format!(
            "v=0\r\no=- 7 7 IN IP4 198.51.100.7\r\ns=-\r\nc=IN IP4 203.0.113.5\r\nt=0 0\r\n\
             m=audio 40000 RTP/AVP {}\r\n{}",
            formats, extra
        )
        .parse()
        .unwrap()
    }

    fn rtp() -> SocketAddr {
        "192.0.2.10:30000".parse().unwrap()
    }

    fn rtcp() -> SocketAddr {
        "192.0.2.10:30001".parse().unwrap()
    }

    #[test]
    fn test_answer_keeps_offer_order() {
        let config = GatewayConfig::default();
        let engine = NegotiationEngine::new(&DEFAULT_CODECS, &config);
        let (answer, selected) = engine.build_answer(&offer("0 18 106 8", ""), rtp(), rtcp());

        assert_eq!(selected, "0");
        let media = &answer.media_descriptions[0];
        assert_eq!(media.formats, vec!["0", "106", "8"]);
        let rtpmaps: Vec<_> = media.attributes_named("rtpmap").filter_map(|a| a.value.as_deref()).collect();
        assert_eq!(rtpmaps, vec!["0 PCMU/8000", "106 opus/48000/2", "8 PCMA/8000"]);
    }

    #[test]
    fn test_answer_attributes() {
        let config = GatewayConfig::default();
        let ids = SequentialIds::new();
        let engine = NegotiationEngine::new(&DEFAULT_CODECS, &config).with_ids(&ids);
        let (answer, _) = engine.build_answer(&offer("8", ""), rtp(), rtcp());

        assert_eq!(
            answer.to_string(),
            "v=0\r\n\
             o=- 1 2 IN IP4 192.0.2.10\r\n\
             s=sipbridge-rtp\r\n\
             c=IN IP4 192.0.2.10\r\n\
             t=0 0\r\n\
             m=audio 30000 RTP/AVP 8\r\n\
             a=rtpmap:8 PCMA/8000\r\n\
             a=ptime:20\r\n\
             a=minptime:10\r\n\
             a=sendrecv\r\n\
             a=rtcp:30001 IN IP4 192.0.2.10\r\n"
        );
    }

    #[test]
    fn test_answer_without_common_format() {
        let config = GatewayConfig::default();
        let engine = NegotiationEngine::new(&DEFAULT_CODECS, &config);
        let (answer, selected) = engine.build_answer(&offer("18 97", ""), rtp(), rtcp());
        assert_eq!(selected, "");
        assert!(answer.media_descriptions[0].formats.is_empty());

        let mut no_media = offer("0", "");
        no_media.media_descriptions.clear();
        let (answer, selected) = engine.build_answer(&no_media, rtp(), rtcp());
        assert_eq!(selected, "");
        assert_eq!(answer.media_descriptions.len(), 1);
    }

    #[test]
    fn test_ipv6_answer() {
        let config = GatewayConfig::default();
        let engine = NegotiationEngine::new(&DEFAULT_CODECS, &config);
        let (answer, _) = engine.build_answer(
            &offer("0", ""),
            "[2001:db8::10]:30000".parse().unwrap(),
            "[2001:db8::10]:30001".parse().unwrap(),
        );
        assert_eq!(answer.origin.addr_type, "IP6");
        assert_eq!(
            answer.media_descriptions[0].attribute_value("rtcp"),
            Some("30001 IN IP6 2001:db8::10")
        );
    }

    #[test]
    fn test_offer_lists_local_preference() {
        let config = GatewayConfig::default();
        let engine = NegotiationEngine::new(&DEFAULT_CODECS, &config);
        let offer = engine.build_offer(rtp(), rtcp());
        assert_eq!(offer.media_descriptions[0].formats, vec!["106", "105", "96", "8", "0"]);
        assert_eq!(offer.media_descriptions[0].port, 30000);
    }

    #[test]
    fn test_parse_remote() {
        let body = offer("106 9 0", "a=ptime:30\r\na=rtcp:40001 IN IP4 203.0.113.9\r\n").to_string();
        let remote = parse_remote(body.as_bytes()).unwrap();
        assert_eq!(remote.selected_format, "106");
        assert_eq!(remote.ptime, 30);
        assert_eq!(remote.rtp.socket_addr(), Some("203.0.113.5:40000".parse().unwrap()));
        assert_eq!(
            remote.rtcp.and_then(|a| a.socket_addr()),
            Some("203.0.113.9:40001".parse().unwrap())
        );
    }

    #[test]
    fn test_parse_remote_fallbacks() {
        let body = "v=0\r\no=- 1 1 IN IP4 198.51.100.7\r\ns=-\r\nt=0 0\r\n\
                    m=audio 5004 RTP/AVP 0\r\na=ptime:abc\r\na=rtcp:5005\r\n";
        let remote = parse_remote(body.as_bytes()).unwrap();
        assert_eq!(remote.rtp.ip, Some("198.51.100.7".parse().unwrap()));
        assert_eq!(remote.ptime, 20);
        assert_eq!(remote.rtcp, Some(MediaAddress { ip: None, port: 5005 }));

        let body = offer("0", "a=rtcp:abc IN IP4 203.0.113.9\r\n").to_string();
        assert_eq!(parse_remote(body.as_bytes()).unwrap().rtcp, None);
    }

    #[test]
    fn test_parse_remote_errors() {
        assert!(matches!(parse_remote(b""), Err(Error::Parse(_))));
        assert!(matches!(parse_remote(b"garbage"), Err(Error::Parse(_))));
        let no_media = "v=0\r\no=- 1 1 IN IP4 198.51.100.7\r\ns=-\r\nt=0 0\r\n";
        assert!(matches!(parse_remote(no_media.as_bytes()), Err(Error::NoMedia)));
        let no_formats = format!("{}m=audio 5004 RTP/AVP\r\n", no_media);
        assert!(matches!(parse_remote(no_formats.as_bytes()), Err(Error::NoFormats)));
    }
}
