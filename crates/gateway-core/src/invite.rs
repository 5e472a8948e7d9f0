//! Outbound INVITE for relaying a call to another user.
//!
//! The gateway answers the caller on one media pair and offers the callee a
//! second one, so building the outbound INVITE allocates sockets. They belong
//! to the returned [`OutboundInvite`]; if anything fails after the bind they
//! are closed before the error is returned.

use std::net::{IpAddr, SocketAddr};

use sipbridge_rtp_core::{allocate, Endpoint, MediaPair};
use sipbridge_sip_core::prelude::*;
use tracing::{debug, info};

use crate::builder::RequestBuilder;
use crate::codec::CodecTable;
use crate::directory::UserDirectory;
use crate::error::{Error, Result};
use crate::negotiation::{close_after_failure, CONTENT_TYPE_SDP};

/// An INVITE ready to send, with the media pair its offer describes
#[derive(Debug)]
pub struct OutboundInvite {
    pub request: Request,
    pub media: MediaPair,
    /// Where the request should be sent
    pub destination: SocketAddr,
}

impl RequestBuilder {
    /// Builds a new INVITE toward `destination` for the call in `inbound`.
    ///
    /// The outbound leg is a new dialog: fresh Call-ID, branch and CSeq.
    /// From is copied; To keeps the called user but points at
    /// `destination`. Max-Forwards is the inbound value minus one, or
    /// [`TooManyHops`](Error::TooManyHops) when it is already 0. Media is
    /// bound on `rtp_host`.
    pub async fn invite<E: Endpoint>(
        &self,
        codecs: &CodecTable,
        sip: &E,
        rtp_host: IpAddr,
        inbound: &Request,
        destination: SocketAddr,
    ) -> Result<OutboundInvite> {
        let from = inbound.from().ok_or(Error::MissingHeader("From"))?;
        let to = inbound.to().ok_or(Error::MissingHeader("To"))?;
        let max_forwards = inbound
            .max_forwards()
            .unwrap_or(MaxForwards(self.config().max_forwards))
            .decremented()
            .ok_or(Error::TooManyHops)?;
        let local = sip.local_addr()?;

        let media = allocate(SocketAddr::new(rtp_host, 0))
            .await
            .map_err(|e| Error::from(e).context("generating local SDP"))?;

        let offer = match self.offer_body(codecs, &media) {
            Ok(offer) => offer,
            Err(e) => return Err(close_after_failure(e.context("generating local SDP"), media)),
        };

        let target = Uri::new(Scheme::Sip, Host::Address(destination.ip()))
            .with_user_opt(to.uri.user.clone())
            .with_port(destination.port());
        let mut callee_uri = target.clone();
        callee_uri.scheme = to.uri.scheme;
        let callee = Address::new(callee_uri).with_display_name(to.display_name.clone());
        let contact = Uri::sip_addr(local).with_user_opt(from.uri.user.clone());
        let call_id = CallId::new(self.ids().call_id());
        let cseq = CSeq::new(self.ids().cseq_seed(self.config().invite_cseq_range), Method::Invite);

        debug!("Building INVITE {} for {} toward {}", call_id.value(), target, destination);
        let request = Request::new(Method::Invite, target)
            .with_header(TypedHeader::Via(self.via(local)))
            .with_header(TypedHeader::CallId(call_id))
            .with_header(TypedHeader::CSeq(cseq))
            .with_header(TypedHeader::From(from.clone()))
            .with_header(TypedHeader::To(callee))
            .with_header(TypedHeader::Contact(Address::new(contact)))
            .with_header(TypedHeader::MaxForwards(max_forwards))
            .with_header(TypedHeader::Allow(self.config().allow.clone()))
            .with_header(TypedHeader::Supported(self.config().supported.clone()))
            .with_header(self.user_agent())
            .with_header(TypedHeader::ContentType(CONTENT_TYPE_SDP.to_string()))
            .with_header(TypedHeader::Accept(CONTENT_TYPE_SDP.to_string()))
            .with_body(offer);

        Ok(OutboundInvite {
            request,
            media,
            destination,
        })
    }

    /// Looks up the called user (the To user part) in `directory` and
    /// builds the INVITE toward them. Media is bound on the configured
    /// `rtp_host`, or on the SIP socket's IP.
    pub async fn forward_invite<D, E>(
        &self,
        codecs: &CodecTable,
        directory: &D,
        sip: &E,
        inbound: &Request,
    ) -> Result<OutboundInvite>
    where
        D: UserDirectory + ?Sized,
        E: Endpoint,
    {
        let to = inbound.to().ok_or(Error::MissingHeader("To"))?;
        let user = to.uri.user.as_deref().unwrap_or_default();
        let destination = directory
            .resolve(user)
            .ok_or_else(|| Error::UserNotFound(user.to_string()))?;
        let rtp_host = match self.config().rtp_host {
            Some(ip) => ip,
            None => sip.local_addr()?.ip(),
        };

        info!("Forwarding INVITE for {:?} to {}", user, destination);
        self.invite(codecs, sip, rtp_host, inbound, destination).await
    }

    fn offer_body(&self, codecs: &CodecTable, media: &MediaPair) -> Result<String> {
        let offer = self
            .engine(codecs)
            .build_offer(media.rtp_addr()?, media.rtcp_addr()?);
        Ok(offer.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use sipbridge_rtp_core::{Error as MediaError, SocketRole};
    use sipbridge_sip_core::sdp::SdpSession;
    use tokio::net::UdpSocket;

    use super::*;
    use crate::codec::DEFAULT_CODECS;
    use crate::config::GatewayConfig;
    use crate::directory::StaticDirectory;
    use crate::ids::SequentialIds;

    fn builder() -> RequestBuilder {
        RequestBuilder::new(GatewayConfig::default()).with_ids(Arc::new(SequentialIds::new()))
    }

    fn inbound(max_forwards: Option<u8>) -> Request {
        let mut from = Address::new("sip:alice@192.0.2.50".parse().unwrap())
            .with_display_name(Some("Alice".to_string()));
        from.set_tag("caller-tag");
        let mut request = Request::new(Method::Invite, "sip:bob@192.0.2.1".parse().unwrap())
            .with_header(TypedHeader::Via(
                "SIP/2.0/UDP 192.0.2.50:5060;branch=z9hG4bKcaller".parse().unwrap(),
            ))
            .with_header(TypedHeader::From(from))
            .with_header(TypedHeader::To(Address::new("sip:bob@192.0.2.1".parse().unwrap())))
            .with_header(TypedHeader::CallId(CallId::new("inbound-call")))
            .with_header(TypedHeader::CSeq(CSeq::new(1, Method::Invite)));
        if let Some(hops) = max_forwards {
            request.push_header(TypedHeader::MaxForwards(MaxForwards(hops)));
        }
        request
    }

    fn lost_rtcp_race(err: &Error) -> bool {
        matches!(err.root(), Error::Media(MediaError::Bind { role: SocketRole::Rtcp, .. }))
    }

    async fn invite_with_retries(builder: &RequestBuilder, sip: &UdpSocket, request: &Request) -> OutboundInvite {
        let destination: SocketAddr = "127.0.0.1:5090".parse().unwrap();
        for _ in 0..5 {
            match builder
                .invite(&DEFAULT_CODECS, sip, "127.0.0.1".parse().unwrap(), request, destination)
                .await
            {
                Ok(invite) => return invite,
                Err(e) if lost_rtcp_race(&e) => continue,
                Err(e) => panic!("invite failed: {e}"),
            }
        }
        panic!("could not allocate media for the INVITE");
    }

    #[tokio::test]
    async fn test_invite_headers_and_offer() {
        let sip = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let local = sip.local_addr().unwrap();
        let invite = invite_with_retries(&builder(), &sip, &inbound(Some(70))).await;
        let request = &invite.request;

        assert_eq!(request.to_string().lines().next(), Some("INVITE sip:bob@127.0.0.1:5090 SIP/2.0"));
        assert_eq!(invite.destination.port(), 5090);
        assert_eq!(request.max_forwards(), Some(MaxForwards(69)));
        assert_eq!(request.cseq().map(|c| c.method.clone()), Some(Method::Invite));
        assert_ne!(request.call_id().map(CallId::value), Some("inbound-call"));

        let from = request.from().unwrap();
        assert_eq!(from.tag(), Some("caller-tag"));
        assert_eq!(from.display_name.as_deref(), Some("Alice"));
        let to = request.to().unwrap();
        assert_eq!(to.uri.to_string(), "sip:bob@127.0.0.1:5090");
        assert!(to.params.is_empty());
        assert_eq!(request.contact().unwrap().uri, Uri::sip_addr(local).with_user("alice"));

        let text = request.to_string();
        assert!(text.contains("Supported: replaces,100rel,timer,norefersub\r\n"));
        assert!(text.contains("Allow: PRACK,INVITE,ACK,BYE,CANCEL,UPDATE,INFO,SUBSCRIBE,NOTIFY,REFER,MESSAGE,OPTIONS\r\n"));
        assert!(text.contains("Content-Type: application/sdp\r\n"));
        assert!(text.contains("Accept: application/sdp\r\n"));

        let offer = SdpSession::parse(request.body()).unwrap();
        let media = &offer.media_descriptions[0];
        assert_eq!(media.formats, vec!["106", "105", "96", "8", "0"]);
        assert_eq!(media.port, invite.media.rtp_addr().unwrap().port());
        let rtcp_port = invite.media.rtcp_addr().unwrap().port();
        assert_eq!(media.attribute_value("rtcp"), Some(format!("{} IN IP4 127.0.0.1", rtcp_port).as_str()));

        invite.media.close().unwrap();
    }

    #[tokio::test]
    async fn test_invite_without_max_forwards_uses_default() {
        let sip = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let invite = invite_with_retries(&builder(), &sip, &inbound(None)).await;
        assert_eq!(invite.request.max_forwards(), Some(MaxForwards(69)));
        invite.media.close().unwrap();
    }

    #[tokio::test]
    async fn test_exhausted_max_forwards() {
        let sip = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let err = builder()
            .invite(&DEFAULT_CODECS, &sip, "127.0.0.1".parse().unwrap(), &inbound(Some(0)), "127.0.0.1:5090".parse().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TooManyHops));
    }

    #[tokio::test]
    async fn test_bind_failure_is_annotated() {
        let sip = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        // TEST-NET-1 is never a local address
        let err = builder()
            .invite(&DEFAULT_CODECS, &sip, "192.0.2.1".parse().unwrap(), &inbound(Some(70)), "127.0.0.1:5090".parse().unwrap())
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("generating local SDP: "));
        assert!(matches!(err.root(), Error::Media(MediaError::Bind { role: SocketRole::Rtp, .. })));
    }

    #[tokio::test]
    async fn test_forward_invite_unknown_user() {
        let sip = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let directory = StaticDirectory::new();
        let err = builder()
            .forward_invite(&DEFAULT_CODECS, &directory, &sip, &inbound(Some(70)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UserNotFound(user) if user == "bob"));
    }

    #[tokio::test]
    async fn test_forward_invite_resolves_callee() {
        let sip = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let bob: SocketAddr = "127.0.0.1:5099".parse().unwrap();
        let directory: StaticDirectory = [("bob", bob)].into_iter().collect();
        let builder = builder();

        let mut last = None;
        for _ in 0..5 {
            match builder.forward_invite(&DEFAULT_CODECS, &directory, &sip, &inbound(Some(10))).await {
                Ok(invite) => {
                    last = Some(invite);
                    break;
                }
                Err(e) if lost_rtcp_race(&e) => continue,
                Err(e) => panic!("forward failed: {e}"),
            }
        }
        let invite = last.expect("could not allocate media");
        assert_eq!(invite.destination, bob);
        assert_eq!(invite.request.uri.port, Some(5099));
        assert_eq!(invite.request.max_forwards(), Some(MaxForwards(9)));
        assert_eq!(invite.media.rtp_addr().unwrap().ip(), sip.local_addr().unwrap().ip());
        invite.media.close().unwrap();
    }
}
