//! In-dialog and registration request construction.
//!
//! Every method is a pure transform of the messages passed in; the builder
//! keeps no dialog state of its own. Identifiers that must match an earlier
//! transaction (ACK and CANCEL branches, CSeq numbers) are copied from those
//! messages, everything else comes from the [`IdGenerator`].

use std::net::SocketAddr;
use std::sync::Arc;

use sipbridge_auth_core::Credentials;
use sipbridge_sip_core::prelude::*;
use tracing::debug;

use crate::codec::CodecTable;
use crate::config::GatewayConfig;
use crate::error::{Error, Result};
use crate::ids::{IdGenerator, RandomIds};
use crate::negotiation::NegotiationEngine;

/// Builds SIP requests from configuration and earlier messages
#[derive(Clone)]
pub struct RequestBuilder {
    config: Arc<GatewayConfig>,
    ids: Arc<dyn IdGenerator>,
}

impl RequestBuilder {
    pub fn new(config: GatewayConfig) -> Self {
        RequestBuilder {
            config: Arc::new(config),
            ids: Arc::new(RandomIds),
        }
    }

    pub fn with_ids(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn ids(&self) -> &dyn IdGenerator {
        self.ids.as_ref()
    }

    /// A negotiation engine sharing this builder's configuration and ids
    pub fn engine<'a>(&'a self, codecs: &'a CodecTable) -> NegotiationEngine<'a> {
        NegotiationEngine::new(codecs, &self.config).with_ids(self.ids.as_ref())
    }

    /// A UDP Via for `local` with a fresh branch, asking for `rport`
    pub fn via(&self, local: SocketAddr) -> Via {
        Via::new(
            "UDP",
            Host::Address(local.ip()),
            Some(local.port()),
            vec![Param::branch(self.ids.branch()), Param::Rport(None)],
        )
    }

    pub(crate) fn user_agent(&self) -> TypedHeader {
        TypedHeader::UserAgent(self.config.user_agent.clone())
    }

    /// ACK for the final response to `invite`.
    ///
    /// Sent to the response's Contact, else the INVITE's Contact, else the
    /// INVITE's Request-URI. The Via branch is the INVITE's; From, To and
    /// Call-ID come from the response so the far end's tag is kept.
    pub fn ack(&self, invite: &Request, response: &Response, local: SocketAddr) -> Result<Request> {
        let target = response
            .contact()
            .or_else(|| invite.contact())
            .map(|contact| contact.uri.clone())
            .unwrap_or_else(|| invite.uri.clone());

        let invite_branch = invite
            .via()
            .and_then(Via::branch)
            .ok_or(Error::MissingHeader("Via"))?;
        let mut via = self.via(local);
        via.set_branch(invite_branch);

        let from = response.from().ok_or(Error::MissingHeader("From"))?;
        let to = response.to().ok_or(Error::MissingHeader("To"))?;
        let call_id = response.call_id().ok_or(Error::MissingHeader("Call-ID"))?;
        let cseq = invite.cseq().ok_or(Error::MissingHeader("CSeq"))?;
        let max_forwards = invite
            .max_forwards()
            .unwrap_or(MaxForwards(self.config.max_forwards));

        debug!("Building ACK for {} to {}", call_id.value(), target);
        Ok(Request::new(Method::Ack, target)
            .with_header(TypedHeader::Via(via))
            .with_header(TypedHeader::From(from.clone()))
            .with_header(TypedHeader::To(to.clone()))
            .with_header(TypedHeader::CallId(call_id.clone()))
            .with_header(TypedHeader::CSeq(cseq.with_method(Method::Ack)))
            .with_header(TypedHeader::MaxForwards(max_forwards))
            .with_header(self.user_agent())
            .with_header(TypedHeader::ContentLength(0)))
    }

    /// BYE toward the callee of a call we relayed: the ACK's From becomes
    /// the To and vice versa.
    pub fn bye_to_uas(&self, invite: &Request, last_ack: &Request, local: SocketAddr) -> Result<Request> {
        self.bye(invite, last_ack, local, true)
    }

    /// BYE toward the caller: From and To are copied from the ACK as they are.
    pub fn bye_to_uac(&self, invite: &Request, last_ack: &Request, local: SocketAddr) -> Result<Request> {
        self.bye(invite, last_ack, local, false)
    }

    fn bye(&self, invite: &Request, last_ack: &Request, local: SocketAddr, swap: bool) -> Result<Request> {
        let target = invite.contact().ok_or(Error::MissingHeader("Contact"))?.uri.clone();
        let ack_from = last_ack.from().ok_or(Error::MissingHeader("From"))?;
        let ack_to = last_ack.to().ok_or(Error::MissingHeader("To"))?;
        let call_id = last_ack.call_id().ok_or(Error::MissingHeader("Call-ID"))?;
        let cseq = last_ack.cseq().ok_or(Error::MissingHeader("CSeq"))?.next(Method::Bye)?;

        let (to, from) = if swap { (ack_from, ack_to) } else { (ack_to, ack_from) };

        let mut bye = Request::new(Method::Bye, target);
        bye.version = invite.version.clone();
        debug!("Building BYE for {} (swapped: {})", call_id.value(), swap);
        Ok(bye
            .with_header(TypedHeader::Via(self.via(local)))
            .with_header(TypedHeader::To(to.clone()))
            .with_header(TypedHeader::From(from.clone()))
            .with_header(TypedHeader::CallId(call_id.clone()))
            .with_header(TypedHeader::CSeq(cseq))
            .with_header(TypedHeader::MaxForwards(MaxForwards(self.config.max_forwards)))
            .with_header(self.user_agent())
            .with_header(TypedHeader::ContentLength(0)))
    }

    /// CANCEL for an INVITE we sent. The Via is reused unchanged so the
    /// CANCEL matches the INVITE transaction.
    pub fn cancel(&self, invite: &Request) -> Result<Request> {
        let via = invite.via().ok_or(Error::MissingHeader("Via"))?;
        let from = invite.from().ok_or(Error::MissingHeader("From"))?;
        let to = invite.to().ok_or(Error::MissingHeader("To"))?;
        let call_id = invite.call_id().ok_or(Error::MissingHeader("Call-ID"))?;
        let cseq = invite.cseq().ok_or(Error::MissingHeader("CSeq"))?;

        let mut cancel = Request::new(Method::Cancel, invite.uri.clone())
            .with_header(TypedHeader::Via(via.clone()));
        if let Some(max_forwards) = invite.max_forwards() {
            cancel.push_header(TypedHeader::MaxForwards(max_forwards));
        }
        debug!("Building CANCEL for {}", call_id.value());
        Ok(cancel
            .with_header(TypedHeader::From(from.clone()))
            .with_header(TypedHeader::To(to.clone()))
            .with_header(TypedHeader::CallId(call_id.clone()))
            .with_header(TypedHeader::CSeq(cseq.with_method(Method::Cancel)))
            .with_header(self.user_agent())
            .with_header(TypedHeader::ContentLength(0)))
    }

    /// REGISTER of `credentials.username` at `credentials.host`.
    ///
    /// A non-empty `call_id` is reused so refreshes keep their dialog
    /// identity; otherwise a new one is generated.
    pub fn register(&self, credentials: &Credentials, call_id: Option<&str>, local: SocketAddr) -> Result<Request> {
        let registrar_host: Host = credentials.host.parse()?;
        let registrar = Uri::new(Scheme::Sip, registrar_host.clone()).with_port_opt(credentials.port);
        let route = registrar.clone().with_parameter(Param::Lr);
        let contact = Uri::sip_addr(local)
            .with_user(credentials.username.clone())
            .with_parameter(Param::Ob);
        let aor = Uri::new(Scheme::Sip, registrar_host).with_user(credentials.username.clone());

        let call_id = match call_id {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => self.ids.call_id(),
        };
        let mut from = Address::new(aor.clone());
        from.set_tag(self.ids.tag());
        let cseq = self.ids.cseq_seed(self.config.register_cseq_range);

        debug!("Building REGISTER for {}@{}", credentials.username, credentials.host);
        Ok(Request::new(Method::Register, registrar)
            .with_header(TypedHeader::Via(self.via(local)))
            .with_header(TypedHeader::MaxForwards(MaxForwards(self.config.max_forwards)))
            .with_header(TypedHeader::Route(Address::new(route)))
            .with_header(TypedHeader::CSeq(CSeq::new(cseq, Method::Register)))
            .with_header(self.user_agent())
            .with_header(TypedHeader::Expires(self.config.register_expires))
            .with_header(TypedHeader::Allow(self.config.allow.clone()))
            .with_header(TypedHeader::Contact(Address::new(contact)))
            .with_header(TypedHeader::CallId(CallId::new(call_id)))
            .with_header(TypedHeader::From(from))
            .with_header(TypedHeader::To(Address::new(aor))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequentialIds;

    fn builder() -> RequestBuilder {
        RequestBuilder::new(GatewayConfig::default()).with_ids(Arc::new(SequentialIds::new()))
    }

    fn local() -> SocketAddr {
        "192.0.2.1:5060".parse().unwrap()
    }

    #[test]
    fn test_via_has_fresh_branch_and_rport() {
        let builder = builder();
        let first = builder.via(local());
        let second = builder.via(local());
        assert_ne!(first.branch(), second.branch());
        assert!(first.has_rport());
        assert_eq!(first.to_string(), "SIP/2.0/UDP 192.0.2.1:5060;branch=z9hG4bK-1;rport");
    }

    #[test]
    fn test_register_headers() {
        let creds = Credentials::new("alice", "pbx.example.com", Some(5080)).with_password("secret");
        let register = builder().register(&creds, None, local()).unwrap();

        let text = register.to_string();
        assert!(text.starts_with("REGISTER sip:pbx.example.com:5080 SIP/2.0\r\n"));
        assert!(text.contains("Route: <sip:pbx.example.com:5080;lr>\r\n"));
        assert!(text.contains("Contact: <sip:alice@192.0.2.1:5060;ob>\r\n"));
        assert!(text.contains("From: <sip:alice@pbx.example.com>;tag=tag-2\r\n"));
        assert!(text.contains("To: <sip:alice@pbx.example.com>\r\n"));
        assert!(text.contains("Call-ID: call-1\r\n"));
        assert!(text.contains("CSeq: 4 REGISTER\r\n"));
        assert!(text.contains("Expires: 300\r\n"));
        assert!(text.contains("Max-Forwards: 70\r\n"));
        assert!(text.contains("User-Agent: sipbridge/0.1\r\n"));
        assert!(!register.has_header(&HeaderName::ContentLength));
    }

    #[test]
    fn test_register_reuses_call_id() {
        let creds = Credentials::new("alice", "10.0.0.1", None);
        let builder = builder();
        let register = builder.register(&creds, Some("existing@host"), local()).unwrap();
        assert_eq!(register.call_id().map(CallId::value), Some("existing@host"));

        let fresh = builder.register(&creds, Some(""), local()).unwrap();
        assert_ne!(fresh.call_id().map(CallId::value), Some(""));
    }

    #[test]
    fn test_register_rejects_bad_host() {
        let creds = Credentials::new("alice", "bad host", None);
        assert!(matches!(builder().register(&creds, None, local()), Err(Error::Sip(_))));
    }

    #[test]
    fn test_missing_headers_are_errors() {
        let bare = Request::new(Method::Invite, "sip:bob@192.0.2.4".parse().unwrap());
        let builder = builder();
        assert!(matches!(builder.cancel(&bare), Err(Error::MissingHeader("Via"))));
        assert!(matches!(builder.bye_to_uas(&bare, &bare, local()), Err(Error::MissingHeader("Contact"))));
        let response = Response::new(StatusCode::OK);
        assert!(matches!(builder.ack(&bare, &response, local()), Err(Error::MissingHeader("Via"))));
    }
}
