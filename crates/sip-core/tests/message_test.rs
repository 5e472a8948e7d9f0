//! Wire format of requests and responses built from typed headers

use std::str::FromStr;

use proptest::prelude::*;
use sipbridge_sip_core::prelude::*;

fn invite() -> Request {
    Request::new(Method::Invite, Uri::from_str("sip:bob@biloxi.example.com").unwrap())
        .with_header(TypedHeader::Via(
            Via::from_str("SIP/2.0/UDP pc33.atlanta.example.com;branch=z9hG4bK776asdhds").unwrap(),
        ))
        .with_header(TypedHeader::MaxForwards(MaxForwards(70)))
        .with_header(TypedHeader::To(Address::from_str("Bob <sip:bob@biloxi.example.com>").unwrap()))
        .with_header(TypedHeader::From(
            Address::from_str("Alice <sip:alice@atlanta.example.com>;tag=1928301774").unwrap(),
        ))
        .with_header(TypedHeader::CallId(CallId::new("a84b4c76e66710@pc33.atlanta.example.com")))
        .with_header(TypedHeader::CSeq(CSeq::new(314159, Method::Invite)))
        .with_header(TypedHeader::Contact(Address::from_str("<sip:alice@pc33.atlanta.example.com>").unwrap()))
        .with_header(TypedHeader::ContentType("application/sdp".to_string()))
        .with_body("v=0\r\n")
}

#[test]
fn test_request_wire_format() {
    assert_eq!(
        invite().to_string(),
        "INVITE sip:bob@biloxi.example.com SIP/2.0\r\n\
         Via: SIP/2.0/UDP pc33.atlanta.example.com;branch=z9hG4bK776asdhds\r\n\
         Max-Forwards: 70\r\n\
         To: Bob <sip:bob@biloxi.example.com>\r\n\
         From: Alice <sip:alice@atlanta.example.com>;tag=1928301774\r\n\
         Call-ID: a84b4c76e66710@pc33.atlanta.example.com\r\n\
         CSeq: 314159 INVITE\r\n\
         Contact: <sip:alice@pc33.atlanta.example.com>\r\n\
         Content-Type: application/sdp\r\n\
         Content-Length: 5\r\n\
         \r\n\
         v=0\r\n"
    );
}

#[test]
fn test_response_copies_dialog_headers() {
    let request = invite();
    let response = Response::from_request(&request, StatusCode::RINGING).unwrap();

    assert_eq!(response.status_code(), 180);
    assert_eq!(response.via(), request.via());
    assert_eq!(response.from(), request.from());
    assert_eq!(response.call_id(), request.call_id());
    assert_eq!(response.cseq(), request.cseq());
    assert!(response.contact().is_none());
    assert!(response.to_string().starts_with("SIP/2.0 180 Ringing\r\n"));
}

#[test]
fn test_response_requires_via() {
    let bare = Request::new(Method::Options, Uri::from_str("sip:example.com").unwrap());
    assert_eq!(
        Response::from_request(&bare, StatusCode::OK).unwrap_err(),
        Error::MissingHeader("Via")
    );
}

#[test]
fn test_clone_is_independent() {
    let original = invite();
    let mut copy = original.clone();
    copy.set_header(TypedHeader::CSeq(CSeq::new(314160, Method::Invite)));

    assert_eq!(original.cseq().map(|c| c.seq), Some(314159));
    assert_eq!(copy.cseq().map(|c| c.seq), Some(314160));
    // set_header replaces in place
    assert_eq!(copy.headers.len(), original.headers.len());
}

#[test]
fn test_cseq_does_not_wrap() {
    let last = CSeq::new(u32::MAX, Method::Invite);
    assert_eq!(last.next(Method::Invite), Err(Error::CSeqExhausted(u32::MAX)));
}

#[test]
fn test_serde_round_trip() {
    let request = invite();
    let json = serde_json::to_string(&request).unwrap();
    let back: Request = serde_json::from_str(&json).unwrap();
    assert_eq!(back, request);
}

proptest! {
    #[test]
    fn test_cseq_next_increments(seq in 1u32..u32::MAX) {
        let next = CSeq::new(seq, Method::Invite).next(Method::Bye).unwrap();
        prop_assert_eq!(next.seq, seq + 1);
        prop_assert_eq!(next.method, Method::Bye);
    }

    #[test]
    fn test_uri_display_parses_back(
        user in "[a-z][a-z0-9]{0,11}",
        host in "[a-z]{1,10}\\.example\\.com",
        port in proptest::option::of(1u16..),
    ) {
        let uri = Uri::new(Scheme::Sip, Host::Domain(host)).with_user(user).with_port_opt(port);
        prop_assert_eq!(Uri::from_str(&uri.to_string()).unwrap(), uri);
    }
}
