//! Answering a `401 Unauthorized` with a re-signed request.

use rand::Rng;
use sipbridge_sip_core::prelude::*;
use tracing::{debug, info};

use crate::credentials::Credentials;
use crate::digest::{compute_response, DigestChallenge, DigestInput};
use crate::error::{AuthError, Result};

/// Returns a copy of `request` with its CSeq bumped by one and, when
/// credentials are configured, an `Authorization` header answering
/// `challenge`.
///
/// Missing or incomplete credentials are the "no authentication configured"
/// case: the bumped copy comes back without an `Authorization` header and
/// without error. The original request is never modified.
pub fn authorize(
    challenge: Option<&str>,
    credentials: Option<&Credentials>,
    request: &Request,
) -> Result<Request> {
    let cseq = request.cseq().ok_or(AuthError::MissingHeader("CSeq"))?;
    let bumped = cseq.next(cseq.method.clone())?;

    let mut authorized = request.clone();
    authorized.set_header(TypedHeader::CSeq(bumped));

    let credentials = match credentials {
        Some(creds) if creds.is_complete() => creds,
        _ => {
            debug!("No credentials configured, resending {} without Authorization", request.method);
            return Ok(authorized);
        }
    };

    let challenge = match challenge {
        Some(value) if !value.trim().is_empty() => value,
        _ => return Err(AuthError::MissingChallenge),
    };
    let challenge: DigestChallenge = challenge.parse()?;

    let cnonce = format!("{:08x}", rand::thread_rng().gen::<u32>());
    let method = request.method.to_string();
    let response = compute_response(
        &challenge,
        DigestInput {
            method: &method,
            uri: &credentials.host,
            username: &credentials.username,
            password: credentials.password(),
            cnonce: &cnonce,
        },
    )?;

    info!(
        "Answering digest challenge for {}@{} (realm {})",
        credentials.username, credentials.host, challenge.realm
    );
    authorized.push_header(TypedHeader::Authorization(response.to_string()));
    Ok(authorized)
}
