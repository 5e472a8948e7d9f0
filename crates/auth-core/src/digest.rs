//! HTTP Digest challenge/response (RFC 2617, RFC 7616) as used by SIP.

use std::fmt;
use std::str::FromStr;

use md5::compute as md5_compute;
use nom::{
    branch::alt,
    bytes::complete::{take_till1, take_while1},
    character::complete::{anychar, char, multispace0, multispace1, none_of, space0},
    combinator::{all_consuming, map},
    multi::{many0, separated_list1},
    sequence::{delimited, preceded, separated_pair, tuple},
    IResult,
};
use sha2::{Digest, Sha256};

use crate::error::{AuthError, Result};

/// Digest hash algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Md5,
    Md5Sess,
    Sha256,
    Sha256Sess,
}

impl Algorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Md5 => "MD5",
            Algorithm::Md5Sess => "MD5-sess",
            Algorithm::Sha256 => "SHA-256",
            Algorithm::Sha256Sess => "SHA-256-sess",
        }
    }

    fn is_session(&self) -> bool {
        matches!(self, Algorithm::Md5Sess | Algorithm::Sha256Sess)
    }

    fn hash(&self, input: &str) -> String {
        match self {
            Algorithm::Md5 | Algorithm::Md5Sess => format!("{:x}", md5_compute(input.as_bytes())),
            Algorithm::Sha256 | Algorithm::Sha256Sess => hex::encode(Sha256::digest(input.as_bytes())),
        }
    }
}

impl FromStr for Algorithm {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "MD5" => Ok(Algorithm::Md5),
            "MD5-SESS" => Ok(Algorithm::Md5Sess),
            "SHA-256" => Ok(Algorithm::Sha256),
            "SHA-256-SESS" => Ok(Algorithm::Sha256Sess),
            _ => Err(AuthError::DigestCompute(format!("unsupported algorithm {}", s))),
        }
    }
}

/// A parsed `WWW-Authenticate: Digest ...` challenge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestChallenge {
    pub realm: String,
    pub nonce: String,
    /// Algorithm token as sent; absent means MD5
    pub algorithm: Option<String>,
    /// Offered quality-of-protection values
    pub qop: Vec<String>,
    pub opaque: Option<String>,
    pub stale: bool,
}

impl DigestChallenge {
    /// Resolved algorithm, failing on anything we cannot compute
    pub fn algorithm(&self) -> Result<Algorithm> {
        self.algorithm
            .as_deref()
            .map_or(Ok(Algorithm::Md5), Algorithm::from_str)
    }
}

fn parse_error(challenge: &str, reason: impl Into<String>) -> AuthError {
    AuthError::ChallengeParse {
        challenge: challenge.to_string(),
        reason: reason.into(),
    }
}

fn auth_token(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || "-.!%*_+`'~".contains(c))(input)
}

// quoted-string with backslash escapes (RFC 3261 section 25.1)
fn quoted_string(input: &str) -> IResult<&str, String> {
    map(
        delimited(
            char('"'),
            many0(alt((preceded(char('\\'), anychar), none_of("\"\\")))),
            char('"'),
        ),
        |chars: Vec<char>| chars.into_iter().collect(),
    )(input)
}

fn param_value(input: &str) -> IResult<&str, String> {
    alt((
        quoted_string,
        map(take_till1(|c: char| c == ',' || c == '"' || c.is_whitespace()), String::from),
    ))(input)
}

fn auth_param(input: &str) -> IResult<&str, (&str, String)> {
    separated_pair(auth_token, tuple((space0, char('='), space0)), param_value)(input)
}

fn challenge_nom(input: &str) -> IResult<&str, (&str, Vec<(&str, String)>)> {
    let comma = tuple((multispace0, char(','), multispace0));
    delimited(
        multispace0,
        separated_pair(auth_token, multispace1, separated_list1(comma, auth_param)),
        multispace0,
    )(input)
}

impl FromStr for DigestChallenge {
    type Err = AuthError;

    fn from_str(header_value: &str) -> Result<Self> {
        let (scheme, params) = all_consuming(challenge_nom)(header_value)
            .map(|(_, parsed)| parsed)
            .map_err(|e| parse_error(header_value, format!("malformed challenge ({})", e)))?;
        if !scheme.eq_ignore_ascii_case("digest") {
            return Err(parse_error(header_value, format!("unsupported scheme {}", scheme)));
        }

        let mut realm = None;
        let mut nonce = None;
        let mut algorithm = None;
        let mut qop = Vec::new();
        let mut opaque = None;
        let mut stale = false;

        for (key, value) in params {
            match key.to_ascii_lowercase().as_str() {
                "realm" => realm = Some(value),
                "nonce" => nonce = Some(value),
                "algorithm" => algorithm = Some(value),
                "qop" => {
                    qop = value
                        .split(',')
                        .map(str::trim)
                        .filter(|q| !q.is_empty())
                        .map(str::to_string)
                        .collect()
                }
                "opaque" => opaque = Some(value),
                "stale" => stale = value.eq_ignore_ascii_case("true"),
                _ => {}
            }
        }

        Ok(DigestChallenge {
            realm: realm.ok_or_else(|| parse_error(header_value, "missing realm"))?,
            nonce: nonce.ok_or_else(|| parse_error(header_value, "missing nonce"))?,
            algorithm,
            qop,
            opaque,
            stale,
        })
    }
}

/// The answer to a challenge, rendered as an `Authorization` header value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestResponse {
    pub username: String,
    pub realm: String,
    pub nonce: String,
    pub uri: String,
    pub response: String,
    /// Echoed only when the challenge named one
    pub algorithm: Option<String>,
    pub opaque: Option<String>,
    /// `(nc, cnonce)` when `qop=auth` was used
    pub qop_auth: Option<(u32, String)>,
}

impl fmt::Display for DigestResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Digest username=\"{}\", realm=\"{}\", nonce=\"{}\", uri=\"{}\", response=\"{}\"",
            self.username, self.realm, self.nonce, self.uri, self.response
        )?;
        if let Some(algorithm) = &self.algorithm {
            write!(f, ", algorithm={}", algorithm)?;
        }
        if let Some(opaque) = &self.opaque {
            write!(f, ", opaque=\"{}\"", opaque)?;
        }
        if let Some((nc, cnonce)) = &self.qop_auth {
            write!(f, ", qop=auth, nc={:08x}, cnonce=\"{}\"", nc, cnonce)?;
        }
        Ok(())
    }
}

/// Inputs of a digest computation
#[derive(Debug, Clone, Copy)]
pub struct DigestInput<'a> {
    pub method: &'a str,
    pub uri: &'a str,
    pub username: &'a str,
    pub password: &'a str,
    /// Client nonce; used only for `qop=auth` and the `-sess` algorithms
    pub cnonce: &'a str,
}

/// Solves `challenge` for one request.
///
/// `qop=auth` is used whenever the server offers it; a challenge offering
/// only `auth-int` is rejected.
pub fn compute_response(challenge: &DigestChallenge, input: DigestInput<'_>) -> Result<DigestResponse> {
    let algorithm = challenge.algorithm()?;

    let use_qop = if challenge.qop.is_empty() {
        false
    } else if challenge.qop.iter().any(|q| q.eq_ignore_ascii_case("auth")) {
        true
    } else {
        return Err(AuthError::DigestCompute(format!(
            "unsupported qop {}",
            challenge.qop.join(",")
        )));
    };
    let nc = 1u32;

    let mut ha1 = algorithm.hash(&format!("{}:{}:{}", input.username, challenge.realm, input.password));
    if algorithm.is_session() {
        ha1 = algorithm.hash(&format!("{}:{}:{}", ha1, challenge.nonce, input.cnonce));
    }
    let ha2 = algorithm.hash(&format!("{}:{}", input.method, input.uri));
    let response = if use_qop {
        algorithm.hash(&format!(
            "{}:{}:{:08x}:{}:auth:{}",
            ha1, challenge.nonce, nc, input.cnonce, ha2
        ))
    } else {
        algorithm.hash(&format!("{}:{}:{}", ha1, challenge.nonce, ha2))
    };

    Ok(DigestResponse {
        username: input.username.to_string(),
        realm: challenge.realm.clone(),
        nonce: challenge.nonce.clone(),
        uri: input.uri.to_string(),
        response,
        algorithm: challenge.algorithm.as_ref().map(|_| algorithm.as_str().to_string()),
        opaque: challenge.opaque.clone(),
        qop_auth: use_qop.then(|| (nc, input.cnonce.to_string())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const RFC2617_CHALLENGE: &str = r#"Digest realm="testrealm@host.com", qop="auth,auth-int", nonce="dcd98b7102dd2f0e8b11d0f600bfb0c093", opaque="5ccc069c403ebaf9f0171e9517f40e41""#;

    fn mufasa<'a>(method: &'a str, uri: &'a str) -> DigestInput<'a> {
        DigestInput {
            method,
            uri,
            username: "Mufasa",
            password: "Circle Of Life",
            cnonce: "0a4f113b",
        }
    }

    #[test]
    fn test_parse_challenge() {
        let challenge: DigestChallenge = RFC2617_CHALLENGE.parse().unwrap();
        assert_eq!(challenge.realm, "testrealm@host.com");
        assert_eq!(challenge.nonce, "dcd98b7102dd2f0e8b11d0f600bfb0c093");
        assert_eq!(challenge.qop, vec!["auth", "auth-int"]);
        assert_eq!(challenge.opaque.as_deref(), Some("5ccc069c403ebaf9f0171e9517f40e41"));
        assert_eq!(challenge.algorithm().unwrap(), Algorithm::Md5);
        assert!(!challenge.stale);
    }

    #[test]
    fn test_parse_challenge_quoting() {
        let challenge: DigestChallenge =
            "digest  realm = \"a, \\\"quoted\\\" realm\" ,nonce=abc123,opaque=\"\", stale=TRUE, domain=\"sip:x\""
                .parse()
                .unwrap();
        assert_eq!(challenge.realm, "a, \"quoted\" realm");
        assert_eq!(challenge.nonce, "abc123");
        assert_eq!(challenge.opaque.as_deref(), Some(""));
        assert!(challenge.stale);
        assert!(challenge.qop.is_empty());
    }

    #[test]
    fn test_parse_challenge_errors() {
        assert!(matches!("Basic realm=\"x\"".parse::<DigestChallenge>(), Err(AuthError::ChallengeParse { .. })));
        assert!(matches!("Digest".parse::<DigestChallenge>(), Err(AuthError::ChallengeParse { .. })));
        assert!(matches!("Digest nonce=\"abc\"".parse::<DigestChallenge>(), Err(AuthError::ChallengeParse { .. })));
        assert!(matches!("Digest realm=\"x\", nonce=\"abc".parse::<DigestChallenge>(), Err(AuthError::ChallengeParse { .. })));
        assert!(matches!("Digest realm".parse::<DigestChallenge>(), Err(AuthError::ChallengeParse { .. })));
    }

    #[test]
    fn test_rfc2617_reference_response() {
        let challenge: DigestChallenge = RFC2617_CHALLENGE.parse().unwrap();
        let response = compute_response(&challenge, mufasa("GET", "/dir/index.html")).unwrap();
        assert_eq!(response.response, "6629fae49393a05397450978507c4ef1");

        let header = response.to_string();
        assert!(header.starts_with("Digest username=\"Mufasa\", realm=\"testrealm@host.com\""));
        assert!(header.contains("qop=auth, nc=00000001, cnonce=\"0a4f113b\""));
        assert!(header.contains("opaque=\"5ccc069c403ebaf9f0171e9517f40e41\""));
        assert!(!header.contains("algorithm="));
    }

    #[test]
    fn test_without_qop() {
        let challenge: DigestChallenge = "Digest realm=\"asterisk\", nonce=\"4f1d2c\"".parse().unwrap();
        let response = compute_response(&challenge, mufasa("REGISTER", "pbx.example.com")).unwrap();

        let ha1 = format!("{:x}", md5::compute("Mufasa:asterisk:Circle Of Life"));
        let ha2 = format!("{:x}", md5::compute("REGISTER:pbx.example.com"));
        let expected = format!("{:x}", md5::compute(format!("{}:4f1d2c:{}", ha1, ha2)));
        assert_eq!(response.response, expected);
        assert!(response.qop_auth.is_none());
    }

    #[test]
    fn test_sha256_and_sess_variants() {
        let challenge: DigestChallenge = "Digest realm=\"r\", nonce=\"n\", algorithm=SHA-256".parse().unwrap();
        let response = compute_response(&challenge, mufasa("INVITE", "h")).unwrap();
        assert_eq!(response.response.len(), 64);
        assert_eq!(response.algorithm.as_deref(), Some("SHA-256"));

        let plain: DigestChallenge = "Digest realm=\"r\", nonce=\"n\", algorithm=MD5".parse().unwrap();
        let sess: DigestChallenge = "Digest realm=\"r\", nonce=\"n\", algorithm=MD5-sess".parse().unwrap();
        let a = compute_response(&plain, mufasa("INVITE", "h")).unwrap();
        let b = compute_response(&sess, mufasa("INVITE", "h")).unwrap();
        assert_ne!(a.response, b.response);
        assert_eq!(b.algorithm.as_deref(), Some("MD5-sess"));
    }

    #[test]
    fn test_unsupported_challenges() {
        let challenge: DigestChallenge = "Digest realm=\"r\", nonce=\"n\", algorithm=SHA-512-256".parse().unwrap();
        assert!(matches!(compute_response(&challenge, mufasa("INVITE", "h")), Err(AuthError::DigestCompute(_))));

        let challenge: DigestChallenge = "Digest realm=\"r\", nonce=\"n\", qop=\"auth-int\"".parse().unwrap();
        assert!(matches!(compute_response(&challenge, mufasa("INVITE", "h")), Err(AuthError::DigestCompute(_))));
    }
}
