use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::method::Method;

/// Typed CSeq header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CSeq {
    pub seq: u32,
    pub method: Method,
}

impl CSeq {
    /// Creates a new CSeq header.
    pub fn new(seq: u32, method: Method) -> Self {
        Self { seq, method }
    }

    /// The same sequence number under another method (ACK, CANCEL)
    pub fn with_method(&self, method: Method) -> Self {
        Self { seq: self.seq, method }
    }

    /// The next sequence number in the dialog. Fails at `u32::MAX`; the
    /// number never wraps to 0.
    pub fn next(&self, method: Method) -> Result<Self> {
        let seq = self.seq.checked_add(1).ok_or(Error::CSeqExhausted(self.seq))?;
        Ok(Self { seq, method })
    }
}

impl fmt::Display for CSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.seq, self.method)
    }
}

impl FromStr for CSeq {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (seq, method) = s
            .trim()
            .split_once(char::is_whitespace)
            .ok_or_else(|| Error::InvalidMethod(s.to_string()))?;
        let seq = seq
            .parse()
            .map_err(|_| Error::InvalidMethod(format!("invalid CSeq number in '{}'", s)))?;
        Ok(CSeq::new(seq, method.trim().parse()?))
    }
}
