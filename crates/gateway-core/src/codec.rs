//! Audio codecs the gateway can carry.
//!
//! The table maps an SDP format identifier to its `a=rtpmap` value and to
//! the parameters a decoder needs. Its order is only the local preference
//! used when we are the offerer; answers always follow the remote's order.

use std::borrow::Cow;

use serde::Serialize;
use tracing::trace;

/// One codec registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CodecEntry {
    /// SDP format identifier, e.g. "0" or "96"
    pub id: &'static str,
    /// `a=rtpmap` value, e.g. "0 PCMU/8000"
    pub rtpmap: &'static str,
    pub sampling_rate: u32,
    /// Channel count handed to the decoder
    pub channels: u8,
    pub payload_type: u8,
    /// Known to misbehave; answered when offered but never offered by us
    pub experimental: bool,
}

impl CodecEntry {
    pub fn decode_params(&self) -> DecodeParams {
        DecodeParams {
            sampling_rate: self.sampling_rate,
            channels: self.channels,
            payload_type: self.payload_type,
        }
    }
}

/// What a decoder needs to know about a negotiated format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DecodeParams {
    pub sampling_rate: u32,
    pub channels: u8,
    pub payload_type: u8,
}

const fn entry(
    id: &'static str,
    rtpmap: &'static str,
    sampling_rate: u32,
    payload_type: u8,
    experimental: bool,
) -> CodecEntry {
    CodecEntry {
        id,
        rtpmap,
        sampling_rate,
        channels: 1,
        payload_type,
        experimental,
    }
}

const DEFAULT_ENTRIES: &[CodecEntry] = &[
    entry("106", "106 opus/48000/2", 48000, 106, false),
    entry("105", "105 opus/48000/2", 48000, 105, false),
    entry("96", "96 opus/48000/2", 48000, 96, false),
    entry("8", "8 PCMA/8000", 8000, 8, false),
    entry("0", "0 PCMU/8000", 8000, 0, false),
    // G.722 audio from the media bridge is currently distorted
    entry("9", "9 G722/8000", 8000, 9, true),
];

/// The codecs supported out of the box, in local preference order
pub static DEFAULT_CODECS: CodecTable = CodecTable {
    entries: Cow::Borrowed(DEFAULT_ENTRIES),
};

/// Read-only codec registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecTable {
    entries: Cow<'static, [CodecEntry]>,
}

impl CodecTable {
    /// A custom table; `entries` order is the local offer preference
    pub fn new(entries: Vec<CodecEntry>) -> Self {
        CodecTable {
            entries: Cow::Owned(entries),
        }
    }

    pub fn entries(&self) -> &[CodecEntry] {
        &self.entries
    }

    pub fn lookup(&self, id: &str) -> Option<&CodecEntry> {
        let found = self.entries.iter().find(|e| e.id == id);
        if found.is_none() {
            trace!("No codec registered for format {}", id);
        }
        found
    }

    /// Rendered `a=rtpmap` value for a format
    pub fn rtpmap(&self, id: &str) -> Option<&'static str> {
        self.lookup(id).map(|e| e.rtpmap)
    }

    pub fn decode_params(&self, id: &str) -> Option<DecodeParams> {
        self.lookup(id).map(CodecEntry::decode_params)
    }

    /// Formats we put in our own offers, most preferred first
    pub fn offer_formats(&self) -> Vec<&'static str> {
        self.entries
            .iter()
            .filter(|e| !e.experimental)
            .map(|e| e.id)
            .collect()
    }
}

impl Default for CodecTable {
    fn default() -> Self {
        DEFAULT_CODECS.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_lookups() {
        assert_eq!(DEFAULT_CODECS.rtpmap("0"), Some("0 PCMU/8000"));
        assert_eq!(DEFAULT_CODECS.rtpmap("8"), Some("8 PCMA/8000"));
        assert_eq!(DEFAULT_CODECS.rtpmap("9"), Some("9 G722/8000"));
        for id in ["96", "105", "106"] {
            assert_eq!(DEFAULT_CODECS.rtpmap(id), Some(format!("{} opus/48000/2", id).as_str()));
            let params = DEFAULT_CODECS.decode_params(id).unwrap();
            assert_eq!(params.sampling_rate, 48000);
            assert_eq!(params.channels, 1);
            assert_eq!(params.payload_type.to_string(), id);
        }
        assert!(DEFAULT_CODECS.lookup("18").is_none());
        assert!(DEFAULT_CODECS.decode_params("").is_none());
    }

    #[test]
    fn test_offer_order_skips_experimental() {
        assert_eq!(DEFAULT_CODECS.offer_formats(), vec!["106", "105", "96", "8", "0"]);
        assert!(DEFAULT_CODECS.lookup("9").unwrap().experimental);
    }

    #[test]
    fn test_custom_table() {
        let table = CodecTable::new(vec![DEFAULT_CODECS.lookup("0").copied().unwrap()]);
        assert_eq!(table.offer_formats(), vec!["0"]);
        assert!(table.lookup("8").is_none());
        assert_eq!(CodecTable::default(), DEFAULT_CODECS);
    }
}
