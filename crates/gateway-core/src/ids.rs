//! Identifier and randomness source.
//!
//! Everything random that ends up in a message (Call-ID, branch, tag, CSeq
//! seed, SDP session id) comes from an [`IdGenerator`], so tests can pin
//! exact header values.

use std::sync::atomic::{AtomicU32, Ordering};

use rand::Rng;
use sipbridge_sip_core::types::BRANCH_MAGIC_COOKIE;
use uuid::Uuid;

pub trait IdGenerator: Send + Sync {
    fn call_id(&self) -> String;

    /// A Via branch, including the RFC 3261 magic cookie
    fn branch(&self) -> String;

    fn tag(&self) -> String;

    /// First CSeq of a new dialog, in `1..=range`
    fn cseq_seed(&self, range: u32) -> u32;

    /// SDP origin session id or version, within 32 bits
    fn session_id(&self) -> u64;
}

/// Random identifiers from uuid v4 and the thread RNG
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIds;

impl IdGenerator for RandomIds {
    fn call_id(&self) -> String {
        Uuid::new_v4().to_string()
    }

    fn branch(&self) -> String {
        format!("{}{}", BRANCH_MAGIC_COOKIE, Uuid::new_v4().simple())
    }

    fn tag(&self) -> String {
        Uuid::new_v4().to_string()
    }

    fn cseq_seed(&self, range: u32) -> u32 {
        1 + rand::thread_rng().gen_range(0..range.max(1))
    }

    fn session_id(&self) -> u64 {
        u64::from(rand::thread_rng().gen::<u32>())
    }
}

/// Predictable identifiers: every call returns the next value of a counter
#[derive(Debug, Default)]
pub struct SequentialIds {
    next: AtomicU32,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }

    fn bump(&self) -> u32 {
        self.next.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl IdGenerator for SequentialIds {
    fn call_id(&self) -> String {
        format!("call-{}", self.bump())
    }

    fn branch(&self) -> String {
        format!("{}-{}", BRANCH_MAGIC_COOKIE, self.bump())
    }

    fn tag(&self) -> String {
        format!("tag-{}", self.bump())
    }

    fn cseq_seed(&self, range: u32) -> u32 {
        1 + self.bump() % range.max(1)
    }

    fn session_id(&self) -> u64 {
        u64::from(self.bump())
    }
}
