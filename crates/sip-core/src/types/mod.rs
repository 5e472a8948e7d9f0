//! SIP message types.

pub mod address;
pub mod cseq;
pub mod header;
pub mod method;
pub mod param;
pub mod sip_message;
pub mod status;
pub mod uri;
pub mod via;

pub use address::Address;
pub use cseq::CSeq;
pub use header::{CallId, HeaderName, MaxForwards, TypedHeader};
pub use method::Method;
pub use param::Param;
pub use sip_message::{HeaderAccess, Message, Request, Response, SIP_VERSION};
pub use status::StatusCode;
pub use uri::{Host, Scheme, Uri};
pub use via::{Via, BRANCH_MAGIC_COOKIE};
