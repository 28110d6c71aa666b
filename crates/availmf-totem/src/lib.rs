//! # availmf-totem: group-messaging port and primary-component decider
//!
//! Two tightly related protocol pieces, both sitting directly beneath
//! the totem ring protocol (treated as an external black box per spec
//! §1):
//!
//! - [`port`]: the `mcast`/`send_ok`/`deliver`/`confchg` contract every
//!   service is built against (spec 4.A).
//! - [`ykd`]: the Yeung–Keidar–Dolev dynamic-voting primary-component
//!   decider run on every configuration change (spec 4.B).
//! - [`sim`]: a deterministic in-process transport implementing
//!   [`port::GroupPort`] for tests, honoring total order and the
//!   transitional/regular confchg split.

pub mod port;
pub mod sim;
pub mod ykd;

pub use port::{ConfchgEvent, ConfchgType, GroupPort, McastGuarantee, MulticastError};
pub use ykd::{Session, YkdDecider, YkdState};
