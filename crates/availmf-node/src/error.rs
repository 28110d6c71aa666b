//! Errors surfaced while turning a catalog into a live graph. AMF
//! kernel errors stay in their own `AmfError` type; this only covers
//! the bootstrap step.

use availmf_types::NameError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NodeError {
    #[error("catalog references unknown name: {0}")]
    InvalidName(#[from] NameError),
}
