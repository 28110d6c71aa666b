use availmf_types::Name;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmfError {
    #[error("component {0:?} not found")]
    ComponentNotFound(Name),
    #[error("service unit {0:?} not found")]
    SuNotFound(Name),
    #[error("service group {0:?} not found")]
    SgNotFound(Name),
    #[error("service instance {0:?} not found")]
    SiNotFound(Name),
    #[error("node {0:?} not found")]
    NodeNotFound(Name),
    #[error("event does not apply to the component's current state")]
    InvalidTransition,
}
