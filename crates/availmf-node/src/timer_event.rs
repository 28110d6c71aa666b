//! The deadline-queue payload for the AMF half of the node (spec
//! section 5: "the timer wheel [is] exclusively owned by the main
//! loop"). The checkpoint service keeps its own internal wheel
//! (`CheckpointStore::poll_expired`) since its timers never need to
//! interleave with AMF's; the node ticks both wheels from the same
//! loop iteration.

use availmf_amf::HealthcheckEvent;
use availmf_types::Name;

/// What fired, and which component it concerns.
#[derive(Debug, Clone)]
pub enum NodeTimerEvent {
    /// A healthcheck period or supervision deadline for one component.
    Healthcheck { comp: Name, key: String, event: HealthcheckEvent },
    /// An `INSTANTIATE` callback timeout for one component.
    InstantiateTimeout { comp: Name },
    /// A `CLEANUP` callback timeout for one component.
    CleanupTimeout { comp: Name },
}
