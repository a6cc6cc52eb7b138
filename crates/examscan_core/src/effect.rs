use crate::artifact::Artifact;
use crate::lifecycle::Generation;
use crate::protocol::UnitRequest;

/// Side effects requested by [`crate::update`]; executed by the host.
#[derive(Debug, PartialEq)]
pub enum Effect {
    /// Start a fresh background unit, replacing any previous one.
    SpawnUnit { generation: Generation },
    /// Hand a request to the unit. Scan buffers move with it.
    Send {
        generation: Generation,
        request: UnitRequest,
    },
    /// Save an artifact for the user.
    Deliver(Artifact),
}
