use crate::ir::StateId;
use crate::machine::MachineStatus;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SimulatorError {
    #[error("Cannot simulate a machine that is {status}; resolve its issues first")]
    NotHappy { status: MachineStatus },
    #[error("{0} is not a concrete state of the simulated machine")]
    NotConcrete(StateId),
}
