use super::{InputSource, Simulator, SimulatorError};
use crate::ir::StateId;
use crate::machine::{Machine, MachineStatus};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulatorOptions {
    /// Maximum number of recorded steps; `None` keeps all of them.
    pub history_limit: Option<usize>,
    /// Minimum width of the signal name column in waveforms.
    pub waveform_label_width: usize,
}

impl Default for SimulatorOptions {
    fn default() -> Self {
        Self {
            history_limit: None,
            waveform_label_width: 24,
        }
    }
}

/// A fluent builder for a [`Simulator`] over one analyzed machine.
///
/// Use [`Simulator::builder()`] to obtain one.
pub struct SimulatorBuilder<'a> {
    machine: &'a Machine,
    options: SimulatorOptions,
    source: Option<Box<dyn InputSource>>,
    start: Option<StateId>,
}

impl<'a> SimulatorBuilder<'a> {
    pub fn new(machine: &'a Machine) -> Self {
        Self {
            machine,
            options: SimulatorOptions::default(),
            source: None,
            start: None,
        }
    }

    pub fn options(mut self, options: SimulatorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn history_limit(mut self, limit: Option<usize>) -> Self {
        self.options.history_limit = limit;
        self
    }

    pub fn waveform_label_width(mut self, width: usize) -> Self {
        self.options.waveform_label_width = width;
        self
    }

    pub fn input_source(mut self, source: impl InputSource + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Starts somewhere other than the initial state.
    pub fn start_state(mut self, state: StateId) -> Self {
        self.start = Some(state);
        self
    }

    /// Fails unless the machine's last analysis left it happy.
    pub fn build(self) -> Result<Simulator, SimulatorError> {
        let model = match self.machine.model() {
            Some(model) if self.machine.status() == MachineStatus::Happy => model.clone(),
            _ => {
                return Err(SimulatorError::NotHappy {
                    status: self.machine.status(),
                });
            }
        };
        let start = self.start.unwrap_or(model.initial_state());
        if !model.is_concrete(start) {
            return Err(SimulatorError::NotConcrete(start));
        }
        let mut sim = Simulator::with_model(model, self.options);
        sim.source = self.source;
        sim.set_state(Some(start));
        Ok(sim)
    }
}
