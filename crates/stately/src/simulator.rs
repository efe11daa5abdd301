use crate::flatting::{Model, Transition};
use crate::ir::{Environment, NameLookup, SignalId, StateId};
use crate::machine::Machine;
use crate::vcd::VcdWriter;
use log::trace;
use std::collections::BTreeMap;
use std::io::{self, Write};

mod builder;
mod error;
mod history;

pub use builder::{SimulatorBuilder, SimulatorOptions};
pub use error::SimulatorError;
pub use history::{History, Snapshot};

/// Supplies input signal values each time the simulator recomputes.
pub trait InputSource {
    fn value(&self, signal: SignalId, name: &str) -> bool;
}

/// Input values set by name; unset inputs read as low.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixedInputs {
    values: BTreeMap<String, bool>,
}

impl FixedInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: bool) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<bool> {
        self.values.get(name).copied()
    }
}

impl<S: Into<String>> FromIterator<(S, bool)> for FixedInputs {
    fn from_iter<I: IntoIterator<Item = (S, bool)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(name, value)| (name.into(), value)).collect(),
        }
    }
}

impl InputSource for FixedInputs {
    fn value(&self, _signal: SignalId, name: &str) -> bool {
        self.get(name).unwrap_or(false)
    }
}

/// Steps a flattened machine one clock cycle at a time, with undo.
///
/// Every change of state or input source recomputes the environment and the
/// next state right away, so the accessors always describe the upcoming step.
pub struct Simulator {
    model: Model,
    options: SimulatorOptions,
    pub(crate) source: Option<Box<dyn InputSource>>,
    current: Option<StateId>,
    next: Option<StateId>,
    transition: Option<Transition>,
    environment: Option<Environment>,
    history: History,
    listeners: Vec<Box<dyn FnMut()>>,
}

impl std::fmt::Debug for Simulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulator")
            .field("machine", &self.model.name())
            .field("current", &self.current)
            .field("next", &self.next)
            .field("history", &self.history.len())
            .finish()
    }
}

impl Simulator {
    pub fn builder(machine: &Machine) -> SimulatorBuilder<'_> {
        SimulatorBuilder::new(machine)
    }

    /// Simulator with default options and no input source, at the initial
    /// state.
    pub fn new(machine: &Machine) -> Result<Self, SimulatorError> {
        Self::builder(machine).build()
    }

    pub(crate) fn with_model(model: Model, options: SimulatorOptions) -> Self {
        Self {
            model,
            history: History::new(options.history_limit),
            options,
            source: None,
            current: None,
            next: None,
            transition: None,
            environment: None,
            listeners: Vec::new(),
        }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn current_state(&self) -> Option<StateId> {
        self.current
    }

    pub fn next_state(&self) -> Option<StateId> {
        self.next
    }

    /// Transition the next step takes; `None` while resetting or staying put.
    pub fn transition(&self) -> Option<&Transition> {
        self.transition.as_ref()
    }

    pub fn environment(&self) -> Option<&Environment> {
        self.environment.as_ref()
    }

    pub fn value(&self, signal: SignalId) -> Option<bool> {
        self.environment.as_ref().and_then(|env| env.get(signal))
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn set_history_limit(&mut self, limit: Option<usize>) {
        self.history.set_limit(limit);
    }

    /// Registers a callback run after every recompute.
    pub fn on_step(&mut self, listener: impl FnMut() + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Rebuilds the environment and next state from the current state and
    /// input source.
    pub fn recompute(&mut self) {
        self.environment = None;
        self.next = None;
        self.transition = None;

        if let (Some(current), Some(source)) = (self.current, &self.source) {
            if self.model.is_concrete(current) {
                let mut env = Environment::new(Some(current));
                for &input in self.model.inputs() {
                    let name = self.model.signal_name(input).unwrap_or_default();
                    env.set(input, source.value(input, name));
                }
                self.model.fill_environment(&mut env);

                if self.model.reset_condition().evaluate(&env) {
                    self.next = Some(self.model.initial_state());
                } else {
                    self.transition = self.model.select_transition(&env).cloned();
                    self.next = Some(self.transition.as_ref().map_or(current, Transition::destination));
                }
                self.environment = Some(env);
                trace!(
                    "{} -> {}",
                    self.model.state_name(current).unwrap_or("?"),
                    self.next
                        .and_then(|st| self.model.state_name(st))
                        .unwrap_or("?")
                );
            }
        }

        for listener in &mut self.listeners {
            listener();
        }
    }

    /// Records the present step and moves to the next state. Returns `false`
    /// when there is nowhere to go.
    pub fn step_forward(&mut self) -> bool {
        let (Some(current), Some(next)) = (self.current, self.next) else {
            return false;
        };
        let Some(env) = self.environment.take() else {
            return false;
        };
        self.history.record(current, env);
        self.current = Some(next);
        self.recompute();
        true
    }

    /// Returns to the most recently recorded state. Inputs are read afresh
    /// from the input source rather than replayed.
    pub fn step_backward(&mut self) -> bool {
        let Some(snapshot) = self.history.unrecord() else {
            return false;
        };
        self.current = Some(snapshot.state);
        self.recompute();
        true
    }

    pub fn reset(&mut self) {
        self.set_state(Some(self.model.initial_state()));
    }

    /// A state that is not concrete, or `None`, leaves nothing to compute.
    pub fn set_state(&mut self, state: Option<StateId>) {
        self.current = state;
        self.recompute();
    }

    pub fn set_input_source(&mut self, source: impl InputSource + 'static) {
        self.source = Some(Box::new(source));
        self.recompute();
    }

    /// Waveform of every signal over the recorded history.
    pub fn waveform(&self) -> String {
        self.history.waveform(
            &self.model,
            self.model.signals(),
            self.options.waveform_label_width,
        )
    }

    /// Writes the recorded history as a Value Change Dump, one timestamp per
    /// step.
    pub fn write_vcd<W: Write>(&self, out: W) -> io::Result<W> {
        let signals: Vec<(SignalId, &str)> = self
            .model
            .signals()
            .iter()
            .map(|id| (*id, self.model.signal_name(*id).unwrap_or("?")))
            .collect();
        let mut writer = VcdWriter::new(out, self.model.name(), &signals)?;
        for (timestamp, snapshot) in (0u64..).zip(self.history.iter()) {
            writer.dump(timestamp, &snapshot.environment)?;
        }
        writer.finish()
    }
}
