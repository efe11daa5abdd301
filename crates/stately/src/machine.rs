use crate::analyzer::Analysis;
use crate::ir::{Expression, NameLookup, Scope, SignalId, StateId, Statement};
use serde::Serialize;
use std::fmt;
use std::rc::Rc;

mod code;
mod persist;
mod transform;

pub use code::Code;
pub use persist::UnpackError;
pub use transform::{TransformError, Transformer};

/// Name of the input signal that forces the machine back to its initial
/// state.
pub const RESET_SIGNAL: &str = "reset";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SignalKind {
    /// Polled from the environment on every step.
    Input,
    /// Assembled from the emissions of the active state.
    Statewise,
    /// A pure function of other signals.
    Expression,
}

impl SignalKind {
    pub fn name(self) -> &'static str {
        match self {
            SignalKind::Input => "input",
            SignalKind::Statewise => "statewise",
            SignalKind::Expression => "expression",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        [
            SignalKind::Input,
            SignalKind::Statewise,
            SignalKind::Expression,
        ]
        .into_iter()
        .find(|kind| kind.name() == name)
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MachineStatus {
    /// Some code does not compile, or a structural check failed.
    #[default]
    Uncompiled,
    /// Everything compiles but the machine's behavior is ambiguous.
    Troublesome,
    /// All checks passed and a model is available.
    Happy,
}

impl fmt::Display for MachineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MachineStatus::Uncompiled => "uncompiled",
            MachineStatus::Troublesome => "troublesome",
            MachineStatus::Happy => "happy",
        })
    }
}

#[derive(Debug, Clone)]
pub struct Signal {
    pub(crate) id: SignalId,
    pub(crate) name: String,
    pub(crate) kind: SignalKind,
    pub(crate) internal: bool,
    pub(crate) description: String,
    pub(crate) code: Code<Expression>,
}

impl Signal {
    pub fn id(&self) -> SignalId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> SignalKind {
        self.kind
    }

    pub fn is_internal(&self) -> bool {
        self.internal
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Only meaningful for [`SignalKind::Expression`] signals.
    pub fn code(&self) -> &Code<Expression> {
        &self.code
    }
}

#[derive(Debug, Clone)]
pub struct State {
    pub(crate) id: StateId,
    pub(crate) name: String,
    pub(crate) is_virtual: bool,
    pub(crate) description: String,
    pub(crate) position: (i32, i32),
    pub(crate) code: Code<Statement>,
}

impl State {
    pub fn id(&self) -> StateId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_virtual(&self) -> bool {
        self.is_virtual
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn position(&self) -> (i32, i32) {
        self.position
    }

    pub fn code(&self) -> &Code<Statement> {
        &self.code
    }

    /// The compiled body, if compilation succeeded.
    pub fn body(&self) -> Option<&Statement> {
        self.code.compiled()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineEvent {
    /// Signals, states or their code changed; derived data was discarded.
    StructureChanged,
    /// [`Machine::analyze`] finished.
    Analyzed,
}

pub type Listener = Rc<dyn Fn(MachineEvent)>;

/// One finite-state machine: its signals, states and the data derived by the
/// last [`Machine::analyze`] pass.
///
/// Mutations discard all derived data. Callers re-run `analyze` afterwards.
/// A clone starts without subscribers.
pub struct Machine {
    pub(crate) name: String,
    pub(crate) signals: Vec<Signal>,
    pub(crate) states: Vec<State>,
    pub(crate) initial: Option<StateId>,
    next_id: usize,
    pub(crate) analysis: Analysis,
    listeners: Vec<Listener>,
}

impl Clone for Machine {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            signals: self.signals.clone(),
            states: self.states.clone(),
            initial: self.initial,
            next_id: self.next_id,
            analysis: self.analysis.clone(),
            listeners: Vec::new(),
        }
    }
}

impl fmt::Debug for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("name", &self.name)
            .field("signals", &self.signals)
            .field("states", &self.states)
            .field("initial", &self.initial)
            .field("status", &self.analysis.status)
            .finish()
    }
}

impl Machine {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            signals: Vec::new(),
            states: Vec::new(),
            initial: None,
            next_id: 0,
            analysis: Analysis::default(),
            listeners: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Signals in name order.
    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    /// States in name order.
    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn signal(&self, id: SignalId) -> Option<&Signal> {
        self.signals.iter().find(|s| s.id == id)
    }

    pub fn state(&self, id: StateId) -> Option<&State> {
        self.states.iter().find(|st| st.id == id)
    }

    pub fn signal_by_name(&self, name: &str) -> Option<&Signal> {
        self.signals.iter().find(|s| s.name == name)
    }

    pub fn state_by_name(&self, name: &str) -> Option<&State> {
        self.states.iter().find(|st| st.name == name)
    }

    pub fn initial_state(&self) -> Option<StateId> {
        self.initial
    }

    /// Registers a callback run after every mutation and analysis.
    pub fn subscribe(&mut self, listener: impl Fn(MachineEvent) + 'static) {
        self.listeners.push(Rc::new(listener));
    }

    pub(crate) fn notify(&self, event: MachineEvent) {
        for listener in &self.listeners {
            listener(event);
        }
    }

    fn changed(&mut self) {
        self.analysis = Analysis::default();
        self.notify(MachineEvent::StructureChanged);
    }

    /// Forces every unit of code to recompile on the next analysis. Used when
    /// a name that compiled code may refer to appears, disappears or changes.
    fn reset_all_code(&mut self) {
        for signal in &mut self.signals {
            signal.code.reset();
        }
        for state in &mut self.states {
            state.code.reset();
        }
    }

    fn allocate_id(&mut self) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn sort(&mut self) {
        self.signals.sort_by(|a, b| a.name.cmp(&b.name));
        self.states.sort_by(|a, b| a.name.cmp(&b.name));
    }

    fn signal_mut(&mut self, id: SignalId) -> &mut Signal {
        match self.signals.iter_mut().find(|s| s.id == id) {
            Some(signal) => signal,
            None => panic!("{id} does not belong to this machine"),
        }
    }

    fn state_mut(&mut self, id: StateId) -> &mut State {
        match self.states.iter_mut().find(|st| st.id == id) {
            Some(state) => state,
            None => panic!("{id} does not belong to this machine"),
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.changed();
    }

    pub fn add_signal(&mut self, name: impl Into<String>, kind: SignalKind) -> SignalId {
        let id = SignalId(self.allocate_id());
        self.signals.push(Signal {
            id,
            name: name.into(),
            kind,
            internal: false,
            description: String::new(),
            code: Code::default(),
        });
        self.sort();
        self.reset_all_code();
        self.changed();
        id
    }

    /// Adds a concrete state. The first state added to a machine without an
    /// initial state becomes the initial state.
    pub fn add_state(&mut self, name: impl Into<String>) -> StateId {
        let id = StateId(self.allocate_id());
        self.states.push(State {
            id,
            name: name.into(),
            is_virtual: false,
            description: String::new(),
            position: (0, 0),
            code: Code::default(),
        });
        if self.initial.is_none() {
            self.initial = Some(id);
        }
        self.sort();
        self.reset_all_code();
        self.changed();
        id
    }

    pub fn remove_signal(&mut self, id: SignalId) -> Option<Signal> {
        let index = self.signals.iter().position(|s| s.id == id)?;
        let removed = self.signals.remove(index);
        self.reset_all_code();
        self.changed();
        Some(removed)
    }

    pub fn remove_state(&mut self, id: StateId) -> Option<State> {
        let index = self.states.iter().position(|st| st.id == id)?;
        let removed = self.states.remove(index);
        if self.initial == Some(id) {
            self.initial = None;
        }
        self.reset_all_code();
        self.changed();
        Some(removed)
    }

    /// # Panics
    ///
    /// Panics if `id` does not belong to this machine. The same holds for
    /// every setter taking an id.
    pub fn rename_signal(&mut self, id: SignalId, name: impl Into<String>) {
        self.signal_mut(id).name = name.into();
        self.sort();
        self.reset_all_code();
        self.changed();
    }

    pub fn rename_state(&mut self, id: StateId, name: impl Into<String>) {
        self.state_mut(id).name = name.into();
        self.sort();
        self.reset_all_code();
        self.changed();
    }

    pub fn set_signal_kind(&mut self, id: SignalId, kind: SignalKind) {
        let signal = self.signal_mut(id);
        signal.kind = kind;
        signal.code.reset();
        self.changed();
    }

    pub fn set_signal_source(&mut self, id: SignalId, source: impl Into<String>) {
        self.signal_mut(id).code.set_source(source);
        self.changed();
    }

    pub fn set_signal_internal(&mut self, id: SignalId, internal: bool) {
        self.signal_mut(id).internal = internal;
        self.changed();
    }

    pub fn set_signal_description(&mut self, id: SignalId, description: impl Into<String>) {
        self.signal_mut(id).description = description.into();
        self.changed();
    }

    pub fn set_state_source(&mut self, id: StateId, source: impl Into<String>) {
        self.state_mut(id).code.set_source(source);
        self.changed();
    }

    pub fn set_state_virtual(&mut self, id: StateId, is_virtual: bool) {
        self.state_mut(id).is_virtual = is_virtual;
        self.changed();
    }

    pub fn set_state_description(&mut self, id: StateId, description: impl Into<String>) {
        self.state_mut(id).description = description.into();
        self.changed();
    }

    pub fn set_state_position(&mut self, id: StateId, x: i32, y: i32) {
        self.state_mut(id).position = (x, y);
        self.changed();
    }

    pub fn set_initial_state(&mut self, id: StateId) {
        self.state_mut(id);
        self.initial = Some(id);
        self.changed();
    }
}

impl Scope for Machine {
    fn signal_named(&self, name: &str) -> Option<SignalId> {
        self.signal_by_name(name).map(Signal::id)
    }

    fn state_named(&self, name: &str) -> Option<StateId> {
        self.state_by_name(name).map(State::id)
    }
}

impl NameLookup for Machine {
    fn signal_name(&self, id: SignalId) -> Option<&str> {
        self.signal(id).map(Signal::name)
    }

    fn state_name(&self, id: StateId) -> Option<&str> {
        self.state(id).map(State::name)
    }
}
