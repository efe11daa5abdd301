use crate::ir::{Environment, Expression, NameLookup, SignalId, StateId, Statement};
use crate::machine::{Machine, RESET_SIGNAL, SignalKind};
use crate::optimizer::simplify;
use std::collections::BTreeMap;
use std::fmt;

/// How one derived signal is computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalComputation {
    pub signal: SignalId,
    pub expression: Expression,
}

/// A possible step out of a concrete state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// Source state, any virtual states passed through, destination state.
    pub path: Vec<StateId>,
    pub guard: Expression,
}

impl Transition {
    pub fn source(&self) -> StateId {
        self.path[0]
    }

    pub fn destination(&self) -> StateId {
        self.path[self.path.len() - 1]
    }
}

/// Flat view of a happy machine: boolean functions for every derived signal
/// and guarded transitions for every concrete state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    name: String,
    computations: Vec<SignalComputation>,
    transitions: BTreeMap<StateId, Vec<Transition>>,
    inputs: Vec<SignalId>,
    initial: StateId,
    reset_condition: Expression,
    signal_names: BTreeMap<SignalId, String>,
    state_names: BTreeMap<StateId, String>,
    signals_by_name: Vec<SignalId>,
    states_by_name: Vec<StateId>,
}

impl Model {
    /// Flattens `machine`, which must have passed every check.
    ///
    /// # Panics
    ///
    /// Panics when called on a machine the analyzer has not declared sound.
    pub(crate) fn extract(machine: &Machine) -> Model {
        let Some(order) = machine.signal_order() else {
            panic!("model extraction requires a dependency order");
        };
        let Some(initial) = machine.initial_state() else {
            panic!("model extraction requires an initial state");
        };
        let Some(reset) = machine.signal_by_name(RESET_SIGNAL) else {
            panic!("model extraction requires a reset signal");
        };
        let concrete: Vec<StateId> = machine
            .states()
            .iter()
            .filter(|st| !st.is_virtual())
            .map(|st| st.id())
            .collect();

        let mut computations = Vec::new();
        for &id in order {
            let Some(signal) = machine.signal(id) else {
                panic!("{id} in dependency order is not part of the machine");
            };
            let expression = match signal.kind() {
                SignalKind::Input => continue,
                SignalKind::Expression => match signal.code().compiled() {
                    Some(expr) => expr.clone(),
                    None => panic!("expression signal \"{}\" is not compiled", signal.name()),
                },
                SignalKind::Statewise => statewise_expression(machine, &concrete, id),
            };
            computations.push(SignalComputation { signal: id, expression });
        }

        let mut transitions = BTreeMap::new();
        for &st in &concrete {
            let mut out = Vec::new();
            collect_transitions(
                machine,
                machine.compiled_body(st),
                &mut vec![st],
                &mut Vec::new(),
                &mut out,
            );
            transitions.insert(st, out);
        }

        let reset_condition = simplify(&Expression::or(
            concrete
                .iter()
                .map(|st| {
                    Expression::and(vec![Expression::state_is(*st), Expression::Signal(reset.id())])
                })
                .collect(),
        ));

        Model {
            name: machine.name().to_string(),
            computations,
            transitions,
            inputs: machine
                .signals()
                .iter()
                .filter(|s| s.kind() == SignalKind::Input)
                .map(|s| s.id())
                .collect(),
            initial,
            reset_condition,
            signal_names: machine
                .signals()
                .iter()
                .map(|s| (s.id(), s.name().to_string()))
                .collect(),
            state_names: machine
                .states()
                .iter()
                .map(|st| (st.id(), st.name().to_string()))
                .collect(),
            signals_by_name: machine.signals().iter().map(|s| s.id()).collect(),
            states_by_name: machine.states().iter().map(|st| st.id()).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Derived signals in evaluation order. Inputs are not included.
    pub fn computations(&self) -> &[SignalComputation] {
        &self.computations
    }

    pub fn inputs(&self) -> &[SignalId] {
        &self.inputs
    }

    pub fn initial_state(&self) -> StateId {
        self.initial
    }

    pub fn reset_condition(&self) -> &Expression {
        &self.reset_condition
    }

    /// Every signal of the machine, in name order.
    pub fn signals(&self) -> &[SignalId] {
        &self.signals_by_name
    }

    /// Every state of the machine, virtual ones included, in name order.
    pub fn states(&self) -> &[StateId] {
        &self.states_by_name
    }

    pub fn is_concrete(&self, state: StateId) -> bool {
        self.transitions.contains_key(&state)
    }

    pub fn transitions_from(&self, state: StateId) -> &[Transition] {
        self.transitions.get(&state).map_or(&[], Vec::as_slice)
    }

    /// Computes every derived signal into `env`, which must already hold the
    /// inputs.
    pub fn fill_environment(&self, env: &mut Environment) {
        for computation in &self.computations {
            let value = computation.expression.evaluate(env);
            env.set(computation.signal, value);
        }
    }

    /// The transition taken from the environment's state, if any.
    ///
    /// # Panics
    ///
    /// Panics when more than one guard holds; the overlap check rules this out.
    pub fn select_transition(&self, env: &Environment) -> Option<&Transition> {
        let state = env.state()?;
        let mut matching = self
            .transitions_from(state)
            .iter()
            .filter(|t| t.guard.evaluate(env));
        let first = matching.next();
        if matching.next().is_some() {
            panic!(
                "more than one transition can be taken from state \"{}\"",
                self.state_name(state).unwrap_or("?")
            );
        }
        first
    }
}

impl NameLookup for Model {
    fn signal_name(&self, id: SignalId) -> Option<&str> {
        self.signal_names.get(&id).map(String::as_str)
    }

    fn state_name(&self, id: StateId) -> Option<&str> {
        self.state_names.get(&id).map(String::as_str)
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "== signal computations ==")?;
        for c in &self.computations {
            writeln!(
                f,
                "{} := {}",
                self.signal_name(c.signal).unwrap_or("?"),
                c.expression.display(self)
            )?;
        }
        writeln!(f, "== state transitions ==")?;
        for transitions in self.transitions.values() {
            for t in transitions {
                let path: Vec<&str> = t
                    .path
                    .iter()
                    .map(|st| self.state_name(*st).unwrap_or("?"))
                    .collect();
                writeln!(f, "{} {{{}}}", path.join(" -> "), t.guard.display(self))?;
            }
        }
        Ok(())
    }
}

fn statewise_expression(machine: &Machine, concrete: &[StateId], signal: SignalId) -> Expression {
    let terms = concrete
        .iter()
        .filter_map(|st| {
            assigned_value(machine, machine.compiled_body(*st), signal, &[])
                .map(|value| Expression::and(vec![Expression::state_is(*st), value]))
        })
        .collect();
    simplify(&Expression::or(terms))
}

/// The value `signal` receives while running `stm` under `conditions`, or
/// `None` if no path assigns it.
fn assigned_value(
    machine: &Machine,
    stm: &Statement,
    signal: SignalId,
    conditions: &[Expression],
) -> Option<Expression> {
    match stm {
        Statement::Group { statements, .. } => {
            let mut found = None;
            for stm in statements {
                if let Some(value) = assigned_value(machine, stm, signal, conditions) {
                    if found.is_some() {
                        panic!("{signal} is assigned twice in one sequence");
                    }
                    found = Some(value);
                }
            }
            found
        }
        Statement::Emit { signal: target, value } if *target == signal => {
            let mut conjuncts = conditions.to_vec();
            conjuncts.push(value.clone());
            Some(Expression::and(conjuncts))
        }
        Statement::Emit { .. } => None,
        Statement::Goto(target) => match machine.state(*target) {
            Some(st) if st.is_virtual() => {
                assigned_value(machine, machine.compiled_body(*target), signal, conditions)
            }
            _ => None,
        },
        Statement::Cond {
            condition,
            then_branch,
            else_branch,
        } => {
            let mut when_true = conditions.to_vec();
            when_true.push(condition.clone());
            let mut when_false = conditions.to_vec();
            when_false.push(Expression::not(condition.clone()));
            match (
                assigned_value(machine, then_branch, signal, &when_true),
                assigned_value(machine, else_branch, signal, &when_false),
            ) {
                (Some(a), Some(b)) => Some(Expression::or(vec![a, b])),
                (a, b) => a.or(b),
            }
        }
    }
}

fn collect_transitions(
    machine: &Machine,
    stm: &Statement,
    path: &mut Vec<StateId>,
    conditions: &mut Vec<Expression>,
    out: &mut Vec<Transition>,
) {
    match stm {
        Statement::Group { statements, .. } => {
            for stm in statements {
                collect_transitions(machine, stm, path, conditions, out);
            }
        }
        Statement::Emit { .. } => {}
        Statement::Goto(target) => {
            path.push(*target);
            match machine.state(*target) {
                Some(st) if st.is_virtual() => {
                    collect_transitions(machine, machine.compiled_body(*target), path, conditions, out);
                }
                _ => out.push(Transition {
                    path: path.clone(),
                    guard: simplify(&Expression::and(conditions.clone())),
                }),
            }
            path.pop();
        }
        Statement::Cond {
            condition,
            then_branch,
            else_branch,
        } => {
            conditions.push(condition.clone());
            collect_transitions(machine, then_branch, path, conditions, out);
            conditions.pop();
            conditions.push(Expression::not(condition.clone()));
            collect_transitions(machine, else_branch, path, conditions, out);
            conditions.pop();
        }
    }
}
