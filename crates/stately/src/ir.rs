use crate::sexp::SExp;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Stable handle of a signal inside one [`Machine`](crate::Machine).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SignalId(pub(crate) usize);

/// Stable handle of a state inside one [`Machine`](crate::Machine).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StateId(pub(crate) usize);

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "signal#{}", self.0)
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "state#{}", self.0)
    }
}

/// Resolves handles back to names for rendering.
pub trait NameLookup {
    fn signal_name(&self, id: SignalId) -> Option<&str>;
    fn state_name(&self, id: StateId) -> Option<&str>;
}

/// Resolves names to handles while compiling source code.
pub trait Scope {
    fn signal_named(&self, name: &str) -> Option<SignalId>;
    fn state_named(&self, name: &str) -> Option<StateId>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Operator {
    Not,
    And,
    Or,
    Nand,
    Nor,
    Xor,
}

impl Operator {
    pub const ALL: [Operator; 6] = [
        Operator::Not,
        Operator::And,
        Operator::Or,
        Operator::Nand,
        Operator::Nor,
        Operator::Xor,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Operator::Not => "not",
            Operator::And => "and",
            Operator::Or => "or",
            Operator::Nand => "nand",
            Operator::Nor => "nor",
            Operator::Xor => "xor",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }

    pub fn apply(self, values: impl IntoIterator<Item = bool>) -> bool {
        let mut values = values.into_iter();
        match self {
            Operator::Not => match (values.next(), values.next()) {
                (Some(value), None) => !value,
                _ => panic!("negation applied to other than exactly one operand"),
            },
            Operator::And => values.all(|v| v),
            Operator::Or => values.any(|v| v),
            Operator::Nand => !values.all(|v| v),
            Operator::Nor => !values.any(|v| v),
            Operator::Xor => values.fold(false, |acc, v| acc ^ v),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Keyword heading a state test in the expression dialect.
pub const STATE_IS: &str = "state_is";

/// Immutable boolean expression tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expression {
    Constant(bool),
    Signal(SignalId),
    Operation(Operator, Vec<Expression>),
    StateIs(BTreeSet<StateId>),
}

impl Expression {
    pub const TRUE: Expression = Expression::Constant(true);
    pub const FALSE: Expression = Expression::Constant(false);

    pub fn not(operand: Expression) -> Self {
        Expression::Operation(Operator::Not, vec![operand])
    }

    pub fn and(operands: Vec<Expression>) -> Self {
        Expression::Operation(Operator::And, operands)
    }

    pub fn or(operands: Vec<Expression>) -> Self {
        Expression::Operation(Operator::Or, operands)
    }

    pub fn state_is(state: StateId) -> Self {
        Expression::StateIs(BTreeSet::from([state]))
    }

    /// Evaluates against `env`.
    ///
    /// # Panics
    ///
    /// Panics when a referenced signal has no value in `env`; evaluation order
    /// guarantees every dependency is computed first.
    pub fn evaluate(&self, env: &Environment) -> bool {
        match self {
            Expression::Constant(value) => *value,
            Expression::Signal(id) => env.value(*id),
            Expression::Operation(op, operands) => {
                op.apply(operands.iter().map(|operand| operand.evaluate(env)))
            }
            Expression::StateIs(states) => env.state().is_some_and(|st| states.contains(&st)),
        }
    }

    /// Every signal referenced anywhere in the tree.
    pub fn signals(&self) -> BTreeSet<SignalId> {
        let mut out = BTreeSet::new();
        self.collect_signals(&mut out);
        out
    }

    fn collect_signals(&self, out: &mut BTreeSet<SignalId>) {
        match self {
            Expression::Signal(id) => {
                out.insert(*id);
            }
            Expression::Operation(_, operands) => {
                for operand in operands {
                    operand.collect_signals(out);
                }
            }
            Expression::Constant(_) | Expression::StateIs(_) => {}
        }
    }

    /// Renders in the expression dialect so that the text compiles back to
    /// an equal tree.
    pub fn to_sexp(&self, names: &impl NameLookup) -> SExp {
        match self {
            Expression::Constant(value) => SExp::Int(i64::from(*value)),
            Expression::Signal(id) => {
                let name = names.signal_name(*id).unwrap_or("?");
                if is_identifier(name) {
                    SExp::atom(name)
                } else {
                    SExp::string(name)
                }
            }
            Expression::Operation(op, operands) => {
                let mut items = vec![SExp::atom(op.name())];
                items.extend(operands.iter().map(|operand| operand.to_sexp(names)));
                SExp::List(items)
            }
            Expression::StateIs(states) => {
                let mut items = vec![SExp::atom(STATE_IS)];
                items.extend(
                    states
                        .iter()
                        .map(|st| SExp::string(names.state_name(*st).unwrap_or("?"))),
                );
                SExp::List(items)
            }
        }
    }

    pub fn display<'a, N: NameLookup>(&'a self, names: &'a N) -> ExpressionDisplay<'a, N> {
        ExpressionDisplay { expr: self, names }
    }
}

/// Mirrors the lexer's atom rule; anything else must be quoted to read back.
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {
            chars.all(|c| c.is_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

pub struct ExpressionDisplay<'a, N> {
    expr: &'a Expression,
    names: &'a N,
}

impl<N: NameLookup> fmt::Display for ExpressionDisplay<'_, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expr.to_sexp(self.names))
    }
}

/// Immutable control-flow tree compiled from a state's code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Group {
        statements: Vec<Statement>,
        comment: Option<String>,
    },
    Emit {
        signal: SignalId,
        value: Expression,
    },
    Goto(StateId),
    Cond {
        condition: Expression,
        then_branch: Box<Statement>,
        else_branch: Box<Statement>,
    },
}

impl Statement {
    pub fn group(statements: Vec<Statement>) -> Self {
        Statement::Group {
            statements,
            comment: None,
        }
    }

    pub fn empty() -> Self {
        Self::group(Vec::new())
    }

    /// Collapses single-element groups, recursively.
    pub fn simplify(self) -> Statement {
        match self {
            Statement::Group {
                mut statements,
                comment,
            } => {
                if statements.len() == 1 {
                    if let Some(only) = statements.pop() {
                        return only.simplify();
                    }
                }
                Statement::Group {
                    statements: statements.into_iter().map(Statement::simplify).collect(),
                    comment,
                }
            }
            Statement::Cond {
                condition,
                then_branch,
                else_branch,
            } => Statement::Cond {
                condition,
                then_branch: Box::new(then_branch.simplify()),
                else_branch: Box::new(else_branch.simplify()),
            },
            other => other,
        }
    }

    /// Targets of every `goto` in the tree, without following them.
    pub fn gotos(&self) -> BTreeSet<StateId> {
        let mut out = BTreeSet::new();
        self.visit(&mut |stm| {
            if let Statement::Goto(target) = stm {
                out.insert(*target);
            }
        });
        out
    }

    /// Every `(signal, value)` emission in the tree, in source order.
    pub fn emissions(&self) -> Vec<(SignalId, &Expression)> {
        let mut out = Vec::new();
        self.collect_emissions(&mut out);
        out
    }

    fn collect_emissions<'a>(&'a self, out: &mut Vec<(SignalId, &'a Expression)>) {
        match self {
            Statement::Group { statements, .. } => {
                for stm in statements {
                    stm.collect_emissions(out);
                }
            }
            Statement::Emit { signal, value } => out.push((*signal, value)),
            Statement::Goto(_) => {}
            Statement::Cond {
                then_branch,
                else_branch,
                ..
            } => {
                then_branch.collect_emissions(out);
                else_branch.collect_emissions(out);
            }
        }
    }

    fn visit(&self, f: &mut impl FnMut(&Statement)) {
        f(self);
        match self {
            Statement::Group { statements, .. } => {
                for stm in statements {
                    stm.visit(f);
                }
            }
            Statement::Cond {
                then_branch,
                else_branch,
                ..
            } => {
                then_branch.visit(f);
                else_branch.visit(f);
            }
            Statement::Emit { .. } | Statement::Goto(_) => {}
        }
    }
}

/// Signal values and current state seen by expression evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    state: Option<StateId>,
    values: BTreeMap<SignalId, bool>,
}

impl Environment {
    pub fn new(state: Option<StateId>) -> Self {
        Self {
            state,
            values: BTreeMap::new(),
        }
    }

    pub fn state(&self) -> Option<StateId> {
        self.state
    }

    pub fn set(&mut self, signal: SignalId, value: bool) {
        self.values.insert(signal, value);
    }

    pub fn get(&self, signal: SignalId) -> Option<bool> {
        self.values.get(&signal).copied()
    }

    pub fn value(&self, signal: SignalId) -> bool {
        match self.get(signal) {
            Some(value) => value,
            None => panic!("{signal} evaluated before its value was computed"),
        }
    }

    pub fn values(&self) -> impl Iterator<Item = (SignalId, bool)> + '_ {
        self.values.iter().map(|(id, value)| (*id, *value))
    }
}
