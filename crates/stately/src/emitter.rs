//! Generates FL source for a happy machine: a state enumeration plus a module
//! holding one Moore FSM block and the combinational signal assignments.

use crate::flatting::Model;
use crate::ir::{Expression, NameLookup, Operator, StateId};
use crate::machine::{Machine, MachineStatus, SignalKind};
use crate::optimizer::simplify;
use crate::sexp::quote;
use itertools::Itertools;
use serde::Deserialize;
use thiserror::Error;

mod names;

pub use names::check_names;

const INDENT: &str = "    ";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmitOptions {
    pub clock: String,
    pub state_variable: String,
    /// Loaded with `cload` at the top of the output.
    pub libraries: Vec<String>,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            clock: "clk".to_string(),
            state_variable: "state".to_string(),
            libraries: vec!["ste.fl".to_string()],
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EmitError {
    #[error("Cannot generate FL for a machine that is {status}; resolve its issues first")]
    NotHappy { status: MachineStatus },
}

/// Renders `machine` as FL.
pub fn emit(machine: &Machine, options: &EmitOptions) -> Result<String, EmitError> {
    let model = match machine.model() {
        Some(model) if machine.status() == MachineStatus::Happy => model,
        _ => {
            return Err(EmitError::NotHappy {
                status: machine.status(),
            });
        }
    };
    let emitter = Emitter {
        machine,
        model,
        options,
    };

    let mut out = format!("// {} (autogenerated by Stately)\n\n", machine.name());
    for library in &options.libraries {
        out += &format!("cload {};\n", quote(library));
    }
    out.push('\n');
    for line in emitter.state_enum() {
        out += &line;
        out.push('\n');
    }
    out.push('\n');
    for line in emitter.module() {
        out += &line;
        out.push('\n');
    }
    Ok(out)
}

struct Emitter<'a> {
    machine: &'a Machine,
    model: &'a Model,
    options: &'a EmitOptions,
}

impl Emitter<'_> {
    fn state_enum(&self) -> Vec<String> {
        let items = self
            .machine
            .states()
            .iter()
            .map(|st| quote(&names::state_name(st.name())))
            .collect();
        let mut out = vec![format!("ENUM {}", quote(&names::enum_type(self.machine)))];
        out.extend(indent(list(items, true)));
        out
    }

    fn module(&self) -> Vec<String> {
        let mut out = vec![format!("let {} =", names::machine_name(self.machine))];
        out.extend(indent(self.declarations()));
        out.extend(indent(self.cell()));
        out
    }

    fn declarations(&self) -> Vec<String> {
        let signals = self.machine.signals();
        let mut out = vec![
            "// clock".to_string(),
            format!("bit_input {}.", self.options.clock),
            "// inputs".to_string(),
        ];
        out.extend(
            signals
                .iter()
                .filter(|s| s.kind() == SignalKind::Input)
                .map(|s| format!("bit_input {}.", names::signal_name(s.name()))),
        );
        out.push("// outputs".to_string());
        out.extend(
            signals
                .iter()
                .filter(|s| s.kind() != SignalKind::Input && !s.is_internal())
                .map(|s| format!("bit_output {}.", names::signal_name(s.name()))),
        );
        out.push("// internals".to_string());
        out.extend(
            signals
                .iter()
                .filter(|s| s.kind() != SignalKind::Input && s.is_internal())
                .map(|s| format!("bit_internal {}.", names::signal_name(s.name()))),
        );
        out.push("// state".to_string());
        out.push(format!(
            "{}_internal {}.",
            names::enum_type(self.machine),
            self.options.state_variable
        ));
        out
    }

    fn cell(&self) -> Vec<String> {
        let mut blocks = vec![self.moore_fsm()];
        for computation in self.model.computations() {
            blocks.push(vec![format!(
                "{} <- {}",
                names::signal_name(self.model.signal_name(computation.signal).unwrap_or("?")),
                self.expression(&computation.expression)
            )]);
        }
        let mut out = vec![format!(
            "CELL {}",
            quote(&format!("draw_hier {}", names::machine_name(self.machine)))
        )];
        out.extend(indent(list_blocks(blocks, true)));
        out
    }

    fn moore_fsm(&self) -> Vec<String> {
        let mut out = vec![format!(
            "Moore_FSM {} {} {} ({}, {})",
            quote(&names::moore_name(self.machine)),
            self.options.clock,
            self.options.state_variable,
            self.expression(self.model.reset_condition()),
            self.state(self.model.initial_state()),
        )];
        let rules = self
            .machine
            .states()
            .iter()
            .filter(|st| !st.is_virtual())
            .flat_map(|st| self.model.transitions_from(st.id()))
            .map(|t| {
                format!(
                    "{} --- {} --- {}",
                    self.state(t.source()),
                    self.expression(&t.guard),
                    self.state(t.destination())
                )
            })
            .collect();
        out.extend(indent(list(rules, false)));
        out
    }

    fn state(&self, id: StateId) -> String {
        names::state_name(self.model.state_name(id).unwrap_or("?"))
    }

    fn expression(&self, expr: &Expression) -> String {
        self.render(&prepare(&simplify(expr)))
    }

    fn render(&self, expr: &Expression) -> String {
        match expr {
            Expression::Constant(true) => "'1".to_string(),
            Expression::Constant(false) => "'0".to_string(),
            Expression::Signal(id) => names::signal_name(self.model.signal_name(*id).unwrap_or("?")),
            Expression::Operation(Operator::Not, operands) => match operands.as_slice() {
                [operand] => format!("('~' {})", self.render(operand)),
                _ => panic!("negation with {} operands", operands.len()),
            },
            Expression::Operation(op, operands) => {
                let symbol = match op {
                    Operator::And => "'&'",
                    Operator::Or => "'|'",
                    Operator::Xor => "'^'",
                    Operator::Not | Operator::Nand | Operator::Nor => {
                        panic!("{op} survived FL preparation")
                    }
                };
                match operands.as_slice() {
                    [] if *op == Operator::And => "'1".to_string(),
                    [] => "'0".to_string(),
                    [only] => self.render(only),
                    _ => format!(
                        "({})",
                        operands
                            .iter()
                            .map(|operand| self.render(operand))
                            .join(&format!(" {symbol} "))
                    ),
                }
            }
            Expression::StateIs(states) => match states.iter().exactly_one() {
                Ok(state) => format!("(is_{} {})", self.state(*state), self.options.state_variable),
                Err(_) => panic!("state test over {} states survived FL preparation", states.len()),
            },
        }
    }
}

/// Rewrites NAND and NOR as negated AND and OR, and splits state tests into
/// one test per state.
fn prepare(expr: &Expression) -> Expression {
    match expr {
        Expression::Operation(op, operands) => {
            let operands = operands.iter().map(prepare).collect();
            match op {
                Operator::Nand => Expression::not(Expression::and(operands)),
                Operator::Nor => Expression::not(Expression::or(operands)),
                _ => Expression::Operation(*op, operands),
            }
        }
        Expression::StateIs(states) => match states.len() {
            0 => Expression::FALSE,
            1 => expr.clone(),
            _ => Expression::or(states.iter().map(|st| Expression::state_is(*st)).collect()),
        },
        Expression::Constant(_) | Expression::Signal(_) => expr.clone(),
    }
}

fn indent(lines: Vec<String>) -> impl Iterator<Item = String> {
    lines.into_iter().map(|line| format!("{INDENT}{line}"))
}

fn close(semicolon: bool) -> &'static str {
    if semicolon { "];" } else { "]" }
}

fn list(items: Vec<String>, semicolon: bool) -> Vec<String> {
    list_blocks(items.into_iter().map(|item| vec![item]).collect(), semicolon)
}

/// FL list whose elements may span several lines.
fn list_blocks(blocks: Vec<Vec<String>>, semicolon: bool) -> Vec<String> {
    if blocks.is_empty() {
        return vec![format!("[{}", close(semicolon))];
    }
    let mut lines = Vec::new();
    for (i, block) in blocks.into_iter().enumerate() {
        let block_prefix = if i == 0 { "[ " } else { ", " };
        for (j, line) in block.into_iter().enumerate() {
            let prefix = if j == 0 { block_prefix } else { "  " };
            lines.push(format!("{prefix}{line}"));
        }
    }
    lines.push(close(semicolon).to_string());
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::SignalId;
    use std::collections::BTreeSet;

    #[test]
    fn test_prepare_rewrites_nand_nor_and_state_sets() {
        let a = Expression::Signal(SignalId(0));
        let nand = Expression::Operation(Operator::Nand, vec![a.clone(), a.clone()]);
        assert_eq!(
            prepare(&nand),
            Expression::not(Expression::and(vec![a.clone(), a.clone()]))
        );
        let nor = Expression::Operation(Operator::Nor, vec![a.clone()]);
        assert_eq!(prepare(&nor), Expression::not(Expression::or(vec![a])));

        let two = Expression::StateIs(BTreeSet::from([StateId(1), StateId(2)]));
        assert_eq!(
            prepare(&two),
            Expression::or(vec![
                Expression::state_is(StateId(1)),
                Expression::state_is(StateId(2))
            ])
        );
        assert_eq!(prepare(&Expression::StateIs(BTreeSet::new())), Expression::FALSE);
    }

    #[test]
    fn test_list_blocks() {
        assert_eq!(list_blocks(Vec::new(), true), ["[];"]);
        assert_eq!(list(Vec::new(), false), ["[]"]);
        let lines = list_blocks(
            vec![
                vec!["a".to_string(), "b".to_string()],
                vec!["c".to_string()],
            ],
            false,
        );
        assert_eq!(lines, ["[ a", "  b", ", c", "]"]);
    }

    #[test]
    fn test_refuses_unhappy_machine() {
        let m = Machine::new("m");
        assert_eq!(
            emit(&m, &EmitOptions::default()).unwrap_err(),
            EmitError::NotHappy {
                status: MachineStatus::Uncompiled
            }
        );
    }
}
