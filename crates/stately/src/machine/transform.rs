use super::{Machine, SignalKind};
use crate::lexer::ParseError;
use crate::sexp::SExp;
use thiserror::Error;

const CMD_INITIAL: &str = "initial";
const CMD_NAME: &str = "name";
const CMD_SIGNAL: &str = "signal";
const CMD_STATE: &str = "state";
const CMD_TRANSLATE: &str = "translate";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// Carries the innermost malformed expression.
    #[error("Bad: {0}")]
    Bad(SExp),
}

fn bad(sexp: &SExp) -> TransformError {
    TransformError::Bad(sexp.clone())
}

/// Applies transform commands to a machine.
///
/// `translate` shifts the positions of every state added afterwards; shifts
/// accumulate.
#[derive(Debug)]
pub struct Transformer {
    machine: Machine,
    shift: (i64, i64),
}

impl Transformer {
    pub fn new(machine: Machine) -> Self {
        Self {
            machine,
            shift: (0, 0),
        }
    }

    pub fn finish(self) -> Machine {
        self.machine
    }

    pub fn apply(&mut self, command: &SExp) -> Result<(), TransformError> {
        let Some((head, args)) = command.as_list().and_then(|items| items.split_first()) else {
            return Err(bad(command));
        };
        match head.as_atom() {
            Some(CMD_INITIAL) => self.initial(command, args),
            Some(CMD_NAME) => self.name(command, args),
            Some(CMD_SIGNAL) => self.signal(command, args),
            Some(CMD_STATE) => self.state(command, args),
            Some(CMD_TRANSLATE) => self.translate(command, args),
            _ => Err(bad(command)),
        }
    }

    fn initial(&mut self, command: &SExp, args: &[SExp]) -> Result<(), TransformError> {
        let [name] = args else {
            return Err(bad(command));
        };
        let name = string(name)?;
        let id = self
            .machine
            .state_by_name(name)
            .map(|st| st.id)
            .ok_or_else(|| bad(command))?;
        self.machine.set_initial_state(id);
        Ok(())
    }

    fn name(&mut self, command: &SExp, args: &[SExp]) -> Result<(), TransformError> {
        let [name] = args else {
            return Err(bad(command));
        };
        self.machine.set_name(string(name)?);
        Ok(())
    }

    fn signal(&mut self, command: &SExp, args: &[SExp]) -> Result<(), TransformError> {
        let [name, kind, internal, description, code] = args else {
            return Err(bad(command));
        };
        let kind = kind
            .as_atom()
            .and_then(SignalKind::from_name)
            .ok_or_else(|| bad(kind))?;
        let internal = flag(internal)?;
        let description = string(description)?;
        let code = string(code)?;

        let id = self.machine.add_signal(string(name)?, kind);
        self.machine.set_signal_internal(id, internal);
        self.machine.set_signal_description(id, description);
        self.machine.set_signal_source(id, code);
        Ok(())
    }

    fn state(&mut self, command: &SExp, args: &[SExp]) -> Result<(), TransformError> {
        let [name, description, is_virtual, x, y, code] = args else {
            return Err(bad(command));
        };
        let description = string(description)?;
        let is_virtual = flag(is_virtual)?;
        let x = coordinate(x, self.shift.0)?;
        let y = coordinate(y, self.shift.1)?;
        let code = string(code)?;

        let id = self.machine.add_state(string(name)?);
        self.machine.set_state_description(id, description);
        self.machine.set_state_virtual(id, is_virtual);
        self.machine.set_state_position(id, x, y);
        self.machine.set_state_source(id, code);
        Ok(())
    }

    fn translate(&mut self, command: &SExp, args: &[SExp]) -> Result<(), TransformError> {
        let [dx, dy] = args else {
            return Err(bad(command));
        };
        let dx = dx.as_int().ok_or_else(|| bad(dx))?;
        let dy = dy.as_int().ok_or_else(|| bad(dy))?;
        self.shift = (
            self.shift.0.saturating_add(dx),
            self.shift.1.saturating_add(dy),
        );
        Ok(())
    }
}

fn string(sexp: &SExp) -> Result<&str, TransformError> {
    sexp.as_str().ok_or_else(|| bad(sexp))
}

fn flag(sexp: &SExp) -> Result<bool, TransformError> {
    match sexp.as_int() {
        Some(0) => Ok(false),
        Some(1) => Ok(true),
        _ => Err(bad(sexp)),
    }
}

fn coordinate(sexp: &SExp, shift: i64) -> Result<i32, TransformError> {
    sexp.as_int()
        .and_then(|n| n.checked_add(shift))
        .and_then(|n| i32::try_from(n).ok())
        .ok_or_else(|| bad(sexp))
}

fn command(name: &str, args: Vec<SExp>) -> SExp {
    let mut items = vec![SExp::atom(name)];
    items.extend(args);
    SExp::List(items)
}

impl Machine {
    /// Applies the commands in `source` to a copy of this machine. The copy is
    /// returned only when every command succeeds.
    pub fn import_commands(&self, source: &str) -> Result<Machine, TransformError> {
        let mut transformer = Transformer::new(self.clone());
        for sexp in SExp::parse_all(source)? {
            transformer.apply(&sexp)?;
        }
        Ok(transformer.finish())
    }

    /// Commands that rebuild this machine from an empty one: name, signals,
    /// states, then the initial state. `separator` goes between the first
    /// three sections.
    pub fn export_commands(&self, separator: Option<&SExp>) -> Vec<SExp> {
        let mut out = vec![command(CMD_NAME, vec![SExp::string(&self.name)])];
        out.extend(separator.cloned());
        for s in &self.signals {
            out.push(command(
                CMD_SIGNAL,
                vec![
                    SExp::string(&s.name),
                    SExp::atom(s.kind.name()),
                    SExp::Int(i64::from(s.internal)),
                    SExp::string(&s.description),
                    SExp::string(s.code.source()),
                ],
            ));
        }
        out.extend(separator.cloned());
        for st in &self.states {
            out.push(command(
                CMD_STATE,
                vec![
                    SExp::string(&st.name),
                    SExp::string(&st.description),
                    SExp::Int(i64::from(st.is_virtual)),
                    SExp::Int(i64::from(st.position.0)),
                    SExp::Int(i64::from(st.position.1)),
                    SExp::string(st.code.source()),
                ],
            ));
        }
        if let Some(initial) = self.initial.and_then(|id| self.state(id)) {
            out.push(command(CMD_INITIAL, vec![SExp::string(&initial.name)]));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_shifts_later_states() {
        let source = r#"
            (state "A" "" 0 1 1 "")
            (translate 10 0)
            (state "B" "" 0 1 1 "")
            (translate 0 -5)
            (state "C" "" 1 1 1 "")
        "#;
        let m = Machine::new("m").import_commands(source).unwrap();
        let position = |name| m.state_by_name(name).unwrap().position();
        assert_eq!(position("A"), (1, 1));
        assert_eq!(position("B"), (11, 1));
        assert_eq!(position("C"), (11, -4));
        assert!(m.state_by_name("C").unwrap().is_virtual());
    }

    #[test]
    fn test_initial_selects_state_without_renaming() {
        let source = r#"(name "m2") (state "A" "" 0 0 0 "") (state "B" "" 0 0 0 "") (initial "B")"#;
        let m = Machine::new("m").import_commands(source).unwrap();
        assert_eq!(m.name(), "m2");
        assert_eq!(
            m.initial_state(),
            m.state_by_name("B").map(|st| st.id())
        );
    }

    #[test]
    fn test_failed_import_leaves_machine_untouched() {
        let mut base = Machine::new("m");
        base.add_state("A");
        let err = base
            .import_commands(r#"(state "B" "" 0 0 0 "") (initial "Nope")"#)
            .unwrap_err();
        assert_eq!(err.to_string(), r#"Bad: (initial "Nope")"#);
        assert_eq!(base.states().len(), 1);
    }

    #[test]
    fn test_import_does_not_notify_source_subscribers() {
        use std::cell::Cell;
        use std::rc::Rc;

        let calls = Rc::new(Cell::new(0));
        let mut m = Machine::new("m");
        let counter = calls.clone();
        m.subscribe(move |_| counter.set(counter.get() + 1));

        let err = m
            .import_commands(r#"(signal "x" input 0 "" "") (bogus)"#)
            .unwrap_err();
        assert_eq!(err.to_string(), "Bad: (bogus)");
        assert_eq!(calls.get(), 0);

        let mut imported = m.import_commands(r#"(state "A" "" 0 0 0 "")"#).unwrap();
        assert_eq!(calls.get(), 0);
        imported.set_name("other");
        assert_eq!(calls.get(), 0);
        assert!(m.states().is_empty());
    }

    #[test]
    fn test_malformed_commands() {
        let m = Machine::new("m");
        let err = m.import_commands(r#"(signal "x" wire 0 "" "")"#).unwrap_err();
        assert_eq!(err.to_string(), "Bad: wire");
        let err = m.import_commands(r#"(state "x" "" 2 0 0 "")"#).unwrap_err();
        assert_eq!(err.to_string(), "Bad: 2");
        let err = m.import_commands("(frobnicate)").unwrap_err();
        assert_eq!(err.to_string(), "Bad: (frobnicate)");
        let err = m.import_commands("name").unwrap_err();
        assert_eq!(err.to_string(), "Bad: name");
    }

    #[test]
    fn test_export_with_separator() {
        let mut m = Machine::new("m");
        let go = m.add_signal("go", SignalKind::Input);
        m.set_signal_internal(go, true);
        m.add_state("A");
        let separator = SExp::atom("--");
        let lines: Vec<String> = m
            .export_commands(Some(&separator))
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            lines,
            [
                r#"(name "m")"#,
                "--",
                r#"(signal "go" input 1 "" "")"#,
                "--",
                r#"(state "A" "" 0 0 0 "")"#,
                r#"(initial "A")"#,
            ]
        );
    }
}
