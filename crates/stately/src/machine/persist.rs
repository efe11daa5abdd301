use super::{Machine, SignalKind};
use crate::lexer::ParseError;
use crate::sexp::SExp;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnpackError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("Malformed record: expected a list of (\"key\" value) pairs")]
    BadMap,
    #[error("Missing or malformed field \"{0}\"")]
    BadField(String),
    #[error("Expected exactly one machine expression, found {0}")]
    NotOneMachine(usize),
}

struct Record(BTreeMap<String, SExp>);

impl Record {
    fn new(sexp: &SExp) -> Result<Self, UnpackError> {
        sexp.to_record().map(Record).ok_or(UnpackError::BadMap)
    }

    fn get<'a, T>(&'a self, key: &str, f: impl FnOnce(&'a SExp) -> Option<T>) -> Result<T, UnpackError> {
        self.0
            .get(key)
            .and_then(f)
            .ok_or_else(|| UnpackError::BadField(key.to_string()))
    }

    fn string(&self, key: &str) -> Result<String, UnpackError> {
        self.get(key, |v| v.as_str().map(str::to_string))
    }

    fn flag(&self, key: &str) -> Result<bool, UnpackError> {
        self.get(key, |v| match v.as_int() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        })
    }

    fn coordinate(&self, key: &str) -> Result<i32, UnpackError> {
        self.get(key, |v| v.as_int().and_then(|n| i32::try_from(n).ok()))
    }

    fn list(&self, key: &str) -> Result<&[SExp], UnpackError> {
        self.get(key, SExp::as_list)
    }
}

fn flag(value: bool) -> SExp {
    SExp::Int(i64::from(value))
}

impl Machine {
    /// Serializes the machine as one record. Derived data is not saved.
    pub fn to_sexp(&self) -> SExp {
        let signals = self
            .signals
            .iter()
            .map(|s| {
                SExp::record(BTreeMap::from([
                    ("code", SExp::string(s.code.source())),
                    ("description", SExp::string(&s.description)),
                    ("internal", flag(s.internal)),
                    ("kind", SExp::atom(s.kind.name())),
                    ("name", SExp::string(&s.name)),
                ]))
            })
            .collect();
        let states = self
            .states
            .iter()
            .map(|st| {
                SExp::record(BTreeMap::from([
                    ("code", SExp::string(st.code.source())),
                    ("description", SExp::string(&st.description)),
                    ("name", SExp::string(&st.name)),
                    ("virtual", flag(st.is_virtual)),
                    ("x", SExp::Int(i64::from(st.position.0))),
                    ("y", SExp::Int(i64::from(st.position.1))),
                ]))
            })
            .collect();

        let mut fields = BTreeMap::from([
            ("name", SExp::string(&self.name)),
            ("signals", SExp::List(signals)),
            ("states", SExp::List(states)),
        ]);
        if let Some(initial) = self.initial.and_then(|id| self.state(id)) {
            fields.insert("initial", SExp::string(&initial.name));
        }
        SExp::record(fields)
    }

    /// Builds a fresh machine from a record written by [`Machine::to_sexp`].
    pub fn from_sexp(sexp: &SExp) -> Result<Machine, UnpackError> {
        let record = Record::new(sexp)?;
        let mut machine = Machine::new(record.string("name")?);

        for entry in record.list("signals")? {
            let fields = Record::new(entry)?;
            let kind = fields.get("kind", |v| v.as_atom().and_then(SignalKind::from_name))?;
            let internal = match fields.0.get("internal") {
                Some(_) => fields.flag("internal")?,
                None => false,
            };
            let id = machine.add_signal(fields.string("name")?, kind);
            let signal = machine.signal_mut(id);
            signal.internal = internal;
            signal.description = fields.string("description")?;
            signal.code.set_source(fields.string("code")?);
        }

        for entry in record.list("states")? {
            let fields = Record::new(entry)?;
            let id = machine.add_state(fields.string("name")?);
            let state = machine.state_mut(id);
            state.is_virtual = fields.flag("virtual")?;
            state.description = fields.string("description")?;
            state.position = (fields.coordinate("x")?, fields.coordinate("y")?);
            state.code.set_source(fields.string("code")?);
        }

        // No key means the saved machine had no initial state; an unknown
        // name keeps the first state added.
        if record.0.contains_key("initial") {
            let name = record.string("initial")?;
            if let Some(id) = machine.state_by_name(&name).map(|st| st.id) {
                machine.initial = Some(id);
            }
        } else {
            machine.initial = None;
        }
        Ok(machine)
    }

    /// Parses machine file text.
    pub fn load(text: &str) -> Result<Machine, UnpackError> {
        match SExp::parse_all(text)?.as_slice() {
            [sexp] => Machine::from_sexp(sexp),
            other => Err(UnpackError::NotOneMachine(other.len())),
        }
    }

    /// Renders machine file text.
    pub fn save(&self) -> String {
        format!("{}\n", self.to_sexp())
    }
}
