use crate::ir::{Environment, NameLookup, SignalId, StateId};
use std::collections::VecDeque;

/// One recorded step: the state the machine was in and everything computed
/// there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub state: StateId,
    pub environment: Environment,
}

/// Bounded record of past steps, oldest first.
#[derive(Debug, Clone, Default)]
pub struct History {
    records: VecDeque<Snapshot>,
    limit: Option<usize>,
}

impl History {
    /// `limit` of `None` keeps every record.
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            records: VecDeque::new(),
            limit,
        }
    }

    pub fn record(&mut self, state: StateId, environment: Environment) {
        self.records.push_back(Snapshot { state, environment });
        self.trim();
    }

    /// Removes and returns the newest record.
    pub fn unrecord(&mut self) -> Option<Snapshot> {
        self.records.pop_back()
    }

    pub fn peek(&self) -> Option<&Snapshot> {
        self.records.back()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Drops the oldest records right away if the new limit is exceeded.
    pub fn set_limit(&mut self, limit: Option<usize>) {
        self.limit = limit;
        self.trim();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Snapshot> + '_ {
        self.records.iter()
    }

    fn trim(&mut self) {
        if let Some(limit) = self.limit {
            while self.records.len() > limit {
                self.records.pop_front();
            }
        }
    }

    /// ASCII waveform of `signals`, two lines each, two columns per record.
    pub fn waveform(&self, names: &impl NameLookup, signals: &[SignalId], label_width: usize) -> String {
        let mut out = String::new();
        for &signal in signals {
            let name = names.signal_name(signal).unwrap_or("?");
            let label = format!("{:>label_width$}", format!("{name} "));
            let mut upper = " ".repeat(label.chars().count());
            let mut lower = label;

            let mut previous = None;
            for snapshot in &self.records {
                let Some(current) = snapshot.environment.get(signal) else {
                    upper.push_str("  ");
                    lower.push_str("??");
                    continue;
                };
                let (top, bottom) = match (previous.unwrap_or(current), current) {
                    (true, true) => ("__", "  "),
                    (true, false) => ("  ", "\\_"),
                    (false, true) => (" _", "/ "),
                    (false, false) => ("  ", "__"),
                };
                upper.push_str(top);
                lower.push_str(bottom);
                previous = Some(current);
            }

            out.push_str(&upper);
            out.push('\n');
            out.push_str(&lower);
            out.push('\n');
        }
        out
    }
}
