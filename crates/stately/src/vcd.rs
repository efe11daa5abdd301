use crate::HashMap;
use crate::ir::{Environment, SignalId};
use std::io::{self, BufWriter, Write};

/// Streams one-bit signal values as a Value Change Dump.
pub struct VcdWriter<W: Write> {
    writer: BufWriter<W>,
    signal_order: Vec<SignalId>,
    id_map: HashMap<SignalId, String>,
    last_values: HashMap<SignalId, bool>,
    timestamp: Option<u64>,
}

impl<W: Write> VcdWriter<W> {
    /// Writes the header declaring `signals` inside one module scope.
    pub fn new(out: W, scope: &str, signals: &[(SignalId, &str)]) -> io::Result<Self> {
        let mut writer = BufWriter::new(out);
        let mut id_map = HashMap::default();
        let mut signal_order = Vec::with_capacity(signals.len());

        writeln!(writer, "$version")?;
        writeln!(writer, "  stately")?;
        writeln!(writer, "$end")?;
        writeln!(writer, "$timescale 1ns $end")?;
        writeln!(writer, "$scope module {} $end", identifier(scope))?;
        for (index, (signal, name)) in signals.iter().enumerate() {
            let vcd_id = Self::generate_vcd_id(index);
            writeln!(writer, "$var wire 1 {} {} $end", vcd_id, identifier(name))?;
            id_map.insert(*signal, vcd_id);
            signal_order.push(*signal);
        }
        writeln!(writer, "$upscope $end")?;
        writeln!(writer, "$enddefinitions $end")?;

        Ok(Self {
            writer,
            signal_order,
            id_map,
            last_values: HashMap::default(),
            timestamp: None,
        })
    }

    fn generate_vcd_id(num: usize) -> String {
        let mut id = String::new();
        let mut n = num;
        loop {
            let char = ((n % 94) + 33) as u8 as char;
            id.push(char);
            if n < 94 {
                break;
            }
            n = (n / 94) - 1;
        }
        id.chars().rev().collect()
    }

    /// Writes the values of `env` that changed since the last dump. Signals
    /// without a value in `env` are skipped.
    pub fn dump(&mut self, timestamp: u64, env: &Environment) -> io::Result<()> {
        if self.timestamp.is_none_or(|last| timestamp > last) {
            writeln!(self.writer, "#{timestamp}")?;
            self.timestamp = Some(timestamp);
        }
        for signal in &self.signal_order {
            let Some(value) = env.get(*signal) else {
                continue;
            };
            if self.last_values.get(signal) != Some(&value) {
                writeln!(self.writer, "{}{}", u8::from(value), self.id_map[signal])?;
                self.last_values.insert(*signal, value);
            }
        }
        Ok(())
    }

    /// Flushes and hands back the underlying writer.
    pub fn finish(self) -> io::Result<W> {
        self.writer.into_inner().map_err(|err| err.into_error())
    }
}

fn identifier(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}
