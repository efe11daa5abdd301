use crate::parser::CompileError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Compilation<T> {
    Pending,
    Compiled(T),
    Failed(String),
}

/// Source text owned by a signal or state, plus the outcome of its last
/// compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Code<T> {
    source: String,
    compilation: Compilation<T>,
}

impl<T> Default for Code<T> {
    fn default() -> Self {
        Self::new(String::new())
    }
}

impl<T> Code<T> {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            compilation: Compilation::Pending,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Replaces the source and forgets any previous compilation.
    pub fn set_source(&mut self, source: impl Into<String>) {
        self.source = source.into();
        self.reset();
    }

    pub fn reset(&mut self) {
        self.compilation = Compilation::Pending;
    }

    pub fn is_compiled(&self) -> bool {
        matches!(self.compilation, Compilation::Compiled(_))
    }

    pub fn compiled(&self) -> Option<&T> {
        match &self.compilation {
            Compilation::Compiled(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.compilation {
            Compilation::Failed(message) => Some(message),
            _ => None,
        }
    }

    /// Compiles with `compiler` unless already compiled. Returns whether the
    /// unit holds a compiled value afterwards.
    pub fn compile(&mut self, compiler: impl FnOnce(&str) -> Result<T, CompileError>) -> bool {
        if self.is_compiled() {
            return true;
        }
        let outcome = compiler(&self.source);
        self.store(outcome)
    }

    /// Records the outcome of a compilation performed elsewhere.
    pub fn store(&mut self, outcome: Result<T, CompileError>) -> bool {
        self.compilation = match outcome {
            Ok(value) => Compilation::Compiled(value),
            Err(err) => Compilation::Failed(err.to_string()),
        };
        self.is_compiled()
    }
}
