use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum GateError {
    #[error("executor {0} was already activated")]
    AlreadyOpen(String),
}

/// One-shot activation gate. Executors behind a closed gate do nothing until the
/// coordinator opens it, and it can be opened only once.
#[derive(Debug, Default)]
pub struct ActivationGate {
    open: bool,
}

impl ActivationGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn open(&mut self, owner: &str) -> Result<(), GateError> {
        if self.open {
            return Err(GateError::AlreadyOpen(owner.to_string()));
        }
        self.open = true;
        Ok(())
    }
}
