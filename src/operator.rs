//! Operator-facing console output and the acknowledgment pause.

use console::{style, Term};
use tracing::{debug, warn};

use crate::launcher::LaunchError;

/// Whoever is watching the console
pub trait Operator: Send + Sync {
    /// Status banner between steps
    fn banner(&self, message: &str);

    /// Something the operator has to act on
    fn warn(&self, message: &str);

    /// Block until the operator confirms
    fn acknowledge(&self, prompt: &str) -> Result<(), LaunchError>;
}

/// Operator at a terminal
pub struct ConsoleOperator {
    term: Term,
    pause: bool,
}

impl ConsoleOperator {
    /// `pause = false` turns [`Operator::acknowledge`] into a no-op
    pub fn new(pause: bool) -> Self {
        Self {
            term: Term::stdout(),
            pause,
        }
    }
}

impl Operator for ConsoleOperator {
    fn banner(&self, message: &str) {
        println!("{} {}", style("==>").cyan().bold(), style(message).bold());
    }

    fn warn(&self, message: &str) {
        println!("{} {}", style("!!").yellow().bold(), message);
    }

    fn acknowledge(&self, prompt: &str) -> Result<(), LaunchError> {
        if !self.pause {
            debug!("Pause disabled, not waiting for operator");
            return Ok(());
        }
        if !console::user_attended() {
            warn!("Console is not interactive, continuing without acknowledgment");
            return Ok(());
        }

        println!("{}", style(prompt).dim());
        self.term
            .read_line()
            .map(|_| ())
            .map_err(|e| LaunchError::Operator(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acknowledge_without_pause_returns_immediately() {
        let operator = ConsoleOperator::new(false);
        assert!(operator.acknowledge("Press Enter to continue...").is_ok());
    }
}
