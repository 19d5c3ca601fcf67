//! Install progress reporting.

use tracing::{debug, warn};

use crate::error::{EngineError, Result};

/// Receives messages produced while the engine installs dependencies.
pub trait InstallReport {
    /// Record an informational message.
    fn report_info(&mut self, message: &str);

    /// Record a warning.
    fn report_warning(&mut self, message: &str);

    /// Record an error. Returning `Err` aborts the install.
    ///
    /// # Errors
    ///
    /// Implementations decide whether an error is fatal.
    fn report_error(&mut self, message: &str) -> Result<()>;
}

/// A report that stays silent and aborts on the first error.
///
/// Used where the install is expected to be a no-op, such as inside an
/// extracted bundle whose lockfile and cache are already complete.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThrowReport;

impl InstallReport for ThrowReport {
    fn report_info(&mut self, message: &str) {
        debug!(message, "install");
    }

    fn report_warning(&mut self, message: &str) {
        warn!(message, "install");
    }

    fn report_error(&mut self, message: &str) -> Result<()> {
        Err(EngineError::InstallFailed {
            message: message.to_owned(),
        }
        .into())
    }
}
