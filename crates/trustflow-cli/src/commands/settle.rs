//! Settle command implementation.

use std::io::Write;

use tracing::debug;

use crate::cli::SettleArgs;
use crate::error::CliError;
use crate::output::{OutputFormat, SettleReport};
use crate::scenario::Scenario;

/// Settle command executor.
#[derive(Debug, Default)]
pub struct SettleCommand;

impl SettleCommand {
    /// Create a new settle command.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Execute the settle command.
    ///
    /// # Errors
    ///
    /// Returns an error if the scenario cannot be loaded, any setup step or
    /// the settlement fails, or output fails.
    pub fn execute<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        args: &SettleArgs,
    ) -> Result<(), CliError> {
        debug!(scenario = %args.scenario.display(), "loading scenario");
        let scenario = Scenario::load(&args.scenario)?;
        let report = Self::report(&scenario, args.events)?;
        format.write(writer, &report)
    }

    /// Run a scenario and build its report.
    ///
    /// # Errors
    ///
    /// Returns the first failing setup step or the settlement error.
    pub fn report(scenario: &Scenario, with_events: bool) -> Result<SettleReport, CliError> {
        let outcome = scenario.run()?;
        Ok(SettleReport {
            receipt: outcome.receipt,
            events: with_events.then_some(outcome.events),
        })
    }
}
