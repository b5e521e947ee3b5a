//! Output formatting for CLI commands.
//!
//! Supports table (human-readable) and JSON output formats.

use std::io::Write;

use serde::Serialize;
use trustflow_core::CoordinateTriple;
use trustflow_hub::{HubConfig, HubEvent, SettlementReceipt};

use crate::cli::Format;
use crate::error::CliError;

/// Output formatter that handles both table and JSON output.
#[derive(Debug, Clone, Copy)]
pub struct OutputFormat {
    format: Format,
}

impl OutputFormat {
    /// Create a new output formatter.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self { format }
    }

    /// Write a serializable value to the output.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TableDisplay,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, value)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Table => {
                value.write_table(writer)?;
            }
        }
        Ok(())
    }
}

/// Trait for types that can be displayed as a table.
pub trait TableDisplay {
    /// Write the value as a human-readable table.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError>;
}

/// Outcome of a settled scenario.
#[derive(Debug, Clone, Serialize)]
pub struct SettleReport {
    /// Settlement receipt.
    pub receipt: SettlementReceipt,
    /// Emitted events, if requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<HubEvent>>,
}

impl TableDisplay for SettleReport {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Settlement")?;
        writeln!(writer, "══════════════════════════════════")?;
        writeln!(writer, "Operator:  {}", self.receipt.operator)?;
        writeln!(writer, "Edges:     {}", self.receipt.edges)?;
        writeln!(writer, "Streams:   {}", self.receipt.streams)?;
        writeln!(writer)?;
        writeln!(writer, "{:<44} {:>40}", "VERTEX", "NET (atto)")?;
        for flow in &self.receipt.flows {
            writeln!(writer, "{:<44} {:>40}", flow.avatar.to_hex(), flow.net)?;
        }
        if let Some(events) = &self.events {
            writeln!(writer)?;
            writeln!(writer, "Events ({})", events.len())?;
            for event in events {
                writeln!(writer, "  {}", event.name())?;
            }
        }
        Ok(())
    }
}

/// Packed coordinates alongside their triples.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoordinatesView {
    /// `0x`-prefixed packed bytes.
    pub hex: String,
    /// `[asset, sender, receiver]` per edge.
    pub triples: Vec<[u16; 3]>,
}

impl CoordinatesView {
    /// Build a view from packed bytes and their triples.
    #[must_use]
    pub fn new(packed: &[u8], triples: &[CoordinateTriple]) -> Self {
        Self {
            hex: format!("0x{}", hex::encode(packed)),
            triples: triples.iter().map(CoordinateTriple::as_array).collect(),
        }
    }
}

impl TableDisplay for CoordinatesView {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Packed: {}", self.hex)?;
        writeln!(writer)?;
        writeln!(writer, "{:<6} {:>7} {:>7} {:>9}", "EDGE", "ASSET", "SENDER", "RECEIVER")?;
        for (i, [asset, sender, receiver]) in self.triples.iter().enumerate() {
            writeln!(writer, "{i:<6} {asset:>7} {sender:>7} {receiver:>9}")?;
        }
        Ok(())
    }
}

/// A validated hub configuration.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigView {
    /// Source file.
    pub path: String,
    /// Parsed configuration.
    pub config: HubConfig,
}

impl TableDisplay for ConfigView {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        let treasury = self
            .config
            .standard_treasury
            .map_or_else(|| "(none)".to_string(), |t| t.to_hex());
        let bootstrap = self
            .config
            .bootstrap_until
            .map_or_else(|| "(always open)".to_string(), |t| t.to_string());
        writeln!(writer, "Hub Configuration: {}", self.path)?;
        writeln!(writer, "══════════════════════════════════")?;
        writeln!(writer, "Standard treasury:   {treasury}")?;
        writeln!(writer, "Invitation cost:     {}", self.config.invitation_cost)?;
        writeln!(writer, "Bootstrap until:     {bootstrap}")?;
        writeln!(writer, "Max flow vertices:   {}", self.config.max_flow_vertices)?;
        writeln!(writer, "Max name length:     {}", self.config.names.max_name_length)?;
        writeln!(writer, "Max symbol length:   {}", self.config.names.max_symbol_length)?;
        writeln!(writer)?;
        writeln!(writer, "OK")?;
        Ok(())
    }
}
