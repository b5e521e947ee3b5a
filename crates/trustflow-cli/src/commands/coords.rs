//! Coordinate encoding and decoding commands.

use std::io::Write;

use trustflow_core::{Coordinate, CoordinateTriple, coords};

use crate::error::CliError;
use crate::output::{CoordinatesView, OutputFormat};

/// Coordinate command executor.
#[derive(Debug, Default)]
pub struct CoordsCommand;

impl CoordsCommand {
    /// Create a new coordinate command.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Pack `asset,sender,receiver` triples.
    ///
    /// # Errors
    ///
    /// Returns an error if a triple is malformed or output fails.
    pub fn encode<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        triples: &[String],
    ) -> Result<(), CliError> {
        let parsed = triples
            .iter()
            .map(String::as_str)
            .map(parse_triple)
            .collect::<Result<Vec<_>, _>>()?;
        let view = CoordinatesView::new(&coords::pack(&parsed), &parsed);
        format.write(writer, &view)
    }

    /// Unpack hex coordinates.
    ///
    /// # Errors
    ///
    /// Returns an error if the hex is invalid, its length is not a multiple
    /// of six bytes, or output fails.
    pub fn decode<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        hex_input: &str,
    ) -> Result<(), CliError> {
        let packed = hex::decode(hex_input.trim_start_matches("0x"))
            .map_err(|e| CliError::InvalidArgument(format!("invalid hex: {e}")))?;
        let triples = coords::unpack_all(&packed)?;
        let view = CoordinatesView::new(&packed, &triples);
        format.write(writer, &view)
    }
}

fn parse_triple(input: &str) -> Result<CoordinateTriple, CliError> {
    let parts = input
        .split(',')
        .map(|p| p.trim().parse::<Coordinate>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| CliError::InvalidArgument(format!("invalid triple '{input}': {e}")))?;
    match parts.as_slice() {
        [asset, sender, receiver] => Ok(CoordinateTriple::new(*asset, *sender, *receiver)),
        _ => Err(CliError::InvalidArgument(format!(
            "triple '{input}' must have three comma-separated indices"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Format;
    use test_case::test_case;

    #[test_case("0,0,1" => Some([0, 0, 1]) ; "plain")]
    #[test_case(" 2, 1 ,3 " => Some([2, 1, 3]) ; "whitespace")]
    #[test_case("1,2" => None ; "too short")]
    #[test_case("1,2,3,4" => None ; "too long")]
    #[test_case("1,x,3" => None ; "not a number")]
    #[test_case("70000,0,0" => None ; "out of range")]
    fn parses_triples(input: &str) -> Option<[u16; 3]> {
        parse_triple(input).ok().map(|t| t.as_array())
    }

    #[test]
    fn encode_then_decode_outputs_match() {
        let format = OutputFormat::new(Format::Json);
        let mut encoded = Vec::new();
        CoordsCommand::new()
            .encode(&mut encoded, &format, &["0,0,1".into(), "1,1,2".into()])
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&encoded).unwrap();
        let hex = value["hex"].as_str().unwrap().to_string();
        assert_eq!(hex, "0x000000000001000100010002");

        let mut decoded = Vec::new();
        CoordsCommand::new().decode(&mut decoded, &format, &hex).unwrap();
        assert_eq!(encoded, decoded);
    }

    #[test]
    fn decode_rejects_truncated_input() {
        let err = CoordsCommand::new()
            .decode(&mut Vec::new(), &OutputFormat::new(Format::Table), "0x00000000")
            .unwrap_err();
        assert!(matches!(err, CliError::Core(_)));
    }

    #[test]
    fn decode_rejects_bad_hex() {
        let err = CoordsCommand::new()
            .decode(&mut Vec::new(), &OutputFormat::new(Format::Table), "zz")
            .unwrap_err();
        assert!(matches!(err, CliError::InvalidArgument(_)));
    }
}
