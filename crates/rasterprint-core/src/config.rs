// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{RasterPrintError, Result};
use crate::types::Dpi;

/// Default document name shown in the OS spooler.
pub const DEFAULT_DOCUMENT_NAME: &str = "PDF Print Job";

/// Settings for one print run. Every field has a default, so a config file
/// only needs the keys it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrintConfig {
    /// Rasterization resolution (72..=1200).
    pub dpi: u32,
    /// Target printer; `None` selects the OS default printer.
    pub printer: Option<String>,
    /// Job name reported to the spooler.
    pub document_name: String,
    /// Directory or file of the PDFium shared library. `None` searches the
    /// usual locations.
    pub pdfium_library_path: Option<PathBuf>,
}

impl Default for PrintConfig {
    fn default() -> Self {
        Self {
            dpi: Dpi::DEFAULT.get(),
            printer: None,
            document_name: DEFAULT_DOCUMENT_NAME.to_string(),
            pdfium_library_path: None,
        }
    }
}

impl PrintConfig {
    /// Read a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            RasterPrintError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check value ranges without touching any subsystem.
    pub fn validate(&self) -> Result<()> {
        Dpi::new(self.dpi)?;
        if self.document_name.trim().is_empty() {
            return Err(RasterPrintError::Config(
                "document_name must not be empty".into(),
            ));
        }
        if let Some(name) = &self.printer
            && name.trim().is_empty()
        {
            return Err(RasterPrintError::Config(
                "printer name must not be empty; omit it to use the default printer".into(),
            ));
        }
        Ok(())
    }

    pub fn resolved_dpi(&self) -> Result<Dpi> {
        Dpi::new(self.dpi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = PrintConfig::default();
        assert_eq!(config.dpi, 300);
        assert_eq!(config.document_name, "PDF Print Job");
        assert!(config.printer.is_none());
        config.validate().expect("default config validates");
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{ "printer": "Office Laser" }}"#).expect("write");

        let config = PrintConfig::from_json_file(file.path()).expect("load");
        assert_eq!(config.printer.as_deref(), Some("Office Laser"));
        assert_eq!(config.dpi, 300);
    }

    #[test]
    fn out_of_range_dpi_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{ "dpi": 2400 }}"#).expect("write");

        let err = PrintConfig::from_json_file(file.path()).unwrap_err();
        assert!(matches!(err, RasterPrintError::InvalidDpi(2400)));
    }

    #[test]
    fn blank_printer_name_is_rejected() {
        let config = PrintConfig {
            printer: Some("  ".into()),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(RasterPrintError::Config(_))));
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = PrintConfig::from_json_file("/nonexistent/rasterprint.json").unwrap_err();
        assert!(matches!(err, RasterPrintError::Config(_)));
    }

    #[test]
    fn json_output_reloads() {
        let config = PrintConfig {
            dpi: 600,
            printer: Some("Label Printer".into()),
            ..Default::default()
        };
        let json = config.to_json_string().expect("serialize");
        let parsed: PrintConfig = serde_json::from_str(&json).expect("parse");
        assert_eq!(parsed, config);
    }
}
