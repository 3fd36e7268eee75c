//! OCHA classification of candidate communes for anticipatory action.

use anyhow::Result;
use polars::prelude::DataFrame;

use crate::config::Config;
use crate::io::excel;

const SHEET: &str = "Tillaberi + Dosso";

/// Load the commune-classification workbook (one sheet per workshop region).
pub fn load_communes(cfg: &Config) -> Result<DataFrame> {
    excel::read_excel(&cfg.ocha_communes_path(), Some(SHEET), 0)
}
