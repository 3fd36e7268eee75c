use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Resolved configuration for one invocation.
///
/// All path and credential lookups happen here, once, so that every
/// datasource function can be exercised against a fixture directory
/// without touching the process environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base directory for all raw and processed data.
    pub data_dir: PathBuf,
    /// Shared-access signature for the prod blob container, if set.
    pub prod_blob_sas: Option<String>,
    /// Shared-access signature for the dev blob container, if set.
    pub dev_blob_sas: Option<String>,
}

impl Config {
    /// Build a config from the process environment.
    ///
    /// `AA_DATA_DIR` is required and missing it is a hard error; the blob
    /// SAS tokens are only needed when a blob operation is actually used.
    pub fn from_env() -> Result<Self> {
        let data_dir = env::var("AA_DATA_DIR")
            .context("[config] AA_DATA_DIR is not set; point it at the base data directory")?;
        Ok(Self {
            data_dir: PathBuf::from(data_dir),
            prod_blob_sas: env::var("PROD_BLOB_SAS").ok(),
            dev_blob_sas: env::var("DEV_BLOB_SAS").ok(),
        })
    }

    /// Config rooted at an explicit directory (fixtures, tests).
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self { data_dir: data_dir.into(), prod_blob_sas: None, dev_blob_sas: None }
    }

    pub fn codab_raw_path(&self) -> PathBuf {
        self.data_dir.join("public/raw/ner/codab/ner.shp.zip")
    }

    pub fn floodscan_raw_path(&self) -> PathBuf {
        self.data_dir
            .join("private/raw/glb/FloodScan/SFED/SFED_historical")
            .join("aer_sfed_area_300s_19980112_20231231_v05r01.nc")
    }

    pub fn floodscan_proc_dir(&self) -> PathBuf {
        self.data_dir.join("private/processed/ner/floodscan")
    }

    pub fn worldpop_raw_path(&self) -> PathBuf {
        self.data_dir
            .join("public/raw/ner/worldpop")
            .join("ner_ppp_2020_1km_Aggregated_UNadj.tif")
    }

    pub fn worldpop_proc_dir(&self) -> PathBuf {
        self.data_dir.join("public/processed/ner/worldpop")
    }

    pub fn abn_raw_dir(&self) -> PathBuf {
        self.data_dir.join("private/raw/ner/abn")
    }

    pub fn anadia_raw_path(&self) -> PathBuf {
        self.data_dir
            .join("public/raw/ner/anadia")
            .join("Niger_ANADIA_2023_03_08_allentries.xls")
    }

    pub fn anadia_proc_path(&self) -> PathBuf {
        self.data_dir.join("public/processed/ner/anadia/ner_anadia_processed.csv")
    }

    pub fn hydrosheds_raw_dir(&self) -> PathBuf {
        self.data_dir
            .join("public/raw/glb/hydrosheds")
            .join("HydroRIVERS_v10_af_shp/HydroRIVERS_v10_af_shp")
    }

    pub fn hydrosheds_proc_dir(&self) -> PathBuf {
        self.data_dir.join("public/processed/glb/hydrosheds")
    }

    pub fn ocha_communes_path(&self) -> PathBuf {
        self.data_dir.join("public/raw/ner/ocha").join(
            "AA Inondations - Classification des communes potentielles_VF_résultat atelier_OIM.xlsx",
        )
    }
}
