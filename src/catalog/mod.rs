//! The disease catalog: a table of records and a row-aligned matrix of
//! precomputed symptom embeddings, loaded together or not at all.

pub mod hasher;
pub mod npy;
pub mod table;

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::config::CatalogConfig;
use npy::Matrix;

/// One catalog row. Field names follow the table's column headers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseRecord {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Symptoms")]
    pub symptoms: String,
    #[serde(rename = "Treatments")]
    pub treatments: String,
    #[serde(rename = "Contagious", deserialize_with = "table::deserialize_flag")]
    pub contagious: bool,
    #[serde(rename = "Chronic", deserialize_with = "table::deserialize_flag")]
    pub chronic: bool,
}

#[derive(Debug)]
pub struct Catalog {
    records: Vec<DiseaseRecord>,
    embeddings: Matrix,
    fingerprint: Option<String>,
}

impl Catalog {
    /// Pair records with their embeddings. Row counts must match.
    pub fn new(records: Vec<DiseaseRecord>, embeddings: Matrix) -> Result<Self> {
        ensure!(
            records.len() == embeddings.rows(),
            "disease table has {} rows but embedding matrix has {}",
            records.len(),
            embeddings.rows()
        );
        Ok(Self {
            records,
            embeddings,
            fingerprint: None,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn dimensions(&self) -> usize {
        self.embeddings.cols()
    }

    pub fn records(&self) -> &[DiseaseRecord] {
        &self.records
    }

    /// Records paired with their embedding rows, in catalog order.
    pub fn entries(&self) -> impl Iterator<Item = (&DiseaseRecord, &[f32])> {
        self.records.iter().zip(self.embeddings.iter_rows())
    }

    pub fn fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }
}

/// Load both artifacts from the configured directory. Any failure leaves
/// nothing loaded.
pub fn load(config: &CatalogConfig) -> Result<Catalog> {
    let table_path = config.table_path();
    let matrix_path = config.embeddings_path();

    // Each file is read once; the fingerprint covers exactly what was parsed.
    let table_bytes = std::fs::read(&table_path)
        .with_context(|| format!("opening disease table {}", table_path.display()))?;
    let matrix_bytes = std::fs::read(&matrix_path)
        .with_context(|| format!("reading matrix {}", matrix_path.display()))?;

    let records = table::parse_bytes(&table_bytes)
        .with_context(|| format!("reading disease table {}", table_path.display()))?;
    let embeddings = npy::parse(&matrix_bytes)
        .with_context(|| format!("decoding matrix {}", matrix_path.display()))?;
    let mut catalog = Catalog::new(records, embeddings)?;
    catalog.fingerprint = Some(hasher::fingerprint(&[
        table_bytes.as_slice(),
        matrix_bytes.as_slice(),
    ]));

    tracing::debug!(
        table = %table_path.display(),
        embeddings = %matrix_path.display(),
        "catalog artifacts read"
    );
    Ok(catalog)
}
