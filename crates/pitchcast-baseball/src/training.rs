// Training matrix export: encoded feature rows plus their pitch-type label.

use crate::encoding::{self, FeatureEncoding};
use crate::pitch::PitchType;
use crate::table::FeatureRow;
use std::io::Write;
use std::path::Path;
use tracing::info;

pub const LABEL_COLUMN: &str = "label";

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSample {
    pub values: Vec<f64>,
    pub label: PitchType,
}

/// Rows dropped while building a matrix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrainingSkips {
    pub undefined_rates: usize,
    pub other_labels: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingMatrix {
    encoding: FeatureEncoding,
    samples: Vec<TrainingSample>,
    skipped: TrainingSkips,
}

#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl TrainingMatrix {
    /// Encode every row whose rates are defined. Rows labelled `other` are
    /// left out when `drop_other_labels` is set.
    pub fn build(rows: &[FeatureRow], encoding: FeatureEncoding, drop_other_labels: bool) -> TrainingMatrix {
        let mut samples = Vec::with_capacity(rows.len());
        let mut skipped = TrainingSkips::default();
        for row in rows {
            let label = row.event.pitch_type;
            if drop_other_labels && label == PitchType::Other {
                skipped.other_labels += 1;
                continue;
            }
            let Some(inputs) = row.model_inputs() else {
                skipped.undefined_rates += 1;
                continue;
            };
            // Rows always carry history, so only undefined rates can fail to encode.
            match encoding::encode(&inputs, encoding) {
                Ok(vector) => samples.push(TrainingSample {
                    values: vector.into_values(),
                    label,
                }),
                Err(_) => skipped.undefined_rates += 1,
            }
        }
        info!(
            %encoding,
            samples = samples.len(),
            undefined_rates = skipped.undefined_rates,
            other_labels = skipped.other_labels,
            "training matrix built"
        );
        TrainingMatrix {
            encoding,
            samples,
            skipped,
        }
    }

    pub fn encoding(&self) -> FeatureEncoding {
        self.encoding
    }

    pub fn samples(&self) -> &[TrainingSample] {
        &self.samples
    }

    pub fn skipped(&self) -> TrainingSkips {
        self.skipped
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Feature columns followed by the label column.
    pub fn header(&self) -> Vec<String> {
        let mut cols = encoding::columns(self.encoding);
        cols.push(LABEL_COLUMN.to_string());
        cols
    }

    pub fn write_csv<W: Write>(&self, wtr: W) -> Result<(), csv::Error> {
        let mut writer = csv::Writer::from_writer(wtr);
        writer.write_record(self.header())?;
        for sample in &self.samples {
            let mut rec: Vec<String> = sample.values.iter().map(|v| v.to_string()).collect();
            rec.push(sample.label.as_str().to_string());
            writer.write_record(rec)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<(), TrainingError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| TrainingError::Io {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        let file = std::fs::File::create(path).map_err(|e| TrainingError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        self.write_csv(file)?;
        Ok(())
    }
}
