//! LIBSVM sparse text loader.
//!
//! Each non-empty line is `label idx:value idx:value ...`. Indices are model
//! feature ids; column `idx - feature_start` of the dense matrix receives the
//! value and absent features are `0.0`. Text after `#` is ignored, as are
//! `qid:` tokens.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use ndarray::Array2;

use super::DatasetLoadError;
use crate::data::LabeledDataset;

fn parse_label(token: &str, line: usize) -> Result<i32, DatasetLoadError> {
    let value: f64 = token.parse().map_err(|_| DatasetLoadError::Parse {
        line,
        message: format!("invalid label '{token}'"),
    })?;
    if !value.is_finite() || value.fract() != 0.0 {
        return Err(DatasetLoadError::Parse {
            line,
            message: format!("label '{token}' is not an integer"),
        });
    }
    Ok(value as i32)
}

/// Read a LIBSVM dataset.
///
/// `n_features` fixes the number of dense columns; when `None` it is inferred
/// from the largest feature index seen.
pub fn read_libsvm<R: BufRead>(
    reader: R,
    feature_start: u32,
    n_features: Option<usize>,
) -> Result<LabeledDataset, DatasetLoadError> {
    let mut rows: Vec<Vec<(usize, f64)>> = Vec::new();
    let mut labels: Vec<i32> = Vec::new();
    let mut max_col: usize = 0;

    for (line_idx, line) in reader.lines().enumerate() {
        let line_no = line_idx + 1;
        let line = line?;
        let content = line.split('#').next().unwrap_or("").trim();
        if content.is_empty() {
            continue;
        }

        let mut parts = content.split_whitespace();
        let Some(label_token) = parts.next() else {
            continue;
        };
        labels.push(parse_label(label_token, line_no)?);

        let mut feats = Vec::new();
        for token in parts {
            let (idx_str, val_str) =
                token
                    .split_once(':')
                    .ok_or_else(|| DatasetLoadError::Parse {
                        line: line_no,
                        message: format!("invalid feature token '{token}'"),
                    })?;
            if idx_str == "qid" {
                continue;
            }
            let feature: u32 = idx_str.parse().map_err(|_| DatasetLoadError::Parse {
                line: line_no,
                message: format!("invalid feature index '{idx_str}'"),
            })?;
            let value: f64 = val_str.parse().map_err(|_| DatasetLoadError::Parse {
                line: line_no,
                message: format!("invalid feature value '{val_str}'"),
            })?;
            let col = feature
                .checked_sub(feature_start)
                .ok_or(DatasetLoadError::FeatureBelowStart {
                    line: line_no,
                    feature,
                    feature_start,
                })? as usize;
            if let Some(limit) = n_features {
                if col >= limit {
                    return Err(DatasetLoadError::FeatureOutOfRange {
                        line: line_no,
                        feature,
                        n_features: limit,
                    });
                }
            }
            max_col = max_col.max(col + 1);
            feats.push((col, value));
        }
        rows.push(feats);
    }

    let n_cols = n_features.unwrap_or(max_col);
    let mut features = Array2::<f64>::zeros((rows.len(), n_cols));
    for (r, feats) in rows.iter().enumerate() {
        for &(c, v) in feats {
            features[[r, c]] = v;
        }
    }
    Ok(LabeledDataset::new(features, labels, feature_start)?)
}

/// Load a LIBSVM dataset from a file.
pub fn load_libsvm(
    path: impl AsRef<Path>,
    feature_start: u32,
    n_features: Option<usize>,
) -> Result<LabeledDataset, DatasetLoadError> {
    let file = File::open(path.as_ref())?;
    read_libsvm(BufReader::new(file), feature_start, n_features)
}
