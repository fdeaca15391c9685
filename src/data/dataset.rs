//! Labeled point sets consumed by the certifier.

use ndarray::{Array2, ArrayView1};

/// Dataset construction errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DatasetError {
    #[error("number of labels ({labels}) does not match number of points ({points})")]
    LabelLenMismatch { points: usize, labels: usize },
}

/// Dense feature matrix (one row per point) with integer labels.
///
/// Column `j` holds model feature `feature_start + j`.
#[derive(Debug, Clone)]
pub struct LabeledDataset {
    features: Array2<f64>,
    labels: Vec<i32>,
    feature_start: u32,
}

impl LabeledDataset {
    pub fn new(
        features: Array2<f64>,
        labels: Vec<i32>,
        feature_start: u32,
    ) -> Result<Self, DatasetError> {
        if features.nrows() != labels.len() {
            return Err(DatasetError::LabelLenMismatch {
                points: features.nrows(),
                labels: labels.len(),
            });
        }
        // Rows must be contiguous so `point` can hand out plain slices.
        let features = features.as_standard_layout().into_owned();
        Ok(Self {
            features,
            labels,
            feature_start,
        })
    }

    /// Build from row vectors; all rows must have the same length.
    pub fn from_rows(
        rows: Vec<Vec<f64>>,
        labels: Vec<i32>,
        feature_start: u32,
    ) -> Result<Self, DatasetError> {
        let n_features = rows.first().map_or(0, Vec::len);
        let mut features = Array2::zeros((rows.len(), n_features));
        for (mut dst, row) in features.rows_mut().into_iter().zip(&rows) {
            for (d, &v) in dst.iter_mut().zip(row) {
                *d = v;
            }
        }
        Self::new(features, labels, feature_start)
    }

    #[inline]
    pub fn n_points(&self) -> usize {
        self.features.nrows()
    }

    #[inline]
    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    #[inline]
    pub fn feature_start(&self) -> u32 {
        self.feature_start
    }

    #[inline]
    pub fn labels(&self) -> &[i32] {
        &self.labels
    }

    #[inline]
    pub fn label(&self, index: usize) -> i32 {
        self.labels[index]
    }

    #[inline]
    pub fn row(&self, index: usize) -> ArrayView1<'_, f64> {
        self.features.row(index)
    }

    /// Feature values of point `index` as a slice.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds.
    #[inline]
    pub fn point(&self, index: usize) -> &[f64] {
        self.features
            .row(index)
            .to_slice()
            .expect("rows of a standard-layout matrix are contiguous")
    }

    #[inline]
    pub fn features(&self) -> &Array2<f64> {
        &self.features
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_become_points() {
        let ds = LabeledDataset::from_rows(vec![vec![0.1, 0.2], vec![0.3, 0.4]], vec![0, 1], 1)
            .unwrap();
        assert_eq!(ds.n_points(), 2);
        assert_eq!(ds.n_features(), 2);
        assert_eq!(ds.point(1), &[0.3, 0.4]);
        assert_eq!(ds.label(1), 1);
        assert_eq!(ds.feature_start(), 1);
    }

    #[test]
    fn label_length_is_checked() {
        let err = LabeledDataset::from_rows(vec![vec![0.0]], vec![0, 1], 0).unwrap_err();
        assert!(matches!(err, DatasetError::LabelLenMismatch { points: 1, labels: 2 }));
    }

    #[test]
    fn column_major_input_is_normalized() {
        let f = Array2::from_shape_vec((2, 2), vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let ds = LabeledDataset::new(f.reversed_axes(), vec![0, 0], 0).unwrap();
        assert_eq!(ds.point(0), &[1.0, 3.0]);
    }
}
