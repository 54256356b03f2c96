use log::info;
use ndarray::ArrayViewD;

use crate::{Master, MasterErr, Result, shape::Shape};

impl Master {
    /// Derives the training/validation split sizes and, unless they are already known, infers
    /// the input and labels shapes.
    ///
    /// Nothing is modified when an error is returned.
    ///
    /// # Errors
    /// * `InvalidConfig` - `val_size` is outside `[0, 1)`.
    /// * `UnsupportedRank` - either array has a number of dimensions outside 1 to 4.
    pub fn pre_training_checklist(
        &mut self,
        input_data: ArrayViewD<f32>,
        labels: ArrayViewD<f32>,
    ) -> Result<()> {
        let val_size = self.val_size.unwrap_or(0.);
        if !(0. ..1.).contains(&val_size) {
            return Err(MasterErr::InvalidConfig(format!(
                "val_size ({val_size}) must be in [0, 1)"
            )));
        }

        let Some(&rows) = input_data.shape().first() else {
            return Err(MasterErr::UnsupportedRank {
                what: "input data",
                rank: 0,
            });
        };

        let shapes = match self.input_shape {
            Some(_) => None,
            None => Some((infer_input_shape(&input_data)?, infer_labels_shape(&labels)?)),
        };

        let val_num = (rows as f64 * val_size) as usize;
        self.val_size = Some(val_size);
        self.val_num = Some(val_num);
        self.num_train = Some(rows - val_num);

        if let Some((input_shape, labels_shape)) = shapes {
            self.input_shape = Some(input_shape);
            self.labels_shape = Some(labels_shape);
        }

        info!(
            "Number of Training Data: {}, Number of Validation Data: {val_num}",
            rows - val_num
        );

        Ok(())
    }
}

/// The per-sample shape a network should take for `input_data`, a trailing channel of one is
/// added to data with less than 4 dimensions.
pub fn infer_input_shape(input_data: &ArrayViewD<f32>) -> Result<Shape> {
    let s = input_data.shape();

    let dims = match s.len() {
        1 => vec![1, 1],
        2 => vec![s[1], 1],
        3 => vec![s[1], s[2], 1],
        4 => vec![s[1], s[2], s[3]],
        rank => {
            return Err(MasterErr::UnsupportedRank {
                what: "input data",
                rank,
            });
        }
    };

    Ok(Shape::new(dims))
}

/// The per-sample shape of `labels`.
pub fn infer_labels_shape(labels: &ArrayViewD<f32>) -> Result<Shape> {
    let s = labels.shape();

    let dims = match s.len() {
        1 => vec![1],
        2 => vec![s[1]],
        3 | 4 => s[1..].to_vec(),
        rank => return Err(MasterErr::UnsupportedRank { what: "labels", rank }),
    };

    Ok(Shape::new(dims))
}
