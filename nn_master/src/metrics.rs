//! Evaluation metrics under their short names. Every metric takes `(y_true, y_pred)` of the same
//! shape and yields one value per sample, reducing the last axis.

pub use neural_net::arch::loss::{
    binary_accuracy, categorical_accuracy, mean_absolute_error as mae,
    mean_absolute_percentage_error as mape, mean_squared_error as mse,
    mean_squared_logarithmic_error as msle,
};

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn aliases_reduce_the_last_axis() {
        let y_true = array![[1_f32, 2.], [0., 4.]];
        let y_pred = array![[1_f32, 4.], [1., 4.]];

        assert_eq!(mse(y_true.view(), y_pred.view()), array![2_f32, 0.5]);
        assert_eq!(mae(y_true.view(), y_pred.view()), array![1_f32, 0.5]);
        assert_abs_diff_eq!(mape(y_true.view(), y_pred.view())[0], 50., epsilon = 1e-3);
    }

    #[test]
    fn accuracies() {
        let y_true = array![[0_f32, 1., 0.], [1., 0., 0.]];
        let y_pred = array![[0.1_f32, 0.7, 0.2], [0.2, 0.5, 0.3]];

        assert_eq!(categorical_accuracy(y_true.view(), y_pred.view()), array![1_f32, 0.]);
        assert_eq!(binary_accuracy(y_true.view(), y_pred.view()), array![1_f32, 2. / 3.]);
    }
}
