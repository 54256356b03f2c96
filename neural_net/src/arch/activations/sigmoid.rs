#[derive(Clone, Debug, Default)]
pub struct Sigmoid {
    amp: f32,
}

impl Sigmoid {
    pub fn new(amp: f32) -> Self {
        Self { amp }
    }

    pub fn amp(&self) -> f32 {
        self.amp
    }

    pub fn f(&self, z: f32) -> f32 {
        self.amp / (1. + (-z).exp())
    }

    pub fn df(&self, z: f32) -> f32 {
        let amp = self.amp;

        (amp * (-z).exp()) / ((-z).exp() + 1.).powi(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn unit_amp_is_logistic() {
        let s = Sigmoid::new(1.);
        assert_abs_diff_eq!(s.f(0.), 0.5);
        assert_abs_diff_eq!(s.df(0.), 0.25);
    }

    #[test]
    fn amp_scales_output_and_slope() {
        let s = Sigmoid::new(3.);
        assert_abs_diff_eq!(s.f(0.), 1.5);
        assert_abs_diff_eq!(s.df(0.), 0.75);
    }
}
