//! Utilities for working with probability and weight slices.

pub trait SliceExt {
    fn sum(&self) -> f64;
    fn normalise(&mut self, target: f64) -> f64;
    fn scale(&mut self, factor: f64);
}
impl SliceExt for [f64] {
    fn sum(&self) -> f64 {
        self.iter().sum()
    }

    fn normalise(&mut self, target: f64) -> f64 {
        let sum = self.sum();
        if sum > 0.0 {
            self.scale(target / sum);
        }
        sum
    }

    fn scale(&mut self, factor: f64) {
        for element in self {
            *element *= factor;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_float_eq::*;

    #[test]
    fn sum() {
        let data = [0.0, 0.1, 0.2];
        assert_f64_near!(0.3, data.sum(), 1);
    }

    #[test]
    fn normalise() {
        let mut data = [0.05, 0.1, 0.15, 0.2];
        let sum = data.normalise(1.0);
        assert_f64_near!(0.5, sum, 1);
        assert_float_absolute_eq!(0.1, data[0], 1e-12);
        assert_float_absolute_eq!(0.4, data[3], 1e-12);
    }

    #[test]
    fn normalise_zero_sum_left_untouched() {
        let mut data = [0.0, 0.0];
        let sum = data.normalise(1.0);
        assert_f64_near!(0.0, sum, 1);
        assert_eq!([0.0, 0.0], data);
    }

    #[test]
    fn scale() {
        let mut data = [0.1, 0.2];
        data.scale(10.0);
        assert_float_absolute_eq!(1.0, data[0], 1e-12);
        assert_float_absolute_eq!(2.0, data[1], 1e-12);
    }
}
