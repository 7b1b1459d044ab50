// https://www.johndcook.com/blog/standard_deviation/
/// Running mean and variance, Welford style.
#[derive(Debug, Clone, Default)]
pub struct Variance {
    avg: f64,
    k: f64,
    var: f64,
}

impl Variance {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, value: impl Into<f64>) {
        let value = value.into();
        let left = value - self.avg;
        self.k += 1.0;
        self.avg += left / self.k;
        let right = value - self.avg;
        self.var += left * right;
    }

    pub fn count(&self) -> usize {
        self.k as usize
    }

    /// None when nothing has been added, the mean of nothing is not 0.
    pub fn average(&self) -> Option<f64> {
        (self.k > 0.0).then_some(self.avg)
    }

    pub fn variance(&self) -> f64 {
        if self.k <= 1.0 {
            return 0.0;
        }
        self.var / (self.k - 1.0)
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }
}

impl<A: Into<f64>> Extend<A> for Variance {
    fn extend<T: IntoIterator<Item = A>>(&mut self, iter: T) {
        iter.into_iter().for_each(|a| self.add(a))
    }
}
