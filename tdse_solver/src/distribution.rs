use ndarray::Array1;
use num_complex::Complex;
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

/// The Standard Normal distribution for a complex number
/// ``<z z*> = 1``
pub struct StandardComplexNormal;

impl Distribution<Complex<f64>> for StandardComplexNormal {
    #[inline]
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Complex<f64> {
        let re = rng.sample::<f64, _>(StandardNormal) / std::f64::consts::SQRT_2;
        let im = rng.sample::<f64, _>(StandardNormal) / std::f64::consts::SQRT_2;
        Complex { re, im }
    }
}

/// A random (unnormalized) state with `n` amplitudes
pub fn random_state<R: Rng + ?Sized>(rng: &mut R, n: usize) -> Array1<Complex<f64>> {
    Array1::from_iter((0..n).map(|_| rng.sample(StandardComplexNormal)))
}
