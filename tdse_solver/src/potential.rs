use ndarray::Array1;

use crate::error::LengthError;

/// Sum several potentials, optionally shifting the result so its minimum is zero.
///
/// An empty list gives an empty potential.
///
/// # Errors
///
/// Returns a [`LengthError`] if the potentials differ in length
pub fn combine_potentials(potentials: &[Array1<f64>], shift: bool) -> Result<Array1<f64>, LengthError> {
    let Some((first, rest)) = potentials.split_first() else {
        return Ok(Array1::zeros(0));
    };
    let mut total = first.clone();
    for potential in rest {
        LengthError::check(total.len(), potential.len())?;
        total += potential;
    }
    if shift {
        let minimum = total.iter().copied().fold(f64::INFINITY, f64::min);
        if minimum.is_finite() {
            total -= minimum;
        }
    }
    Ok(total)
}
