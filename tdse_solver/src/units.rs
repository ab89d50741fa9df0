//! Conversion of adimensional quantities back to physical units.
//!
//! Lengths are measured in units of the electron Compton wavelength
//! `hbar / (m_e c)`, times in `hbar / (m_e c^2)`, energies in `m_e c^2` and
//! masses in `m_e`.

/// Electron mass, MeV / c^2
pub const ELECTRON_MASS_MEV: f64 = 0.511;
/// MeV fm
pub const HBAR_C_MEV_FM: f64 = 197.0;
/// fm / fs
pub const SPEED_OF_LIGHT_FM_PER_FS: f64 = 3e8;

#[must_use]
pub fn to_length_fm(length: f64) -> f64 {
    length * HBAR_C_MEV_FM / ELECTRON_MASS_MEV
}

#[must_use]
pub fn to_time_fs(tau: f64) -> f64 {
    tau * HBAR_C_MEV_FM / (SPEED_OF_LIGHT_FM_PER_FS * ELECTRON_MASS_MEV)
}

#[must_use]
pub fn to_energy_mev(energy: f64) -> f64 {
    energy * ELECTRON_MASS_MEV
}

#[must_use]
pub fn to_mass_mev_over_c2(mass: f64) -> f64 {
    mass * ELECTRON_MASS_MEV
}
