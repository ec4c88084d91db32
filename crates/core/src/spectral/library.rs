//! Spectral library of end-member reference spectra

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};

use crate::error::{Error, Result};
use crate::spectral::resample::{interpolate, same_grid, validate_wavelengths};

/// Named reference reflectance spectra ("end members").
///
/// Spectra are stored one per row (`members × wavelengths`); member order is
/// significant because classification labels are positions in this order.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralLibrary {
    names: Vec<String>,
    wavelengths: Vec<f64>,
    spectra: Array2<f64>,
}

impl SpectralLibrary {
    pub fn new(names: Vec<String>, wavelengths: Vec<f64>, spectra: Array2<f64>) -> Result<Self> {
        if names.is_empty() {
            return Err(Error::invalid("names", "[]", "library needs at least one end member"));
        }
        if spectra.dim() != (names.len(), wavelengths.len()) {
            return Err(Error::SizeMismatch {
                er: names.len(),
                ec: wavelengths.len(),
                ar: spectra.nrows(),
                ac: spectra.ncols(),
            });
        }
        for (i, name) in names.iter().enumerate() {
            if names[..i].contains(name) {
                return Err(Error::invalid("names", name, "duplicate end member"));
            }
        }
        validate_wavelengths("wavelengths", &wavelengths)?;
        if let Some(bad) = spectra.iter().find(|v| !v.is_finite()) {
            return Err(Error::invalid("spectra", bad, "reference values must be finite"));
        }
        Ok(Self {
            names,
            wavelengths,
            spectra,
        })
    }

    /// End-member names in label order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn wavelengths(&self) -> &[f64] {
        &self.wavelengths
    }

    /// Spectra as `members × wavelengths`
    pub fn spectra(&self) -> ArrayView2<'_, f64> {
        self.spectra.view()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Reference spectrum of one end member
    pub fn spectrum(&self, name: &str) -> Result<ArrayView1<'_, f64>> {
        let i = self.position(name)?;
        Ok(self.spectra.index_axis(Axis(0), i))
    }

    fn position(&self, name: &str) -> Result<usize> {
        self.names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| Error::UnknownEndMember(name.to_string()))
    }

    /// A library holding only `names`, in the order given
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Self> {
        let positions = names
            .iter()
            .map(|n| self.position(n.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        let spectra = self.spectra.select(Axis(0), &positions);
        Self::new(
            positions.iter().map(|&i| self.names[i].clone()).collect(),
            self.wavelengths.clone(),
            spectra,
        )
    }

    /// Resample every spectrum onto `wavelengths`.
    ///
    /// Returns an unchanged copy when the grids already match.
    pub fn align_to(&self, wavelengths: &[f64]) -> Result<Self> {
        if same_grid(&self.wavelengths, wavelengths) {
            return Ok(self.clone());
        }
        validate_wavelengths("wavelengths", wavelengths)?;

        let mut spectra = Array2::zeros((self.len(), wavelengths.len()));
        for (mut out, reference) in spectra.outer_iter_mut().zip(self.spectra.outer_iter()) {
            let resampled = interpolate(&self.wavelengths, &reference.to_vec(), wavelengths)?;
            out.assign(&ArrayView1::from(&resampled));
        }
        Self::new(self.names.clone(), wavelengths.to_vec(), spectra)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn library() -> SpectralLibrary {
        SpectralLibrary::new(
            vec!["water".into(), "sandstone".into(), "vegetation".into()],
            vec![500.0, 600.0, 700.0],
            array![[0.05, 0.03, 0.01], [0.20, 0.30, 0.35], [0.05, 0.08, 0.40]],
        )
        .unwrap()
    }

    #[test]
    fn test_select_preserves_requested_order() {
        let lib = library().select(&["vegetation", "water"]).unwrap();
        assert_eq!(lib.names(), &["vegetation".to_string(), "water".to_string()]);
        assert_eq!(lib.spectra().row(0).to_vec(), vec![0.05, 0.08, 0.40]);
        assert!(matches!(
            library().select(&["granite"]),
            Err(Error::UnknownEndMember(_))
        ));
    }

    #[test]
    fn test_align_to_interpolates() {
        let aligned = library().align_to(&[550.0, 700.0]).unwrap();
        assert_eq!(aligned.wavelengths(), &[550.0, 700.0]);
        let sand = aligned.spectrum("sandstone").unwrap();
        assert_relative_eq!(sand[0], 0.25, epsilon = 1e-12);
        assert_relative_eq!(sand[1], 0.35, epsilon = 1e-12);
    }

    #[test]
    fn test_align_to_same_grid_is_identity() {
        let lib = library();
        assert_eq!(lib.align_to(&[500.0, 600.0, 700.0]).unwrap(), lib);
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(SpectralLibrary::new(vec![], vec![500.0], Array2::zeros((0, 1))).is_err());
        assert!(SpectralLibrary::new(vec!["a".into()], vec![500.0, 600.0], Array2::zeros((1, 3))).is_err());
        assert!(SpectralLibrary::new(
            vec!["a".into(), "a".into()],
            vec![500.0],
            Array2::zeros((2, 1))
        )
        .is_err());
    }
}
