//! Spectral angle mapping (Kruse et al., 1993)
//!
//! The spectral angle between a pixel spectrum `p` and a reference `r` is
//!
//! ```text
//! α = arccos( p·r / (|p| |r|) )
//! ```
//!
//! It depends on spectral shape only, not on overall brightness, and lies in
//! [0, π] (in [0, π/2] for non-negative spectra). A spectrum with zero norm has
//! no shape; its angle to anything is [`ZERO_VECTOR_ANGLE`].

use crate::maybe_rayon::*;
use hypersam_core::io::CLASS_NODATA;
use hypersam_core::{Error, Result};
use ndarray::{s, Array2, Array3, ArrayView1, ArrayView2, ArrayView3, Axis};
use std::f64::consts::FRAC_PI_2;

/// Angle reported when either spectrum has zero (or non-finite) norm
pub const ZERO_VECTOR_ANGLE: f64 = FRAC_PI_2;

/// Class label of pixels left unclassified
pub const NODATA_CLASS: u8 = CLASS_NODATA;

/// Angles of every pixel to one or more references
#[derive(Debug, Clone, PartialEq)]
pub enum AngleMap {
    /// rows × cols, for a single reference
    Single(Array2<f64>),
    /// rows × cols × references
    Multi(Array3<f64>),
}

impl AngleMap {
    /// Number of references
    pub fn n_references(&self) -> usize {
        match self {
            AngleMap::Single(_) => 1,
            AngleMap::Multi(a) => a.len_of(Axis(2)),
        }
    }

    /// Grid shape (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        match self {
            AngleMap::Single(a) => a.dim(),
            AngleMap::Multi(a) => (a.len_of(Axis(0)), a.len_of(Axis(1))),
        }
    }

    /// Angles to reference `index`
    pub fn reference(&self, index: usize) -> Option<ArrayView2<'_, f64>> {
        match self {
            AngleMap::Single(a) => (index == 0).then(|| a.view()),
            AngleMap::Multi(a) => (index < a.len_of(Axis(2))).then(|| a.index_axis(Axis(2), index)),
        }
    }

    /// rows × cols × references view, with a unit reference axis for `Single`
    pub fn as_multi(&self) -> ArrayView3<'_, f64> {
        match self {
            AngleMap::Single(a) => a.view().insert_axis(Axis(2)),
            AngleMap::Multi(a) => a.view(),
        }
    }

    /// Best-matching reference per pixel, see [`best_match`]
    pub fn best_match(&self, nodata_mask: Option<ArrayView2<'_, bool>>) -> Result<Array2<u8>> {
        best_match(self.as_multi(), nodata_mask)
    }
}

fn norm(v: ArrayView1<'_, f64>) -> f64 {
    v.dot(&v).sqrt()
}

fn angle_from_parts(dot: f64, p_norm: f64, r_norm: f64) -> f64 {
    let valid = |n: f64| n.is_finite() && n > 0.0;
    if !valid(p_norm) || !valid(r_norm) {
        return ZERO_VECTOR_ANGLE;
    }
    let cos = dot / (p_norm * r_norm);
    if !cos.is_finite() {
        return ZERO_VECTOR_ANGLE;
    }
    cos.clamp(-1.0, 1.0).acos()
}

/// Spectral angle between two spectra, in radians.
///
/// Symmetric, 0 for identical (or proportional) spectra and π/2 for
/// orthogonal ones. Spectra of different lengths never match and give
/// [`ZERO_VECTOR_ANGLE`], as does a zero-norm spectrum.
pub fn spectral_angle(p: ArrayView1<'_, f64>, r: ArrayView1<'_, f64>) -> f64 {
    if p.len() != r.len() {
        return ZERO_VECTOR_ANGLE;
    }
    angle_from_parts(p.dot(&r), norm(p), norm(r))
}

/// Angles between every pixel of a rows × cols × bands field and every
/// row of a references × bands matrix.
///
/// # Errors
/// `InvalidParameter` when there are no references or their band count
/// differs from the field's.
pub fn spectral_angles(field: ArrayView3<'_, f64>, references: ArrayView2<'_, f64>) -> Result<AngleMap> {
    let (rows, cols, n_bands) = field.dim();
    let n_refs = references.nrows();
    if n_refs == 0 {
        return Err(Error::invalid("references", 0, "at least one reference spectrum is needed"));
    }
    if references.ncols() != n_bands {
        return Err(Error::invalid(
            "references",
            references.ncols(),
            format!("reference spectra must have {} bands like the image", n_bands),
        ));
    }

    let ref_norms: Vec<f64> = references.outer_iter().map(norm).collect();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = Vec::with_capacity(cols * n_refs);
            for col in 0..cols {
                let p = field.slice(s![row, col, ..]);
                let p_norm = norm(p);
                for (r, &r_norm) in references.outer_iter().zip(&ref_norms) {
                    row_data.push(angle_from_parts(p.dot(&r), p_norm, r_norm));
                }
            }
            row_data
        })
        .collect();

    if n_refs == 1 {
        Ok(AngleMap::Single(Array2::from_shape_vec((rows, cols), data)?))
    } else {
        Ok(AngleMap::Multi(Array3::from_shape_vec((rows, cols, n_refs), data)?))
    }
}

/// Index of the smallest angle per pixel of a rows × cols × references array.
///
/// Ties go to the first reference; NaN angles never win. Pixels flagged in
/// `nodata_mask`, or with no finite angle, get [`NODATA_CLASS`].
///
/// # Errors
/// - `InvalidParameter` with no references or more than 255 of them
/// - `SizeMismatch` when the mask shape differs from the angle grid
pub fn best_match(angles: ArrayView3<'_, f64>, nodata_mask: Option<ArrayView2<'_, bool>>) -> Result<Array2<u8>> {
    let (rows, cols, n_refs) = angles.dim();
    if n_refs == 0 {
        return Err(Error::invalid("angles", 0, "at least one reference is needed"));
    }
    if n_refs > NODATA_CLASS as usize {
        return Err(Error::invalid(
            "angles",
            n_refs,
            format!("at most {} references fit an 8-bit classification", NODATA_CLASS),
        ));
    }
    if let Some(mask) = &nodata_mask {
        if mask.dim() != (rows, cols) {
            return Err(Error::SizeMismatch {
                er: rows,
                ec: cols,
                ar: mask.nrows(),
                ac: mask.ncols(),
            });
        }
    }

    let data: Vec<u8> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![NODATA_CLASS; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                if nodata_mask.as_ref().is_some_and(|m| m[[row, col]]) {
                    continue;
                }
                let mut best: Option<(usize, f64)> = None;
                for (k, &a) in angles.slice(s![row, col, ..]).iter().enumerate() {
                    if a.is_nan() {
                        continue;
                    }
                    if best.map_or(true, |(_, b)| a < b) {
                        best = Some((k, a));
                    }
                }
                if let Some((k, _)) = best {
                    *out = k as u8;
                }
            }
            row_data
        })
        .collect();

    Ok(Array2::from_shape_vec((rows, cols), data)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{arr1, array, Array3};
    use std::f64::consts::PI;

    #[test]
    fn test_identity_is_zero() {
        let p = arr1(&[0.1, 0.4, 0.3, 0.2]);
        assert_relative_eq!(spectral_angle(p.view(), p.view()), 0.0, epsilon = 1e-7);
        // brightness does not matter
        let brighter = &p * 3.0;
        assert_relative_eq!(spectral_angle(p.view(), brighter.view()), 0.0, epsilon = 1e-7);
    }

    #[test]
    fn test_orthogonal_is_right_angle() {
        let a = arr1(&[1.0, 0.0, 0.0]);
        let b = arr1(&[0.0, 2.0, 0.0]);
        assert_relative_eq!(spectral_angle(a.view(), b.view()), FRAC_PI_2, epsilon = 1e-12);
    }

    #[test]
    fn test_symmetric() {
        let a = arr1(&[0.3, 0.1, 0.5]);
        let b = arr1(&[0.2, 0.6, 0.1]);
        assert_eq!(spectral_angle(a.view(), b.view()), spectral_angle(b.view(), a.view()));
        let opposite = arr1(&[-0.3, -0.1, -0.5]);
        assert_relative_eq!(spectral_angle(a.view(), opposite.view()), PI, epsilon = 1e-7);
    }

    #[test]
    fn test_zero_vector() {
        let zero = arr1(&[0.0, 0.0]);
        let a = arr1(&[1.0, 1.0]);
        assert_eq!(spectral_angle(zero.view(), a.view()), ZERO_VECTOR_ANGLE);
        assert_eq!(spectral_angle(a.view(), zero.view()), ZERO_VECTOR_ANGLE);
        assert_eq!(spectral_angle(a.view(), arr1(&[1.0]).view()), ZERO_VECTOR_ANGLE);
    }

    #[test]
    fn test_angles_single_and_multi() {
        let field = Array3::from_shape_vec((1, 2, 2), vec![1.0, 0.0, 0.0, 1.0]).unwrap();

        let single = spectral_angles(field.view(), array![[1.0, 0.0]].view()).unwrap();
        match &single {
            AngleMap::Single(a) => {
                assert_relative_eq!(a[[0, 0]], 0.0);
                assert_relative_eq!(a[[0, 1]], FRAC_PI_2);
            }
            AngleMap::Multi(_) => panic!("expected a single-reference map"),
        }

        let multi = spectral_angles(field.view(), array![[1.0, 0.0], [0.0, 1.0]].view()).unwrap();
        assert_eq!(multi.n_references(), 2);
        assert_eq!(multi.shape(), (1, 2));
        assert!(multi.as_multi().iter().all(|a| !a.is_nan()));
        assert_relative_eq!(multi.reference(1).unwrap()[[0, 1]], 0.0);
        assert!(multi.reference(2).is_none());
    }

    #[test]
    fn test_multi_shape_ignores_reference_axis() {
        let field = Array3::from_shape_fn((3, 2, 2), |(r, c, b)| (1 + r + c + b) as f64);
        let references = array![[1.0, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 2.0]];
        let angles = spectral_angles(field.view(), references.view()).unwrap();
        assert_eq!(angles.n_references(), 4);
        assert_eq!(angles.shape(), (3, 2));
        assert_eq!(angles.best_match(None).unwrap().dim(), (3, 2));
    }

    #[test]
    fn test_angles_validation() {
        let field = Array3::<f64>::ones((2, 2, 3));
        assert!(spectral_angles(field.view(), Array2::zeros((0, 3)).view()).is_err());
        assert!(spectral_angles(field.view(), Array2::ones((1, 4)).view()).is_err());
    }

    #[test]
    fn test_best_match_ties_and_mask() {
        let angles = Array3::from_shape_vec(
            (1, 3, 3),
            vec![
                0.5, 0.2, 0.9, // -> 1
                0.3, 0.3, 0.3, // tie -> 0
                0.1, 0.0, 0.4, // masked
            ],
        )
        .unwrap();
        let mask = array![[false, false, true]];
        let classes = best_match(angles.view(), Some(mask.view())).unwrap();
        assert_eq!(classes, array![[1u8, 0, NODATA_CLASS]]);

        let unmasked = best_match(angles.view(), None).unwrap();
        assert_eq!(unmasked[[0, 2]], 1);
    }

    #[test]
    fn test_best_match_index_range() {
        let angles = Array3::from_shape_fn((4, 4, 5), |(r, c, k)| ((r * 7 + c * 3 + k * 11) % 13) as f64);
        let classes = best_match(angles.view(), None).unwrap();
        assert!(classes.iter().all(|&c| c < 5));
    }

    #[test]
    fn test_best_match_limits() {
        assert!(best_match(Array3::<f64>::zeros((1, 1, 256)).view(), None).is_err());
        assert!(best_match(Array3::<f64>::zeros((1, 1, 255)).view(), None).is_ok());
        let bad_mask = Array2::from_elem((2, 2), false);
        assert!(matches!(
            best_match(Array3::<f64>::zeros((1, 1, 2)).view(), Some(bad_mask.view())),
            Err(Error::SizeMismatch { .. })
        ));
    }
}
