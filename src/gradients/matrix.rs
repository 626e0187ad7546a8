use glam::DMat3;

/// Condition numbers above this mark the moment matrix as too
/// ill-conditioned for the matrix estimator.
pub const CONDITION_NUMBER_DANGER: f64 = 1000.0;

fn frobenius_norm_squared(matrix: &DMat3) -> f64 {
    matrix.x_axis.length_squared()
        + matrix.y_axis.length_squared()
        + matrix.z_axis.length_squared()
}

/// Invert the neighbour moment matrix and estimate how trustworthy
/// the inverse is via the normalized Frobenius condition number.
/// Singular matrices (e.g. all neighbours in a plane or on a line)
/// yield a zero inverse and an infinite condition number.
pub fn invert_with_condition_number(matrix: DMat3) -> (DMat3, f64) {
    let determinant = matrix.determinant();
    let scale = frobenius_norm_squared(&matrix);
    if !(determinant.abs() > 1e-12 * scale.powf(1.5)) {
        return (DMat3::ZERO, f64::INFINITY);
    }
    let inverse = matrix.inverse();
    let condition_number =
        (frobenius_norm_squared(&matrix) * frobenius_norm_squared(&inverse)).sqrt() / 3.0;
    (inverse, condition_number.max(1.0))
}

#[cfg(test)]
mod tests {
    use glam::DMat3;
    use glam::DVec3;

    use super::invert_with_condition_number;
    use crate::test_utils::assert_float_is_close;

    #[test]
    fn identity_has_condition_number_one() {
        let (inverse, condition_number) = invert_with_condition_number(DMat3::IDENTITY);
        assert_float_is_close(condition_number, 1.0);
        assert_float_is_close((inverse * DVec3::ONE - DVec3::ONE).length(), 0.0);
    }

    #[test]
    fn condition_number_is_scale_invariant() {
        let matrix = DMat3::from_cols(
            DVec3::new(2.0, 0.3, 0.0),
            DVec3::new(0.3, 1.0, 0.1),
            DVec3::new(0.0, 0.1, 0.5),
        );
        let (_, condition_number) = invert_with_condition_number(matrix);
        let (_, scaled_condition_number) = invert_with_condition_number(matrix * 1e6);
        assert!((condition_number - scaled_condition_number).abs() < 1e-6 * condition_number);
    }

    #[test]
    fn collinear_moments_are_singular() {
        // Outer products of collinear offsets only fill one diagonal
        // entry.
        let matrix = DMat3::from_cols(
            DVec3::new(3.0, 0.0, 0.0),
            DVec3::ZERO,
            DVec3::ZERO,
        );
        let (inverse, condition_number) = invert_with_condition_number(matrix);
        assert!(condition_number.is_infinite());
        assert_eq!(inverse, DMat3::ZERO);
    }

    #[test]
    fn zero_matrix_is_singular() {
        let (_, condition_number) = invert_with_condition_number(DMat3::ZERO);
        assert!(condition_number.is_infinite());
    }
}
