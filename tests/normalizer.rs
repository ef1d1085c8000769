use approx::assert_abs_diff_eq;
use genre_classifier_core::{FeatureVector, GenreError, NormalizationParams};

#[test]
fn applies_affine_transform() {
    let p = NormalizationParams::new(vec![1.0, -2.0, 0.0], vec![2.0, 0.5, 10.0]).unwrap();
    let out = p.normalize(&FeatureVector::new(vec![3.0, -1.0, 5.0])).unwrap();
    let out = out.as_slice();
    assert_abs_diff_eq!(out[0], 1.0);
    assert_abs_diff_eq!(out[1], 2.0);
    assert_abs_diff_eq!(out[2], 0.5);
}

#[test]
fn mean_maps_to_origin() {
    let mean: Vec<f64> = (0..24).map(|i| i as f64 * 3.5 - 10.0).collect();
    let scale: Vec<f64> = (0..24).map(|i| 1.0 + i as f64).collect();
    let p = NormalizationParams::new(mean.clone(), scale).unwrap();

    let out = p.normalize(&FeatureVector::new(mean)).unwrap();
    assert_eq!(out.len(), 24);
    for v in out.as_slice() {
        assert_abs_diff_eq!(*v, 0.0, epsilon = 1e-12);
    }
}

#[test]
fn identity_leaves_vector_unchanged() {
    let v = FeatureVector::new(vec![1.5, -3.0, 1e6]);
    assert_eq!(NormalizationParams::identity(3).normalize(&v).unwrap(), v);
}

#[test]
fn wrong_length_is_dimension_mismatch() {
    let p = NormalizationParams::identity(24);
    let err = p.normalize(&FeatureVector::new(vec![0.0; 23])).unwrap_err();
    assert!(matches!(
        err,
        GenreError::DimensionMismatch {
            stage: "normalizer",
            expected: 24,
            actual: 23
        }
    ));
}

#[test]
fn rejects_bad_parameters() {
    assert!(NormalizationParams::new(vec![0.0; 3], vec![1.0; 2]).is_err());
    assert!(NormalizationParams::new(vec![0.0], vec![0.0]).is_err());
    assert!(NormalizationParams::new(vec![f64::INFINITY], vec![1.0]).is_err());
}
