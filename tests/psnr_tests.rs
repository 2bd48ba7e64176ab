use fsrcnn_rust::psnr::{mse, psnr, psnr_calculation, psnr_from_mse};
use ndarray::Array3;
use proptest::prelude::*;

#[test]
fn test_psnr_identical_images() {
    let image = Array3::<f32>::ones((10, 10, 3));
    let (rgb_err, luma_err, pixel_count) = psnr_calculation(image.view(), image.view());

    assert_eq!(rgb_err, 0.0);
    assert_eq!(luma_err, 0.0);
    assert_eq!(pixel_count, 100.0);
    assert!(psnr_from_mse(rgb_err / pixel_count).is_infinite());
}

#[test]
fn test_psnr_different_sizes() {
    let image1 = Array3::<f32>::ones((10, 10, 3));
    let image2 = Array3::<f32>::ones((8, 12, 3));
    let (rgb_err, luma_err, pixel_count) = psnr_calculation(image1.view(), image2.view());

    assert_eq!(rgb_err, 0.0);
    assert_eq!(luma_err, 0.0);
    assert_eq!(pixel_count, 80.0);
}

#[test]
fn test_psnr_out_of_range_values_are_clamped() {
    let image1 = Array3::<f32>::from_elem((1, 4, 4), 1.7);
    let image2 = Array3::<f32>::ones((1, 4, 4));
    assert_eq!(mse(image1.view().into_dyn(), image2.view().into_dyn()).unwrap(), 0.0);
}

#[test]
fn test_psnr_known_value() {
    // uniform error of 0.1 gives MSE 0.01, i.e. 20 dB
    let image1 = Array3::<f32>::from_elem((1, 8, 8), 0.5);
    let image2 = Array3::<f32>::from_elem((1, 8, 8), 0.6);
    let value = psnr(image1.view().into_dyn(), image2.view().into_dyn()).unwrap();
    assert!((value - 20.0).abs() < 1e-3);
}

#[test]
fn test_psnr_shape_mismatch_is_an_error() {
    let image1 = Array3::<f32>::zeros((1, 8, 8));
    let image2 = Array3::<f32>::zeros((1, 8, 9));
    assert!(psnr(image1.view().into_dyn(), image2.view().into_dyn()).is_err());
}

proptest! {
    #[test]
    fn psnr_is_symmetric(a in prop::collection::vec(0.0f32..1.0, 48), b in prop::collection::vec(0.0f32..1.0, 48)) {
        let a = Array3::from_shape_vec((3, 4, 4), a).unwrap();
        let b = Array3::from_shape_vec((3, 4, 4), b).unwrap();
        let ab = psnr(a.view().into_dyn(), b.view().into_dyn()).unwrap();
        let ba = psnr(b.view().into_dyn(), a.view().into_dyn()).unwrap();
        prop_assert!(ab == ba || (ab - ba).abs() < 1e-4);
    }

    #[test]
    fn psnr_is_non_negative_in_range(a in prop::collection::vec(0.0f32..1.0, 16), b in prop::collection::vec(0.0f32..1.0, 16)) {
        let a = Array3::from_shape_vec((1, 4, 4), a).unwrap();
        let b = Array3::from_shape_vec((1, 4, 4), b).unwrap();
        let value = psnr(a.view().into_dyn(), b.view().into_dyn()).unwrap();
        prop_assert!(value >= 0.0);
    }
}
