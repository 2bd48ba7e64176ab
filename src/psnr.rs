use std::cmp;

use ndarray::{s, ArrayView3, ArrayViewD, Zip};

use crate::constants::psnr as psnr_constants;
use crate::error::{FsrcnnError, Result};

fn clamp_pixel(value: f32) -> f32 {
	value.max(0.0).min(psnr_constants::MAX_VALUE)
}

/// Mean squared per-sample difference of two equally shaped images, after
/// clamping both to the representable range.
pub fn mse(image1: ArrayViewD<f32>, image2: ArrayViewD<f32>) -> Result<f32> {
	if image1.shape() != image2.shape() {
		return Err(FsrcnnError::Shape(format!(
			"PSNR inputs differ in shape: {:?} vs {:?}",
			image1.shape(),
			image2.shape()
		)));
	}
	if image1.is_empty() {
		return Err(FsrcnnError::Shape("PSNR of an empty image is undefined".into()));
	}
	let mut total = 0.0f64;
	Zip::from(&image1).and(&image2).for_each(|&a, &b| {
		let diff = (clamp_pixel(a) - clamp_pixel(b)) as f64;
		total += diff * diff;
	});
	Ok((total / image1.len() as f64) as f32)
}

/// Converts a mean squared error into decibels; zero error is `+inf`.
pub fn psnr_from_mse(mse: f32) -> f32 {
	if mse == 0.0 {
		return f32::INFINITY;
	}
	let max = psnr_constants::MAX_VALUE;
	psnr_constants::LOG10_MULTIPLIER * (max * max / mse).log10()
}

/// Peak signal-to-noise ratio of two images whose borders were already trimmed.
pub fn psnr(image1: ArrayViewD<f32>, image2: ArrayViewD<f32>) -> Result<f32> {
	Ok(psnr_from_mse(mse(image1, image2)?))
}

/// Takes two `[H, W, C]` images with at least 3 channels and returns the
/// squared RGB error, squared luma error and pixel count of their overlapping
/// top-left region.
pub fn psnr_calculation(image1: ArrayView3<f32>, image2: ArrayView3<f32>) -> (f32, f32, f32) {
	let min_height = cmp::min(image1.shape()[0], image2.shape()[0]);
	let min_width = cmp::min(image1.shape()[1], image2.shape()[1]);

	let image1 = image1.slice(s![0..min_height, 0..min_width, 0..3]);
	let image2 = image2.slice(s![0..min_height, 0..min_width, 0..3]);

	let mut rgb_error = 0.0;
	let mut luma_error = 0.0;
	let mut pixel_count = 0.0f32;

	Zip::from(image1.rows()).and(image2.rows()).for_each(|output_row, input_row| {
		let r_diff = clamp_pixel(output_row[0]) - clamp_pixel(input_row[0]);
		let g_diff = clamp_pixel(output_row[1]) - clamp_pixel(input_row[1]);
		let b_diff = clamp_pixel(output_row[2]) - clamp_pixel(input_row[2]);

		// BT.601 luma coefficients
		let luma_diff = r_diff * 0.299 + g_diff * 0.587 + b_diff * 0.114;

		luma_error += luma_diff * luma_diff;
		rgb_error += (r_diff * r_diff + g_diff * g_diff + b_diff * b_diff) / 3.0;
		pixel_count += 1.0;
	});

	(rgb_error, luma_error, pixel_count)
}
