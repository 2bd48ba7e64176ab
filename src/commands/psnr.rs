use crate::error::{FsrcnnError, Result};
use crate::psnr::{psnr_calculation, psnr_from_mse};
use crate::utils::image::{image_to_tensor, load_image};
use clap::ArgMatches;

pub fn psnr(app_m: &ArgMatches) -> Result<()> {
	let image1_path = app_m
		.value_of("IMAGE1")
		.ok_or_else(|| FsrcnnError::InvalidParameter("No IMAGE1 file given".to_string()))?;
	let image2_path = app_m
		.value_of("IMAGE2")
		.ok_or_else(|| FsrcnnError::InvalidParameter("No IMAGE2 file given".to_string()))?;

	let image1 = load_image(image1_path)?;
	let image2 = load_image(image2_path)?;

	// [C, H, W] -> [H, W, C]
	let image1_data = image_to_tensor(&image1, false).permuted_axes([1, 2, 0]);
	let image2_data = image_to_tensor(&image2, false).permuted_axes([1, 2, 0]);

	if image1_data.shape() != image2_data.shape() {
		println!("Image shapes will be cropped to the top left areas which overlap");
	}

	let (err, y_err, pix) = psnr_calculation(image1_data.view(), image2_data.view());

	println!(
		"sRGB PSNR: {}\tLuma PSNR: {}",
		psnr_from_mse(err / pix),
		psnr_from_mse(y_err / pix)
	);

	Ok(())
}
