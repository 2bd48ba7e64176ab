use std::path::Path;

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, ImageBuffer, ImageFormat, Luma, Rgb, RgbImage};
use ndarray::{stack, Array2, Array3, ArrayView, ArrayView2, ArrayView3, Axis, Dimension, Slice};

use crate::error::{FsrcnnError, Result};
use crate::utils::file_io;

/// Trims `border` pixels from every side of the two trailing (spatial) axes.
pub fn shave<D: Dimension>(image: ArrayView<f32, D>, border: usize) -> Result<ArrayView<f32, D>> {
	let ndim = image.ndim();
	if ndim < 2 {
		return Err(FsrcnnError::Shape(format!("cannot trim a {}-d array", ndim)));
	}
	let mut view = image;
	for &axis in &[ndim - 2, ndim - 1] {
		let len = view.len_of(Axis(axis));
		if len <= 2 * border {
			return Err(FsrcnnError::Shape(format!(
				"spatial size {} is too small to trim a border of {}",
				len, border
			)));
		}
		view.slice_axis_inplace(Axis(axis), Slice::from(border..len - border));
	}
	Ok(view)
}

/// Bicubic (Catmull-Rom) resize of one plane. Samples are expected in `[0, 1]`
/// and the filtered result is clamped to that range.
pub fn resize_plane(plane: ArrayView2<f32>, height: usize, width: usize) -> Result<Array2<f32>> {
	let (h, w) = plane.dim();
	let buffer: ImageBuffer<Luma<f32>, Vec<f32>> = ImageBuffer::from_raw(w as u32, h as u32, plane.iter().cloned().collect())
		.ok_or_else(|| FsrcnnError::Shape(format!("cannot view a {}x{} plane as an image", h, w)))?;
	let resized = imageops::resize(&buffer, width as u32, height as u32, FilterType::CatmullRom);
	Ok(Array2::from_shape_vec((height, width), resized.into_raw())?)
}

/// Resizes every channel of a `[C, H, W]` tensor.
pub fn resize_tensor(tensor: ArrayView3<f32>, height: usize, width: usize) -> Result<Array3<f32>> {
	let planes = tensor
		.outer_iter()
		.map(|plane| resize_plane(plane, height, width))
		.collect::<Result<Vec<_>>>()?;
	let views: Vec<_> = planes.iter().map(|p| p.view()).collect();
	Ok(stack(Axis(0), &views)?)
}

/// Full-range BT.601 luma and chroma planes, each sample in `[0, 255]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Ycbcr {
	pub y: Array2<f32>,
	pub cb: Array2<f32>,
	pub cr: Array2<f32>,
}

impl Ycbcr {
	pub fn from_rgb(image: &RgbImage) -> Self {
		let (width, height) = image.dimensions();
		let shape = (height as usize, width as usize);
		let mut ycbcr = Ycbcr {
			y: Array2::zeros(shape),
			cb: Array2::zeros(shape),
			cr: Array2::zeros(shape),
		};
		for (x, y, pixel) in image.enumerate_pixels() {
			let [r, g, b] = pixel.0;
			let (r, g, b) = (r as f32, g as f32, b as f32);
			let idx = [y as usize, x as usize];
			ycbcr.y[idx] = 0.299 * r + 0.587 * g + 0.114 * b;
			ycbcr.cb[idx] = 128.0 - 0.168_736 * r - 0.331_264 * g + 0.5 * b;
			ycbcr.cr[idx] = 128.0 + 0.5 * r - 0.418_688 * g - 0.081_312 * b;
		}
		ycbcr
	}

	pub fn dim(&self) -> (usize, usize) {
		self.y.dim()
	}

	pub fn to_rgb(&self) -> Result<RgbImage> {
		if self.cb.dim() != self.y.dim() || self.cr.dim() != self.y.dim() {
			return Err(FsrcnnError::Shape(format!(
				"luma {:?} and chroma {:?}/{:?} planes differ in size",
				self.y.dim(),
				self.cb.dim(),
				self.cr.dim()
			)));
		}
		let (height, width) = self.dim();
		Ok(RgbImage::from_fn(width as u32, height as u32, |x, y| {
			let idx = [y as usize, x as usize];
			let (luma, cb, cr) = (self.y[idx], self.cb[idx] - 128.0, self.cr[idx] - 128.0);
			Rgb([
				to_byte(luma + 1.402 * cr),
				to_byte(luma - 0.344_136 * cb - 0.714_136 * cr),
				to_byte(luma + 1.772 * cb),
			])
		}))
	}
}

fn to_byte(value: f32) -> u8 {
	value.round().max(0.0).min(255.0) as u8
}

/// Converts an image to a `[C, H, W]` tensor in `[0, 1]`. Grayscale keeps only
/// the Y channel of YCbCr.
pub fn image_to_tensor(image: &DynamicImage, grayscale: bool) -> Array3<f32> {
	let rgb = image.to_rgb8();
	if grayscale {
		let luma = Ycbcr::from_rgb(&rgb).y / 255.0;
		return luma.insert_axis(Axis(0));
	}
	let (width, height) = rgb.dimensions();
	Array3::from_shape_fn((3, height as usize, width as usize), |(c, y, x)| {
		rgb.get_pixel(x as u32, y as u32).0[c] as f32 / 255.0
	})
}

/// Converts a 1- or 3-channel `[C, H, W]` tensor in `[0, 1]` back to an 8-bit image.
pub fn tensor_to_image(tensor: ArrayView3<f32>) -> Result<DynamicImage> {
	let (channels, height, width) = tensor.dim();
	let byte = |c: usize, x: u32, y: u32| to_byte(tensor[[c, y as usize, x as usize]] * 255.0);
	match channels {
		1 => Ok(DynamicImage::ImageLuma8(GrayImage::from_fn(width as u32, height as u32, |x, y| {
			Luma([byte(0, x, y)])
		}))),
		3 => Ok(DynamicImage::ImageRgb8(RgbImage::from_fn(width as u32, height as u32, |x, y| {
			Rgb([byte(0, x, y), byte(1, x, y), byte(2, x, y)])
		}))),
		_ => Err(FsrcnnError::Shape(format!("cannot encode a {}-channel tensor as an image", channels))),
	}
}

pub fn load_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
	let path = path.as_ref();
	if !path.exists() {
		return Err(FsrcnnError::FileNotFound(path.to_path_buf()));
	}
	Ok(image::open(path)?)
}

pub fn save_png<P: AsRef<Path>>(image: &DynamicImage, path: P) -> Result<()> {
	let path = path.as_ref();
	if let Some(dir) = path.parent() {
		file_io::create_dir_all(dir)?;
	}
	image.save_with_format(path, ImageFormat::Png)?;
	Ok(())
}

pub fn save_tensor_png<P: AsRef<Path>>(tensor: ArrayView3<f32>, path: P) -> Result<()> {
	save_png(&tensor_to_image(tensor)?, path)
}

#[cfg(test)]
mod tests {
	use super::*;
	use ndarray::Array4;

	#[test]
	fn test_shave_trims_spatial_axes_only() {
		let batch = Array4::<f32>::zeros((2, 3, 20, 16));
		assert_eq!(shave(batch.view(), 4).unwrap().dim(), (2, 3, 12, 8));
		let single = Array3::<f32>::zeros((1, 10, 10));
		assert_eq!(shave(single.view(), 2).unwrap().dim(), (1, 6, 6));
	}

	#[test]
	fn test_shave_rejects_borders_that_consume_the_image() {
		let image = Array3::<f32>::zeros((1, 8, 12));
		assert!(shave(image.view(), 4).is_err());
	}

	#[test]
	fn test_resize_plane_dimensions_and_constant() {
		let plane = Array2::from_elem((5, 7), 0.5);
		let resized = resize_plane(plane.view(), 15, 21).unwrap();
		assert_eq!(resized.dim(), (15, 21));
		assert!(resized.iter().all(|v| (v - 0.5).abs() < 1e-4));
	}

	#[test]
	fn test_ycbcr_round_trip_is_close() {
		let image = RgbImage::from_fn(4, 3, |x, y| Rgb([(x * 60) as u8, (y * 80) as u8, 200]));
		let back = Ycbcr::from_rgb(&image).to_rgb().unwrap();
		for (a, b) in image.pixels().zip(back.pixels()) {
			for c in 0..3 {
				assert!((a.0[c] as i32 - b.0[c] as i32).abs() <= 1);
			}
		}
	}

	#[test]
	fn test_gray_pixels_have_neutral_chroma() {
		let image = RgbImage::from_pixel(2, 2, Rgb([90, 90, 90]));
		let ycbcr = Ycbcr::from_rgb(&image);
		assert!(ycbcr.y.iter().all(|v| (v - 90.0).abs() < 1e-3));
		assert!(ycbcr.cb.iter().all(|v| (v - 128.0).abs() < 1e-3));
		assert!(ycbcr.cr.iter().all(|v| (v - 128.0).abs() < 1e-3));
	}

	#[test]
	fn test_tensor_image_conversion() {
		let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(3, 2, Rgb([255, 0, 51])));
		let tensor = image_to_tensor(&image, false);
		assert_eq!(tensor.dim(), (3, 2, 3));
		assert!((tensor[[2, 1, 2]] - 0.2).abs() < 1e-6);
		let back = tensor_to_image(tensor.view()).unwrap().to_rgb8();
		assert_eq!(back.get_pixel(0, 0).0, [255, 0, 51]);
		assert_eq!(image_to_tensor(&image, true).dim(), (1, 2, 3));
	}
}
