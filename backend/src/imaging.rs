use image::imageops::FilterType;
use image::{DynamicImage, RgbImage};
use ndarray::{Array4, Axis, concatenate};
use tch::Tensor;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Uploaded file is empty")]
    Empty,
    #[error("Failed to decode image: {0}")]
    Image(#[from] image::ImageError),
}

/// Raw upload as received from the client, dropped once decoded.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadedImage {
    pub fn decode(&self) -> Result<DynamicImage, DecodeError> {
        decode(&self.bytes)
    }
}

/// Decodes any container the `image` crate understands and normalizes it to 8-bit RGB.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }
    let image = image::load_from_memory(bytes)?;
    log::debug!(
        "Decoded image: {}x{} {:?}",
        image.width(),
        image.height(),
        image.color()
    );
    Ok(DynamicImage::ImageRgb8(image.to_rgb8()))
}

pub fn resize(image: &DynamicImage, size: u32) -> RgbImage {
    image.resize_exact(size, size, FilterType::CatmullRom).to_rgb8()
}

/// Channels-first `[1, 3, size, size]` array with intensities scaled to `[0, 1]`.
pub fn to_array(image: &DynamicImage, size: u32) -> Array4<f32> {
    rgb_to_array(&resize(image, size))
}

pub fn rgb_to_array(rgb: &RgbImage) -> Array4<f32> {
    let (width, height) = rgb.dimensions();
    Array4::from_shape_fn(
        (1, 3, height as usize, width as usize),
        |(_, c, y, x)| rgb.get_pixel(x as u32, y as u32)[c] as f32 / 255.0,
    )
}

pub fn to_tensor(image: &DynamicImage, size: u32) -> Tensor {
    array_to_tensor(to_array(image, size))
}

pub fn array_to_tensor(array: Array4<f32>) -> Tensor {
    let shape: Vec<i64> = array.shape().iter().map(|&d| d as i64).collect();
    let array = array.as_standard_layout().into_owned();
    let (data, _) = array.into_raw_vec_and_offset();
    Tensor::from_slice(&data).view(shape.as_slice())
}

/// Stacks `[1, 3, h, w]` samples into a single `[n, 3, h, w]` batch.
pub fn batch_to_tensor(samples: &[Array4<f32>]) -> Option<Tensor> {
    if samples.is_empty() {
        return None;
    }
    let views: Vec<_> = samples.iter().map(|s| s.view()).collect();
    let batch = concatenate(Axis(0), &views).ok()?;
    Some(array_to_tensor(batch))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{ImageFormat, Rgb};
    use std::io::Cursor;

    pub(crate) fn png_bytes(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
        let image = RgbImage::from_pixel(width, height, Rgb(color));
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(image)
            .write_to(&mut buffer, ImageFormat::Png)
            .unwrap();
        buffer.into_inner()
    }

    #[test]
    fn decodes_png_to_rgb() {
        let image = decode(&png_bytes(31, 17, [255, 0, 0])).unwrap();
        assert_eq!((image.width(), image.height()), (31, 17));
        assert!(matches!(image, DynamicImage::ImageRgb8(_)));
    }

    #[test]
    fn rejects_invalid_bytes() {
        assert!(matches!(decode(&[]), Err(DecodeError::Empty)));
        assert!(matches!(
            decode(b"definitely not an image"),
            Err(DecodeError::Image(_))
        ));
        let mut truncated = png_bytes(8, 8, [1, 2, 3]);
        truncated.truncate(20);
        assert!(decode(&truncated).is_err());
    }

    #[test]
    fn array_has_fixed_shape_and_unit_range() {
        let image = decode(&png_bytes(300, 120, [255, 128, 0])).unwrap();
        let array = to_array(&image, 224);
        assert_eq!(array.shape(), &[1, 3, 224, 224]);
        assert!(array.iter().all(|v| (0.0..=1.0).contains(v)));
        assert!((array[[0, 0, 10, 10]] - 1.0).abs() < 1e-6);
        assert!((array[[0, 1, 10, 10]] - 128.0 / 255.0).abs() < 1e-2);
        assert_eq!(array[[0, 2, 10, 10]], 0.0);
    }

    #[test]
    fn tensor_keeps_batch_dimension() {
        let image = decode(&png_bytes(50, 50, [0, 255, 0])).unwrap();
        let tensor = to_tensor(&image, 32);
        assert_eq!(tensor.size(), vec![1, 3, 32, 32]);
        assert!((tensor.double_value(&[0, 1, 5, 5]) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn batches_stack_on_first_axis() {
        let image = decode(&png_bytes(10, 10, [0, 0, 255])).unwrap();
        let samples = vec![to_array(&image, 8), to_array(&image, 8), to_array(&image, 8)];
        let batch = batch_to_tensor(&samples).unwrap();
        assert_eq!(batch.size(), vec![3, 3, 8, 8]);
        assert!(batch_to_tensor(&[]).is_none());
    }
}
