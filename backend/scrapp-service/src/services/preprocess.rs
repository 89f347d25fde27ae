/// Image decoding and tensor preparation for the trash classifier
use image::error::{DecodingError, ImageFormatHint};
use image::{imageops::FilterType, DynamicImage, ImageError, ImageFormat, RgbImage};
use std::io::Cursor;
use tract_onnx::prelude::tract_ndarray::Array4;

/// Square input resolution the classifier was trained on
pub const INPUT_SIZE: u32 = 64;

/// Model input: `[1, INPUT_SIZE, INPUT_SIZE, 3]` (NHWC), raw 0-255 values
pub type ImageTensor = Array4<f32>;

/// Decode an uploaded image in any format the `image` crate recognises.
///
/// Truncated uploads decode as far as the data goes.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, ImageError> {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Png) => decode_png(bytes),
        _ => image::load_from_memory(bytes),
    }
}

fn png_error(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> ImageError {
    ImageError::Decoding(DecodingError::new(
        ImageFormatHint::Exact(ImageFormat::Png),
        err,
    ))
}

fn is_truncation(err: &png::DecodingError) -> bool {
    matches!(
        err,
        png::DecodingError::IoError(_) | png::DecodingError::Format(_)
    )
}

/// Row-by-row PNG decode. Rows missing from a cut-off stream stay black;
/// a stream that ends before the first row is still an error.
fn decode_png(bytes: &[u8]) -> Result<DynamicImage, ImageError> {
    let mut decoder = png::Decoder::new(Cursor::new(bytes));
    decoder.set_transformations(png::Transformations::normalize_to_color8());
    let mut reader = decoder.read_info().map_err(png_error)?;

    let (width, height, interlaced) = {
        let info = reader.info();
        (info.width, info.height, info.interlaced)
    };
    let mut buf = vec![0u8; reader.output_buffer_size()];

    if interlaced {
        // Adam7 passes are scattered across the frame; keep what next_frame placed.
        if let Err(e) = reader.next_frame(&mut buf) {
            if !is_truncation(&e) {
                return Err(png_error(e));
            }
            tracing::debug!(error = %e, "Interlaced PNG ended early");
        }
    } else {
        let mut offset = 0;
        loop {
            match reader.next_row() {
                Ok(Some(row)) => {
                    let data = row.data();
                    let end = offset + data.len();
                    match buf.get_mut(offset..end) {
                        Some(dst) => dst.copy_from_slice(data),
                        None => return Err(png_error("PNG row overflows the frame")),
                    }
                    offset = end;
                }
                Ok(None) => break,
                Err(e) if offset > 0 && is_truncation(&e) => {
                    tracing::debug!(error = %e, decoded_bytes = offset, "PNG ended early");
                    break;
                }
                Err(e) => return Err(png_error(e)),
            }
        }
    }

    let (color, _) = reader.output_color_type();
    let img = match color {
        png::ColorType::Grayscale => {
            image::GrayImage::from_raw(width, height, buf).map(DynamicImage::ImageLuma8)
        }
        png::ColorType::GrayscaleAlpha => {
            image::GrayAlphaImage::from_raw(width, height, buf).map(DynamicImage::ImageLumaA8)
        }
        png::ColorType::Rgb => RgbImage::from_raw(width, height, buf).map(DynamicImage::ImageRgb8),
        png::ColorType::Rgba => {
            image::RgbaImage::from_raw(width, height, buf).map(DynamicImage::ImageRgba8)
        }
        png::ColorType::Indexed => None,
    };
    img.ok_or_else(|| png_error(format!("unsupported PNG output layout {:?}", color)))
}

/// Convert to RGB and resize to the model resolution with bicubic resampling
pub fn normalize(img: &DynamicImage) -> RgbImage {
    let rgb = img.to_rgb8();
    image::imageops::resize(&rgb, INPUT_SIZE, INPUT_SIZE, FilterType::CatmullRom)
}

/// Build the batch-of-one tensor.
///
/// Pixel values are passed through unscaled: the model normalises internally.
pub fn to_tensor(rgb: &RgbImage) -> ImageTensor {
    let (width, height) = rgb.dimensions();
    Array4::from_shape_fn((1, height as usize, width as usize, 3), |(_, y, x, c)| {
        rgb.get_pixel(x as u32, y as u32)[c] as f32
    })
}

/// Decode, normalize and tensorize in one step
pub fn prepare(bytes: &[u8]) -> Result<ImageTensor, ImageError> {
    let img = decode(bytes)?;
    Ok(to_tensor(&normalize(&img)))
}
