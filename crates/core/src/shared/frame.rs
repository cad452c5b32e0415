use std::io::Cursor;

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use ndarray::{s, ArrayView3};

use crate::shared::crop::{CropBounds, CropError};

/// A single captured frame: contiguous RGB bytes in row-major order.
///
/// Format conversion happens at I/O boundaries only (camera decode, PNG
/// encode for the backend, window buffers); the loop treats pixel data as
/// opaque apart from the flip and crop helpers below.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    /// Decodes any image format the `image` crate understands into an RGB frame.
    pub fn from_encoded(bytes: &[u8], index: usize) -> Result<Self, image::ImageError> {
        let rgb = image::load_from_memory(bytes)?.to_rgb8();
        let (width, height) = rgb.dimensions();
        Ok(Self::new(rgb.into_raw(), width, height, 3, index))
    }

    /// A solid black RGB frame, used to blank the output surface.
    pub fn black(width: u32, height: u32) -> Self {
        Self::new(vec![0u8; (width * height * 3) as usize], width, height, 3, 0)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Left-right mirror of the frame. Applying it twice restores the original.
    pub fn flip_horizontal(&self) -> Frame {
        let data: Vec<u8> = self
            .as_ndarray()
            .slice(s![.., ..;-1, ..])
            .iter()
            .copied()
            .collect();
        Frame::new(data, self.width, self.height, self.channels, self.index)
    }

    /// Cuts out the normalized sub-rectangle described by `bounds`.
    ///
    /// Bounds are validated first; out-of-range or empty bounds are rejected
    /// rather than clamped.
    pub fn crop(&self, bounds: &CropBounds) -> Result<Frame, CropError> {
        let (x0, x1, y0, y1) = bounds.pixel_rect(self.width, self.height)?;
        let data: Vec<u8> = self
            .as_ndarray()
            .slice(s![y0 as usize..y1 as usize, x0 as usize..x1 as usize, ..])
            .iter()
            .copied()
            .collect();
        Ok(Frame::new(data, x1 - x0, y1 - y0, self.channels, self.index))
    }

    /// Lossless PNG encoding, the format sent to the image backend.
    pub fn to_png(&self) -> Result<Vec<u8>, image::ImageError> {
        let color = match self.channels {
            1 => ExtendedColorType::L8,
            4 => ExtendedColorType::Rgba8,
            _ => ExtendedColorType::Rgb8,
        };
        let mut buf = Cursor::new(Vec::new());
        PngEncoder::new(&mut buf).write_image(&self.data, self.width, self.height, color)?;
        Ok(buf.into_inner())
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 3x2 RGB frame where every byte is distinct.
    fn numbered_frame() -> Frame {
        let data: Vec<u8> = (0..18).collect();
        Frame::new(data, 3, 2, 3, 7)
    }

    #[test]
    fn test_construction_and_accessors() {
        let data = vec![0u8; 12]; // 2x2x3
        let frame = Frame::new(data.clone(), 2, 2, 3, 5);
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.index(), 5);
        assert_eq!(frame.data(), &data[..]);
    }

    #[test]
    fn test_data_mut_allows_modification() {
        let data = vec![0u8; 6]; // 2x1x3
        let mut frame = Frame::new(data, 2, 1, 3, 0);
        frame.data_mut()[0] = 255;
        assert_eq!(frame.data()[0], 255);
    }

    #[test]
    #[should_panic(expected = "data length must equal width * height * channels")]
    fn test_mismatched_data_length_panics_in_debug() {
        let data = vec![0u8; 10]; // wrong size for 2x2x3
        Frame::new(data, 2, 2, 3, 0);
    }

    #[test]
    fn test_as_ndarray_pixel_access() {
        // 2x2 RGB: set pixel (row=1, col=0) to red
        let mut data = vec![0u8; 12];
        data[6] = 255;
        let frame = Frame::new(data, 2, 2, 3, 0);
        let arr = frame.as_ndarray();
        assert_eq!(arr.shape(), &[2, 2, 3]);
        assert_eq!(arr[[1, 0, 0]], 255);
        assert_eq!(arr[[1, 0, 1]], 0);
    }

    #[test]
    fn test_flip_swaps_columns_and_keeps_channel_order() {
        let frame = numbered_frame();
        let flipped = frame.flip_horizontal();
        // Row 0 was [p0, p1, p2] = [0,1,2 | 3,4,5 | 6,7,8]
        assert_eq!(&flipped.data()[0..9], &[6, 7, 8, 3, 4, 5, 0, 1, 2]);
        assert_eq!(&flipped.data()[9..18], &[15, 16, 17, 12, 13, 14, 9, 10, 11]);
        assert_eq!(flipped.index(), 7);
    }

    #[test]
    fn test_flip_twice_is_identity() {
        let frame = numbered_frame();
        let twice = frame.flip_horizontal().flip_horizontal();
        assert_eq!(twice.data(), frame.data());
        assert_eq!(twice.width(), frame.width());
        assert_eq!(twice.height(), frame.height());
    }

    #[test]
    fn test_identity_crop_keeps_content() {
        let frame = numbered_frame();
        let cropped = frame.crop(&CropBounds::IDENTITY).unwrap();
        assert_eq!(cropped.data(), frame.data());
        assert_eq!((cropped.width(), cropped.height()), (3, 2));
    }

    #[test]
    fn test_crop_bottom_half() {
        let frame = Frame::new((0..24).collect(), 2, 4, 3, 0);
        let bounds = CropBounds::new(0.0, 1.0, 0.5, 1.0).unwrap();
        let cropped = frame.crop(&bounds).unwrap();
        assert_eq!((cropped.width(), cropped.height()), (2, 2));
        assert_eq!(cropped.data(), &frame.data()[12..24]);
    }

    #[test]
    fn test_crop_right_column() {
        let frame = numbered_frame();
        let bounds = CropBounds::new(2.0 / 3.0, 1.0, 0.0, 1.0).unwrap();
        let cropped = frame.crop(&bounds).unwrap();
        assert_eq!((cropped.width(), cropped.height()), (1, 2));
        assert_eq!(cropped.data(), &[6, 7, 8, 15, 16, 17]);
    }

    #[test]
    fn test_png_roundtrip_preserves_pixels() {
        let frame = numbered_frame();
        let png = frame.to_png().unwrap();
        assert_eq!(&png[1..4], b"PNG");
        let decoded = Frame::from_encoded(&png, 3).unwrap();
        assert_eq!(decoded.data(), frame.data());
        assert_eq!(decoded.index(), 3);
    }

    #[test]
    fn test_from_encoded_rejects_garbage() {
        assert!(Frame::from_encoded(b"definitely not an image", 0).is_err());
    }

    #[test]
    fn test_black_frame() {
        let frame = Frame::black(4, 3);
        assert_eq!(frame.data().len(), 36);
        assert!(frame.data().iter().all(|&b| b == 0));
    }
}
