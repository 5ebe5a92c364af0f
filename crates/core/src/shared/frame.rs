use image::{GrayImage, RgbImage};

/// A single captured or uploaded frame: contiguous RGB bytes in row-major order.
///
/// Format conversion happens at I/O boundaries only; the pipelines see
/// frames through this type and the grayscale view derived from it.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    index: usize,
}

impl Frame {
    pub const CHANNELS: usize = 3;

    pub fn new(data: Vec<u8>, width: u32, height: u32, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * Self::CHANNELS,
            "data length must equal width * height * 3"
        );
        Self {
            data,
            width,
            height,
            index,
        }
    }

    pub fn from_rgb_image(image: RgbImage, index: usize) -> Self {
        let (width, height) = image.dimensions();
        Self::new(image.into_raw(), width, height, index)
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

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Single-channel luma using BT.601 weights (0.299, 0.587, 0.114).
    pub fn to_gray(&self) -> GrayImage {
        let luma = self
            .data
            .chunks_exact(Self::CHANNELS)
            .map(|px| {
                let y = 299 * px[0] as u32 + 587 * px[1] as u32 + 114 * px[2] as u32;
                ((y + 500) / 1000) as u8
            })
            .collect();
        GrayImage::from_raw(self.width, self.height, luma)
            .expect("luma buffer length must match dimensions")
    }

    /// Mirrors the frame around its vertical axis (selfie view).
    pub fn mirror_horizontal(&mut self) {
        let row_len = self.width as usize * Self::CHANNELS;
        if row_len == 0 {
            return;
        }
        for row in self.data.chunks_exact_mut(row_len) {
            let w = row.len() / Self::CHANNELS;
            for x in 0..w / 2 {
                let left = x * Self::CHANNELS;
                let right = (w - 1 - x) * Self::CHANNELS;
                for c in 0..Self::CHANNELS {
                    row.swap(left + c, right + c);
                }
            }
        }
    }
}
