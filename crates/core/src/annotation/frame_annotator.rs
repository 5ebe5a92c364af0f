use image::{ImageBuffer, Rgb};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

use crate::annotation::glyphs::{glyph_bits, text_width, GLYPH_ADVANCE, GLYPH_HEIGHT, GLYPH_WIDTH};
use crate::pipeline::face_emotion_analyzer::FaceEmotion;
use crate::shared::constants::OVERLAY_COLOR;
use crate::shared::frame::Frame;
use crate::shared::region::Region;

const LABEL_GAP: i32 = 4;

/// RGB view over a frame's own pixel buffer.
type Canvas<'a> = ImageBuffer<Rgb<u8>, &'a mut [u8]>;

/// Draws a rectangle and an `"<Emotion> (<pct>%)"` caption for every face,
/// in place, on an RGB frame.
#[derive(Clone, Debug)]
pub struct FrameAnnotator {
    color: Rgb<u8>,
    thickness: u32,
    text_scale: u32,
}

impl Default for FrameAnnotator {
    fn default() -> Self {
        Self {
            color: Rgb(OVERLAY_COLOR),
            thickness: 2,
            text_scale: 2,
        }
    }
}

impl FrameAnnotator {
    pub fn annotate(&self, frame: &mut Frame, faces: &[FaceEmotion]) {
        if frame.is_empty() || faces.is_empty() {
            return;
        }
        let (width, height) = (frame.width(), frame.height());
        let Some(mut canvas) = Canvas::from_raw(width, height, frame.data_mut()) else {
            log::warn!("Frame buffer does not match {width}x{height}, skipping annotation");
            return;
        };

        for face in faces {
            self.draw_box(&mut canvas, &face.region);
            let label = face.result.overlay_label();
            let (x, y) = self.label_origin(width, height, &face.region, &label);
            self.draw_text(&mut canvas, x, y, &label);
        }
    }

    /// Top-left corner for the caption: above the box when there is room,
    /// otherwise just inside its top edge, always within the frame.
    fn label_origin(&self, frame_w: u32, frame_h: u32, region: &Region, label: &str) -> (i32, i32) {
        let text_w = text_width(label, self.text_scale) as i32;
        let text_h = (GLYPH_HEIGHT * self.text_scale) as i32;

        let above = region.y - text_h - LABEL_GAP;
        let y = if above >= 0 {
            above
        } else {
            region.y + self.thickness as i32 + LABEL_GAP
        };
        let y = y.clamp(0, (frame_h as i32 - text_h).max(0));
        let x = region.x.clamp(0, (frame_w as i32 - text_w).max(0));
        (x, y)
    }

    /// Nested one-pixel outlines, growing inwards.
    fn draw_box(&self, canvas: &mut Canvas<'_>, region: &Region) {
        for inset in 0..self.thickness as i32 {
            let w = region.width - 2 * inset;
            let h = region.height - 2 * inset;
            if w <= 0 || h <= 0 {
                break;
            }
            let rect = Rect::at(region.x + inset, region.y + inset).of_size(w as u32, h as u32);
            draw_hollow_rect_mut(canvas, rect, self.color);
        }
    }

    fn draw_text(&self, canvas: &mut Canvas<'_>, x: i32, y: i32, text: &str) {
        let scale = self.text_scale as i32;
        let mut pen_x = x;
        for ch in text.chars() {
            if let Some(glyph) = glyph_bits(ch) {
                for (row, pattern) in glyph.iter().enumerate() {
                    for col in 0..GLYPH_WIDTH as i32 {
                        if (pattern >> (GLYPH_WIDTH as i32 - 1 - col)) & 1 == 1 {
                            let dot = Rect::at(pen_x + col * scale, y + row as i32 * scale)
                                .of_size(self.text_scale, self.text_scale);
                            draw_filled_rect_mut(canvas, dot, self.color);
                        }
                    }
                }
            }
            pen_x += GLYPH_ADVANCE as i32 * scale;
        }
    }
}
