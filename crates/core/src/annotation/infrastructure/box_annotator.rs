use crate::annotation::domain::frame_annotator::FrameAnnotator;
use crate::detection::domain::emotion_detector::BoundingBox;
use crate::shared::constants::{LABEL_MARGIN, OVERLAY_COLOR, OVERLAY_THICKNESS};
use crate::shared::emotion::Emotion;
use crate::shared::frame::Frame;

const GLYPH_WIDTH: i32 = 5;
const GLYPH_HEIGHT: i32 = 7;
const GLYPH_SPACING: i32 = 1;
const GLYPH_SCALE: i32 = 2;

/// Draws a rectangular face outline with the emotion label rendered above
/// it, directly on the raw RGB buffer.
///
/// All drawing clips at the frame edges; boxes partially or fully outside
/// the frame are safe.
pub struct BoxAnnotator {
    color: [u8; 3],
    thickness: i32,
}

impl BoxAnnotator {
    pub fn new() -> Self {
        Self {
            color: OVERLAY_COLOR,
            thickness: OVERLAY_THICKNESS as i32,
        }
    }

    pub fn with_style(color: [u8; 3], thickness: u32) -> Self {
        Self {
            color,
            thickness: thickness.max(1) as i32,
        }
    }

    fn put_pixel(&self, frame: &mut Frame, x: i32, y: i32) {
        if x < 0 || y < 0 || x >= frame.width() as i32 || y >= frame.height() as i32 {
            return;
        }
        let channels = frame.channels() as usize;
        let offset = (y as usize * frame.width() as usize + x as usize) * channels;
        let data = frame.data_mut();
        for (c, &value) in self.color.iter().enumerate().take(channels) {
            data[offset + c] = value;
        }
    }

    fn fill_rect(&self, frame: &mut Frame, x: i32, y: i32, w: i32, h: i32) {
        for py in y..y + h {
            for px in x..x + w {
                self.put_pixel(frame, px, py);
            }
        }
    }

    fn draw_outline(&self, frame: &mut Frame, face: &BoundingBox) {
        let t = self.thickness.min(face.width / 2).min(face.height / 2).max(1);
        // top, bottom, left, right bars
        self.fill_rect(frame, face.x, face.y, face.width, t);
        self.fill_rect(frame, face.x, face.y + face.height - t, face.width, t);
        self.fill_rect(frame, face.x, face.y, t, face.height);
        self.fill_rect(frame, face.x + face.width - t, face.y, t, face.height);
    }

    fn draw_label(&self, frame: &mut Frame, x: i32, y: i32, text: &str) {
        let mut cursor = x;
        for ch in text.chars() {
            if let Some(rows) = glyph(ch) {
                for (row, bits) in rows.iter().enumerate() {
                    for col in 0..GLYPH_WIDTH {
                        if bits & (1 << (GLYPH_WIDTH - 1 - col)) != 0 {
                            self.fill_rect(
                                frame,
                                cursor + col * GLYPH_SCALE,
                                y + row as i32 * GLYPH_SCALE,
                                GLYPH_SCALE,
                                GLYPH_SCALE,
                            );
                        }
                    }
                }
            }
            cursor += (GLYPH_WIDTH + GLYPH_SPACING) * GLYPH_SCALE;
        }
    }
}

impl Default for BoxAnnotator {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameAnnotator for BoxAnnotator {
    fn annotate(&self, frame: &mut Frame, face: &BoundingBox, label: Emotion) {
        self.draw_outline(frame, face);
        let text_y = face.y - LABEL_MARGIN as i32 - GLYPH_HEIGHT * GLYPH_SCALE;
        self.draw_label(frame, face.x, text_y, label.as_str());
    }
}

/// 5x7 letterforms for the characters appearing in emotion labels.
///
/// Each row is a 5-bit mask, most significant bit leftmost.
fn glyph(ch: char) -> Option<[u8; 7]> {
    match ch.to_ascii_lowercase() {
        'a' => Some([0x0E, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11]),
        'd' => Some([0x1E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1E]),
        'e' => Some([0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F]),
        'f' => Some([0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10]),
        'g' => Some([0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F]),
        'h' => Some([0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11]),
        'i' => Some([0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E]),
        'l' => Some([0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F]),
        'n' => Some([0x11, 0x19, 0x15, 0x13, 0x11, 0x11, 0x11]),
        'p' => Some([0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10]),
        'r' => Some([0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11]),
        's' => Some([0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E]),
        't' => Some([0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04]),
        'u' => Some([0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E]),
        'y' => Some([0x11, 0x11, 0x0A, 0x04, 0x04, 0x04, 0x04]),
        _ => None,
    }
}
