use image::{imageops, GrayImage, Luma};

use rcb_core::{
    attachments::NormalizedImage,
    job::{PrintJob, PrintOp},
};

const ESC: u8 = 0x1B;
const GS: u8 = 0x1D;
const LF: u8 = 0x0A;

/// Rows per `GS v 0` command; keeps each command within small printer buffers.
const BAND_ROWS: u32 = 256;

pub fn init() -> [u8; 2] {
    [ESC, b'@']
}

pub fn inverted(on: bool) -> [u8; 3] {
    [GS, b'B', u8::from(on)]
}

/// Text bytes for the printer's default code page.
///
/// Only printable ASCII and newlines pass through; anything else becomes `?`.
pub fn text(s: &str) -> Vec<u8> {
    s.chars()
        .map(|c| match c {
            '\n' => LF,
            '\t' => b' ',
            c if (' '..='~').contains(&c) => c as u8,
            _ => b'?',
        })
        .collect()
}

/// Convert to a 1-bit bitmap: alpha flattened onto white, then dithered.
///
/// Returns `(bytes_per_row, rows)` with set bits meaning "burn a dot".
pub fn monochrome(image: &NormalizedImage) -> (usize, Vec<Vec<u8>>) {
    let src = image.image().to_luma_alpha8();
    let (w, h) = src.dimensions();

    let mut gray = GrayImage::from_fn(w, h, |x, y| {
        let [l, a] = src.get_pixel(x, y).0;
        let (l, a) = (u32::from(l), u32::from(a));
        Luma([((l * a + 255 * (255 - a)) / 255) as u8])
    });
    imageops::dither(&mut gray, &imageops::BiLevel);

    let bytes_per_row = w.div_ceil(8) as usize;
    let rows = (0..h)
        .map(|y| {
            let mut row = vec![0u8; bytes_per_row];
            for x in 0..w {
                if gray.get_pixel(x, y).0[0] < 128 {
                    row[(x / 8) as usize] |= 0x80 >> (x % 8);
                }
            }
            row
        })
        .collect();

    (bytes_per_row, rows)
}

/// `GS v 0` raster commands for `image`, split into bands.
pub fn raster(image: &NormalizedImage) -> Vec<u8> {
    let (bytes_per_row, rows) = monochrome(image);
    let mut out = Vec::with_capacity(rows.len() * bytes_per_row + 16);

    for band in rows.chunks(BAND_ROWS as usize) {
        let [xl, xh] = (bytes_per_row as u16).to_le_bytes();
        let [yl, yh] = (band.len() as u16).to_le_bytes();
        out.extend_from_slice(&[GS, b'v', b'0', 0, xl, xh, yl, yh]);
        for row in band {
            out.extend_from_slice(row);
        }
    }

    out
}

/// Encode a whole job into one buffer, starting from a printer reset.
pub fn encode_job(job: &PrintJob) -> Vec<u8> {
    let mut out = init().to_vec();
    // Raster commands are ignored while a text line is pending.
    let mut line_open = false;

    for op in job.ops() {
        match op {
            PrintOp::SetStyle { inverted: on } => out.extend_from_slice(&inverted(*on)),
            PrintOp::WriteText(s) => {
                let bytes = text(s);
                if let Some(&last) = bytes.last() {
                    line_open = last != LF;
                }
                out.extend_from_slice(&bytes);
            }
            PrintOp::WriteImage(image) => {
                if line_open {
                    out.push(LF);
                    line_open = false;
                }
                out.extend_from_slice(&raster(image));
            }
            PrintOp::FeedLine => {
                out.push(LF);
                line_open = false;
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgba, RgbaImage};
    use rcb_core::{
        attachments::FitMode,
        domain::{ChatId, MessageId, MessageRef, UserId},
        messaging::types::InboundMessage,
    };

    fn solid(w: u32, h: u32, px: [u8; 4]) -> NormalizedImage {
        let img = RgbaImage::from_pixel(w, h, Rgba(px));
        NormalizedImage::fit(DynamicImage::ImageRgba8(img), 512, FitMode::Proportional)
    }

    fn msg(text: &str) -> InboundMessage {
        InboundMessage {
            message: MessageRef {
                chat_id: ChatId(1),
                message_id: MessageId(1),
            },
            author_id: UserId(1),
            author: "eve".to_string(),
            text: text.to_string(),
            attachments: vec![],
        }
    }

    #[test]
    fn text_replaces_unprintable_characters() {
        assert_eq!(text("hi\tthere\n"), b"hi there\n".to_vec());
        assert_eq!(text("café ☕"), b"caf? ?".to_vec());
    }

    #[test]
    fn raster_header_and_padding() {
        let out = raster(&solid(10, 3, [0, 0, 0, 255]));
        assert_eq!(&out[..8], &[GS, b'v', b'0', 0, 2, 0, 3, 0]);
        assert_eq!(&out[8..], &[0xFF, 0xC0, 0xFF, 0xC0, 0xFF, 0xC0]);
    }

    #[test]
    fn white_and_transparent_pixels_are_blank() {
        let white = raster(&solid(8, 2, [255, 255, 255, 255]));
        assert_eq!(&white[8..], &[0, 0]);

        let clear = raster(&solid(8, 2, [0, 0, 0, 0]));
        assert_eq!(&clear[8..], &[0, 0]);
    }

    #[test]
    fn tall_images_are_banded() {
        let out = raster(&solid(8, 300, [0, 0, 0, 255]));
        assert_eq!(&out[..8], &[GS, b'v', b'0', 0, 1, 0, 0, 1]);
        let second = 8 + 256;
        assert_eq!(&out[second..second + 8], &[GS, b'v', b'0', 0, 1, 0, 44, 0]);
        assert_eq!(out.len(), 8 + 256 + 8 + 44);
    }

    #[test]
    fn inverted_job_bytes() {
        let job = PrintJob::for_message(&msg("hi"), true, vec![]);
        let mut expected = vec![ESC, b'@', GS, b'B', 1];
        expected.extend_from_slice(b"eve: hi\n");
        expected.extend_from_slice(&[GS, b'B', 0, LF]);
        assert_eq!(encode_job(&job), expected);
    }

    #[test]
    fn image_after_open_line_starts_on_new_line() {
        let job = PrintJob::for_message(&msg(""), false, vec![solid(8, 1, [0, 0, 0, 255])]);
        let mut expected = vec![ESC, b'@'];
        expected.extend_from_slice(b"eve: \n");
        expected.extend_from_slice(&[GS, b'v', b'0', 0, 1, 0, 1, 0, 0xFF, LF]);
        assert_eq!(encode_job(&job), expected);
    }
}
