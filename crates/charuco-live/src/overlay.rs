//! Detection overlay: marker outlines, ChArUco corners and reference labels.

use charuco_live_charuco::BoardDetection;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;
use nalgebra::Point2;

const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
const BLUE: Rgb<u8> = Rgb([0, 0, 255]);
const RED: Rgb<u8> = Rgb([255, 0, 0]);

const GLYPH_W: i32 = 5;
const GLYPH_H: i32 = 7;
const ADVANCE: i32 = GLYPH_W + 1;

/// Font scale for marker and corner ids.
const ID_SCALE: u32 = 1;
/// Font scale for the reference corner labels.
const LABEL_SCALE: u32 = 2;
/// Half size of the square drawn around each corner.
const CORNER_HALF: i32 = 3;

/// Annotated copy of `raw`. An empty detection leaves every pixel as is.
pub fn draw_detection(raw: &RgbImage, detection: &BoardDetection) -> RgbImage {
    let mut out = raw.clone();
    annotate(&mut out, detection);
    out
}

/// Draw `detection` onto `img`.
pub fn annotate(img: &mut RgbImage, detection: &BoardDetection) {
    for m in &detection.markers {
        for k in 0..4 {
            let a = m.corners[k];
            let b = m.corners[(k + 1) % 4];
            draw_line_segment_mut(img, (a.x, a.y), (b.x, b.y), GREEN);
        }
        // first corner marks the marker's orientation
        let c0 = m.corners[0];
        draw_hollow_rect_mut(img, square_at(c0, 2), RED);

        let center = m
            .corners
            .iter()
            .fold(Point2::origin(), |acc: Point2<f32>, p| acc + p.coords / 4.0);
        let label = m.id.to_string();
        let x = center.x.round() as i32 - text_width(&label, ID_SCALE) / 2;
        let y = center.y.round() as i32 - GLYPH_H / 2;
        draw_text(img, x, y, &label, GREEN, ID_SCALE);
    }

    for c in &detection.corners {
        draw_hollow_rect_mut(img, square_at(c.position, CORNER_HALF), BLUE);
        let x = c.position.x.round() as i32 + CORNER_HALF + 2;
        let y = c.position.y.round() as i32 - CORNER_HALF - GLYPH_H;
        draw_text(img, x, y, &c.id.to_string(), BLUE, ID_SCALE);
    }

    let label_h = GLYPH_H * LABEL_SCALE as i32;
    if let Some(tl) = detection.top_left() {
        let p = tl.position;
        let text = format!("Top Left: ({:.0}, {:.0})", p.x, p.y);
        // text bottom sits 10 px above the corner
        let y = p.y.round() as i32 - 10 - label_h;
        draw_text(img, p.x.round() as i32, y, &text, GREEN, LABEL_SCALE);
    }
    if let Some(br) = detection.bottom_right() {
        let p = br.position;
        let text = format!("Bottom Right: ({:.0}, {:.0})", p.x, p.y);
        let y = p.y.round() as i32 + 20 - label_h;
        draw_text(img, p.x.round() as i32, y, &text, GREEN, LABEL_SCALE);
    }
}

fn square_at(p: Point2<f32>, half: i32) -> Rect {
    let side = (2 * half + 1) as u32;
    Rect::at(p.x.round() as i32 - half, p.y.round() as i32 - half).of_size(side, side)
}

/// Width in pixels of `text` rendered at `scale`.
pub fn text_width(text: &str, scale: u32) -> i32 {
    let n = text.chars().count() as i32;
    if n == 0 {
        return 0;
    }
    (n * ADVANCE - 1) * scale as i32
}

/// Render `text` with the built-in 5x7 font, top-left at `(x, y)`. Pixels
/// outside the image are clipped; characters without a glyph leave a gap.
pub fn draw_text(img: &mut RgbImage, x: i32, y: i32, text: &str, color: Rgb<u8>, scale: u32) {
    let s = scale.max(1);
    let mut pen = x;
    for ch in text.chars().flat_map(char::to_uppercase) {
        if let Some(rows) = glyph(ch) {
            for (row, bits) in rows.iter().enumerate() {
                for col in 0..GLYPH_W {
                    if (bits >> (GLYPH_W - 1 - col)) & 1 == 1 {
                        let px = pen + col * s as i32;
                        let py = y + row as i32 * s as i32;
                        draw_filled_rect_mut(img, Rect::at(px, py).of_size(s, s), color);
                    }
                }
            }
        }
        pen += ADVANCE * s as i32;
    }
}

fn glyph(ch: char) -> Option<&'static [u8; 7]> {
    GLYPHS.iter().find(|(c, _)| *c == ch).map(|(_, rows)| rows)
}

#[rustfmt::skip]
static GLYPHS: [(char, [u8; 7]); 29] = [
    ('0', [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110]),
    ('1', [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110]),
    ('2', [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111]),
    ('3', [0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110]),
    ('4', [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010]),
    ('5', [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110]),
    ('6', [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110]),
    ('7', [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000]),
    ('8', [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110]),
    ('9', [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100]),
    ('B', [0b11110, 0b10001, 0b10001, 0b11110, 0b10001, 0b10001, 0b11110]),
    ('E', [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111]),
    ('F', [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000]),
    ('G', [0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01111]),
    ('H', [0b10001, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001]),
    ('I', [0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110]),
    ('L', [0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111]),
    ('M', [0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001]),
    ('O', [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110]),
    ('P', [0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000]),
    ('R', [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001]),
    ('T', [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100]),
    (':', [0b00000, 0b01100, 0b01100, 0b00000, 0b01100, 0b01100, 0b00000]),
    ('(', [0b00010, 0b00100, 0b01000, 0b01000, 0b01000, 0b00100, 0b00010]),
    (')', [0b01000, 0b00100, 0b00010, 0b00010, 0b00010, 0b00100, 0b01000]),
    (',', [0b00000, 0b00000, 0b00000, 0b00000, 0b01100, 0b00100, 0b01000]),
    ('.', [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b01100, 0b01100]),
    ('-', [0b00000, 0b00000, 0b00000, 0b11111, 0b00000, 0b00000, 0b00000]),
    (' ', [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b00000]),
];

#[cfg(test)]
mod tests {
    use super::*;
    use charuco_live_charuco::{CharucoCorner, MarkerDetection};

    fn gray(w: u32, h: u32) -> RgbImage {
        RgbImage::from_pixel(w, h, Rgb([128, 128, 128]))
    }

    fn detection() -> BoardDetection {
        let q = |x: f32, y: f32| Point2::new(x, y);
        BoardDetection {
            markers: vec![MarkerDetection {
                id: 3,
                corners: [q(40.0, 40.0), q(80.0, 40.0), q(80.0, 80.0), q(40.0, 80.0)],
                rotation: 0,
                hamming: 0,
                border_errors: 0,
            }],
            corners: vec![
                CharucoCorner {
                    id: 0,
                    position: q(30.0, 30.0),
                    board: q(1.0, 1.0),
                },
                CharucoCorner {
                    id: 5,
                    position: q(90.0, 90.0),
                    board: q(2.0, 2.0),
                },
            ],
            pose: None,
            recovered_markers: 0,
        }
    }

    #[test]
    fn empty_detection_leaves_frame_untouched() {
        let raw = gray(64, 48);
        assert_eq!(draw_detection(&raw, &BoardDetection::default()), raw);
    }

    #[test]
    fn detection_is_drawn_on_a_copy() {
        let raw = gray(160, 140);
        let out = draw_detection(&raw, &detection());
        assert_ne!(out, raw);
        assert_eq!(raw, gray(160, 140));
        // marker outline and corner square
        assert_eq!(*out.get_pixel(60, 40), GREEN);
        assert_eq!(*out.get_pixel(90 - CORNER_HALF as u32, 90), BLUE);
    }

    #[test]
    fn labels_near_the_border_are_clipped() {
        let mut det = detection();
        det.corners[0].position = Point2::new(1.0, 1.0);
        det.corners[1].position = Point2::new(118.0, 98.0);
        let out = draw_detection(&gray(120, 100), &det);
        assert_eq!(out.dimensions(), (120, 100));
    }

    #[test]
    fn text_width_counts_advance() {
        assert_eq!(text_width("", 2), 0);
        assert_eq!(text_width("7", 1), 5);
        assert_eq!(text_width("12", 2), 22);
    }

    #[test]
    fn known_glyph_lights_pixels() {
        let mut img = gray(10, 10);
        draw_text(&mut img, 0, 0, "1", RED, 1);
        assert_eq!(*img.get_pixel(2, 0), RED);
        assert_eq!(*img.get_pixel(0, 0), Rgb([128, 128, 128]));
    }
}
