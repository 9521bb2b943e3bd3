//! Composition of the physical display buffer.
//!
//! The panel is 800x480: the artwork fills the left 600 px and a 200 px info
//! panel sits on the right. There is no font rasteriser in the stack, so the
//! panel carries graphical indicators only (current period, score bar); the
//! text goes to the JSON sidecar.

use easel_core::{PromotionError, PromotionMetadata};
use tiny_skia::{Color, FilterQuality, Paint, Pixmap, PixmapPaint, Rect, Transform};

pub const FRAME_WIDTH: u32 = 800;
pub const FRAME_HEIGHT: u32 = 480;
pub const PANEL_WIDTH: u32 = 200;
pub const ART_WIDTH: u32 = FRAME_WIDTH - PANEL_WIDTH;

pub const BACKGROUND: [u8; 3] = [20, 20, 20];
pub const PANEL: [u8; 3] = [30, 30, 30];
const TRACK: [u8; 3] = [60, 60, 60];
const DIM: [u8; 3] = [80, 80, 80];
const BRIGHT: [u8; 3] = [230, 230, 230];

const PANEL_MARGIN: f32 = 15.0;
const PIP_SIZE: f32 = 14.0;
const PIP_STEP: f32 = 24.0;
const PIP_TOP: f32 = 45.0;
pub const SCORE_TOP: f32 = 100.0;
const SCORE_HEIGHT: f32 = 8.0;
const SCORE_WIDTH: f32 = PANEL_WIDTH as f32 - 2.0 * PANEL_MARGIN;

fn paint(rgb: [u8; 3]) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(rgb[0], rgb[1], rgb[2], 255);
    paint
}

fn fill(frame: &mut Pixmap, x: f32, y: f32, w: f32, h: f32, rgb: [u8; 3]) {
    if let Some(rect) = Rect::from_xywh(x, y, w, h) {
        frame.fill_rect(rect, &paint(rgb), Transform::identity(), None);
    }
}

fn display_error(what: &str, err: impl std::fmt::Display) -> PromotionError {
    PromotionError::Display(format!("{what}: {err}"))
}

/// Scale and offset that fit a `w`x`h` image into the artwork area, centred.
pub fn fit_artwork(w: u32, h: u32) -> (f32, f32, f32) {
    let scale = (ART_WIDTH as f32 / w as f32).min(FRAME_HEIGHT as f32 / h as f32);
    let x = (ART_WIDTH as f32 - w as f32 * scale) / 2.0;
    let y = (FRAME_HEIGHT as f32 - h as f32 * scale) / 2.0;
    (scale, x, y)
}

/// Width of the filled part of the score bar.
pub fn score_fill(score: Option<u32>) -> f32 {
    score.map_or(0.0, |s| SCORE_WIDTH * s.min(10) as f32 / 10.0)
}

/// Build the PNG shown on the display from the winner's PNG.
pub fn compose_frame(
    image: &[u8],
    metadata: &PromotionMetadata,
) -> Result<Vec<u8>, PromotionError> {
    let artwork =
        Pixmap::decode_png(image).map_err(|e| display_error("unreadable artwork", e))?;
    let mut frame = Pixmap::new(FRAME_WIDTH, FRAME_HEIGHT)
        .ok_or_else(|| display_error("frame", "cannot allocate buffer"))?;
    frame.fill(Color::from_rgba8(BACKGROUND[0], BACKGROUND[1], BACKGROUND[2], 255));

    let (scale, x, y) = fit_artwork(artwork.width(), artwork.height());
    let pixmap_paint = PixmapPaint {
        quality: FilterQuality::Bilinear,
        ..PixmapPaint::default()
    };
    frame.draw_pixmap(
        0,
        0,
        artwork.as_ref(),
        &pixmap_paint,
        Transform::from_scale(scale, scale).post_translate(x, y),
        None,
    );

    let left = ART_WIDTH as f32;
    fill(&mut frame, left, 0.0, PANEL_WIDTH as f32, FRAME_HEIGHT as f32, PANEL);

    for slot in 1..=4u8 {
        let colour = if slot == metadata.period { BRIGHT } else { DIM };
        let px = left + PANEL_MARGIN + f32::from(slot - 1) * PIP_STEP;
        fill(&mut frame, px, PIP_TOP, PIP_SIZE, PIP_SIZE, colour);
    }

    let bar_x = left + PANEL_MARGIN;
    fill(&mut frame, bar_x, SCORE_TOP, SCORE_WIDTH, SCORE_HEIGHT, TRACK);
    let filled = score_fill(metadata.score);
    if filled > 0.0 {
        fill(&mut frame, bar_x, SCORE_TOP, filled, SCORE_HEIGHT, BRIGHT);
    }

    frame.encode_png().map_err(|e| display_error("frame encoding", e))
}
