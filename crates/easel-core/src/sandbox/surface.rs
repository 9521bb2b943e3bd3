//! Raster drawing surface exposed to candidate programs.
//!
//! A small cairo-like API over a `tiny_skia::Pixmap`: a current path, a
//! source colour and a line width. Path operations accumulate; `fill` and
//! `stroke` draw and clear the path.

use std::cell::RefCell;
use std::f32::consts::{PI, TAU};
use std::rc::Rc;

use rhai::{Dynamic, Engine, EvalAltResult, INT};
use tiny_skia::{Color, FillRule, Paint, PathBuilder, Pixmap, Rect, Stroke, Transform};

use super::capability::number;
use super::error::{SandboxError, SandboxResult};

/// Largest width or height a program may allocate.
pub const MAX_SURFACE_DIM: u32 = 4096;

/// Upper bound on line segments used to approximate one arc.
const MAX_ARC_SEGMENTS: usize = 512;

struct Canvas {
    pixmap: Pixmap,
    path: PathBuilder,
    current: Option<(f32, f32)>,
    subpath_start: Option<(f32, f32)>,
    color: Color,
    line_width: f32,
}

impl Canvas {
    fn paint(&self) -> Paint<'static> {
        let mut paint = Paint::default();
        paint.set_color(self.color);
        paint.anti_alias = true;
        paint
    }

    fn take_path(&mut self) -> Option<tiny_skia::Path> {
        self.current = None;
        self.subpath_start = None;
        std::mem::replace(&mut self.path, PathBuilder::new()).finish()
    }

    fn move_to(&mut self, x: f32, y: f32) {
        self.path.move_to(x, y);
        self.current = Some((x, y));
        self.subpath_start = Some((x, y));
    }

    fn line_to(&mut self, x: f32, y: f32) {
        if self.current.is_none() {
            self.move_to(x, y);
            return;
        }
        self.path.line_to(x, y);
        self.current = Some((x, y));
    }
}

/// Shared handle to a drawing surface.
///
/// Cloning shares the same pixels; the handle never leaves the sandbox
/// worker thread that created it.
#[derive(Clone)]
pub struct Surface {
    inner: Rc<RefCell<Canvas>>,
}

impl std::fmt::Debug for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Surface")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

fn unit(v: f32) -> f32 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

fn finite(values: &[f32]) -> bool {
    values.iter().all(|v| v.is_finite())
}

impl Surface {
    /// Allocate a transparent surface.
    pub fn new(width: u32, height: u32) -> SandboxResult<Self> {
        let too_big = width == 0 || height == 0 || width > MAX_SURFACE_DIM || height > MAX_SURFACE_DIM;
        let pixmap = if too_big { None } else { Pixmap::new(width, height) };
        let pixmap = pixmap.ok_or(SandboxError::SurfaceSize {
            width: i64::from(width),
            height: i64::from(height),
            max: MAX_SURFACE_DIM,
        })?;

        Ok(Self {
            inner: Rc::new(RefCell::new(Canvas {
                pixmap,
                path: PathBuilder::new(),
                current: None,
                subpath_start: None,
                color: Color::BLACK,
                line_width: 2.0,
            })),
        })
    }

    pub fn width(&self) -> u32 {
        self.inner.borrow().pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.inner.borrow().pixmap.height()
    }

    /// Set the source colour; components are clamped to `0.0..=1.0`.
    pub fn set_source_rgba(&self, r: f32, g: f32, b: f32, a: f32) {
        let color = Color::from_rgba(unit(r), unit(g), unit(b), unit(a)).unwrap_or(Color::BLACK);
        self.inner.borrow_mut().color = color;
    }

    pub fn set_source_rgb(&self, r: f32, g: f32, b: f32) {
        self.set_source_rgba(r, g, b, 1.0);
    }

    /// Non-positive or non-finite widths are ignored.
    pub fn set_line_width(&self, width: f32) {
        if width.is_finite() && width > 0.0 {
            self.inner.borrow_mut().line_width = width;
        }
    }

    /// Cover the whole surface with the source colour.
    pub fn paint(&self) {
        let canvas = &mut *self.inner.borrow_mut();
        let paint = canvas.paint();
        let (w, h) = (canvas.pixmap.width() as f32, canvas.pixmap.height() as f32);
        if let Some(rect) = Rect::from_xywh(0.0, 0.0, w, h) {
            canvas
                .pixmap
                .fill_rect(rect, &paint, Transform::identity(), None);
        }
    }

    pub fn new_path(&self) {
        self.inner.borrow_mut().take_path();
    }

    pub fn move_to(&self, x: f32, y: f32) {
        if finite(&[x, y]) {
            self.inner.borrow_mut().move_to(x, y);
        }
    }

    pub fn line_to(&self, x: f32, y: f32) {
        if finite(&[x, y]) {
            self.inner.borrow_mut().line_to(x, y);
        }
    }

    /// Cubic Bezier from the current point.
    pub fn curve_to(&self, x1: f32, y1: f32, x2: f32, y2: f32, x3: f32, y3: f32) {
        if !finite(&[x1, y1, x2, y2, x3, y3]) {
            return;
        }
        let mut canvas = self.inner.borrow_mut();
        if canvas.current.is_none() {
            canvas.move_to(x1, y1);
        }
        canvas.path.cubic_to(x1, y1, x2, y2, x3, y3);
        canvas.current = Some((x3, y3));
    }

    pub fn close_path(&self) {
        let mut canvas = self.inner.borrow_mut();
        if canvas.current.is_some() {
            canvas.path.close();
            canvas.current = canvas.subpath_start;
        }
    }

    /// Closed rectangle sub-path; negative sizes are allowed.
    pub fn rectangle(&self, x: f32, y: f32, w: f32, h: f32) {
        if !finite(&[x, y, w, h]) {
            return;
        }
        let mut canvas = self.inner.borrow_mut();
        canvas.move_to(x, y);
        canvas.line_to(x + w, y);
        canvas.line_to(x + w, y + h);
        canvas.line_to(x, y + h);
        canvas.path.close();
        canvas.current = Some((x, y));
    }

    /// Circular arc around `(xc, yc)` from `a1` to `a2` (radians, increasing).
    ///
    /// Joins the current point to the arc start with a line, like cairo.
    pub fn arc(&self, xc: f32, yc: f32, radius: f32, a1: f32, a2: f32) {
        if !finite(&[xc, yc, radius, a1, a2]) || radius < 0.0 {
            return;
        }
        let span = if a2 < a1 {
            (a2 - a1).rem_euclid(TAU)
        } else {
            (a2 - a1).min(TAU)
        };
        let segments = ((span / (PI / 32.0)).ceil() as usize).clamp(1, MAX_ARC_SEGMENTS);

        let mut canvas = self.inner.borrow_mut();
        let start = (xc + radius * a1.cos(), yc + radius * a1.sin());
        canvas.line_to(start.0, start.1);
        for i in 1..=segments {
            let angle = a1 + span * (i as f32 / segments as f32);
            canvas.line_to(xc + radius * angle.cos(), yc + radius * angle.sin());
        }
    }

    /// Fill the current path and clear it.
    pub fn fill(&self) {
        let canvas = &mut *self.inner.borrow_mut();
        let paint = canvas.paint();
        if let Some(path) = canvas.take_path() {
            canvas.pixmap.fill_path(
                &path,
                &paint,
                FillRule::Winding,
                Transform::identity(),
                None,
            );
        }
    }

    /// Stroke the current path with the line width and clear it.
    pub fn stroke(&self) {
        let canvas = &mut *self.inner.borrow_mut();
        let paint = canvas.paint();
        let stroke = Stroke {
            width: canvas.line_width,
            ..Stroke::default()
        };
        if let Some(path) = canvas.take_path() {
            canvas
                .pixmap
                .stroke_path(&path, &paint, &stroke, Transform::identity(), None);
        }
    }

    /// Un-premultiplied RGBA of one pixel.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let color = self.inner.borrow().pixmap.pixel(x, y)?.demultiply();
        Some([color.red(), color.green(), color.blue(), color.alpha()])
    }

    pub fn encode_png(&self) -> SandboxResult<Vec<u8>> {
        self.inner
            .borrow()
            .pixmap
            .encode_png()
            .map_err(|e| SandboxError::Encode(e.to_string()))
    }
}

fn dimension(value: &Dynamic) -> Result<u32, Box<EvalAltResult>> {
    let v = number(value)?;
    if v.is_finite() && v >= 1.0 && v <= f64::from(MAX_SURFACE_DIM) {
        Ok(v as u32)
    } else {
        Err(format!("surface dimension {v} outside 1..={MAX_SURFACE_DIM}").into())
    }
}

fn f(value: &Dynamic) -> Result<f32, Box<EvalAltResult>> {
    number(value).map(|v| v as f32)
}

/// Register the `Surface` type and its drawing functions.
pub(crate) fn register(engine: &mut Engine) {
    engine.register_type_with_name::<Surface>("Surface");

    engine.register_fn(
        "new_surface",
        |w: Dynamic, h: Dynamic| -> Result<Surface, Box<EvalAltResult>> {
            Surface::new(dimension(&w)?, dimension(&h)?).map_err(|e| e.to_string().into())
        },
    );
    engine.register_get("width", |s: &mut Surface| s.width() as INT);
    engine.register_get("height", |s: &mut Surface| s.height() as INT);

    engine.register_fn(
        "set_source_rgb",
        |s: &mut Surface, r: Dynamic, g: Dynamic, b: Dynamic| -> Result<(), Box<EvalAltResult>> {
            s.set_source_rgb(f(&r)?, f(&g)?, f(&b)?);
            Ok(())
        },
    );
    engine.register_fn(
        "set_source_rgba",
        |s: &mut Surface,
         r: Dynamic,
         g: Dynamic,
         b: Dynamic,
         a: Dynamic|
         -> Result<(), Box<EvalAltResult>> {
            s.set_source_rgba(f(&r)?, f(&g)?, f(&b)?, f(&a)?);
            Ok(())
        },
    );
    engine.register_fn(
        "set_line_width",
        |s: &mut Surface, w: Dynamic| -> Result<(), Box<EvalAltResult>> {
            s.set_line_width(f(&w)?);
            Ok(())
        },
    );
    engine.register_fn("paint", |s: &mut Surface| s.paint());
    engine.register_fn("new_path", |s: &mut Surface| s.new_path());
    engine.register_fn(
        "move_to",
        |s: &mut Surface, x: Dynamic, y: Dynamic| -> Result<(), Box<EvalAltResult>> {
            s.move_to(f(&x)?, f(&y)?);
            Ok(())
        },
    );
    engine.register_fn(
        "line_to",
        |s: &mut Surface, x: Dynamic, y: Dynamic| -> Result<(), Box<EvalAltResult>> {
            s.line_to(f(&x)?, f(&y)?);
            Ok(())
        },
    );
    engine.register_fn(
        "curve_to",
        |s: &mut Surface,
         x1: Dynamic,
         y1: Dynamic,
         x2: Dynamic,
         y2: Dynamic,
         x3: Dynamic,
         y3: Dynamic|
         -> Result<(), Box<EvalAltResult>> {
            s.curve_to(f(&x1)?, f(&y1)?, f(&x2)?, f(&y2)?, f(&x3)?, f(&y3)?);
            Ok(())
        },
    );
    engine.register_fn("close_path", |s: &mut Surface| s.close_path());
    engine.register_fn(
        "rectangle",
        |s: &mut Surface,
         x: Dynamic,
         y: Dynamic,
         w: Dynamic,
         h: Dynamic|
         -> Result<(), Box<EvalAltResult>> {
            s.rectangle(f(&x)?, f(&y)?, f(&w)?, f(&h)?);
            Ok(())
        },
    );
    engine.register_fn(
        "arc",
        |s: &mut Surface,
         xc: Dynamic,
         yc: Dynamic,
         r: Dynamic,
         a1: Dynamic,
         a2: Dynamic|
         -> Result<(), Box<EvalAltResult>> {
            s.arc(f(&xc)?, f(&yc)?, f(&r)?, f(&a1)?, f(&a2)?);
            Ok(())
        },
    );
    engine.register_fn("fill", |s: &mut Surface| s.fill());
    engine.register_fn("stroke", |s: &mut Surface| s.stroke());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surface_size_bounds() {
        assert!(Surface::new(1, 1).is_ok());
        assert!(Surface::new(0, 10).is_err());
        assert!(Surface::new(MAX_SURFACE_DIM + 1, 10).is_err());
    }

    #[test]
    fn test_paint_covers_surface() {
        let s = Surface::new(8, 8).unwrap();
        assert_eq!(s.pixel(3, 3), Some([0, 0, 0, 0]));
        s.set_source_rgb(1.0, 0.0, 0.0);
        s.paint();
        assert_eq!(s.pixel(0, 0), Some([255, 0, 0, 255]));
        assert_eq!(s.pixel(7, 7), Some([255, 0, 0, 255]));
    }

    #[test]
    fn test_fill_rectangle_only_inside() {
        let s = Surface::new(20, 20).unwrap();
        s.set_source_rgb(1.0, 1.0, 1.0);
        s.rectangle(0.0, 0.0, 10.0, 20.0);
        s.fill();
        assert_eq!(s.pixel(5, 10), Some([255, 255, 255, 255]));
        assert_eq!(s.pixel(15, 10).map(|p| p[3]), Some(0));
    }

    #[test]
    fn test_components_are_clamped() {
        let s = Surface::new(4, 4).unwrap();
        s.set_source_rgb(2.0, -1.0, f32::NAN);
        s.paint();
        assert_eq!(s.pixel(1, 1), Some([255, 0, 0, 255]));
    }

    #[test]
    fn test_stroke_full_arc_marks_ring() {
        let s = Surface::new(40, 40).unwrap();
        s.set_source_rgb(0.0, 0.0, 1.0);
        s.set_line_width(4.0);
        s.arc(20.0, 20.0, 10.0, 0.0, TAU);
        s.stroke();
        // on the ring, right of centre
        assert_eq!(s.pixel(30, 20).map(|p| p[2]), Some(255));
        // centre untouched
        assert_eq!(s.pixel(20, 20).map(|p| p[3]), Some(0));
    }

    #[test]
    fn test_huge_angles_do_not_hang() {
        let s = Surface::new(10, 10).unwrap();
        s.arc(5.0, 5.0, 3.0, 1.0e30, 0.0);
        s.arc(5.0, 5.0, 3.0, 0.0, 1.0e30);
        s.stroke();
    }

    #[test]
    fn test_encode_png_signature() {
        let s = Surface::new(4, 4).unwrap();
        let png = s.encode_png().unwrap();
        assert_eq!(&png[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    }
}
