use embedded_graphics_core::draw_target::DrawTarget;
use embedded_graphics_core::pixelcolor::Rgb565;
use embedded_graphics_core::prelude::Point;
use embedded_graphics_core::Pixel;
use nalgebra::Point2;

use crate::DrawPrimitive;

/// Depth values written by the renderer span `0..=DEPTH_MAX` (near to far).
pub const DEPTH_MAX: u32 = 1 << 24;

/// Per-pixel depth for a `width` x `height` viewport anchored at the
/// target's top-left corner. Smaller is closer.
#[derive(Debug, Clone)]
pub struct ZBuffer {
    width: usize,
    height: usize,
    depth: Vec<u32>,
}

impl ZBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        let (width, height) = (width as usize, height as usize);
        Self {
            width,
            height,
            depth: vec![u32::MAX; width * height],
        }
    }

    /// Change dimensions. Contents are reset.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width as usize;
        self.height = height as usize;
        self.depth.clear();
        self.depth.resize(self.width * self.height, u32::MAX);
    }

    pub fn clear(&mut self) {
        self.depth.fill(u32::MAX);
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: i32, y: i32) -> Option<u32> {
        self.index(x, y).map(|i| self.depth[i])
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        Some(y as usize * self.width + x as usize)
    }

    /// Store `z` at `(x, y)` if it is closer than what is there. Pixels
    /// outside the viewport always fail.
    #[inline]
    fn test_and_set(&mut self, x: i32, y: i32, z: u32) -> bool {
        match self.index(x, y) {
            Some(i) if z < self.depth[i] => {
                self.depth[i] = z;
                true
            }
            _ => false,
        }
    }
}

/// Rasterize one primitive, depth-testing lines and triangles against `zbuffer`.
pub fn draw<D>(primitive: DrawPrimitive, fb: &mut D, zbuffer: &mut ZBuffer) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    match primitive {
        DrawPrimitive::ColoredPoint(p, color) => {
            if zbuffer.index(p.x, p.y).is_some() {
                fb.draw_iter([Pixel(Point::new(p.x, p.y), color)])?;
            }
            Ok(())
        }
        DrawPrimitive::Line { points, depths, color } => draw_line(points, depths, color, fb, zbuffer),
        DrawPrimitive::Triangle { points, depths, color } => {
            fill_triangle(points, depths, color, fb, zbuffer)
        }
    }
}

fn draw_line<D>(
    [p1, p2]: [Point2<i32>; 2],
    [z1, z2]: [u32; 2],
    color: Rgb565,
    fb: &mut D,
    zbuffer: &mut ZBuffer,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    let steps = (p2.x - p1.x).abs().max((p2.y - p1.y).abs()).max(1) as i64;
    let pixels = line_drawing::Bresenham::new((p1.x, p1.y), (p2.x, p2.y))
        .enumerate()
        .filter_map(|(i, (x, y))| {
            let z = lerp_depth(z1, z2, i as i64, steps);
            zbuffer
                .test_and_set(x, y, z)
                .then(|| Pixel(Point::new(x, y), color))
        });
    fb.draw_iter(pixels)
}

/// Flat-colored triangle: sorted by y, split at the middle vertex into a
/// flat-bottom and a flat-top half, each filled one scanline at a time.
fn fill_triangle<D>(
    mut points: [Point2<i32>; 3],
    mut depths: [u32; 3],
    color: Rgb565,
    fb: &mut D,
    zbuffer: &mut ZBuffer,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    if points[0].y > points[1].y {
        points.swap(0, 1);
        depths.swap(0, 1);
    }
    if points[0].y > points[2].y {
        points.swap(0, 2);
        depths.swap(0, 2);
    }
    if points[1].y > points[2].y {
        points.swap(1, 2);
        depths.swap(1, 2);
    }
    let [p1, p2, p3] = points;
    let [z1, z2, z3] = depths;

    if p1.y == p3.y {
        // Degenerate: a single horizontal run.
        let (lo, hi) = (p1.x.min(p2.x).min(p3.x), p1.x.max(p2.x).max(p3.x));
        return draw_scanline(lo, hi, p1.y, z1.min(z2).min(z3), z1.min(z2).min(z3), color, fb, zbuffer);
    }

    let y_start = p1.y.max(0);
    let y_end = p3.y.min(zbuffer.height as i32 - 1);

    for y in y_start..=y_end {
        // Long edge p1 -> p3 against the short edge on this half.
        let xa = edge(p1.x as i64, p3.x as i64, (y - p1.y) as i64, (p3.y - p1.y) as i64);
        let za = lerp_depth(z1, z3, (y - p1.y) as i64, (p3.y - p1.y) as i64);

        let (xb, zb) = if y < p2.y || p2.y == p3.y {
            let span = (p2.y - p1.y).max(1) as i64;
            (
                edge(p1.x as i64, p2.x as i64, (y - p1.y) as i64, span),
                lerp_depth(z1, z2, (y - p1.y) as i64, span),
            )
        } else {
            let span = (p3.y - p2.y).max(1) as i64;
            (
                edge(p2.x as i64, p3.x as i64, (y - p2.y) as i64, span),
                lerp_depth(z2, z3, (y - p2.y) as i64, span),
            )
        };

        if xa <= xb {
            draw_scanline(xa, xb, y, za, zb, color, fb, zbuffer)?;
        } else {
            draw_scanline(xb, xa, y, zb, za, color, fb, zbuffer)?;
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn draw_scanline<D>(
    x1: i32,
    x2: i32,
    y: i32,
    z1: u32,
    z2: u32,
    color: Rgb565,
    fb: &mut D,
    zbuffer: &mut ZBuffer,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    let span = (x2 - x1).max(1) as i64;
    let start = x1.max(0);
    let end = x2.min(zbuffer.width as i32 - 1);
    if start > end {
        return Ok(());
    }

    let pixels = (start..=end).filter_map(|x| {
        let z = lerp_depth(z1, z2, (x - x1) as i64, span);
        zbuffer
            .test_and_set(x, y, z)
            .then(|| Pixel(Point::new(x, y), color))
    });
    fb.draw_iter(pixels)
}

#[inline]
fn edge(a: i64, b: i64, num: i64, den: i64) -> i32 {
    (a + (b - a) * num / den) as i32
}

#[inline]
fn lerp_depth(z1: u32, z2: u32, num: i64, den: i64) -> u32 {
    (z1 as i64 + (z2 as i64 - z1 as i64) * num / den).clamp(0, u32::MAX as i64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics_core::pixelcolor::{RgbColor, WebColors};
    use embedded_graphics_core::prelude::*;

    // Mock framebuffer for testing
    struct MockFramebuffer {
        pixels: Vec<(i32, i32, Rgb565)>,
    }

    impl MockFramebuffer {
        fn new() -> Self {
            Self { pixels: Vec::new() }
        }

        fn contains_pixel(&self, x: i32, y: i32) -> bool {
            self.pixels.iter().any(|(px, py, _)| *px == x && *py == y)
        }

        fn last_color_at(&self, x: i32, y: i32) -> Option<Rgb565> {
            self.pixels
                .iter()
                .rev()
                .find(|(px, py, _)| *px == x && *py == y)
                .map(|(_, _, c)| *c)
        }

        fn pixel_count(&self) -> usize {
            self.pixels.len()
        }
    }

    impl DrawTarget for MockFramebuffer {
        type Color = Rgb565;
        type Error = core::convert::Infallible;

        fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
        where
            I: IntoIterator<Item = Pixel<Self::Color>>,
        {
            for pixel in pixels {
                self.pixels.push((pixel.0.x, pixel.0.y, pixel.1));
            }
            Ok(())
        }
    }

    impl OriginDimensions for MockFramebuffer {
        fn size(&self) -> Size {
            Size::new(640, 480)
        }
    }

    fn triangle(points: [(i32, i32); 3], depth: u32, color: Rgb565) -> DrawPrimitive {
        DrawPrimitive::Triangle {
            points: points.map(|(x, y)| Point2::new(x, y)),
            depths: [depth; 3],
            color,
        }
    }

    #[test]
    fn test_draw_point() {
        let mut fb = MockFramebuffer::new();
        let mut zb = ZBuffer::new(640, 480);

        draw(DrawPrimitive::ColoredPoint(Point2::new(10, 20), Rgb565::CSS_RED), &mut fb, &mut zb).unwrap();
        draw(DrawPrimitive::ColoredPoint(Point2::new(-1, 20), Rgb565::CSS_RED), &mut fb, &mut zb).unwrap();

        assert_eq!(fb.pixel_count(), 1);
        assert!(fb.contains_pixel(10, 20));
    }

    #[test]
    fn test_draw_line_horizontal() {
        let mut fb = MockFramebuffer::new();
        let mut zb = ZBuffer::new(640, 480);
        let line = DrawPrimitive::Line {
            points: [Point2::new(10, 20), Point2::new(20, 20)],
            depths: [100, 100],
            color: Rgb565::CSS_GREEN,
        };

        draw(line, &mut fb, &mut zb).unwrap();

        assert_eq!(fb.pixel_count(), 11);
        assert!(fb.contains_pixel(10, 20));
        assert!(fb.contains_pixel(20, 20));
        assert_eq!(zb.get(15, 20), Some(100));
    }

    #[test]
    fn test_draw_line_diagonal_clipped() {
        let mut fb = MockFramebuffer::new();
        let mut zb = ZBuffer::new(640, 480);
        let line = DrawPrimitive::Line {
            points: [Point2::new(-5, -5), Point2::new(10, 10)],
            depths: [0, 0],
            color: Rgb565::CSS_WHITE,
        };

        draw(line, &mut fb, &mut zb).unwrap();

        assert_eq!(fb.pixel_count(), 11);
        assert!(fb.contains_pixel(0, 0));
        assert!(fb.contains_pixel(10, 10));
    }

    #[test]
    fn test_draw_triangle_flat_bottom() {
        let mut fb = MockFramebuffer::new();
        let mut zb = ZBuffer::new(640, 480);

        draw(triangle([(50, 10), (30, 30), (70, 30)], 10, Rgb565::CSS_YELLOW), &mut fb, &mut zb).unwrap();

        assert!(fb.pixel_count() > 20);
        assert!(fb.contains_pixel(50, 10));
        assert!(fb.contains_pixel(50, 20));
        assert!(!fb.contains_pixel(31, 11));
    }

    #[test]
    fn test_draw_triangle_flat_top() {
        let mut fb = MockFramebuffer::new();
        let mut zb = ZBuffer::new(640, 480);

        draw(triangle([(30, 10), (70, 10), (50, 30)], 10, Rgb565::CSS_CYAN), &mut fb, &mut zb).unwrap();

        assert!(fb.pixel_count() > 20);
        assert!(fb.contains_pixel(50, 30));
        assert!(fb.contains_pixel(30, 10));
    }

    #[test]
    fn test_triangle_vertex_sorting() {
        let mut fb = MockFramebuffer::new();
        let mut zb = ZBuffer::new(640, 480);

        draw(triangle([(50, 30), (30, 10), (70, 20)], 10, Rgb565::WHITE), &mut fb, &mut zb).unwrap();

        assert!(fb.pixel_count() > 10);
        assert!(fb.contains_pixel(50, 20));
    }

    #[test]
    fn test_triangle_clamped_to_viewport() {
        let mut fb = MockFramebuffer::new();
        let mut zb = ZBuffer::new(32, 16);

        draw(triangle([(-1000, -1000), (5000, 0), (0, 4000)], 10, Rgb565::WHITE), &mut fb, &mut zb).unwrap();

        assert!(fb.pixels.iter().all(|(x, y, _)| (0..32).contains(x) && (0..16).contains(y)));
        assert!(fb.contains_pixel(0, 0));
    }

    #[test]
    fn test_zbuffer_keeps_nearest() {
        let mut fb = MockFramebuffer::new();
        let mut zb = ZBuffer::new(640, 480);

        draw(triangle([(0, 0), (40, 0), (0, 40)], 50, Rgb565::CSS_RED), &mut fb, &mut zb).unwrap();
        draw(triangle([(0, 0), (40, 0), (0, 40)], 80, Rgb565::CSS_BLUE), &mut fb, &mut zb).unwrap();
        assert_eq!(fb.last_color_at(5, 5), Some(Rgb565::CSS_RED));

        draw(triangle([(0, 0), (40, 0), (0, 40)], 20, Rgb565::CSS_LIME), &mut fb, &mut zb).unwrap();
        assert_eq!(fb.last_color_at(5, 5), Some(Rgb565::CSS_LIME));
    }

    #[test]
    fn test_zbuffer_resize_resets() {
        let mut zb = ZBuffer::new(4, 4);
        assert!(zb.test_and_set(1, 1, 5));
        zb.resize(8, 2);
        assert_eq!((zb.width(), zb.height()), (8, 2));
        assert_eq!(zb.get(1, 1), Some(u32::MAX));
        assert_eq!(zb.get(1, 3), None);
    }
}
