//! Binary-plane machinery shared by the detection stages.
//!
//! Everything downstream of binarization works on a [`Mask`]: adaptive
//! thresholding of a grayscale plane, rectangular morphology, run-length
//! directional opening for line isolation, 8-connected component extraction
//! with Moore boundary tracing, and Douglas–Peucker polygon approximation.
//!
//! Contour statistics follow the usual external-contour semantics: `area`
//! is the enclosed (shoelace) area of the traced boundary, so hollow shapes
//! keep their full footprint, and `perimeter` is the traced path length.
use crate::image::GrayImage;
use crate::types::Rect;

/// Binary image plane, row-major, one byte per pixel (0 or 1).
#[derive(Clone, Debug)]
pub struct Mask {
    pub w: usize,
    pub h: usize,
    pub data: Vec<u8>,
}

impl Mask {
    pub fn new(w: usize, h: usize) -> Self {
        Self {
            w,
            h,
            data: vec![0u8; w * h],
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> bool {
        self.data[y * self.w + x] != 0
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: bool) {
        self.data[y * self.w + x] = v as u8;
    }

    /// Morphological opening with a `1 x k` horizontal segment, implemented
    /// as a run-length filter: set-runs shorter than `k` are removed, longer
    /// runs survive intact. Exactly equivalent to erode-then-dilate.
    pub fn open_runs_h(&self, k: usize) -> Mask {
        let mut out = Mask::new(self.w, self.h);
        if k <= 1 {
            out.data.copy_from_slice(&self.data);
            return out;
        }
        for y in 0..self.h {
            let mut x = 0;
            while x < self.w {
                if !self.get(x, y) {
                    x += 1;
                    continue;
                }
                let start = x;
                while x < self.w && self.get(x, y) {
                    x += 1;
                }
                if x - start >= k {
                    for xx in start..x {
                        out.set(xx, y, true);
                    }
                }
            }
        }
        out
    }

    /// Morphological opening with a `k x 1` vertical segment (run-length form).
    pub fn open_runs_v(&self, k: usize) -> Mask {
        let mut out = Mask::new(self.w, self.h);
        if k <= 1 {
            out.data.copy_from_slice(&self.data);
            return out;
        }
        for x in 0..self.w {
            let mut y = 0;
            while y < self.h {
                if !self.get(x, y) {
                    y += 1;
                    continue;
                }
                let start = y;
                while y < self.h && self.get(x, y) {
                    y += 1;
                }
                if y - start >= k {
                    for yy in start..y {
                        out.set(x, yy, true);
                    }
                }
            }
        }
        out
    }

    fn erode_rect(&self, kw: usize, kh: usize) -> Mask {
        self.filter_rect(kw, kh, true)
    }

    fn dilate_rect(&self, kw: usize, kh: usize) -> Mask {
        self.filter_rect(kw, kh, false)
    }

    // Separable min/max filter with a centered kw x kh window. Pixels whose
    // window leaves the image are treated as background for erosion and
    // background for dilation (border is not padded with foreground).
    fn filter_rect(&self, kw: usize, kh: usize, erode: bool) -> Mask {
        let rx = (kw / 2) as i64;
        let ry = (kh / 2) as i64;
        let mut tmp = Mask::new(self.w, self.h);
        for y in 0..self.h {
            for x in 0..self.w {
                let mut acc = erode;
                for dx in -rx..=rx {
                    let xx = x as i64 + dx;
                    let v = if xx < 0 || xx >= self.w as i64 {
                        false
                    } else {
                        self.get(xx as usize, y)
                    };
                    if erode {
                        acc &= v;
                    } else {
                        acc |= v;
                    }
                }
                tmp.set(x, y, acc);
            }
        }
        let mut out = Mask::new(self.w, self.h);
        for y in 0..self.h {
            for x in 0..self.w {
                let mut acc = erode;
                for dy in -ry..=ry {
                    let yy = y as i64 + dy;
                    let v = if yy < 0 || yy >= self.h as i64 {
                        false
                    } else {
                        tmp.get(x, yy as usize)
                    };
                    if erode {
                        acc &= v;
                    } else {
                        acc |= v;
                    }
                }
                out.set(x, y, acc);
            }
        }
        out
    }

    /// Opening (erode then dilate) with a centered `kw x kh` rectangle.
    pub fn open_rect(&self, kw: usize, kh: usize) -> Mask {
        self.erode_rect(kw, kh).dilate_rect(kw, kh)
    }

    /// Closing (dilate then erode) with a centered `kw x kh` rectangle.
    pub fn close_rect(&self, kw: usize, kh: usize) -> Mask {
        self.dilate_rect(kw, kh).erode_rect(kw, kh)
    }
}

/// Inverted adaptive mean threshold: a pixel is set when its value falls
/// below the local mean (over a `block x block` clamped window) minus `c`.
/// Dark foreground on a light background comes out as foreground.
pub fn adaptive_threshold_inv(gray: &GrayImage, block: usize, c: f32) -> Mask {
    let w = gray.w;
    let h = gray.h;
    let mut out = Mask::new(w, h);
    if w == 0 || h == 0 {
        return out;
    }
    // Integral image with a zero row/column of padding.
    let mut integral = vec![0u64; (w + 1) * (h + 1)];
    for y in 0..h {
        let mut row_sum = 0u64;
        for x in 0..w {
            row_sum += gray.get(x, y) as u64;
            integral[(y + 1) * (w + 1) + (x + 1)] = integral[y * (w + 1) + (x + 1)] + row_sum;
        }
    }
    let r = (block / 2) as i64;
    for y in 0..h {
        let y0 = (y as i64 - r).max(0) as usize;
        let y1 = ((y as i64 + r + 1).min(h as i64)) as usize;
        for x in 0..w {
            let x0 = (x as i64 - r).max(0) as usize;
            let x1 = ((x as i64 + r + 1).min(w as i64)) as usize;
            let sum = integral[y1 * (w + 1) + x1] + integral[y0 * (w + 1) + x0]
                - integral[y0 * (w + 1) + x1]
                - integral[y1 * (w + 1) + x0];
            let mean = sum as f32 / ((y1 - y0) * (x1 - x0)) as f32;
            out.set(x, y, (gray.get(x, y) as f32) < mean - c);
        }
    }
    out
}

/// External contour of one 8-connected component, with aggregate statistics.
#[derive(Clone, Debug)]
pub struct Contour {
    /// Traced outer boundary, in order (closed implicitly).
    pub boundary: Vec<(i32, i32)>,
    /// Number of foreground pixels in the component.
    pub pixel_count: usize,
    pub bbox: Rect,
    /// Pixel-mean centroid of the component.
    pub centroid: (f32, f32),
    /// Shoelace area enclosed by the boundary.
    pub area: f32,
    /// Length of the traced boundary path.
    pub perimeter: f32,
}

const NEIGH8: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Extract external contours of all 8-connected components.
pub fn find_contours(mask: &Mask) -> Vec<Contour> {
    let w = mask.w;
    let h = mask.h;
    let mut labels = vec![0u32; w * h];
    let mut contours = Vec::new();
    let mut next_label = 0u32;
    let mut stack: Vec<usize> = Vec::with_capacity(64);

    for start in 0..w * h {
        if mask.data[start] == 0 || labels[start] != 0 {
            continue;
        }
        next_label += 1;
        let label = next_label;

        // Flood-fill the component, accumulating moments and bounds.
        let mut count = 0usize;
        let mut sum_x = 0f64;
        let mut sum_y = 0f64;
        let (mut min_x, mut min_y) = (usize::MAX, usize::MAX);
        let (mut max_x, mut max_y) = (0usize, 0usize);
        // The scan order makes `start` the topmost-leftmost pixel.
        let seed = (start % w, start / w);

        labels[start] = label;
        stack.push(start);
        while let Some(idx) = stack.pop() {
            let x = idx % w;
            let y = idx / w;
            count += 1;
            sum_x += x as f64;
            sum_y += y as f64;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
            for (dx, dy) in NEIGH8 {
                let xn = x as i32 + dx;
                let yn = y as i32 + dy;
                if xn < 0 || yn < 0 || xn >= w as i32 || yn >= h as i32 {
                    continue;
                }
                let nidx = yn as usize * w + xn as usize;
                if mask.data[nidx] != 0 && labels[nidx] == 0 {
                    labels[nidx] = label;
                    stack.push(nidx);
                }
            }
        }

        let boundary = trace_boundary(mask, &labels, label, w, h, seed);
        let area = shoelace_area(&boundary);
        let perimeter = path_length(&boundary);
        contours.push(Contour {
            boundary,
            pixel_count: count,
            bbox: Rect {
                x: min_x as u32,
                y: min_y as u32,
                w: (max_x - min_x + 1) as u32,
                h: (max_y - min_y + 1) as u32,
            },
            centroid: (
                (sum_x / count as f64) as f32,
                (sum_y / count as f64) as f32,
            ),
            area,
            perimeter,
        });
    }
    contours
}

/// Moore-neighbor tracing of the outer boundary, starting from the
/// component's topmost-leftmost pixel.
fn trace_boundary(
    mask: &Mask,
    labels: &[u32],
    label: u32,
    w: usize,
    h: usize,
    seed: (usize, usize),
) -> Vec<(i32, i32)> {
    let belongs = |x: i32, y: i32| -> bool {
        if x < 0 || y < 0 || x >= w as i32 || y >= h as i32 {
            return false;
        }
        mask.data[y as usize * w + x as usize] != 0 && labels[y as usize * w + x as usize] == label
    };

    // Clockwise Moore neighborhood starting west.
    const CW: [(i32, i32); 8] = [
        (-1, 0),
        (-1, -1),
        (0, -1),
        (1, -1),
        (1, 0),
        (1, 1),
        (0, 1),
        (-1, 1),
    ];

    let start = (seed.0 as i32, seed.1 as i32);
    let mut boundary = vec![start];
    let mut current = start;
    // Index into CW of the backtrack cell. The west neighbor of the
    // topmost-leftmost pixel is guaranteed to lie outside the component.
    let mut back = 0usize;

    let max_steps = 4 * (w * h + 1);
    for _ in 0..max_steps {
        let mut found = None;
        for step in 1..=8 {
            let dir = (back + step) % 8;
            let (dx, dy) = CW[dir];
            let cand = (current.0 + dx, current.1 + dy);
            if belongs(cand.0, cand.1) {
                found = Some((cand, dir));
                break;
            }
        }
        let Some((next, dir)) = found else {
            // Isolated pixel.
            break;
        };
        if next == start {
            break;
        }
        // The cell scanned just before the hit is background and 8-adjacent
        // to `next`; it becomes the new backtrack reference.
        let prev_dir = (dir + 7) % 8;
        let prev_cell = (current.0 + CW[prev_dir].0, current.1 + CW[prev_dir].1);
        back = CW
            .iter()
            .position(|&(dx, dy)| (next.0 + dx, next.1 + dy) == prev_cell)
            .unwrap_or(0);
        boundary.push(next);
        current = next;
    }
    boundary
}

fn shoelace_area(points: &[(i32, i32)]) -> f32 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut acc = 0i64;
    for i in 0..points.len() {
        let (x0, y0) = points[i];
        let (x1, y1) = points[(i + 1) % points.len()];
        acc += x0 as i64 * y1 as i64 - x1 as i64 * y0 as i64;
    }
    (acc.abs() as f32) / 2.0
}

fn path_length(points: &[(i32, i32)]) -> f32 {
    if points.len() < 2 {
        return 0.0;
    }
    let mut len = 0f32;
    for i in 0..points.len() {
        let (x0, y0) = points[i];
        let (x1, y1) = points[(i + 1) % points.len()];
        let dx = (x1 - x0) as f32;
        let dy = (y1 - y0) as f32;
        len += (dx * dx + dy * dy).sqrt();
    }
    len
}

/// Douglas–Peucker approximation of a closed contour. Returns the retained
/// vertices; `epsilon` is the maximum allowed deviation in pixels.
pub fn approx_poly(points: &[(i32, i32)], epsilon: f32) -> Vec<(i32, i32)> {
    if points.len() < 3 {
        return points.to_vec();
    }
    // Anchor on the two mutually farthest of (first point, farthest point).
    let mut far_idx = 0;
    let mut far_d = -1.0f32;
    for (i, &p) in points.iter().enumerate() {
        let dx = (p.0 - points[0].0) as f32;
        let dy = (p.1 - points[0].1) as f32;
        let d = dx * dx + dy * dy;
        if d > far_d {
            far_d = d;
            far_idx = i;
        }
    }
    if far_idx == 0 {
        return vec![points[0]];
    }
    let mut kept = Vec::new();
    dp_simplify(&points[0..=far_idx], epsilon, &mut kept);
    kept.pop(); // shared anchor, re-added by the second half
    let mut second: Vec<(i32, i32)> = points[far_idx..].to_vec();
    second.push(points[0]);
    dp_simplify(&second, epsilon, &mut kept);
    kept.pop(); // closing point duplicates the first vertex
    kept
}

fn dp_simplify(points: &[(i32, i32)], epsilon: f32, out: &mut Vec<(i32, i32)>) {
    if points.len() < 2 {
        out.extend_from_slice(points);
        return;
    }
    let (ax, ay) = points[0];
    let (bx, by) = points[points.len() - 1];
    let mut worst = 0.0f32;
    let mut worst_idx = 0usize;
    for (i, &(px, py)) in points.iter().enumerate().take(points.len() - 1).skip(1) {
        let d = point_segment_distance(
            (px as f32, py as f32),
            (ax as f32, ay as f32),
            (bx as f32, by as f32),
        );
        if d > worst {
            worst = d;
            worst_idx = i;
        }
    }
    if worst > epsilon {
        dp_simplify(&points[0..=worst_idx], epsilon, out);
        out.pop();
        dp_simplify(&points[worst_idx..], epsilon, out);
    } else {
        out.push(points[0]);
        out.push(points[points.len() - 1]);
    }
}

fn point_segment_distance(p: (f32, f32), a: (f32, f32), b: (f32, f32)) -> f32 {
    let abx = b.0 - a.0;
    let aby = b.1 - a.1;
    let len2 = abx * abx + aby * aby;
    if len2 <= f32::EPSILON {
        let dx = p.0 - a.0;
        let dy = p.1 - a.1;
        return (dx * dx + dy * dy).sqrt();
    }
    let t = ((p.0 - a.0) * abx + (p.1 - a.1) * aby) / len2;
    let t = t.clamp(0.0, 1.0);
    let cx = a.0 + t * abx;
    let cy = a.1 + t * aby;
    let dx = p.0 - cx;
    let dy = p.1 - cy;
    (dx * dx + dy * dy).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_from_rows(rows: &[&str]) -> Mask {
        let h = rows.len();
        let w = rows[0].len();
        let mut m = Mask::new(w, h);
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                m.set(x, y, ch == '#');
            }
        }
        m
    }

    #[test]
    fn run_opening_removes_short_runs() {
        let m = mask_from_rows(&["##..#####.", ".........."]);
        let opened = m.open_runs_h(4);
        assert!(!opened.get(0, 0));
        assert!(!opened.get(1, 0));
        for x in 4..9 {
            assert!(opened.get(x, 0), "long run must survive at x={x}");
        }
    }

    #[test]
    fn adaptive_threshold_picks_dark_line_on_light_background() {
        let mut gray = GrayImage::new(21, 21);
        gray.data.fill(230);
        for x in 0..21 {
            gray.set(x, 10, 40);
        }
        let mask = adaptive_threshold_inv(&gray, 15, 3.0);
        assert!(mask.get(10, 10));
        assert!(!mask.get(10, 2));
    }

    #[test]
    fn contours_report_component_statistics() {
        let m = mask_from_rows(&[
            "..........",
            ".####.....",
            ".####.....",
            ".####...#.",
            "..........",
        ]);
        let mut contours = find_contours(&m);
        contours.sort_by(|a, b| b.pixel_count.cmp(&a.pixel_count));
        assert_eq!(contours.len(), 2);
        let big = &contours[0];
        assert_eq!(big.pixel_count, 12);
        assert_eq!(big.bbox, Rect { x: 1, y: 1, w: 4, h: 3 });
        assert!((big.centroid.0 - 2.5).abs() < 1e-4);
        assert!((big.centroid.1 - 2.0).abs() < 1e-4);
        // 4x3 pixel block traces to a 3x2 polygon.
        assert!((big.area - 6.0).abs() < 1e-3, "area={}", big.area);
        let dot = &contours[1];
        assert_eq!(dot.pixel_count, 1);
        assert_eq!(dot.area, 0.0);
    }

    #[test]
    fn hollow_shapes_keep_their_enclosed_area() {
        let m = mask_from_rows(&[
            "########",
            "#......#",
            "#......#",
            "#......#",
            "########",
        ]);
        let contours = find_contours(&m);
        assert_eq!(contours.len(), 1);
        // Outer boundary is 7x4 regardless of the hollow interior.
        assert!((contours[0].area - 28.0).abs() < 1e-3);
    }

    #[test]
    fn approx_poly_reduces_rectangle_to_four_corners() {
        let m = mask_from_rows(&[
            "............",
            ".##########.",
            ".##########.",
            ".##########.",
            ".##########.",
            "............",
        ]);
        let contours = find_contours(&m);
        let poly = approx_poly(&contours[0].boundary, 0.04 * contours[0].perimeter);
        assert_eq!(poly.len(), 4, "expected four corners, got {poly:?}");
    }
}
