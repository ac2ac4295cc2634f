/// Owned 8-bit RGB buffer, row-major, tightly packed (3 bytes per pixel).
///
/// The buffer is immutable during a scan; downstream stages read
/// sub-rectangles of it through [`RgbImage::view`].
#[derive(Clone, Debug)]
pub struct RgbImage {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl RgbImage {
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), width * height * 3);
        Self {
            width,
            height,
            data,
        }
    }

    /// Uniform fill, handy for synthetic test boards.
    pub fn filled(width: usize, height: usize, rgb: [u8; 3]) -> Self {
        let mut data = Vec::with_capacity(width * height * 3);
        for _ in 0..width * height {
            data.extend_from_slice(&rgb);
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> [u8; 3] {
        let i = (y * self.width + x) * 3;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, rgb: [u8; 3]) {
        let i = (y * self.width + x) * 3;
        self.data[i..i + 3].copy_from_slice(&rgb);
    }

    /// Borrow a sub-rectangle, clamped to the image bounds. Returns `None`
    /// when the clamped region is empty.
    pub fn view(&self, x: i64, y: i64, w: i64, h: i64) -> Option<RgbView<'_>> {
        let x0 = x.max(0) as usize;
        let y0 = y.max(0) as usize;
        let x1 = ((x + w).min(self.width as i64)).max(0) as usize;
        let y1 = ((y + h).min(self.height as i64)).max(0) as usize;
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(RgbView {
            image: self,
            x: x0,
            y: y0,
            w: x1 - x0,
            h: y1 - y0,
        })
    }

}

/// Borrowed read-only rectangle of an [`RgbImage`].
#[derive(Clone, Copy, Debug)]
pub struct RgbView<'a> {
    image: &'a RgbImage,
    x: usize,
    y: usize,
    w: usize,
    h: usize,
}

impl<'a> RgbView<'a> {
    pub fn width(&self) -> usize {
        self.w
    }

    pub fn height(&self) -> usize {
        self.h
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> [u8; 3] {
        debug_assert!(x < self.w && y < self.h);
        self.image.get(self.x + x, self.y + y)
    }

    /// Mean RGB over the view, as floats in [0, 255].
    pub fn mean_rgb(&self) -> [f32; 3] {
        let mut sums = [0u64; 3];
        for y in 0..self.h {
            for x in 0..self.w {
                let px = self.get(x, y);
                sums[0] += px[0] as u64;
                sums[1] += px[1] as u64;
                sums[2] += px[2] as u64;
            }
        }
        let n = (self.w * self.h) as f32;
        [
            sums[0] as f32 / n,
            sums[1] as f32 / n,
            sums[2] as f32 / n,
        ]
    }

    /// Copy the view into an owned image, e.g. to hand a cell to a recognizer.
    pub fn to_owned_image(&self) -> RgbImage {
        let mut data = Vec::with_capacity(self.w * self.h * 3);
        for y in 0..self.h {
            for x in 0..self.w {
                data.extend_from_slice(&self.get(x, y));
            }
        }
        RgbImage::new(self.w, self.h, data)
    }
}
