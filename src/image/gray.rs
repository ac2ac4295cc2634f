use super::rgb::RgbImage;

/// Owned 8-bit grayscale plane derived from an RGB image or view.
#[derive(Clone, Debug)]
pub struct GrayImage {
    pub w: usize,
    pub h: usize,
    pub data: Vec<u8>,
}

impl GrayImage {
    pub fn new(w: usize, h: usize) -> Self {
        Self {
            w,
            h,
            data: vec![0u8; w * h],
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.w + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: u8) {
        self.data[y * self.w + x] = v;
    }

    /// Mean over a clamped sub-rectangle; `None` when it is empty.
    pub fn region_mean(&self, x: i64, y: i64, w: i64, h: i64) -> Option<f32> {
        let x0 = x.max(0) as usize;
        let y0 = y.max(0) as usize;
        let x1 = ((x + w).min(self.w as i64)).max(0) as usize;
        let y1 = ((y + h).min(self.h as i64)).max(0) as usize;
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        let mut sum = 0u64;
        for yy in y0..y1 {
            for xx in x0..x1 {
                sum += self.get(xx, yy) as u64;
            }
        }
        Some(sum as f32 / ((x1 - x0) * (y1 - y0)) as f32)
    }

    /// 3x3 binomial blur, edge-replicated. Used before binarization to
    /// suppress sensor noise without eating thin grid lines.
    pub fn blur3(&self) -> GrayImage {
        let mut out = GrayImage::new(self.w, self.h);
        if self.w == 0 || self.h == 0 {
            return out;
        }
        const K: [[u16; 3]; 3] = [[1, 2, 1], [2, 4, 2], [1, 2, 1]];
        for y in 0..self.h {
            let ys = [y.saturating_sub(1), y, (y + 1).min(self.h - 1)];
            for x in 0..self.w {
                let xs = [x.saturating_sub(1), x, (x + 1).min(self.w - 1)];
                let mut acc = 0u16;
                for (ky, &yy) in ys.iter().enumerate() {
                    for (kx, &xx) in xs.iter().enumerate() {
                        acc += K[ky][kx] * self.get(xx, yy) as u16;
                    }
                }
                out.set(x, y, (acc / 16) as u8);
            }
        }
        out
    }
}

const LUMA_R: f32 = 0.299;
const LUMA_G: f32 = 0.587;
const LUMA_B: f32 = 0.114;

/// BT.601 luma conversion of a full RGB image.
pub fn luma_of(image: &RgbImage) -> GrayImage {
    let mut out = GrayImage::new(image.width(), image.height());
    for y in 0..image.height() {
        for x in 0..image.width() {
            let [r, g, b] = image.get(x, y);
            let l = LUMA_R * r as f32 + LUMA_G * g as f32 + LUMA_B * b as f32;
            out.set(x, y, l.round().clamp(0.0, 255.0) as u8);
        }
    }
    out
}
