use image::RgbImage;
use rand::Rng;

/// Random affine augmentation applied to training images only.
///
/// Each call draws a rotation, shift, shear and per-axis zoom, maps every
/// output pixel back into the source around the image centre, and fills
/// out-of-bounds samples from the nearest edge pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct RandomAffine {
    pub rotation_range: f32,
    pub width_shift_range: f32,
    pub height_shift_range: f32,
    pub shear_range: f32,
    pub zoom_range: f32,
    pub horizontal_flip: bool,
}

/// Output-to-input mapping `src = m * (dst - centre) + centre + shift`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineParams {
    pub theta: f32,
    pub shear: f32,
    pub zoom_x: f32,
    pub zoom_y: f32,
    pub shift_x: f32,
    pub shift_y: f32,
    pub flip: bool,
}

impl AffineParams {
    pub const IDENTITY: AffineParams = AffineParams {
        theta: 0.0,
        shear: 0.0,
        zoom_x: 1.0,
        zoom_y: 1.0,
        shift_x: 0.0,
        shift_y: 0.0,
        flip: false,
    };

    fn matrix(&self) -> [[f32; 2]; 2] {
        let (sin_t, cos_t) = self.theta.sin_cos();
        let (sin_s, cos_s) = self.shear.sin_cos();
        // rotation * shear * zoom
        let rotation = [[cos_t, -sin_t], [sin_t, cos_t]];
        let shear = [[1.0, -sin_s], [0.0, cos_s]];
        let zoom = [[self.zoom_x, 0.0], [0.0, self.zoom_y]];
        mul(mul(rotation, shear), zoom)
    }
}

fn mul(a: [[f32; 2]; 2], b: [[f32; 2]; 2]) -> [[f32; 2]; 2] {
    let mut out = [[0.0; 2]; 2];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = a[i][0] * b[0][j] + a[i][1] * b[1][j];
        }
    }
    out
}

impl RandomAffine {
    pub fn sample<R: Rng>(&self, width: u32, height: u32, rng: &mut R) -> AffineParams {
        AffineParams {
            theta: symmetric(rng, self.rotation_range).to_radians(),
            shear: symmetric(rng, self.shear_range).to_radians(),
            zoom_x: 1.0 + symmetric(rng, self.zoom_range),
            zoom_y: 1.0 + symmetric(rng, self.zoom_range),
            shift_x: symmetric(rng, self.width_shift_range) * width as f32,
            shift_y: symmetric(rng, self.height_shift_range) * height as f32,
            flip: self.horizontal_flip && rng.random_bool(0.5),
        }
    }

    pub fn apply<R: Rng>(&self, image: &RgbImage, rng: &mut R) -> RgbImage {
        let params = self.sample(image.width(), image.height(), rng);
        transform(image, &params)
    }
}

fn symmetric<R: Rng>(rng: &mut R, range: f32) -> f32 {
    if range <= 0.0 {
        0.0
    } else {
        rng.random_range(-range..=range)
    }
}

pub fn transform(image: &RgbImage, params: &AffineParams) -> RgbImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return image.clone();
    }
    let m = params.matrix();
    let cx = (width as f32 - 1.0) / 2.0;
    let cy = (height as f32 - 1.0) / 2.0;
    let max_x = (width - 1) as f32;
    let max_y = (height - 1) as f32;

    RgbImage::from_fn(width, height, |x, y| {
        let x = if params.flip { width - 1 - x } else { x };
        let dx = x as f32 - cx;
        let dy = y as f32 - cy;
        let sx = m[0][0] * dx + m[0][1] * dy + cx + params.shift_x;
        let sy = m[1][0] * dx + m[1][1] * dy + cy + params.shift_y;
        let sx = sx.round().clamp(0.0, max_x) as u32;
        let sy = sy.round().clamp(0.0, max_y) as u32;
        *image.get_pixel(sx, sy)
    })
}
