//! Face alignment via 4-DOF similarity transform.
//!
//! Warps a detected face onto the canonical five-point landmark template,
//! producing the fixed 160×160 RGB crop that is both fed to the recognizer
//! and persisted next to the source image.

use image::RgbImage;

/// Side length of the aligned face crop.
pub const CROP_SIZE: u32 = 160;

/// Five-point landmark template for the 160×160 crop: the standard ArcFace
/// 112-pixel template scaled by 160/112.
const REFERENCE_LANDMARKS: [(f32, f32); 5] = [
    (54.7066, 73.8519),   // left eye
    (105.0454, 73.5734),  // right eye
    (80.0360, 102.4809),  // nose
    (59.3561, 131.9507),  // left mouth
    (101.0427, 131.7201), // right mouth
];

/// Align a detected face to the canonical [`CROP_SIZE`] crop.
///
/// Estimates the similarity transform from the detected landmarks to the
/// reference template and warps the face region with bilinear interpolation.
pub fn align_face(image: &RgbImage, landmarks: &[(f32, f32); 5]) -> RgbImage {
    let matrix = estimate_similarity_transform(landmarks, &REFERENCE_LANDMARKS);
    warp_affine(image, &matrix, CROP_SIZE)
}

/// Estimate a 2×3 similarity transform (4-DOF: scale, rotation, translation)
/// from `src` landmarks to `dst` landmarks using least-squares.
///
/// Returns [a, -b, tx, b, a, ty] representing the matrix:
/// ```text
/// | a  -b  tx |
/// | b   a  ty |
/// ```
fn estimate_similarity_transform(src: &[(f32, f32); 5], dst: &[(f32, f32); 5]) -> [f32; 6] {
    // Overdetermined system A * [a, b, tx, ty]^T = B, two rows per point pair:
    //   sx * a - sy * b + tx = dx
    //   sy * a + sx * b + ty = dy
    // Accumulate the normal equations (A^T A) x = A^T B directly.
    let mut ata = [[0.0f32; 4]; 4];
    let mut atb = [0.0f32; 4];

    for i in 0..5 {
        let (sx, sy) = src[i];
        let (dx, dy) = dst[i];
        let rows = [([sx, -sy, 1.0, 0.0], dx), ([sy, sx, 0.0, 1.0], dy)];

        for (row, rhs) in rows {
            for j in 0..4 {
                for (k, &rk) in row.iter().enumerate() {
                    ata[j][k] += row[j] * rk;
                }
                atb[j] += row[j] * rhs;
            }
        }
    }

    let x = solve_4x4(&ata, &atb);
    let (a, b, tx, ty) = (x[0], x[1], x[2], x[3]);
    [a, -b, tx, b, a, ty]
}

/// Solve a 4×4 linear system via Gaussian elimination with partial pivoting.
fn solve_4x4(ata: &[[f32; 4]; 4], atb: &[f32; 4]) -> [f32; 4] {
    // Augmented matrix [A | b]
    let mut m = [[0.0f32; 5]; 4];
    for (i, row) in ata.iter().enumerate() {
        m[i][..4].copy_from_slice(row);
        m[i][4] = atb[i];
    }

    for col in 0..4 {
        let pivot_row = (col..4)
            .max_by(|&a, &b| {
                m[a][col]
                    .abs()
                    .partial_cmp(&m[b][col].abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(col);
        m.swap(col, pivot_row);

        let pivot = m[col][col];
        if pivot.abs() < 1e-12 {
            // Degenerate landmark geometry; identity-ish fallback.
            return [1.0, 0.0, 0.0, 0.0];
        }

        for row in (col + 1)..4 {
            let factor = m[row][col] / pivot;
            for j in col..5 {
                m[row][j] -= factor * m[col][j];
            }
        }
    }

    let mut x = [0.0f32; 4];
    for i in (0..4).rev() {
        x[i] = m[i][4];
        for j in (i + 1)..4 {
            x[i] -= m[i][j] * x[j];
        }
        x[i] /= m[i][i];
    }
    x
}

/// Apply a 2×3 similarity warp, producing a square RGB output.
///
/// Samples with bilinear interpolation; out-of-bounds pixels are black.
fn warp_affine(image: &RgbImage, matrix: &[f32; 6], out_size: u32) -> RgbImage {
    let (a, tx) = (matrix[0], matrix[2]);
    let (b, ty) = (matrix[3], matrix[5]);
    let (src_w, src_h) = image.dimensions();

    // Invert the 2x2 part: M = [[a, -b], [b, a]], det = a^2 + b^2
    let det = a * a + b * b;
    if det.abs() < 1e-12 {
        return RgbImage::new(out_size, out_size);
    }
    let ia = a / det;
    let ib = b / det;

    let sample = |x: i32, y: i32, c: usize| -> f32 {
        if x >= 0 && (x as u32) < src_w && y >= 0 && (y as u32) < src_h {
            image.get_pixel(x as u32, y as u32).0[c] as f32
        } else {
            0.0
        }
    };

    let mut output = RgbImage::new(out_size, out_size);
    for (ox, oy, pixel) in output.enumerate_pixels_mut() {
        // Map output pixel back to source: src = M_inv * (dst - t)
        let dx = ox as f32 - tx;
        let dy = oy as f32 - ty;
        let sx = ia * dx + ib * dy;
        let sy = -ib * dx + ia * dy;

        let x0 = sx.floor() as i32;
        let y0 = sy.floor() as i32;
        let fx = sx - x0 as f32;
        let fy = sy - y0 as f32;

        for c in 0..3 {
            let val = sample(x0, y0, c) * (1.0 - fx) * (1.0 - fy)
                + sample(x0 + 1, y0, c) * fx * (1.0 - fy)
                + sample(x0, y0 + 1, c) * (1.0 - fx) * fy
                + sample(x0 + 1, y0 + 1, c) * fx * fy;
            pixel.0[c] = val.round().clamp(0.0, 255.0) as u8;
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_transform() {
        // src == dst: a ≈ 1, b ≈ 0, translation ≈ 0
        let pts = REFERENCE_LANDMARKS;
        let m = estimate_similarity_transform(&pts, &pts);
        assert!((m[0] - 1.0).abs() < 1e-4, "a = {}", m[0]);
        assert!(m[1].abs() < 1e-4, "-b = {}", m[1]);
        assert!(m[2].abs() < 1e-2, "tx = {}", m[2]);
        assert!(m[3].abs() < 1e-4, "b = {}", m[3]);
        assert!((m[4] - 1.0).abs() < 1e-4, "a2 = {}", m[4]);
        assert!(m[5].abs() < 1e-2, "ty = {}", m[5]);
    }

    #[test]
    fn test_scaled_transform() {
        // Source landmarks at 2x the template scale → a ≈ 0.5.
        let src: [(f32, f32); 5] = std::array::from_fn(|i| {
            let (x, y) = REFERENCE_LANDMARKS[i];
            (x * 2.0, y * 2.0)
        });
        let m = estimate_similarity_transform(&src, &REFERENCE_LANDMARKS);
        assert!((m[0] - 0.5).abs() < 0.05, "a = {}, expected ~0.5", m[0]);
    }

    #[test]
    fn test_warp_output_size() {
        let image = RgbImage::from_pixel(640, 480, image::Rgb([128, 128, 128]));
        let identity = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let out = warp_affine(&image, &identity, CROP_SIZE);
        assert_eq!(out.dimensions(), (CROP_SIZE, CROP_SIZE));
    }

    #[test]
    fn test_align_face_output_size() {
        let image = RgbImage::from_pixel(640, 480, image::Rgb([90, 90, 90]));
        let aligned = align_face(&image, &REFERENCE_LANDMARKS);
        assert_eq!(aligned.dimensions(), (CROP_SIZE, CROP_SIZE));
    }

    #[test]
    fn test_warp_preserves_channels_independently() {
        let image = RgbImage::from_pixel(320, 240, image::Rgb([200, 100, 50]));
        let identity = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let out = warp_affine(&image, &identity, 64);
        assert_eq!(out.get_pixel(10, 10).0, [200, 100, 50]);
    }

    #[test]
    fn test_landmark_roundtrip() {
        // A bright patch painted at a source landmark must land near the
        // template position after alignment.
        let mut image = RgbImage::new(300, 300);
        let src_landmarks: [(f32, f32); 5] = [
            (110.0, 90.0),
            (170.0, 90.0),
            (140.0, 125.0),
            (115.0, 160.0),
            (165.0, 160.0),
        ];

        let (lx, ly) = (src_landmarks[0].0 as u32, src_landmarks[0].1 as u32);
        for dy in 0..5 {
            for dx in 0..5 {
                let px = lx + dx - 2;
                let py = ly + dy - 2;
                image.put_pixel(px, py, image::Rgb([255, 255, 255]));
            }
        }

        let aligned = align_face(&image, &src_landmarks);

        let ref_x = REFERENCE_LANDMARKS[0].0.round() as u32;
        let ref_y = REFERENCE_LANDMARKS[0].1.round() as u32;
        let mut max_val = 0u8;
        for dy in 0..3 {
            for dx in 0..3 {
                let x = (ref_x + dx).saturating_sub(1);
                let y = (ref_y + dy).saturating_sub(1);
                if x < CROP_SIZE && y < CROP_SIZE {
                    max_val = max_val.max(aligned.get_pixel(x, y).0[0]);
                }
            }
        }
        assert!(
            max_val > 100,
            "expected bright patch near template left eye ({ref_x}, {ref_y}), max={max_val}"
        );
    }
}
