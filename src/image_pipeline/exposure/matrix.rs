//! Camera color matrices.

/// Linear sRGB (D65) to CIE XYZ.
pub const SRGB_TO_XYZ: [[f64; 3]; 3] = [
    [0.412453, 0.357580, 0.180423],
    [0.212671, 0.715160, 0.072169],
    [0.019334, 0.119193, 0.950227],
];

pub(crate) fn invert3(m: &[[f64; 3]; 3]) -> Option<[[f64; 3]; 3]> {
    let det = m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0]);
    if det.abs() < 1e-12 {
        return None;
    }
    let mut out = [[0f64; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            let (r0, r1) = ((j + 1) % 3, (j + 2) % 3);
            let (c0, c1) = ((i + 1) % 3, (i + 2) % 3);
            out[i][j] = (m[r0][c0] * m[r1][c1] - m[r0][c1] * m[r1][c0]) / det;
        }
    }
    Some(out)
}

/// Camera-to-RGB matrix (3 rows, one column per sensor channel) from an
/// XYZ-to-camera matrix with one row per sensor channel.
///
/// The XYZ matrix is first taken to sRGB primaries and each row is scaled
/// to sum to 1, so a white RGB input gives every channel the same response.
/// The result is the left pseudo-inverse of that camera-from-RGB matrix.
/// Returns `None` for fewer than three channels, a row summing to zero
/// (rawloader leaves unknown cameras all zero) or a singular matrix.
pub fn camera_to_rgb(xyz_to_cam: &[[f32; 3]; 4], colors: usize) -> Option<[[f32; 4]; 3]> {
    if !(3..=4).contains(&colors) {
        return None;
    }
    let mut cam_rgb = [[0f64; 3]; 4];
    for (i, row) in cam_rgb.iter_mut().enumerate().take(colors) {
        for (j, value) in row.iter_mut().enumerate() {
            *value = (0..3).map(|k| xyz_to_cam[i][k] as f64 * SRGB_TO_XYZ[k][j]).sum();
        }
        let num: f64 = row.iter().sum();
        if !(num.is_finite() && num.abs() > 1e-9) {
            return None;
        }
        for value in row.iter_mut() {
            *value /= num;
        }
    }

    // (C^T C)^-1 C^T
    let mut gram = [[0f64; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            gram[i][j] = (0..colors).map(|k| cam_rgb[k][i] * cam_rgb[k][j]).sum();
        }
    }
    let inverse = invert3(&gram)?;
    let mut rgb_cam = [[0f32; 4]; 3];
    for i in 0..3 {
        for j in 0..colors {
            rgb_cam[i][j] = (0..3).map(|k| inverse[i][k] * cam_rgb[j][k]).sum::<f64>() as f32;
        }
    }
    Some(rgb_cam)
}
