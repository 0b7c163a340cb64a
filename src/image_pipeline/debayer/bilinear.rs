use crate::image_pipeline::raw::{CfaPattern, RawImage};

/// One neighbour in the 3x3 window: pixel offset, weight shift, channel.
#[derive(Debug, Clone, Copy, Default)]
struct Tap {
    offset: isize,
    shift: u32,
    color: usize,
}

/// Precomputed taps for one (row mod 8, column parity) position.
#[derive(Debug, Clone, Default)]
struct BilinearCode {
    taps: [Tap; 8],
    /// Missing channel and the total weight of its taps.
    fills: Vec<(usize, u32)>,
}

fn build_codes(cfa: CfaPattern, colors: usize, width: usize) -> Vec<BilinearCode> {
    let mut codes = Vec::with_capacity(16);
    for row in 0..8 {
        for col in 0..2 {
            let mut code = BilinearCode::default();
            let mut weight = [0u32; 4];
            let mut n = 0;
            for y in -1isize..=1 {
                for x in -1isize..=1 {
                    // orthogonal neighbours count double, the centre is skipped
                    let shift = (y == 0) as u32 + (x == 0) as u32;
                    if shift == 2 {
                        continue;
                    }
                    let color = cfa.color_at_offset(row, col, y, x);
                    code.taps[n] = Tap {
                        offset: y * width as isize + x,
                        shift,
                        color,
                    };
                    n += 1;
                    weight[color] += 1 << shift;
                }
            }
            let native = cfa.color_at(row, col);
            code.fills = (0..colors)
                .filter(|&c| c != native && weight[c] > 0)
                .map(|c| (c, weight[c]))
                .collect();
            codes.push(code);
        }
    }
    codes
}

/// Fills every missing channel of the interior pixels with the weighted mean
/// of that channel's sites in the 3x3 window: diagonal neighbours weigh 1,
/// orthogonal ones 2. The outermost row and column are left untouched.
///
/// Only native samples are read and only missing channels written, so the
/// pass runs in place.
pub fn bilinear_seed(image: &mut RawImage) {
    let (width, height) = (image.width, image.height);
    if width < 3 || height < 3 {
        return;
    }
    let codes = build_codes(image.cfa, image.colors, width);
    let pixels = &mut image.pixels;
    for row in 1..height - 1 {
        for col in 1..width - 1 {
            let idx = row * width + col;
            let code = &codes[(row & 7) * 2 + (col & 1)];
            let mut sum = [0u32; 4];
            for tap in &code.taps {
                let neighbour = (idx as isize + tap.offset) as usize;
                sum[tap.color] += (pixels[neighbour][tap.color] as u32) << tap.shift;
            }
            for &(c, weight) in &code.fills {
                pixels[idx][c] = (sum[c] / weight) as u16;
            }
        }
    }
}
