//! Variable Number of Gradients refinement.

use crate::image_pipeline::common::error::{Result, try_alloc};
use crate::image_pipeline::raw::{CfaPattern, RawImage};

/// Sample pairs contributing to the gradients: `(y1, x1, y2, x2, weight shift,
/// direction mask)`. The masks number directions clockwise from north-west;
/// [`build_codes`] rotates them onto the north-first order of [`NEIGHBOURS`].
#[rustfmt::skip]
const TERMS: [(i8, i8, i8, i8, u8, u8); 64] = [
    (-2,-2,0,-1,0,0x01), (-2,-2,0,0,1,0x01), (-2,-1,-1,0,0,0x01),
    (-2,-1,0,-1,0,0x02), (-2,-1,0,0,0,0x03), (-2,-1,0,1,1,0x01),
    (-2,0,0,-1,0,0x06),  (-2,0,0,0,1,0x02),  (-2,0,0,1,0,0x03),
    (-2,1,-1,0,0,0x04),  (-2,1,0,-1,1,0x04), (-2,1,0,0,0,0x06),
    (-2,1,0,1,0,0x02),   (-2,2,0,0,1,0x04),  (-2,2,0,1,0,0x04),
    (-1,-2,-1,0,0,0x80), (-1,-2,0,-1,0,0x01), (-1,-2,1,-1,0,0x01),
    (-1,-2,1,0,1,0x01),  (-1,-1,-1,1,0,0x88), (-1,-1,1,-2,0,0x40),
    (-1,-1,1,-1,0,0x22), (-1,-1,1,0,0,0x33),  (-1,-1,1,1,1,0x11),
    (-1,0,-1,2,0,0x08),  (-1,0,0,-1,0,0x44),  (-1,0,0,1,0,0x11),
    (-1,0,1,-2,1,0x40),  (-1,0,1,-1,0,0x66),  (-1,0,1,0,1,0x22),
    (-1,0,1,1,0,0x33),   (-1,0,1,2,1,0x10),   (-1,1,1,-1,1,0x44),
    (-1,1,1,0,0,0x66),   (-1,1,1,1,0,0x22),   (-1,1,1,2,0,0x10),
    (-1,2,0,1,0,0x04),   (-1,2,1,0,1,0x04),   (-1,2,1,1,0,0x04),
    (0,-2,0,0,1,0x80),   (0,-1,0,1,1,0x88),   (0,-1,1,-2,0,0x40),
    (0,-1,1,0,0,0x11),   (0,-1,2,-2,0,0x40),  (0,-1,2,-1,0,0x20),
    (0,-1,2,0,0,0x30),   (0,-1,2,1,1,0x10),   (0,0,0,2,1,0x08),
    (0,0,2,-2,1,0x40),   (0,0,2,-1,0,0x60),   (0,0,2,0,1,0x20),
    (0,0,2,1,0,0x30),    (0,0,2,2,1,0x10),    (0,1,1,0,0,0x44),
    (0,1,1,2,0,0x10),    (0,1,2,-1,1,0x40),   (0,1,2,0,0,0x60),
    (0,1,2,1,0,0x20),    (0,1,2,2,0,0x10),    (1,-2,1,0,0,0x80),
    (1,-1,1,1,0,0x88),   (1,0,1,2,0,0x08),    (1,0,2,-1,0,0x40),
    (1,0,2,1,0,0x10),
];

/// The eight gradient directions, clockwise from north.
const NEIGHBOURS: [(isize, isize); 8] = [
    (-1, 0), (-1, 1), (0, 1), (1, 1), (1, 0), (1, -1), (0, -1), (-1, -1),
];

#[derive(Debug, Clone, Copy)]
struct GradientTerm {
    a: isize,
    b: isize,
    color: usize,
    shift: u32,
    directions: u8,
}

#[derive(Debug, Clone, Copy, Default)]
struct Neighbour {
    offset: isize,
    /// Same-color site two steps out, used when the adjacent site has
    /// another color.
    far: Option<isize>,
}

#[derive(Debug, Clone, Default)]
struct VngCode {
    terms: Vec<GradientTerm>,
    neighbours: [Neighbour; 8],
}

fn build_codes(cfa: CfaPattern, width: usize) -> Vec<VngCode> {
    let w = width as isize;
    let mut codes = Vec::with_capacity(16);
    for row in 0..8 {
        for col in 0..2 {
            let mut code = VngCode::default();
            for &(y1, x1, y2, x2, weight, directions) in &TERMS {
                let (y1, x1, y2, x2) = (y1 as isize, x1 as isize, y2 as isize, x2 as isize);
                let color = cfa.color_at_offset(row, col, y1, x1);
                if cfa.color_at_offset(row, col, y2, x2) != color {
                    continue;
                }
                let diag = if cfa.color_at(row, col + 1) == color && cfa.color_at(row + 1, col) == color {
                    2
                } else {
                    1
                };
                if (y1 - y2).abs() == diag && (x1 - x2).abs() == diag {
                    continue;
                }
                code.terms.push(GradientTerm {
                    a: y1 * w + x1,
                    b: y2 * w + x2,
                    color,
                    shift: weight as u32,
                    directions: directions.rotate_right(1),
                });
            }
            let native = cfa.color_at(row, col);
            for (slot, &(y, x)) in code.neighbours.iter_mut().zip(&NEIGHBOURS) {
                let far = cfa.color_at_offset(row, col, y, x) != native
                    && cfa.color_at_offset(row, col, 2 * y, 2 * x) == native;
                *slot = Neighbour {
                    offset: y * w + x,
                    far: far.then_some(2 * (y * w + x)),
                };
            }
            codes.push(code);
        }
    }
    codes
}

#[inline(always)]
fn at(idx: usize, offset: isize) -> usize {
    (idx as isize + offset) as usize
}

/// Refines a bilinear-seeded image in place.
///
/// For every pixel at least 2 away from the edge, eight directional gradients
/// are summed from the precomputed sample pairs. Directions whose gradient is
/// within `min + (max - min) / 2` contribute their neighbour; the native
/// sample is kept and each other channel becomes the native sample plus the
/// mean cross-channel difference of the contributing neighbours, clipped to
/// `[0, clip_max]`. A neighbourhood with all gradients zero keeps its seeded
/// value. The native channel keeps the recorded sample rather than the
/// neighbourhood's same-channel average, so measured data passes through
/// demosaicing unchanged.
///
/// Results go through a three-row ring and are written back two rows behind
/// the row being computed, which is the nearest row no later pixel reads.
pub fn vng_refine(image: &mut RawImage, clip_max: u16) -> Result<()> {
    let (width, height, colors) = (image.width, image.height, image.colors);
    if width < 5 || height < 5 {
        return Ok(());
    }
    let codes = build_codes(image.cfa, width);
    let mut ring: Vec<[u16; 4]> = try_alloc(width * 3, "vng", "row ring", width, height)?;
    let clip_max = clip_max as i32;
    let cfa = image.cfa;
    let pixels = &mut image.pixels;

    let flush = |pixels: &mut Vec<[u16; 4]>, ring: &[[u16; 4]], row: usize| {
        let slot = &ring[(row % 3) * width..(row % 3 + 1) * width];
        pixels[row * width + 2..(row + 1) * width - 2].copy_from_slice(&slot[2..width - 2]);
    };

    let last = height - 2;
    for row in 2..last {
        let slot = (row % 3) * width;
        for col in 2..width - 2 {
            let idx = row * width + col;
            let code = &codes[(row & 7) * 2 + (col & 1)];

            let mut gval = [0i32; 8];
            for term in &code.terms {
                let diff = (pixels[at(idx, term.a)][term.color] as i32
                    - pixels[at(idx, term.b)][term.color] as i32)
                    .abs()
                    << term.shift;
                for (g, value) in gval.iter_mut().enumerate() {
                    if term.directions & (1 << g) != 0 {
                        *value += diff;
                    }
                }
            }
            let gmin = *gval.iter().min().unwrap_or(&0);
            let gmax = *gval.iter().max().unwrap_or(&0);
            let pix = pixels[idx];
            if gmax == 0 {
                ring[slot + col] = pix;
                continue;
            }
            let threshold = gmin + (gmax - gmin) / 2;

            let color = cfa.color_at(row, col);
            let mut sum = [0i32; 4];
            let mut num = 0i32;
            for (g, neighbour) in code.neighbours.iter().enumerate() {
                if gval[g] > threshold {
                    continue;
                }
                let npix = &pixels[at(idx, neighbour.offset)];
                for c in 0..colors {
                    sum[c] += match neighbour.far {
                        Some(far) if c == color => (pix[c] as i32 + pixels[at(idx, far)][c] as i32) >> 1,
                        _ => npix[c] as i32,
                    };
                }
                num += 1;
            }

            let out = &mut ring[slot + col];
            for c in 0..colors {
                let mut t = pix[color] as i32;
                if c != color {
                    t = (t + (sum[c] - sum[color]) / num).clamp(0, clip_max);
                }
                out[c] = t as u16;
            }
        }
        if row >= 4 {
            flush(pixels, &ring, row - 2);
        }
    }
    for row in last.saturating_sub(2).max(2)..last {
        flush(pixels, &ring, row);
    }
    Ok(())
}
