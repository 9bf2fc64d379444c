//! Adam7 pass geometry.

pub const ADAM7_PASSES: u8 = 7;

const ADAM7_COL_START: [usize; 7] = [0, 4, 0, 2, 0, 1, 0];
const ADAM7_ROW_START: [usize; 7] = [0, 0, 4, 0, 2, 0, 1];
const ADAM7_COL_DELTA: [usize; 7] = [8, 8, 4, 4, 2, 2, 1];
const ADAM7_ROW_DELTA: [usize; 7] = [8, 8, 8, 4, 4, 2, 2];

/// Width and height of a reduced image, zero when the pass is empty.
pub fn pass_dimensions(pass: u8, width: u32, height: u32) -> (usize, usize) {
    let p = pass as usize;
    let (width, height) = (width as usize, height as usize);

    let pass_width = (width + ADAM7_COL_DELTA[p] - 1).saturating_sub(ADAM7_COL_START[p]) / ADAM7_COL_DELTA[p];
    let pass_height = (height + ADAM7_ROW_DELTA[p] - 1).saturating_sub(ADAM7_ROW_START[p]) / ADAM7_ROW_DELTA[p];

    (pass_width, pass_height)
}

/// Image row that the `row_in_pass`th row of `pass` lands on.
pub fn image_row(pass: u8, row_in_pass: usize) -> usize {
    ADAM7_ROW_START[pass as usize] + row_in_pass * ADAM7_ROW_DELTA[pass as usize]
}

/// Last (pass, image row) emitted for rows inside `first..=last`, in emission order.
pub fn final_pass_row(width: u32, height: u32, first: u32, last: u32) -> Option<(u8, u32)> {
    for pass in (0..ADAM7_PASSES).rev() {
        let (pass_width, pass_height) = pass_dimensions(pass, width, height);
        if pass_width == 0 || pass_height == 0 {
            continue;
        }

        let start = ADAM7_ROW_START[pass as usize] as u32;
        let delta = ADAM7_ROW_DELTA[pass as usize] as u32;
        let last_in_pass = start + (pass_height as u32 - 1) * delta;
        let upper = last.min(last_in_pass);

        if upper < start || upper < first {
            continue;
        }

        let row = start + (upper - start) / delta * delta;
        if row >= first {
            return Some((pass, row));
        }
    }

    None
}

/// Scatters one reduced-image row into its full-width row buffer.
///
/// `src` holds `pass_width` packed pixels of `bits_per_pixel`; `dst` is a full packed image row.
pub fn combine_row(pass: u8, bits_per_pixel: usize, width: u32, src: &[u8], dst: &mut [u8]) {
    let p = pass as usize;
    let width = width as usize;

    if bits_per_pixel < 8 {
        let pixels_per_byte = 8 / bits_per_pixel;
        let bit_mask = ((1u16 << bits_per_pixel) - 1) as u8;
        let mut col = 0;

        loop {
            let out_x = ADAM7_COL_START[p] + col * ADAM7_COL_DELTA[p];
            if out_x >= width {
                break;
            }

            let in_byte_idx = col / pixels_per_byte;
            let out_byte_idx = out_x / pixels_per_byte;
            let (Some(&in_byte), true) = (src.get(in_byte_idx), out_byte_idx < dst.len()) else {
                break;
            };

            let in_shift = (pixels_per_byte - 1 - (col % pixels_per_byte)) * bits_per_pixel;
            let out_shift = (pixels_per_byte - 1 - (out_x % pixels_per_byte)) * bits_per_pixel;
            let pixel = (in_byte >> in_shift) & bit_mask;

            dst[out_byte_idx] &= !(bit_mask << out_shift);
            dst[out_byte_idx] |= pixel << out_shift;
            col += 1;
        }
    } else {
        let bytes_per_pixel = bits_per_pixel / 8;

        for (col, pixel) in src.chunks_exact(bytes_per_pixel).enumerate() {
            let out_x = ADAM7_COL_START[p] + col * ADAM7_COL_DELTA[p];
            if out_x >= width {
                break;
            }

            let out_pos = out_x * bytes_per_pixel;
            match dst.get_mut(out_pos..out_pos + bytes_per_pixel) {
                Some(target) => target.copy_from_slice(pixel),
                None => break,
            }
        }
    }
}
