use crate::log_warn;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterType {
    None,
    Sub,
    Up,
    Average,
    Paeth,
}

impl FilterType {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0 => FilterType::None,
            1 => FilterType::Sub,
            2 => FilterType::Up,
            3 => FilterType::Average,
            4 => FilterType::Paeth,
            _ => {
                log_warn!("Invalid filter type: {}", byte);
                FilterType::None
            }
        }
    }
}

/// Reverses the scanline filter in place. `prior` is the previous unfiltered row of the same pass
/// (all zeros for the first row) and must be at least as long as `row`.
pub fn unfilter_row(filter: FilterType, bytes_per_pixel: usize, prior: &[u8], row: &mut [u8]) {
    if prior.len() < row.len() {
        log_warn!("Prior scanline shorter than current: {} < {}", prior.len(), row.len());
        return;
    }

    let bpp = bytes_per_pixel.min(row.len());

    match filter {
        FilterType::None => {}
        FilterType::Sub => {
            for i in bpp..row.len() {
                row[i] = row[i].wrapping_add(row[i - bpp]);
            }
        }
        FilterType::Up => {
            for (value, above) in row.iter_mut().zip(prior) {
                *value = value.wrapping_add(*above);
            }
        }
        FilterType::Average => {
            for i in 0..bpp {
                row[i] = row[i].wrapping_add(prior[i] >> 1);
            }

            for i in bpp..row.len() {
                let left = row[i - bpp] as u16;
                let above = prior[i] as u16;
                row[i] = row[i].wrapping_add(((left + above) >> 1) as u8);
            }
        }
        FilterType::Paeth => {
            for i in 0..bpp {
                row[i] = row[i].wrapping_add(prior[i]);
            }

            for i in bpp..row.len() {
                let predicted = paeth_predictor(row[i - bpp], prior[i], prior[i - bpp]);
                row[i] = row[i].wrapping_add(predicted);
            }
        }
    }
}

fn paeth_predictor(a: u8, b: u8, c: u8) -> u8 {
    // a = left, b = above, c = upper left
    let a = a as i16;
    let b = b as i16;
    let c = c as i16;

    let p = a + b - c;
    let pa = (p - a).abs();
    let pb = (p - b).abs();
    let pc = (p - c).abs();

    if pa <= pb && pa <= pc {
        a as u8
    } else if pb <= pc {
        b as u8
    } else {
        c as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_accumulates_left_neighbours() {
        let prior = [0u8; 6];
        let mut row = [1, 2, 3, 1, 1, 1];
        unfilter_row(FilterType::Sub, 3, &prior, &mut row);
        assert_eq!(row, [1, 2, 3, 2, 3, 4]);
    }

    #[test]
    fn up_and_average_use_prior_row() {
        let prior = [10u8, 20, 30, 40];
        let mut row = [1u8, 1, 1, 1];
        unfilter_row(FilterType::Up, 1, &prior, &mut row);
        assert_eq!(row, [11, 21, 31, 41]);

        let mut row = [0u8, 0, 0, 0];
        unfilter_row(FilterType::Average, 1, &prior, &mut row);
        // (left + above) / 2, left starting at the reconstructed first byte
        assert_eq!(row, [5, 12, 21, 30]);
    }

    #[test]
    fn paeth_picks_closest_neighbour() {
        assert_eq!(paeth_predictor(10, 20, 10), 20);
        assert_eq!(paeth_predictor(20, 10, 10), 20);
        assert_eq!(paeth_predictor(5, 5, 5), 5);
    }
}
