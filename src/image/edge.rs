//! Edge-texture transform used to suppress background color drift.
//!
//! The transform is a 3x3 Laplacian `[0 1 0; 1 -4 1; 0 1 0]` over the luma
//! plane with reflect-101 borders (`dcb|abcd|cba`). Responses are saturated
//! to `u8`, so negative responses become 0.

use crate::image::{ColorImage, OwnedImage};

/// Computes the edge texture of a color image.
pub fn edge_texture(img: &ColorImage) -> OwnedImage {
    laplacian_u8(&img.to_gray())
}

/// Applies the saturating 3x3 Laplacian to a single plane.
pub fn laplacian_u8(src: &OwnedImage) -> OwnedImage {
    let width = src.width();
    let height = src.height();
    let mut out = src.clone();
    let dst = out.data_mut();

    for y in 0..height {
        let up = reflect101(y as isize - 1, height);
        let down = reflect101(y as isize + 1, height);
        for x in 0..width {
            let left = reflect101(x as isize - 1, width);
            let right = reflect101(x as isize + 1, width);
            let response = src.at(x, up) as i32
                + src.at(x, down) as i32
                + src.at(left, y) as i32
                + src.at(right, y) as i32
                - 4 * src.at(x, y) as i32;
            dst[y * width + x] = response.clamp(0, 255) as u8;
        }
    }

    out
}

fn reflect101(i: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let last = len as isize - 1;
    let mut i = i;
    if i < 0 {
        i = -i;
    }
    if i > last {
        i = 2 * last - i;
    }
    i as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_plane_has_no_edges() {
        let src = OwnedImage::filled(5, 4, 90).unwrap();
        assert!(laplacian_u8(&src).data().iter().all(|&v| v == 0));
    }

    #[test]
    fn dark_dot_on_bright_field_saturates() {
        let mut data = vec![200u8; 9];
        data[4] = 0;
        let src = OwnedImage::new(data, 3, 3).unwrap();
        let out = laplacian_u8(&src);
        // Center: 4 * 200 - 0 exceeds u8; neighbours see a negative response.
        assert_eq!(out.at(1, 1), 255);
        assert_eq!(out.at(1, 0), 0);
    }

    #[test]
    fn reflect101_mirrors_without_repeating_the_edge() {
        assert_eq!(reflect101(-1, 4), 1);
        assert_eq!(reflect101(4, 4), 2);
        assert_eq!(reflect101(-1, 1), 0);
    }
}
