//! Grayscale building blocks for the preprocessing bank. Stock `imageproc`
//! filters are wrapped with the parameters the bank uses; the offset adaptive
//! mean threshold, CLAHE and the min-max stretch are implemented here.

use image::{GrayImage, ImageBuffer, Luma};
use imageproc::filter::{bilateral_filter, filter3x3};
use imageproc::integral_image::integral_image;
use imageproc::map::map_colors;
use imageproc::morphology::{grayscale_close, grayscale_open, Mask};

/// Two-level image: `> level` becomes white, the rest black.
pub fn binarize(gray: &GrayImage, level: u8) -> GrayImage {
    map_colors(gray, |p| Luma([if p[0] > level { 255 } else { 0 }]))
}

/// Binarize at the Otsu level of the image.
pub fn otsu_binarize(gray: &GrayImage) -> GrayImage {
    let level = imageproc::contrast::otsu_level(gray);
    binarize(gray, level)
}

/// Adaptive mean threshold: a pixel is white when it is brighter than the
/// mean of its `window`×`window` neighbourhood minus `offset`. The window is
/// clipped at the image border.
pub fn adaptive_mean_threshold(gray: &GrayImage, window: u32, offset: i32) -> GrayImage {
    let (w, h) = gray.dimensions();
    let radius = window / 2;
    // (w + 1) × (h + 1), zero first row and column.
    let table = integral_image::<_, u32>(gray);
    let at = |x: u32, y: u32| i64::from(table.get_pixel(x, y)[0]);

    ImageBuffer::from_fn(w, h, |x, y| {
        let x0 = x.saturating_sub(radius);
        let y0 = y.saturating_sub(radius);
        let x1 = (x + radius + 1).min(w);
        let y1 = (y + radius + 1).min(h);
        let sum = at(x1, y1) + at(x0, y0) - at(x1, y0) - at(x0, y1);
        let count = f64::from((x1 - x0) * (y1 - y0));
        let mean = sum as f64 / count;
        let p = f64::from(gray.get_pixel(x, y)[0]);
        Luma([if p > mean - f64::from(offset) { 255 } else { 0 }])
    })
}

/// Center 9, neighbours -1.
pub const SHARPEN_KERNEL: [i32; 9] = [-1, -1, -1, -1, 9, -1, -1, -1, -1];

/// 3×3 binomial approximation of a Gaussian with sigma ≈ 0.8.
#[rustfmt::skip]
pub const GAUSSIAN_3X3: [f32; 9] = [
    1.0 / 16.0, 2.0 / 16.0, 1.0 / 16.0,
    2.0 / 16.0, 4.0 / 16.0, 2.0 / 16.0,
    1.0 / 16.0, 2.0 / 16.0, 1.0 / 16.0,
];

/// Convolve with [`SHARPEN_KERNEL`], clamped to 0..=255.
pub fn sharpen(gray: &GrayImage) -> GrayImage {
    filter3x3::<_, i32, u8>(gray, &SHARPEN_KERNEL)
}

/// Blur with [`GAUSSIAN_3X3`]; an impulse spreads by at most one pixel.
pub fn gaussian_blur3x3(gray: &GrayImage) -> GrayImage {
    filter3x3::<_, f32, u8>(gray, &GAUSSIAN_3X3)
}

/// Edge-preserving smoothing over a `diameter`×`diameter` window.
pub fn bilateral(gray: &GrayImage, diameter: u32, sigma_color: f32, sigma_space: f32) -> GrayImage {
    bilateral_filter(gray, diameter, sigma_color, sigma_space)
}

/// Contrast-limited adaptive histogram equalization over a `grid`×`grid`
/// tiling, with bilinear interpolation between neighbouring tile mappings.
pub fn clahe(gray: &GrayImage, clip_limit: f64, grid: u32) -> GrayImage {
    let (w, h) = gray.dimensions();
    if w == 0 || h == 0 || grid == 0 {
        return gray.clone();
    }

    let tile_w = w.div_ceil(grid.min(w));
    let tile_h = h.div_ceil(grid.min(h));
    let tiles_x = w.div_ceil(tile_w);
    let tiles_y = h.div_ceil(tile_h);

    let mut luts = vec![[0u8; 256]; (tiles_x * tiles_y) as usize];
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let (x0, y0) = (tx * tile_w, ty * tile_h);
            let (x1, y1) = ((x0 + tile_w).min(w), (y0 + tile_h).min(h));
            let area = (x1 - x0) * (y1 - y0);

            let mut hist = [0u32; 256];
            for y in y0..y1 {
                for x in x0..x1 {
                    hist[gray.get_pixel(x, y)[0] as usize] += 1;
                }
            }

            let limit = ((clip_limit * f64::from(area) / 256.0) as u32).max(1);
            let mut excess = 0u32;
            for bin in hist.iter_mut() {
                if *bin > limit {
                    excess += *bin - limit;
                    *bin = limit;
                }
            }
            let (bonus, residual) = (excess / 256, excess % 256);
            for (i, bin) in hist.iter_mut().enumerate() {
                *bin += bonus + u32::from((i as u32) < residual);
            }

            let lut = &mut luts[(ty * tiles_x + tx) as usize];
            let mut cdf = 0u32;
            for (i, bin) in hist.iter().enumerate() {
                cdf += bin;
                lut[i] = (f64::from(cdf) * 255.0 / f64::from(area)).round().min(255.0) as u8;
            }
        }
    }

    let locate = |pos: u32, tile: u32, tiles: u32| -> (u32, u32, f64) {
        let f = (f64::from(pos) + 0.5) / f64::from(tile) - 0.5;
        let t0 = (f.floor().max(0.0) as u32).min(tiles - 1);
        let t1 = (t0 + 1).min(tiles - 1);
        (t0, t1, (f - f64::from(t0)).clamp(0.0, 1.0))
    };

    ImageBuffer::from_fn(w, h, |x, y| {
        let v = gray.get_pixel(x, y)[0] as usize;
        let (tx0, tx1, ax) = locate(x, tile_w, tiles_x);
        let (ty0, ty1, ay) = locate(y, tile_h, tiles_y);
        let at = |tx: u32, ty: u32| f64::from(luts[(ty * tiles_x + tx) as usize][v]);
        let top = at(tx0, ty0) * (1.0 - ax) + at(tx1, ty0) * ax;
        let bottom = at(tx0, ty1) * (1.0 - ax) + at(tx1, ty1) * ax;
        Luma([(top * (1.0 - ay) + bottom * ay).round().clamp(0.0, 255.0) as u8])
    })
}

/// Min–max stretch to the full 0..=255 range. Uniform images are returned as-is.
pub fn stretch_contrast(gray: &GrayImage) -> GrayImage {
    let (min_px, max_px) = gray
        .pixels()
        .fold((255u8, 0u8), |(mn, mx), p| (mn.min(p[0]), mx.max(p[0])));

    if max_px <= min_px {
        return gray.clone();
    }

    let range = u32::from(max_px - min_px);
    map_colors(gray, |p| Luma([(u32::from(p[0] - min_px) * 255 / range) as u8]))
}

/// Solid `kw`×`kh` structuring element anchored at its center.
fn rect_mask(kw: u32, kh: u32) -> Mask {
    let element = GrayImage::from_pixel(kw.max(1), kh.max(1), Luma([255]));
    Mask::from_image(&element, (kw / 2) as u8, (kh / 2) as u8)
}

/// Erode then dilate: removes bright specks smaller than the element.
pub fn open(img: &GrayImage, kw: u32, kh: u32) -> GrayImage {
    grayscale_open(img, &rect_mask(kw, kh))
}

/// Dilate then erode: bridges dark gaps narrower than the element.
pub fn close(img: &GrayImage, kw: u32, kh: u32) -> GrayImage {
    grayscale_close(img, &rect_mask(kw, kh))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(w: u32, h: u32, v: u8) -> GrayImage {
        ImageBuffer::from_pixel(w, h, Luma([v]))
    }

    fn is_binary(img: &GrayImage) -> bool {
        img.pixels().all(|p| p[0] == 0 || p[0] == 255)
    }

    #[test]
    fn binarize_is_strictly_greater() {
        let img: GrayImage = ImageBuffer::from_fn(3, 1, |x, _| Luma([[99u8, 100, 101][x as usize]]));
        let out = binarize(&img, 100);
        assert_eq!(out.as_raw(), &vec![0, 0, 255]);
    }

    #[test]
    fn otsu_separates_two_levels() {
        let img: GrayImage = ImageBuffer::from_fn(20, 10, |x, _| Luma([if x < 10 { 40 } else { 210 }]));
        let out = otsu_binarize(&img);
        assert_eq!(out.get_pixel(0, 0)[0], 0);
        assert_eq!(out.get_pixel(19, 0)[0], 255);
    }

    #[test]
    fn adaptive_threshold_follows_local_mean() {
        // Dark stroke on a left-to-right lighting gradient.
        let img: GrayImage = ImageBuffer::from_fn(40, 20, |x, y| {
            let base = 80 + (x * 4) as u8;
            Luma([if y == 10 { base / 3 } else { base }])
        });
        let out = adaptive_mean_threshold(&img, 11, 2);
        assert!(is_binary(&out));
        assert_eq!(out.get_pixel(35, 10)[0], 0, "stroke stays dark in bright region");
        assert_eq!(out.get_pixel(5, 3)[0], 255, "background stays white in dark region");
    }

    #[test]
    fn adaptive_threshold_uniform_is_white() {
        let out = adaptive_mean_threshold(&solid(8, 8, 50), 15, 5);
        assert!(out.pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn sharpen_keeps_flat_regions() {
        let out = sharpen(&solid(5, 5, 120));
        assert!(out.pixels().all(|p| p[0] == 120));
    }

    #[test]
    fn sharpen_boosts_edges() {
        let img: GrayImage = ImageBuffer::from_fn(6, 3, |x, _| Luma([if x < 3 { 100 } else { 150 }]));
        let out = sharpen(&img);
        assert!(out.get_pixel(2, 1)[0] < 100);
        assert!(out.get_pixel(3, 1)[0] > 150);
    }

    #[test]
    fn gaussian_spreads_an_impulse_by_one_pixel() {
        let mut img = solid(9, 9, 0);
        img.put_pixel(4, 4, Luma([255]));
        let out = gaussian_blur3x3(&img);

        for (x, y) in [(3, 4), (5, 4), (4, 3), (4, 5), (3, 3), (5, 5)] {
            assert!(out.get_pixel(x, y)[0] > 0, "({x}, {y})");
        }
        for (x, y) in [(2, 4), (6, 4), (4, 2), (4, 6), (2, 2), (6, 6)] {
            assert_eq!(out.get_pixel(x, y)[0], 0, "({x}, {y})");
        }
        assert!(out.get_pixel(4, 4)[0] > out.get_pixel(3, 4)[0]);
    }

    #[test]
    fn gaussian_keeps_flat_regions() {
        let out = gaussian_blur3x3(&solid(5, 5, 120));
        assert!(out.pixels().all(|p| p[0] == 120));
    }

    #[test]
    fn bilateral_preserves_hard_edge() {
        let img: GrayImage = ImageBuffer::from_fn(20, 5, |x, _| Luma([if x < 10 { 20 } else { 230 }]));
        let out = bilateral(&img, 9, 75.0, 75.0);
        assert!(out.get_pixel(9, 2)[0] < 40);
        assert!(out.get_pixel(10, 2)[0] > 210);
    }

    #[test]
    fn bilateral_uniform_unchanged() {
        let out = bilateral(&solid(6, 6, 77), 9, 75.0, 75.0);
        assert!(out.pixels().all(|p| p[0] == 77));
    }

    #[test]
    fn clahe_spreads_low_contrast() {
        let img: GrayImage = ImageBuffer::from_fn(64, 64, |x, y| Luma([100 + ((x + y) % 8) as u8]));
        let out = clahe(&img, 2.0, 8);
        let (mn, mx) = out.pixels().fold((255u8, 0u8), |(a, b), p| (a.min(p[0]), b.max(p[0])));
        assert!(mx - mn > 7, "range {mn}..{mx}");
        assert_eq!(out.dimensions(), (64, 64));
    }

    #[test]
    fn clahe_handles_images_smaller_than_grid() {
        let out = clahe(&solid(3, 2, 10), 2.0, 8);
        assert_eq!(out.dimensions(), (3, 2));
    }

    #[test]
    fn stretch_reaches_full_range() {
        let img: GrayImage = ImageBuffer::from_fn(256, 1, |x, _| Luma([60 + (x / 2) as u8]));
        let out = stretch_contrast(&img);
        let min = out.pixels().map(|p| p[0]).min().unwrap();
        let max = out.pixels().map(|p| p[0]).max().unwrap();
        assert_eq!((min, max), (0, 255));
    }

    #[test]
    fn stretch_uniform_is_noop() {
        let img = solid(4, 4, 90);
        assert_eq!(stretch_contrast(&img), img);
    }

    #[test]
    fn open_removes_isolated_speck() {
        let mut img = solid(6, 6, 0);
        img.put_pixel(3, 3, Luma([255]));
        let out = open(&img, 2, 2);
        assert!(out.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn open_keeps_large_blocks() {
        let img: GrayImage =
            ImageBuffer::from_fn(8, 8, |x, y| Luma([if (2..6).contains(&x) && (2..6).contains(&y) { 255 } else { 0 }]));
        assert_eq!(open(&img, 2, 2), img);
    }

    #[test]
    fn open_never_brightens_and_close_never_darkens() {
        let img: GrayImage = ImageBuffer::from_fn(12, 9, |x, y| {
            Luma([if (x * 7 + y * 3) % 5 < 2 { 255 } else { 0 }])
        });
        for (kw, kh) in [(2, 2), (2, 1)] {
            let opened = open(&img, kw, kh);
            let closed = close(&img, kw, kh);
            assert_eq!(opened.dimensions(), img.dimensions());
            assert_eq!(closed.dimensions(), img.dimensions());
            for (x, y, p) in img.enumerate_pixels() {
                assert!(opened.get_pixel(x, y)[0] <= p[0], "open at ({x}, {y})");
                assert!(closed.get_pixel(x, y)[0] >= p[0], "close at ({x}, {y})");
            }
        }
    }

    #[test]
    fn close_bridges_one_pixel_gap() {
        let img: GrayImage = ImageBuffer::from_fn(5, 1, |x, _| Luma([if x == 2 { 0 } else { 255 }]));
        let out = close(&img, 2, 1);
        assert_eq!(out.get_pixel(2, 0)[0], 255);
    }
}
