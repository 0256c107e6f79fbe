//! Multi-scale sliding-window detection and neighbour grouping.
//!
//! Behaves like OpenCV's `CascadeClassifier::detectMultiScale` with the
//! default flags: the image is shrunk by `scale_factor` per level, each
//! level is scanned with a fixed window, and raw hits are clustered by
//! `group_rectangles`.

use super::cascade::HaarCascade;
use super::FaceConfig;
use image::{imageops, GrayImage};
use ndarray::Array2;
use serde::Serialize;

/// Relative tolerance used when clustering raw detections
const GROUP_EPS: f64 = 0.2;

/// Axis-aligned face bounding box in source image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FaceRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FaceRegion {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    fn contains(&self, other: &FaceRegion) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.x + other.width <= self.x + self.width
            && other.y + other.height <= self.y + self.height
    }
}

/// Summed-area tables for pixel sums and squared sums
pub struct IntegralImage {
    sum: Array2<i64>,
    sq_sum: Array2<i64>,
}

impl IntegralImage {
    pub fn new(image: &GrayImage) -> Self {
        let (width, height) = (image.width() as usize, image.height() as usize);
        let mut sum = Array2::<i64>::zeros((height + 1, width + 1));
        let mut sq_sum = Array2::<i64>::zeros((height + 1, width + 1));

        for y in 0..height {
            let mut row = 0i64;
            let mut row_sq = 0i64;
            for x in 0..width {
                let v = image.get_pixel(x as u32, y as u32)[0] as i64;
                row += v;
                row_sq += v * v;
                sum[[y + 1, x + 1]] = sum[[y, x + 1]] + row;
                sq_sum[[y + 1, x + 1]] = sq_sum[[y, x + 1]] + row_sq;
            }
        }

        Self { sum, sq_sum }
    }

    fn area_sum(table: &Array2<i64>, x: u32, y: u32, width: u32, height: u32) -> i64 {
        let (x0, y0) = (x as usize, y as usize);
        let (x1, y1) = (x0 + width as usize, y0 + height as usize);
        table[[y1, x1]] - table[[y0, x1]] - table[[y1, x0]] + table[[y0, x0]]
    }

    pub fn rect_sum(&self, x: u32, y: u32, width: u32, height: u32) -> i64 {
        Self::area_sum(&self.sum, x, y, width, height)
    }

    pub fn rect_sq_sum(&self, x: u32, y: u32, width: u32, height: u32) -> i64 {
        Self::area_sum(&self.sq_sum, x, y, width, height)
    }
}

/// Scan the image at every pyramid level and return grouped detections
pub fn detect_multi_scale(
    cascade: &HaarCascade,
    gray: &GrayImage,
    config: &FaceConfig,
) -> Vec<FaceRegion> {
    let (win_w, win_h) = cascade.window_size();
    let (img_w, img_h) = gray.dimensions();
    let mut candidates = Vec::new();

    let mut factor = 1.0f64;
    loop {
        let window_w = (win_w as f64 * factor).round() as u32;
        let window_h = (win_h as f64 * factor).round() as u32;
        if window_w > img_w || window_h > img_h {
            break;
        }

        let scaled_w = (img_w as f64 / factor).round() as u32;
        let scaled_h = (img_h as f64 / factor).round() as u32;
        if scaled_w < win_w || scaled_h < win_h {
            break;
        }

        if window_w >= config.min_face_size && window_h >= config.min_face_size {
            let scaled = if factor == 1.0 {
                gray.clone()
            } else {
                imageops::resize(gray, scaled_w, scaled_h, imageops::FilterType::Triangle)
            };
            let ii = IntegralImage::new(&scaled);
            let step = if factor > 2.0 { 1 } else { 2 };

            let mut y = 0;
            while y + win_h <= scaled_h {
                let mut x = 0;
                while x + win_w <= scaled_w {
                    let result = cascade.evaluate(&ii, x, y);
                    if result > 0 {
                        candidates.push(FaceRegion::new(
                            (x as f64 * factor).round() as u32,
                            (y as f64 * factor).round() as u32,
                            window_w,
                            window_h,
                        ));
                    }
                    // A first-stage rejection skips the next position too
                    x += if result == 0 { step * 2 } else { step };
                }
                y += step;
            }
        }

        factor *= config.scale_factor;
    }

    tracing::debug!(
        "Cascade scan produced {} raw candidates on {}x{} image",
        candidates.len(),
        img_w,
        img_h
    );

    group_rectangles(&candidates, config.min_neighbors, GROUP_EPS)
}

fn similar(a: &FaceRegion, b: &FaceRegion, eps: f64) -> bool {
    let delta = eps * (a.width.min(b.width) + a.height.min(b.height)) as f64 * 0.5;
    let close = |p: u32, q: u32| (p as f64 - q as f64).abs() <= delta;
    close(a.x, b.x)
        && close(a.y, b.y)
        && close(a.x + a.width, b.x + b.width)
        && close(a.y + a.height, b.y + b.height)
}

fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

/// Cluster raw detections into averaged boxes.
///
/// Clusters backed by `min_neighbors` or fewer hits are dropped, as are
/// clusters lying inside a much stronger one.
pub fn group_rectangles(rects: &[FaceRegion], min_neighbors: u32, eps: f64) -> Vec<FaceRegion> {
    if rects.is_empty() {
        return Vec::new();
    }

    let mut parent: Vec<usize> = (0..rects.len()).collect();
    for i in 0..rects.len() {
        for j in (i + 1)..rects.len() {
            if similar(&rects[i], &rects[j], eps) {
                let (ri, rj) = (find(&mut parent, i), find(&mut parent, j));
                if ri != rj {
                    parent[rj] = ri;
                }
            }
        }
    }

    // Class order follows first appearance
    let mut class_of_root = std::collections::HashMap::new();
    let mut sums: Vec<([u64; 4], u32)> = Vec::new();
    for (i, rect) in rects.iter().enumerate() {
        let root = find(&mut parent, i);
        let class = *class_of_root.entry(root).or_insert_with(|| {
            sums.push(([0; 4], 0));
            sums.len() - 1
        });
        let (acc, n) = &mut sums[class];
        acc[0] += rect.x as u64;
        acc[1] += rect.y as u64;
        acc[2] += rect.width as u64;
        acc[3] += rect.height as u64;
        *n += 1;
    }

    let averaged: Vec<(FaceRegion, u32)> = sums
        .iter()
        .filter(|(_, n)| *n > min_neighbors)
        .map(|(acc, n)| {
            let avg = |v: u64| (v as f64 / *n as f64).round() as u32;
            (FaceRegion::new(avg(acc[0]), avg(acc[1]), avg(acc[2]), avg(acc[3])), *n)
        })
        .collect();

    averaged
        .iter()
        .enumerate()
        .filter(|&(i, &(inner, n1))| {
            !averaged.iter().enumerate().any(|(j, &(outer, n2))| {
                if i == j || n2 < min_neighbors {
                    return false;
                }
                let dx = (outer.width as f64 * eps).round() as u32;
                let dy = (outer.height as f64 * eps).round() as u32;
                let expanded = FaceRegion::new(
                    outer.x.saturating_sub(dx),
                    outer.y.saturating_sub(dy),
                    outer.width + 2 * dx,
                    outer.height + 2 * dy,
                );
                expanded.contains(&inner) && (n2 > n1.max(3) || n1 < 3)
            })
        })
        .map(|(_, &(rect, _))| rect)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::face::cascade::tests::single_stage_cascade;
    use proptest::prelude::*;

    fn textured(width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| image::Luma([((x * 7 + y * 13) % 256) as u8]))
    }

    fn cluster(base: FaceRegion, count: usize) -> Vec<FaceRegion> {
        (0..count)
            .map(|i| FaceRegion::new(base.x + (i % 2) as u32, base.y, base.width, base.height))
            .collect()
    }

    #[test]
    fn test_integral_image_sums() {
        let img = GrayImage::from_fn(4, 3, |x, y| image::Luma([(x + y * 4) as u8]));
        let ii = IntegralImage::new(&img);
        // Whole image: 0 + 1 + ... + 11
        assert_eq!(ii.rect_sum(0, 0, 4, 3), 66);
        // Pixels 5, 6, 9, 10
        assert_eq!(ii.rect_sum(1, 1, 2, 2), 30);
        assert_eq!(ii.rect_sq_sum(1, 1, 2, 2), 25 + 36 + 81 + 100);
    }

    #[test]
    fn test_group_requires_more_than_min_neighbors() {
        let base = FaceRegion::new(10, 10, 40, 40);
        assert!(group_rectangles(&cluster(base, 5), 5, GROUP_EPS).is_empty());

        let grouped = group_rectangles(&cluster(base, 6), 5, GROUP_EPS);
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped[0].width, 40);
        assert_eq!(grouped[0].y, 10);
    }

    #[test]
    fn test_group_keeps_separate_clusters() {
        let mut rects = cluster(FaceRegion::new(0, 0, 30, 30), 7);
        rects.extend(cluster(FaceRegion::new(200, 100, 50, 50), 8));
        let grouped = group_rectangles(&rects, 5, GROUP_EPS);
        assert_eq!(grouped.len(), 2);
        assert!(grouped.iter().any(|r| r.x >= 200 && r.width == 50));
    }

    #[test]
    fn test_group_drops_weak_cluster_inside_strong_one() {
        let mut rects = cluster(FaceRegion::new(100, 100, 100, 100), 20);
        rects.extend(cluster(FaceRegion::new(130, 130, 30, 30), 6));
        let grouped = group_rectangles(&rects, 5, GROUP_EPS);
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped[0].width, 100);
    }

    #[test]
    fn test_detect_with_accepting_cascade() {
        let cascade = HaarCascade::from_xml(&single_stage_cascade(-1.0)).unwrap();
        let gray = textured(48, 48);
        let faces = detect_multi_scale(&cascade, &gray, &FaceConfig::default());

        assert!(!faces.is_empty());
        for face in &faces {
            assert!(face.x < 48 && face.y < 48);
            assert!(face.width >= 24 && face.width <= 48);
        }
    }

    #[test]
    fn test_detect_with_rejecting_cascade() {
        let cascade = HaarCascade::from_xml(&single_stage_cascade(2.0)).unwrap();
        let faces = detect_multi_scale(&cascade, &textured(48, 48), &FaceConfig::default());
        assert!(faces.is_empty());
    }

    #[test]
    fn test_image_smaller_than_window() {
        let cascade = HaarCascade::from_xml(&single_stage_cascade(-1.0)).unwrap();
        let faces = detect_multi_scale(&cascade, &textured(20, 20), &FaceConfig::default());
        assert!(faces.is_empty());
    }

    #[test]
    fn test_min_face_size_filters_levels() {
        let cascade = HaarCascade::from_xml(&single_stage_cascade(-1.0)).unwrap();
        let config = FaceConfig {
            min_face_size: 100,
            ..FaceConfig::default()
        };
        assert!(detect_multi_scale(&cascade, &textured(48, 48), &config).is_empty());
    }

    proptest! {
        #[test]
        fn prop_grouped_count_never_exceeds_input(
            boxes in prop::collection::vec((0u32..200, 0u32..200, 10u32..80), 0..40)
        ) {
            let rects: Vec<FaceRegion> = boxes
                .iter()
                .map(|&(x, y, s)| FaceRegion::new(x, y, s, s))
                .collect();
            let grouped = group_rectangles(&rects, 0, GROUP_EPS);
            prop_assert!(grouped.len() <= rects.len());
        }
    }
}
