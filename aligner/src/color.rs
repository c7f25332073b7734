use std::collections::HashMap;

use image::{Rgb, RgbImage};
use rand::{SeedableRng, distributions::WeightedIndex, prelude::Distribution, rngs::StdRng};
use tracing::{debug, error};

/// 聚类数量
const CLUSTER_COUNT: usize = 5;
/// 随机种子, 保证结果可复现
const RANDOM_SEED: u64 = 42;
/// 不同初始中心的聚类次数, 取惯性最小的一次
const INIT_COUNT: usize = 10;
/// 单次聚类最大迭代次数
const MAX_ITERATIONS: usize = 300;
/// 收敛容差 (相对于数据方差)
const TOLERANCE: f64 = 1e-4;
/// 无法计算主色调时使用的颜色
pub const FALLBACK_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

type Color = [f64; 3];

/// 颜色距离的平方
///
/// # 参数
///
/// * `c1` - 颜色1
/// * `c2` - 颜色2
fn color_distance(c1: &Color, c2: &Color) -> f64 {
    let x = c1[0] - c2[0];
    let y = c1[1] - c2[1];
    let z = c1[2] - c2[2];
    x * x + y * y + z * z
}

/// 一次聚类结果
struct Clustering {
    centroids: Vec<Color>,
    /// 每个簇包含的像素数量
    sizes: Vec<f64>,
    inertia: f64,
}

/// 提取图片主色调
///
/// 使用 K-means 对全部像素聚类, 取像素最多的簇的中心作为主色调.
/// 计算失败时返回白色.
///
/// # 参数
///
/// * `image` - 原始图片
pub fn dominant_color(image: &RgbImage) -> Rgb<u8> {
    match try_dominant_color(image, CLUSTER_COUNT) {
        Some(color) => {
            debug!("主色调: {:?}", color.0);
            color
        }
        None => {
            error!("提取主色调失败, 使用白色代替");
            FALLBACK_COLOR
        }
    }
}

/// 提取图片主色调
///
/// 相同颜色的像素合并为一个带权重的点, 与逐像素聚类结果一致
///
/// # 参数
///
/// * `image` - 原始图片
/// * `cluster_count` - 聚类数量
fn try_dominant_color(image: &RgbImage, cluster_count: usize) -> Option<Rgb<u8>> {
    let mut histogram: HashMap<[u8; 3], u32> = HashMap::new();
    for pixel in image.pixels() {
        *histogram.entry(pixel.0).or_default() += 1;
    }
    if histogram.is_empty() || cluster_count == 0 {
        return None;
    }

    // 固定顺序, 避免 HashMap 迭代顺序影响随机采样
    let mut entries: Vec<([u8; 3], u32)> = histogram.into_iter().collect();
    entries.sort_unstable_by_key(|(color, _)| *color);

    let points: Vec<Color> = entries
        .iter()
        .map(|(c, _)| [c[0] as f64, c[1] as f64, c[2] as f64])
        .collect();
    let weights: Vec<f64> = entries.iter().map(|(_, count)| *count as f64).collect();

    let tolerance = TOLERANCE * mean_variance(&points, &weights);
    let mut rng = StdRng::seed_from_u64(RANDOM_SEED);

    let mut best: Option<Clustering> = None;
    for _ in 0..INIT_COUNT {
        let clustering = kmeans(&points, &weights, cluster_count, tolerance, &mut rng)?;
        if best
            .as_ref()
            .is_none_or(|best| clustering.inertia < best.inertia)
        {
            best = Some(clustering);
        }
    }
    let best = best?;

    let mut dominant = 0;
    for (index, size) in best.sizes.iter().enumerate() {
        if *size > best.sizes[dominant] {
            dominant = index;
        }
    }

    let centroid = best.centroids[dominant];
    if centroid.iter().any(|c| !c.is_finite()) {
        return None;
    }
    Some(Rgb(centroid.map(|c| c.clamp(0.0, 255.0) as u8)))
}

/// 各通道加权方差的均值
fn mean_variance(points: &[Color], weights: &[f64]) -> f64 {
    let total: f64 = weights.iter().sum();
    let mut mean = [0.0; 3];
    for (point, weight) in points.iter().zip(weights) {
        for c in 0..3 {
            mean[c] += point[c] * weight / total;
        }
    }
    let mut variance = 0.0;
    for (point, weight) in points.iter().zip(weights) {
        variance += color_distance(point, &mean) * weight / total;
    }
    variance / 3.0
}

/// 使用 k-means++ 选择初始中心
fn init_centroids(
    points: &[Color],
    weights: &[f64],
    cluster_count: usize,
    rng: &mut StdRng,
) -> Option<Vec<Color>> {
    let first = WeightedIndex::new(weights).ok()?.sample(rng);
    let mut centroids = vec![points[first]];
    let mut nearest: Vec<f64> = points
        .iter()
        .map(|p| color_distance(p, &points[first]))
        .collect();

    while centroids.len() < cluster_count {
        let scores: Vec<f64> = nearest.iter().zip(weights).map(|(d, w)| d * w).collect();
        // 不同颜色数量少于聚类数量时, 所有距离均为 0, 按像素数量重复选取
        let index = match WeightedIndex::new(&scores) {
            Ok(distribution) => distribution.sample(rng),
            Err(_) => WeightedIndex::new(weights).ok()?.sample(rng),
        };
        let centroid = points[index];
        for (distance, point) in nearest.iter_mut().zip(points) {
            *distance = distance.min(color_distance(point, &centroid));
        }
        centroids.push(centroid);
    }
    Some(centroids)
}

/// 最近的中心下标与距离
fn nearest_centroid(point: &Color, centroids: &[Color]) -> (usize, f64) {
    let mut label = 0;
    let mut best = f64::INFINITY;
    for (index, centroid) in centroids.iter().enumerate() {
        let distance = color_distance(point, centroid);
        if distance < best {
            best = distance;
            label = index;
        }
    }
    (label, best)
}

/// 单次加权 K-means 聚类
fn kmeans(
    points: &[Color],
    weights: &[f64],
    cluster_count: usize,
    tolerance: f64,
    rng: &mut StdRng,
) -> Option<Clustering> {
    let mut centroids = init_centroids(points, weights, cluster_count, rng)?;

    for _ in 0..MAX_ITERATIONS {
        let mut sums = vec![[0.0; 3]; cluster_count];
        let mut sizes = vec![0.0; cluster_count];
        for (point, weight) in points.iter().zip(weights) {
            let (label, _) = nearest_centroid(point, &centroids);
            for c in 0..3 {
                sums[label][c] += point[c] * weight;
            }
            sizes[label] += weight;
        }

        let mut shift = 0.0;
        for (index, centroid) in centroids.iter_mut().enumerate() {
            // 空簇保持原中心
            if sizes[index] == 0.0 {
                continue;
            }
            let updated = sums[index].map(|s| s / sizes[index]);
            shift += color_distance(centroid, &updated);
            *centroid = updated;
        }

        if shift <= tolerance {
            break;
        }
    }

    let mut sizes = vec![0.0; cluster_count];
    let mut inertia = 0.0;
    for (point, weight) in points.iter().zip(weights) {
        let (label, distance) = nearest_centroid(point, &centroids);
        sizes[label] += weight;
        inertia += distance * weight;
    }

    if !inertia.is_finite() {
        return None;
    }
    Some(Clustering {
        centroids,
        sizes,
        inertia,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dominant_color_uniform_image() {
        let image = RgbImage::from_pixel(10, 10, Rgb([12, 34, 56]));
        assert_eq!(dominant_color(&image), Rgb([12, 34, 56]));
    }

    #[test]
    fn test_dominant_color_majority_wins() {
        // 70% 红色, 20% 蓝色, 10% 绿色
        let image = RgbImage::from_fn(10, 10, |x, _| match x {
            0..=6 => Rgb([200, 10, 10]),
            7..=8 => Rgb([10, 10, 200]),
            _ => Rgb([10, 200, 10]),
        });
        assert_eq!(dominant_color(&image), Rgb([200, 10, 10]));
    }

    #[test]
    fn test_dominant_color_many_shades() {
        let image = RgbImage::from_fn(40, 40, |x, y| {
            if y < 30 {
                Rgb([240 + (x % 4) as u8, 240, 240])
            } else {
                Rgb([(x * 6) as u8, 0, (y * 2) as u8])
            }
        });
        let color = dominant_color(&image);
        assert!(color.0[0] >= 240 && color.0[0] <= 243);
        assert_eq!(color.0[1], 240);
    }

    #[test]
    fn test_dominant_color_is_deterministic() {
        let image = RgbImage::from_fn(32, 32, |x, y| Rgb([(x * 8) as u8, (y * 8) as u8, 100]));
        assert_eq!(dominant_color(&image), dominant_color(&image));
    }

    #[test]
    fn test_dominant_color_empty_image_fallback() {
        let image = RgbImage::new(0, 0);
        assert_eq!(dominant_color(&image), FALLBACK_COLOR);
    }
}
