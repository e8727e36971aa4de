//! 縮圖時間點取樣器
//!
//! 先在正規化空間 [0, 1] 依分布模型產生取樣點，再乘上影片長度。
//! 最後結果一律夾在 [1%, 99%]、去重、遞增排序。

use crate::config::{Distribution, GenerationParameters};
use log::{trace, warn};
use rand::Rng;
use rand_distr::{Normal, Triangular};

/// 避開片頭片尾的比例
const EDGE_MARGIN: f64 = 0.01;

/// 三角分布區間過窄時的退回半寬
const TRIANGULAR_FALLBACK_SPREAD: f64 = 0.05;
const MIN_TRIANGULAR_WIDTH: f64 = 1e-3;

/// 常態分布的最小標準差與取樣池大小
const MIN_SIGMA: f64 = 1e-6;
const NORMAL_POOL_FACTOR: usize = 10;
const MIN_NORMAL_POOL: usize = 20;

/// 依產生參數取樣時間點（秒）
#[must_use]
pub fn sample_timestamps(duration: f64, params: &GenerationParameters) -> Vec<f64> {
    sample_timestamps_with_rng(duration, params, &mut rand::thread_rng())
}

/// 以指定亂數來源取樣，方便測試重現
pub fn sample_timestamps_with_rng<R: Rng + ?Sized>(
    duration: f64,
    params: &GenerationParameters,
    rng: &mut R,
) -> Vec<f64> {
    let count = params.thumbnail_count;
    if count == 0 {
        warn!("每部影片縮圖數量為 0，不產生時間點");
        return Vec::new();
    }
    if !duration.is_finite() || duration <= 0.0 {
        return Vec::new();
    }

    let normalized = match params.distribution {
        Distribution::Uniform => uniform_points(count),
        Distribution::Triangular => {
            triangular_points(count, params.peak_position, params.concentration, rng)
        }
        Distribution::Normal => normal_points(count, params.peak_position, params.concentration, rng),
    };

    let normalized = fill_to_count(clip_and_dedup(normalized), count);

    let mut timestamps: Vec<f64> = normalized.iter().map(|t| t * duration).collect();
    timestamps.sort_by(f64::total_cmp);
    timestamps.dedup();

    if timestamps.len() < count {
        trace!(
            "影片長度過短，只能取得 {} / {} 個時間點",
            timestamps.len(),
            count
        );
    }

    timestamps
}

/// 均勻分布：linspace(0, 1, N+2) 去掉兩端
fn uniform_points(count: usize) -> Vec<f64> {
    if count == 1 {
        return vec![0.5];
    }
    let divisor = (count + 1) as f64;
    (1..=count).map(|i| i as f64 / divisor).collect()
}

fn triangular_points<R: Rng + ?Sized>(
    count: usize,
    peak: f64,
    concentration: f64,
    rng: &mut R,
) -> Vec<f64> {
    let peak = peak.clamp(0.0, 1.0);
    let left = (peak - concentration).max(0.0);
    let right = (peak + concentration).min(1.0);

    let (left, right) = if right - left < MIN_TRIANGULAR_WIDTH || concentration < MIN_TRIANGULAR_WIDTH
    {
        (
            (peak - TRIANGULAR_FALLBACK_SPREAD).max(0.0),
            (peak + TRIANGULAR_FALLBACK_SPREAD).min(1.0),
        )
    } else {
        (left, right)
    };

    if left >= right {
        return vec![peak; count];
    }

    match Triangular::new(left, right, peak.clamp(left, right)) {
        Ok(triangular) => (0..count).map(|_| rng.sample(triangular)).collect(),
        Err(e) => {
            warn!("無法建立三角分布（{left}, {peak}, {right}）: {e}");
            vec![peak; count]
        }
    }
}

/// 常態分布：抽取較大的樣本池，夾在 [0, 1] 後取等距百分位數，
/// 確保兩側尾端都有代表點
fn normal_points<R: Rng + ?Sized>(
    count: usize,
    peak: f64,
    concentration: f64,
    rng: &mut R,
) -> Vec<f64> {
    let sigma = concentration.max(MIN_SIGMA);
    let Ok(normal) = Normal::new(peak, sigma) else {
        warn!("無法建立常態分布（mean={peak}, sigma={sigma}），改用均勻分布");
        return uniform_points(count);
    };

    let pool_size = (count * NORMAL_POOL_FACTOR).max(MIN_NORMAL_POOL);
    let mut pool: Vec<f64> = (0..pool_size)
        .map(|_| rng.sample(normal).clamp(0.0, 1.0))
        .collect();
    pool.sort_by(f64::total_cmp);

    if count == 1 {
        return vec![percentile(&pool, 50.0)];
    }

    let step = 100.0 / (count - 1) as f64;
    (0..count)
        .map(|i| percentile(&pool, (i as f64 * step).min(100.0)))
        .collect()
}

/// 線性內插百分位數（輸入需已排序）
fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.5;
    }
    let position = q / 100.0 * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

fn clip_and_dedup(points: Vec<f64>) -> Vec<f64> {
    let mut clipped: Vec<f64> = points
        .into_iter()
        .filter(|p| p.is_finite())
        .map(|p| p.clamp(EDGE_MARGIN, 1.0 - EDGE_MARGIN))
        .collect();
    clipped.sort_by(f64::total_cmp);
    clipped.dedup();
    clipped
}

/// 去重後數量不足時，保留原有點，從均勻序列等距抽出缺少的數量
fn fill_to_count(points: Vec<f64>, count: usize) -> Vec<f64> {
    if points.len() >= count {
        return points;
    }

    trace!("取樣只得到 {} 個不重複點，需要 {count} 個，補足中", points.len());

    let needed = count - points.len();
    let candidates: Vec<f64> = linspace(EDGE_MARGIN, 1.0 - EDGE_MARGIN, count + points.len())
        .into_iter()
        .filter(|c| !points.iter().any(|p| (p - c).abs() < f64::EPSILON))
        .collect();

    let mut combined = points;
    combined.extend(select_evenly(&candidates, needed));
    combined.sort_by(f64::total_cmp);
    combined.dedup();
    combined
}

fn linspace(start: f64, end: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (count - 1) as f64;
            (0..count)
                .map(|i| if i == count - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}

/// 等距選取索引（來源長度需大於等於 count）
fn select_evenly(points: &[f64], count: usize) -> Vec<f64> {
    if count == 1 {
        return vec![points[0]];
    }
    let step = (points.len() - 1) as f64 / (count - 1) as f64;
    (0..count)
        .map(|i| {
            let index = (i as f64 * step).round() as usize;
            points[index.min(points.len() - 1)]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn params(count: usize, distribution: Distribution, peak: f64, concentration: f64) -> GenerationParameters {
        GenerationParameters {
            thumbnail_count: count,
            peak_position: peak,
            concentration,
            distribution,
            ..GenerationParameters::default()
        }
    }

    fn assert_well_formed(timestamps: &[f64], duration: f64, count: usize) {
        assert_eq!(timestamps.len(), count, "timestamps: {timestamps:?}");
        for t in timestamps {
            assert!(*t >= 0.01 * duration - 1e-9, "{t} below lower bound");
            assert!(*t <= 0.99 * duration + 1e-9, "{t} above upper bound");
        }
        for pair in timestamps.windows(2) {
            assert!(pair[1] > pair[0], "not strictly ascending: {timestamps:?}");
        }
    }

    #[test]
    fn test_uniform_single_is_midpoint() {
        let timestamps = sample_timestamps(120.0, &params(1, Distribution::Uniform, 0.5, 0.2));
        assert_eq!(timestamps.len(), 1);
        assert!((timestamps[0] - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_uniform_excludes_endpoints() {
        let timestamps = sample_timestamps(100.0, &params(4, Distribution::Uniform, 0.5, 0.2));
        let expected = [20.0, 40.0, 60.0, 80.0];
        assert_eq!(timestamps.len(), expected.len());
        for (t, e) in timestamps.iter().zip(expected) {
            assert!((t - e).abs() < 1e-9);
        }
    }

    #[test]
    fn test_zero_count_returns_empty() {
        assert!(sample_timestamps(100.0, &params(0, Distribution::Normal, 0.5, 0.2)).is_empty());
    }

    #[test]
    fn test_degenerate_duration_returns_empty() {
        assert!(sample_timestamps(0.0, &params(5, Distribution::Uniform, 0.5, 0.2)).is_empty());
        assert!(sample_timestamps(f64::NAN, &params(5, Distribution::Uniform, 0.5, 0.2)).is_empty());
    }

    #[test]
    fn test_all_distributions_well_formed() {
        let mut rng = StdRng::seed_from_u64(7);
        let cases = [
            (Distribution::Uniform, 0.5, 0.2),
            (Distribution::Triangular, 0.3, 0.25),
            (Distribution::Triangular, 0.0, 0.0),
            (Distribution::Triangular, 1.0, 0.0001),
            (Distribution::Normal, 0.5, 0.2),
            (Distribution::Normal, 0.95, 0.5),
            (Distribution::Normal, 0.5, 0.0),
        ];
        for (distribution, peak, concentration) in cases {
            for count in [1, 2, 5, 18, 60] {
                let p = params(count, distribution, peak, concentration);
                let timestamps = sample_timestamps_with_rng(3600.0, &p, &mut rng);
                assert_well_formed(&timestamps, 3600.0, count);
            }
        }
    }

    #[test]
    fn test_collapsed_triangular_is_padded() {
        // 峰值在 0 且集中度為 0：所有點夾到 1% 後只剩一個，需補足
        let mut rng = StdRng::seed_from_u64(1);
        let timestamps =
            sample_timestamps_with_rng(100.0, &params(6, Distribution::Triangular, 0.0, 0.0), &mut rng);
        assert_well_formed(&timestamps, 100.0, 6);
    }

    #[test]
    fn test_normal_concentrates_near_peak() {
        let mut rng = StdRng::seed_from_u64(42);
        let timestamps =
            sample_timestamps_with_rng(1000.0, &params(9, Distribution::Normal, 0.5, 0.05), &mut rng);
        assert_well_formed(&timestamps, 1000.0, 9);
        let median = timestamps[4];
        assert!((median - 500.0).abs() < 50.0, "median {median}");
    }

    #[test]
    fn test_percentile_interpolates() {
        let sorted = [0.0, 1.0, 2.0, 3.0];
        assert!((percentile(&sorted, 0.0) - 0.0).abs() < 1e-12);
        assert!((percentile(&sorted, 50.0) - 1.5).abs() < 1e-12);
        assert!((percentile(&sorted, 100.0) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_fill_to_count_keeps_existing_points() {
        let filled = fill_to_count(vec![0.5], 3);
        assert_eq!(filled.len(), 3);
        assert!(filled.contains(&0.5), "{filled:?}");

        let filled = fill_to_count(vec![0.123, 0.777], 6);
        assert_eq!(filled.len(), 6);
        assert!(filled.contains(&0.123) && filled.contains(&0.777), "{filled:?}");
        for pair in filled.windows(2) {
            assert!(pair[1] > pair[0]);
        }
    }

    #[test]
    fn test_select_evenly_indices_are_distinct() {
        let points: Vec<f64> = (0..10).map(f64::from).collect();
        let selected = select_evenly(&points, 4);
        assert_eq!(selected, vec![0.0, 3.0, 6.0, 9.0]);
    }
}
