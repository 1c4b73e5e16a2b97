use crate::error::{ReelforgeError, Result};
use crate::types::{Segment, SegmentKind};

/// Hook and CTA windows take `min(HOOK_CAP_SECONDS, HOOK_FRACTION * total)`.
pub const HOOK_CAP_SECONDS: f64 = 3.0;
pub const HOOK_FRACTION: f64 = 0.10;

/// How the window between hook and CTA is divided across main points.
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentPolicy {
    /// Split the remaining window evenly across points.
    Proportional,
    /// Give each point a fixed length. When the fixed total exceeds the
    /// available window the lengths are scaled down to fit; when it falls
    /// short, the CTA window absorbs the slack.
    Fixed { seconds_per_point: f64 },
}

impl Default for SegmentPolicy {
    fn default() -> Self {
        SegmentPolicy::Proportional
    }
}

/// Allocate hook, per-point, and CTA windows over `[0, total]`.
///
/// The returned segments have strictly increasing starts and partition the
/// full duration: the CTA segment always ends exactly at `total`.
pub fn plan_segments(
    total: f64,
    point_count: usize,
    policy: &SegmentPolicy,
) -> Result<Vec<Segment>> {
    if total <= 0.0 || !total.is_finite() {
        return Err(ReelforgeError::InvalidDuration { seconds: total });
    }
    if point_count == 0 {
        return Err(ReelforgeError::Validation {
            field: "main_points",
            reason: "cannot plan segments for zero main points".to_string(),
        });
    }

    let edge = HOOK_CAP_SECONDS.min(total * HOOK_FRACTION);
    let window = total - 2.0 * edge;

    let per_point = match policy {
        SegmentPolicy::Proportional => window / point_count as f64,
        SegmentPolicy::Fixed { seconds_per_point } => {
            if *seconds_per_point <= 0.0 {
                return Err(ReelforgeError::Validation {
                    field: "seconds_per_point",
                    reason: format!("must be positive, got {seconds_per_point}"),
                });
            }
            let fixed_total = seconds_per_point * point_count as f64;
            if fixed_total > window {
                window / point_count as f64
            } else {
                *seconds_per_point
            }
        }
    };

    let mut segments = Vec::with_capacity(point_count + 2);
    segments.push(Segment {
        kind: SegmentKind::Hook,
        start: 0.0,
        duration: edge,
    });

    let mut clock = edge;
    for index in 0..point_count {
        segments.push(Segment {
            kind: SegmentKind::Point { index },
            start: clock,
            duration: per_point,
        });
        clock += per_point;
    }

    // CTA runs to the exact end, absorbing fixed-policy slack and float
    // rounding from the point loop.
    segments.push(Segment {
        kind: SegmentKind::Cta,
        start: clock,
        duration: total - clock,
    });

    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn assert_partitions(segments: &[Segment], total: f64) {
        assert!(segments[0].start.abs() < EPS);
        for pair in segments.windows(2) {
            assert!((pair[0].end() - pair[1].start).abs() < EPS);
            assert!(pair[1].start > pair[0].start);
        }
        assert!((segments.last().unwrap().end() - total).abs() < EPS);
    }

    #[test]
    fn proportional_35s_three_points() {
        let segments = plan_segments(35.0, 3, &SegmentPolicy::Proportional).unwrap();
        assert_eq!(segments.len(), 5);
        assert!((segments[0].duration - 3.0).abs() < EPS);
        for point in &segments[1..4] {
            assert!((point.duration - 29.0 / 3.0).abs() < 1e-6);
        }
        assert!((segments[4].duration - 3.0).abs() < 1e-6);
        assert_partitions(&segments, 35.0);
    }

    #[test]
    fn short_video_uses_fractional_edges() {
        // 20s video: hook = min(3, 2) = 2
        let segments = plan_segments(20.0, 2, &SegmentPolicy::Proportional).unwrap();
        assert!((segments[0].duration - 2.0).abs() < EPS);
        assert_partitions(&segments, 20.0);
    }

    #[test]
    fn fixed_policy_gives_each_point_its_length() {
        let policy = SegmentPolicy::Fixed {
            seconds_per_point: 1.5,
        };
        let segments = plan_segments(35.0, 3, &policy).unwrap();
        for point in &segments[1..4] {
            assert!((point.duration - 1.5).abs() < EPS);
        }
        // CTA absorbs the slack: 35 - 3 - 4.5 = 27.5
        assert!((segments[4].duration - 27.5).abs() < EPS);
        assert_partitions(&segments, 35.0);
    }

    #[test]
    fn fixed_policy_overflow_is_scaled_down() {
        let policy = SegmentPolicy::Fixed {
            seconds_per_point: 1.5,
        };
        // 8s video: edges 0.8 each, window 6.4; 5 * 1.5 = 7.5 > 6.4
        let segments = plan_segments(8.0, 5, &policy).unwrap();
        for point in &segments[1..6] {
            assert!((point.duration - 6.4 / 5.0).abs() < 1e-6);
        }
        assert_partitions(&segments, 8.0);
    }

    #[test]
    fn zero_duration_is_rejected() {
        let err = plan_segments(0.0, 3, &SegmentPolicy::Proportional).unwrap_err();
        assert!(matches!(err, ReelforgeError::InvalidDuration { .. }));
    }

    #[test]
    fn zero_points_is_rejected() {
        let err = plan_segments(30.0, 0, &SegmentPolicy::Proportional).unwrap_err();
        assert!(matches!(err, ReelforgeError::Validation { .. }));
    }

    #[test]
    fn point_indices_are_sequential() {
        let segments = plan_segments(40.0, 4, &SegmentPolicy::Proportional).unwrap();
        let indices: Vec<usize> = segments
            .iter()
            .filter_map(|s| match s.kind {
                SegmentKind::Point { index } => Some(index),
                _ => None,
            })
            .collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
    }
}
