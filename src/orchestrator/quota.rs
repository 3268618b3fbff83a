//! 配额分配
//!
//! 决定向每个分块请求多少道题：
//! - 非最后一块：`max(1, target / chunk_count)`
//! - 最后一块：`max(1, target - collected)`，补足前面分块的缺口
//! - 任何分块的请求都不超过仍然缺少的题数

/// 每块的基础配额，至少为 1
pub fn base_per_chunk(target: usize, chunk_count: usize) -> usize {
    if chunk_count == 0 {
        return 0;
    }
    (target / chunk_count).max(1)
}

/// 第 `index` 个分块（从 0 开始）的请求题数
///
/// 已收集满 `target` 时返回 0，调用方应在此之前停止。
pub fn chunk_quota(index: usize, chunk_count: usize, target: usize, collected: usize) -> usize {
    let remaining = target.saturating_sub(collected);
    let quota = if index + 1 == chunk_count {
        remaining.max(1)
    } else {
        base_per_chunk(target, chunk_count)
    };
    quota.min(remaining)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_floors_to_one() {
        assert_eq!(base_per_chunk(5, 3), 1);
        assert_eq!(base_per_chunk(3, 10), 1);
        assert_eq!(base_per_chunk(10, 3), 3);
        assert_eq!(base_per_chunk(5, 0), 0);
    }

    #[test]
    fn test_last_chunk_makes_up_the_difference() {
        // target=5, 3 chunks, first two each delivered 1
        assert_eq!(chunk_quota(0, 3, 5, 0), 1);
        assert_eq!(chunk_quota(1, 3, 5, 1), 1);
        assert_eq!(chunk_quota(2, 3, 5, 2), 3);
    }

    #[test]
    fn test_never_requests_more_than_remaining() {
        assert_eq!(chunk_quota(0, 2, 10, 0), 5);
        assert_eq!(chunk_quota(0, 2, 10, 8), 2);
        assert_eq!(chunk_quota(1, 2, 10, 10), 0);
    }

    #[test]
    fn test_quota_is_positive_while_questions_are_missing() {
        for target in 1..=30 {
            for chunk_count in 1..=12 {
                for index in 0..chunk_count {
                    for collected in 0..target {
                        let q = chunk_quota(index, chunk_count, target, collected);
                        assert!(q >= 1, "target={target} chunks={chunk_count} idx={index}");
                        assert!(q <= target - collected);
                    }
                }
            }
        }
    }

    #[test]
    fn test_single_chunk_gets_everything() {
        assert_eq!(chunk_quota(0, 1, 7, 0), 7);
    }
}
