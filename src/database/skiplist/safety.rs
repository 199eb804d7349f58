use thiserror::Error;

/// Structural problem found by `SkipList::validate_invariants`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Node has {node_level} levels, allowed 1..={max_level}")]
    InvalidLevel { node_level: usize, max_level: usize },

    #[error("Nodes out of (score, member) order: {0}")]
    OutOfOrder(String),

    #[error("Length is {expected} but {actual} nodes are reachable")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Span at level {level} is {actual}, expected {expected}")]
    SpanMismatch {
        level: usize,
        expected: u64,
        actual: u64,
    },

    #[error("Backward link broken: {0}")]
    BrokenBackwardLink(String),

    #[error("Tail is not the last node")]
    InvalidTail,
}

/// Returns `err` unless `cond` holds.
#[inline]
pub(crate) fn check(
    cond: bool,
    err: impl FnOnce() -> ValidationError,
) -> Result<(), ValidationError> {
    if cond {
        Ok(())
    } else {
        Err(err())
    }
}

/// How node heights are spread across the list.
#[derive(Debug, Clone, PartialEq)]
pub struct SkipListStatistics {
    pub node_count: usize,
    /// `level_distribution[i]` is the number of nodes with `i + 1` levels.
    pub level_distribution: Vec<usize>,
    pub current_max_level: usize,
    pub average_level: f64,
}

impl SkipListStatistics {
    /// Builds the distribution from the height of every node.
    pub fn from_heights<I>(
        heights: I,
        max_level: usize,
        current_max_level: usize,
    ) -> Self
    where
        I: IntoIterator<Item = usize>,
    {
        let mut level_distribution = vec![0; max_level];
        let mut node_count = 0;
        let mut total = 0;
        for h in heights {
            level_distribution[h.clamp(1, max_level) - 1] += 1;
            node_count += 1;
            total += h;
        }
        let average_level = if node_count == 0 {
            0.0
        } else {
            total as f64 / node_count as f64
        };
        Self {
            node_count,
            level_distribution,
            current_max_level,
            average_level,
        }
    }

    /// Multi-line dump, one line per populated level.
    pub fn report(&self) -> String {
        let mut out = format!(
            "nodes={} max_level={} avg_level={:.2}\n",
            self.node_count, self.current_max_level, self.average_level
        );
        for (i, &n) in self.level_distribution.iter().enumerate() {
            if n == 0 {
                continue;
            }
            let pct = n as f64 * 100.0 / self.node_count as f64;
            out.push_str(&format!("  L{:<2} {n} ({pct:.1}%)\n", i + 1));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statistics_of_nothing() {
        let stats = SkipListStatistics::from_heights([], 32, 1);
        assert_eq!(stats.node_count, 0);
        assert_eq!(stats.average_level, 0.0);
        assert_eq!(stats.level_distribution.len(), 32);
    }

    #[test]
    fn test_statistics_average_and_report() {
        let stats = SkipListStatistics::from_heights([1, 1, 2, 3], 32, 3);
        assert_eq!(stats.node_count, 4);
        assert_eq!(stats.level_distribution[..3], [2, 1, 1]);
        assert_eq!(stats.average_level, 1.75);
        assert!(stats.report().contains("L1  2 (50.0%)"));
    }

    #[test]
    fn test_check() {
        assert!(check(true, || ValidationError::InvalidTail).is_ok());
        let err = check(false, || ValidationError::SpanMismatch {
            level: 2,
            expected: 3,
            actual: 4,
        })
        .unwrap_err();
        assert!(err.to_string().contains("level 2"));
    }
}
