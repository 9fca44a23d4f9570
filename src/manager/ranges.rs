/// Disjoint, sorted, non-adjacent inclusive index ranges
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineRanges {
    ranges: Vec<(usize, usize)>,
}

impl LineRanges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `[first, last]` in, coalescing with overlapping or adjacent ranges
    pub fn add(&mut self, first: usize, last: usize) {
        let (mut first, mut last) = (first.min(last), first.max(last));

        let mut merged = Vec::with_capacity(self.ranges.len() + 1);
        for &(start, end) in &self.ranges {
            if end.saturating_add(1) < first || last.saturating_add(1) < start {
                merged.push((start, end));
            } else {
                first = first.min(start);
                last = last.max(end);
            }
        }

        let at = merged.partition_point(|&(start, _)| start < first);
        merged.insert(at, (first, last));
        self.ranges = merged;
    }

    /// Take `[first, last]` out, splitting a range that straddles it
    pub fn remove(&mut self, first: usize, last: usize) {
        let (first, last) = (first.min(last), first.max(last));

        self.ranges = self
            .ranges
            .iter()
            .flat_map(|&(start, end)| {
                let before = (start < first).then(|| (start, end.min(first - 1)));
                let after = (end > last).then(|| (start.max(last + 1), end));
                let untouched = end < first || start > last;
                if untouched {
                    [Some((start, end)), None]
                } else {
                    [before, after]
                }
            })
            .flatten()
            .collect();
    }

    pub fn contains(&self, idx: usize) -> bool {
        self.ranges
            .iter()
            .any(|&(start, end)| idx >= start && idx <= end)
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn clear(&mut self) {
        self.ranges.clear();
    }

    pub fn ranges(&self) -> &[(usize, usize)] {
        &self.ranges
    }

    /// Every covered index, ascending
    pub fn indices(&self) -> Vec<usize> {
        self.ranges
            .iter()
            .flat_map(|&(start, end)| start..=end)
            .collect()
    }
}
