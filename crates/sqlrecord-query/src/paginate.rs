//! LIMIT / OFFSET handling.

/// Pagination state for a SELECT.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Paginate {
    limit: Option<u64>,
    offset: u64,
}

impl Paginate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn set_limit(&mut self, limit: u64) {
        self.limit = Some(limit);
    }

    pub fn set_offset(&mut self, offset: u64) {
        self.offset = offset;
    }

    pub fn clear_limit(&mut self) {
        self.limit = None;
    }

    pub fn clear_offset(&mut self) {
        self.offset = 0;
    }

    /// `LIMIT <offset>, <count>` when an offset is set, else `LIMIT <count>`.
    ///
    /// Without a limit nothing is emitted, even if an offset was given.
    pub fn to_sql(&self) -> String {
        match self.limit {
            None => String::new(),
            Some(limit) if self.offset > 0 => format!("LIMIT {}, {}", self.offset, limit),
            Some(limit) => format!("LIMIT {limit}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let p = Paginate::new();
        assert_eq!(p.limit(), None);
        assert_eq!(p.offset(), 0);
        assert_eq!(p.to_sql(), "");
    }

    #[test]
    fn limit_only() {
        let mut p = Paginate::new();
        p.set_limit(10);
        assert_eq!(p.limit(), Some(10));
        assert_eq!(p.to_sql(), "LIMIT 10");
    }

    #[test]
    fn limit_and_offset() {
        let mut p = Paginate::new();
        p.set_limit(10);
        p.set_offset(100);
        assert_eq!(p.to_sql(), "LIMIT 100, 10");

        p.clear_offset();
        assert_eq!(p.to_sql(), "LIMIT 10");
    }

    #[test]
    fn offset_without_limit_emits_nothing() {
        let mut p = Paginate::new();
        p.set_offset(5);
        assert_eq!(p.to_sql(), "");
    }
}
