//! Result Accumulator Module
//!
//! Keeps each review once, in the order it was first seen.

use crate::types::{ReviewDataset, ReviewRecord};
use chrono::NaiveDate;
use std::collections::HashSet;

/// What makes two scraped reviews the same review.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReviewIdentity {
    /// The site's own review id.
    SiteId(String),
    Composite {
        review_date: Option<NaiveDate>,
        title: Option<String>,
        employee_position: Option<String>,
        /// Rating in hundredths, so the key stays hashable.
        overall_rating: Option<i32>,
    },
}

impl ReviewIdentity {
    pub fn of(record: &ReviewRecord) -> Self {
        if let Some(id) = &record.review_id {
            return ReviewIdentity::SiteId(id.clone());
        }
        ReviewIdentity::Composite {
            review_date: record.review_date,
            title: record.title.clone(),
            employee_position: record.employee_position.clone(),
            overall_rating: record.overall_rating.map(|r| (r * 100.0).round() as i32),
        }
    }
}

#[derive(Debug, Default)]
pub struct ResultAccumulator {
    seen: HashSet<ReviewIdentity>,
    records: Vec<ReviewRecord>,
    duplicates: usize,
}

impl ResultAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when the record was new.
    pub fn add(&mut self, record: ReviewRecord) -> bool {
        if !self.seen.insert(ReviewIdentity::of(&record)) {
            self.duplicates += 1;
            return false;
        }
        self.records.push(record);
        true
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    /// Snapshot of everything accumulated so far. Safe to call repeatedly.
    pub fn finalize(&self) -> ReviewDataset {
        ReviewDataset {
            records: self.records.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: &str, day: u32, rating: f32) -> ReviewRecord {
        ReviewRecord {
            review_date: NaiveDate::from_ymd_opt(2024, 1, day),
            title: Some(title.to_string()),
            employee_position: Some("Engineer".to_string()),
            overall_rating: Some(rating),
            ..Default::default()
        }
    }

    #[test]
    fn test_duplicates_rejected_order_kept() {
        let mut acc = ResultAccumulator::new();
        assert!(acc.add(record("b", 2, 4.0)));
        assert!(acc.add(record("a", 1, 3.0)));
        assert!(!acc.add(record("b", 2, 4.0)));
        assert!(acc.add(record("b", 2, 5.0)));

        let titles: Vec<_> = acc
            .finalize()
            .records
            .iter()
            .map(|r| r.title.clone().unwrap())
            .collect();
        assert_eq!(titles, vec!["b", "a", "b"]);
        assert_eq!(acc.duplicates(), 1);
    }

    #[test]
    fn test_site_id_supersedes_composite() {
        let mut acc = ResultAccumulator::new();
        let mut first = record("same", 1, 4.0);
        first.review_id = Some("100".to_string());
        let mut second = first.clone();
        second.review_id = Some("101".to_string());
        let mut edited = record("edited title", 3, 2.0);
        edited.review_id = Some("100".to_string());

        assert!(acc.add(first));
        assert!(acc.add(second));
        assert!(!acc.add(edited));
        assert_eq!(acc.len(), 2);
    }

    #[test]
    fn test_finalize_is_idempotent() {
        let mut acc = ResultAccumulator::new();
        acc.add(record("a", 1, 3.0));
        let first = acc.finalize();
        let second = acc.finalize();
        assert_eq!(first, second);
        assert_eq!(acc.len(), 1);
    }
}
