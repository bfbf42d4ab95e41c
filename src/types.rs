use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Output columns, in file order.
pub const COLUMNS: [&str; 16] = [
    "review_date",
    "employee_position",
    "employee_location",
    "employee_status",
    "title",
    "years_at_company",
    "helpful_votes",
    "pros_text",
    "cons_text",
    "advice_to_management_text",
    "rating_category_1",
    "rating_category_2",
    "rating_category_3",
    "rating_category_4",
    "rating_category_5",
    "overall_rating",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmployeeStatus {
    Current,
    Former,
    #[default]
    Unknown,
}

/// The five sub-rating slots, in column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubRatingCategory {
    WorkLifeBalance,
    CultureAndValues,
    CareerOpportunities,
    CompensationAndBenefits,
    SeniorManagement,
}

impl SubRatingCategory {
    pub const ALL: [SubRatingCategory; 5] = [
        SubRatingCategory::WorkLifeBalance,
        SubRatingCategory::CultureAndValues,
        SubRatingCategory::CareerOpportunities,
        SubRatingCategory::CompensationAndBenefits,
        SubRatingCategory::SeniorManagement,
    ];

    pub fn slot(self) -> usize {
        match self {
            SubRatingCategory::WorkLifeBalance => 0,
            SubRatingCategory::CultureAndValues => 1,
            SubRatingCategory::CareerOpportunities => 2,
            SubRatingCategory::CompensationAndBenefits => 3,
            SubRatingCategory::SeniorManagement => 4,
        }
    }

    pub fn from_slot(slot: usize) -> Option<Self> {
        Self::ALL.get(slot).copied()
    }

    /// Map a label as displayed on the review ("Work/Life Balance", "Culture & Values", ...).
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.to_lowercase();
        if label.contains("balance") || label.contains("work/life") {
            Some(SubRatingCategory::WorkLifeBalance)
        } else if label.contains("culture") {
            Some(SubRatingCategory::CultureAndValues)
        } else if label.contains("career") {
            Some(SubRatingCategory::CareerOpportunities)
        } else if label.contains("comp") || label.contains("benefit") {
            Some(SubRatingCategory::CompensationAndBenefits)
        } else if label.contains("senior") || label.contains("management") {
            Some(SubRatingCategory::SeniorManagement)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SubRatings {
    values: [Option<f32>; 5],
}

impl SubRatings {
    pub fn get(&self, category: SubRatingCategory) -> Option<f32> {
        self.values[category.slot()]
    }

    pub fn set(&mut self, category: SubRatingCategory, value: Option<f32>) {
        self.values[category.slot()] = value;
    }

    pub fn present(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }
}

/// One scraped review.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReviewRecord {
    /// Site-provided id, when the markup exposes one. Not an output column.
    pub review_id: Option<String>,
    pub review_date: Option<NaiveDate>,
    pub employee_position: Option<String>,
    pub employee_location: Option<String>,
    pub employee_status: EmployeeStatus,
    pub title: Option<String>,
    pub years_at_company: Option<f32>,
    pub helpful_votes: u32,
    pub pros_text: Option<String>,
    pub cons_text: Option<String>,
    pub advice_to_management_text: Option<String>,
    pub sub_ratings: SubRatings,
    pub overall_rating: Option<f32>,
}

/// Flat row written to CSV/JSON. Every column is always present.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewRow {
    pub review_date: Option<NaiveDate>,
    pub employee_position: Option<String>,
    pub employee_location: Option<String>,
    pub employee_status: EmployeeStatus,
    pub title: Option<String>,
    pub years_at_company: Option<f32>,
    pub helpful_votes: u32,
    pub pros_text: Option<String>,
    pub cons_text: Option<String>,
    pub advice_to_management_text: Option<String>,
    pub rating_category_1: Option<f32>,
    pub rating_category_2: Option<f32>,
    pub rating_category_3: Option<f32>,
    pub rating_category_4: Option<f32>,
    pub rating_category_5: Option<f32>,
    pub overall_rating: Option<f32>,
}

impl ReviewRecord {
    pub fn to_row(&self) -> ReviewRow {
        let sub = |c| self.sub_ratings.get(c);
        ReviewRow {
            review_date: self.review_date,
            employee_position: self.employee_position.clone(),
            employee_location: self.employee_location.clone(),
            employee_status: self.employee_status,
            title: self.title.clone(),
            years_at_company: self.years_at_company,
            helpful_votes: self.helpful_votes,
            pros_text: self.pros_text.clone(),
            cons_text: self.cons_text.clone(),
            advice_to_management_text: self.advice_to_management_text.clone(),
            rating_category_1: sub(SubRatingCategory::WorkLifeBalance),
            rating_category_2: sub(SubRatingCategory::CultureAndValues),
            rating_category_3: sub(SubRatingCategory::CareerOpportunities),
            rating_category_4: sub(SubRatingCategory::CompensationAndBenefits),
            rating_category_5: sub(SubRatingCategory::SeniorManagement),
            overall_rating: self.overall_rating,
        }
    }
}

/// Ordered reviews, first-seen order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReviewDataset {
    pub records: Vec<ReviewRecord>,
}

impl ReviewDataset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn rows(&self) -> Vec<ReviewRow> {
        self.records.iter().map(ReviewRecord::to_row).collect()
    }
}

/// Why pagination ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StopReason {
    Limit,
    DateCutoff,
    Exhausted,
    Stuck,
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sub_rating_labels() {
        assert_eq!(
            SubRatingCategory::from_label("Work/Life Balance"),
            Some(SubRatingCategory::WorkLifeBalance)
        );
        assert_eq!(
            SubRatingCategory::from_label("Culture & Values"),
            Some(SubRatingCategory::CultureAndValues)
        );
        assert_eq!(
            SubRatingCategory::from_label("Comp & Benefits"),
            Some(SubRatingCategory::CompensationAndBenefits)
        );
        assert_eq!(
            SubRatingCategory::from_label("Senior Management"),
            Some(SubRatingCategory::SeniorManagement)
        );
        assert_eq!(SubRatingCategory::from_label("Diversity & Inclusion"), None);
    }

    #[test]
    fn test_row_keeps_every_column() {
        let record = ReviewRecord {
            title: Some("Great place".to_string()),
            overall_rating: Some(4.0),
            ..Default::default()
        };
        let json = serde_json::to_value(record.to_row()).unwrap();
        let object = json.as_object().unwrap();
        assert_eq!(object.len(), COLUMNS.len());
        for column in COLUMNS {
            assert!(object.contains_key(column), "missing column {}", column);
        }
        assert!(object["advice_to_management_text"].is_null());
        assert_eq!(object["employee_status"], "UNKNOWN");
    }
}
