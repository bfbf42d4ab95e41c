//! Review Extraction Module
//!
//! Turns one review element into a [`ReviewRecord`]. Each field is read on
//! its own; a field that is missing or unreadable becomes absent and the
//! rest of the review is still extracted.

use crate::config::{CompiledSelectors, RatingScale};
use crate::dom::Node;
use crate::types::{EmployeeStatus, ReviewRecord, SubRatingCategory, SubRatings};
use chrono::NaiveDate;
use log::{debug, trace};
use regex::Regex;
use scraper::Selector;
use std::sync::LazyLock;

static DATE_IN_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+(\d{1,2}),?\s+(\d{4})\b")
        .expect("valid date regex")
});

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:[.,]\d+)?").expect("valid number regex"));

static INTEGER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("valid integer regex"));

static TENURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(less than|more than|over|under)?\s*\b(a|an|one|\d+)\s+years?\b")
        .expect("valid tenure regex")
});

/// Why a single field came back absent. Never leaves this module.
#[derive(Debug)]
enum FieldError {
    Missing(&'static str),
    Unparsable { field: &'static str, raw: String },
}

fn recover<T>(result: Result<T, FieldError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(FieldError::Missing(field)) => {
            trace!("{} not present", field);
            None
        }
        Err(FieldError::Unparsable { field, raw }) => {
            trace!("{} unreadable: {:?}", field, raw);
            None
        }
    }
}

pub struct ReviewExtractor {
    selectors: CompiledSelectors,
    scale: RatingScale,
}

impl ReviewExtractor {
    pub fn new(selectors: CompiledSelectors, scale: RatingScale) -> Self {
        Self { selectors, scale }
    }

    /// `None` when the node has neither an overall rating nor a title/date,
    /// i.e. it is not a review at all.
    pub fn extract(&self, node: &Node) -> Option<ReviewRecord> {
        let s = &self.selectors;

        let review_date = recover(self.review_date(node));
        let title = recover(text_field(node, &s.title, "title"))
            .map(|t| strip_quotes(&t))
            .filter(|t| !t.is_empty());
        let overall_rating = recover(self.rating(node.find(&s.overall_rating), "overall_rating"));

        if overall_rating.is_none() && title.is_none() && review_date.is_none() {
            debug!("Skipping element without rating, title or date");
            return None;
        }

        let (employee_status, employee_position) = match recover(text_field(node, &s.author, "author")) {
            Some(author) => split_author(&author),
            None => (EmployeeStatus::Unknown, None),
        };

        let years_at_company = recover(
            text_field(node, &s.tenure, "tenure").and_then(|text| {
                parse_years(&text).ok_or(FieldError::Unparsable { field: "tenure", raw: text })
            }),
        );

        let helpful_votes = recover(text_field(node, &s.helpful, "helpful").and_then(|text| {
            INTEGER
                .find(&text)
                .and_then(|m| m.as_str().parse::<u32>().ok())
                .ok_or(FieldError::Unparsable { field: "helpful", raw: text })
        }))
        .unwrap_or(0);

        Some(ReviewRecord {
            review_id: self.review_id(node),
            review_date,
            employee_position,
            employee_location: recover(text_field(node, &s.location, "location")),
            employee_status,
            title,
            years_at_company,
            helpful_votes,
            pros_text: recover(text_field(node, &s.pros, "pros")),
            cons_text: recover(text_field(node, &s.cons, "cons")),
            advice_to_management_text: recover(text_field(node, &s.advice, "advice")),
            sub_ratings: self.sub_ratings(node),
            overall_rating,
        })
    }

    fn review_id(&self, node: &Node) -> Option<String> {
        let raw = node.attribute(&self.selectors.review_id_attribute)?;
        match INTEGER.find(&raw) {
            Some(digits) => Some(digits.as_str().to_string()),
            None => Some(raw),
        }
    }

    fn review_date(&self, node: &Node) -> Result<NaiveDate, FieldError> {
        let element = node.find(&self.selectors.date).ok_or(FieldError::Missing("review_date"))?;
        let raw = element
            .attribute("datetime")
            .or_else(|| element.non_empty_text())
            .ok_or(FieldError::Missing("review_date"))?;

        parse_review_date(&raw).ok_or(FieldError::Unparsable { field: "review_date", raw })
    }

    /// Rating from an element's `title` attribute, else its text.
    fn rating(&self, element: Option<Node>, field: &'static str) -> Result<f32, FieldError> {
        let element = element.ok_or(FieldError::Missing(field))?;
        let raw = element
            .attribute("title")
            .or_else(|| element.non_empty_text())
            .ok_or(FieldError::Missing(field))?;

        NUMBER
            .find(&raw)
            .and_then(|m| m.as_str().replace(',', ".").parse::<f32>().ok())
            .and_then(|value| self.scale.accept(value))
            .ok_or(FieldError::Unparsable { field, raw })
    }

    /// Items are mapped by label; an item without a label takes its slot.
    /// Labels outside the five categories are ignored.
    fn sub_ratings(&self, node: &Node) -> SubRatings {
        let s = &self.selectors;
        let mut ratings = SubRatings::default();

        for (slot, item) in node.find_all(&s.sub_rating_item).into_iter().enumerate() {
            let category = match item.find(&s.sub_rating_label).and_then(|l| l.non_empty_text()) {
                Some(label) => SubRatingCategory::from_label(&label),
                None => SubRatingCategory::from_slot(slot),
            };
            let Some(category) = category else {
                continue;
            };

            if ratings.get(category).is_none() {
                let value = recover(self.rating(item.find(&s.sub_rating_value), "sub_rating"));
                ratings.set(category, value);
            }
        }

        ratings
    }
}

fn text_field(node: &Node, selector: &Selector, field: &'static str) -> Result<String, FieldError> {
    node.find(selector)
        .and_then(|element| element.non_empty_text())
        .ok_or(FieldError::Missing(field))
}

fn strip_quotes(text: &str) -> String {
    text.trim()
        .trim_matches(|c| matches!(c, '"' | '\u{201c}' | '\u{201d}'))
        .trim()
        .to_string()
}

/// "Current Employee - Software Engineer" -> (Current, "Software Engineer").
pub fn split_author(text: &str) -> (EmployeeStatus, Option<String>) {
    let lower = text.trim().to_lowercase();
    let status = if lower.starts_with("current") {
        EmployeeStatus::Current
    } else if lower.starts_with("former") {
        EmployeeStatus::Former
    } else {
        return (EmployeeStatus::Unknown, Some(text.trim().to_string()));
    };

    let position = text
        .split_once(" - ")
        .or_else(|| text.split_once('-'))
        .map(|(_, rest)| rest.trim())
        .filter(|rest| !rest.is_empty())
        .map(str::to_string);

    (status, position)
}

pub fn parse_review_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();

    for format in ["%Y-%m-%d", "%b %d, %Y", "%B %d, %Y", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date);
        }
    }

    // ISO timestamps: 2018-06-05T13:04:53
    if let Some(date) = raw.get(..10).and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()) {
        return Some(date);
    }

    // JavaScript dates: Wed Jun 06 2018 13:04:53 GMT-0700 (PDT)
    let head = raw.split_whitespace().take(4).collect::<Vec<_>>().join(" ");
    if let Ok(date) = NaiveDate::parse_from_str(&head, "%a %b %d %Y") {
        return Some(date);
    }

    let caps = DATE_IN_TEXT.captures(raw)?;
    let normalized = format!("{} {} {}", &caps[1], &caps[2], &caps[3]);
    NaiveDate::parse_from_str(&normalized, "%b %d %Y").ok()
}

/// Whole years at the company implied by the tenure phrase:
/// "less than N years" -> N - 1 (never below 0), "more than N years" -> N,
/// "N years" -> N. So "less than a year" -> 0 and "less than 3 years" -> 2.
pub fn parse_years(text: &str) -> Option<f32> {
    let caps = TENURE.captures(text)?;
    let count = match caps[2].to_lowercase().as_str() {
        "a" | "an" | "one" => 1.0,
        digits => digits.parse::<f32>().ok()?,
    };

    let qualifier = caps.get(1).map(|m| m.as_str().to_lowercase());
    match qualifier.as_deref() {
        Some("less than") | Some("under") => Some((count - 1.0).max(0.0)),
        _ => Some(count),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReviewSelectorConfig;
    use crate::dom::PageDocument;

    const FULL_REVIEW: &str = r#"
    <ol>
      <li class="empReview" id="empReview_2140821">
        <time class="date" datetime="2018-06-05">Jun 5, 2018</time>
        <span class="rating"><span class="value-title" title="4.0"></span></span>
        <div class="subRatings"><ul>
          <li><div class="minor">Work/Life Balance</div><span class="gdBars" title="5.0"></span></li>
          <li><div class="minor">Culture &amp; Values</div><span class="gdBars" title="4.0"></span></li>
          <li><div class="minor">Career Opportunities</div><span class="gdBars" title="3.0"></span></li>
          <li><div class="minor">Compensation and Benefits</div><span class="gdBars" title="3.5"></span></li>
          <li><div class="minor">Senior Management</div><span class="gdBars" title="2.0"></span></li>
        </ul></div>
        <a class="reviewLink"><span class="summary">"Great place to grow"</span></a>
        <span class="authorJobTitle">Current Employee - Software Engineer</span>
        <span class="authorLocation">San Francisco, CA</span>
        <p class="mainText">I have been working at Acme Corp full-time for more than 3 years</p>
        <p class="pros">Smart coworkers</p>
        <p class="cons">Long hours</p>
        <p class="adviceMgmt">Hire more people</p>
        <div class="helpfulReviews">Helpful (12)</div>
      </li>
    </ol>"#;

    fn extractor() -> ReviewExtractor {
        let selectors = ReviewSelectorConfig::default().compile().unwrap();
        ReviewExtractor::new(selectors, RatingScale::default())
    }

    fn extract_first(html: &str) -> Option<ReviewRecord> {
        let extractor = extractor();
        let doc = PageDocument::parse(html);
        let nodes = doc.find_all(&extractor.selectors.review);
        extractor.extract(&nodes[0])
    }

    #[test]
    fn test_full_review() {
        let record = extract_first(FULL_REVIEW).unwrap();
        assert_eq!(record.review_id.as_deref(), Some("2140821"));
        assert_eq!(record.review_date, NaiveDate::from_ymd_opt(2018, 6, 5));
        assert_eq!(record.title.as_deref(), Some("Great place to grow"));
        assert_eq!(record.employee_status, EmployeeStatus::Current);
        assert_eq!(record.employee_position.as_deref(), Some("Software Engineer"));
        assert_eq!(record.employee_location.as_deref(), Some("San Francisco, CA"));
        assert_eq!(record.years_at_company, Some(3.0));
        assert_eq!(record.helpful_votes, 12);
        assert_eq!(record.pros_text.as_deref(), Some("Smart coworkers"));
        assert_eq!(record.advice_to_management_text.as_deref(), Some("Hire more people"));
        assert_eq!(record.overall_rating, Some(4.0));
        assert_eq!(record.sub_ratings.get(SubRatingCategory::WorkLifeBalance), Some(5.0));
        assert_eq!(record.sub_ratings.get(SubRatingCategory::CompensationAndBenefits), Some(3.5));
        assert_eq!(record.sub_ratings.get(SubRatingCategory::SeniorManagement), Some(2.0));
    }

    #[test]
    fn test_optional_sections_missing() {
        let html = FULL_REVIEW
            .replace(r#"<p class="adviceMgmt">Hire more people</p>"#, "")
            .replace(r#"<div class="helpfulReviews">Helpful (12)</div>"#, "")
            .replace(r#"<span class="gdBars" title="4.0"></span>"#, r#"<span class="gdBars" title="n/a"></span>"#)
            .replace(r#"<li><div class="minor">Senior Management</div><span class="gdBars" title="2.0"></span></li>"#, "");

        let record = extract_first(&html).unwrap();
        assert!(record.advice_to_management_text.is_none());
        assert_eq!(record.helpful_votes, 0);
        assert!(record.sub_ratings.get(SubRatingCategory::CultureAndValues).is_none());
        assert!(record.sub_ratings.get(SubRatingCategory::SeniorManagement).is_none());
        assert_eq!(record.sub_ratings.present(), 3);
        assert_eq!(record.cons_text.as_deref(), Some("Long hours"));
        assert_eq!(record.overall_rating, Some(4.0));
    }

    #[test]
    fn test_non_review_element_is_skipped() {
        let html = r#"<ol><li class="empReview"><a href="/help">Was this page helpful?</a></li></ol>"#;
        assert!(extract_first(html).is_none());
    }

    #[test]
    fn test_title_only_review_is_kept() {
        let html = r#"<ol><li class="empReview"><span class="summary">Meh</span></li></ol>"#;
        let record = extract_first(html).unwrap();
        assert_eq!(record.title.as_deref(), Some("Meh"));
        assert!(record.overall_rating.is_none());
        assert_eq!(record.employee_status, EmployeeStatus::Unknown);
    }

    #[test]
    fn test_out_of_scale_rating_is_absent() {
        let html = FULL_REVIEW.replace(r#"<span class="value-title" title="4.0">"#, r#"<span class="value-title" title="9.0">"#);
        let record = extract_first(&html).unwrap();
        assert!(record.overall_rating.is_none());
        assert!(record.title.is_some());
    }

    #[test]
    fn test_unlabelled_sub_ratings_use_slots() {
        let html = r#"<ol><li class="empReview"><span class="summary">t</span>
            <div class="subRatings"><ul>
              <li><span class="gdBars" title="1.0"></span></li>
              <li><span class="gdBars" title="2.0"></span></li>
            </ul></div></li></ol>"#;
        let record = extract_first(html).unwrap();
        assert_eq!(record.sub_ratings.get(SubRatingCategory::WorkLifeBalance), Some(1.0));
        assert_eq!(record.sub_ratings.get(SubRatingCategory::CultureAndValues), Some(2.0));
        assert!(record.sub_ratings.get(SubRatingCategory::CareerOpportunities).is_none());
    }

    #[test]
    fn test_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2018, 6, 5);
        assert_eq!(parse_review_date("2018-06-05"), expected);
        assert_eq!(parse_review_date("2018-06-05T13:04:53Z"), expected);
        assert_eq!(parse_review_date("Jun 5, 2018"), expected);
        assert_eq!(parse_review_date("June 5, 2018"), expected);
        assert_eq!(parse_review_date("Tue Jun 05 2018 13:04:53 GMT-0700 (PDT)"), expected);
        assert_eq!(parse_review_date("Jun 5, 2018 - Software Engineer in Austin"), expected);
        assert_eq!(parse_review_date("yesterday"), None);
    }

    #[test]
    fn test_tenure() {
        assert_eq!(parse_years("I worked at Acme full-time for less than a year"), Some(0.0));
        assert_eq!(parse_years("I have been working at Acme for more than 5 years"), Some(5.0));
        assert_eq!(parse_years("I worked at Acme full-time for a year"), Some(1.0));
        assert_eq!(parse_years("2 years"), Some(2.0));
        assert_eq!(parse_years("I worked at Acme full-time for less than 3 years"), Some(2.0));
        assert_eq!(parse_years("under 1 year"), Some(0.0));
        assert_eq!(parse_years("I worked at Acme full-time"), None);
    }

    #[test]
    fn test_author_split() {
        assert_eq!(
            split_author("Former Employee - Anonymous Employee"),
            (EmployeeStatus::Former, Some("Anonymous Employee".to_string()))
        );
        assert_eq!(split_author("Current Employee"), (EmployeeStatus::Current, None));
        assert_eq!(
            split_author("Sales Associate"),
            (EmployeeStatus::Unknown, Some("Sales Associate".to_string()))
        );
    }
}
