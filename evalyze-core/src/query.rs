//! Query engine: score filtering, sorting and pagination over result records.
//!
//! Queries are pure. They borrow the canonical records and return a page of
//! references, so repeated or interleaved queries never affect each other.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::aggregate::AggregatedQuestion;
use crate::error::QueryError;
use crate::types::{OutcomeRecord, QuestionId};

/// Anything the query engine can filter and sort.
pub trait QueryItem {
    fn question_id(&self) -> &QuestionId;

    /// Score on a 0–100 scale.
    fn score(&self) -> f64;

    /// `(correct, evaluations)` this item contributes to summary counts.
    fn tally(&self) -> (usize, usize);
}

impl QueryItem for OutcomeRecord {
    fn question_id(&self) -> &QuestionId {
        &self.question_id
    }

    fn score(&self) -> f64 {
        if self.is_correct { 100.0 } else { 0.0 }
    }

    fn tally(&self) -> (usize, usize) {
        (usize::from(self.is_correct), 1)
    }
}

impl QueryItem for AggregatedQuestion {
    fn question_id(&self) -> &QuestionId {
        &self.question_id
    }

    fn score(&self) -> f64 {
        self.run_accuracy
    }

    fn tally(&self) -> (usize, usize) {
        (self.correct_count, self.run_count)
    }
}

/// Sort order for query results. All orders are stable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    ById,
    ByScoreAsc,
    ByScoreDesc,
}

/// Inclusive score range within `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreRange {
    low: f64,
    high: f64,
}

impl Default for ScoreRange {
    fn default() -> Self {
        Self::FULL
    }
}

impl ScoreRange {
    pub const FULL: Self = Self {
        low: 0.0,
        high: 100.0,
    };

    pub fn new(low: f64, high: f64) -> Result<Self, QueryError> {
        // NaN fails every comparison below
        if !(0.0..=100.0).contains(&low) || !(0.0..=100.0).contains(&high) || low > high {
            return Err(QueryError::InvalidScoreRange { low, high });
        }
        Ok(Self { low, high })
    }

    pub fn low(&self) -> f64 {
        self.low
    }

    pub fn high(&self) -> f64 {
        self.high
    }

    /// The full range disables filtering altogether.
    pub fn is_full(&self) -> bool {
        self.low <= 0.0 && self.high >= 100.0
    }

    pub fn contains(&self, score: f64) -> bool {
        self.low <= score && score <= self.high
    }
}

/// Filter, sort and page parameters for one query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QueryParams {
    pub score_range: ScoreRange,
    pub sort: SortKey,
    pub page_size: usize,
    /// 1-based; must lie within `1..=total_pages`.
    pub page: usize,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            score_range: ScoreRange::FULL,
            sort: SortKey::ById,
            page_size: 20,
            page: 1,
        }
    }
}

/// Correct and incorrect evaluations across the filtered records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FilterSummary {
    pub correct: usize,
    pub incorrect: usize,
}

/// One page of query results plus counts over the whole filtered sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryPage<'a, T> {
    pub items: Vec<&'a T>,
    /// Records that passed the filter.
    pub total_count: usize,
    pub total_pages: usize,
    pub page: usize,
    pub page_size: usize,
    pub unfiltered_count: usize,
    pub summary: FilterSummary,
}

impl<T> QueryPage<'_, T> {
    pub fn is_filtered(&self) -> bool {
        self.total_count != self.unfiltered_count
    }

    /// 1-based position of the first item on this page.
    pub fn first_position(&self) -> usize {
        (self.page - 1) * self.page_size + 1
    }
}

/// `max(1, ceil(count / page_size))`.
pub fn total_pages(count: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 1;
    }
    count.div_ceil(page_size).max(1)
}

/// Clamp a requested page into `1..=total_pages`.
pub fn clamp_page(page: usize, total_pages: usize) -> usize {
    page.clamp(1, total_pages.max(1))
}

/// Filter, sort and paginate `records` without modifying them.
pub fn query<'a, T: QueryItem>(
    records: &'a [T],
    params: &QueryParams,
) -> Result<QueryPage<'a, T>, QueryError> {
    if params.page_size == 0 {
        return Err(QueryError::InvalidPageSize);
    }

    let range = params.score_range;
    let mut filtered: Vec<&T> = if range.is_full() {
        records.iter().collect()
    } else {
        records.iter().filter(|r| range.contains(r.score())).collect()
    };
    sort_items(&mut filtered, params.sort);

    let total_count = filtered.len();
    let total_pages = total_pages(total_count, params.page_size);
    if params.page == 0 || params.page > total_pages {
        return Err(QueryError::PageOutOfRange {
            page: params.page,
            total_pages,
        });
    }

    let summary = filtered
        .iter()
        .fold(FilterSummary::default(), |mut acc, item| {
            let (correct, evaluations) = item.tally();
            acc.correct += correct;
            acc.incorrect += evaluations.saturating_sub(correct);
            acc
        });

    let items: Vec<&T> = filtered
        .into_iter()
        .skip((params.page - 1) * params.page_size)
        .take(params.page_size)
        .collect();

    tracing::debug!(
        unfiltered = records.len(),
        matched = total_count,
        page = params.page,
        total_pages,
        "Query evaluated"
    );

    Ok(QueryPage {
        items,
        total_count,
        total_pages,
        page: params.page,
        page_size: params.page_size,
        unfiltered_count: records.len(),
        summary,
    })
}

fn sort_items<T: QueryItem>(items: &mut [&T], sort: SortKey) {
    match sort {
        SortKey::ById => items.sort_by(|a, b| a.question_id().cmp(b.question_id())),
        SortKey::ByScoreAsc => items.sort_by(|a, b| compare_scores(a.score(), b.score())),
        SortKey::ByScoreDesc => items.sort_by(|a, b| compare_scores(b.score(), a.score())),
    }
}

fn compare_scores(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}
