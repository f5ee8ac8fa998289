//! Daily sentiment aggregation.
//!
//! Days are UTC calendar dates, matching the UTC instants the harvester
//! stamps on each article. An article posted at 23:30 UTC therefore lands on
//! that UTC date regardless of the viewer's local zone.

use crate::models::{Article, DaySentimentBucket, Sentiment, SentimentBreakdown};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeMap;

/// Daily series plus the articles posted on the reference day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentimentSummary {
    /// One bucket per date with at least one article, ascending.
    pub days: Vec<DaySentimentBucket>,
    /// Articles posted on `reference`'s date, in input order.
    pub today: Vec<Article>,
}

/// Bucket `articles` by UTC posting date and collect those posted "today".
///
/// Unlabeled articles weigh zero but still mark their day in the series.
pub fn summarize(articles: &[Article], reference: DateTime<Utc>) -> SentimentSummary {
    let today_date: NaiveDate = reference.date_naive();
    let mut by_date: BTreeMap<NaiveDate, i64> = BTreeMap::new();
    let mut today = Vec::new();

    for article in articles {
        let date = article.posted_at.date_naive();
        *by_date.entry(date).or_default() += article.sentiment.map_or(0, Sentiment::weight);
        if date == today_date {
            today.push(article.clone());
        }
    }

    SentimentSummary {
        days: by_date
            .into_iter()
            .map(|(date, net_score)| DaySentimentBucket { date, net_score })
            .collect(),
        today,
    }
}

impl SentimentBreakdown {
    pub fn from_articles(articles: &[Article]) -> Self {
        articles
            .iter()
            .fold(Self::default(), |mut acc, article| {
                match article.sentiment {
                    Some(Sentiment::Positive) => acc.positive += 1,
                    Some(Sentiment::Negative) => acc.negative += 1,
                    Some(Sentiment::Neutral) => acc.neutral += 1,
                    None => acc.unlabeled += 1,
                }
                acc
            })
    }

    pub fn labeled(&self) -> usize {
        self.positive + self.negative + self.neutral
    }

    /// Fraction of labeled articles carrying `sentiment`; zero when none are labeled.
    pub fn share(&self, sentiment: Sentiment) -> f64 {
        let labeled = self.labeled();
        if labeled == 0 {
            return 0.0;
        }
        let count = match sentiment {
            Sentiment::Positive => self.positive,
            Sentiment::Negative => self.negative,
            Sentiment::Neutral => self.neutral,
        };
        count as f64 / labeled as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn labeled(y: i32, m: u32, d: u32, h: u32, sentiment: Option<Sentiment>) -> Article {
        Article {
            headline: format!("{y}-{m}-{d} {h}h {sentiment:?}"),
            posted_at: Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap(),
            snippet: String::new(),
            link: None,
            sentiment,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn five_articles() -> Vec<Article> {
        use Sentiment::*;
        vec![
            labeled(2024, 1, 2, 9, Some(Positive)),
            labeled(2024, 1, 1, 10, Some(Positive)),
            labeled(2024, 1, 2, 11, Some(Neutral)),
            labeled(2024, 1, 1, 12, Some(Negative)),
            labeled(2024, 1, 2, 13, Some(Positive)),
        ]
    }

    #[test]
    fn test_net_score_per_day_ascending() {
        let reference = Utc.with_ymd_and_hms(2024, 1, 2, 18, 0, 0).unwrap();
        let summary = summarize(&five_articles(), reference);
        assert_eq!(
            summary.days,
            vec![
                DaySentimentBucket { date: date(2024, 1, 1), net_score: 0 },
                DaySentimentBucket { date: date(2024, 1, 2), net_score: 2 },
            ]
        );
    }

    #[test]
    fn test_today_subset_preserves_order() {
        let reference = Utc.with_ymd_and_hms(2024, 1, 2, 18, 0, 0).unwrap();
        let summary = summarize(&five_articles(), reference);
        let hours: Vec<u32> = summary
            .today
            .iter()
            .map(|a| chrono::Timelike::hour(&a.posted_at))
            .collect();
        assert_eq!(hours, [9, 11, 13]);
    }

    #[test]
    fn test_summarize_is_idempotent() {
        let articles = five_articles();
        let reference = Utc.with_ymd_and_hms(2024, 1, 2, 18, 0, 0).unwrap();
        let first = summarize(&articles, reference);
        let second = summarize(&articles, reference);
        assert_eq!(first, second);
        for _ in 0..10 {
            assert_eq!(summarize(&articles, reference).days, first.days);
        }
    }

    #[test]
    fn test_utc_day_boundary() {
        let articles = vec![
            labeled(2024, 1, 1, 23, Some(Sentiment::Positive)),
            labeled(2024, 1, 2, 0, Some(Sentiment::Negative)),
        ];
        let reference = Utc.with_ymd_and_hms(2024, 1, 2, 0, 30, 0).unwrap();
        let summary = summarize(&articles, reference);
        assert_eq!(
            summary.days,
            vec![
                DaySentimentBucket { date: date(2024, 1, 1), net_score: 1 },
                DaySentimentBucket { date: date(2024, 1, 2), net_score: -1 },
            ]
        );
        assert_eq!(summary.today.len(), 1);
        assert_eq!(summary.today[0].sentiment, Some(Sentiment::Negative));
    }

    #[test]
    fn test_unlabeled_articles_weigh_zero() {
        let articles = vec![
            labeled(2024, 1, 1, 9, None),
            labeled(2024, 1, 3, 9, Some(Sentiment::Negative)),
            labeled(2024, 1, 3, 10, None),
        ];
        let reference = Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap();
        let summary = summarize(&articles, reference);
        assert_eq!(
            summary.days,
            vec![
                DaySentimentBucket { date: date(2024, 1, 1), net_score: 0 },
                DaySentimentBucket { date: date(2024, 1, 3), net_score: -1 },
            ]
        );
        assert!(summary.today.is_empty());
    }

    #[test]
    fn test_empty_input() {
        let summary = summarize(&[], Utc::now());
        assert!(summary.days.is_empty());
        assert!(summary.today.is_empty());
    }

    #[test]
    fn test_breakdown_counts_and_shares() {
        let mut articles = five_articles();
        articles.push(labeled(2024, 1, 2, 14, None));
        let breakdown = SentimentBreakdown::from_articles(&articles);
        assert_eq!(
            breakdown,
            SentimentBreakdown { positive: 3, negative: 1, neutral: 1, unlabeled: 1 }
        );
        assert_eq!(breakdown.labeled(), 5);
        assert!((breakdown.share(Sentiment::Positive) - 0.6).abs() < f64::EPSILON);
        assert!((breakdown.share(Sentiment::Negative) - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn test_breakdown_share_without_labels_is_zero() {
        let breakdown = SentimentBreakdown::from_articles(&[labeled(2024, 1, 1, 9, None)]);
        assert_eq!(breakdown.share(Sentiment::Neutral), 0.0);
    }
}
