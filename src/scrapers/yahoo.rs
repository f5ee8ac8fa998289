//! Yahoo News search result page extraction.
//!
//! A result page lists each story in its own card:
//!
//! ```html
//! <div class="NewsArticle">
//!   <a class="thmb" href="https://..." title="Headline"></a>
//!   <h4 class="s-title"><a href="https://...">Headline</a></h4>
//!   <span class="s-time">· 3 hours ago</span>
//!   <p class="s-desc">Teaser text...</p>
//! </div>
//! <a class="next" href="https://news.search.yahoo.com/search?p=...&b=11">Next</a>
//! ```
//!
//! Selectors come from [`SelectorConfig`] and are compiled once per
//! [`PageSelectors`]; parsing a page is synchronous and never fails.

use crate::config::SelectorConfig;
use crate::error::ConfigError;
use crate::models::RawFragment;
use itertools::Itertools;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

/// Everything the harvester needs from one result page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPage {
    pub fragments: Vec<RawFragment>,
    /// Raw `href` of the next-page link, possibly relative.
    pub next: Option<String>,
}

/// Compiled selectors for one page layout.
#[derive(Debug, Clone)]
pub struct PageSelectors {
    article: Selector,
    headline: Selector,
    posted: Selector,
    snippet: Selector,
    link: Selector,
    next_page: Selector,
}

impl PageSelectors {
    pub fn compile(config: &SelectorConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            article: compile_one("article", &config.article)?,
            headline: compile_one("headline", &config.headline)?,
            posted: compile_one("posted", &config.posted)?,
            snippet: compile_one("snippet", &config.snippet)?,
            link: compile_one("link", &config.link)?,
            next_page: compile_one("next_page", &config.next_page)?,
        })
    }

    /// Extract every listing and the next-page link from `html`.
    pub fn parse_page(&self, html: &str) -> ParsedPage {
        let document = Html::parse_document(html);

        let fragments = document
            .select(&self.article)
            .map(|card| self.fragment(card))
            .collect::<Vec<_>>();

        let next = document
            .select(&self.next_page)
            .find_map(|a| a.value().attr("href"))
            .map(str::trim)
            .filter(|href| !href.is_empty())
            .map(str::to_string);

        debug!(fragments = fragments.len(), has_next = next.is_some(), "Parsed result page");
        ParsedPage { fragments, next }
    }

    fn fragment(&self, card: ElementRef<'_>) -> RawFragment {
        let anchor = card.select(&self.link).next();

        let headline = first_text(card, &self.headline).or_else(|| {
            anchor
                .and_then(|a| a.value().attr("title"))
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
        });

        RawFragment {
            headline,
            posted: first_text(card, &self.posted),
            snippet: first_text(card, &self.snippet),
            link: anchor
                .and_then(|a| a.value().attr("href"))
                .map(str::trim)
                .filter(|href| !href.is_empty())
                .map(str::to_string),
        }
    }
}

fn compile_one(name: &'static str, selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|e| ConfigError::Selector {
        name,
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

/// Whitespace-normalized text of the first match, if it has any.
fn first_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    scope
        .select(selector)
        .next()
        .map(|el| el.text().flat_map(str::split_whitespace).join(" "))
        .filter(|text| !text.is_empty())
}
