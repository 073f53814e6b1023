//! ASIN discovery: matching catalogue sets to Amazon products.
//!
//! Phase 1 looks candidates up by barcode. Phase 2 runs a keyword search for
//! everything phase 1 could not place. Matching is pure; [`discover`] drives
//! a [`ProductSource`] through both phases and stops once the deadline passes,
//! abandoning a lookup still waiting on Keepa.

use serde::Serialize;
use tokio::time::Instant;

use brickdesk_core::DiscoveryStatus;

use crate::client::ProductSource;
use crate::types::KeepaProduct;

/// Maximum barcodes sent in one phase 1 lookup.
pub const CODE_BATCH_SIZE: usize = 100;

const CODE_CONFIDENCE: i16 = 100;
const TITLE_CONFIDENCE: i16 = 80;
const AMBIGUOUS_CONFIDENCE: i16 = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryCandidate {
    pub set_number: String,
    pub set_name: String,
    pub ean: Option<String>,
    pub upc: Option<String>,
}

impl DiscoveryCandidate {
    fn codes(&self) -> impl Iterator<Item = &str> {
        self.ean
            .as_deref()
            .into_iter()
            .chain(self.upc.as_deref())
            .filter(|c| !c.trim().is_empty())
    }

    fn has_codes(&self) -> bool {
        self.codes().next().is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMethod {
    Ean,
    Upc,
    Title,
}

impl MatchMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ean => "ean",
            Self::Upc => "upc",
            Self::Title => "title",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveryMatch {
    pub set_number: String,
    pub status: DiscoveryStatus,
    pub asin: Option<String>,
    pub match_method: Option<MatchMethod>,
    pub confidence: Option<i16>,
    pub amazon_title: Option<String>,
    pub alternative_asins: Vec<String>,
    pub error_message: Option<String>,
}

impl DiscoveryMatch {
    fn resolved(
        set_number: &str,
        status: DiscoveryStatus,
        chosen: &KeepaProduct,
        method: MatchMethod,
        confidence: i16,
        alternatives: Vec<String>,
    ) -> Self {
        Self {
            set_number: set_number.to_owned(),
            status,
            asin: Some(chosen.asin.clone()),
            match_method: Some(method),
            confidence: Some(confidence),
            amazon_title: chosen.title.clone(),
            alternative_asins: alternatives,
            error_message: None,
        }
    }

    fn not_found(set_number: &str) -> Self {
        Self {
            set_number: set_number.to_owned(),
            status: DiscoveryStatus::NotFound,
            asin: None,
            match_method: None,
            confidence: None,
            amazon_title: None,
            alternative_asins: Vec::new(),
            error_message: None,
        }
    }

    #[must_use]
    pub fn error(set_number: &str, message: impl Into<String>) -> Self {
        Self {
            status: DiscoveryStatus::Error,
            error_message: Some(message.into()),
            ..Self::not_found(set_number)
        }
    }
}

/// Results of one discovery pass. `unprocessed` holds set numbers with no
/// result because the deadline passed first.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryOutcome {
    pub matches: Vec<DiscoveryMatch>,
    pub unprocessed: Vec<String>,
}

/// `"75192-1"` → `"75192"`. Numbers without a numeric variant suffix are
/// returned unchanged.
#[must_use]
pub fn base_set_number(set_number: &str) -> &str {
    match set_number.rsplit_once('-') {
        Some((base, variant))
            if !base.is_empty()
                && !variant.is_empty()
                && variant.bytes().all(|b| b.is_ascii_digit()) =>
        {
            base
        }
        _ => set_number,
    }
}

#[must_use]
pub fn search_term(candidate: &DiscoveryCandidate) -> String {
    format!("LEGO {}", base_set_number(&candidate.set_number))
}

fn contains_word(haystack: &str, word: &str) -> bool {
    if word.is_empty() {
        return false;
    }
    haystack.match_indices(word).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + word.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

fn title_has_set_number(product: &KeepaProduct, base: &str) -> bool {
    product
        .title
        .as_deref()
        .is_some_and(|t| contains_word(t, base))
}

fn dedupe_by_asin<T>(hits: Vec<(&KeepaProduct, T)>) -> Vec<(&KeepaProduct, T)> {
    let mut seen = std::collections::HashSet::new();
    hits.into_iter()
        .filter(|(p, _)| seen.insert(p.asin.clone()))
        .collect()
}

/// Phase 1 matching. Returns a match for every candidate with at least one
/// product carrying its EAN or UPC; candidates with no hit are omitted.
#[must_use]
pub fn match_by_codes(
    candidates: &[DiscoveryCandidate],
    products: &[KeepaProduct],
) -> Vec<DiscoveryMatch> {
    let mut matches = Vec::new();

    for candidate in candidates {
        let hits: Vec<(&KeepaProduct, MatchMethod)> = products
            .iter()
            .filter_map(|p| {
                if candidate.ean.as_deref().is_some_and(|c| p.has_ean(c)) {
                    Some((p, MatchMethod::Ean))
                } else if candidate.upc.as_deref().is_some_and(|c| p.has_upc(c)) {
                    Some((p, MatchMethod::Upc))
                } else {
                    None
                }
            })
            .collect();
        let hits = dedupe_by_asin(hits);

        let m = match hits.as_slice() {
            [] => continue,
            [(product, method)] => DiscoveryMatch::resolved(
                &candidate.set_number,
                DiscoveryStatus::Found,
                product,
                *method,
                CODE_CONFIDENCE,
                Vec::new(),
            ),
            _ => {
                let base = base_set_number(&candidate.set_number);
                let preferred = hits
                    .iter()
                    .position(|(p, _)| title_has_set_number(p, base));
                let (status, index, confidence) = match preferred {
                    Some(i) => (DiscoveryStatus::Found, i, CODE_CONFIDENCE),
                    None => (DiscoveryStatus::Multiple, 0, AMBIGUOUS_CONFIDENCE),
                };
                let (chosen, method) = hits[index];
                let alternatives = hits
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != index)
                    .map(|(_, (p, _))| p.asin.clone())
                    .collect();
                DiscoveryMatch::resolved(
                    &candidate.set_number,
                    status,
                    chosen,
                    method,
                    confidence,
                    alternatives,
                )
            }
        };
        matches.push(m);
    }

    matches
}

/// Phase 2 matching against keyword search results.
///
/// A product qualifies when its title mentions LEGO and carries the base set
/// number as a whole word.
#[must_use]
pub fn match_by_title(candidate: &DiscoveryCandidate, products: &[KeepaProduct]) -> DiscoveryMatch {
    let base = base_set_number(&candidate.set_number);
    let mut seen = std::collections::HashSet::new();
    let hits: Vec<&KeepaProduct> = products
        .iter()
        .filter(|p| {
            p.title
                .as_deref()
                .is_some_and(|t| t.to_lowercase().contains("lego") && contains_word(t, base))
        })
        .filter(|p| seen.insert(p.asin.as_str()))
        .collect();

    match hits.as_slice() {
        [] => DiscoveryMatch::not_found(&candidate.set_number),
        [only] => DiscoveryMatch::resolved(
            &candidate.set_number,
            DiscoveryStatus::Found,
            only,
            MatchMethod::Title,
            TITLE_CONFIDENCE,
            Vec::new(),
        ),
        [first, rest @ ..] => DiscoveryMatch::resolved(
            &candidate.set_number,
            DiscoveryStatus::Multiple,
            first,
            MatchMethod::Title,
            AMBIGUOUS_CONFIDENCE,
            rest.iter().map(|p| p.asin.clone()).collect(),
        ),
    }
}

/// Packs candidates into lookups of at most [`CODE_BATCH_SIZE`] barcodes.
fn code_batches(candidates: Vec<DiscoveryCandidate>) -> Vec<Vec<DiscoveryCandidate>> {
    let mut batches: Vec<Vec<DiscoveryCandidate>> = Vec::new();
    let mut current = Vec::new();
    let mut codes = 0usize;

    for candidate in candidates {
        let n = candidate.codes().count();
        if codes + n > CODE_BATCH_SIZE && !current.is_empty() {
            batches.push(std::mem::take(&mut current));
            codes = 0;
        }
        codes += n;
        current.push(candidate);
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

/// Runs both discovery phases over `candidates`.
///
/// A Keepa call still running when `deadline` passes (typically sleeping out
/// a 429) is dropped. Its candidates, and everything not yet started, are
/// returned in [`DiscoveryOutcome::unprocessed`].
pub async fn discover(
    source: &dyn ProductSource,
    candidates: Vec<DiscoveryCandidate>,
    deadline: Instant,
) -> DiscoveryOutcome {
    let mut outcome = DiscoveryOutcome::default();
    let (coded, mut phase_two): (Vec<_>, Vec<_>) =
        candidates.into_iter().partition(DiscoveryCandidate::has_codes);

    for batch in code_batches(coded) {
        if Instant::now() >= deadline {
            outcome
                .unprocessed
                .extend(batch.into_iter().map(|c| c.set_number));
            continue;
        }

        let codes: Vec<String> = batch
            .iter()
            .flat_map(DiscoveryCandidate::codes)
            .map(str::to_owned)
            .collect();

        let Ok(lookup) = tokio::time::timeout_at(deadline, source.products_by_code(&codes)).await
        else {
            tracing::warn!(
                candidates = batch.len(),
                "barcode lookup overran the deadline"
            );
            outcome
                .unprocessed
                .extend(batch.into_iter().map(|c| c.set_number));
            continue;
        };
        match lookup {
            Ok(products) => {
                let found = match_by_codes(&batch, &products);
                let placed: std::collections::HashSet<&str> =
                    found.iter().map(|m| m.set_number.as_str()).collect();
                let leftovers: Vec<DiscoveryCandidate> = batch
                    .iter()
                    .filter(|c| !placed.contains(c.set_number.as_str()))
                    .cloned()
                    .collect();
                tracing::debug!(
                    codes = codes.len(),
                    matched = found.len(),
                    leftovers = leftovers.len(),
                    "barcode lookup complete"
                );
                outcome.matches.extend(found);
                phase_two.extend(leftovers);
            }
            Err(e) => {
                tracing::warn!(error = %e, candidates = batch.len(), "barcode lookup failed");
                let message = e.to_string();
                outcome.matches.extend(
                    batch
                        .iter()
                        .map(|c| DiscoveryMatch::error(&c.set_number, message.clone())),
                );
            }
        }
    }

    for candidate in phase_two {
        if Instant::now() >= deadline {
            outcome.unprocessed.push(candidate.set_number);
            continue;
        }

        let term = search_term(&candidate);
        let Ok(search) = tokio::time::timeout_at(deadline, source.search(&term)).await else {
            tracing::warn!(set_number = %candidate.set_number, "title search overran the deadline");
            outcome.unprocessed.push(candidate.set_number);
            continue;
        };
        match search {
            Ok(products) => outcome.matches.push(match_by_title(&candidate, &products)),
            Err(e) => {
                tracing::warn!(set_number = %candidate.set_number, error = %e, "title search failed");
                outcome
                    .matches
                    .push(DiscoveryMatch::error(&candidate.set_number, e.to_string()));
            }
        }
    }

    outcome
}

#[cfg(test)]
#[path = "discovery_test.rs"]
mod tests;
