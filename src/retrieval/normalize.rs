//! Conversion of raw backend responses into canonical results.
//!
//! Pure and side-effect free: failures are carried through as
//! [`BackendFailure`] records, missing metadata becomes the `"Unknown"`
//! sentinel, and keyword scores are dropped here (they live in a different
//! numeric space than vector distance and are never compared against it).

use std::collections::BTreeMap;

use super::fanout::{BackendResponse, RawHits};
use crate::backends::{KeywordHit, VectorHit};
use crate::error::BackendFailure;
use crate::model::{OriginKind, SearchResult, UNKNOWN_FIELD};

/// A backend response after normalization: canonical results, or the
/// recorded failure with an empty result set.
#[derive(Debug)]
pub struct NormalizedResponse {
    pub origin: OriginKind,
    pub collection: Option<String>,
    pub results: Vec<SearchResult>,
    pub failure: Option<BackendFailure>,
}

/// Normalize one backend response tuple.
pub fn normalize_response(response: BackendResponse) -> NormalizedResponse {
    let BackendResponse {
        origin,
        collection,
        outcome,
    } = response;

    match outcome {
        Ok(RawHits::Vector(hits)) => NormalizedResponse {
            origin,
            collection,
            results: hits.into_iter().map(normalize_vector_hit).collect(),
            failure: None,
        },
        Ok(RawHits::Keyword(hits)) => NormalizedResponse {
            origin,
            collection,
            results: hits.into_iter().map(normalize_keyword_hit).collect(),
            failure: None,
        },
        Err(e) => NormalizedResponse {
            failure: Some(BackendFailure {
                origin,
                collection: collection.clone(),
                reason: e.to_string(),
            }),
            origin,
            collection,
            results: Vec::new(),
        },
    }
}

fn normalize_vector_hit(hit: VectorHit) -> SearchResult {
    SearchResult {
        id: hit.id,
        content: hit.content,
        metadata: fill_required_fields(hit.metadata),
        distance: Some(hit.distance),
        origin: OriginKind::Vector,
    }
}

fn normalize_keyword_hit(hit: KeywordHit) -> SearchResult {
    SearchResult {
        id: hit.id,
        content: hit.content,
        metadata: fill_required_fields(hit.metadata),
        // BM25 score intentionally dropped, keyword hits carry no distance
        distance: None,
        origin: OriginKind::Keyword,
    }
}

/// Ensure `source` and `category` are always present so prompt-building
/// code never has to special-case absent fields.
fn fill_required_fields(mut metadata: BTreeMap<String, String>) -> BTreeMap<String, String> {
    for key in ["source", "category"] {
        metadata
            .entry(key.to_string())
            .or_insert_with(|| UNKNOWN_FIELD.to_string());
    }
    metadata
}
