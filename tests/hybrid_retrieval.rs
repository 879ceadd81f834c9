//! End-to-end tests for the hybrid retriever against scripted backends.

mod helpers;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use helpers::{keyword_hit, vector_hit, StubKeywordBackend, StubVectorBackend};
use mediarag::backends::CollectionRegistry;
use mediarag::embeddings::MockEmbedder;
use mediarag::model::{CollectionSet, OriginKind};
use mediarag::{HybridRetriever, RetrievalError};

fn registry(names: &[&str]) -> CollectionRegistry {
    CollectionRegistry::new(names.iter().map(|s| s.to_string()).collect())
}

fn retriever(
    vector: StubVectorBackend,
    keyword: StubKeywordBackend,
    collections: &[&str],
) -> HybridRetriever {
    HybridRetriever::new(
        Arc::new(MockEmbedder::new(16)),
        Arc::new(vector),
        Arc::new(keyword),
        registry(collections),
    )
    .with_backend_timeout(Duration::from_millis(200))
}

#[tokio::test]
async fn merges_three_collections_and_keyword_dup() {
    // Three collections with distances [0.1, 0.3, 0.5], [0.2], [];
    // keyword returns two hits, one colliding with the 0.3-distance hit.
    let vector = StubVectorBackend::new()
        .with_hits(
            "broadcast_transcripts",
            vec![
                vector_hit("a", 0.1),
                vector_hit("c", 0.3),
                vector_hit("e", 0.5),
            ],
        )
        .with_hits("production_metadata", vec![vector_hit("b", 0.2)])
        .with_hits("technical_docs", vec![]);
    let keyword = StubKeywordBackend::new().with_hits(vec![keyword_hit("c"), keyword_hit("z")]);

    let retriever = retriever(
        vector,
        keyword,
        &["broadcast_transcripts", "production_metadata", "technical_docs"],
    );

    let results = retriever
        .search("uplink failure", 3, None, None)
        .await
        .unwrap();

    let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);

    // The colliding id keeps its vector occurrence
    assert_eq!(results[2].origin, OriginKind::Vector);
    assert_eq!(results[2].distance, Some(0.3));
}

#[tokio::test]
async fn output_is_bounded_and_duplicate_free() {
    let vector = StubVectorBackend::new().with_hits(
        "broadcast_transcripts",
        vec![
            vector_hit("a", 0.1),
            vector_hit("b", 0.2),
            vector_hit("c", 0.3),
            vector_hit("d", 0.4),
        ],
    );
    let keyword =
        StubKeywordBackend::new().with_hits(vec![keyword_hit("a"), keyword_hit("b"), keyword_hit("x")]);

    let retriever = retriever(vector, keyword, &["broadcast_transcripts"]);

    let results = retriever.search("anything", 3, None, None).await.unwrap();

    assert!(results.len() <= 3);
    let unique: HashSet<&str> = results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(unique.len(), results.len());
}

#[tokio::test]
async fn returns_all_when_k_exceeds_unique_results() {
    let vector = StubVectorBackend::new()
        .with_hits(
            "broadcast_transcripts",
            vec![vector_hit("a", 0.1), vector_hit("b", 0.2)],
        )
        .with_hits("production_metadata", vec![vector_hit("c", 0.3)]);
    let keyword = StubKeywordBackend::new().with_hits(vec![keyword_hit("d"), keyword_hit("a")]);

    let retriever = retriever(
        vector,
        keyword,
        &["broadcast_transcripts", "production_metadata"],
    );

    let results = retriever.search("anything", 10, None, None).await.unwrap();
    assert_eq!(results.len(), 4);
}

#[tokio::test]
async fn keyword_timeout_degrades_to_pure_vector_merge() {
    let vector = StubVectorBackend::new().with_hits(
        "broadcast_transcripts",
        vec![vector_hit("a", 0.1), vector_hit("b", 0.2)],
    );
    let keyword = StubKeywordBackend::new()
        .with_hits(vec![keyword_hit("z")])
        .with_delay(Duration::from_secs(5));

    let retriever = retriever(vector, keyword, &["broadcast_transcripts"]);

    let results = retriever.search("anything", 5, None, None).await.unwrap();

    let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
}

#[tokio::test]
async fn slow_collection_degrades_while_siblings_still_answer() {
    // One collection stalls past the backend timeout; its slot comes back
    // empty while the other collections and the keyword index respond.
    let vector = StubVectorBackend::new()
        .with_hits("broadcast_transcripts", vec![vector_hit("a", 0.1)])
        .with_hits("technical_docs", vec![vector_hit("stale", 0.05)])
        .with_delay("technical_docs", Duration::from_secs(5))
        .with_hits("industry_news", vec![vector_hit("b", 0.2)]);
    let keyword = StubKeywordBackend::new().with_hits(vec![keyword_hit("c")]);

    let retriever = retriever(
        vector,
        keyword,
        &["broadcast_transcripts", "technical_docs", "industry_news"],
    );

    let results = retriever.search("anything", 5, None, None).await.unwrap();

    let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn all_backends_failing_is_total_retrieval_failure() {
    let vector = StubVectorBackend::new()
        .with_failure("broadcast_transcripts")
        .with_failure("production_metadata");
    let keyword = StubKeywordBackend::new().with_failure();

    let retriever = retriever(
        vector,
        keyword,
        &["broadcast_transcripts", "production_metadata"],
    );

    let err = retriever
        .search("anything", 5, None, None)
        .await
        .unwrap_err();

    match err {
        RetrievalError::TotalRetrievalFailure { failures } => {
            assert_eq!(failures.len(), 3);
        }
        other => panic!("expected TotalRetrievalFailure, got {other:?}"),
    }
}

#[tokio::test]
async fn all_backends_empty_is_empty_success() {
    let vector = StubVectorBackend::new().with_hits("broadcast_transcripts", vec![]);
    let keyword = StubKeywordBackend::new();

    let retriever = retriever(vector, keyword, &["broadcast_transcripts"]);

    let results = retriever.search("anything", 5, None, None).await.unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn unknown_collection_degrades_instead_of_failing() {
    let vector =
        StubVectorBackend::new().with_hits("broadcast_transcripts", vec![vector_hit("a", 0.1)]);
    let keyword = StubKeywordBackend::new();

    let retriever = retriever(vector, keyword, &["broadcast_transcripts"]);

    let requested = CollectionSet::new(vec![
        "broadcast_transcripts".to_string(),
        "sports_scores".to_string(),
    ])
    .unwrap();

    let results = retriever
        .search("anything", 5, Some(requested), None)
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "a");
}

#[tokio::test]
async fn rejects_empty_query_and_zero_k() {
    let retriever = retriever(
        StubVectorBackend::new(),
        StubKeywordBackend::new(),
        &["broadcast_transcripts"],
    );

    assert!(matches!(
        retriever.search("   ", 5, None, None).await,
        Err(RetrievalError::InvalidQuery { .. })
    ));
    assert!(matches!(
        retriever.search("query", 0, None, None).await,
        Err(RetrievalError::InvalidQuery { .. })
    ));
}

#[tokio::test]
async fn identical_calls_yield_identical_output() {
    let build = || {
        let vector = StubVectorBackend::new()
            .with_hits(
                "broadcast_transcripts",
                vec![vector_hit("a", 0.1), vector_hit("c", 0.3)],
            )
            .with_hits("production_metadata", vec![vector_hit("b", 0.2)]);
        let keyword = StubKeywordBackend::new().with_hits(vec![keyword_hit("d"), keyword_hit("e")]);
        retriever(
            vector,
            keyword,
            &["broadcast_transcripts", "production_metadata"],
        )
    };

    let first = build().search("same query", 4, None, None).await.unwrap();
    let second = build().search("same query", 4, None, None).await.unwrap();

    let first_ids: Vec<&str> = first.iter().map(|r| r.id.as_str()).collect();
    let second_ids: Vec<&str> = second.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(first_ids, second_ids);
    for (a, b) in first.iter().zip(second.iter()) {
        assert_eq!(a.content, b.content);
        assert_eq!(a.distance, b.distance);
        assert_eq!(a.origin, b.origin);
    }
}

#[tokio::test]
async fn keyword_results_carry_unknown_sentinel_when_metadata_missing() {
    let mut hit = keyword_hit("bare");
    hit.metadata.clear();

    let vector = StubVectorBackend::new().with_hits("broadcast_transcripts", vec![]);
    let keyword = StubKeywordBackend::new().with_hits(vec![hit]);

    let retriever = retriever(vector, keyword, &["broadcast_transcripts"]);

    let results = retriever.search("anything", 5, None, None).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(
        results[0].metadata.get("source").map(String::as_str),
        Some("Unknown")
    );
    assert_eq!(
        results[0].metadata.get("category").map(String::as_str),
        Some("Unknown")
    );
    assert_eq!(results[0].distance, None);
}

#[tokio::test]
async fn per_collection_search_groups_without_merging() {
    let vector = StubVectorBackend::new()
        .with_hits(
            "broadcast_transcripts",
            vec![vector_hit("a", 0.1), vector_hit("dup", 0.3)],
        )
        .with_hits("production_metadata", vec![vector_hit("dup", 0.2)]);
    let keyword = StubKeywordBackend::new().with_hits(vec![keyword_hit("ignored")]);

    let retriever = retriever(
        vector,
        keyword,
        &["broadcast_transcripts", "production_metadata"],
    );

    let grouped = retriever
        .search_per_collection("anything", 5, None)
        .await
        .unwrap();

    assert_eq!(grouped.len(), 2);
    assert_eq!(grouped["broadcast_transcripts"].len(), 2);
    assert_eq!(grouped["production_metadata"].len(), 1);

    // The duplicate id stays present in both groups, no cross-collection dedup
    assert!(grouped["broadcast_transcripts"]
        .iter()
        .any(|r| r.id == "dup"));
    assert!(grouped["production_metadata"].iter().any(|r| r.id == "dup"));
}

#[tokio::test]
async fn per_collection_search_fails_only_when_every_collection_fails() {
    let vector = StubVectorBackend::new()
        .with_failure("broadcast_transcripts")
        .with_failure("production_metadata");
    let keyword = StubKeywordBackend::new();

    let all_failing = retriever(
        vector,
        keyword,
        &["broadcast_transcripts", "production_metadata"],
    );

    let err = all_failing
        .search_per_collection("anything", 5, None)
        .await
        .unwrap_err();
    assert!(matches!(err, RetrievalError::TotalRetrievalFailure { .. }));

    let vector = StubVectorBackend::new()
        .with_failure("broadcast_transcripts")
        .with_hits("production_metadata", vec![vector_hit("a", 0.2)]);

    let partially_failing = retriever(
        vector,
        StubKeywordBackend::new(),
        &["broadcast_transcripts", "production_metadata"],
    );

    let grouped = partially_failing
        .search_per_collection("anything", 5, None)
        .await
        .unwrap();
    assert!(grouped["broadcast_transcripts"].is_empty());
    assert_eq!(grouped["production_metadata"].len(), 1);
}
