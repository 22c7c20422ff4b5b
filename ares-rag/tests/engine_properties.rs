//! Property tests for index store ordering and parent-document grouping.

use std::collections::{HashMap, HashSet};

use ares_rag::document::Chunk;
use ares_rag::index::DualIndexStore;
use proptest::prelude::*;

/// Generate a non-zero L2-normalized embedding of the given dimension.
fn arb_normalized_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim).prop_filter_map(
        "non-zero embedding",
        |mut v| {
            let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm < 1e-8 {
                return None;
            }
            for val in &mut v {
                *val /= norm;
            }
            Some(v)
        },
    )
}

/// Generate a chunk with a normalized embedding.
fn arb_chunk(dim: usize) -> impl Strategy<Value = (Chunk, Vec<f32>)> {
    ("[a-z]{3,8}", "[a-z ]{5,30}", "[a-d]", arb_normalized_embedding(dim)).prop_map(
        |(id, content, parent, embedding)| {
            (
                Chunk {
                    id,
                    content,
                    parent_id: format!("doc_{parent}"),
                    metadata: HashMap::new(),
                    score: 0.0,
                },
                embedding,
            )
        },
    )
}

mod prop_vector_query_ordering {
    use super::*;

    const DIM: usize = 16;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// For any set of stored chunks, a vector query returns at most `k`
        /// results, ordered by descending similarity with ties broken by
        /// chunk id ascending.
        #[test]
        fn results_ordered_descending_and_bounded_by_k(
            entries in proptest::collection::vec(arb_chunk(DIM), 1..20),
            query in arb_normalized_embedding(DIM),
            k in 1usize..25,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let (results, unique_count) = rt.block_on(async {
                let store = DualIndexStore::new();

                // Deduplicate by id to avoid upsert overwriting.
                let mut deduped: HashMap<String, (Chunk, Vec<f32>)> = HashMap::new();
                for entry in entries {
                    deduped.entry(entry.0.id.clone()).or_insert(entry);
                }
                let unique: Vec<_> = deduped.into_values().collect();
                let count = unique.len();

                store.upsert(unique).await;
                (store.query_vector(&query, k).await, count)
            });

            prop_assert!(results.len() <= k);
            prop_assert!(results.len() <= unique_count);

            for window in results.windows(2) {
                prop_assert!(
                    window[0].score >= window[1].score,
                    "results not in descending order: {} < {}",
                    window[0].score,
                    window[1].score,
                );
                if window[0].score == window[1].score {
                    prop_assert!(window[0].id < window[1].id, "tie not broken by id");
                }
            }
        }
    }
}

mod prop_lexical_query_bounds {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        /// Lexical queries return at most `k` results with positive,
        /// non-increasing scores drawn from the rebuilt corpus.
        #[test]
        fn lexical_results_bounded_and_ordered(
            contents in proptest::collection::vec("[a-f]{1,3}( [a-f]{1,3}){0,6}", 1..12),
            query in "[a-f]{1,3}",
            k in 1usize..10,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let results = rt.block_on(async {
                let store = DualIndexStore::new();
                let entries: Vec<(Chunk, Vec<f32>)> = contents
                    .iter()
                    .enumerate()
                    .map(|(i, content)| {
                        (
                            Chunk {
                                id: format!("doc_{i}_chunk_0"),
                                content: content.clone(),
                                parent_id: format!("doc_{i}"),
                                metadata: HashMap::new(),
                                score: 0.0,
                            },
                            vec![1.0],
                        )
                    })
                    .collect();
                store.upsert(entries).await;
                store.rebuild_lexical().await;
                store.query_lexical(&ares_rag::index::tokenize(&query), k).await
            });

            prop_assert!(results.len() <= k);
            for result in &results {
                prop_assert!(result.score > 0.0);
            }
            for window in results.windows(2) {
                prop_assert!(window[0].score >= window[1].score);
            }

            // Every returned chunk actually contains the query term.
            for result in &results {
                prop_assert!(
                    result.content.split_whitespace().any(|w| w == query),
                    "chunk {} does not contain query term {query}",
                    result.id,
                );
            }
        }
    }
}

mod prop_parent_ids_preserved {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        /// Hydrated query results carry the parent ids they were stored with.
        #[test]
        fn query_results_keep_parent_ids(
            entries in proptest::collection::vec(arb_chunk(8), 1..15),
            query in arb_normalized_embedding(8),
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let (results, parents) = rt.block_on(async {
                let store = DualIndexStore::new();
                let mut deduped: HashMap<String, (Chunk, Vec<f32>)> = HashMap::new();
                for entry in entries {
                    deduped.entry(entry.0.id.clone()).or_insert(entry);
                }
                let parents: HashMap<String, String> = deduped
                    .values()
                    .map(|(c, _)| (c.id.clone(), c.parent_id.clone()))
                    .collect();
                store.upsert(deduped.into_values().collect()).await;
                (store.query_vector(&query, 20).await, parents)
            });

            let seen: HashSet<&str> = results.iter().map(|c| c.id.as_str()).collect();
            prop_assert_eq!(seen.len(), results.len(), "duplicate ids in results");
            for result in &results {
                prop_assert_eq!(&parents[&result.id], &result.parent_id);
            }
        }
    }
}
