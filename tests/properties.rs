//! Property tests for ranking invariants.

use proptest::prelude::*;
use std::sync::Arc;
use toolrank::config::Bm25Params;
use toolrank::embedding::{cosine_similarity, estimate_tokens, format_tool, HashingProvider};
use toolrank::engines::bm25::term_score;
use toolrank::{
    Bm25Ranker, EmbeddingFormat, PatternRanker, Ranker, SearchEngineConfig, SemanticRanker,
    ToolDefinition,
};

fn arb_corpus() -> impl Strategy<Value = Vec<ToolDefinition>> {
    prop::collection::vec(
        (
            r"[a-z]{2,8}(_[a-z]{2,8})?",
            "[a-z ]{0,40}",
            prop::option::of(("[a-z]{2,8}", "[a-z ]{0,20}")),
        ),
        0..8,
    )
    .prop_map(|entries| {
        entries
            .into_iter()
            .enumerate()
            .map(|(i, (name, description, param))| {
                // Suffix keeps names unique within the corpus.
                let tool = ToolDefinition::new(format!("{name}_{i}"), description);
                match param {
                    Some((param, desc)) => tool.with_parameter(&param, Some(&desc), false),
                    None => tool,
                }
            })
            .collect()
    })
}

fn rankers() -> Vec<Arc<dyn Ranker>> {
    vec![
        Arc::new(Bm25Ranker::default()),
        Arc::new(SemanticRanker::new(Arc::new(HashingProvider::new(64)))),
        Arc::new(PatternRanker::new()),
    ]
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

proptest! {
    #[test]
    fn results_bounded_sorted_and_from_corpus(
        corpus in arb_corpus(),
        query in "[a-z_ ]{1,30}",
        top_k in 1usize..12,
    ) {
        let outcomes = block_on(async {
            let mut outcomes = Vec::new();
            for ranker in rankers() {
                ranker.initialize(&corpus, &SearchEngineConfig::default()).await.unwrap();
                outcomes.push((ranker.method(), ranker.search(&query, top_k).await.unwrap()));
            }
            outcomes
        });

        for (method, results) in outcomes {
            prop_assert!(results.len() <= top_k.min(corpus.len()), "{}", method);
            prop_assert!(results.windows(2).all(|w| w[0].score >= w[1].score), "{}", method);
            for result in &results {
                prop_assert!(corpus.iter().any(|t| t.name == result.name), "{}", method);
            }
        }
    }

    #[test]
    fn bm25_term_score_grows_with_tf(
        idf in 0.01f64..10.0,
        tf in 1u32..50,
        doc_len in 1u32..200,
        avg in 1.0f64..200.0,
        k1 in 0.1f64..3.0,
        b in 0.0f64..=1.0,
    ) {
        let params = Bm25Params { k1, b };
        let tf = f64::from(tf);
        let doc_len = f64::from(doc_len);
        let lower = term_score(idf, tf, doc_len, avg, params);
        let higher = term_score(idf, tf + 1.0, doc_len, avg, params);
        prop_assert!(lower > 0.0);
        prop_assert!(higher >= lower);
    }

    #[test]
    fn cosine_is_bounded_and_self_similar(
        v in prop::collection::vec(-100.0f32..100.0, 1..32),
        w in prop::collection::vec(-100.0f32..100.0, 1..32),
    ) {
        let len = v.len().min(w.len());
        let (v, w) = (&v[..len], &w[..len]);

        let score = cosine_similarity(v, w);
        prop_assert!((-1.0..=1.0).contains(&score));

        if v.iter().any(|x| x.abs() > 1e-3) {
            prop_assert!((cosine_similarity(v, v) - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn token_estimate_grows_with_verbosity(corpus in arb_corpus()) {
        for tool in &corpus {
            let estimates: Vec<usize> = [
                EmbeddingFormat::Minimal,
                EmbeddingFormat::Standard,
                EmbeddingFormat::Rich,
                EmbeddingFormat::Verbose,
            ]
            .into_iter()
            .map(|format| estimate_tokens(&format_tool(tool, format)))
            .collect();
            prop_assert!(estimates.windows(2).all(|w| w[0] <= w[1]), "{:?}", estimates);
        }
    }
}
