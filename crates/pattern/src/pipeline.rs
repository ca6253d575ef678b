//! End-to-end control flow for one commit: builder, clusterer, then one
//! traversal engine per cluster.

use crate::engine::{ClusterAnalysis, TraversalEngine};
use rayon::prelude::*;
use std::sync::Arc;
use storyline_graph::{maximal_spans, Clusterer, GraphBuilder, Result};
use storyline_syntax::{EditDistance, LanguageConfig, SemanticModel, SpanResolver, SyntaxSpan};

/// Analyze one commit's added spans into per-cluster pattern forests.
///
/// Nested spans are filtered out before seeding the graph. Clusters are
/// independent of each other, so engine runs fan out across threads; each
/// engine writes only to its own pattern list.
pub fn analyze(
    spans: Vec<Arc<dyn SyntaxSpan>>,
    resolver: &dyn SpanResolver,
    model: &dyn SemanticModel,
    metric: &dyn EditDistance,
    config: &Arc<LanguageConfig>,
) -> Result<Vec<ClusterAnalysis>> {
    let mut builder = GraphBuilder::new(Arc::clone(config), resolver, model, metric);
    for span in maximal_spans(spans) {
        builder.add_change(span);
    }
    let graph = builder.build()?;

    let clusters = Clusterer::new(&graph).into_clusters();
    let analyses: Vec<ClusterAnalysis> = clusters
        .into_par_iter()
        .map(|cluster| TraversalEngine::run(cluster, config.as_ref()))
        .collect();

    log::info!("analyzed commit into {} cluster forests", analyses.len());
    Ok(analyses)
}
