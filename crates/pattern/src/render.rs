//! Deterministic textual rendering of patterns.
//!
//! `render` makes no external calls; its output feeds the prompt builder
//! and the export view. Node order follows ascending cluster indices, so
//! the same forest always renders the same text.

use crate::pattern::Pattern;
use crate::util;
use petgraph::graph::NodeIndex;
use std::collections::BTreeMap;
use storyline_graph::Cluster;
use storyline_syntax::LanguageConfig;

/// Textual form of one pattern.
#[must_use]
pub fn render(pattern: &Pattern, cluster: &Cluster, config: &LanguageConfig) -> String {
    match pattern {
        Pattern::Usage(p) => render_usage(p, cluster, config),
        Pattern::Declaration(p) => {
            let declarations = declarations_section(p, cluster, config);
            let use_site = use_section(p, cluster, config);
            format!("{declarations}\n\n---\n\nUSED IN:\n\n{use_site}")
        }
        Pattern::Successive(p) => {
            let graph = cluster.graph();
            let chain: Vec<String> = p
                .chain()
                .iter()
                .map(|&node| graph.node(node).content(config))
                .collect();
            let mut out = chain.join("\n");
            if let Some(head) = p.head() {
                push_contexts(&mut out, cluster, head, config);
            }
            out
        }
        Pattern::Singular(p) => {
            let mut out = cluster.graph().node(p.node).content(config);
            push_contexts(&mut out, cluster, p.node, config);
            out
        }
        Pattern::Composite(c) => {
            let parts: Vec<String> = c
                .children
                .iter()
                .map(|child| render(child, cluster, config))
                .collect();
            parts.join("\n\n---\n\n")
        }
    }
}

/// The changed declarations feeding a declaration pattern's use site.
pub(crate) fn declarations_section(
    pattern: &crate::pattern::DeclarationPattern,
    cluster: &Cluster,
    config: &LanguageConfig,
) -> String {
    let used: Vec<NodeIndex> = util::used_nodes(cluster.graph(), pattern.anchor)
        .into_iter()
        .collect();
    context_grouped(cluster, &used, config)
}

/// The out-of-diff use site of a declaration pattern, with its contexts.
pub(crate) fn use_section(
    pattern: &crate::pattern::DeclarationPattern,
    cluster: &Cluster,
    config: &LanguageConfig,
) -> String {
    let mut out = cluster.graph().node(pattern.anchor).display_label(config);
    push_contexts(&mut out, cluster, pattern.anchor, config);
    out
}

fn render_usage(
    pattern: &crate::pattern::UsagePattern,
    cluster: &Cluster,
    config: &LanguageConfig,
) -> String {
    let graph = cluster.graph();
    let mut sections = Vec::new();
    for &use_node in &pattern.use_nodes {
        let used: Vec<NodeIndex> = util::used_nodes(graph, use_node).into_iter().collect();
        let declarations = context_grouped(cluster, &used, config);

        let mut section = graph.node(use_node).display_label(config);
        push_contexts(&mut section, cluster, use_node, config);
        section.push_str("\n\n---\n\nDECLARATIONS:\n\n");
        section.push_str(&declarations);
        sections.push(section);
    }
    sections.join("\n\n")
}

fn push_contexts(out: &mut String, cluster: &Cluster, node: NodeIndex, config: &LanguageConfig) {
    let graph = cluster.graph();
    let contexts = util::context_chain(graph, node);
    if contexts.is_empty() {
        return;
    }
    out.push_str("\nIN\n");
    let labels: Vec<String> = contexts
        .iter()
        .map(|&ctx| graph.node(ctx).display_label(config))
        .collect();
    out.push_str(&labels.join("\nIN\n"));
}

/// Group nodes bottom-up under their context chains: members of a context
/// render joined by `AND`, nested `IN` their context, innermost first.
fn context_grouped(cluster: &Cluster, nodes: &[NodeIndex], config: &LanguageConfig) -> String {
    let graph = cluster.graph();
    let mut groups = util::context_groups(graph, nodes);

    if groups.is_empty() {
        // no contexts at all; render the nodes directly
        let labels: Vec<String> = nodes
            .iter()
            .map(|&node| graph.node(node).display_label(config))
            .collect();
        return labels.join("\nAND\n");
    }

    let mut rendered: BTreeMap<NodeIndex, String> = BTreeMap::new();
    while !groups.is_empty() {
        let ready: Vec<NodeIndex> = groups
            .keys()
            .copied()
            .filter(|ctx| groups[ctx].iter().all(|member| !groups.contains_key(member)))
            .collect();
        if ready.is_empty() {
            break;
        }
        for ctx in ready {
            let members = groups.remove(&ctx).unwrap_or_default();
            let parts: Vec<String> = members
                .iter()
                .map(|member| {
                    rendered
                        .remove(member)
                        .unwrap_or_else(|| graph.node(*member).display_label(config))
                })
                .collect();
            rendered.insert(
                ctx,
                format!(
                    "{}\nIN\n{}",
                    parts.join("\nAND\n"),
                    graph.node(ctx).display_label(config)
                ),
            );
        }
    }

    rendered.into_values().collect::<Vec<String>>().join("\nAND\n")
}
