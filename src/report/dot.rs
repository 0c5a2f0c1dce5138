//! Graphviz export of the layer graph.

use crate::model::Model;
use petgraph::dot::Dot;
use petgraph::graph::{DiGraph, NodeIndex};
use std::io::{self, Write};

/// Builds a `petgraph` view of the model.
///
/// Node weights are `name (kind)` labels, edge weights the shape of the
/// tensor travelling along the edge. Node indices equal model node IDs.
pub fn to_digraph(model: &Model) -> DiGraph<String, String> {
    let mut graph = DiGraph::with_capacity(model.len(), model.len());
    for net in model.iter() {
        graph.add_node(format!("{} ({})", net.name(), net.kind()));
    }
    for net in model.iter() {
        let to = NodeIndex::new(net.id());
        for &source in net.sources() {
            let label = model
                .get_node(source)
                .map(|s| s.output().to_string())
                .unwrap_or_default();
            graph.add_edge(NodeIndex::new(source), to, label);
        }
    }
    graph
}

pub fn write_dot<W: Write>(model: &Model, mut writer: W) -> io::Result<()> {
    let graph = to_digraph(model);
    writeln!(writer, "{}", Dot::new(&graph))?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::{Conv2dConfig, Nonlinearity};
    use petgraph::algo::{is_cyclic_directed, toposort};

    #[test]
    fn test_digraph_mirrors_model() {
        let mut model = Model::new();
        let input = model.input("input", vec![3, 16, 16]).unwrap();
        let a = model.conv2d("a", &[input], Conv2dConfig::square(8, 3)).unwrap();
        let relu = model.nl("relu", a, Nonlinearity::Relu).unwrap();
        model.elewise("add", a, relu).unwrap();

        let graph = to_digraph(&model);
        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.edge_count(), 4);
        assert!(!is_cyclic_directed(&graph));
        assert!(toposort(&graph, None).is_ok());
        assert_eq!(graph[NodeIndex::new(relu)], "relu (nl)");
    }

    #[test]
    fn test_dot_output() {
        let mut model = Model::new();
        let input = model.input("input", vec![3, 16, 16]).unwrap();
        model.conv2d("conv", &[input], Conv2dConfig::square(8, 3)).unwrap();

        let mut buf = Vec::new();
        write_dot(&model, &mut buf).unwrap();
        let dot = String::from_utf8(buf).unwrap();
        assert!(dot.starts_with("digraph"));
        assert!(dot.contains("conv (conv2d)"));
        assert!(dot.contains("3x16x16"));
    }
}
