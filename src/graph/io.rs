//! Reads graphs given as a list of `source-target` tokens, e.g. `0-1 1-2 2-0`.
use super::*;
use fxhash::FxHashSet;
use itertools::Itertools;
use std::io::{Error, ErrorKind};

/// Parses a single `source-target` token into an edge. Both labels have to be non-negative
/// decimal integers; no whitespace or sign is accepted.
pub fn parse_edge(token: &str) -> Result<Edge, Error> {
    let (source, target) = token
        .split_once('-')
        .ok_or_else(|| invalid(format!("Edge '{}' is not of the form SOURCE-TARGET", token)))?;

    Ok((parse_vertex(source, token)?, parse_vertex(target, token)?))
}

/// Parses all edge tokens. Returns the edges in input order and the sorted, distinct vertices that
/// appear in at least one edge.
pub fn parse_edges<I, S>(tokens: I) -> Result<(Vec<Edge>, Vec<Node>), Error>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let edges: Vec<Edge> = tokens
        .into_iter()
        .map(|t| parse_edge(t.as_ref()))
        .collect::<Result<_, _>>()?;

    if edges.is_empty() {
        return Err(invalid("At least one edge is required".to_string()));
    }

    let vertices: FxHashSet<Node> = edges.iter().flat_map(|&(u, v)| [u, v]).collect();
    let vertices = vertices.into_iter().sorted().collect();

    Ok((edges, vertices))
}

/// Builds a graph on the dense ids `0..vertices.len()`, where `vertices[i]` gets id `i`. Returns
/// the mapper needed to translate ids back into labels. Fails with `InvalidInput` if an edge uses
/// a label missing from `vertices`.
pub fn compact_graph_from_edges<G: GraphNew + GraphEdgeEditing>(
    edges: &[Edge],
    vertices: &[Node],
) -> Result<(G, NodeMapper), Error> {
    let mapper = NodeMapper::from_labels(vertices);
    let mut graph = G::new(mapper.len());
    for &(u, v) in edges {
        let edge = mapper
            .new_edge_of((u, v))
            .ok_or_else(|| invalid(format!("Edge '{}-{}' uses an unknown vertex", u, v)))?;
        graph.add_edge(edge.0, edge.1);
    }
    Ok((graph, mapper))
}

fn parse_vertex(label: &str, token: &str) -> Result<Node, Error> {
    if label.is_empty() || !label.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(format!("Invalid vertex label in edge '{}'", token)));
    }

    label
        .parse::<Node>()
        .map_err(|_| invalid(format!("Vertex label in edge '{}' is out of range", token)))
}

fn invalid(msg: String) -> Error {
    Error::new(ErrorKind::InvalidInput, msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("0-1" => (0, 1) ; "smallest labels")]
    #[test_case("12-3" => (12, 3) ; "multi digit source")]
    #[test_case("7-7" => (7, 7) ; "self loop")]
    #[test_case("007-10" => (7, 10) ; "leading zeros")]
    #[test_case("4294967295-0" => (u32::MAX, 0) ; "largest label")]
    fn parse_valid_edge(token: &str) -> Edge {
        parse_edge(token).unwrap()
    }

    #[test_case("" ; "empty token")]
    #[test_case("1" ; "missing separator")]
    #[test_case("1-" ; "missing target")]
    #[test_case("-1" ; "missing source")]
    #[test_case("a-b" ; "letters")]
    #[test_case("1-2-3" ; "two separators")]
    #[test_case("1 -2" ; "inner whitespace")]
    #[test_case("+1-2" ; "explicit sign")]
    #[test_case("99999999999-1" ; "label overflow")]
    fn parse_invalid_edge(token: &str) {
        let err = parse_edge(token).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn parse_edge_list() {
        let (edges, vertices) = parse_edges(["0-1", "1-2", "2-0", "5-1"]).unwrap();
        assert_eq!(edges, vec![(0, 1), (1, 2), (2, 0), (5, 1)]);
        assert_eq!(vertices, vec![0, 1, 2, 5]);
    }

    #[test]
    fn parse_edge_list_rejects_empty_and_bad_tokens() {
        assert!(parse_edges(Vec::<String>::new()).is_err());
        assert!(parse_edges(["0-1", "x"]).is_err());
    }

    #[test]
    fn compact_graph_from_edge_list() {
        let (edges, vertices) = parse_edges(["0-1", "1-0", "40-2"]).unwrap();
        let (graph, mapper): (SuccArray, _) = compact_graph_from_edges(&edges, &vertices).unwrap();
        assert_eq!(graph.number_of_nodes(), 4);
        assert_eq!(graph.number_of_edges(), 3);
        assert!(graph.has_edge(3, 2));
        assert!(!graph.has_edge(2, 3));
        assert_eq!(mapper.old_id_of(3), Some(40));
    }

    #[test]
    fn largest_label_needs_no_large_graph() {
        let (edges, vertices) = parse_edges(["4294967295-0", "0-7"]).unwrap();
        let (graph, mapper): (SuccArray, _) = compact_graph_from_edges(&edges, &vertices).unwrap();
        assert_eq!(graph.number_of_nodes(), 3);
        assert!(graph.has_edge(2, 0));
        assert!(graph.has_edge(0, 1));
        assert_eq!(mapper.old_id_of(2), Some(u32::MAX));
        assert_eq!(mapper.old_edge_of((2, 0)), Some((u32::MAX, 0)));
    }

    #[test]
    fn compact_graph_rejects_unknown_vertex() {
        let err = compact_graph_from_edges::<SuccArray>(&[(0, 1), (1, 5)], &[0, 1]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}
