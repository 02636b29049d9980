use super::*;
use fxhash::FxHashMap;

/// Bijection between the labels of an input graph and the dense ids `0..n` of the graph that is
/// actually searched. Labels may be arbitrary (up to `Node::MAX`), so the searched graph only pays
/// for the vertices that occur in an edge.
///
/// # Example
///
/// ```
/// use dfas::graph::NodeMapper;
/// let mapper = NodeMapper::from_labels(&[3, 100, 7]);
/// assert_eq!(mapper.new_id_of(100), Some(1));
/// assert_eq!(mapper.new_id_of(4), None);
/// assert_eq!(mapper.old_id_of(2), Some(7));
/// ```
#[derive(Clone, Debug, Default)]
pub struct NodeMapper {
    new_ids: FxHashMap<Node, Node>,
    old_ids: Vec<Node>,
}

impl NodeMapper {
    /// Assigns new ids in the order of `labels`; repeated labels keep their first id.
    pub fn from_labels(labels: &[Node]) -> Self {
        let mut mapper = Self::default();
        for &old in labels {
            if !mapper.new_ids.contains_key(&old) {
                mapper.new_ids.insert(old, mapper.old_ids.len() as Node);
                mapper.old_ids.push(old);
            }
        }
        mapper
    }

    /// If the mapping (old, new) exists, returns Some(new), otherwise None
    pub fn new_id_of(&self, old: Node) -> Option<Node> {
        self.new_ids.get(&old).copied()
    }

    /// If the mapping (old, new) exists, returns Some(old), otherwise None
    pub fn old_id_of(&self, new: Node) -> Option<Node> {
        self.old_ids.get(new as usize).copied()
    }

    /// Translates an edge between labels into one between dense ids
    pub fn new_edge_of(&self, (u, v): Edge) -> Option<Edge> {
        Some((self.new_id_of(u)?, self.new_id_of(v)?))
    }

    /// Translates an edge between dense ids back into one between labels
    pub fn old_edge_of(&self, (u, v): Edge) -> Option<Edge> {
        Some((self.old_id_of(u)?, self.old_id_of(v)?))
    }

    /// Number of mapped vertices
    pub fn len(&self) -> usize {
        self.old_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.old_ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_numbered_densely() {
        let mapper = NodeMapper::from_labels(&[Node::MAX, 0, 42, 0]);
        assert_eq!(mapper.len(), 3);
        assert_eq!(mapper.new_id_of(Node::MAX), Some(0));
        assert_eq!(mapper.new_id_of(0), Some(1));
        assert_eq!(mapper.new_id_of(42), Some(2));
        assert_eq!(mapper.old_id_of(0), Some(Node::MAX));
        assert_eq!(mapper.old_id_of(3), None);
    }

    #[test]
    fn edges_translate_both_ways() {
        let mapper = NodeMapper::from_labels(&[10, 20]);
        assert_eq!(mapper.new_edge_of((20, 10)), Some((1, 0)));
        assert_eq!(mapper.new_edge_of((20, 30)), None);
        assert_eq!(mapper.old_edge_of((1, 0)), Some((20, 10)));
        assert_eq!(mapper.old_edge_of((2, 0)), None);
    }

    #[test]
    fn empty_mapper() {
        let mapper = NodeMapper::from_labels(&[]);
        assert!(mapper.is_empty());
        assert_eq!(mapper.new_id_of(0), None);
    }
}
