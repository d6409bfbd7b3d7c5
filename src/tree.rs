// Rooted tree storage and newick reading/writing.
//
// Nodes live in an arena (`Vec<Node>`) and refer to their children by index,
// so all per-node side tables elsewhere in the crate are plain vectors
// indexed by node id. Traversal orders are part of the output contract:
// scoring consumes `postorder()` and sampling consumes `preorder()`, and both
// visit a node's children left-to-right.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use flate2::read::MultiGzDecoder;

use crate::errors::TnetError;

#[derive(Debug, Clone)]
pub struct Node {
    /// Leaf: the strain/sample identifier. Internal: the label from the
    /// newick file (often a node id carrying a date in the metadata table).
    pub name: String,
    pub branch_length: Option<f64>,
    /// Empty for leaves; exactly two entries (left, right) after validation.
    pub children: Vec<usize>,
}

impl Node {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct PhyloTree {
    pub nodes: Vec<Node>,
    pub root: usize,
}

impl PhyloTree {
    /// Checks that every node has zero or exactly two children. Runs once
    /// before any scoring; the whole run aborts on failure.
    pub fn validate_bifurcating(&self) -> Result<(), TnetError> {
        for (id, node) in self.nodes.iter().enumerate() {
            let n = node.children.len();
            if n != 0 && n != 2 {
                return Err(TnetError::Structure(format!(
                    "node {} ({:?}) has {} children, expected 0 or 2",
                    id, node.name, n
                )));
            }
        }
        Ok(())
    }

    /// Children-before-parent order, left subtree before right subtree.
    /// Iterative so tree height never hits a call-stack limit.
    pub fn postorder(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![(self.root, false)];
        while let Some((node, expanded)) = stack.pop() {
            if expanded {
                order.push(node);
            } else {
                stack.push((node, true));
                for &child in self.nodes[node].children.iter().rev() {
                    stack.push((child, false));
                }
            }
        }
        order
    }

    /// Parent-before-children order, left subtree before right subtree.
    pub fn preorder(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(node) = stack.pop() {
            order.push(node);
            for &child in self.nodes[node].children.iter().rev() {
                stack.push(child);
            }
        }
        order
    }

    /// Leaf ids in preorder (left-to-right) position.
    pub fn leaves(&self) -> Vec<usize> {
        self.preorder()
            .into_iter()
            .filter(|&n| self.nodes[n].is_leaf())
            .collect()
    }

    /// Serialize with one label per node (the sampled host names), keeping
    /// the parsed branch lengths. Built bottom-up over the postorder so deep
    /// trees do not recurse.
    pub fn to_newick(&self, labels: &[String]) -> String {
        let mut fragment: Vec<String> = vec![String::new(); self.nodes.len()];
        for node in self.postorder() {
            let mut text = String::new();
            if !self.nodes[node].is_leaf() {
                text.push('(');
                for (i, &child) in self.nodes[node].children.iter().enumerate() {
                    if i > 0 {
                        text.push(',');
                    }
                    text.push_str(&fragment[child]);
                }
                text.push(')');
            }
            text.push_str(&labels[node]);
            if let Some(length) = self.nodes[node].branch_length {
                text.push_str(&format!(":{}", length));
            }
            fragment[node] = text;
        }
        format!("{};", fragment[self.root])
    }

    /// Parse a single newick tree. Quoted labels and comment blocks are not
    /// supported; names run until one of `(),:;`.
    pub fn from_newick(text: &str) -> Result<PhyloTree, TnetError> {
        let bytes = text.as_bytes();
        let mut nodes: Vec<Node> = Vec::new();
        // One open frame per unclosed '(' collecting its children.
        let mut frames: Vec<Vec<usize>> = Vec::new();
        let mut finished: Option<usize> = None;
        let mut i = 0;

        while i < bytes.len() {
            match bytes[i] {
                b'(' => {
                    frames.push(Vec::new());
                    i += 1;
                }
                b',' => {
                    let done = finished.take().ok_or_else(|| {
                        TnetError::Parse(format!("empty clade before ',' at byte {}", i))
                    })?;
                    frames
                        .last_mut()
                        .ok_or_else(|| {
                            TnetError::Parse(format!("',' outside any clade at byte {}", i))
                        })?
                        .push(done);
                    i += 1;
                }
                b')' => {
                    let done = finished.take().ok_or_else(|| {
                        TnetError::Parse(format!("empty clade before ')' at byte {}", i))
                    })?;
                    let mut children = frames.pop().ok_or_else(|| {
                        TnetError::Parse(format!("unmatched ')' at byte {}", i))
                    })?;
                    children.push(done);
                    let (name, branch_length, next) = read_label(bytes, i + 1)?;
                    nodes.push(Node {
                        name,
                        branch_length,
                        children,
                    });
                    finished = Some(nodes.len() - 1);
                    i = next;
                }
                b';' => break,
                c if c.is_ascii_whitespace() => i += 1,
                _ => {
                    if finished.is_some() {
                        return Err(TnetError::Parse(format!(
                            "unexpected label start at byte {}",
                            i
                        )));
                    }
                    let (name, branch_length, next) = read_label(bytes, i)?;
                    nodes.push(Node {
                        name,
                        branch_length,
                        children: Vec::new(),
                    });
                    finished = Some(nodes.len() - 1);
                    i = next;
                }
            }
        }

        if !frames.is_empty() {
            return Err(TnetError::Parse(format!(
                "{} unclosed '(' in newick input",
                frames.len()
            )));
        }
        let root = finished
            .ok_or_else(|| TnetError::Parse("no tree found in newick input".to_string()))?;
        Ok(PhyloTree { nodes, root })
    }
}

/// Reads `name[:length]` starting at `from`; stops at `(),;` or end of input.
fn read_label(bytes: &[u8], from: usize) -> Result<(String, Option<f64>, usize), TnetError> {
    let mut i = from;
    let name_start = i;
    while i < bytes.len() && !matches!(bytes[i], b'(' | b')' | b',' | b':' | b';') {
        i += 1;
    }
    let name = String::from_utf8_lossy(&bytes[name_start..i])
        .trim()
        .to_string();

    let mut branch_length = None;
    if i < bytes.len() && bytes[i] == b':' {
        i += 1;
        let len_start = i;
        while i < bytes.len() && !matches!(bytes[i], b'(' | b')' | b',' | b';') {
            i += 1;
        }
        let raw = String::from_utf8_lossy(&bytes[len_start..i]).trim().to_string();
        let value = raw.parse::<f64>().map_err(|_| {
            TnetError::Parse(format!("bad branch length {:?} at byte {}", raw, len_start))
        })?;
        branch_length = Some(value);
    }
    Ok((name, branch_length, i))
}

/// Reads the first newick tree from a file; `.gz` paths are decompressed.
pub fn read_newick_file(path: &Path) -> Result<PhyloTree, TnetError> {
    let mut text = String::new();
    let file = File::open(path)?;
    if path.extension().map_or(false, |e| e == "gz") {
        MultiGzDecoder::new(file).read_to_string(&mut text)?;
    } else {
        let mut file = file;
        file.read_to_string(&mut text)?;
    }
    PhyloTree::from_newick(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(tree: &PhyloTree, order: &[usize]) -> Vec<String> {
        order.iter().map(|&n| tree.nodes[n].name.clone()).collect()
    }

    #[test]
    fn parse_cherry_with_outgroup() {
        let tree = PhyloTree::from_newick("((A,B)ab,C)r;").unwrap();
        assert_eq!(tree.nodes.len(), 5);
        assert!(tree.validate_bifurcating().is_ok());
        let root = &tree.nodes[tree.root];
        assert_eq!(root.name, "r");
        assert_eq!(root.children.len(), 2);
        assert_eq!(tree.nodes[root.children[1]].name, "C");
    }

    #[test]
    fn traversal_orders_are_left_to_right() {
        let tree = PhyloTree::from_newick("((A,B)ab,(C,D)cd)r;").unwrap();
        assert_eq!(
            names(&tree, &tree.postorder()),
            vec!["A", "B", "ab", "C", "D", "cd", "r"]
        );
        assert_eq!(
            names(&tree, &tree.preorder()),
            vec!["r", "ab", "A", "B", "cd", "C", "D"]
        );
        assert_eq!(names(&tree, &tree.leaves()), vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn branch_lengths_survive_round_trip() {
        let tree = PhyloTree::from_newick("((A:1,B:0.5)ab:2,C:3)r;").unwrap();
        let labels: Vec<String> = tree.nodes.iter().map(|n| n.name.clone()).collect();
        assert_eq!(tree.to_newick(&labels), "((A:1,B:0.5)ab:2,C:3)r;");
    }

    #[test]
    fn rejects_polytomy() {
        let tree = PhyloTree::from_newick("(A,B,C);").unwrap();
        assert!(matches!(
            tree.validate_bifurcating(),
            Err(TnetError::Structure(_))
        ));
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(PhyloTree::from_newick("((A,B);").is_err());
        assert!(PhyloTree::from_newick("(A,,B);").is_err());
        assert!(PhyloTree::from_newick("").is_err());
        assert!(PhyloTree::from_newick("(A:x,B);").is_err());
    }

    #[test]
    fn unlabeled_internal_nodes_get_empty_names() {
        let tree = PhyloTree::from_newick("((A,B),C);").unwrap();
        let internal: Vec<&Node> = tree.nodes.iter().filter(|n| !n.is_leaf()).collect();
        assert_eq!(internal.len(), 2);
        assert!(internal.iter().all(|n| n.name.is_empty()));
    }
}
