use crate::model::node::Node;

/// Keeps the nodes whose name contains `term`, ignoring case, in their
/// original order. A blank term keeps everything.
pub fn filter<'a>(nodes: impl IntoIterator<Item = &'a Node>, term: &str) -> Vec<&'a Node> {
    if term.trim().is_empty() {
        return nodes.into_iter().collect();
    }

    let needle = term.to_lowercase();
    nodes
        .into_iter()
        .filter(|node| matches(node.name(), &needle))
        .collect()
}

/// `needle` must already be lowercased.
fn matches(name: &str, needle: &str) -> bool {
    name.to_lowercase().contains(needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::node::{Folder, Note};

    fn nodes() -> Vec<Node> {
        vec![
            Folder::new("1", "Docs").unwrap().into(),
            Note::new("2", "shopping list").unwrap().into(),
            Note::new("3", "DOCKER notes").unwrap().into(),
        ]
    }

    fn names<'a>(found: &[&'a Node]) -> Vec<&'a str> {
        found.iter().map(|n| n.name()).collect()
    }

    #[test]
    fn blank_term_is_identity() {
        let all = nodes();
        for term in ["", "   ", "\t"] {
            let found = filter(&all, term);
            assert_eq!(found.len(), all.len());
            assert!(found.iter().zip(&all).all(|(a, b)| std::ptr::eq(*a, b)));
        }
    }

    #[test]
    fn matches_substrings_case_insensitively() {
        let all = nodes();
        assert_eq!(names(&filter(&all, "doc")), vec!["Docs", "DOCKER notes"]);
        assert_eq!(names(&filter(&all, "LIST")), vec!["shopping list"]);
        assert!(filter(&all, "zzz").is_empty());
    }

    #[test]
    fn inner_whitespace_is_part_of_the_term() {
        let all = nodes();
        assert_eq!(names(&filter(&all, "g l")), vec!["shopping list"]);
    }
}
