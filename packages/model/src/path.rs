//! Node addressing.
//!
//! A [`Path`] lists child indices from the document root. Lexicographic
//! ordering of paths is document (pre-)order, so an ancestor sorts before
//! its descendants and earlier siblings before later ones.

use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(Vec<usize>);

impl Path {
    pub fn new(indices: Vec<usize>) -> Self {
        Self(indices)
    }

    /// The empty path, addressing the document itself
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<usize> {
        self.0.last().copied()
    }

    pub fn parent(&self) -> Option<Path> {
        if self.0.is_empty() {
            return None;
        }
        Some(Path(self.0[..self.0.len() - 1].to_vec()))
    }

    pub fn child(&self, index: usize) -> Path {
        let mut indices = self.0.clone();
        indices.push(index);
        Path(indices)
    }

    /// Same parent, different final index
    pub fn with_last(&self, index: usize) -> Option<Path> {
        let mut indices = self.0.clone();
        *indices.last_mut()? = index;
        Some(Path(indices))
    }

    pub fn next_sibling(&self) -> Option<Path> {
        let last = self.last()?;
        self.with_last(last + 1)
    }

    pub fn previous_sibling(&self) -> Option<Path> {
        let last = self.last()?;
        if last == 0 {
            return None;
        }
        self.with_last(last - 1)
    }

    /// True when `self` is `other` or one of its ancestors
    pub fn contains(&self, other: &Path) -> bool {
        other.0.starts_with(&self.0)
    }

    /// True when `self` is a proper ancestor of `other`
    pub fn is_ancestor_of(&self, other: &Path) -> bool {
        self.0.len() < other.0.len() && self.contains(other)
    }

    /// Proper ancestors excluding the root, nearest first
    pub fn ancestors(&self) -> Vec<Path> {
        (1..self.0.len())
            .rev()
            .map(|len| Path(self.0[..len].to_vec()))
            .collect()
    }

    /// Longest shared prefix of two paths
    pub fn common_ancestor(&self, other: &Path) -> Path {
        let shared = self
            .0
            .iter()
            .zip(other.0.iter())
            .take_while(|(a, b)| a == b)
            .count();
        Path(self.0[..shared].to_vec())
    }
}

impl From<Vec<usize>> for Path {
    fn from(indices: Vec<usize>) -> Self {
        Self(indices)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "/");
        }
        let parts: Vec<String> = self.0.iter().map(|i| i.to_string()).collect();
        write!(f, "{}", parts.join("."))
    }
}

impl FromStr for Path {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s == "/" {
            return Ok(Path::root());
        }
        s.split('.')
            .map(|part| {
                part.parse::<usize>()
                    .map_err(|_| ModelError::invalid_path(format!("'{}' in '{}'", part, s)))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_order() {
        let parent = Path::new(vec![0]);
        let child = Path::new(vec![0, 0]);
        let sibling = Path::new(vec![1]);

        assert!(parent < child);
        assert!(child < sibling);
        assert!(parent.is_ancestor_of(&child));
        assert!(!child.is_ancestor_of(&parent));
        assert!(parent.contains(&parent));
    }

    #[test]
    fn test_siblings_and_ancestors() {
        let path = Path::new(vec![2, 1, 3]);

        assert_eq!(path.parent(), Some(Path::new(vec![2, 1])));
        assert_eq!(path.next_sibling(), Some(Path::new(vec![2, 1, 4])));
        assert_eq!(path.previous_sibling(), Some(Path::new(vec![2, 1, 2])));
        assert_eq!(Path::new(vec![0]).previous_sibling(), None);
        assert_eq!(
            path.ancestors(),
            vec![Path::new(vec![2, 1]), Path::new(vec![2])]
        );
        assert_eq!(
            path.common_ancestor(&Path::new(vec![2, 1, 0, 5])),
            Path::new(vec![2, 1])
        );
    }

    #[test]
    fn test_parse_and_display() {
        let path: Path = "0.3.1".parse().unwrap();
        assert_eq!(path, Path::new(vec![0, 3, 1]));
        assert_eq!(path.to_string(), "0.3.1");
        assert_eq!("/".parse::<Path>().unwrap(), Path::root());
        assert!("0.x".parse::<Path>().is_err());
    }
}
