//! Structural Equivalence
//!
//! Deep comparison of two node graphs that terminates on cycles.
//!
//! Every `(left, right)` instance pair is recorded before it is compared. When
//! the same pair is reached again it is assumed equal, which closes the cycle
//! consistently: the outer comparison of that pair still decides the result.
//!
//! Base fields compared by value: type tag, id, local id and attributes.
//! Relationship key sets must match exactly, then each value is compared by
//! shape:
//!
//! | left  | right | outcome                              |
//! |-------|-------|--------------------------------------|
//! | One   | One   | recurse                              |
//! | Many  | Many  | lengths, then element-wise recursion |
//! | Empty | Empty | equal                                |
//! | Empty | other | not equal                            |
//! | other | Empty | not equal                            |
//! | One   | Many  | unsupported                          |
//! | Many  | One   | unsupported                          |
//!
//! An unsupported comparison is not a negative answer, it means the two values
//! cannot be compared at all. Boolean callers treat it as "not equal".

use std::collections::HashSet;

use super::node::{Node, NodeIdentity, Relationship};

/// Outcome of a structural comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// The graphs are structurally equal.
    Equal,
    /// The graphs differ.
    NotEqual,
    /// A relationship pair has shapes that cannot be compared.
    Unsupported,
}

impl Comparison {
    /// Whether the outcome is [`Comparison::Equal`].
    pub fn is_equal(self) -> bool {
        self == Comparison::Equal
    }

    fn from_bool(equal: bool) -> Self {
        if equal {
            Comparison::Equal
        } else {
            Comparison::NotEqual
        }
    }
}

/// Compare two graphs and report the detailed outcome.
pub fn compare(left: &Node, right: &Node) -> Comparison {
    Comparer::default().nodes(left, right)
}

/// Whether two graphs are structurally equal.
pub fn equal(left: &Node, right: &Node) -> bool {
    compare(left, right).is_equal()
}

#[derive(Default)]
struct Comparer {
    seen: HashSet<(NodeIdentity, NodeIdentity)>,
}

impl Comparer {
    fn nodes(&mut self, left: &Node, right: &Node) -> Comparison {
        if !self.seen.insert((left.identity(), right.identity())) {
            return Comparison::Equal;
        }

        let same_base = left.type_tag() == right.type_tag()
            && left.id() == right.id()
            && left.local_id() == right.local_id()
            && left.attributes() == right.attributes();
        if !same_base {
            return Comparison::NotEqual;
        }

        let left_relationships = left.relationships();
        let right_relationships = right.relationships();
        if left_relationships.len() != right_relationships.len()
            || left_relationships
                .keys()
                .any(|key| !right_relationships.contains_key(key))
        {
            return Comparison::NotEqual;
        }

        for (key, left_value) in &left_relationships {
            let Some(right_value) = right_relationships.get(key) else {
                return Comparison::NotEqual;
            };
            let outcome = self.relationships(left_value, right_value);
            if outcome != Comparison::Equal {
                return outcome;
            }
        }

        Comparison::Equal
    }

    fn relationships(&mut self, left: &Relationship, right: &Relationship) -> Comparison {
        match (left, right) {
            (Relationship::One(l), Relationship::One(r)) => self.nodes(l, r),
            (Relationship::Many(l), Relationship::Many(r)) => {
                if l.len() != r.len() {
                    return Comparison::NotEqual;
                }
                for (l, r) in l.iter().zip(r) {
                    let outcome = self.nodes(l, r);
                    if outcome != Comparison::Equal {
                        return outcome;
                    }
                }
                Comparison::Equal
            }
            (Relationship::Empty, other) | (other, Relationship::Empty) => {
                Comparison::from_bool(other.is_empty())
            }
            (Relationship::One(_), Relationship::Many(_))
            | (Relationship::Many(_), Relationship::One(_)) => Comparison::Unsupported,
        }
    }
}
