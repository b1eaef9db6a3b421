//! Content-Model Container (§4.D): the live, per-instance mirror of an XSD
//! particle tree that decides where a new child may legally attach.
//!
//! Mutating operations ([`Container::try_attach`]) never leave partial state
//! behind on failure: every node that tentatively mutates itself (creating a
//! duplicate, choosing a branch) undoes that mutation before propagating the
//! rejection to its caller. There is no separate journal object; the Rust
//! call stack plays that role.

use std::cell::{Cell, RefCell};

use crate::schema::{
    ComplexContent, ComplexTypeDescriptor, ContentModelNode, ElementParticle, Occurs, schema_table,
};

#[derive(Debug)]
enum LiveParticle {
    Sequence(LiveRepeat),
    Choice(LiveChoiceRepeat),
    All(LiveAll),
    Leaf(LiveLeaf),
}

#[derive(Debug)]
struct LiveRepeat {
    min_occurs: u32,
    max_occurs: Occurs,
    template: &'static [ContentModelNode],
    duplicates: Vec<LiveRepeatDuplicate>,
}

#[derive(Debug)]
struct LiveRepeatDuplicate {
    branches: Vec<LiveParticle>,
}

#[derive(Debug)]
struct LiveChoiceRepeat {
    min_occurs: u32,
    max_occurs: Occurs,
    template: &'static [ContentModelNode],
    duplicates: Vec<LiveChoiceDuplicate>,
}

#[derive(Debug)]
struct LiveChoiceDuplicate {
    /// The branch that received this duplicate's first committed child, if
    /// any. Once set, this duplicate is committed to that branch: a later
    /// child that doesn't fit it forces a new duplicate rather than trying
    /// another branch (§9 "Open question (resolved)" — no retry once a
    /// choice has a committed child).
    chosen: Option<usize>,
    branches: Vec<LiveParticle>,
}

#[derive(Debug)]
struct LiveAll {
    branches: Vec<LiveParticle>,
}

#[derive(Debug)]
struct LiveLeaf {
    name: &'static str,
    min_occurs: u32,
    max_occurs: Occurs,
    attached: Vec<usize>,
}

fn build_particle(node: &'static ContentModelNode) -> LiveParticle {
    match node {
        ContentModelNode::Sequence {
            min_occurs,
            max_occurs,
            items,
        } => LiveParticle::Sequence(LiveRepeat {
            min_occurs: *min_occurs,
            max_occurs: *max_occurs,
            template: items.as_slice(),
            duplicates: vec![LiveRepeatDuplicate {
                branches: items.iter().map(build_particle).collect(),
            }],
        }),
        ContentModelNode::Choice {
            min_occurs,
            max_occurs,
            items,
        } => LiveParticle::Choice(LiveChoiceRepeat {
            min_occurs: *min_occurs,
            max_occurs: *max_occurs,
            template: items.as_slice(),
            duplicates: vec![LiveChoiceDuplicate {
                chosen: None,
                branches: items.iter().map(build_particle).collect(),
            }],
        }),
        ContentModelNode::All { items } => LiveParticle::All(LiveAll {
            branches: items.iter().map(build_particle).collect(),
        }),
        ContentModelNode::GroupRef { group } => build_particle(schema_table().group(group)),
        ContentModelNode::Element(ElementParticle {
            name,
            min_occurs,
            max_occurs,
        }) => LiveParticle::Leaf(LiveLeaf {
            name,
            min_occurs: *min_occurs,
            max_occurs: *max_occurs,
            attached: Vec::new(),
        }),
    }
}

fn node_min_satisfied(p: &LiveParticle) -> bool {
    match p {
        LiveParticle::Leaf(leaf) => leaf.attached.len() as u32 >= leaf.min_occurs,
        LiveParticle::Sequence(seq) => {
            let complete = seq
                .duplicates
                .iter()
                .filter(|d| d.branches.iter().all(node_min_satisfied))
                .count() as u32;
            complete >= seq.min_occurs
        }
        LiveParticle::Choice(ch) => {
            let complete = ch
                .duplicates
                .iter()
                .filter(|d| d.chosen.is_some_and(|i| node_min_satisfied(&d.branches[i])))
                .count() as u32;
            complete >= ch.min_occurs
        }
        LiveParticle::All(all) => all.branches.iter().all(node_min_satisfied),
    }
}

fn attach_particle(p: &mut LiveParticle, name: &str, id: usize, path: &mut Vec<String>) -> Result<(), String> {
    match p {
        LiveParticle::Sequence(seq) => attach_sequence(seq, name, id, path),
        LiveParticle::Choice(ch) => attach_choice(ch, name, id, path),
        LiveParticle::All(all) => attach_all(all, name, id, path),
        LiveParticle::Leaf(leaf) => attach_leaf(leaf, name, id),
    }
}

fn attach_leaf(leaf: &mut LiveLeaf, name: &str, id: usize) -> Result<(), String> {
    if leaf.name != name {
        return Err(format!("'{name}' does not match particle '{}'", leaf.name));
    }
    if !leaf.max_occurs.allows(leaf.attached.len() as u32) {
        return Err(format!("'{name}' already has the maximum number of occurrences"));
    }
    leaf.attached.push(id);
    Ok(())
}

fn attach_all(all: &mut LiveAll, name: &str, id: usize, path: &mut Vec<String>) -> Result<(), String> {
    for (i, branch) in all.branches.iter_mut().enumerate() {
        path.push(format!("all[{i}]"));
        let result = attach_particle(branch, name, id, path);
        path.pop();
        if result.is_ok() {
            return result;
        }
    }
    Err(format!("'{name}' is not a member of this 'all' group"))
}

fn attach_sequence(seq: &mut LiveRepeat, name: &str, id: usize, path: &mut Vec<String>) -> Result<(), String> {
    let dup_idx = seq.duplicates.len() - 1;
    {
        let dup = &mut seq.duplicates[dup_idx];
        for (i, branch) in dup.branches.iter_mut().enumerate() {
            path.push(format!("seq#{dup_idx}[{i}]"));
            let result = attach_particle(branch, name, id, path);
            path.pop();
            if result.is_ok() {
                return result;
            }
        }
    }

    let current_satisfied = seq.duplicates[dup_idx].branches.iter().all(node_min_satisfied);
    let can_duplicate = current_satisfied && seq.max_occurs.allows(seq.duplicates.len() as u32);
    if !can_duplicate {
        return Err(format!("no legal placement for '{name}' in sequence"));
    }

    tracing::trace!(path = ?path, "duplicating sequence to place '{name}'");
    seq.duplicates.push(LiveRepeatDuplicate {
        branches: seq.template.iter().map(build_particle).collect(),
    });
    let new_idx = seq.duplicates.len() - 1;
    let mut placed = false;
    {
        let dup = &mut seq.duplicates[new_idx];
        for (i, branch) in dup.branches.iter_mut().enumerate() {
            path.push(format!("seq#{new_idx}[{i}]"));
            let result = attach_particle(branch, name, id, path);
            path.pop();
            if result.is_ok() {
                placed = true;
                break;
            }
        }
    }
    if placed {
        Ok(())
    } else {
        tracing::trace!(path = ?path, "rolling back sequence duplication, '{name}' has no home");
        seq.duplicates.pop();
        Err(format!("no legal placement for '{name}' in sequence"))
    }
}

fn attach_choice(ch: &mut LiveChoiceRepeat, name: &str, id: usize, path: &mut Vec<String>) -> Result<(), String> {
    let dup_idx = ch.duplicates.len() - 1;
    let chosen = ch.duplicates[dup_idx].chosen;

    // A duplicate with a chosen branch is committed to it (§9 "Open question
    // (resolved)"): a child that doesn't fit the chosen branch never tries a
    // sibling branch of the same duplicate, it only opens a new duplicate
    // (if `maxOccurs` allows) or is rejected.
    if let Some(chosen_branch) = chosen {
        path.push(format!("choice#{dup_idx}[{chosen_branch}](chosen)"));
        let result = attach_particle(&mut ch.duplicates[dup_idx].branches[chosen_branch], name, id, path);
        path.pop();
        if result.is_ok() {
            return result;
        }

        if ch.max_occurs.allows(ch.duplicates.len() as u32) {
            tracing::trace!(path = ?path, "duplicating choice to place '{name}'");
            ch.duplicates.push(LiveChoiceDuplicate {
                chosen: None,
                branches: ch.template.iter().map(build_particle).collect(),
            });
            let new_idx = ch.duplicates.len() - 1;
            let branch_count = ch.duplicates[new_idx].branches.len();
            for i in 0..branch_count {
                path.push(format!("choice#{new_idx}[{i}]"));
                let result = attach_particle(&mut ch.duplicates[new_idx].branches[i], name, id, path);
                path.pop();
                if result.is_ok() {
                    ch.duplicates[new_idx].chosen = Some(i);
                    return Ok(());
                }
            }
            tracing::trace!(path = ?path, "rolling back choice duplication, '{name}' has no home");
            ch.duplicates.pop();
            return Err(format!("no branch of choice accepts '{name}'"));
        }

        return Err(format!("no branch of choice accepts '{name}'"));
    }

    // Nothing chosen yet in this duplicate: try every branch, backtracking
    // freely since no child has committed this duplicate to one branch.
    tracing::trace!(path = ?path, "choosing a branch for '{name}'");
    let branch_count = ch.duplicates[dup_idx].branches.len();
    for i in 0..branch_count {
        path.push(format!("choice#{dup_idx}[{i}]"));
        let result = attach_particle(&mut ch.duplicates[dup_idx].branches[i], name, id, path);
        path.pop();
        if result.is_ok() {
            ch.duplicates[dup_idx].chosen = Some(i);
            return Ok(());
        }
    }
    Err(format!("no branch of choice accepts '{name}'"))
}

fn detach(p: &mut LiveParticle, id: usize) -> bool {
    match p {
        LiveParticle::Leaf(leaf) => {
            if let Some(pos) = leaf.attached.iter().position(|&x| x == id) {
                leaf.attached.remove(pos);
                true
            } else {
                false
            }
        }
        LiveParticle::Sequence(seq) => seq.duplicates.iter_mut().any(|d| d.branches.iter_mut().any(|b| detach(b, id))),
        LiveParticle::Choice(ch) => ch.duplicates.iter_mut().any(|d| d.branches.iter_mut().any(|b| detach(b, id))),
        LiveParticle::All(all) => all.branches.iter_mut().any(|b| detach(b, id)),
    }
}

fn count_attached(p: &LiveParticle) -> u32 {
    match p {
        LiveParticle::Leaf(l) => l.attached.len() as u32,
        LiveParticle::Sequence(s) => s.duplicates.iter().map(|d| count_attached_group(&d.branches)).sum(),
        LiveParticle::Choice(c) => c.duplicates.iter().map(|d| count_attached_group(&d.branches)).sum(),
        LiveParticle::All(a) => count_attached_group(&a.branches),
    }
}

fn count_attached_group(branches: &[LiveParticle]) -> u32 {
    branches.iter().map(count_attached).sum()
}

/// Drop duplicates (other than the first) that lost their last attachment.
fn prune(p: &mut LiveParticle) {
    match p {
        LiveParticle::Sequence(seq) => {
            for dup in seq.duplicates.iter_mut() {
                for b in dup.branches.iter_mut() {
                    prune(b);
                }
            }
            let mut i = seq.duplicates.len();
            while i > 1 {
                i -= 1;
                if count_attached_group(&seq.duplicates[i].branches) == 0 {
                    seq.duplicates.remove(i);
                }
            }
        }
        LiveParticle::Choice(ch) => {
            for dup in ch.duplicates.iter_mut() {
                for b in dup.branches.iter_mut() {
                    prune(b);
                }
            }
            let mut i = ch.duplicates.len();
            while i > 1 {
                i -= 1;
                if count_attached_group(&ch.duplicates[i].branches) == 0 {
                    ch.duplicates.remove(i);
                }
            }
            for dup in ch.duplicates.iter_mut() {
                if let Some(chosen) = dup.chosen {
                    if count_attached(&dup.branches[chosen]) == 0 {
                        dup.chosen = None;
                    }
                }
            }
        }
        LiveParticle::All(all) => {
            for b in all.branches.iter_mut() {
                prune(b);
            }
        }
        LiveParticle::Leaf(_) => {}
    }
}

fn find_missing(p: &LiveParticle, path: &str) -> Option<String> {
    match p {
        LiveParticle::Leaf(leaf) => {
            if (leaf.attached.len() as u32) < leaf.min_occurs {
                Some(if path.is_empty() {
                    leaf.name.to_string()
                } else {
                    format!("{path}/{}", leaf.name)
                })
            } else {
                None
            }
        }
        LiveParticle::Sequence(seq) => {
            let satisfied = seq
                .duplicates
                .iter()
                .filter(|d| d.branches.iter().all(node_min_satisfied))
                .count() as u32;
            if satisfied >= seq.min_occurs {
                None
            } else {
                let last = seq.duplicates.last().expect("sequence always keeps one duplicate");
                last.branches.iter().find_map(|b| find_missing(b, path))
            }
        }
        LiveParticle::Choice(ch) => {
            let satisfied = ch
                .duplicates
                .iter()
                .filter(|d| d.chosen.is_some_and(|i| node_min_satisfied(&d.branches[i])))
                .count() as u32;
            if satisfied >= ch.min_occurs {
                None
            } else {
                let last = ch.duplicates.last().expect("choice always keeps one duplicate");
                match last.chosen {
                    Some(i) => find_missing(&last.branches[i], path),
                    None => last.branches.first().and_then(|b| find_missing(b, path)),
                }
            }
        }
        LiveParticle::All(all) => all.branches.iter().find_map(|b| find_missing(b, path)),
    }
}

/// The live Content-Model Container for one [`crate::element::ElementNode`].
#[derive(Debug)]
pub struct Container {
    root: RefCell<LiveParticle>,
    epoch: Cell<u64>,
}

impl Container {
    /// Build a fresh container for `descriptor`'s content model.
    pub fn new(descriptor: &'static ComplexTypeDescriptor) -> Self {
        let root = match &descriptor.content {
            ComplexContent::Empty => LiveParticle::All(LiveAll { branches: Vec::new() }),
            ComplexContent::Model(node) => build_particle(node),
        };
        Container {
            root: RefCell::new(root),
            epoch: Cell::new(0),
        }
    }

    /// Attempt to attach a child named `name` (identified by `id` for later
    /// removal) somewhere in the live particle tree.
    pub fn try_attach(&self, name: &str, id: usize) -> Result<(), String> {
        let mut path = Vec::new();
        let result = attach_particle(&mut self.root.borrow_mut(), name, id, &mut path);
        if result.is_ok() {
            self.epoch.set(self.epoch.get() + 1);
        } else {
            tracing::debug!(name, "add_child rejected: no legal placement");
        }
        result
    }

    /// Detach the child previously attached under `id`, pruning any
    /// duplicate that becomes empty as a result.
    pub fn detach(&self, id: usize) -> bool {
        let mut root = self.root.borrow_mut();
        let found = detach(&mut root, id);
        if found {
            prune(&mut root);
            self.epoch.set(self.epoch.get() + 1);
        }
        found
    }

    /// Verify every required particle has been satisfied. Returns the
    /// particle path of the first unmet requirement, if any.
    pub fn validate_completion(&self) -> Option<String> {
        find_missing(&self.root.borrow(), "")
    }

    /// Mutation epoch, bumped on every structural change. Exposed so callers
    /// can invalidate their own memoized traversals.
    pub fn epoch(&self) -> u64 {
        self.epoch.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(name: &'static str, min: u32, max: Occurs) -> ContentModelNode {
        ContentModelNode::Element(ElementParticle {
            name,
            min_occurs: min,
            max_occurs: max,
        })
    }

    fn descriptor(content: ContentModelNode) -> &'static ComplexTypeDescriptor {
        Box::leak(Box::new(ComplexTypeDescriptor {
            attributes: Vec::new(),
            content: ComplexContent::Model(content),
            simple_content_type: None,
        }))
    }

    #[test]
    fn sequence_places_children_in_order() {
        let content = ContentModelNode::Sequence {
            min_occurs: 1,
            max_occurs: Occurs::Bounded(1),
            items: vec![leaf("step", 1, Occurs::Bounded(1)), leaf("octave", 0, Occurs::Bounded(1))],
        };
        let container = Container::new(descriptor(content));
        assert!(container.try_attach("step", 1).is_ok());
        assert!(container.validate_completion().is_none());
    }

    #[test]
    fn missing_required_leaf_is_reported() {
        let content = ContentModelNode::Sequence {
            min_occurs: 1,
            max_occurs: Occurs::Bounded(1),
            items: vec![leaf("step", 1, Occurs::Bounded(1))],
        };
        let container = Container::new(descriptor(content));
        assert_eq!(container.validate_completion(), Some("step".to_string()));
    }

    #[test]
    fn choice_backtracks_when_nothing_committed() {
        let content = ContentModelNode::Choice {
            min_occurs: 1,
            max_occurs: Occurs::Bounded(1),
            items: vec![leaf("a", 1, Occurs::Bounded(1)), leaf("b", 1, Occurs::Bounded(1))],
        };
        let container = Container::new(descriptor(content));
        // Nothing attached yet, so asking for "b" should pick the second branch.
        assert!(container.try_attach("b", 1).is_ok());
    }

    #[test]
    fn choice_duplicates_when_committed_branch_rejects() {
        let content = ContentModelNode::Choice {
            min_occurs: 1,
            max_occurs: Occurs::Unbounded,
            items: vec![leaf("a", 1, Occurs::Bounded(1)), leaf("b", 1, Occurs::Bounded(1))],
        };
        let container = Container::new(descriptor(content));
        assert!(container.try_attach("a", 1).is_ok());
        // "a" branch is full (max 1) and committed, so a new choice duplicate opens.
        assert!(container.try_attach("a", 2).is_ok());
    }

    #[test]
    fn sequence_duplicates_for_unbounded_group() {
        let content = ContentModelNode::Sequence {
            min_occurs: 1,
            max_occurs: Occurs::Unbounded,
            items: vec![leaf("note", 1, Occurs::Bounded(1))],
        };
        let container = Container::new(descriptor(content));
        assert!(container.try_attach("note", 1).is_ok());
        assert!(container.try_attach("note", 2).is_ok());
        assert!(container.try_attach("note", 3).is_ok());
    }

    #[test]
    fn remove_prunes_trailing_empty_duplicate() {
        let content = ContentModelNode::Sequence {
            min_occurs: 1,
            max_occurs: Occurs::Unbounded,
            items: vec![leaf("note", 1, Occurs::Bounded(1))],
        };
        let container = Container::new(descriptor(content));
        container.try_attach("note", 1).unwrap();
        container.try_attach("note", 2).unwrap();
        assert!(container.detach(2));
        assert!(container.try_attach("note", 3).is_ok());
    }

    #[test]
    fn all_group_accepts_any_order() {
        let content = ContentModelNode::All {
            items: vec![leaf("a", 1, Occurs::Bounded(1)), leaf("b", 1, Occurs::Bounded(1))],
        };
        let container = Container::new(descriptor(content));
        assert!(container.try_attach("b", 1).is_ok());
        assert!(container.try_attach("a", 2).is_ok());
        assert!(container.validate_completion().is_none());
    }

    #[test]
    fn unrelated_name_is_rejected() {
        let content = ContentModelNode::Sequence {
            min_occurs: 1,
            max_occurs: Occurs::Bounded(1),
            items: vec![leaf("step", 1, Occurs::Bounded(1))],
        };
        let container = Container::new(descriptor(content));
        assert!(container.try_attach("clef", 1).is_err());
    }
}
