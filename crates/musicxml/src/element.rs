//! Element Node (§4.E): the public entity users construct, mutate, and
//! serialize. Wraps a name, optional scalar value, validated attribute map,
//! ordered child list, and the [`Container`] that enforces the element's
//! content model.
//!
//! Parent ↔ child is a cycle if both own each other, so the parent owns its
//! children exclusively and each child holds only a [`Weak`] back-reference
//! (§9, "Cyclic/back references").

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use crate::error::{MusicXmlError, MusicXmlResult};
use crate::content_model::Container;
use crate::schema::{schema_table, ComplexContent, ComplexTypeDescriptor};
use crate::simple_types::{self, Value};

struct Inner {
    name: String,
    value: Option<Value>,
    attributes: IndexMap<String, Value>,
    children: Vec<ElementNode>,
    parent: RefCell<Weak<RefCell<Inner>>>,
    container: Container,
    descriptor: &'static ComplexTypeDescriptor,
    xsd_check: bool,
}

/// A node in a MusicXML element tree.
///
/// Cheaply cloneable: clones share the same underlying node (`Rc`), which is
/// what makes [`ElementNode::parent`] and shallow copies possible. Not
/// [`Send`]/[`Sync`] — a tree lives on one thread (§5).
#[derive(Clone)]
pub struct ElementNode(Rc<RefCell<Inner>>);

impl ElementNode {
    /// Construct a new element named `name`, schema-checked (`xsd_check =
    /// true`). Fails only if `name` is not declared anywhere in the schema.
    pub fn new(name: &str) -> MusicXmlResult<Self> {
        Self::with_xsd_check(name, true)
    }

    /// Like [`ElementNode::new`], but with `xsd_check` disabled: `add_child`
    /// always accepts, and `to_string` skips the final completeness check.
    pub fn new_unchecked(name: &str) -> MusicXmlResult<Self> {
        Self::with_xsd_check(name, false)
    }

    fn with_xsd_check(name: &str, xsd_check: bool) -> MusicXmlResult<Self> {
        let decl = schema_table().element(name).ok_or_else(|| {
            MusicXmlError::bad_value("element-name", name, "not declared in the schema")
        })?;
        let descriptor = schema_table().complex_type(decl.complex_type_ref);
        let container = Container::new(descriptor);
        Ok(ElementNode(Rc::new(RefCell::new(Inner {
            name: name.to_string(),
            value: None,
            attributes: IndexMap::new(),
            children: Vec::new(),
            parent: RefCell::new(Weak::new()),
            container,
            descriptor,
            xsd_check,
        }))))
    }

    fn id(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    /// This element's name.
    pub fn name(&self) -> String {
        self.0.borrow().name.clone()
    }

    pub(crate) fn descriptor(&self) -> &'static ComplexTypeDescriptor {
        self.0.borrow().descriptor
    }

    /// Whether this node enforces schema checking on add/remove/to_string.
    pub fn xsd_check(&self) -> bool {
        self.0.borrow().xsd_check
    }

    pub fn set_xsd_check(&self, enabled: bool) {
        self.0.borrow_mut().xsd_check = enabled;
    }

    /// This element's scalar text value, if any.
    pub fn value(&self) -> Option<Value> {
        self.0.borrow().value.clone()
    }

    /// Validate and set this element's scalar text value.
    pub fn set_value(&self, raw: impl AsRef<str>) -> MusicXmlResult<()> {
        let raw = raw.as_ref();
        let type_ref = self
            .0
            .borrow()
            .descriptor
            .simple_content_type
            .ok_or_else(|| {
                MusicXmlError::bad_value(self.name(), raw, "element does not accept simple content")
            })?;
        let value = simple_types::validate(type_ref, raw)?;
        self.0.borrow_mut().value = Some(value);
        Ok(())
    }

    /// Read a previously set attribute, if any.
    pub fn attribute(&self, name: &str) -> Option<Value> {
        self.0.borrow().attributes.get(name).cloned()
    }

    /// Validate and set an attribute. Fails with [`MusicXmlError::UnknownAttribute`]
    /// if `name` is not declared on this element's complex type.
    pub fn set_attribute(&self, name: &str, raw: impl AsRef<str>) -> MusicXmlResult<()> {
        let raw = raw.as_ref();
        let type_ref = {
            let inner = self.0.borrow();
            let decl = inner
                .descriptor
                .attributes
                .iter()
                .find(|a| a.name == name)
                .ok_or_else(|| MusicXmlError::unknown_attribute(inner.name.clone(), name))?;
            decl.type_ref
        };
        let value = simple_types::validate(type_ref, raw)?;
        self.0.borrow_mut().attributes.insert(name.to_string(), value);
        Ok(())
    }

    /// Remove a previously set attribute, if present. A no-op otherwise.
    pub fn clear_attribute(&self, name: &str) {
        self.0.borrow_mut().attributes.shift_remove(name);
    }

    /// This node's non-owning back-reference to its parent, if attached.
    pub fn parent(&self) -> Option<ElementNode> {
        self.0.borrow().parent.borrow().upgrade().map(ElementNode)
    }

    /// Document-order children.
    pub fn children(&self) -> Vec<ElementNode> {
        self.0.borrow().children.clone()
    }

    /// `ordered = true` returns the exact document-order child list. The
    /// crate has no separate unordered index, so `ordered = false` returns
    /// the same list; the flag exists so callers can document that their
    /// own code does not depend on order.
    pub fn get_children(&self, ordered: bool) -> Vec<ElementNode> {
        let _ = ordered;
        self.children()
    }

    /// The first child named `name`, in document order.
    pub fn find_child(&self, name: &str) -> Option<ElementNode> {
        self.0.borrow().children.iter().find(|c| c.name() == name).cloned()
    }

    /// All children named `name`, in document order.
    pub fn find_children(&self, name: &str) -> Vec<ElementNode> {
        self.0.borrow().children.iter().filter(|c| c.name() == name).cloned().collect()
    }

    fn position_of(&self, child: &ElementNode) -> Option<usize> {
        self.0.borrow().children.iter().position(|c| c.id() == child.id())
    }

    /// Attempt to attach `child` as this element's last child. If
    /// [`ElementNode::xsd_check`] is enabled, the attachment must have a
    /// legal home in this element's content model (§4.D) or the call fails
    /// and the tree is left unmutated.
    pub fn add_child(&self, child: ElementNode) -> MusicXmlResult<()> {
        self.insert_child(usize::MAX, child)
    }

    fn insert_child(&self, index: usize, child: ElementNode) -> MusicXmlResult<()> {
        let (xsd_check, name) = {
            let inner = self.0.borrow();
            (inner.xsd_check, inner.name.clone())
        };
        let child_name = child.name();
        if xsd_check {
            let container_result = self.0.borrow().container.try_attach(&child_name, child.id());
            container_result.map_err(|reason| {
                MusicXmlError::child_not_allowed(name, child_name.clone(), reason)
            })?;
        }
        *child.0.borrow().parent.borrow_mut() = Rc::downgrade(&self.0);
        let mut inner = self.0.borrow_mut();
        if index >= inner.children.len() {
            inner.children.push(child);
        } else {
            inner.children.insert(index, child);
        }
        Ok(())
    }

    /// Detach `child` from this element. Decrements the content-model's
    /// completion counts along the path to the leaf that held it, pruning
    /// any duplicate sequence/choice that becomes empty as a result.
    pub fn remove(&self, child: &ElementNode) -> MusicXmlResult<()> {
        let pos = self.position_of(child).ok_or_else(|| {
            MusicXmlError::child_not_allowed(self.name(), child.name(), "not a child of this element")
        })?;
        self.0.borrow_mut().children.remove(pos);
        self.0.borrow().container.detach(child.id());
        *child.0.borrow().parent.borrow_mut() = Weak::new();
        Ok(())
    }

    /// Atomically replace `old` with `new`: `remove(old); add_child(new)`,
    /// rolling both back if the add fails so the tree is left as it was.
    pub fn replace_child(&self, old: &ElementNode, new: ElementNode) -> MusicXmlResult<ElementNode> {
        let pos = self.position_of(old).ok_or_else(|| {
            MusicXmlError::child_not_allowed(self.name(), old.name(), "not a child of this element")
        })?;
        self.remove(old)?;
        match self.insert_child(pos, new.clone()) {
            Ok(()) => Ok(new),
            Err(e) => {
                self.insert_child(pos, old.clone())
                    .expect("re-attaching a child that was legally placed a moment ago cannot fail");
                Err(e)
            }
        }
    }

    /// Dotted-accessor write: attach, replace, or remove the first child
    /// named `local_name` depending on `value` (§4.E).
    pub fn set_named_child(&self, local_name: &str, value: NamedChildValue) -> MusicXmlResult<()> {
        let existing = self.find_child(local_name);
        match value {
            NamedChildValue::Unset => {
                if let Some(existing) = existing {
                    self.remove(&existing)?;
                }
                Ok(())
            }
            NamedChildValue::Element(node) => match existing {
                Some(existing) => self.replace_child(&existing, node).map(|_| ()),
                None => self.add_child(node),
            },
            NamedChildValue::Scalar(raw) => {
                let node = ElementNode::new(local_name)?;
                node.set_value(raw)?;
                match existing {
                    Some(existing) => self.replace_child(&existing, node).map(|_| ()),
                    None => self.add_child(node),
                }
            }
        }
    }

    /// Dotted-accessor read: the first child named `local_name`.
    pub fn named_child(&self, local_name: &str) -> Option<ElementNode> {
        self.find_child(local_name)
    }

    /// Recursively verify this element's container is satisfied and all
    /// required attributes are set, then recurse into children. Invoked
    /// automatically by `to_string` when `xsd_check` is enabled.
    pub(crate) fn final_checks(&self) -> MusicXmlResult<()> {
        let inner = self.0.borrow();
        if let Some(path) = inner.container.validate_completion() {
            return Err(MusicXmlError::required_child_missing(inner.name.clone(), path));
        }
        for decl in &inner.descriptor.attributes {
            if decl.required && !inner.attributes.contains_key(decl.name) {
                return Err(MusicXmlError::required_attribute_missing(inner.name.clone(), decl.name));
            }
        }
        drop(inner);
        for child in self.children() {
            child.final_checks()?;
        }
        Ok(())
    }

    /// Serialize this element (and its subtree) with the default
    /// [`crate::config::Config`].
    pub fn to_string(&self) -> MusicXmlResult<String> {
        self.to_string_with_config(&crate::config::Config::default())
    }

    /// Serialize this element (and its subtree) with an explicit config.
    pub fn to_string_with_config(&self, config: &crate::config::Config) -> MusicXmlResult<String> {
        if self.xsd_check() {
            self.final_checks()?;
        }
        crate::serializer::serialize(self, config)
    }

    /// An independent copy of this subtree: every descendant is copied, the
    /// copy owns a fresh [`Container`] rebuilt by replaying the same
    /// attachments (which must succeed, since the source tree already
    /// proved them legal).
    pub fn deep_copy(&self) -> ElementNode {
        let inner = self.0.borrow();
        let copy = ElementNode::with_xsd_check(&inner.name, inner.xsd_check)
            .expect("copying a node whose name was already valid cannot fail schema lookup");
        copy.0.borrow_mut().value = inner.value.clone();
        copy.0.borrow_mut().attributes = inner.attributes.clone();
        let children: Vec<ElementNode> = inner.children.iter().map(ElementNode::deep_copy).collect();
        drop(inner);
        for child in children {
            copy.insert_child(usize::MAX, child)
                .expect("replaying a previously legal attachment sequence cannot fail");
        }
        copy
    }

    /// A copy of this node only: attributes and value are copied, but
    /// children are shared by reference with the original (each child's
    /// parent back-reference ends up pointing at whichever copy last claimed
    /// it). Supported for tooling; prefer [`ElementNode::deep_copy`] for
    /// anything that will be mutated independently.
    pub fn shallow_copy(&self) -> ElementNode {
        let inner = self.0.borrow();
        let copy = ElementNode::with_xsd_check(&inner.name, inner.xsd_check)
            .expect("copying a node whose name was already valid cannot fail schema lookup");
        copy.0.borrow_mut().value = inner.value.clone();
        copy.0.borrow_mut().attributes = inner.attributes.clone();
        let children = inner.children.clone();
        drop(inner);
        for child in children {
            copy.insert_child(usize::MAX, child)
                .expect("replaying a previously legal attachment sequence cannot fail");
        }
        copy
    }
}

impl std::fmt::Debug for ElementNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.0.borrow();
        f.debug_struct("ElementNode")
            .field("name", &inner.name)
            .field("value", &inner.value)
            .field("attributes", &inner.attributes)
            .field("children", &inner.children.len())
            .finish()
    }
}

/// The value side of [`ElementNode::set_named_child`].
pub enum NamedChildValue {
    /// Attach an already-constructed element directly.
    Element(ElementNode),
    /// Construct the default element for the given name with this scalar as
    /// its value.
    Scalar(String),
    /// Remove the first child matching the name, if any.
    Unset,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pitch_build_and_serialize() {
        let pitch = ElementNode::new("pitch").unwrap();
        let step = ElementNode::new("step").unwrap();
        step.set_value("G").unwrap();
        pitch.add_child(step).unwrap();
        pitch.set_named_child("octave", NamedChildValue::Scalar("3".into())).unwrap();
        let xml = pitch.to_string().unwrap();
        assert_eq!(xml, "<pitch>\n  <step>G</step>\n  <octave>3</octave>\n</pitch>");
    }

    #[test]
    fn enum_rejection() {
        let step = ElementNode::new("step").unwrap();
        let err = step.set_value("H").unwrap_err();
        assert!(matches!(err, MusicXmlError::BadValue { .. }));
    }

    #[test]
    fn missing_required_child_fails_to_string() {
        let pitch = ElementNode::new("pitch").unwrap();
        let err = pitch.to_string().unwrap_err();
        match err {
            MusicXmlError::RequiredChildMissing { element, particle_path } => {
                assert_eq!(element, "pitch");
                assert_eq!(particle_path, "step");
            }
            other => panic!("expected RequiredChildMissing, got {other:?}"),
        }
    }

    #[test]
    fn attribute_validation() {
        let font = ElementNode::new("font").unwrap();
        font.set_attribute("font-family", "Arial").unwrap();
        font.set_attribute("font-size", "17.2").unwrap();
        let err = font.set_attribute("font-size", "huge").unwrap_err();
        assert!(matches!(err, MusicXmlError::BadValue { .. }));
    }

    #[test]
    fn unknown_attribute_rejected() {
        let step = ElementNode::new("step").unwrap();
        let err = step.set_attribute("bogus", "x").unwrap_err();
        assert!(matches!(err, MusicXmlError::UnknownAttribute { .. }));
    }

    #[test]
    fn xsd_check_off_accepts_any_order() {
        let pitch = ElementNode::new_unchecked("pitch").unwrap();
        let step = ElementNode::new("step").unwrap();
        step.set_value("G").unwrap();
        let alter = ElementNode::new("alter").unwrap();
        alter.set_value("1").unwrap();
        let octave = ElementNode::new("octave").unwrap();
        octave.set_value("3").unwrap();
        pitch.add_child(step).unwrap();
        pitch.add_child(alter).unwrap();
        pitch.add_child(octave).unwrap();
        let xml = pitch.to_string().unwrap();
        assert_eq!(
            xml,
            "<pitch>\n  <step>G</step>\n  <alter>1</alter>\n  <octave>3</octave>\n</pitch>"
        );
    }

    #[test]
    fn remove_then_add_restores_capacity() {
        let pitch = ElementNode::new("pitch").unwrap();
        let step = ElementNode::new("step").unwrap();
        step.set_value("G").unwrap();
        pitch.add_child(step.clone()).unwrap();
        pitch.remove(&step).unwrap();
        assert!(pitch.find_child("step").is_none());
        let step2 = ElementNode::new("step").unwrap();
        step2.set_value("A").unwrap();
        pitch.add_child(step2).unwrap();
        assert_eq!(pitch.find_child("step").unwrap().value(), Some(Value::Str("A".into())));
    }

    #[test]
    fn replace_child_rolls_back_on_failure() {
        let pitch = ElementNode::new("pitch").unwrap();
        let step = ElementNode::new("step").unwrap();
        step.set_value("G").unwrap();
        pitch.add_child(step.clone()).unwrap();
        // "clef" has no home in pitch's content model, so this must fail and
        // leave "step" attached.
        let clef = ElementNode::new("clef").unwrap();
        let err = pitch.replace_child(&step, clef);
        assert!(err.is_err());
        assert_eq!(pitch.children().len(), 1);
        assert_eq!(pitch.find_child("step").unwrap().value(), Some(Value::Str("G".into())));
    }

    #[test]
    fn deep_copy_is_independent() {
        let pitch = ElementNode::new("pitch").unwrap();
        let step = ElementNode::new("step").unwrap();
        step.set_value("G").unwrap();
        pitch.add_child(step).unwrap();
        let copy = pitch.deep_copy();
        copy.remove(&copy.find_child("step").unwrap()).unwrap();
        assert!(pitch.find_child("step").is_some());
        assert!(copy.find_child("step").is_none());
    }
}
