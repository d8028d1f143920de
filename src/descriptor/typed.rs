// descriptor/typed.rs
//! Contract shared by every structured descriptor type.

use std::any::Any;
use std::fmt::Debug;

use super::Descriptor;
use crate::report::Report;
use crate::xml::Element;

/// A descriptor with typed fields on top of a binary [`Descriptor`].
///
/// Instances are either valid or invalid. Invalid ones are inert: they
/// serialize to nothing and export no XML content, so a table with a
/// broken descriptor can still be processed as a whole.
pub trait TypedDescriptor: Debug + Send + Sync {
    /// Descriptor tag on the wire.
    fn tag(&self) -> u8;

    /// Name of the XML element for this type.
    fn xml_name(&self) -> &'static str;

    fn is_valid(&self) -> bool;

    /// Binary form, or `None` when the instance is invalid.
    fn serialize(&self) -> Option<Descriptor>;

    /// Replaces the content from a binary descriptor. On a tag mismatch or
    /// a malformed payload the instance becomes invalid with all fields
    /// cleared.
    fn deserialize(&mut self, desc: &Descriptor);

    /// Adds this descriptor's attributes and children to `root`, whose
    /// name is already `xml_name()`. Does nothing when invalid.
    fn build_xml(&self, root: &mut Element);

    /// Loads the fields from an element. On error the problem goes to
    /// `report`, `false` is returned and the instance is left as it was.
    fn from_xml(&mut self, element: &Element, report: &dyn Report) -> bool;

    /// Concrete type access for consumers that render known fields.
    fn as_any(&self) -> &dyn Any;

    /// Complete element for this descriptor.
    fn to_xml(&self) -> Element {
        let mut root = Element::new(self.xml_name());
        self.build_xml(&mut root);
        root
    }

    /// Checks the element name, reporting a mismatch.
    fn check_xml_name(&self, element: &Element, report: &dyn Report) -> bool {
        if element.has_name(self.xml_name()) {
            true
        } else {
            report.error(&format!(
                "Incorrect <{}>, expected <{}>",
                element.name(),
                self.xml_name()
            ));
            false
        }
    }
}
