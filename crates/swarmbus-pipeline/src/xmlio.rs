//! Serialization of the element tree back to bytes.
//!
//! Used both for the internal well-formedness round-trip in Phase A (repair)
//! and, after Phase D has rewritten namespaces and sorted attributes, for
//! the final canonical form. The rules are identical either way: no XML
//! declaration, no comments, empty elements self-close, text is written
//! verbatim (quick-xml escapes it for us).

use crate::tree::{Element, Node};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

pub fn render(root: &Element) -> Vec<u8> {
    let mut writer = Writer::new(Vec::new());
    write_element(&mut writer, root).expect("writing to an in-memory Vec<u8> never fails");
    writer.into_inner()
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &Element) -> quick_xml::Result<()> {
    let tag = element.name.full();

    if element.children.is_empty() {
        let mut start = BytesStart::new(tag);
        for attr in &element.attrs {
            start.push_attribute((attr.key.as_str(), attr.value.as_str()));
        }
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    let mut start = BytesStart::new(tag.clone());
    for attr in &element.attrs {
        start.push_attribute((attr.key.as_str(), attr.value.as_str()));
    }
    writer.write_event(Event::Start(start))?;

    for child in &element.children {
        match child {
            Node::Element(e) => write_element(writer, e)?,
            Node::Text(t) => {
                writer.write_event(Event::Text(BytesText::new(t)))?;
            }
        }
    }

    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}
