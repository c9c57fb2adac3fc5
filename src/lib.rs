// SPDX-License-Identifier: MIT
//
//! This crate parses HID Report Descriptors into a tree of collections and
//! report fields, renders them in human-readable form and, through the
//! [hidraw] module, talks to the Linux hidraw character devices that expose
//! them.
//!
//! Entry point is usually [`ReportDescriptor::parse(bytes)`](ReportDescriptor::parse):
//!
//! ```
//! # use hidrawctl::*;
//! let bytes: &[u8] = &[
//!     0x05, 0x01, 0x09, 0x02, 0xa1, 0x01, 0x09, 0x01, 0xa1, 0x00, 0x05, 0x09,
//!     0x19, 0x01, 0x29, 0x03, 0x15, 0x00, 0x25, 0x01, 0x95, 0x03, 0x75, 0x01,
//!     0x81, 0x02, 0xc0, 0xc0,
//! ];
//! let rdesc = ReportDescriptor::parse(bytes);
//! for field in rdesc.find_by_report_id(0) {
//!     println!("{} field of {} bits", field.kind, field.report_size_bits);
//! }
//! print!("{rdesc}");
//! ```
//!
//! Parsing never fails: real-world devices ship descriptors with quirks
//! (truncated tails, unbalanced collections, stray Pops), and the result is
//! a best-effort tree that downstream consumers can still render and query.
//!
//! In this document and unless stated otherwise, a reference to "Section a.b.c" refers to the
//! [HID Device Class Definition for HID 1.11](https://www.usb.org/document-library/device-class-definition-hid-111).

use std::collections::BTreeMap;

use thiserror::Error;

pub mod hid;
pub mod hidraw;
pub mod hut;
mod render;
pub mod types;

pub use types::*;

use hid::{Item, ItemIterator, ItemType};

#[derive(Debug, Error)]
pub enum Error {
    /// A caller-supplied ID, buffer or range failed a precondition.
    #[error("{0}")]
    InvalidArgument(String),
    /// An OS call failed; the source carries the OS error code.
    #[error("{op}: {source}")]
    Io {
        op: String,
        #[source]
        source: std::io::Error,
    },
    /// An OS call transferred fewer bytes than requested.
    #[error("{op}: short transfer ({actual} of {expected} bytes)")]
    ProtocolShort {
        op: String,
        expected: usize,
        actual: usize,
    },
}

impl Error {
    pub(crate) fn io(op: impl Into<String>, source: std::io::Error) -> Error {
        Error::Io {
            op: op.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !($cond) {
            return Err($err);
        }
    };
}
pub(crate) use ensure;

/// A single Input, Output or Feature field, materialized from the global
/// and local item state at the moment its Main item was consumed
/// (Section 6.2.2.4).
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub kind: FieldKind,
    /// The Report ID the field belongs to, 0 when the device uses none.
    pub report_id: u8,
    pub usage_page: u16,
    /// The usages assigned to the field: a Usage Minimum/Maximum range
    /// expanded in ascending order, or the accumulated Usage items in
    /// descriptor order. May be empty.
    pub usages: Vec<u32>,
    pub report_size_bits: u32,
    pub report_count: u32,
    pub logical_min: i32,
    pub logical_max: i32,
    pub physical_min: i32,
    pub physical_max: i32,
    pub unit: Unit,
    pub unit_exponent: i8,
    pub flags: FieldFlags,
}

/// A node in the collection tree. Collections group [Field]s and nested
/// collections into logical or physical groups (Section 6.2.2.6).
#[derive(Debug, Clone, Default)]
pub struct Collection {
    pub collection_type: CollectionType,
    /// The Usage Page in effect when the collection was opened.
    pub usage_page: u16,
    /// The last Usage local item before the collection opened, 0 if none.
    pub usage: u32,
    /// Fields declared directly inside this collection, in descriptor order.
    pub fields: Vec<Field>,
    children: Vec<usize>,
}

/// Index of a [Field] inside the collection arena: which collection owns
/// it and its position among that collection's fields.
#[derive(Debug, Clone, Copy)]
struct FieldRef {
    collection: usize,
    field: usize,
}

/// A parsed HID Report Descriptor: the collection tree rooted at a
/// synthetic node, an index of fields by Report ID and a copy of the
/// source bytes for rendering.
///
/// The tree is immutable once [parse](Self::parse) returns; collections
/// own their fields, child links are arena indices resolved through the
/// descriptor (entry 0 is the root), and the index holds such indices
/// rather than references.
#[derive(Debug, Clone)]
pub struct ReportDescriptor {
    collections: Vec<Collection>,
    index: BTreeMap<u8, Vec<FieldRef>>,
    bytes: Vec<u8>,
}

/// The global item state, Section 6.2.2.7. Carried across items and
/// snapshot into every emitted [Field].
#[derive(Debug, Clone, Copy, Default)]
struct Globals {
    usage_page: u16,
    report_id: u8,
    report_size_bits: u32,
    report_count: u32,
    logical_min: i32,
    logical_max: i32,
    physical_min: i32,
    physical_max: i32,
    unit: u32,
    unit_exponent: i8,
}

/// The local item state, Section 6.2.2.8. Discarded after every Main item.
#[derive(Debug, Default)]
struct Locals {
    usages: Vec<u32>,
    has_usage_range: bool,
    usage_min: u32,
    usage_max: u32,
}

impl Locals {
    fn clear(&mut self) {
        self.usages.clear();
        self.has_usage_range = false;
        self.usage_min = 0;
        self.usage_max = 0;
    }

    /// The usages a Main item materializes: a Usage Minimum/Maximum range
    /// takes precedence over accumulated Usage items, and an inverted
    /// range expands to nothing.
    fn expand_usages(&self) -> Vec<u32> {
        if self.has_usage_range {
            if self.usage_min <= self.usage_max {
                (self.usage_min..=self.usage_max).collect()
            } else {
                Vec::new()
            }
        } else {
            self.usages.clone()
        }
    }
}

impl ReportDescriptor {
    /// Parse the given bytes into a descriptor tree.
    ///
    /// This cannot fail: truncation ends the stream, unknown tags are
    /// skipped, an End Collection at the root and a Pop without a Push are
    /// no-ops, and collections left open at the end of the stream stay
    /// attached to the tree.
    pub fn parse(bytes: &[u8]) -> ReportDescriptor {
        let mut rdesc = ReportDescriptor {
            collections: vec![Collection::default()],
            index: BTreeMap::new(),
            bytes: bytes.to_vec(),
        };
        // Two separate stacks: one of open collections, one of saved
        // global states for Push/Pop.
        let mut open: Vec<usize> = vec![0];
        let mut globals = Globals::default();
        let mut saved: Vec<Globals> = Vec::new();
        let mut locals = Locals::default();

        for rd_item in ItemIterator::new(bytes) {
            let item = rd_item.item();
            match item.item_type {
                ItemType::Main => {
                    rdesc.handle_main_item(&item, &mut open, &globals, &locals);
                    locals.clear();
                }
                ItemType::Global => match item.tag {
                    0x00 => globals.usage_page = (item.data & 0xFFFF) as u16,
                    0x01 => globals.logical_min = item.signed_data(),
                    0x02 => globals.logical_max = item.signed_data(),
                    0x03 => globals.physical_min = item.signed_data(),
                    0x04 => globals.physical_max = item.signed_data(),
                    0x05 => globals.unit_exponent = item.signed_data() as i8,
                    0x06 => globals.unit = item.data,
                    0x07 => globals.report_size_bits = item.data,
                    0x08 => globals.report_id = (item.data & 0xFF) as u8,
                    0x09 => globals.report_count = item.data,
                    0x0A => saved.push(globals), // Push
                    0x0B => {
                        // Pop without a matching Push is absorbed
                        if let Some(g) = saved.pop() {
                            globals = g;
                        }
                    }
                    _ => {}
                },
                ItemType::Local => match item.tag {
                    0x00 => locals.usages.push(item.data), // Usage
                    0x01 => {
                        locals.has_usage_range = true;
                        locals.usage_min = item.data;
                    }
                    0x02 => {
                        locals.has_usage_range = true;
                        locals.usage_max = item.data;
                    }
                    // String and Designator indices and Delimiters are
                    // accepted but not modeled; they do not clear locals.
                    _ => {}
                },
                ItemType::Reserved => {}
            }
        }

        rdesc
    }

    fn handle_main_item(
        &mut self,
        item: &Item,
        open: &mut Vec<usize>,
        globals: &Globals,
        locals: &Locals,
    ) {
        match item.tag {
            // Collection
            0x0A => {
                let node = Collection {
                    collection_type: CollectionType::from((item.data & 0xFF) as u8),
                    usage_page: globals.usage_page,
                    usage: locals.usages.last().copied().unwrap_or(0),
                    fields: Vec::new(),
                    children: Vec::new(),
                };
                let id = self.collections.len();
                self.collections.push(node);
                let top = *open.last().unwrap();
                self.collections[top].children.push(id);
                open.push(id);
            }
            // End Collection; never pops the root
            0x0C => {
                if open.len() > 1 {
                    open.pop();
                }
            }
            // Input, Output, Feature
            0x08 | 0x09 | 0x0B => {
                let kind = match item.tag {
                    0x08 => FieldKind::Input,
                    0x09 => FieldKind::Output,
                    _ => FieldKind::Feature,
                };
                let field = Field {
                    kind,
                    report_id: globals.report_id,
                    usage_page: globals.usage_page,
                    usages: locals.expand_usages(),
                    report_size_bits: globals.report_size_bits,
                    report_count: globals.report_count,
                    logical_min: globals.logical_min,
                    logical_max: globals.logical_max,
                    physical_min: globals.physical_min,
                    physical_max: globals.physical_max,
                    unit: Unit::from(globals.unit),
                    unit_exponent: globals.unit_exponent,
                    flags: FieldFlags::from((item.data & 0xFF) as u8),
                };
                let top = *open.last().unwrap();
                let fref = FieldRef {
                    collection: top,
                    field: self.collections[top].fields.len(),
                };
                self.collections[top].fields.push(field);
                self.index.entry(globals.report_id).or_default().push(fref);
            }
            // Unknown Main items still discard the local state
            _ => {}
        }
    }

    /// The synthetic root collection. Its type and usage are meaningless;
    /// its children are the descriptor's top-level collections.
    pub fn root(&self) -> &Collection {
        &self.collections[0]
    }

    /// The child collections of a node, in descriptor order.
    pub fn children<'a>(
        &'a self,
        node: &'a Collection,
    ) -> impl ExactSizeIterator<Item = &'a Collection> {
        node.children.iter().map(|&id| &self.collections[id])
    }

    /// The bytes this descriptor was parsed from.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// All fields bound to the given Report ID, in the order they appear
    /// in the descriptor. Empty for IDs the descriptor does not declare;
    /// ID 0 collects the fields of devices without Report IDs.
    pub fn find_by_report_id(&self, report_id: u8) -> Vec<&Field> {
        self.index
            .get(&report_id)
            .map(|refs| {
                refs.iter()
                    .map(|r| &self.collections[r.collection].fields[r.field])
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The wire size in bytes of the feature report with the given Report
    /// ID, including the leading Report ID byte. This is the buffer size a
    /// caller must hand to [hidraw::Device::feature_get].
    pub fn feature_report_size(&self, report_id: u8) -> Result<usize> {
        let bits: u64 = self
            .find_by_report_id(report_id)
            .iter()
            .filter(|f| f.kind == FieldKind::Feature)
            .map(|f| u64::from(f.report_size_bits) * u64::from(f.report_count))
            .sum();
        ensure!(
            bits != 0,
            Error::InvalidArgument(format!("no feature report with ID {report_id}"))
        );
        Ok((bits as usize + 7) / 8 + 1)
    }
}

impl From<&[u8]> for ReportDescriptor {
    fn from(bytes: &[u8]) -> ReportDescriptor {
        ReportDescriptor::parse(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Two-button mouse with a constant padding field, wrapped in an
    // Application/Physical collection pair.
    const MOUSE: &[u8] = &[
        0x05, 0x01, // Usage Page (Generic Desktop)
        0x09, 0x02, // Usage (Mouse)
        0xA1, 0x01, // Collection (Application)
        0x09, 0x01, //   Usage (Pointer)
        0xA1, 0x00, //   Collection (Physical)
        0x05, 0x09, //     Usage Page (Button)
        0x19, 0x01, //     Usage Minimum (1)
        0x29, 0x03, //     Usage Maximum (3)
        0x15, 0x00, //     Logical Minimum (0)
        0x25, 0x01, //     Logical Maximum (1)
        0x95, 0x03, //     Report Count (3)
        0x75, 0x01, //     Report Size (1)
        0x81, 0x02, //     Input (Data,Var,Abs)
        0x95, 0x01, //     Report Count (1)
        0x75, 0x05, //     Report Size (5)
        0x81, 0x03, //     Input (Const,Var,Abs)
        0xC0, //   End Collection
        0xC0, // End Collection
    ];

    #[test]
    fn empty_input() {
        let rdesc = ReportDescriptor::parse(&[]);
        assert!(rdesc.root().fields.is_empty());
        assert_eq!(rdesc.children(rdesc.root()).len(), 0);
        assert!(rdesc.find_by_report_id(0).is_empty());
    }

    #[test]
    fn minimal_mouse() {
        let rdesc = ReportDescriptor::parse(MOUSE);

        let app = rdesc.children(rdesc.root()).next().unwrap();
        assert_eq!(rdesc.children(rdesc.root()).len(), 1);
        assert_eq!(app.collection_type, CollectionType::Application);
        assert_eq!(app.usage_page, 0x01);
        assert_eq!(app.usage, 0x02);
        assert!(app.fields.is_empty());

        let physical = rdesc.children(app).next().unwrap();
        assert_eq!(rdesc.children(app).len(), 1);
        assert_eq!(physical.collection_type, CollectionType::Physical);
        assert_eq!(physical.usage_page, 0x01);
        assert_eq!(physical.usage, 0x01);
        assert_eq!(physical.fields.len(), 2);

        let buttons = &physical.fields[0];
        assert_eq!(buttons.kind, FieldKind::Input);
        assert_eq!(buttons.report_id, 0);
        assert_eq!(buttons.usage_page, 0x09);
        assert_eq!(buttons.usages, vec![1, 2, 3]);
        assert_eq!(buttons.report_size_bits, 1);
        assert_eq!(buttons.report_count, 3);
        assert_eq!(buttons.logical_min, 0);
        assert_eq!(buttons.logical_max, 1);
        assert_eq!(buttons.flags, FieldFlags::from(0x02));

        let padding = &physical.fields[1];
        assert_eq!(padding.usage_page, 0x09);
        assert!(padding.usages.is_empty());
        assert_eq!(padding.report_size_bits, 5);
        assert_eq!(padding.report_count, 1);
        assert_eq!(padding.flags, FieldFlags::from(0x03));
        assert!(padding.flags.is_constant());
    }

    #[test]
    fn index_enumerates_in_descriptor_order() {
        let rdesc = ReportDescriptor::parse(MOUSE);
        let fields = rdesc.find_by_report_id(0);
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].report_size_bits, 1);
        assert_eq!(fields[1].report_size_bits, 5);
    }

    #[test]
    fn report_id_multiplexing() {
        #[rustfmt::skip]
        let bytes = [
            0x05, 0x01,       // Usage Page (Generic Desktop)
            0x75, 0x08,       // Report Size (8)
            0x95, 0x01,       // Report Count (1)
            0x85, 0x01,       // Report ID (1)
            0xB1, 0x02,       // Feature (Data,Var,Abs)
            0x85, 0x02,       // Report ID (2)
            0xB1, 0x02,       // Feature (Data,Var,Abs)
            0x85, 0x03,       // Report ID (3)
            0xB1, 0x02,       // Feature (Data,Var,Abs)
        ];
        let rdesc = ReportDescriptor::parse(&bytes);
        for id in 1..=3 {
            let fields = rdesc.find_by_report_id(id);
            assert_eq!(fields.len(), 1);
            assert_eq!(fields[0].kind, FieldKind::Feature);
            assert_eq!(fields[0].report_id, id);
            assert_eq!(fields[0].report_size_bits, 8);
            assert_eq!(fields[0].report_count, 1);
        }
        assert!(rdesc.find_by_report_id(99).is_empty());
        assert!(rdesc.find_by_report_id(0).is_empty());
    }

    #[test]
    fn push_pop_restores_globals() {
        #[rustfmt::skip]
        let bytes = [
            0x05, 0x01,       // Usage Page (Generic Desktop)
            0x75, 0x08,       // Report Size (8)
            0x95, 0x01,       // Report Count (1)
            0xA4,             // Push
            0x05, 0x09,       // Usage Page (Button)
            0x81, 0x02,       // Input
            0xB4,             // Pop
            0x81, 0x02,       // Input
        ];
        let rdesc = ReportDescriptor::parse(&bytes);
        let fields = rdesc.find_by_report_id(0);
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].usage_page, 0x09);
        assert_eq!(fields[1].usage_page, 0x01);
        // Pop restored the full snapshot, size and count included
        assert_eq!(fields[1].report_size_bits, 8);
        assert_eq!(fields[1].report_count, 1);
    }

    #[test]
    fn pop_without_push_is_absorbed() {
        let bytes = [0xB4, 0x05, 0x01, 0x75, 0x08, 0x81, 0x02];
        let rdesc = ReportDescriptor::parse(&bytes);
        let fields = rdesc.find_by_report_id(0);
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].usage_page, 0x01);
    }

    #[test]
    fn end_collection_at_root_is_absorbed() {
        let bytes = [0xC0, 0xC0, 0x05, 0x01, 0x81, 0x02];
        let rdesc = ReportDescriptor::parse(&bytes);
        // the field lands on the root
        assert_eq!(rdesc.root().fields.len(), 1);
        assert_eq!(rdesc.find_by_report_id(0).len(), 1);
    }

    #[test]
    fn truncated_tail_keeps_open_collections() {
        let truncated = &MOUSE[..MOUSE.len() - 1];
        let rdesc = ReportDescriptor::parse(truncated);
        let app = rdesc.children(rdesc.root()).next().unwrap();
        assert_eq!(app.collection_type, CollectionType::Application);
        let physical = rdesc.children(app).next().unwrap();
        assert_eq!(physical.collection_type, CollectionType::Physical);
        assert_eq!(physical.fields.len(), 2);
    }

    #[test]
    fn truncation_at_any_boundary_parses() {
        for cut in 0..=MOUSE.len() {
            let rdesc = ReportDescriptor::parse(&MOUSE[..cut]);
            assert_eq!(rdesc.bytes().len(), cut);
        }
    }

    #[test]
    fn usage_range_wins_over_usage_list() {
        #[rustfmt::skip]
        let bytes = [
            0x05, 0x09,       // Usage Page (Button)
            0x09, 0x05,       // Usage (5)
            0x19, 0x01,       // Usage Minimum (1)
            0x29, 0x02,       // Usage Maximum (2)
            0x81, 0x00,       // Input
        ];
        let rdesc = ReportDescriptor::parse(&bytes);
        assert_eq!(rdesc.root().fields[0].usages, vec![1, 2]);
    }

    #[test]
    fn inverted_usage_range_is_empty() {
        #[rustfmt::skip]
        let bytes = [
            0x05, 0x09,       // Usage Page (Button)
            0x19, 0x03,       // Usage Minimum (3)
            0x29, 0x01,       // Usage Maximum (1)
            0x81, 0x02,       // Input
        ];
        let rdesc = ReportDescriptor::parse(&bytes);
        assert!(rdesc.root().fields[0].usages.is_empty());
    }

    #[test]
    fn locals_do_not_leak_across_main_items() {
        #[rustfmt::skip]
        let bytes = [
            0x05, 0x01,       // Usage Page (Generic Desktop)
            0x09, 0x30,       // Usage (X)
            0x81, 0x02,       // Input
            0x81, 0x02,       // Input
        ];
        let rdesc = ReportDescriptor::parse(&bytes);
        let fields = rdesc.find_by_report_id(0);
        assert_eq!(fields[0].usages, vec![0x30]);
        assert!(fields[1].usages.is_empty());
    }

    #[test]
    fn long_item_does_not_disturb_state() {
        let bytes = [0xFE, 0x03, 0xAA, 0x11, 0x22, 0x33, 0x05, 0x01, 0x81, 0x02];
        let rdesc = ReportDescriptor::parse(&bytes);
        let fields = rdesc.find_by_report_id(0);
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].usage_page, 0x01);
    }

    #[test]
    fn signed_global_values() {
        #[rustfmt::skip]
        let bytes = [
            0x15, 0x81,             // Logical Minimum (-127)
            0x25, 0x7F,             // Logical Maximum (127)
            0x36, 0x18, 0xFC,       // Physical Minimum (-1000)
            0x46, 0xE8, 0x03,       // Physical Maximum (1000)
            0x55, 0x0D,             // Unit Exponent
            0x81, 0x06,             // Input (Data,Var,Rel)
        ];
        let rdesc = ReportDescriptor::parse(&bytes);
        let field = &rdesc.root().fields[0];
        assert_eq!(field.logical_min, -127);
        assert_eq!(field.logical_max, 127);
        assert_eq!(field.physical_min, -1000);
        assert_eq!(field.physical_max, 1000);
        assert_eq!(field.unit_exponent, 13);
    }

    #[test]
    fn feature_report_size() {
        #[rustfmt::skip]
        let bytes = [
            0x85, 0x01,       // Report ID (1)
            0x75, 0x08,       // Report Size (8)
            0x95, 0x03,       // Report Count (3)
            0xB1, 0x02,       // Feature
            0x75, 0x02,       // Report Size (2)
            0x95, 0x01,       // Report Count (1)
            0xB1, 0x02,       // Feature
        ];
        let rdesc = ReportDescriptor::parse(&bytes);
        // 24 + 2 bits -> 4 data bytes, plus the Report ID byte
        assert_eq!(rdesc.feature_report_size(1).unwrap(), 5);
        assert!(matches!(
            rdesc.feature_report_size(2),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn feature_size_ignores_input_fields() {
        #[rustfmt::skip]
        let bytes = [
            0x85, 0x07,       // Report ID (7)
            0x75, 0x08,       // Report Size (8)
            0x95, 0x04,       // Report Count (4)
            0x81, 0x02,       // Input
            0x95, 0x02,       // Report Count (2)
            0xB1, 0x02,       // Feature
        ];
        let rdesc = ReportDescriptor::parse(&bytes);
        assert_eq!(rdesc.feature_report_size(7).unwrap(), 3);
    }
}
