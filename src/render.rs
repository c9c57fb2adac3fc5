// SPDX-License-Identifier: MIT

//! The two text renderings of a [ReportDescriptor]: an indented dump of
//! the collection/field tree, and the annotated byte-by-byte listing in
//! the conventional HID documentation style.
//!
//! The annotated renderer deliberately re-tokenizes the source bytes
//! instead of walking the tree, and keeps its own nesting depth and Usage
//! Page trackers. The two outputs are not derived from one another: the
//! annotated listing is the authoritative HID-convention format, the tree
//! dump an abbreviated diagnostic.

use std::fmt;
use std::fmt::Write;

use crate::hid::{ItemIterator, ItemType};
use crate::{hut, Collection, CollectionType, Field, FieldFlags, FieldKind, ReportDescriptor, Unit};

/// Column at which the annotated description starts.
const COMMENT_COLUMN: usize = 24;

impl ReportDescriptor {
    /// Dump the collection tree, one line per collection and field,
    /// nested by two spaces per level. The synthetic root is not printed;
    /// its children start at indent zero.
    pub fn dump_tree(&self) -> String {
        let mut out = String::new();
        for field in &self.root().fields {
            dump_field(&mut out, field, 0);
        }
        for child in self.children(self.root()) {
            self.dump_collection(&mut out, child, 0);
        }
        out
    }

    fn dump_collection(&self, out: &mut String, node: &Collection, indent: usize) {
        let ind = "  ".repeat(indent);
        let _ = write!(out, "{ind}Collection({})", node.collection_type);
        if node.usage_page != 0 || node.usage != 0 {
            let _ = write!(out, " UsagePage=0x{:04X}", node.usage_page);
            if node.usage != 0 {
                let _ = write!(out, " Usage=0x{:X}", node.usage);
            }
        }
        out.push('\n');
        for field in &node.fields {
            dump_field(out, field, indent + 1);
        }
        for child in self.children(node) {
            self.dump_collection(out, child, indent + 1);
        }
    }
}

fn dump_field(out: &mut String, field: &Field, indent: usize) {
    let ind = "  ".repeat(indent);
    let _ = write!(
        out,
        "{ind}{}(ReportID={}, SizeBits={}, Count={}, Flags=0x{:02X})",
        field.kind,
        field.report_id,
        field.report_size_bits,
        field.report_count,
        u8::from(field.flags),
    );
    if !field.usages.is_empty() {
        out.push_str(" Usages=[");
        for (i, usage) in field.usages.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            let _ = write!(out, "0x{usage:X}");
        }
        out.push(']');
    }
    out.push('\n');
}

/// The comma-separated property list of an Input, Output or Feature data
/// byte: one token per bit, in bit order. Bit 7 reads differently on
/// Input items than on Output and Feature items.
fn flags_text(flags: FieldFlags, kind: FieldKind) -> String {
    let mut tokens = Vec::with_capacity(8);
    tokens.push(if flags.is_constant() { "Const" } else { "Data" });
    tokens.push(if flags.is_variable() { "Var" } else { "Array" });
    tokens.push(if flags.is_relative() { "Rel" } else { "Abs" });
    tokens.push(if flags.wraps() { "Wrap" } else { "No Wrap" });
    tokens.push(if flags.is_nonlinear() {
        "Non-linear"
    } else {
        "Linear"
    });
    tokens.push(if flags.has_no_preferred_state() {
        "No Preferred State"
    } else {
        "Preferred State"
    });
    tokens.push(if flags.has_null_state() {
        "Null Position"
    } else {
        "No Null Position"
    });
    tokens.push(match kind {
        FieldKind::Input => {
            if flags.is_buffered_bytes() {
                "Buffered Bytes"
            } else {
                "Bitfield"
            }
        }
        _ => {
            if flags.is_nonvolatile() {
                "Non-volatile"
            } else {
                "Volatile"
            }
        }
    });
    tokens.join(",")
}

fn unit_text(unit: Unit) -> String {
    let units = unit.units();
    if units.is_empty() {
        return unit.system().name().to_string();
    }
    let names: Vec<&str> = units.iter().map(|u| u.name()).collect();
    format!("{}: {}", unit.system().name(), names.join(", "))
}

impl fmt::Display for ReportDescriptor {
    /// The annotated byte listing: one line per item with the raw bytes
    /// on the left and `// ` plus the indented interpretation on the
    /// right, closed by the total byte count.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.bytes();
        let mut usage_page: u16 = 0;
        let mut depth: usize = 0;

        for rd_item in ItemIterator::new(bytes) {
            let mut line = String::new();
            for (i, byte) in bytes[rd_item.span()].iter().enumerate() {
                if i > 0 {
                    line.push_str(", ");
                }
                let _ = write!(line, "0x{byte:02X}");
            }
            if line.len() >= COMMENT_COLUMN {
                line.push(' ');
            } else {
                line.push_str(&" ".repeat(COMMENT_COLUMN - line.len()));
            }

            let item = rd_item.item();
            let desc = match item.item_type {
                ItemType::Main => match item.tag {
                    0x0A => {
                        let name = CollectionType::from((item.data & 0xFF) as u8);
                        format!("Collection ({name})")
                    }
                    0x0C => "End Collection".to_string(),
                    0x08 => format!(
                        "Input ({})",
                        flags_text(FieldFlags::from((item.data & 0xFF) as u8), FieldKind::Input)
                    ),
                    0x09 => format!(
                        "Output ({})",
                        flags_text(FieldFlags::from((item.data & 0xFF) as u8), FieldKind::Output)
                    ),
                    0x0B => format!(
                        "Feature ({})",
                        flags_text(
                            FieldFlags::from((item.data & 0xFF) as u8),
                            FieldKind::Feature
                        )
                    ),
                    tag => format!("Main (tag=0x{tag:X})"),
                },
                ItemType::Global => match item.tag {
                    0x00 => {
                        usage_page = (item.data & 0xFFFF) as u16;
                        format!("Usage Page ({})", hut::usage_page_name(usage_page))
                    }
                    0x01 => format!("Logical Minimum ({})", item.signed_data()),
                    0x02 => format!("Logical Maximum ({})", item.signed_data()),
                    0x03 => format!("Physical Minimum ({})", item.signed_data()),
                    0x04 => format!("Physical Maximum ({})", item.signed_data()),
                    0x05 => format!("Unit Exponent ({})", item.signed_data()),
                    0x06 => format!("Unit ({})", unit_text(Unit::from(item.data))),
                    0x07 => format!("Report Size ({})", item.data),
                    0x08 => format!("Report ID ({})", (item.data & 0xFF) as u8),
                    0x09 => format!("Report Count ({})", item.data),
                    tag => format!("Global (tag=0x{tag:X})"),
                },
                ItemType::Local => match item.tag {
                    0x00 => format!("Usage ({})", hut::usage_name(usage_page, item.data)),
                    0x01 => format!("Usage Minimum (0x{:02X})", item.data),
                    0x02 => format!("Usage Maximum (0x{:02X})", item.data),
                    tag => format!("Local (tag=0x{tag:X})"),
                },
                ItemType::Reserved => "Reserved".to_string(),
            };

            // End Collection un-indents itself; Collection indents what follows
            if item.item_type == ItemType::Main && item.tag == 0x0C {
                depth = depth.saturating_sub(1);
            }
            writeln!(f, "{line}// {}{desc}", "  ".repeat(depth))?;
            if item.item_type == ItemType::Main && item.tag == 0x0A {
                depth += 1;
            }
        }

        writeln!(f, "\n// {} bytes", bytes.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MOUSE: &[u8] = &[
        0x05, 0x01, 0x09, 0x02, 0xA1, 0x01, 0x09, 0x01, 0xA1, 0x00, 0x05, 0x09, 0x19, 0x01, 0x29,
        0x03, 0x15, 0x00, 0x25, 0x01, 0x95, 0x03, 0x75, 0x01, 0x81, 0x02, 0x95, 0x01, 0x75, 0x05,
        0x81, 0x03, 0xC0, 0xC0,
    ];

    #[test]
    fn annotated_empty() {
        let rdesc = ReportDescriptor::parse(&[]);
        assert_eq!(rdesc.to_string(), "\n// 0 bytes\n");
    }

    #[test]
    fn annotated_single_item() {
        let rdesc = ReportDescriptor::parse(&[0x05, 0x01]);
        assert_eq!(
            rdesc.to_string(),
            "0x05, 0x01              // Usage Page (Generic Desktop Ctrls)\n\n// 2 bytes\n"
        );
    }

    #[test]
    fn annotated_mouse() {
        let rdesc = ReportDescriptor::parse(MOUSE);
        let expected = "\
0x05, 0x01              // Usage Page (Generic Desktop Ctrls)
0x09, 0x02              // Usage (Mouse)
0xA1, 0x01              // Collection (Application)
0x09, 0x01              //   Usage (Pointer)
0xA1, 0x00              //   Collection (Physical)
0x05, 0x09              //     Usage Page (Button)
0x19, 0x01              //     Usage Minimum (0x01)
0x29, 0x03              //     Usage Maximum (0x03)
0x15, 0x00              //     Logical Minimum (0)
0x25, 0x01              //     Logical Maximum (1)
0x95, 0x03              //     Report Count (3)
0x75, 0x01              //     Report Size (1)
0x81, 0x02              //     Input (Data,Var,Abs,No Wrap,Linear,Preferred State,No Null Position,Bitfield)
0x95, 0x01              //     Report Count (1)
0x75, 0x05              //     Report Size (5)
0x81, 0x03              //     Input (Const,Var,Abs,No Wrap,Linear,Preferred State,No Null Position,Bitfield)
0xC0                    //   End Collection
0xC0                    // End Collection

// 34 bytes
";
        assert_eq!(rdesc.to_string(), expected);
    }

    #[test]
    fn annotated_long_item() {
        let rdesc = ReportDescriptor::parse(&[0xFE, 0x01, 0xAA, 0x42, 0x05, 0x01]);
        let expected = "\
0xFE, 0x01, 0xAA, 0x42  // Reserved
0x05, 0x01              // Usage Page (Generic Desktop Ctrls)

// 6 bytes
";
        assert_eq!(rdesc.to_string(), expected);
    }

    #[test]
    fn annotated_wide_item_gets_one_space() {
        // a 4-byte item overflows the comment column by design
        let rdesc = ReportDescriptor::parse(&[0x17, 0x78, 0x56, 0x34, 0x12]);
        assert_eq!(
            rdesc.to_string(),
            "0x17, 0x78, 0x56, 0x34, 0x12 // Logical Minimum (305419896)\n\n// 5 bytes\n"
        );
    }

    #[test]
    fn annotated_signed_minimum() {
        let rdesc = ReportDescriptor::parse(&[0x15, 0x81]);
        assert!(rdesc.to_string().contains("Logical Minimum (-127)"));
    }

    #[test]
    fn annotated_report_id_is_decimal() {
        let rdesc = ReportDescriptor::parse(&[0x85, 0x1A]);
        assert!(rdesc.to_string().contains("Report ID (26)"));
    }

    #[test]
    fn annotated_vendor_page_and_unknown_usage() {
        let rdesc = ReportDescriptor::parse(&[0x06, 0x02, 0xFF, 0x09, 0x99]);
        let text = rdesc.to_string();
        assert!(text.contains("Usage Page (Vendor Defined 0xFF02)"));
        assert!(text.contains("Usage (0x99)"));
    }

    #[test]
    fn annotated_depth_never_goes_negative() {
        let rdesc = ReportDescriptor::parse(&[0xC0, 0x05, 0x01]);
        let expected = "\
0xC0                    // End Collection
0x05, 0x01              // Usage Page (Generic Desktop Ctrls)

// 3 bytes
";
        assert_eq!(rdesc.to_string(), expected);
    }

    #[test]
    fn annotated_unknown_tags_are_generic() {
        // Global tag 0xA is Push, not special-cased by the renderer
        let rdesc = ReportDescriptor::parse(&[0xA4, 0xB4]);
        let text = rdesc.to_string();
        assert!(text.contains("Global (tag=0xA)"));
        assert!(text.contains("Global (tag=0xB)"));
    }

    #[test]
    fn tree_dump_empty() {
        let rdesc = ReportDescriptor::parse(&[]);
        assert_eq!(rdesc.dump_tree(), "");
    }

    #[test]
    fn tree_dump_mouse() {
        let rdesc = ReportDescriptor::parse(MOUSE);
        let expected = "\
Collection(Application) UsagePage=0x0001 Usage=0x2
  Collection(Physical) UsagePage=0x0001 Usage=0x1
    Input(ReportID=0, SizeBits=1, Count=3, Flags=0x02) Usages=[0x1,0x2,0x3]
    Input(ReportID=0, SizeBits=5, Count=1, Flags=0x03)
";
        assert_eq!(rdesc.dump_tree(), expected);
    }

    #[test]
    fn tree_dump_has_no_trailing_whitespace() {
        let rdesc = ReportDescriptor::parse(MOUSE);
        for line in rdesc.dump_tree().lines() {
            assert_eq!(line, line.trim_end());
        }
    }

    #[test]
    fn flag_tokens() {
        assert_eq!(
            flags_text(FieldFlags::from(0x00), FieldKind::Input),
            "Data,Array,Abs,No Wrap,Linear,Preferred State,No Null Position,Bitfield"
        );
        assert_eq!(
            flags_text(FieldFlags::from(0xFF), FieldKind::Input),
            "Const,Var,Rel,Wrap,Non-linear,No Preferred State,Null Position,Buffered Bytes"
        );
        assert_eq!(
            flags_text(FieldFlags::from(0x80), FieldKind::Output),
            "Data,Array,Abs,No Wrap,Linear,Preferred State,No Null Position,Non-volatile"
        );
        assert_eq!(
            flags_text(FieldFlags::from(0x00), FieldKind::Feature),
            "Data,Array,Abs,No Wrap,Linear,Preferred State,No Null Position,Volatile"
        );
    }

    #[test]
    fn unit_descriptions() {
        assert_eq!(unit_text(Unit::from(0)), "None");
        assert_eq!(unit_text(Unit::from(0x11)), "SI Linear: Centimeter");
        assert_eq!(
            unit_text(Unit::from(0x0000_1001)),
            "SI Linear: Seconds"
        );
    }
}
