// SPDX-License-Identifier: MIT

//! The HID item layer. This module splits a report descriptor byte stream
//! into its individual items without interpreting them, see Section 6.2.2.2
//! of the [HID Device Class Definition for HID 1.11](https://www.usb.org/document-library/device-class-definition-hid-111).
//!
//! An item is a single prefix byte followed by 0, 1, 2 or 4 data bytes
//! (a Short Item) or a longer tagged payload (a Long Item). Long items carry
//! no defined meaning (Section 6.2.2.3) and are skipped.
//!
//! ```
//! # use hidrawctl::hid::*;
//! # fn tokenize(bytes: &[u8]) {
//! for rd_item in ItemIterator::new(bytes) {
//!     let item = rd_item.item();
//!     println!("item at offset {:02x}: {:?}", rd_item.offset(), item.item_type);
//! }
//! # }
//! ```

use std::ops::Range;

/// Prefix byte marking a Long Item, see Section 6.2.2.3.
pub const LONG_ITEM_PREFIX: u8 = 0xFE;

/// The two type bits of a short item prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemType {
    Main,
    Global,
    Local,
    Reserved,
}

impl From<u8> for ItemType {
    fn from(bits: u8) -> ItemType {
        match bits & 0b11 {
            0 => ItemType::Main,
            1 => ItemType::Global,
            2 => ItemType::Local,
            _ => ItemType::Reserved,
        }
    }
}

/// One tokenized item: the prefix fields plus the zero-extended data word.
///
/// Long items are represented as a [ItemType::Reserved] marker with
/// `size` and `tag` both `0xFF`; their payload is skipped by the
/// [ItemIterator].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Item {
    pub item_type: ItemType,
    /// The 4-bit tag from the prefix byte.
    pub tag: u8,
    /// Data width in bytes: 0, 1, 2 or 4 (0xFF for long items).
    pub size: u8,
    /// Data bytes read little-endian and zero-extended.
    pub data: u32,
}

impl Item {
    /// Reinterpret the data word as a signed value of the item's width.
    ///
    /// Logical and Physical Minimum/Maximum carry two's-complement data
    /// (Section 6.2.2.7); the sign lives in the top bit of the encoded
    /// width, not of the u32. A width of zero yields 0.
    pub fn signed_data(&self) -> i32 {
        match self.size {
            1 => self.data as u8 as i8 as i32,
            2 => self.data as u16 as i16 as i32,
            _ => self.data as i32,
        }
    }
}

/// A single item together with the byte range it was tokenized from.
#[derive(Debug, Clone, Copy)]
pub struct ReportDescriptorItem {
    offset: usize,
    len: usize,
    item: Item,
}

impl ReportDescriptorItem {
    /// The offset of this item in the report descriptor.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The byte range this item occupies, prefix byte included.
    pub fn span(&self) -> Range<usize> {
        self.offset..self.offset + self.len
    }

    /// The tokenized item.
    pub fn item(&self) -> Item {
        self.item
    }
}

/// Cursor over a report descriptor byte stream.
///
/// Tokenization is total: any byte sequence yields a finite item sequence
/// whose spans tile the input, and the cursor never reads past the end.
/// A short item whose data bytes are cut off by the end of the stream
/// yields what could be read and ends the stream.
pub struct ItemIterator<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> ItemIterator<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        ItemIterator { bytes, offset: 0 }
    }
}

impl Iterator for ItemIterator<'_> {
    type Item = ReportDescriptorItem;

    fn next(&mut self) -> Option<ReportDescriptorItem> {
        if self.offset >= self.bytes.len() {
            return None;
        }
        let start = self.offset;
        let prefix = self.bytes[self.offset];
        self.offset += 1;

        if prefix == LONG_ITEM_PREFIX {
            // bDataSize and bLongItemTag, then the payload. A truncated
            // long item consumes the remainder of the stream.
            if self.bytes.len() - self.offset < 2 {
                self.offset = self.bytes.len();
            } else {
                let data_size = self.bytes[self.offset] as usize;
                self.offset += 2;
                self.offset = (self.offset + data_size).min(self.bytes.len());
            }
            return Some(ReportDescriptorItem {
                offset: start,
                len: self.offset - start,
                item: Item {
                    item_type: ItemType::Reserved,
                    tag: 0xFF,
                    size: 0xFF,
                    data: 0,
                },
            });
        }

        let size = match prefix & 0b11 {
            3 => 4,
            n => n,
        };
        let mut data: u32 = 0;
        for i in 0..size as usize {
            if self.offset >= self.bytes.len() {
                break;
            }
            data |= (self.bytes[self.offset] as u32) << (8 * i);
            self.offset += 1;
        }

        Some(ReportDescriptorItem {
            offset: start,
            len: self.offset - start,
            item: Item {
                item_type: ItemType::from((prefix >> 2) & 0b11),
                tag: (prefix >> 4) & 0b1111,
                size,
                data,
            },
        })
    }
}
