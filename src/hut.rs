// SPDX-License-Identifier: MIT

//! Names for the HID Usage Pages and Usages commonly seen on hidraw
//! devices, taken from the [HID Usage Tables](https://usb.org/document-library/hid-usage-tables-16).
//! Anything not listed here falls back to a hex rendering, never to an
//! error.

/// The name of a Usage Page. Pages in the vendor-defined range render as
/// `Vendor Defined 0xNNNN`, unknown pages as plain hex.
pub fn usage_page_name(page: u16) -> String {
    match page {
        0x01 => "Generic Desktop Ctrls".into(),
        0x07 => "Kbrd/Keypad".into(),
        0x08 => "LEDs".into(),
        0x09 => "Button".into(),
        0x0A => "Ordinal".into(),
        0x0C => "Consumer".into(),
        0x0D => "Digitizer".into(),
        0x0E => "Reserved 0x0E".into(),
        0xFF00..=0xFFFF => format!("Vendor Defined 0x{page:04X}"),
        _ => format!("0x{page:02X}"),
    }
}

/// The name of a Usage on the given page, hex for anything unknown.
pub fn usage_name(page: u16, usage: u32) -> String {
    let name = match page {
        // Generic Desktop
        0x01 => match usage {
            0x01 => Some("Pointer"),
            0x02 => Some("Mouse"),
            0x04 => Some("Joystick"),
            0x05 => Some("Gamepad"),
            0x06 => Some("Keyboard"),
            0x07 => Some("Keypad"),
            0x30 => Some("X"),
            0x31 => Some("Y"),
            0x32 => Some("Z"),
            0x38 => Some("Wheel"),
            0x39 => Some("Hat Switch"),
            _ => None,
        },
        // Consumer
        0x0C => match usage {
            0x01 => Some("Consumer Control"),
            0xE0 => Some("Volume"),
            0xE9 => Some("Volume Increment"),
            0xEA => Some("Volume Decrement"),
            _ => None,
        },
        // Digitizer
        0x0D => match usage {
            0x01 => Some("Digitizer"),
            0x20 => Some("Stylus"),
            0x22 => Some("Finger"),
            0x30 => Some("Tip Pressure"),
            0x42 => Some("Tip Switch"),
            _ => None,
        },
        // Haptics
        0x0E => match usage {
            0x01 => Some("Simple Haptic Controller"),
            0x10 => Some("Waveform List"),
            0x11 => Some("Duration List"),
            0x20 => Some("Auto Trigger"),
            0x21 => Some("Manual Trigger"),
            0x22 => Some("Auto Trigger Associated Control"),
            0x23 => Some("Intensity"),
            0x24 => Some("Repeat Count"),
            0x25 => Some("Retrigger Period"),
            0x28 => Some("Waveform Cutoff Time"),
            _ => None,
        },
        _ => None,
    };
    match name {
        Some(name) => name.into(),
        None => format!("0x{usage:X}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_names() {
        assert_eq!(usage_page_name(0x01), "Generic Desktop Ctrls");
        assert_eq!(usage_page_name(0x09), "Button");
        assert_eq!(usage_page_name(0x0E), "Reserved 0x0E");
        assert_eq!(usage_page_name(0xFF02), "Vendor Defined 0xFF02");
        assert_eq!(usage_page_name(0x42), "0x42");
    }

    #[test]
    fn usage_names() {
        assert_eq!(usage_name(0x01, 0x02), "Mouse");
        assert_eq!(usage_name(0x01, 0x30), "X");
        assert_eq!(usage_name(0x0D, 0x20), "Stylus");
        assert_eq!(usage_name(0x0C, 0xE0), "Volume");
        // unknown usages render as hex without padding
        assert_eq!(usage_name(0x01, 0x99), "0x99");
        assert_eq!(usage_name(0x09, 0x03), "0x3");
    }
}
