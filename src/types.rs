// SPDX-License-Identifier: MIT

//! Standalone HID types shared between the parsed descriptor tree and the
//! renderers: collection types, field kinds, the Input/Output/Feature flag
//! byte and the Unit word.
//!
//! In this document and unless stated otherwise, a reference to "Section a.b.c" refers to the
//! [HID Device Class Definition for HID 1.11](https://www.usb.org/document-library/device-class-definition-hid-111).

/// Creates a `From<Foo> for u32` and `From<u32> for Foo` implementation for the given `Foo` type.
/// Use like this: `impl_from(Foo, Foo, u32)`.
macro_rules! impl_from {
    ($tipo:ty, $tipo_expr:expr, $to:ty) => {
        impl From<$tipo> for $to {
            fn from(f: $tipo) -> $to {
                f.0
            }
        }
        impl From<&$tipo> for $to {
            fn from(f: &$tipo) -> $to {
                f.0
            }
        }
        impl From<$to> for $tipo {
            fn from(f: $to) -> Self {
                $tipo_expr(f)
            }
        }
    };
}

/// The collection type carried by a Collection item's data byte,
/// see Section 6.2.2.6.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CollectionType {
    Physical,
    #[default]
    Application,
    Logical,
    Report,
    NamedArray,
    UsageSwitch,
    UsageModifier,
    Reserved(u8),
}

impl From<u8> for CollectionType {
    fn from(v: u8) -> CollectionType {
        match v {
            0x00 => CollectionType::Physical,
            0x01 => CollectionType::Application,
            0x02 => CollectionType::Logical,
            0x03 => CollectionType::Report,
            0x04 => CollectionType::NamedArray,
            0x05 => CollectionType::UsageSwitch,
            0x06 => CollectionType::UsageModifier,
            value => CollectionType::Reserved(value),
        }
    }
}

impl CollectionType {
    pub fn name(&self) -> &'static str {
        match self {
            CollectionType::Physical => "Physical",
            CollectionType::Application => "Application",
            CollectionType::Logical => "Logical",
            CollectionType::Report => "Report",
            CollectionType::NamedArray => "Named Array",
            CollectionType::UsageSwitch => "Usage Switch",
            CollectionType::UsageModifier => "Usage Modifier",
            CollectionType::Reserved(_) => "Reserved",
        }
    }
}

impl std::fmt::Display for CollectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Which of the three data Main items produced a field, see Section 6.2.2.4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Input,
    Output,
    Feature,
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FieldKind::Input => "Input",
            FieldKind::Output => "Output",
            FieldKind::Feature => "Feature",
        };
        write!(f, "{name}")
    }
}

/// The data byte of an Input, Output or Feature item, see Section 6.2.2.5.
///
/// Each bit selects one of a pair of mutually exclusive properties; the
/// accessors are named after the set state. Bit 7 reads as Bitfield /
/// Buffered Bytes on Input items and Volatile / Non-volatile on Output and
/// Feature items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldFlags(pub(crate) u8);

impl_from!(FieldFlags, FieldFlags, u8);

impl FieldFlags {
    /// True if the field is a static read-only value, usually padding.
    pub fn is_constant(&self) -> bool {
        self.0 & 0x01 != 0
    }

    /// True if the field reports a single control rather than an array index.
    pub fn is_variable(&self) -> bool {
        self.0 & 0x02 != 0
    }

    /// True if the data is relative to the previous report.
    pub fn is_relative(&self) -> bool {
        self.0 & 0x04 != 0
    }

    /// True if the value rolls over at the logical extents.
    pub fn wraps(&self) -> bool {
        self.0 & 0x08 != 0
    }

    /// True if the device pre-processed the data and the range is not linear.
    pub fn is_nonlinear(&self) -> bool {
        self.0 & 0x10 != 0
    }

    /// True if the control has no state it returns to when released.
    pub fn has_no_preferred_state(&self) -> bool {
        self.0 & 0x20 != 0
    }

    /// True if the control has a neutral state in which it sends no
    /// meaningful data.
    pub fn has_null_state(&self) -> bool {
        self.0 & 0x40 != 0
    }

    /// Bit 7 on an Input item: the field is a fixed-size byte stream.
    pub fn is_buffered_bytes(&self) -> bool {
        self.0 & 0x80 != 0
    }

    /// Bit 7 on an Output or Feature item.
    pub fn is_nonvolatile(&self) -> bool {
        self.0 & 0x80 != 0
    }
}

/// The unit system selected by the low nibble of a [Unit] word,
/// see Section 6.2.2.7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitSystem {
    None,
    SILinear,
    SIRotation,
    EnglishLinear,
    EnglishRotation,
    Vendor,
    Reserved,
}

impl UnitSystem {
    pub fn name(&self) -> &'static str {
        match self {
            UnitSystem::None => "None",
            UnitSystem::SILinear => "SI Linear",
            UnitSystem::SIRotation => "SI Rotation",
            UnitSystem::EnglishLinear => "English Linear",
            UnitSystem::EnglishRotation => "English Rotation",
            UnitSystem::Vendor => "Vendor",
            UnitSystem::Reserved => "Reserved",
        }
    }
}

/// A measurement unit named by one of the exponent nibbles of a [Unit]
/// word. Which unit a nibble selects depends on the [UnitSystem].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Units {
    Centimeter,
    Radians,
    Inch,
    Degrees,
    Gram,
    Slug,
    Seconds,
    Kelvin,
    Fahrenheit,
    Ampere,
    Candela,
}

impl Units {
    pub fn name(&self) -> &'static str {
        match self {
            Units::Centimeter => "Centimeter",
            Units::Radians => "Radians",
            Units::Inch => "Inch",
            Units::Degrees => "Degrees",
            Units::Gram => "Gram",
            Units::Slug => "Slug",
            Units::Seconds => "Seconds",
            Units::Kelvin => "Kelvin",
            Units::Fahrenheit => "Fahrenheit",
            Units::Ampere => "Ampere",
            Units::Candela => "Candela",
        }
    }
}

/// The 32-bit Unit word of a field, see Section 6.2.2.7.
///
/// Nibble 0 selects the [UnitSystem]; nibbles 1 to 6 carry the exponents
/// of length, mass, time, temperature, current and luminous intensity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Unit(pub(crate) u32);

impl_from!(Unit, Unit, u32);

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Unit {
    fn nibble(&self, idx: usize) -> u8 {
        ((self.0 >> (4 * idx)) & 0xF) as u8
    }

    /// The [UnitSystem] used by the field, [UnitSystem::None] if unset.
    pub fn system(&self) -> UnitSystem {
        match self.nibble(0) {
            0 => UnitSystem::None,
            1 => UnitSystem::SILinear,
            2 => UnitSystem::SIRotation,
            3 => UnitSystem::EnglishLinear,
            4 => UnitSystem::EnglishRotation,
            0xF => UnitSystem::Vendor,
            _ => UnitSystem::Reserved,
        }
    }

    fn english(&self) -> bool {
        matches!(
            self.system(),
            UnitSystem::EnglishLinear | UnitSystem::EnglishRotation
        )
    }

    fn rotation(&self) -> bool {
        matches!(
            self.system(),
            UnitSystem::SIRotation | UnitSystem::EnglishRotation
        )
    }

    /// The length unit, [None] if the length exponent is zero.
    pub fn length(&self) -> Option<Units> {
        if self.nibble(1) == 0 {
            return None;
        }
        Some(match (self.rotation(), self.english()) {
            (false, false) => Units::Centimeter,
            (true, false) => Units::Radians,
            (false, true) => Units::Inch,
            (true, true) => Units::Degrees,
        })
    }

    /// The mass unit, [None] if the mass exponent is zero.
    pub fn mass(&self) -> Option<Units> {
        if self.nibble(2) == 0 {
            return None;
        }
        Some(if self.english() {
            Units::Slug
        } else {
            Units::Gram
        })
    }

    /// The time unit, [None] if the time exponent is zero.
    pub fn time(&self) -> Option<Units> {
        (self.nibble(3) != 0).then_some(Units::Seconds)
    }

    /// The temperature unit, [None] if the temperature exponent is zero.
    pub fn temperature(&self) -> Option<Units> {
        if self.nibble(4) == 0 {
            return None;
        }
        Some(if self.english() {
            Units::Fahrenheit
        } else {
            Units::Kelvin
        })
    }

    /// The current unit, [None] if the current exponent is zero.
    pub fn current(&self) -> Option<Units> {
        (self.nibble(5) != 0).then_some(Units::Ampere)
    }

    /// The luminous intensity unit, [None] if its exponent is zero.
    pub fn luminosity(&self) -> Option<Units> {
        (self.nibble(6) != 0).then_some(Units::Candela)
    }

    /// All units with a nonzero exponent, in nibble order. Empty for a
    /// unit word of zero.
    pub fn units(&self) -> Vec<Units> {
        [
            self.length(),
            self.mass(),
            self.time(),
            self.temperature(),
            self.current(),
            self.luminosity(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}
