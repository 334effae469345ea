//! Machine representations.
//!
//! A `MachineRep` says how a value is stored, independent of its logical
//! type: `char` and `int` are distinct types with the same 4-byte layout.
//! Class layout only ever consults the representation of a field.

use std::fmt;

/// Storage representation of a value.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MachineRep {
    Void,
    Bool,
    Byte,
    Short,
    /// Unicode scalar value, 32 bits.
    Char,
    Int,
    Int64,
    Float,
    Double,
    /// Object, function, or reference handle.
    Pointer,
}

impl MachineRep {
    /// Size in bytes of one stored value.
    pub const fn size(self) -> usize {
        match self {
            MachineRep::Void => 0,
            MachineRep::Bool | MachineRep::Byte => 1,
            MachineRep::Short => 2,
            MachineRep::Char | MachineRep::Int | MachineRep::Float => 4,
            MachineRep::Int64 | MachineRep::Double | MachineRep::Pointer => 8,
        }
    }

    /// Alignment used when the value is a field of a class.
    pub const fn struct_alignment(self) -> usize {
        match self {
            MachineRep::Void => 1,
            other => other.size(),
        }
    }

    /// Alignment of a free-standing value.
    ///
    /// Every representation here is naturally aligned to its size, so this
    /// only differs from `struct_alignment` for `Void`.
    pub const fn natural_alignment(self) -> usize {
        match self {
            MachineRep::Void => 0,
            other => other.size(),
        }
    }

    /// Whether the collector must scan values of this representation.
    pub const fn is_pointer(self) -> bool {
        matches!(self, MachineRep::Pointer)
    }

    pub const fn is_integral(self) -> bool {
        matches!(
            self,
            MachineRep::Byte
                | MachineRep::Short
                | MachineRep::Char
                | MachineRep::Int
                | MachineRep::Int64
        )
    }

    pub const fn is_floating(self) -> bool {
        matches!(self, MachineRep::Float | MachineRep::Double)
    }

    pub const fn name(self) -> &'static str {
        match self {
            MachineRep::Void => "void",
            MachineRep::Bool => "bool",
            MachineRep::Byte => "byte",
            MachineRep::Short => "short",
            MachineRep::Char => "char",
            MachineRep::Int => "int",
            MachineRep::Int64 => "int64",
            MachineRep::Float => "float",
            MachineRep::Double => "double",
            MachineRep::Pointer => "pointer",
        }
    }
}

impl fmt::Display for MachineRep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Round `offset` up to the next multiple of `alignment`.
///
/// An alignment of zero or one leaves the offset unchanged.
#[inline]
pub const fn align_up(offset: usize, alignment: usize) -> usize {
    if alignment <= 1 {
        offset
    } else {
        offset.div_ceil(alignment) * alignment
    }
}

#[cfg(test)]
mod tests;
