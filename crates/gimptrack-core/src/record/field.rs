//! Field identifiers and the fixed-size set used for goal/changed tracking.

use std::fmt;
use std::ops::{BitOr, BitOrAssign, Sub};

/// One slot of the outbound record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Field {
    Name = 0,
    Position = 1,
    World = 2,
    AccountType = 3,
    Health = 4,
    Prayer = 5,
    Energy = 6,
    Inventory = 7,
    Equipment = 8,
    Skills = 9,
    Loot = 10,
}

impl Field {
    pub const ALL: [Field; 11] = [
        Field::Name,
        Field::Position,
        Field::World,
        Field::AccountType,
        Field::Health,
        Field::Prayer,
        Field::Energy,
        Field::Inventory,
        Field::Equipment,
        Field::Skills,
        Field::Loot,
    ];

    fn bit(self) -> u16 {
        1 << (self as u8)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Position => "position",
            Field::World => "world",
            Field::AccountType => "accountType",
            Field::Health => "health",
            Field::Prayer => "prayer",
            Field::Energy => "energy",
            Field::Inventory => "inventory",
            Field::Equipment => "equipment",
            Field::Skills => "skills",
            Field::Loot => "loot",
        }
    }
}

/// Set of [`Field`]s backed by a single `u16`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FieldSet(u16);

impl FieldSet {
    pub const EMPTY: FieldSet = FieldSet(0);

    /// Identity fields every full snapshot must carry.
    pub const MANDATORY: FieldSet = FieldSet(
        (1 << Field::Name as u8)
            | (1 << Field::Position as u8)
            | (1 << Field::World as u8)
            | (1 << Field::AccountType as u8),
    );

    pub const ALL: FieldSet = FieldSet((1 << 11) - 1);

    pub fn from_bits_truncate(bits: u16) -> Self {
        FieldSet(bits & Self::ALL.0)
    }

    pub fn bits(self) -> u16 {
        self.0
    }

    pub fn of(fields: &[Field]) -> Self {
        fields.iter().copied().collect()
    }

    pub fn insert(&mut self, field: Field) {
        self.0 |= field.bit();
    }

    pub fn remove(&mut self, field: Field) {
        self.0 &= !field.bit();
    }

    pub fn contains(self, field: Field) -> bool {
        self.0 & field.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Every field of `self` is also in `other`.
    pub fn is_subset(self, other: FieldSet) -> bool {
        self.0 & !other.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Field> {
        Field::ALL.into_iter().filter(move |f| self.contains(*f))
    }
}

impl FromIterator<Field> for FieldSet {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        let mut set = FieldSet::EMPTY;
        for f in iter {
            set.insert(f);
        }
        set
    }
}

impl From<Field> for FieldSet {
    fn from(f: Field) -> Self {
        FieldSet(f.bit())
    }
}

impl BitOr for FieldSet {
    type Output = FieldSet;
    fn bitor(self, rhs: FieldSet) -> FieldSet {
        FieldSet(self.0 | rhs.0)
    }
}

impl BitOr<Field> for FieldSet {
    type Output = FieldSet;
    fn bitor(self, rhs: Field) -> FieldSet {
        FieldSet(self.0 | rhs.bit())
    }
}

impl BitOrAssign<Field> for FieldSet {
    fn bitor_assign(&mut self, rhs: Field) {
        self.insert(rhs);
    }
}

impl Sub for FieldSet {
    type Output = FieldSet;
    fn sub(self, rhs: FieldSet) -> FieldSet {
        FieldSet(self.0 & !rhs.0)
    }
}

impl fmt::Debug for FieldSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(Field::as_str)).finish()
    }
}
