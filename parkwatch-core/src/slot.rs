use parkwatch_shared::Masked;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{CoreError, CoreResult};

/// Slot identity: zone letter plus 1-based index, rendered as `A-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId {
    zone: char,
    index: u32,
}

impl SlotId {
    pub fn new(zone: char, index: u32) -> CoreResult<Self> {
        if !zone.is_ascii_uppercase() || index == 0 {
            return Err(CoreError::ValidationError(format!(
                "Invalid slot id: {}-{}",
                zone, index
            )));
        }
        Ok(Self { zone, index })
    }

    pub fn zone(&self) -> char {
        self.zone
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    /// Every slot of the lot, zone by zone.
    pub fn seed_set(zones: &[char], slots_per_zone: u32) -> CoreResult<Vec<SlotId>> {
        let mut ids = Vec::with_capacity(zones.len() * slots_per_zone as usize);
        for &zone in zones {
            for index in 1..=slots_per_zone {
                ids.push(SlotId::new(zone, index)?);
            }
        }
        Ok(ids)
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.zone, self.index)
    }
}

impl FromStr for SlotId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::ValidationError(format!("Invalid slot id: {}", s));

        let (zone, index) = s.split_once('-').ok_or_else(invalid)?;
        let mut chars = zone.chars();
        let zone = match (chars.next(), chars.next()) {
            (Some(c), None) => c,
            _ => return Err(invalid()),
        };
        let index: u32 = index.parse().map_err(|_| invalid())?;
        let id = SlotId::new(zone, index).map_err(|_| invalid())?;

        // Only the canonical spelling names a slot: no padding, signs or zeros.
        if id.to_string() != s {
            return Err(invalid());
        }
        Ok(id)
    }
}

impl Serialize for SlotId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SlotId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    Vacant,
    Occupied,
}

impl SlotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotStatus::Vacant => "vacant",
            SlotStatus::Occupied => "occupied",
        }
    }
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SlotStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vacant" => Ok(SlotStatus::Vacant),
            "occupied" => Ok(SlotStatus::Occupied),
            other => Err(CoreError::StorageError(format!("Unknown slot status: {}", other))),
        }
    }
}

/// Whoever is parked in a slot. Phone numbers stay masked in logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occupant {
    pub registration: String,
    pub phone: Masked<String>,
}

impl Occupant {
    /// Validates both fields; registration is checked first.
    pub fn new(registration: &str, phone: &str) -> CoreResult<Self> {
        crate::validation::validate_registration(registration)?;
        crate::validation::validate_phone(phone)?;
        Ok(Self {
            registration: registration.to_string(),
            phone: Masked(phone.to_string()),
        })
    }
}

/// A slot is occupied exactly when it has an occupant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParkingSlot {
    pub slot_id: SlotId,
    pub occupant: Option<Occupant>,
}

impl ParkingSlot {
    pub fn vacant(slot_id: SlotId) -> Self {
        Self { slot_id, occupant: None }
    }

    pub fn status(&self) -> SlotStatus {
        match self.occupant {
            Some(_) => SlotStatus::Occupied,
            None => SlotStatus::Vacant,
        }
    }

    pub fn is_vacant(&self) -> bool {
        self.occupant.is_none()
    }

    /// Rebuilds a slot from stored columns, rejecting rows that break the
    /// status/occupant pairing.
    pub fn from_columns(
        slot_id: &str,
        status: &str,
        registration: Option<String>,
        phone: Option<String>,
    ) -> CoreResult<Self> {
        let slot_id: SlotId = slot_id
            .parse()
            .map_err(|_| CoreError::StorageError(format!("Corrupt slot id: {}", slot_id)))?;

        let occupant = match (status.parse::<SlotStatus>()?, registration, phone) {
            (SlotStatus::Occupied, Some(registration), Some(phone)) => Some(Occupant {
                registration,
                phone: Masked(phone),
            }),
            (SlotStatus::Vacant, None, None) => None,
            (status, _, _) => {
                return Err(CoreError::StorageError(format!(
                    "Slot {} is {} but occupant data does not match",
                    slot_id, status
                )))
            }
        };

        Ok(Self { slot_id, occupant })
    }
}
