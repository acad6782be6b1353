//! Terminal slot classification and allocation.
//!
//! Only "Implement All"-style runs occupy one of the visible terminal slots.
//! The label decides: [`classify`] maps it against a closed table of
//! patterns, and [`next_free_slot`] hands out the lowest slot not held by a
//! running slot-bearing run.

use super::types::{Run, SLOT_COUNT, Slot};

/// Slot-bearing run kinds, one per label pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotBearing {
    /// `Implement All` or `Implement All (...)`.
    ImplementAll,
    /// `Ticket #N: ...`.
    Ticket,
    /// `Analyze: ...`.
    Analyze,
    /// `Debug: ...`.
    Debug,
    /// `Fast dev: ...`.
    FastDev,
    /// `Night shift ...`.
    NightShift,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunClass {
    SlotBearing(SlotBearing),
    Background,
}

impl RunClass {
    pub fn is_slot_bearing(self) -> bool {
        matches!(self, RunClass::SlotBearing(_))
    }
}

#[derive(Debug, Clone, Copy)]
enum LabelPattern {
    Exact(&'static str),
    Prefix(&'static str),
}

impl LabelPattern {
    fn matches(self, label: &str) -> bool {
        match self {
            LabelPattern::Exact(s) => label == s,
            LabelPattern::Prefix(p) => label.starts_with(p),
        }
    }
}

/// Label patterns that claim a slot. New slot-bearing run kinds are added here.
const SLOT_BEARING_LABELS: &[(LabelPattern, SlotBearing)] = &[
    (LabelPattern::Exact("Implement All"), SlotBearing::ImplementAll),
    (LabelPattern::Prefix("Implement All ("), SlotBearing::ImplementAll),
    (LabelPattern::Prefix("Ticket #"), SlotBearing::Ticket),
    (LabelPattern::Prefix("Analyze:"), SlotBearing::Analyze),
    (LabelPattern::Prefix("Debug:"), SlotBearing::Debug),
    (LabelPattern::Prefix("Fast dev:"), SlotBearing::FastDev),
    (LabelPattern::Prefix("Night shift"), SlotBearing::NightShift),
];

/// Classify a run by its label.
pub fn classify(label: &str) -> RunClass {
    SLOT_BEARING_LABELS
        .iter()
        .find(|(pattern, _)| pattern.matches(label))
        .map_or(RunClass::Background, |(_, kind)| RunClass::SlotBearing(*kind))
}

pub fn is_slot_bearing(label: &str) -> bool {
    classify(label).is_slot_bearing()
}

/// The lowest slot not held by a running slot-bearing run, or `None` when
/// all are taken.
pub fn next_free_slot<'a, I>(runs: I) -> Option<Slot>
where
    I: IntoIterator<Item = &'a Run>,
{
    let mut occupied = [false; SLOT_COUNT as usize];
    for run in runs {
        if !run.is_running() || !is_slot_bearing(&run.label) {
            continue;
        }
        if let Some(slot) = run.slot {
            occupied[usize::from(slot.get() - 1)] = true;
        }
    }
    Slot::ALL
        .into_iter()
        .zip(occupied)
        .find_map(|(slot, taken)| (!taken).then_some(slot))
}
