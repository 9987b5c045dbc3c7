// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Return-link spectrum partition: carriers groups and terminal categories.
//!
//! A category groups carriers of one access class and owns the set of
//! terminals assigned to it. Categories are built once from configuration and
//! never re-shaped during operation; terminals attach at logon and detach at
//! logoff. Each terminal belongs to exactly one category per access type.
//!
//! `remaining_capacity` on a group is working state of the allocator: reset
//! from the carrier dimensions at every superframe, consumed by the RBDC,
//! VBDC and FCA rounds in that order.

use crate::config::{CarrierParams, CategoryParams};
use crate::types::{CarrierId, ModcodId, RatePktPf, TalId};

/// Access class served by a carriers group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessType {
    /// Demand-assigned capacity (RBDC/VBDC/FCA).
    Dama,
    /// Slotted-Aloha random access.
    Aloha,
    /// Dedicated single channel per carrier, bypasses DAMA.
    Scpc,
    /// Variable coding and modulation forward carriers.
    Vcm,
}

/// A group of identical carriers inside one category.
#[derive(Debug, Clone)]
pub struct CarriersGroup {
    carriers_id: CarrierId,
    symbol_rate_bauds: u64,
    carriers_count: u32,
    /// Usable MODCOD ids, ordered low to high.
    modcod_ids: Vec<ModcodId>,
    ratio: u32,
    access_type: AccessType,
    slots_per_carrier: u16,
    /// Packets still unallocated in the current superframe.
    remaining_capacity_pktpf: RatePktPf,
}

impl CarriersGroup {
    /// Build a group from its configuration entry.
    pub fn from_params(params: &CarrierParams) -> Self {
        Self {
            carriers_id: params.carriers_id,
            symbol_rate_bauds: params.symbol_rate_bauds,
            carriers_count: params.carriers_count,
            modcod_ids: params.modcod_ids.clone(),
            ratio: params.ratio,
            access_type: params.access_type,
            slots_per_carrier: params.slots_per_carrier,
            remaining_capacity_pktpf: 0,
        }
    }

    /// Group identifier.
    pub fn carriers_id(&self) -> CarrierId {
        self.carriers_id
    }

    /// Symbol rate of each carrier, in bauds.
    pub fn symbol_rate_bauds(&self) -> u64 {
        self.symbol_rate_bauds
    }

    /// Number of identical carriers.
    pub fn carriers_count(&self) -> u32 {
        self.carriers_count
    }

    /// Access class of the group.
    pub fn access_type(&self) -> AccessType {
        self.access_type
    }

    /// Assignment weight relative to sibling groups.
    pub fn ratio(&self) -> u32 {
        self.ratio
    }

    /// Time slots per carrier and superframe (random-access groups).
    pub fn slots_per_carrier(&self) -> u16 {
        self.slots_per_carrier
    }

    /// Total random-access slots the group offers per superframe.
    pub fn total_slots(&self) -> u16 {
        (u32::from(self.slots_per_carrier) * self.carriers_count).min(u32::from(u16::MAX)) as u16
    }

    /// Usable MODCOD ids, low to high.
    pub fn modcod_ids(&self) -> &[ModcodId] {
        &self.modcod_ids
    }

    /// The single MODCOD DAMA converts capacity with (highest usable).
    pub fn dama_modcod_id(&self) -> ModcodId {
        *self.modcod_ids.last().unwrap_or(&0)
    }

    /// True when the group's MODCOD set contains `id`.
    pub fn supports_modcod(&self, id: ModcodId) -> bool {
        self.modcod_ids.contains(&id)
    }

    /// Unallocated packets in the current superframe.
    pub fn remaining_capacity(&self) -> RatePktPf {
        self.remaining_capacity_pktpf
    }

    /// Reset the working capacity at the start of a superframe.
    pub fn set_remaining_capacity(&mut self, pktpf: RatePktPf) {
        self.remaining_capacity_pktpf = pktpf;
    }
}

/// A terminal category: label, carriers groups and attached terminals.
#[derive(Debug, Clone)]
pub struct TerminalCategory {
    label: String,
    groups: Vec<CarriersGroup>,
    terminals: Vec<TalId>,
}

impl TerminalCategory {
    /// Build a category from its configuration entry.
    pub fn from_params(params: &CategoryParams) -> Self {
        Self {
            label: params.label.clone(),
            groups: params.carriers.iter().map(CarriersGroup::from_params).collect(),
            terminals: Vec::new(),
        }
    }

    /// Category label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Carriers groups, in configuration order.
    pub fn groups(&self) -> &[CarriersGroup] {
        &self.groups
    }

    /// Mutable access to the carriers groups (allocator only).
    pub fn groups_mut(&mut self) -> &mut [CarriersGroup] {
        &mut self.groups
    }

    /// First group serving `access_type`, if any.
    pub fn group_for_access(&self, access_type: AccessType) -> Option<&CarriersGroup> {
        self.groups.iter().find(|g| g.access_type() == access_type)
    }

    /// Attach a terminal (logon). Duplicate attaches are ignored.
    pub fn attach_terminal(&mut self, tal_id: TalId) {
        if !self.terminals.contains(&tal_id) {
            self.terminals.push(tal_id);
        }
    }

    /// Detach a terminal (logoff); true when it was attached.
    pub fn detach_terminal(&mut self, tal_id: TalId) -> bool {
        match self.terminals.iter().position(|&t| t == tal_id) {
            Some(pos) => {
                self.terminals.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Terminals attached to this category, in logon order.
    pub fn terminals(&self) -> &[TalId] {
        &self.terminals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(access: AccessType) -> CarriersGroup {
        CarriersGroup::from_params(&CarrierParams {
            carriers_id: 1,
            symbol_rate_bauds: 1_000_000,
            carriers_count: 2,
            modcod_ids: vec![4, 5, 7],
            ratio: 10,
            access_type: access,
            slots_per_carrier: 100,
        })
    }

    fn category() -> TerminalCategory {
        TerminalCategory::from_params(&CategoryParams {
            label: "Standard".into(),
            carriers: vec![CarrierParams {
                carriers_id: 1,
                symbol_rate_bauds: 1_000_000,
                carriers_count: 1,
                modcod_ids: vec![4, 7],
                ratio: 10,
                access_type: AccessType::Dama,
                slots_per_carrier: 0,
            }],
        })
    }

    #[test]
    fn test_group_modcod_support() {
        let g = group(AccessType::Dama);
        assert!(g.supports_modcod(5));
        assert!(!g.supports_modcod(6));
        assert_eq!(g.dama_modcod_id(), 7);
    }

    #[test]
    fn test_group_total_slots() {
        let g = group(AccessType::Aloha);
        assert_eq!(g.total_slots(), 200);
    }

    #[test]
    fn test_remaining_capacity_reset() {
        let mut g = group(AccessType::Dama);
        assert_eq!(g.remaining_capacity(), 0);
        g.set_remaining_capacity(150);
        assert_eq!(g.remaining_capacity(), 150);
    }

    #[test]
    fn test_category_attach_detach() {
        let mut cat = category();
        cat.attach_terminal(1);
        cat.attach_terminal(2);
        cat.attach_terminal(1); // duplicate ignored
        assert_eq!(cat.terminals(), &[1, 2]);
        assert!(cat.detach_terminal(1));
        assert!(!cat.detach_terminal(1));
        assert_eq!(cat.terminals(), &[2]);
    }

    #[test]
    fn test_group_for_access() {
        let cat = category();
        assert!(cat.group_for_access(AccessType::Dama).is_some());
        assert!(cat.group_for_access(AccessType::Aloha).is_none());
    }
}
