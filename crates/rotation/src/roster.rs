//! Id-ordered member roster used for round robin.

use std::collections::HashMap;

use rotator_core::{DutyId, Member, MemberId, Result, RotatorError};

/// Members sorted by id, with a position index keyed by member id.
#[derive(Debug, Clone)]
pub struct Roster {
    members: Vec<Member>,
    positions: HashMap<MemberId, usize>,
}

impl Roster {
    /// Build a roster for `duty_id`. Fails with [`RotatorError::EmptyRoster`]
    /// when there is nobody to rotate to.
    pub fn new(duty_id: DutyId, mut members: Vec<Member>) -> Result<Self> {
        if members.is_empty() {
            return Err(RotatorError::EmptyRoster(duty_id));
        }
        members.sort_by_key(|m| m.id);
        members.dedup_by_key(|m| m.id);

        let positions = members
            .iter()
            .enumerate()
            .map(|(i, m)| (m.id, i))
            .collect();

        Ok(Self { members, positions })
    }

    /// The member with the lowest id; seeds new assignments.
    pub fn first(&self) -> &Member {
        &self.members[0]
    }

    pub fn get(&self, id: MemberId) -> Option<&Member> {
        self.positions.get(&id).map(|&i| &self.members[i])
    }

    /// The member `steps` places after `current`, wrapping around.
    pub fn nth_after(&self, current: MemberId, steps: usize) -> Result<&Member> {
        let index = self
            .positions
            .get(&current)
            .copied()
            .ok_or_else(|| RotatorError::MemberNotFound(format!("id {current}")))?;
        Ok(&self.members[(index + steps) % self.members.len()])
    }

    /// Round-robin successor of `current`.
    pub fn next_after(&self, current: MemberId) -> Result<&Member> {
        self.nth_after(current, 1)
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
