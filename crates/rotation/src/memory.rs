//! Process-local [`AssignmentStore`] used by the simulator and in tests.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use rotator_core::{
    Assignment, AssignmentId, Duty, DutyId, Member, MemberId, Result, RotatorError,
};

use crate::ports::{AssignmentStore, ChangeKind, DutySnapshot};
use crate::window::Window;

#[derive(Debug, Default)]
struct State {
    duties: BTreeMap<DutyId, Duty>,
    members: BTreeMap<MemberId, Member>,
    assignments: BTreeMap<AssignmentId, Assignment>,
    history: Vec<(Assignment, ChangeKind)>,
    next_assignment_id: i64,
}

/// Holds duties, members and assignments in memory behind a mutex.
///
/// Every successful [`save`](AssignmentStore::save) or
/// [`seed`](AssignmentStore::seed) is appended to a commit history so
/// callers can observe exactly what was written.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|e| RotatorError::Storage(format!("lock poisoned: {e}")))
    }

    pub fn insert_duty(&self, duty: Duty) -> Result<()> {
        self.lock()?.duties.insert(duty.id, duty);
        Ok(())
    }

    pub fn insert_member(&self, member: Member) -> Result<()> {
        self.lock()?.members.insert(member.id, member);
        Ok(())
    }

    /// Insert an assignment directly, without recording a commit.
    pub fn insert_assignment(&self, assignment: Assignment) -> Result<()> {
        let mut state = self.lock()?;
        state.next_assignment_id = state.next_assignment_id.max(assignment.id.0);
        state.assignments.insert(assignment.id, assignment);
        Ok(())
    }

    /// Live assignment of `duty_id`, if seeded.
    pub fn assignment_for(&self, duty_id: DutyId) -> Result<Option<Assignment>> {
        Ok(self
            .lock()?
            .assignments
            .values()
            .find(|a| a.duty_id == duty_id)
            .cloned())
    }

    pub fn member(&self, id: MemberId) -> Result<Option<Member>> {
        Ok(self.lock()?.members.get(&id).cloned())
    }

    /// Every committed write, oldest first.
    pub fn history(&self) -> Result<Vec<(Assignment, ChangeKind)>> {
        Ok(self.lock()?.history.clone())
    }
}

#[async_trait::async_trait]
impl AssignmentStore for InMemoryStore {
    async fn list_duties(&self) -> Result<Vec<DutyId>> {
        Ok(self.lock()?.duties.keys().copied().collect())
    }

    async fn load(&self, duty_id: DutyId) -> Result<DutySnapshot> {
        let state = self.lock()?;
        let duty = state
            .duties
            .get(&duty_id)
            .cloned()
            .ok_or(RotatorError::DutyNotFound(duty_id))?;
        let rule = duty.rotation_rule.parse()?;
        let assignment = state
            .assignments
            .values()
            .find(|a| a.duty_id == duty_id)
            .cloned();
        let members = state.members.values().cloned().collect();

        Ok(DutySnapshot {
            duty,
            rule,
            assignment,
            members,
        })
    }

    async fn save(&self, assignment: &Assignment, kind: ChangeKind) -> Result<()> {
        let mut state = self.lock()?;
        if !state.assignments.contains_key(&assignment.id) {
            return Err(RotatorError::AssignmentNotFound(format!("id {}", assignment.id)));
        }
        state.assignments.insert(assignment.id, assignment.clone());
        state.history.push((assignment.clone(), kind));
        Ok(())
    }

    async fn seed(&self, duty_id: DutyId, member_id: MemberId, window: Window) -> Result<Assignment> {
        let mut state = self.lock()?;
        if !state.duties.contains_key(&duty_id) {
            return Err(RotatorError::DutyNotFound(duty_id));
        }
        state.next_assignment_id += 1;
        let assignment = Assignment {
            id: AssignmentId(state.next_assignment_id),
            duty_id,
            start_date: window.start,
            end_date: window.end,
            member_id,
        };
        state.assignments.insert(assignment.id, assignment.clone());
        state.history.push((assignment.clone(), ChangeKind::Seed));
        Ok(assignment)
    }

    async fn load_assignment(&self, id: AssignmentId) -> Result<Option<Assignment>> {
        Ok(self.lock()?.assignments.get(&id).cloned())
    }

    async fn find_member_by_handle(&self, handle: &str) -> Result<Option<Member>> {
        Ok(self
            .lock()?
            .members
            .values()
            .find(|m| m.handle == handle)
            .cloned())
    }
}
