//! Password management: retry-status queries, change, unblock and
//! activation state, addressed by the password's auth-object identifier
//! in P2.

use crate::apdu::{ins, CommandApdu, ResponseApdu, Status};
use crate::cardobjects::{LifeCycle, ObjectKind, ObjectTree, Operation};
use crate::secstatus::SecurityStatus;

use super::{find_password, CardProtocol};

pub struct PasswordProtocol;

impl PasswordProtocol {
    pub fn new() -> Self {
        PasswordProtocol
    }

    /// VERIFY with an empty body reports the password's usability through
    /// the status word alone; the secret itself is only ever proven via
    /// PACE.
    fn verify(&self, command: &CommandApdu, tree: &ObjectTree) -> ResponseApdu {
        if !command.data.is_empty() {
            return Status::IncorrectData.into();
        }
        let Some(id) = find_password(tree, command.p2) else {
            return Status::ReferenceNotFound.into();
        };
        let Ok(object) = tree.get(id) else {
            return Status::ReferenceNotFound.into();
        };
        if !object.life_cycle.usable_for_authentication() {
            return Status::ReferenceDeactivated.into();
        }
        let ObjectKind::Password(password) = &object.kind else {
            return Status::ReferenceNotFound.into();
        };
        if password.is_blocked() {
            return Status::AuthMethodBlocked.into();
        }
        match &password.retry {
            Some(retry) if retry.remaining < retry.limit => Status::RetriesRemaining(retry.remaining).into(),
            _ => Status::Ok.into(),
        }
    }

    fn change(&self, command: &CommandApdu, tree: &mut ObjectTree, status: &SecurityStatus) -> ResponseApdu {
        if command.p1 != 0x02 {
            return Status::IncorrectP1P2.into();
        }
        if command.data.is_empty() {
            return Status::WrongLength.into();
        }
        let Some(id) = find_password(tree, command.p2) else {
            return Status::ReferenceNotFound.into();
        };
        match tree.check_access(id, Operation::Change, status) {
            Ok(true) => {}
            _ => return Status::SecurityStatusNotSatisfied.into(),
        }
        let Ok(object) = tree.get_mut(id) else {
            return Status::ReferenceNotFound.into();
        };
        let ObjectKind::Password(password) = &mut object.kind else {
            return Status::ReferenceNotFound.into();
        };
        *password.value = command.data.clone();
        if let Some(retry) = &mut password.retry {
            retry.reset();
        }
        info!(password_ref = command.p2, "reference data changed");
        Status::Ok.into()
    }

    /// RESET RETRY COUNTER: P1 = 0x02 also replaces the secret, P1 = 0x03
    /// only unblocks. The unblock consumes one try of the supervising
    /// secret the session authenticated with.
    fn reset_retry_counter(
        &self,
        command: &CommandApdu,
        tree: &mut ObjectTree,
        status: &SecurityStatus,
    ) -> ResponseApdu {
        let new_value = match command.p1 {
            0x02 if !command.data.is_empty() => Some(command.data.clone()),
            0x02 => return Status::WrongLength.into(),
            0x03 if command.data.is_empty() => None,
            0x03 => return Status::WrongLength.into(),
            _ => return Status::IncorrectP1P2.into(),
        };

        let Some(id) = find_password(tree, command.p2) else {
            return Status::ReferenceNotFound.into();
        };
        match tree.check_access(id, Operation::Unblock, status) {
            Ok(true) => {}
            _ => return Status::SecurityStatusNotSatisfied.into(),
        }

        // Charge the supervising secret first; a blocked supervisor cannot
        // unblock anything.
        if let Some(outcome) = status.pace() {
            if outcome.password_ref != command.p2 {
                if let Some(supervisor_id) = find_password(tree, outcome.password_ref) {
                    if let Ok(object) = tree.get_mut(supervisor_id) {
                        if let ObjectKind::Password(supervisor) = &mut object.kind {
                            if supervisor.is_blocked() {
                                return Status::AuthMethodBlocked.into();
                            }
                            if let Some(retry) = &mut supervisor.retry {
                                retry.decrement();
                            }
                        }
                    }
                }
            }
        }

        let Ok(object) = tree.get_mut(id) else {
            return Status::ReferenceNotFound.into();
        };
        let ObjectKind::Password(password) = &mut object.kind else {
            return Status::ReferenceNotFound.into();
        };
        if let Some(new_value) = new_value {
            *password.value = new_value;
        }
        if let Some(retry) = &mut password.retry {
            retry.reset();
        }
        info!(password_ref = command.p2, "retry counter reset");
        Status::Ok.into()
    }

    fn set_life_cycle(
        &self,
        command: &CommandApdu,
        tree: &mut ObjectTree,
        status: &SecurityStatus,
        life_cycle: LifeCycle,
    ) -> ResponseApdu {
        let Some(id) = find_password(tree, command.p2) else {
            return Status::ReferenceNotFound.into();
        };
        // Gated like a change of the reference data (PIN management).
        match tree.check_access(id, Operation::Change, status) {
            Ok(true) => {}
            _ => return Status::SecurityStatusNotSatisfied.into(),
        }
        match tree.get_mut(id) {
            Ok(object) => {
                object.life_cycle = life_cycle;
                Status::Ok.into()
            }
            Err(_) => Status::ReferenceNotFound.into(),
        }
    }
}

impl CardProtocol for PasswordProtocol {
    fn name(&self) -> &'static str {
        "password management"
    }

    fn handles(&self, command: &CommandApdu) -> bool {
        match command.ins {
            ins::VERIFY | ins::CHANGE_REFERENCE_DATA | ins::RESET_RETRY_COUNTER => true,
            ins::ACTIVATE_FILE | ins::DEACTIVATE_FILE => command.p1 == 0x10,
            _ => false,
        }
    }

    fn process(
        &mut self,
        command: &CommandApdu,
        tree: &mut ObjectTree,
        status: &mut SecurityStatus,
    ) -> ResponseApdu {
        match command.ins {
            ins::VERIFY => self.verify(command, tree),
            ins::CHANGE_REFERENCE_DATA => self.change(command, tree, status),
            ins::RESET_RETRY_COUNTER => self.reset_retry_counter(command, tree, status),
            ins::ACTIVATE_FILE => self.set_life_cycle(command, tree, status, LifeCycle::OperationalActivated),
            ins::DEACTIVATE_FILE => self.set_life_cycle(command, tree, status, LifeCycle::OperationalDeactivated),
            _ => Status::InstructionNotSupported.into(),
        }
    }

    fn reset(&mut self) {}
}

impl Default for PasswordProtocol {
    fn default() -> Self {
        PasswordProtocol::new()
    }
}
