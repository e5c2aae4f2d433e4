//! File selection and binary access.
//!
//! Tracks the current dedicated and elementary file across commands;
//! READ/UPDATE BINARY support both explicit offsets and short-file-id
//! addressing. Every access is gated by the file's per-operation policy.

use crate::apdu::{ins, CommandApdu, ResponseApdu, Status};
use crate::cardobjects::{IdMatcher, Identifier, LifeCycle, ObjectId, ObjectKind, ObjectTree, Operation};
use crate::secstatus::SecurityStatus;
use crate::tlv::Tlv;

use super::CardProtocol;

const MF_FILE_ID: u16 = 0x3F00;

pub struct FileProtocol {
    current_df: Option<ObjectId>,
    current_ef: Option<ObjectId>,
}

impl FileProtocol {
    pub fn new() -> Self {
        FileProtocol {
            current_df: None,
            current_ef: None,
        }
    }

    fn df(&self, tree: &ObjectTree) -> ObjectId {
        self.current_df.unwrap_or_else(|| tree.root())
    }

    fn select(&mut self, command: &CommandApdu, tree: &ObjectTree) -> ResponseApdu {
        let selected = match command.p1 {
            // Select MF, DF or EF by file identifier.
            0x00 | 0x01 | 0x02 => {
                if command.data.is_empty() {
                    Some(tree.root())
                } else if command.data.len() == 2 {
                    let file_id = u16::from_be_bytes([command.data[0], command.data[1]]);
                    if file_id == MF_FILE_ID {
                        Some(tree.root())
                    } else {
                        let matcher = [IdMatcher::exactly(Identifier::FileId(file_id))];
                        tree.find_child(self.df(tree), &matcher)
                            .or_else(|| tree.find_descendant(tree.root(), &matcher))
                    }
                } else {
                    return Status::IncorrectData.into();
                }
            }
            // Select by DF name (application identifier).
            0x04 => tree.find_descendant(
                tree.root(),
                &[IdMatcher::exactly(Identifier::Aid(command.data.clone()))],
            ),
            _ => return Status::IncorrectP1P2.into(),
        };

        let Some(id) = selected else {
            return Status::FileNotFound.into();
        };
        let Ok(object) = tree.get(id) else {
            return Status::FileNotFound.into();
        };
        match object.kind {
            ObjectKind::ElementaryFile { .. } => {
                self.current_ef = Some(id);
            }
            ObjectKind::Container => {
                self.current_df = Some(id);
                self.current_ef = None;
            }
            _ => return Status::FileNotFound.into(),
        }
        if object.life_cycle == LifeCycle::OperationalDeactivated {
            return Status::ReferenceDeactivated.into();
        }
        Status::Ok.into()
    }

    /// Resolves the addressed EF and byte offset of a READ/UPDATE BINARY
    /// command; P1 bit 8 switches to short-file-id addressing.
    fn resolve_target(&mut self, command: &CommandApdu, tree: &ObjectTree) -> Result<(ObjectId, usize), Status> {
        if command.p1 & 0x80 != 0 {
            let short_id = command.p1 & 0x1F;
            let matcher = [IdMatcher::exactly(Identifier::ShortFileId(short_id))];
            let id = tree
                .find_child(self.df(tree), &matcher)
                .or_else(|| tree.find_descendant(tree.root(), &matcher))
                .ok_or(Status::FileNotFound)?;
            self.current_ef = Some(id);
            Ok((id, command.p2 as usize))
        } else {
            let id = self.current_ef.ok_or(Status::NoCurrentEf)?;
            Ok((id, usize::from(command.p1) << 8 | usize::from(command.p2)))
        }
    }

    fn read_binary(&mut self, command: &CommandApdu, tree: &ObjectTree, status: &SecurityStatus) -> ResponseApdu {
        let (id, offset) = match self.resolve_target(command, tree) {
            Ok(target) => target,
            Err(word) => return word.into(),
        };
        let Ok(object) = tree.get(id) else {
            return Status::FileNotFound.into();
        };
        if object.life_cycle == LifeCycle::OperationalDeactivated {
            return Status::ConditionsNotSatisfied.into();
        }
        if !object.allows(Operation::Read, status) {
            return Status::SecurityStatusNotSatisfied.into();
        }
        let ObjectKind::ElementaryFile { content, .. } = &object.kind else {
            return Status::FileNotFound.into();
        };
        if offset > content.len() {
            return Status::OffsetOutsideEf.into();
        }
        let requested = command.le.unwrap_or(256);
        let end = content.len().min(offset + requested);
        ResponseApdu::new(Status::Ok, content[offset..end].to_vec())
    }

    fn update_binary(
        &mut self,
        command: &CommandApdu,
        tree: &mut ObjectTree,
        status: &SecurityStatus,
    ) -> ResponseApdu {
        let (id, offset) = match self.resolve_target(command, tree) {
            Ok(target) => target,
            Err(word) => return word.into(),
        };
        {
            let Ok(object) = tree.get(id) else {
                return Status::FileNotFound.into();
            };
            if object.life_cycle == LifeCycle::OperationalDeactivated {
                return Status::ConditionsNotSatisfied.into();
            }
            if !object.allows(Operation::Update, status) {
                return Status::SecurityStatusNotSatisfied.into();
            }
        }
        let Ok(object) = tree.get_mut(id) else {
            return Status::FileNotFound.into();
        };
        let ObjectKind::ElementaryFile { content, .. } = &mut object.kind else {
            return Status::FileNotFound.into();
        };
        if offset + command.data.len() > content.len() {
            return Status::OffsetOutsideEf.into();
        }
        content[offset..offset + command.data.len()].copy_from_slice(&command.data);
        Status::Ok.into()
    }

    fn delete_file(&mut self, command: &CommandApdu, tree: &mut ObjectTree, status: &SecurityStatus) -> ResponseApdu {
        let id = if command.data.is_empty() {
            match self.current_ef {
                Some(id) => id,
                None => return Status::NoCurrentEf.into(),
            }
        } else if command.data.len() == 2 {
            let file_id = u16::from_be_bytes([command.data[0], command.data[1]]);
            let matcher = [IdMatcher::exactly(Identifier::FileId(file_id))];
            match tree
                .find_child(self.df(tree), &matcher)
                .or_else(|| tree.find_descendant(tree.root(), &matcher))
            {
                Some(id) => id,
                None => return Status::FileNotFound.into(),
            }
        } else {
            return Status::IncorrectData.into();
        };

        match tree.check_access(id, Operation::Delete, status) {
            Ok(true) => {}
            _ => return Status::SecurityStatusNotSatisfied.into(),
        }
        if tree.remove(id).is_err() {
            return Status::FileNotFound.into();
        }
        if self.current_ef == Some(id) {
            self.current_ef = None;
        }
        Status::Ok.into()
    }

    fn set_life_cycle(
        &mut self,
        tree: &mut ObjectTree,
        status: &SecurityStatus,
        life_cycle: LifeCycle,
    ) -> ResponseApdu {
        let Some(id) = self.current_ef else {
            return Status::NoCurrentEf.into();
        };
        match tree.check_access(id, Operation::Update, status) {
            Ok(true) => {}
            _ => return Status::SecurityStatusNotSatisfied.into(),
        }
        match tree.get_mut(id) {
            Ok(object) => {
                object.life_cycle = life_cycle;
                Status::Ok.into()
            }
            Err(_) => Status::FileNotFound.into(),
        }
    }
}

impl CardProtocol for FileProtocol {
    fn name(&self) -> &'static str {
        "file management"
    }

    fn handles(&self, command: &CommandApdu) -> bool {
        match command.ins {
            ins::SELECT | ins::READ_BINARY | ins::UPDATE_BINARY | ins::DELETE_FILE => true,
            // Password objects are activated/deactivated with P1 = 0x10 by
            // the password protocol.
            ins::ACTIVATE_FILE | ins::DEACTIVATE_FILE => command.p1 != 0x10,
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
            ins::SELECT => self.select(command, tree),
            ins::READ_BINARY => self.read_binary(command, tree, status),
            ins::UPDATE_BINARY => self.update_binary(command, tree, status),
            ins::DELETE_FILE => self.delete_file(command, tree, status),
            ins::ACTIVATE_FILE => self.set_life_cycle(tree, status, LifeCycle::OperationalActivated),
            ins::DEACTIVATE_FILE => self.set_life_cycle(tree, status, LifeCycle::OperationalDeactivated),
            _ => Status::InstructionNotSupported.into(),
        }
    }

    fn security_infos(&self, _tree: &ObjectTree) -> Vec<Tlv> {
        Vec::new()
    }

    fn reset(&mut self) {
        self.current_df = None;
        self.current_ef = None;
    }
}

impl Default for FileProtocol {
    fn default() -> Self {
        FileProtocol::new()
    }
}
