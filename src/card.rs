//! The simulated card: object tree, session status and protocol dispatch.

use tracing::instrument;

use crate::apdu::{ins, CommandApdu, ResponseApdu, Status};
use crate::cardobjects::{CardObject, ObjectTree};
use crate::protocols::{default_protocols, CardProtocol};
use crate::secstatus::SecurityStatus;
use crate::tlv::Tlv;

/// One logical card servicing one session.
///
/// Commands are processed strictly one at a time; the caller owns the
/// command loop and any transport concurrency around it. The tree is
/// populated by an external personalization builder through [Card::tree_mut]
/// before the first command.
pub struct Card {
    tree: ObjectTree,
    status: SecurityStatus,
    protocols: Vec<Box<dyn CardProtocol>>,
}

impl Card {
    /// Creates a card over a personalized object tree with the standard
    /// protocol set.
    pub fn new(tree: ObjectTree) -> Self {
        Card::with_protocols(tree, default_protocols())
    }

    /// Creates a card with a custom protocol list; dispatch order is the
    /// list order.
    pub fn with_protocols(tree: ObjectTree, protocols: Vec<Box<dyn CardProtocol>>) -> Self {
        Card {
            tree,
            status: SecurityStatus::new(),
            protocols,
        }
    }

    /// Creates a card holding only a master file, for personalization from
    /// scratch.
    pub fn with_root(root: CardObject) -> Self {
        Card::new(ObjectTree::new(root))
    }

    /// Processes one raw command APDU and returns the raw response.
    ///
    /// Never panics on malformed input: anything the card edge rejects is
    /// reported through the response status word.
    #[instrument(level = "debug", skip_all)]
    pub fn process(&mut self, raw: &[u8]) -> Vec<u8> {
        let command = match CommandApdu::parse(raw) {
            Ok(command) => command,
            Err(word) => return ResponseApdu::from(word).into(),
        };
        // Only the plain class with optional command chaining is spoken
        // here; secure-messaging classes are outside this layer.
        if command.cla & !0x10 != 0 {
            return ResponseApdu::from(Status::ClassNotSupported).into();
        }

        let claimed = self.protocols.iter().position(|protocol| protocol.handles(&command));
        let Some(index) = claimed else {
            debug!(ins = command.ins, "no protocol claimed the command");
            return ResponseApdu::from(Status::InstructionNotSupported).into();
        };
        // An MSE:SET hands the selection to the claiming protocol; pending
        // selections elsewhere would otherwise shadow later generic
        // instructions.
        if command.ins == ins::MSE_SET {
            for (position, protocol) in self.protocols.iter_mut().enumerate() {
                if position != index {
                    protocol.clear_selection();
                }
            }
        }
        let protocol = &mut self.protocols[index];
        trace!(protocol = protocol.name(), ins = command.ins, "command dispatched");
        protocol.process(&command, &mut self.tree, &mut self.status).into()
    }

    /// Resets the session: security status and all transient protocol
    /// state, as on card removal. Persistent objects keep their state.
    pub fn reset(&mut self) {
        self.status.reset();
        for protocol in &mut self.protocols {
            protocol.reset();
        }
    }

    pub fn tree(&self) -> &ObjectTree {
        &self.tree
    }

    /// Mutable tree access for the personalization builder.
    pub fn tree_mut(&mut self) -> &mut ObjectTree {
        &mut self.tree
    }

    pub fn status(&self) -> &SecurityStatus {
        &self.status
    }

    /// The security-info objects all protocols contribute; an external
    /// assembler turns these into the card's discovery file.
    pub fn security_infos(&self) -> Vec<Tlv> {
        self.protocols
            .iter()
            .flat_map(|protocol| protocol.security_infos(&self.tree))
            .collect()
    }
}
