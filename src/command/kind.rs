use crate::error::DecodeError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Every kind of command the partition table can apply.
///
/// Tags are part of the replicated log format. Old entries must stay
/// decodable, so a tag is never reused or renumbered; new kinds take the next
/// free value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CommandKind {
    RegisterDataNode,
    SetStorageGroup,
    DeleteStorageGroup,
    CreateRegionGroups,
}

impl CommandKind {
    pub const ALL: [CommandKind; 4] = [
        CommandKind::RegisterDataNode,
        CommandKind::SetStorageGroup,
        CommandKind::DeleteStorageGroup,
        CommandKind::CreateRegionGroups,
    ];

    pub const fn tag(self) -> i32 {
        match self {
            CommandKind::RegisterDataNode => 0,
            CommandKind::SetStorageGroup => 1,
            CommandKind::DeleteStorageGroup => 2,
            CommandKind::CreateRegionGroups => 3,
        }
    }

    pub fn from_tag(tag: i32) -> Result<Self, DecodeError> {
        match tag {
            0 => Ok(CommandKind::RegisterDataNode),
            1 => Ok(CommandKind::SetStorageGroup),
            2 => Ok(CommandKind::DeleteStorageGroup),
            3 => Ok(CommandKind::CreateRegionGroups),
            _ => Err(DecodeError::UnknownKind { tag }),
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.tag())
    }
}
