//! Replicated configuration commands.
//!
//! Every command travels through the raft log as bytes framed as
//! `[int32 kind tag][kind-specific payload]`, big-endian. A receiving node
//! reads the tag, resolves it through [`CommandKind::from_tag`], and hands the
//! rest of the stream to that kind's decoder. Nodes never share command
//! objects; each one rebuilds a fresh [`ConfigCommand`] from the committed
//! bytes.

mod data_node;
pub(crate) mod frame;
mod kind;
mod region_group;
mod storage_group;

pub use data_node::*;
pub use kind::*;
pub use region_group::*;
pub use storage_group::*;

use crate::error::{DecodeError, EncodeError};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::Write;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConfigCommand {
    RegisterDataNode(RegisterDataNode),
    SetStorageGroup(SetStorageGroup),
    DeleteStorageGroup(DeleteStorageGroup),
    CreateRegionGroups(CreateRegionGroups),
}

impl ConfigCommand {
    pub fn kind(&self) -> CommandKind {
        match self {
            ConfigCommand::RegisterDataNode(_) => CommandKind::RegisterDataNode,
            ConfigCommand::SetStorageGroup(_) => CommandKind::SetStorageGroup,
            ConfigCommand::DeleteStorageGroup(_) => CommandKind::DeleteStorageGroup,
            ConfigCommand::CreateRegionGroups(_) => CommandKind::CreateRegionGroups,
        }
    }

    /// Writes the kind tag followed by the payload.
    pub fn encode_to<B: BufMut>(&self, buf: &mut B) -> Result<(), EncodeError> {
        buf.put_i32(self.kind().tag());
        match self {
            ConfigCommand::RegisterDataNode(cmd) => cmd.encode_payload(buf),
            ConfigCommand::SetStorageGroup(cmd) => cmd.encode_payload(buf),
            ConfigCommand::DeleteStorageGroup(cmd) => cmd.encode_payload(buf),
            ConfigCommand::CreateRegionGroups(cmd) => cmd.encode_payload(buf),
        }
    }

    pub fn encode(&self) -> Result<Bytes, EncodeError> {
        let mut buf = BytesMut::new();
        self.encode_to(&mut buf)?;
        Ok(buf.freeze())
    }

    pub fn write_to<W: Write>(&self, sink: &mut W) -> Result<(), EncodeError> {
        let bytes = self.encode()?;
        sink.write_all(&bytes)?;
        Ok(())
    }

    /// Decodes exactly one command. Leftover bytes are an error so that a
    /// given byte string has a single meaning on every node.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut buf = bytes;
        let command = Self::decode_from(&mut buf)?;
        if buf.has_remaining() {
            return Err(DecodeError::TrailingBytes {
                count: buf.remaining(),
            });
        }
        Ok(command)
    }

    pub fn decode_from<B: Buf>(buf: &mut B) -> Result<Self, DecodeError> {
        let tag = frame::get_i32(buf, "command kind tag")?;
        let command = match CommandKind::from_tag(tag)? {
            CommandKind::RegisterDataNode => {
                ConfigCommand::RegisterDataNode(RegisterDataNode::decode_payload(buf)?)
            }
            CommandKind::SetStorageGroup => {
                ConfigCommand::SetStorageGroup(SetStorageGroup::decode_payload(buf)?)
            }
            CommandKind::DeleteStorageGroup => {
                ConfigCommand::DeleteStorageGroup(DeleteStorageGroup::decode_payload(buf)?)
            }
            CommandKind::CreateRegionGroups => {
                ConfigCommand::CreateRegionGroups(CreateRegionGroups::decode_payload(buf)?)
            }
        };
        Ok(command)
    }
}

impl From<RegisterDataNode> for ConfigCommand {
    fn from(cmd: RegisterDataNode) -> Self {
        ConfigCommand::RegisterDataNode(cmd)
    }
}

impl From<SetStorageGroup> for ConfigCommand {
    fn from(cmd: SetStorageGroup) -> Self {
        ConfigCommand::SetStorageGroup(cmd)
    }
}

impl From<DeleteStorageGroup> for ConfigCommand {
    fn from(cmd: DeleteStorageGroup) -> Self {
        ConfigCommand::DeleteStorageGroup(cmd)
    }
}

impl From<CreateRegionGroups> for ConfigCommand {
    fn from(cmd: CreateRegionGroups) -> Self {
        ConfigCommand::CreateRegionGroups(cmd)
    }
}
