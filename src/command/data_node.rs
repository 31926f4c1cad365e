use crate::error::{DecodeError, EncodeError};
use crate::replica_set::WireCodec;
use crate::types::DataNodeLocation;
use bytes::{Buf, BufMut};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegisterDataNode {
    pub location: DataNodeLocation,
}

impl RegisterDataNode {
    pub fn new(location: DataNodeLocation) -> Self {
        Self { location }
    }

    pub(crate) fn encode_payload<B: BufMut>(&self, buf: &mut B) -> Result<(), EncodeError> {
        self.location.encode_to(buf)
    }

    pub(crate) fn decode_payload<B: Buf>(buf: &mut B) -> Result<Self, DecodeError> {
        let location = DataNodeLocation::decode_from(buf)?;
        Ok(Self { location })
    }
}
