//! Wire codec for region placement descriptors.
//!
//! Commands carry [`RegionReplicaSet`] values as opaque units: they call
//! [`WireCodec::encode_to`] / [`WireCodec::decode_from`] and never look inside.

use crate::command::frame::{self, I32_LEN};
use crate::error::{DecodeError, EncodeError};
use crate::types::*;
use bytes::{Buf, BufMut};

pub trait WireCodec: Sized {
    /// Smallest number of bytes one encoded value can take. Used to reject
    /// declared counts that the remaining stream could never satisfy.
    const MIN_ENCODED_LEN: usize;

    fn encode_to<B: BufMut>(&self, buf: &mut B) -> Result<(), EncodeError>;

    fn decode_from<B: Buf>(buf: &mut B) -> Result<Self, DecodeError>;
}

impl WireCodec for ConsensusGroupId {
    const MIN_ENCODED_LEN: usize = 2 * I32_LEN;

    fn encode_to<B: BufMut>(&self, buf: &mut B) -> Result<(), EncodeError> {
        buf.put_i32(self.group_type.code());
        buf.put_i32(self.id);
        Ok(())
    }

    fn decode_from<B: Buf>(buf: &mut B) -> Result<Self, DecodeError> {
        let code = frame::get_i32(buf, "consensus group type")?;
        let group_type = ConsensusGroupType::from_code(code)
            .ok_or(DecodeError::UnknownGroupType { value: code })?;
        let id = frame::get_i32(buf, "consensus group id")?;
        Ok(ConsensusGroupId::new(group_type, id))
    }
}

impl WireCodec for Endpoint {
    const MIN_ENCODED_LEN: usize = 2 * I32_LEN;

    fn encode_to<B: BufMut>(&self, buf: &mut B) -> Result<(), EncodeError> {
        frame::put_str(buf, "endpoint ip", &self.ip)?;
        buf.put_i32(self.port);
        Ok(())
    }

    fn decode_from<B: Buf>(buf: &mut B) -> Result<Self, DecodeError> {
        let ip = frame::get_str(buf, "endpoint ip")?;
        let port = frame::get_i32(buf, "endpoint port")?;
        Ok(Endpoint { ip, port })
    }
}

impl WireCodec for DataNodeLocation {
    const MIN_ENCODED_LEN: usize = I32_LEN + Endpoint::MIN_ENCODED_LEN;

    fn encode_to<B: BufMut>(&self, buf: &mut B) -> Result<(), EncodeError> {
        buf.put_i32(self.data_node_id);
        self.internal_endpoint.encode_to(buf)
    }

    fn decode_from<B: Buf>(buf: &mut B) -> Result<Self, DecodeError> {
        let data_node_id = frame::get_i32(buf, "data node id")?;
        let internal_endpoint = Endpoint::decode_from(buf)?;
        Ok(DataNodeLocation {
            data_node_id,
            internal_endpoint,
        })
    }
}

impl WireCodec for RegionReplicaSet {
    const MIN_ENCODED_LEN: usize = ConsensusGroupId::MIN_ENCODED_LEN + I32_LEN;

    fn encode_to<B: BufMut>(&self, buf: &mut B) -> Result<(), EncodeError> {
        self.region_id.encode_to(buf)?;
        frame::put_len(buf, "data node location count", self.data_node_locations.len())?;
        for location in &self.data_node_locations {
            location.encode_to(buf)?;
        }
        Ok(())
    }

    fn decode_from<B: Buf>(buf: &mut B) -> Result<Self, DecodeError> {
        let region_id = ConsensusGroupId::decode_from(buf)?;
        let count = frame::get_count(
            buf,
            "data node location count",
            DataNodeLocation::MIN_ENCODED_LEN,
        )?;
        let mut data_node_locations = Vec::with_capacity(count);
        for _ in 0..count {
            data_node_locations.push(DataNodeLocation::decode_from(buf)?);
        }
        Ok(RegionReplicaSet {
            region_id,
            data_node_locations,
        })
    }
}
