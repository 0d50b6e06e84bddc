use super::{VlanId, HEADER_LEN, TAG_LEN, TAG_MARKER};
use crate::error::{Result, SwitchError};

/// Where the tag is spliced in: right after the two addresses.
const TAG_OFFSET: usize = 12;

/// Tag marker followed by the 12-bit VLAN id.
pub fn build_vlan_tag(vlan_id: VlanId) -> [u8; 4] {
    let marker = TAG_MARKER.to_be_bytes();
    let tci = (vlan_id & 0x0FFF).to_be_bytes();
    [marker[0], marker[1], tci[0], tci[1]]
}

/// Returns a copy of the frame with a tag for `vlan_id` inserted. The frame grows by 4 bytes.
pub fn insert_tag(frame: &[u8], vlan_id: VlanId) -> Result<Vec<u8>> {
    if frame.len() < TAG_OFFSET {
        return Err(SwitchError::malformed(
            frame.len(),
            "frame too short to carry a VLAN tag",
        ));
    }

    let mut tagged = Vec::with_capacity(frame.len() + TAG_LEN);
    tagged.extend_from_slice(&frame[..TAG_OFFSET]);
    tagged.extend_from_slice(&build_vlan_tag(vlan_id));
    tagged.extend_from_slice(&frame[TAG_OFFSET..]);
    Ok(tagged)
}

/// Returns a copy of the frame with its tag removed. The frame shrinks by 4 bytes.
pub fn strip_tag(frame: &[u8]) -> Result<Vec<u8>> {
    if !is_tagged(frame) {
        return Err(SwitchError::malformed(frame.len(), "frame carries no VLAN tag"));
    }

    let mut untagged = Vec::with_capacity(frame.len() - TAG_LEN);
    untagged.extend_from_slice(&frame[..TAG_OFFSET]);
    untagged.extend_from_slice(&frame[TAG_OFFSET + TAG_LEN..]);
    Ok(untagged)
}

/// Replaces the tag control information of an already tagged frame.
/// Priority bits are cleared; only the VLAN id survives.
pub fn rewrite_tag(frame: &[u8], vlan_id: VlanId) -> Result<Vec<u8>> {
    let untagged = strip_tag(frame)?;
    insert_tag(&untagged, vlan_id)
}

pub fn is_tagged(frame: &[u8]) -> bool {
    frame.len() >= HEADER_LEN + 2
        && u16::from_be_bytes([frame[TAG_OFFSET], frame[TAG_OFFSET + 1]]) == TAG_MARKER
}
