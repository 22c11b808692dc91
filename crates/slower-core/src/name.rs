//! Bit packing between messaging coordinates and [`ShortName`] values.
//!
//! Layout, bit 127 being the most significant bit of `hi`:
//!
//! | field        | bits    | word |
//! |--------------|---------|------|
//! | namespace id | 127-104 | hi   |
//! | app id       | 103-96  | hi   |
//! | path         | 95-88   | hi   |
//! | org          | 87-70   | hi   |
//! | team (high)  | 69-64   | hi   |
//! | team (low)   | 63-50   | lo   |
//! | channel      | 49-40   | lo   |
//! | device       | 39-20   | lo   |
//! | msg number   | 19-0    | lo   |

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::NameError;
use crate::types::ShortName;

/// Namespace identifier (TRIP ITAD) carried by every system name.
pub const SYSTEM_NAMESPACE_ID: u32 = 0x00_0088;
/// Application identifier for messaging names inside the system namespace.
pub const SYSTEM_APP_ID: u8 = 0x88;

/// Exclusive upper bound for `org`.
pub const ORG_LIMIT: u32 = 1 << 18;
/// Exclusive upper bound for `team`.
pub const TEAM_LIMIT: u32 = 1 << 20;
/// Exclusive upper bound for `channel`.
pub const CHANNEL_LIMIT: u16 = 1 << 10;
/// Exclusive upper bound for `device`.
pub const DEVICE_LIMIT: u32 = 1 << 20;
/// Exclusive upper bound for `msg_num`.
pub const MSG_NUM_LIMIT: u32 = 1 << 20;

/// Prefix length covering everything up to and including the channel field.
pub const CHANNEL_PREFIX_BITS: u8 = 88;
/// Prefix length covering everything up to and including the device field.
pub const DEVICE_PREFIX_BITS: u8 = 108;

const NAMESPACE_SHIFT: u32 = 40;
const APP_SHIFT: u32 = 32;
const PATH_SHIFT: u32 = 24;
const ORG_SHIFT: u32 = 6;
const TEAM_LOW_BITS: u32 = 14;
const TEAM_LOW_SHIFT: u32 = 50;
const CHANNEL_SHIFT: u32 = 40;
const DEVICE_SHIFT: u32 = 20;

const NAMESPACE_MASK: u64 = 0xff_ffff;
const BYTE_MASK: u64 = 0xff;
const ORG_MASK: u64 = 0x3_ffff;
const TEAM_HIGH_MASK: u64 = 0x3f;
const TEAM_LOW_MASK: u64 = 0x3fff;
const CHANNEL_MASK: u64 = 0x3ff;
const TWENTY_BIT_MASK: u64 = 0xf_ffff;

/// Name paths declared by the messaging system.
///
/// Only [`NamePath::Message`] has a defined bit layout; the others are
/// reserved and rejected by [`encode_name`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum NamePath {
    Message = 1,
    KeyPackage = 2,
    Welcome = 3,
    CommitAll = 4,
    CommitOne = 5,
}

impl TryFrom<u8> for NamePath {
    type Error = NameError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Message),
            2 => Ok(Self::KeyPackage),
            3 => Ok(Self::Welcome),
            4 => Ok(Self::CommitAll),
            5 => Ok(Self::CommitOne),
            other => Err(NameError::UnknownPath(other)),
        }
    }
}

impl fmt::Display for NamePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Message => "message",
            Self::KeyPackage => "key-package",
            Self::Welcome => "welcome",
            Self::CommitAll => "commit-all",
            Self::CommitOne => "commit-one",
        };
        f.write_str(label)
    }
}

/// Structured view of a [`ShortName`] under the message-path layout.
///
/// Produced by pure bit extraction; nothing here is validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedName {
    pub namespace_id: u32,
    pub app_id: u8,
    pub path: u8,
    pub org: u32,
    pub team: u32,
    pub channel: u16,
    pub device: u32,
    pub msg_num: u32,
}

impl DecodedName {
    /// Whether the namespace and app id match this system's constants.
    pub fn is_system_namespace(&self) -> bool {
        self.namespace_id == SYSTEM_NAMESPACE_ID && self.app_id == SYSTEM_APP_ID
    }

    /// Typed path, if the raw path byte is a declared one.
    pub fn path_kind(&self) -> Option<NamePath> {
        NamePath::try_from(self.path).ok()
    }

    /// True for system-namespace names on the message path.
    pub fn is_system_message(&self) -> bool {
        self.is_system_namespace() && self.path_kind() == Some(NamePath::Message)
    }
}

/// Packs message coordinates into a [`ShortName`] in the system namespace.
pub fn encode_name(
    path: NamePath,
    org: u32,
    team: u32,
    channel: u16,
    device: u32,
    msg_num: u32,
) -> Result<ShortName, NameError> {
    if path != NamePath::Message {
        return Err(NameError::UnimplementedPath(path));
    }
    if org >= ORG_LIMIT {
        return Err(NameError::OrgOutOfRange(org));
    }
    if team >= TEAM_LIMIT {
        return Err(NameError::TeamOutOfRange(team));
    }
    if channel >= CHANNEL_LIMIT {
        return Err(NameError::ChannelOutOfRange(channel));
    }
    if device >= DEVICE_LIMIT {
        return Err(NameError::DeviceOutOfRange(device));
    }
    if msg_num >= MSG_NUM_LIMIT {
        return Err(NameError::MsgNumOutOfRange(msg_num));
    }

    let team = u64::from(team);
    let hi = (u64::from(SYSTEM_NAMESPACE_ID) << NAMESPACE_SHIFT)
        | (u64::from(SYSTEM_APP_ID) << APP_SHIFT)
        | ((path as u64) << PATH_SHIFT)
        | (u64::from(org) << ORG_SHIFT)
        | (team >> TEAM_LOW_BITS);
    let lo = ((team & TEAM_LOW_MASK) << TEAM_LOW_SHIFT)
        | (u64::from(channel) << CHANNEL_SHIFT)
        | (u64::from(device) << DEVICE_SHIFT)
        | u64::from(msg_num);
    Ok(ShortName::new(hi, lo))
}

/// Convenience wrapper for the only implemented path.
pub fn encode_message_name(
    org: u32,
    team: u32,
    channel: u16,
    device: u32,
    msg_num: u32,
) -> Result<ShortName, NameError> {
    encode_name(NamePath::Message, org, team, channel, device, msg_num)
}

/// Extracts every layout field from `name`.
pub fn decode_name(name: ShortName) -> DecodedName {
    let ShortName { hi, lo } = name;
    let team_high = hi & TEAM_HIGH_MASK;
    let team_low = (lo >> TEAM_LOW_SHIFT) & TEAM_LOW_MASK;
    DecodedName {
        namespace_id: ((hi >> NAMESPACE_SHIFT) & NAMESPACE_MASK) as u32,
        app_id: ((hi >> APP_SHIFT) & BYTE_MASK) as u8,
        path: ((hi >> PATH_SHIFT) & BYTE_MASK) as u8,
        org: ((hi >> ORG_SHIFT) & ORG_MASK) as u32,
        team: ((team_high << TEAM_LOW_BITS) | team_low) as u32,
        channel: ((lo >> CHANNEL_SHIFT) & CHANNEL_MASK) as u16,
        device: ((lo >> DEVICE_SHIFT) & TWENTY_BIT_MASK) as u32,
        msg_num: (lo & TWENTY_BIT_MASK) as u32,
    }
}

/// Log-friendly long form of a name.
///
/// Foreign-namespace names and paths without a layout render opaquely.
#[derive(Debug, Clone, Copy)]
pub struct NameView(ShortName);

impl ShortName {
    pub fn describe(self) -> NameView {
        NameView(self)
    }
}

impl fmt::Display for NameView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let decoded = decode_name(self.0);
        if !decoded.is_system_namespace() {
            return write!(f, "unknown-{}", self.0);
        }
        match decoded.path_kind() {
            Some(NamePath::Message) => write!(
                f,
                "qmsg://msg/org-{}/team-{}/ch-{}/dev-{}/msg-{}",
                decoded.org, decoded.team, decoded.channel, decoded.device, decoded.msg_num
            ),
            Some(path) => write!(f, "qmsg://{path}/{}", self.0),
            None => write!(f, "qmsg://path-{}/{}", decoded.path, self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        decode_name, encode_message_name, encode_name, NamePath, CHANNEL_LIMIT, DEVICE_LIMIT,
        MSG_NUM_LIMIT, ORG_LIMIT, SYSTEM_APP_ID, SYSTEM_NAMESPACE_ID, TEAM_LIMIT,
    };
    use crate::error::NameError;
    use crate::types::ShortName;

    #[test]
    fn encode_places_fields_at_documented_offsets() {
        let name = encode_message_name(1, 0x4001, 2, 3, 4).expect("in range");
        // team 0x4001 = high part 1, low part 1
        assert_eq!(name.hi, 0x0000_8888_0100_0041);
        assert_eq!(name.lo, 0x0004_0200_0030_0004);
    }

    #[test]
    fn decode_reverses_encode_for_extremes() {
        let name = encode_message_name(
            ORG_LIMIT - 1,
            TEAM_LIMIT - 1,
            CHANNEL_LIMIT - 1,
            DEVICE_LIMIT - 1,
            MSG_NUM_LIMIT - 1,
        )
        .expect("in range");
        let decoded = decode_name(name);
        assert_eq!(decoded.namespace_id, SYSTEM_NAMESPACE_ID);
        assert_eq!(decoded.app_id, SYSTEM_APP_ID);
        assert_eq!(decoded.path_kind(), Some(NamePath::Message));
        assert_eq!(decoded.org, ORG_LIMIT - 1);
        assert_eq!(decoded.team, TEAM_LIMIT - 1);
        assert_eq!(decoded.channel, CHANNEL_LIMIT - 1);
        assert_eq!(decoded.device, DEVICE_LIMIT - 1);
        assert_eq!(decoded.msg_num, MSG_NUM_LIMIT - 1);
    }

    #[test]
    fn org_boundary_is_exclusive() {
        assert!(encode_message_name(ORG_LIMIT - 1, 0, 0, 0, 0).is_ok());
        assert!(matches!(
            encode_message_name(ORG_LIMIT, 0, 0, 0, 0),
            Err(NameError::OrgOutOfRange(v)) if v == ORG_LIMIT
        ));
    }

    #[test]
    fn each_field_has_its_own_range_error() {
        assert!(matches!(
            encode_message_name(0, TEAM_LIMIT, 0, 0, 0),
            Err(NameError::TeamOutOfRange(_))
        ));
        assert!(matches!(
            encode_message_name(0, 0, CHANNEL_LIMIT, 0, 0),
            Err(NameError::ChannelOutOfRange(_))
        ));
        assert!(matches!(
            encode_message_name(0, 0, 0, DEVICE_LIMIT, 0),
            Err(NameError::DeviceOutOfRange(_))
        ));
        assert!(matches!(
            encode_message_name(0, 0, 0, 0, MSG_NUM_LIMIT),
            Err(NameError::MsgNumOutOfRange(_))
        ));
    }

    #[test]
    fn reserved_paths_are_unimplemented() {
        for path in [
            NamePath::KeyPackage,
            NamePath::Welcome,
            NamePath::CommitAll,
            NamePath::CommitOne,
        ] {
            let err = encode_name(path, 1, 1, 1, 1, 1).expect_err("no layout");
            assert!(matches!(err, NameError::UnimplementedPath(p) if p == path));
        }
    }

    #[test]
    fn decode_does_not_validate_namespace() {
        let decoded = decode_name(ShortName::new(0, 1));
        assert!(!decoded.is_system_namespace());
        assert_eq!(decoded.msg_num, 1);
        assert_eq!(decoded.path_kind(), None);
    }

    #[test]
    fn describe_renders_message_names_and_foreign_names() {
        let name = encode_message_name(1, 2, 3, 4, 5).expect("in range");
        assert_eq!(
            name.describe().to_string(),
            "qmsg://msg/org-1/team-2/ch-3/dev-4/msg-5"
        );
        assert_eq!(
            ShortName::new(0, 2).describe().to_string(),
            "unknown-00000000-00000000-00000000-00000002"
        );
    }
}
