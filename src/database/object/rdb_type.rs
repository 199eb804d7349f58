use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Type tag written in front of a value in a snapshot.
///
/// Compact encodings have their own tags so the loader can restore the
/// serialized blob without rebuilding the structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum RdbType {
    String = 0,
    List = 1,
    Set = 2,
    ZSet = 3,
    Hash = 4,
    HashZipmap = 9,
    ListZiplist = 10,
    SetIntset = 11,
    ZSetZiplist = 12,
    HashZiplist = 13,
}

impl RdbType {
    /// Whether the payload is a raw ziplist, intset or zipmap blob.
    pub fn is_compact(self) -> bool {
        matches!(
            self,
            RdbType::HashZipmap
                | RdbType::ListZiplist
                | RdbType::SetIntset
                | RdbType::ZSetZiplist
                | RdbType::HashZiplist
        )
    }
}
