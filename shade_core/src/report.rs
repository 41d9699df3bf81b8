//! Inbound report shape and the vendor tag tables.

/// Function tag carried by every vendor cluster command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionTag {
    SetData,
    GetData,
    SetDataResponse,
    Other(u8),
}

impl FunctionTag {
    pub const SET_DATA: u8 = 0x00;
    pub const GET_DATA: u8 = 0x01;
    pub const SET_DATA_RESPONSE: u8 = 0x02;

    pub const fn code(self) -> u8 {
        match self {
            Self::SetData => Self::SET_DATA,
            Self::GetData => Self::GET_DATA,
            Self::SetDataResponse => Self::SET_DATA_RESPONSE,
            Self::Other(c) => c,
        }
    }

    /// Only device-originated data reports are interpreted; everything else
    /// is handed back to the host untouched.
    pub const fn is_decoded(self) -> bool {
        matches!(self, Self::GetData | Self::SetDataResponse)
    }
}

impl From<u8> for FunctionTag {
    fn from(code: u8) -> Self {
        match code {
            Self::SET_DATA => Self::SetData,
            Self::GET_DATA => Self::GetData,
            Self::SET_DATA_RESPONSE => Self::SetDataResponse,
            other => Self::Other(other),
        }
    }
}

/// Data point type tag, the first byte of every report payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DataPointType {
    Raw = 0x00,
    Bool = 0x01,
    Value = 0x02,
    String = 0x03,
    Enum = 0x04,
    Bitmap = 0x05,
}

impl TryFrom<u8> for DataPointType {
    type Error = u8;

    fn try_from(tag: u8) -> Result<Self, u8> {
        Ok(match tag {
            0x00 => Self::Raw,
            0x01 => Self::Bool,
            0x02 => Self::Value,
            0x03 => Self::String,
            0x04 => Self::Enum,
            0x05 => Self::Bitmap,
            other => return Err(other),
        })
    }
}

/// One vendor data point report as delivered by the host.
///
/// `payload` starts with the data point type tag followed by the data bytes,
/// so a 4-byte Value lands its low byte at `payload[4]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawReport {
    pub dp: u8,
    pub tag: u8,
    pub payload: Vec<u8>,
}

impl RawReport {
    pub fn new(dp: u8, tag: u8, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            dp,
            tag,
            payload: payload.into(),
        }
    }

    pub fn function(&self) -> FunctionTag {
        FunctionTag::from(self.tag)
    }

    /// Big-endian u32 of a Value-typed payload, if well-formed.
    pub fn value_u32(&self) -> Option<u32> {
        if self.payload.first() != Some(&(DataPointType::Value as u8)) {
            return None;
        }
        let bytes: [u8; 4] = self.payload.get(1..5)?.try_into().ok()?;
        Some(u32::from_be_bytes(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_tag_codes() {
        assert_eq!(FunctionTag::from(0x01), FunctionTag::GetData);
        assert_eq!(FunctionTag::from(0x02), FunctionTag::SetDataResponse);
        assert_eq!(FunctionTag::from(0x24), FunctionTag::Other(0x24));
        assert_eq!(FunctionTag::Other(0x24).code(), 0x24);
        assert!(!FunctionTag::SetData.is_decoded());
        assert!(FunctionTag::GetData.is_decoded());
    }

    #[test]
    fn value_needs_value_tag_and_four_bytes() {
        assert_eq!(RawReport::new(7, 1, [2, 0, 0, 1, 0x2c]).value_u32(), Some(300));
        assert_eq!(RawReport::new(7, 1, [4, 0, 0, 1, 0x2c]).value_u32(), None);
        assert_eq!(RawReport::new(7, 1, [2, 0, 0]).value_u32(), None);
    }
}
