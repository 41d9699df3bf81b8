//! Standardized cover commands to vendor data point writes.
//!
//! The control mapping is not the identity: Open sends the vendor STOP code,
//! Close sends OPEN and Stop sends CLOSE. This matches the motor firmware;
//! do not "fix" it.
use shade_traits::VendorCommand;

use crate::config::TranslatorCfg;
use crate::error::RangeError;
use crate::report::DataPointType;

/// Vendor enum codes on the control data point.
pub mod vendor {
    pub const OPEN: u32 = 0;
    pub const STOP: u32 = 1;
    pub const CLOSE: u32 = 2;
}

/// Standardized window-covering directives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverCommand {
    Open,
    Close,
    Stop,
    /// Absolute lift position, 0 = open, 100 = closed.
    GoToLiftPercentage(u8),
}

impl core::fmt::Display for CoverCommand {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Open => f.write_str("open"),
            Self::Close => f.write_str("close"),
            Self::Stop => f.write_str("stop"),
            Self::GoToLiftPercentage(p) => write!(f, "goto {p}%"),
        }
    }
}

/// Provisional lift position shown right after an open or close.
pub fn predict(cmd: CoverCommand, current: u8, step: u8) -> Option<u8> {
    let current = current.min(100);
    match cmd {
        CoverCommand::Open => Some(current.saturating_sub(step)),
        CoverCommand::Close => Some(current.saturating_add(step).min(100)),
        CoverCommand::Stop | CoverCommand::GoToLiftPercentage(_) => None,
    }
}

/// One translated command, ready to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Translation {
    pub command: VendorCommand,
    pub dp_type: DataPointType,
    /// Provisional position for the shadow, if one applies.
    pub prediction: Option<u8>,
}

#[derive(Debug, Clone)]
pub struct CommandTranslator {
    cfg: TranslatorCfg,
}

impl CommandTranslator {
    pub fn new(cfg: TranslatorCfg) -> Self {
        Self { cfg }
    }

    pub fn cfg(&self) -> &TranslatorCfg {
        &self.cfg
    }

    /// Translate `cmd` given the shadow's current lift value.
    pub fn translate(
        &self,
        cmd: CoverCommand,
        current: Option<u8>,
    ) -> Result<Translation, RangeError> {
        let code = match cmd {
            CoverCommand::GoToLiftPercentage(p) => return self.go_to(p),
            CoverCommand::Open => vendor::STOP,
            CoverCommand::Close => vendor::OPEN,
            CoverCommand::Stop => vendor::CLOSE,
        };
        Ok(Translation {
            command: VendorCommand::new(self.cfg.control_dp, code, self.cfg.wants_reply),
            dp_type: DataPointType::Enum,
            prediction: current.and_then(|c| predict(cmd, c, self.cfg.predict_step)),
        })
    }

    fn go_to(&self, percent: u8) -> Result<Translation, RangeError> {
        RangeError::check("lift_percentage", i64::from(percent), 0, 100)?;
        Ok(Translation {
            command: VendorCommand::new(
                self.cfg.position_dp,
                u32::from(percent),
                self.cfg.wants_reply,
            ),
            dp_type: DataPointType::Value,
            prediction: None,
        })
    }
}
