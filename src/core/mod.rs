pub mod device;
pub mod error;

pub use device::{DeviceIdentifier, DeviceType, CPU_DEVICE_IDENTIFIER};
pub use error::{
    CostModelError, CostModelResult, DRResult, DataRecyclerError, ParseError, ParseErrorKind,
};
