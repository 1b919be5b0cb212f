//! Motion and sensor models
//!
//! The CTRV transition model and the lidar and radar observation models,
//! each behind the trait the unscented filter is generic over.

mod transition;
mod observation;

pub use transition::*;
pub use observation::*;
