pub use anyhow::{anyhow, bail, Result};
pub use log::{debug, error, info, trace, warn};
pub use std::io::Write;
pub use tokio::sync::broadcast;

pub use crate::config::{self, Config};
pub use crate::device::{self, DeviceTarget, QueryError, QueryOptions, QueryOutcome};
pub use crate::fields;
pub use crate::mqtt::{self, Message, Publisher};
pub use crate::options::Options;
pub use crate::poller::{FleetPoller, PollSummary};
pub use crate::reading::{self, DeviceReading, ReadingError};
