//! Persistence of usage statistics: what was already sent, when, and whether
//! sending is allowed at all.

mod component;
mod usages;

pub use component::{SendPeriod, UsageStatistics};
pub use usages::{
    parse_value_string, to_value_string, GroupDescriptor, UsageDescriptor, ValueStringError,
    DEFAULT_PRIORITY,
};

#[derive(Debug, thiserror::Error)]
pub enum StatsError {
    #[error(transparent)]
    Xml(#[from] taproot_xml::XmlError),
}
