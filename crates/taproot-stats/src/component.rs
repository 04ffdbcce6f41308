use std::collections::BTreeMap;
use std::path::Path;

use taproot_config::StatisticsConfig;
use taproot_xml::Element;

use crate::usages::{
    by_priority, parse_value_string, to_value_string, GroupDescriptor, UsageDescriptor,
    DEFAULT_PRIORITY,
};
use crate::StatsError;

const STATE_ELEMENT: &str = "state";
const GROUP_ELEMENT: &str = "group";
const GROUP_ID_ATTR: &str = "id";
const GROUP_PRIORITY_ATTR: &str = "priority";
const DATA_ATTR: &str = "data";
const LAST_TIME_ATTR: &str = "time";
const IS_ALLOWED_ATTR: &str = "allowed";
const PERIOD_ATTR: &str = "period";

const DAY_MILLIS: i64 = 24 * 60 * 60 * 1000;

/// How often collected usages are sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SendPeriod {
    Daily,
    #[default]
    Weekly,
    Monthly,
}

impl SendPeriod {
    pub fn name(self) -> &'static str {
        match self {
            SendPeriod::Daily => "daily",
            SendPeriod::Weekly => "weekly",
            SendPeriod::Monthly => "monthly",
        }
    }

    /// Anything but `daily` or `monthly` means weekly.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("daily") => SendPeriod::Daily,
            Some("monthly") => SendPeriod::Monthly,
            _ => SendPeriod::Weekly,
        }
    }

    pub fn millis(self) -> i64 {
        match self {
            SendPeriod::Daily => DAY_MILLIS,
            SendPeriod::Weekly => 7 * DAY_MILLIS,
            SendPeriod::Monthly => 30 * DAY_MILLIS,
        }
    }
}

#[derive(Debug, Clone)]
struct SentGroup {
    descriptor: GroupDescriptor,
    usages: BTreeMap<String, i64>,
}

/// Usages already sent, plus the sending schedule and consent.
///
/// Persisted as
/// `<state time=".." allowed=".." period=".."><group id=".." priority=".." data="k=v,.."/></state>`.
#[derive(Debug, Clone)]
pub struct UsageStatistics {
    groups: BTreeMap<String, SentGroup>,
    last_sent: i64,
    allowed: bool,
    period: SendPeriod,
}

impl UsageStatistics {
    /// Empty state. Sending starts disallowed in sandbox and internal builds.
    pub fn new(config: &StatisticsConfig) -> Self {
        Self {
            groups: BTreeMap::new(),
            last_sent: 0,
            allowed: config.allowed_by_default(),
            period: SendPeriod::parse(config.period.as_deref()),
        }
    }

    /// Replaces schedule and consent with the persisted values and adds the
    /// persisted groups. Groups without id or data, or with data that does
    /// not parse, are skipped.
    pub fn load_state(&mut self, element: &Element) {
        for group in element.children_named(GROUP_ELEMENT) {
            let id = group.attribute(GROUP_ID_ATTR).filter(|id| !id.trim().is_empty());
            let data = group.attribute(DATA_ATTR).filter(|data| !data.trim().is_empty());
            let (Some(id), Some(data)) = (id, data) else {
                continue;
            };
            let priority = parse_priority(group.attribute(GROUP_PRIORITY_ATTR));
            match parse_value_string(data) {
                Ok(usages) => {
                    self.groups.insert(
                        id.to_owned(),
                        SentGroup {
                            descriptor: GroupDescriptor::new(id, priority),
                            usages,
                        },
                    );
                }
                Err(err) => {
                    tracing::warn!(target: "taproot.stats", group = id, error = %err, "skipping malformed usage group");
                }
            }
        }

        self.last_sent = element
            .attribute(LAST_TIME_ATTR)
            .and_then(|time| time.trim().parse().ok())
            .unwrap_or(0);
        self.allowed = element
            .attribute(IS_ALLOWED_ATTR)
            .is_some_and(|value| value.eq_ignore_ascii_case("true"));
        self.period = SendPeriod::parse(element.attribute(PERIOD_ATTR));
    }

    /// Groups ordered by descending priority, then id.
    pub fn state(&self) -> Element {
        let mut element = Element::new(STATE_ELEMENT);
        for group in self.sorted_groups() {
            element.add_child(
                Element::new(GROUP_ELEMENT)
                    .with_attribute(GROUP_ID_ATTR, group.descriptor.id())
                    .with_attribute(GROUP_PRIORITY_ATTR, format!("{:?}", group.descriptor.priority()))
                    .with_attribute(DATA_ATTR, to_value_string(&group.usages)),
            );
        }
        element.set_attribute(LAST_TIME_ATTR, self.last_sent.to_string());
        element.set_attribute(IS_ALLOWED_ATTR, self.allowed.to_string());
        element.set_attribute(PERIOD_ATTR, self.period.name());
        element
    }

    /// Merges newly sent usages. Counts of a key already present are summed.
    pub fn persist_patch<I>(&mut self, patch: impl IntoIterator<Item = (GroupDescriptor, I)>)
    where
        I: IntoIterator<Item = UsageDescriptor>,
    {
        for (descriptor, usages) in patch {
            let group = self
                .groups
                .entry(descriptor.id().to_owned())
                .or_insert_with(|| SentGroup {
                    descriptor: descriptor.clone(),
                    usages: BTreeMap::new(),
                });
            group.descriptor = descriptor;
            for usage in usages {
                *group.usages.entry(usage.key().to_owned()).or_insert(0) += usage.value();
            }
        }
    }

    /// Sent usages per group, ordered like [`UsageStatistics::state`].
    pub fn sent_usages(&self) -> Vec<(GroupDescriptor, Vec<UsageDescriptor>)> {
        self.sorted_groups()
            .into_iter()
            .map(|group| {
                let usages = group
                    .usages
                    .iter()
                    .map(|(key, value)| UsageDescriptor::new(key, *value))
                    .collect();
                (group.descriptor.clone(), usages)
            })
            .collect()
    }

    pub fn group(&self, id: &str) -> Option<&GroupDescriptor> {
        self.groups.get(id).map(|group| &group.descriptor)
    }

    pub fn usage_count(&self, group_id: &str, key: &str) -> Option<i64> {
        self.groups.get(group_id)?.usages.get(key).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn last_time_sent(&self) -> i64 {
        self.last_sent
    }

    pub fn set_sent_time(&mut self, millis: i64) {
        self.last_sent = millis;
    }

    pub fn is_allowed(&self) -> bool {
        self.allowed
    }

    pub fn set_allowed(&mut self, allowed: bool) {
        self.allowed = allowed;
    }

    pub fn period(&self) -> SendPeriod {
        self.period
    }

    pub fn set_period(&mut self, period: SendPeriod) {
        self.period = period;
    }

    /// Whether a full period has passed since the last send.
    pub fn is_time_to_send(&self, now_millis: i64) -> bool {
        now_millis.saturating_sub(self.last_sent) >= self.period.millis()
    }

    /// Loads the state file at `path` over a fresh component. A missing file
    /// yields the fresh component.
    pub fn load_from_path(path: &Path, config: &StatisticsConfig) -> Result<Self, StatsError> {
        let mut statistics = Self::new(config);
        if !path.exists() {
            tracing::debug!(target: "taproot.stats", path = %path.display(), "no statistics state yet");
            return Ok(statistics);
        }
        let element = Element::read_from_path(path)?;
        statistics.load_state(&element);
        tracing::debug!(
            target: "taproot.stats",
            path = %path.display(),
            groups = statistics.groups.len(),
            "loaded statistics state"
        );
        Ok(statistics)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), StatsError> {
        self.state().save_to_path(path)?;
        tracing::debug!(target: "taproot.stats", path = %path.display(), "saved statistics state");
        Ok(())
    }

    fn sorted_groups(&self) -> Vec<&SentGroup> {
        let mut groups: Vec<_> = self.groups.values().collect();
        groups.sort_by(|a, b| by_priority(&a.descriptor, &b.descriptor));
        groups
    }
}

/// Blank or unreadable priorities fall back to [`DEFAULT_PRIORITY`].
fn parse_priority(value: Option<&str>) -> f64 {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .and_then(|value| value.parse::<f64>().ok())
        .filter(|priority| priority.is_finite())
        .unwrap_or(DEFAULT_PRIORITY)
}
