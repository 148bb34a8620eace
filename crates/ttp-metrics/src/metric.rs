//! The metric value object.
//!
//! A [`Metric`] is validated when it is built: an invalid name, a malformed
//! label, or a missing name/value is a configuration error and the build
//! fails. Whether the value suits a given channel is only decided when the
//! metric is published.

use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use strum::{Display, EnumString};
use thiserror::Error;
use ttp_config::ChannelKind;

use crate::publish::{ChannelPublisher, PublishStatus};

static NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_:][A-Za-z0-9_:]*$").expect("static metric name pattern"));
static LABEL_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static label name pattern"));

/// Errors raised while building or updating a metric.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetricError {
    /// No name was supplied.
    #[error("metric name is mandatory")]
    MissingName,
    /// No value was supplied.
    #[error("metric '{name}' has no value")]
    MissingValue { name: String },
    /// The (normalised) name does not match the metric name grammar.
    #[error("invalid metric name '{name}'")]
    InvalidName { name: String },
    /// A label is not a single `name=value` pair.
    #[error("label '{label}' must be a single non-empty name=value pair")]
    MalformedLabel { label: String },
    /// A label name does not match the label name grammar.
    #[error("invalid label name '{name}' in '{label}'")]
    InvalidLabelName { label: String, name: String },
    /// A label value contains a path separator.
    #[error("label value in '{label}' must not contain '/'")]
    InvalidLabelValue { label: String },
}

/// Prometheus metric types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum MetricType {
    Counter,
    Gauge,
    Histogram,
    Summary,
}

/// A metric value; numeric for the HTTP and file channels, numeric or text
/// for the bus.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    Number(f64),
    Text(String),
}

impl MetricValue {
    /// Numeric interpretation, accepting numeric text.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Text(text) => text.trim().parse::<f64>().ok(),
        }
    }

    /// Whether there is nothing to publish.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Text(text) if text.trim().is_empty())
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(formatter, "{}", format_number(*value)),
            Self::Text(text) => formatter.write_str(text),
        }
    }
}

impl From<f64> for MetricValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for MetricValue {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<u32> for MetricValue {
    fn from(value: u32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<&str> for MetricValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for MetricValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Renders a number the way the exposition format expects it.
#[must_use]
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "+Inf" } else { "-Inf" }.to_string()
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// One validated `name=value` label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    name: String,
    value: String,
}

impl Label {
    /// Parses and validates a `name=value` pair.
    pub fn parse(label: &str) -> Result<Self, MetricError> {
        let parts: Vec<&str> = label.split('=').collect();
        let [name, value] = parts.as_slice() else {
            return Err(MetricError::MalformedLabel {
                label: label.to_string(),
            });
        };
        if name.is_empty() || value.is_empty() {
            return Err(MetricError::MalformedLabel {
                label: label.to_string(),
            });
        }
        if !LABEL_NAME_PATTERN.is_match(name) {
            return Err(MetricError::InvalidLabelName {
                label: label.to_string(),
                name: (*name).to_string(),
            });
        }
        if value.contains('/') {
            return Err(MetricError::InvalidLabelValue {
                label: label.to_string(),
            });
        }
        Ok(Self {
            name: (*name).to_string(),
            value: (*value).to_string(),
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for Label {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}={}", self.name, self.value)
    }
}

/// Builder collecting the arguments of a metric before validation.
#[derive(Debug, Clone, Default)]
pub struct MetricBuilder {
    name: Option<String>,
    help: String,
    kind: Option<MetricType>,
    value: Option<MetricValue>,
    labels: Vec<String>,
    extra_vars: BTreeMap<String, String>,
}

impl MetricBuilder {
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    #[must_use]
    pub fn kind(mut self, kind: MetricType) -> Self {
        self.kind = Some(kind);
        self
    }

    #[must_use]
    pub fn value(mut self, value: impl Into<MetricValue>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Adds labels given as `name=value` strings.
    #[must_use]
    pub fn labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels.extend(labels.into_iter().map(Into::into));
        self
    }

    /// Adds a template variable available to channel templates.
    #[must_use]
    pub fn var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_vars.insert(key.into(), value.into());
        self
    }

    /// Validates the collected arguments.
    pub fn build(self) -> Result<Metric, MetricError> {
        let raw = self.name.filter(|name| !name.is_empty());
        let name = normalise_name(raw.as_deref().ok_or(MetricError::MissingName)?)?;
        let value = self.value.ok_or_else(|| MetricError::MissingValue { name: name.clone() })?;
        let labels = parse_labels(&self.labels)?;
        Ok(Metric {
            name,
            help: self.help,
            kind: self.kind,
            value,
            labels,
            extra_vars: self.extra_vars,
        })
    }
}

/// A validated metric.
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    name: String,
    help: String,
    kind: Option<MetricType>,
    value: MetricValue,
    labels: Vec<Label>,
    extra_vars: BTreeMap<String, String>,
}

impl Metric {
    /// Starts building a metric.
    #[must_use]
    pub fn builder() -> MetricBuilder {
        MetricBuilder::default()
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn help(&self) -> &str {
        &self.help
    }

    #[must_use]
    pub fn kind(&self) -> Option<MetricType> {
        self.kind
    }

    #[must_use]
    pub fn value(&self) -> &MetricValue {
        &self.value
    }

    #[must_use]
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Replaces the name, re-validating it.
    pub fn set_name(&mut self, name: &str) -> Result<(), MetricError> {
        self.name = normalise_name(name)?;
        Ok(())
    }

    /// Replaces the value.
    pub fn set_value(&mut self, value: impl Into<MetricValue>) {
        self.value = value.into();
    }

    /// Replaces the help text.
    pub fn set_help(&mut self, help: impl Into<String>) {
        self.help = help.into();
    }

    /// Replaces the labels, re-validating them.
    pub fn set_labels<S: AsRef<str>>(&mut self, labels: &[S]) -> Result<(), MetricError> {
        self.labels = parse_labels(labels)?;
        Ok(())
    }

    /// Appends labels, re-validating them.
    pub fn push_labels<S: AsRef<str>>(&mut self, labels: &[S]) -> Result<(), MetricError> {
        self.labels.extend(parse_labels(labels)?);
        Ok(())
    }

    /// Label values joined with commas.
    #[must_use]
    pub fn label_values(&self) -> String {
        join(self.labels.iter().map(Label::value))
    }

    /// Template variables describing this metric.
    ///
    /// `excluding` omits one key, for templates whose own replacement text
    /// would otherwise contain the placeholder being expanded.
    #[must_use]
    pub fn macros(&self, excluding: Option<&str>) -> BTreeMap<String, String> {
        let mut vars = self.extra_vars.clone();
        vars.insert("NAME".into(), self.name.clone());
        vars.insert("VALUE".into(), self.value.to_string());
        vars.insert("HELP".into(), self.help.clone());
        vars.insert(
            "LABELS".into(),
            join(self.labels.iter().map(ToString::to_string)),
        );
        vars.insert("LABEL_NAMES".into(), join(self.labels.iter().map(Label::name)));
        vars.insert("LABEL_VALUES".into(), self.label_values());
        if let Some(key) = excluding {
            vars.remove(key);
        }
        vars
    }

    /// Name carrying the caller prefix and then, when still missing, the
    /// conventional prefix.
    #[must_use]
    pub fn prefixed_name(&self, caller_prefix: &str, convention: &str) -> String {
        let name = format!("{caller_prefix}{}", self.name);
        if name.starts_with(convention) {
            name
        } else {
            format!("{convention}{name}")
        }
    }
}

impl Metric {
    /// Publishes on every given channel, collecting one status per channel.
    ///
    /// Per-channel failures are reported in the returned map; they never
    /// abort the remaining channels.
    pub fn publish(
        &self,
        channels: &[&dyn ChannelPublisher],
        caller_prefix: &str,
    ) -> BTreeMap<ChannelKind, PublishStatus> {
        channels
            .iter()
            .map(|channel| (channel.kind(), channel.publish(self, caller_prefix)))
            .collect()
    }
}

fn normalise_name(name: &str) -> Result<String, MetricError> {
    let normalised = name.replace('.', "_");
    if NAME_PATTERN.is_match(&normalised) {
        Ok(normalised)
    } else {
        Err(MetricError::InvalidName { name: normalised })
    }
}

fn parse_labels<S: AsRef<str>>(labels: &[S]) -> Result<Vec<Label>, MetricError> {
    labels.iter().map(|label| Label::parse(label.as_ref())).collect()
}

fn join<I, S>(items: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .map(|item| item.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn metric(name: &str) -> Result<Metric, MetricError> {
        Metric::builder().name(name).value(1.0).build()
    }

    #[test]
    fn dots_become_underscores_idempotently() {
        let first = metric("my.metric").expect("build");
        assert_eq!(first.name(), "my_metric");
        let second = metric(first.name()).expect("build again");
        assert_eq!(second.name(), "my_metric");
    }

    #[rstest]
    #[case::leading_digit("9lives")]
    #[case::dash("disk-usage")]
    #[case::space("a b")]
    fn rejects_invalid_names(#[case] name: &str) {
        assert!(matches!(metric(name), Err(MetricError::InvalidName { .. })));
    }

    #[test]
    fn name_and_value_are_mandatory() {
        assert_eq!(
            Metric::builder().value(0.0).build(),
            Err(MetricError::MissingName)
        );
        assert!(matches!(
            Metric::builder().name("up").build(),
            Err(MetricError::MissingValue { .. })
        ));
        assert!(Metric::builder().name("up").value("").build().is_ok());
        assert!(Metric::builder().name("up").value(0.0).build().is_ok());
    }

    #[rstest]
    #[case::two_equals("a=b=c")]
    #[case::no_equals("ab")]
    #[case::empty_name("=b")]
    #[case::empty_value("a=")]
    fn rejects_malformed_labels(#[case] label: &str) {
        let result = Metric::builder().name("up").value(1.0).labels([label]).build();
        assert!(matches!(result, Err(MetricError::MalformedLabel { .. })));
    }

    #[test]
    fn rejects_bad_label_sides() {
        let name = Metric::builder().name("up").value(1.0).labels(["1x=b"]).build();
        assert!(matches!(name, Err(MetricError::InvalidLabelName { .. })));
        let value = Metric::builder().name("up").value(1.0).labels(["a=b/c"]).build();
        assert!(matches!(value, Err(MetricError::InvalidLabelValue { .. })));
    }

    #[test]
    fn macros_describe_metric() {
        let metric = Metric::builder()
            .name("backup.size")
            .help("bytes written")
            .value(42.0)
            .labels(["env=X", "daemon=backup"])
            .var("NODE", "ws12")
            .build()
            .expect("build");
        let vars = metric.macros(None);
        assert_eq!(vars["NAME"], "backup_size");
        assert_eq!(vars["VALUE"], "42");
        assert_eq!(vars["LABELS"], "env=X,daemon=backup");
        assert_eq!(vars["LABEL_NAMES"], "env,daemon");
        assert_eq!(vars["LABEL_VALUES"], "X,backup");
        assert_eq!(vars["NODE"], "ws12");

        let without = metric.macros(Some("HELP"));
        assert!(!without.contains_key("HELP"));
        assert_eq!(without.len(), vars.len() - 1);
    }

    #[test]
    fn setters_revalidate() {
        let mut metric = metric("up").expect("build");
        assert!(metric.set_name("bad name").is_err());
        assert_eq!(metric.name(), "up");
        assert!(metric.set_labels(&["x=y=z"]).is_err());
        metric.set_labels(&["x=y"]).expect("valid label");
        assert_eq!(metric.label_values(), "y");
    }

    #[rstest]
    #[case::bare("", "uptime", "ttp_uptime")]
    #[case::already("", "ttp_uptime", "ttp_uptime")]
    #[case::caller("daemon_", "uptime", "ttp_daemon_uptime")]
    #[case::caller_conventional("ttp_", "uptime", "ttp_uptime")]
    fn applies_prefixes(#[case] caller: &str, #[case] name: &str, #[case] expected: &str) {
        let metric = metric(name).expect("build");
        assert_eq!(metric.prefixed_name(caller, "ttp_"), expected);
    }

    #[rstest]
    #[case::integer(MetricValue::Number(3.0), Some(3.0))]
    #[case::numeric_text(MetricValue::from(" 2.5 "), Some(2.5))]
    #[case::text(MetricValue::from("running"), None)]
    fn numeric_interpretation(#[case] value: MetricValue, #[case] expected: Option<f64>) {
        assert_eq!(value.as_number(), expected);
    }
}
