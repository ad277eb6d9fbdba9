/*
 * Copyright 2024 Google LLC
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{
    proto, ComparisonOp, ComparisonSpec, ConvertProtoConfigError, CreationError, HeaderMatcher,
    PredicateNode, SamplingSpec,
};

/// Configuration of a single access log filter. Exactly one kind of filter
/// must be set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AccessLogFilter {
    StatusCodeFilter(StatusCodeFilter),
    DurationFilter(DurationFilter),
    NotHealthCheckFilter(NotHealthCheckFilter),
    TraceableFilter(TraceableFilter),
    RuntimeFilter(RuntimeFilter),
    AndFilter(AndFilter),
    OrFilter(OrFilter),
    HeaderFilter(HeaderFilter),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct StatusCodeFilter {
    pub comparison: ComparisonFilter,
}

/// Compares the duration of the exchange in milliseconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct DurationFilter {
    pub comparison: ComparisonFilter,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct NotHealthCheckFilter {}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct TraceableFilter {}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ComparisonFilter {
    #[serde(default)]
    pub op: ComparisonOp,
    pub value: RuntimeUInt32,
}

/// An integer that may be overridden by the value of a runtime key.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct RuntimeUInt32 {
    #[serde(default)]
    pub default_value: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_key: Option<String>,
}

/// Samples a percentage of exchanges.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct RuntimeFilter {
    /// Key whose value overrides the numerator of `percent_sampled`.
    pub runtime_key: String,
    /// Defaults to `0/HUNDRED`, sampling nothing.
    #[serde(default)]
    pub percent_sampled: FractionalPercent,
    /// Draw independently for every exchange instead of deriving the
    /// decision from the request id.
    #[serde(default)]
    pub use_independent_randomness: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FractionalPercent {
    #[serde(default)]
    pub numerator: u32,
    #[serde(default)]
    pub denominator: DenominatorType,
}

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    JsonSchema,
    strum_macros::Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DenominatorType {
    #[default]
    Hundred,
    TenThousand,
    Million,
}

impl DenominatorType {
    pub fn value(self) -> u32 {
        match self {
            Self::Hundred => 100,
            Self::TenThousand => 10_000,
            Self::Million => 1_000_000,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct AndFilter {
    pub filters: Vec<AccessLogFilter>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct OrFilter {
    pub filters: Vec<AccessLogFilter>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct HeaderFilter {
    pub header: HeaderMatcher,
}

impl ComparisonFilter {
    fn into_spec(self, field: &str) -> Result<ComparisonSpec, CreationError> {
        let spec = ComparisonSpec::new(self.op, self.value.default_value);
        match self.value.runtime_key {
            Some(key) if key.is_empty() => Err(CreationError::field_invalid(
                format!("{field}.comparison.value.runtime_key"),
                "runtime key cannot be empty",
            )),
            Some(key) => Ok(spec.with_runtime_key(key)),
            None => Ok(spec),
        }
    }
}

impl TryFrom<AccessLogFilter> for PredicateNode {
    type Error = CreationError;

    fn try_from(filter: AccessLogFilter) -> Result<Self, Self::Error> {
        Ok(match filter {
            AccessLogFilter::StatusCodeFilter(filter) => {
                Self::StatusCode(filter.comparison.into_spec("status_code_filter")?)
            }
            AccessLogFilter::DurationFilter(filter) => {
                Self::Duration(filter.comparison.into_spec("duration_filter")?)
            }
            AccessLogFilter::NotHealthCheckFilter(_) => Self::NotHealthCheck,
            AccessLogFilter::TraceableFilter(_) => Self::Traceable,
            AccessLogFilter::RuntimeFilter(filter) => {
                if filter.runtime_key.is_empty() {
                    return Err(CreationError::field_invalid(
                        "runtime_filter.runtime_key",
                        "runtime key cannot be empty",
                    ));
                }

                Self::RuntimeSample(
                    SamplingSpec::new(
                        filter.runtime_key,
                        filter.percent_sampled.numerator,
                        filter.percent_sampled.denominator.value(),
                    )
                    .independent(filter.use_independent_randomness),
                )
            }
            AccessLogFilter::AndFilter(filter) => Self::and(
                filter
                    .filters
                    .into_iter()
                    .map(Self::try_from)
                    .collect::<Result<_, _>>()?,
            )?,
            AccessLogFilter::OrFilter(filter) => Self::or(
                filter
                    .filters
                    .into_iter()
                    .map(Self::try_from)
                    .collect::<Result<_, _>>()?,
            )?,
            AccessLogFilter::HeaderFilter(filter) => {
                filter.header.validate()?;
                Self::Header(filter.header)
            }
        })
    }
}

impl TryFrom<proto::accesslog::AccessLogFilter> for AccessLogFilter {
    type Error = CreationError;

    fn try_from(value: proto::accesslog::AccessLogFilter) -> Result<Self, Self::Error> {
        use proto::accesslog::access_log_filter::FilterSpecifier;

        Ok(
            match value
                .filter_specifier
                .ok_or(CreationError::MissingFilterSpecifier)?
            {
                FilterSpecifier::StatusCodeFilter(filter) => {
                    Self::StatusCodeFilter(StatusCodeFilter {
                        comparison: comparison_from_proto(filter.comparison, "status_code_filter")?,
                    })
                }
                FilterSpecifier::DurationFilter(filter) => Self::DurationFilter(DurationFilter {
                    comparison: comparison_from_proto(filter.comparison, "duration_filter")?,
                }),
                FilterSpecifier::NotHealthCheckFilter(_) => {
                    Self::NotHealthCheckFilter(NotHealthCheckFilter {})
                }
                FilterSpecifier::TraceableFilter(_) => Self::TraceableFilter(TraceableFilter {}),
                FilterSpecifier::RuntimeFilter(filter) => Self::RuntimeFilter(filter.try_into()?),
                FilterSpecifier::AndFilter(filter) => Self::AndFilter(AndFilter {
                    filters: filters_from_proto(filter.filters)?,
                }),
                FilterSpecifier::OrFilter(filter) => Self::OrFilter(OrFilter {
                    filters: filters_from_proto(filter.filters)?,
                }),
                FilterSpecifier::HeaderFilter(filter) => Self::HeaderFilter(HeaderFilter {
                    header: filter
                        .header
                        .ok_or_else(|| ConvertProtoConfigError::missing_field("header_filter.header"))?
                        .try_into()?,
                }),
            },
        )
    }
}

fn filters_from_proto(
    filters: Vec<proto::accesslog::AccessLogFilter>,
) -> Result<Vec<AccessLogFilter>, CreationError> {
    filters.into_iter().map(AccessLogFilter::try_from).collect()
}

fn comparison_from_proto(
    comparison: Option<proto::accesslog::ComparisonFilter>,
    kind: &'static str,
) -> Result<ComparisonFilter, ConvertProtoConfigError> {
    use proto::accesslog::comparison_filter::Op;

    let comparison = comparison.ok_or_else(|| {
        ConvertProtoConfigError::new(
            "`comparison` is required but not found",
            Some(format!("{kind}.comparison")),
        )
    })?;

    let op = match Op::try_from(comparison.op) {
        Ok(Op::Eq) => ComparisonOp::Eq,
        Ok(Op::Ge) => ComparisonOp::Ge,
        Ok(Op::Le) => ComparisonOp::Le,
        Err(_) => {
            return Err(ConvertProtoConfigError::new(
                format!("invalid comparison operator {}", comparison.op),
                Some(format!("{kind}.comparison.op")),
            ))
        }
    };

    let value = comparison.value.ok_or_else(|| {
        ConvertProtoConfigError::new(
            "`value` is required but not found",
            Some(format!("{kind}.comparison.value")),
        )
    })?;

    Ok(ComparisonFilter {
        op,
        value: RuntimeUInt32 {
            default_value: value.default_value,
            runtime_key: (!value.runtime_key.is_empty()).then_some(value.runtime_key),
        },
    })
}

impl TryFrom<proto::accesslog::RuntimeFilter> for RuntimeFilter {
    type Error = ConvertProtoConfigError;

    fn try_from(value: proto::accesslog::RuntimeFilter) -> Result<Self, Self::Error> {
        Ok(Self {
            runtime_key: value.runtime_key,
            percent_sampled: value
                .percent_sampled
                .map(FractionalPercent::try_from)
                .transpose()?
                .unwrap_or_default(),
            use_independent_randomness: value.use_independent_randomness,
        })
    }
}

impl TryFrom<proto::kind::FractionalPercent> for FractionalPercent {
    type Error = ConvertProtoConfigError;

    fn try_from(value: proto::kind::FractionalPercent) -> Result<Self, Self::Error> {
        use proto::kind::fractional_percent::DenominatorType as ProtoDenominator;

        let denominator = match ProtoDenominator::try_from(value.denominator) {
            Ok(ProtoDenominator::Hundred) => DenominatorType::Hundred,
            Ok(ProtoDenominator::TenThousand) => DenominatorType::TenThousand,
            Ok(ProtoDenominator::Million) => DenominatorType::Million,
            Err(_) => {
                return Err(ConvertProtoConfigError::new(
                    format!("invalid denominator {}", value.denominator),
                    Some("runtime_filter.percent_sampled.denominator".into()),
                ))
            }
        };

        Ok(Self {
            numerator: value.numerator,
            denominator,
        })
    }
}
