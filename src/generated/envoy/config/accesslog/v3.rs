#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AccessLog {
    /// The name of the access log sink to instantiate.
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
    /// Filter which is used to determine if the access log needs to be written.
    #[prost(message, optional, tag = "2")]
    pub filter: ::core::option::Option<AccessLogFilter>,
    #[prost(oneof = "access_log::ConfigType", tags = "4")]
    pub config_type: ::core::option::Option<access_log::ConfigType>,
}
/// Nested message and enum types in `AccessLog`.
pub mod access_log {
    #[allow(clippy::derive_partial_eq_without_eq)]
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum ConfigType {
        #[prost(message, tag = "4")]
        TypedConfig(::prost_types::Any),
    }
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AccessLogFilter {
    #[prost(oneof = "access_log_filter::FilterSpecifier", tags = "1, 2, 3, 4, 5, 6, 7, 8")]
    pub filter_specifier: ::core::option::Option<access_log_filter::FilterSpecifier>,
}
/// Nested message and enum types in `AccessLogFilter`.
pub mod access_log_filter {
    #[allow(clippy::derive_partial_eq_without_eq)]
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum FilterSpecifier {
        #[prost(message, tag = "1")]
        StatusCodeFilter(super::StatusCodeFilter),
        #[prost(message, tag = "2")]
        DurationFilter(super::DurationFilter),
        #[prost(message, tag = "3")]
        NotHealthCheckFilter(super::NotHealthCheckFilter),
        #[prost(message, tag = "4")]
        TraceableFilter(super::TraceableFilter),
        #[prost(message, tag = "5")]
        RuntimeFilter(super::RuntimeFilter),
        #[prost(message, tag = "6")]
        AndFilter(super::AndFilter),
        #[prost(message, tag = "7")]
        OrFilter(super::OrFilter),
        #[prost(message, tag = "8")]
        HeaderFilter(super::HeaderFilter),
    }
}
/// Filter on an integer comparison.
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ComparisonFilter {
    /// Comparison operator.
    #[prost(enumeration = "comparison_filter::Op", tag = "1")]
    pub op: i32,
    /// Value to compare against.
    #[prost(message, optional, tag = "2")]
    pub value: ::core::option::Option<super::super::core::v3::RuntimeUInt32>,
}
/// Nested message and enum types in `ComparisonFilter`.
pub mod comparison_filter {
    #[derive(
        Clone,
        Copy,
        Debug,
        PartialEq,
        Eq,
        Hash,
        PartialOrd,
        Ord,
        ::prost::Enumeration
    )]
    #[repr(i32)]
    pub enum Op {
        /// =
        Eq = 0,
        /// >=
        Ge = 1,
        /// <=
        Le = 2,
    }
}
/// Filters on HTTP response/status code.
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StatusCodeFilter {
    #[prost(message, optional, tag = "1")]
    pub comparison: ::core::option::Option<ComparisonFilter>,
}
/// Filters on total request duration in milliseconds.
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DurationFilter {
    #[prost(message, optional, tag = "1")]
    pub comparison: ::core::option::Option<ComparisonFilter>,
}
/// Filters for requests that are not health check requests.
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NotHealthCheckFilter {}
/// Filters for requests that are traceable.
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TraceableFilter {}
/// Filters for random sampling of requests.
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RuntimeFilter {
    /// Runtime key to get an optional overridden numerator for use in the
    /// `percent_sampled` field.
    #[prost(string, tag = "1")]
    pub runtime_key: ::prost::alloc::string::String,
    /// The default sampling percentage.
    #[prost(message, optional, tag = "2")]
    pub percent_sampled: ::core::option::Option<super::super::super::kind::v3::FractionalPercent>,
    /// Sample independently of the request id.
    #[prost(bool, tag = "3")]
    pub use_independent_randomness: bool,
}
/// Performs a logical "and" operation on the result of each filter in filters.
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AndFilter {
    #[prost(message, repeated, tag = "1")]
    pub filters: ::prost::alloc::vec::Vec<AccessLogFilter>,
}
/// Performs a logical "or" operation on the result of each individual filter.
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OrFilter {
    #[prost(message, repeated, tag = "2")]
    pub filters: ::prost::alloc::vec::Vec<AccessLogFilter>,
}
/// Filters requests based on the presence or value of a request header.
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct HeaderFilter {
    #[prost(message, optional, tag = "1")]
    pub header: ::core::option::Option<super::super::route::v3::HeaderMatcher>,
}
