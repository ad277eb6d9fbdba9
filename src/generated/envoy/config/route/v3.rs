/// Specifies how a single header is matched.
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct HeaderMatcher {
    /// Specifies the name of the header in the request.
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
    /// If specified, the match result will be inverted before checking.
    #[prost(bool, tag = "8")]
    pub invert_match: bool,
    /// Specifies how the header match will be performed.
    #[prost(oneof = "header_matcher::HeaderMatchSpecifier", tags = "4, 11, 6, 7, 9, 10, 12")]
    pub header_match_specifier: ::core::option::Option<header_matcher::HeaderMatchSpecifier>,
}
/// Nested message and enum types in `HeaderMatcher`.
pub mod header_matcher {
    #[allow(clippy::derive_partial_eq_without_eq)]
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum HeaderMatchSpecifier {
        #[prost(string, tag = "4")]
        ExactMatch(::prost::alloc::string::String),
        #[prost(message, tag = "11")]
        SafeRegexMatch(super::super::super::super::kind::matcher::v3::RegexMatcher),
        #[prost(message, tag = "6")]
        RangeMatch(super::super::super::super::kind::v3::Int64Range),
        #[prost(bool, tag = "7")]
        PresentMatch(bool),
        #[prost(string, tag = "9")]
        PrefixMatch(::prost::alloc::string::String),
        #[prost(string, tag = "10")]
        SuffixMatch(::prost::alloc::string::String),
        #[prost(string, tag = "12")]
        ContainsMatch(::prost::alloc::string::String),
    }
}
