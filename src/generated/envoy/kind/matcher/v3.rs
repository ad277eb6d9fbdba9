/// A regex matcher designed for safety when used with untrusted input.
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RegexMatcher {
    /// The regex match string.
    #[prost(string, tag = "2")]
    pub regex: ::prost::alloc::string::String,
}
