/// Custom configuration for an access log sink that writes log entries
/// directly to a file.
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FileAccessLog {
    /// A path to a local file to which to write the access log entries.
    #[prost(string, tag = "1")]
    pub path: ::prost::alloc::string::String,
    /// Layout of each written line, `json` when empty.
    #[prost(string, tag = "2")]
    pub format: ::prost::alloc::string::String,
}
