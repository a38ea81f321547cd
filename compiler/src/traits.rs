use brine_proto_schema::HostRecord;

/// Host record types describe their own shape so a message can be checked
/// against them without run-time reflection.
///
/// ```
/// use brine_proto_compiler::{traits::DescribeHost, HostRecord};
///
/// struct User { id: i64, name: String }
///
/// impl DescribeHost for User {
///     fn describe_host() -> HostRecord {
///         HostRecord::new("crate::model::User")
///             .field("id", "i64")
///             .field("name", "String")
///     }
/// }
///
/// assert_eq!(User::describe_host().fields.len(), 2);
/// ```
pub trait DescribeHost {
    fn describe_host() -> HostRecord;
}
