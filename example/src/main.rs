// example/src/main.rs

use std::time::Duration;

use brine_proto::prelude::*;
use brine_proto::ProtoError;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// The record the `User` message mirrors.
#[allow(dead_code)]
struct User {
    id:         i64,
    email:      String,
    display:    Option<String>,
    roles:      Vec<String>,
    created_at: std::time::SystemTime,
    status:     Status,
}

#[allow(dead_code)]
enum Status {
    Unspecified,
    Active,
    Suspended,
}

impl DescribeHost for User {
    fn describe_host() -> HostRecord {
        HostRecord::new("crate::model::User")
            .field("id", "i64")
            .field("email", "String")
            .field("display", "Option<String>")
            .field("roles", "Vec<String>")
            .field("created_at", "SystemTime")
            .field("status", "Status")
    }
}

fn user_file() -> FileModel {
    file("acme/user/v1/user.proto")
        .option("go_package", "github.com/acme/gen/user/v1;userv1")
        .enumeration(
            enum_type("Status")
                .value("STATUS_UNSPECIFIED", 0)
                .value("STATUS_ACTIVE", 1)
                .value("STATUS_SUSPENDED", 2),
        )
        .message(
            message("User")
                .field(1, field::int64("id").gt(0))
                .field(2, field::string("email").required().email().max_len(254))
                .field(3, field::string("display").optional().min_len(1).max_len(64))
                .field(4, field::repeated("roles", field::string("role").in_(["admin", "member", "viewer"])).max_items(8).unique())
                .field(5, field::timestamp("created_at").lt_now())
                .field(6, field::enumeration("status", "Status").defined_only())
                .reserved_range(7, 9)
                .cel("display_not_email", "display must differ from email", "this.display != this.email")
                .bind_host::<User>(),
        )
        .message(
            message("Session")
                .field(1, field::message("user", "User"))
                .field(2, field::duration("ttl").gte(Duration::from_secs(60)).lte(Duration::from_secs(86_400)))
                .field(3, field::map("claims", field::string("key"), field::string("value").max_len(256)).max_pairs(32)),
        )
        .service(
            service("UserService")
                .rpc("ListUsers", "Session", "User")
                .rpc("GetUser", "Session", "User")
                .method(method("WatchUsers", "Session", "User").server_streaming()),
        )
}

fn main() -> Result<(), ProtoError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let root = PackageRoot::new("acme.user.v1").file(user_file());
    let artifacts = brine_proto::generate(root)?;

    for artifact in &artifacts {
        info!(name = %artifact.name, bytes = artifact.contents.len(), "generated artifact");
        println!("// ---- {} ----", artifact.name);
        println!("{}", artifact.contents);
    }
    Ok(())
}
