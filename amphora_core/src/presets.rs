//! The shipped backend configurations.
//!
//! Exactly one preset is selected per project. All three share the same
//! contract: emit a storage output consumable by generated client
//! configuration, and optionally attach policy documents to the
//! collaborator-supplied principal roles.

use crate::access::{pattern_prefix, PathAccess, PrincipalClass, StorageAction};
use crate::backend::Backend;
use crate::policy::{PolicyDocument, PolicyStatement};
use crate::resources::{AuthResources, DataResources, ResourceError};
use crate::storage::{BucketSource, StorageOutput};

pub const PUBLIC_PATTERN: &str = "public/*";
pub const ADMIN_PATTERN: &str = "admin/*";

/// `s3:prefix` condition values covering a path pattern: the bare prefix and
/// the wildcard form, e.g. `["public/", "public/*"]`.
fn prefix_patterns(pattern: &str) -> [String; 2] {
    let prefix = pattern_prefix(pattern).to_string();
    [prefix.clone(), format!("{}*", prefix)]
}

fn public_paths() -> PathAccess {
    let mut paths = PathAccess::new();
    paths.grant(
        PUBLIC_PATTERN,
        PrincipalClass::Guest,
        [StorageAction::Get, StorageAction::List],
    );
    paths.grant(
        PUBLIC_PATTERN,
        PrincipalClass::Authenticated,
        [
            StorageAction::Get,
            StorageAction::List,
            StorageAction::Write,
            StorageAction::Delete,
        ],
    );
    paths
}

fn guest_read_policy(bucket: &BucketSource) -> PolicyDocument {
    PolicyDocument::new("storage-guest-read")
        .with_statement(PolicyStatement::allow(
            ["s3:GetObject"],
            [bucket.object_arn(PUBLIC_PATTERN)],
        ))
        .with_statement(
            PolicyStatement::allow(
                ["s3:ListBucket"],
                [bucket.arn(), format!("{}/*", bucket.arn())],
            )
            .with_prefix_condition(prefix_patterns(PUBLIC_PATTERN)),
        )
}

fn authenticated_read_policy(bucket: &BucketSource) -> PolicyDocument {
    PolicyDocument::new("storage-auth-read").with_statement(
        PolicyStatement::allow(
            ["s3:GetObject", "s3:ListBucket"],
            [bucket.arn(), format!("{}/*", bucket.arn())],
        )
        .with_prefix_condition(prefix_patterns(PUBLIC_PATTERN)),
    )
}

fn admin_manage_policy(bucket: &BucketSource) -> PolicyDocument {
    PolicyDocument::new("storage-admin-manage")
        .with_statement(PolicyStatement::allow(
            ["s3:GetObject", "s3:PutObject", "s3:DeleteObject"],
            [bucket.object_arn(ADMIN_PATTERN)],
        ))
        .with_statement(
            // The two bucket ARNs are separate list entries. An earlier
            // revision shipped them fused into one literal; PolicyDocument
            // validation now rejects that form outright.
            PolicyStatement::allow(
                ["s3:ListBucket"],
                [bucket.arn(), format!("{}/*", bucket.arn())],
            )
            .with_prefix_condition(prefix_patterns(ADMIN_PATTERN)),
        )
}

/// Public-read configuration: guests read and list under `public/`, signed-in
/// users additionally write and delete there.
pub fn public_read(auth: AuthResources, data: DataResources, bucket: BucketSource) -> Backend {
    let unauth_role = auth.unauthenticated_role_arn.clone();
    let auth_role = auth.authenticated_role_arn.clone();

    let mut backend = Backend::new(auth, data);
    backend.add_storage_output(StorageOutput::for_bucket(&bucket, public_paths()));
    backend.attach_policy(unauth_role, guest_read_policy(&bucket));
    backend.attach_policy(auth_role, authenticated_read_policy(&bucket));
    backend.import_bucket(bucket);
    backend
}

/// Public-read plus an `admin/` prefix managed by a named group. Fails if the
/// auth collaborator provisioned no role for that group.
pub fn public_admin(
    auth: AuthResources,
    data: DataResources,
    bucket: BucketSource,
    admin_group: &str,
) -> Result<Backend, ResourceError> {
    let admin_role = auth.group_role(admin_group)?.to_string();

    let mut paths = public_paths();
    paths.grant(
        ADMIN_PATTERN,
        PrincipalClass::group(admin_group),
        [
            StorageAction::Get,
            StorageAction::List,
            StorageAction::Write,
            StorageAction::Delete,
        ],
    );

    let mut backend = public_read(auth, data, bucket.clone());
    backend.add_storage_output(StorageOutput::for_bucket(&bucket, paths));
    backend.attach_policy(admin_role, admin_manage_policy(&bucket));
    Ok(backend)
}

/// Storage output only: public and admin path rules with no policy
/// attachments. Role permissions are assumed to be managed out-of-band.
pub fn outputs_only(
    auth: AuthResources,
    data: DataResources,
    bucket: BucketSource,
    admin_group: &str,
) -> Backend {
    let mut paths = public_paths();
    paths.grant(
        ADMIN_PATTERN,
        PrincipalClass::group(admin_group),
        [
            StorageAction::Get,
            StorageAction::List,
            StorageAction::Write,
            StorageAction::Delete,
        ],
    );

    let mut backend = Backend::new(auth, data);
    backend.add_storage_output(StorageOutput::for_bucket(&bucket, paths));
    backend.import_bucket(bucket);
    backend
}
