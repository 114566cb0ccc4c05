//! Response sanitization.
//!
//! Instance records returned by the provider carry the root password of the instance, both in
//! listings and in single-instance lookups. The password must never reach the MCP client, so tools
//! flagged `sanitize` pass their response through [`sanitize`] before rendering.

use serde_json::Value;
use tracing::debug;

/// Field holding the per-instance secret.
pub const CREDENTIAL_FIELD: &str = "sshPassword";

/// Field holding the list of instance records.
pub const INSTANCES_FIELD: &str = "instances";

/// Field wrapping a single instance record.
pub const INSTANCE_FIELD: &str = "instance";

/// Remove the credential field from every instance record in `payload` (in place).
///
/// Covers the `instances` list, a bare record at the top level and a record wrapped in `instance`.
/// Best-effort and shape-tolerant: absent payloads and non-object entries are left untouched. The
/// field is removed (absent), not nulled, and order/length of the array are preserved.
pub fn sanitize(payload: Option<&mut Value>) {
    if let Some(payload) = payload {
        let removed = clear_instance_credentials(payload) + clear_record_credential(payload);
        if removed > 0 {
            debug!(removed, "removed instance credentials from response");
        }
    }
}

/// The part of a response payload the sanitizer looks at.
#[derive(Debug)]
pub enum InstancesField<'a> {
    /// Payload is not an object, or has no `instances` key.
    Absent,
    /// `instances` is present and holds a list.
    List(&'a mut Vec<Value>),
    /// `instances` is present but is not a list.
    Other,
}

impl<'a> InstancesField<'a> {
    pub fn of(payload: &'a mut Value) -> Self {
        match payload.get_mut(INSTANCES_FIELD) {
            None => Self::Absent,
            Some(Value::Array(items)) => Self::List(items),
            Some(_) => Self::Other,
        }
    }
}

/// Clear the credential of each record in the `instances` list.
///
/// Returns how many credentials were removed.
pub fn clear_instance_credentials(payload: &mut Value) -> usize {
    let InstancesField::List(instances) = InstancesField::of(payload) else {
        return 0;
    };

    instances
        .iter_mut()
        .filter_map(Value::as_object_mut)
        .filter_map(|record| record.remove(CREDENTIAL_FIELD))
        .count()
}

/// Clear the credential of a single-instance payload: the top-level record itself and an
/// `instance` wrapper object, if present.
///
/// Returns how many credentials were removed.
pub fn clear_record_credential(payload: &mut Value) -> usize {
    let Some(record) = payload.as_object_mut() else {
        return 0;
    };

    let mut removed = usize::from(record.remove(CREDENTIAL_FIELD).is_some());
    if let Some(Value::Object(inner)) = record.get_mut(INSTANCE_FIELD) {
        removed += usize::from(inner.remove(CREDENTIAL_FIELD).is_some());
    }
    removed
}
