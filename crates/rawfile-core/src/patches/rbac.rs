use k8s_openapi::api::rbac::v1::{RoleRef, Subject};
use tracing::{debug, error, warn};

use crate::config::RBAC_NAME_FORMATTER;
use crate::format::format_name;
use crate::patch::{Patch, PatchContext};
use crate::resource::ManifestObject;

/// Renames cluster RBAC objects and keeps bindings consistent
pub struct RbacAdjustments;

impl RbacAdjustments {
    fn rename(ctx: &PatchContext<'_>, name: &str) -> String {
        let formatter = ctx.config.get_str(RBAC_NAME_FORMATTER);
        if formatter.is_none() {
            debug!(name, "No RBAC formatter, keeping name");
        }
        format_name(formatter, ctx.app, name)
    }

    fn adjust_binding(
        ctx: &PatchContext<'_>,
        subjects: Option<&mut Vec<Subject>>,
        role_ref: &mut RoleRef,
    ) {
        let namespace = ctx.config.namespace();
        for subject in subjects.into_iter().flatten() {
            if subject.kind == "ServiceAccount" {
                subject.namespace = Some(namespace.to_string());
            }
        }
        if role_ref.kind == "ClusterRole" {
            role_ref.name = Self::rename(ctx, &role_ref.name);
        }
    }
}

impl Patch for RbacAdjustments {
    fn name(&self) -> &'static str {
        "rbac-adjustments"
    }

    fn check(&self, ctx: &PatchContext<'_>) {
        if ctx.config.get_str(RBAC_NAME_FORMATTER).is_none() {
            warn!(
                option = RBAC_NAME_FORMATTER,
                "RBAC formatter is empty, keeping default names"
            );
        }
    }

    fn apply(&self, ctx: &PatchContext<'_>, obj: &mut ManifestObject) {
        if !matches!(
            obj,
            ManifestObject::ClusterRole(_)
                | ManifestObject::ClusterRoleBinding(_)
                | ManifestObject::RoleBinding(_)
        ) {
            return;
        }
        let Some(name) = obj.name().map(str::to_string) else {
            error!(kind = obj.kind(), "Resource is missing metadata name, skipping patch");
            return;
        };

        match obj {
            ManifestObject::ClusterRole(role) => {
                role.metadata.name = Some(Self::rename(ctx, &name));
            }
            ManifestObject::ClusterRoleBinding(binding) => {
                binding.metadata.name = Some(Self::rename(ctx, &name));
                Self::adjust_binding(ctx, binding.subjects.as_mut(), &mut binding.role_ref);
            }
            ManifestObject::RoleBinding(binding) => {
                Self::adjust_binding(ctx, binding.subjects.as_mut(), &mut binding.role_ref);
            }
            _ => {}
        }
    }
}
