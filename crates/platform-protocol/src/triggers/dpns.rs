//! Domain name registration rules.
//!
//! A domain is created under a normalized label and an optional normalized
//! parent domain name. Top-level domains belong to the DPNS top-level
//! identity. Subdomains need an existing parent that either allows
//! subdomains or is owned by the same identity. Every domain must have been
//! preordered under `hash_double(preorderSalt ‖ fullDomainName)`.

use super::{
    condition_error, get_bool_or_false, get_bytes, get_optional_identifier, get_str,
    DataTriggerExecutionContext, DataTriggerExecutionResult, DataTriggerOutcome,
};
use crate::domain::DocumentTransition;
use crate::ports::DocumentQuery;
use serde_json::json;
use shared_types::{hash_double, Identifier};

pub const DOMAIN_DOCUMENT: &str = "domain";
pub const PREORDER_DOCUMENT: &str = "preorder";

pub const MAX_PRINTABLE_DOMAIN_NAME_LENGTH: usize = 253;

/// Lowercase `text` and fold look-alike characters: `o` to `0`, `i` and
/// `l` to `1`.
pub fn convert_to_homograph_safe_chars(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| match c {
            'o' => '0',
            'i' | 'l' => '1',
            other => other,
        })
        .collect()
}

/// Label, or `label.parent` under a parent domain.
pub fn full_domain_name(normalized_label: &str, normalized_parent_domain_name: &str) -> String {
    if normalized_parent_domain_name.is_empty() {
        normalized_label.to_string()
    } else {
        format!("{normalized_label}.{normalized_parent_domain_name}")
    }
}

pub async fn create_domain_data_trigger(
    transition: &DocumentTransition,
    context: &DataTriggerExecutionContext<'_>,
    top_level_identity: Option<&Identifier>,
) -> DataTriggerOutcome {
    let mut result = DataTriggerExecutionResult::new();
    let is_dry_run = context.is_dry_run();
    let owner_id = context.owner_id;

    let label = get_str(transition, "label")?;
    let normalized_label = get_str(transition, "normalizedLabel")?;
    let normalized_parent_domain_name = get_str(transition, "normalizedParentDomainName")?;
    let preorder_salt = get_bytes(transition, "preorderSalt")?;
    let unique_identity_id = get_optional_identifier(transition, "records.dashUniqueIdentityId")?;
    let alias_identity_id = get_optional_identifier(transition, "records.dashAliasIdentityId")?;
    let allow_subdomains = get_bool_or_false(transition, "subdomainRules.allowSubdomains")?;

    let full_domain_name = full_domain_name(normalized_label, normalized_parent_domain_name);

    if !is_dry_run {
        if full_domain_name.len() > MAX_PRINTABLE_DOMAIN_NAME_LENGTH {
            result.add_error(condition_error(
                context,
                transition,
                format!(
                    "Full domain name length can not be more than {} characters long but got {}",
                    MAX_PRINTABLE_DOMAIN_NAME_LENGTH,
                    full_domain_name.len()
                ),
            ));
        }

        if normalized_label != convert_to_homograph_safe_chars(label) {
            result.add_error(condition_error(
                context,
                transition,
                "Normalized label doesn't match label",
            ));
        }

        if normalized_parent_domain_name
            != convert_to_homograph_safe_chars(normalized_parent_domain_name)
        {
            result.add_error(condition_error(
                context,
                transition,
                "Parent domain name is not normalized (e.g. contains non-homograph-safe characters)",
            ));
        }

        if let Some(id) = unique_identity_id.filter(|id| id != owner_id) {
            result.add_error(condition_error(
                context,
                transition,
                format!("ownerId {owner_id} doesn't match dashUniqueIdentityId {id}"),
            ));
        }

        if let Some(id) = alias_identity_id.filter(|id| id != owner_id) {
            result.add_error(condition_error(
                context,
                transition,
                format!("ownerId {owner_id} doesn't match dashAliasIdentityId {id}"),
            ));
        }

        if normalized_parent_domain_name.is_empty() && top_level_identity != Some(owner_id) {
            result.add_error(condition_error(
                context,
                transition,
                "Can't create top level domain for this identity",
            ));
        }
    }

    if !normalized_parent_domain_name.is_empty() {
        let (parent_label, grand_parent_domain_name) = normalized_parent_domain_name
            .split_once('.')
            .unwrap_or((normalized_parent_domain_name, ""));

        let query = DocumentQuery::new()
            .with_equal("normalizedParentDomainName", json!(grand_parent_domain_name))
            .with_equal("normalizedLabel", json!(parent_label))
            .with_limit(1);
        let parents = context
            .repository
            .fetch_documents(
                &context.data_contract.id,
                DOMAIN_DOCUMENT,
                &query,
                context.state_transition_execution_context,
            )
            .await?;

        if !is_dry_run {
            let Some(parent) = parents.first() else {
                result.add_error(condition_error(
                    context,
                    transition,
                    "Parent domain is not present",
                ));
                return Ok(result);
            };

            if allow_subdomains {
                result.add_error(condition_error(
                    context,
                    transition,
                    "Allowing subdomains registration is forbidden for non top level domains",
                ));
                return Ok(result);
            }

            let parent_allows_subdomains = parent
                .get("subdomainRules.allowSubdomains")
                .and_then(|value| value.as_bool())
                .unwrap_or_default();
            if !parent_allows_subdomains && parent.owner_id != *owner_id {
                result.add_error(condition_error(
                    context,
                    transition,
                    "The subdomain can be created only by the parent domain owner",
                ));
                return Ok(result);
            }
        }
    }

    let mut salted_domain_buffer = preorder_salt;
    salted_domain_buffer.extend_from_slice(full_domain_name.as_bytes());
    let salted_domain_hash = hash_double(&salted_domain_buffer);

    let query = DocumentQuery::new()
        .with_equal("saltedDomainHash", json!(salted_domain_hash.to_vec()))
        .with_limit(1);
    let preorders = context
        .repository
        .fetch_documents(
            &context.data_contract.id,
            PREORDER_DOCUMENT,
            &query,
            context.state_transition_execution_context,
        )
        .await?;

    if !is_dry_run && preorders.is_empty() {
        result.add_error(condition_error(
            context,
            transition,
            "preorderDocument was not found",
        ));
    }

    Ok(result)
}
