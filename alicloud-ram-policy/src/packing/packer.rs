//! Greedy statement packer

use std::ops::Range;

use log::{debug, warn};
use serde_json::Value;

use super::{wrap_statements, STATEMENT_BUDGET};
use crate::error::{RamPolicyError, RamPolicyResult};
use crate::ram::policy_naming::build_combined_policy_name;

/// An existing policy whose statements are copied into combined policies.
#[derive(Debug, Clone, PartialEq)]
pub struct SourcePolicy {
    pub name: String,
    pub statements: Vec<Value>,
}

impl SourcePolicy {
    pub fn new(name: impl Into<String>, statements: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            statements,
        }
    }

    /// Parse a policy document and keep its `Statement` array.
    pub fn from_document(name: impl Into<String>, document: &str) -> RamPolicyResult<Self> {
        let name = name.into();
        let parsed: Value = serde_json::from_str(document).map_err(|source| {
            RamPolicyError::Parse {
                policy_name: name.clone(),
                source,
            }
        })?;

        let statements = match parsed.get("Statement") {
            Some(Value::Array(statements)) => statements.clone(),
            Some(_) => {
                return Err(RamPolicyError::schema(name, "Statement is not an array"));
            }
            None if parsed.is_object() => {
                return Err(RamPolicyError::schema(name, "Statement is missing"));
            }
            None => {
                return Err(RamPolicyError::schema(name, "document is not a JSON object"));
            }
        };

        Ok(Self { name, statements })
    }

    /// The policy's statements serialized without whitespace and joined with `,`.
    pub fn fragment(&self) -> RamPolicyResult<String> {
        let mut compact = Vec::with_capacity(self.statements.len());
        for statement in &self.statements {
            let json = serde_json::to_string(statement).map_err(|source| {
                RamPolicyError::Parse {
                    policy_name: self.name.clone(),
                    source,
                }
            })?;
            compact.push(json);
        }
        Ok(compact.join(","))
    }
}

/// Statements that go into one combined policy.
#[derive(Debug, Clone, PartialEq)]
pub struct PackedGroup {
    /// Names of the source policies contributing to this group, in order.
    pub sources: Vec<String>,
    pub statements: Vec<Value>,
    /// Comma-joined compact statements, without the document wrapper.
    pub content: String,
}

impl PackedGroup {
    pub fn document(&self) -> String {
        wrap_statements(&self.content)
    }
}

/// A synthesized policy, ready to be created and attached.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedPolicy {
    pub name: String,
    pub statements: Vec<Value>,
    pub document: String,
}

impl CombinedPolicy {
    pub fn serialized_size(&self) -> usize {
        self.document.len()
    }
}

/// Split fragment lengths into contiguous groups, greedily, left to right.
///
/// A fragment joins the open group when the group's content plus a `,` separator plus the
/// fragment still fits [`STATEMENT_BUDGET`]; otherwise the group is closed and the fragment
/// opens the next one. The first fragment of a group is always admitted.
fn greedy_fill(lengths: &[usize]) -> Vec<Range<usize>> {
    let mut groups = Vec::new();
    let mut start = 0;
    let mut current_length = 0;

    for (i, &length) in lengths.iter().enumerate() {
        if i == start {
            current_length = length;
            continue;
        }

        let candidate_length = current_length + 1 + length;
        if candidate_length > STATEMENT_BUDGET {
            groups.push(start..i);
            start = i;
            current_length = length;
        } else {
            current_length = candidate_length;
        }
    }

    if start < lengths.len() {
        groups.push(start..lengths.len());
    }
    groups
}

/// Greedy fill over raw statement fragments, returning each group's comma-joined content.
///
/// Fragments longer than the budget are not split and end up alone in an oversized group;
/// [`pack`] rejects such input before it gets here.
pub fn pack_fragments(fragments: &[String]) -> Vec<String> {
    let lengths: Vec<usize> = fragments.iter().map(String::len).collect();
    greedy_fill(&lengths)
        .into_iter()
        .map(|range| fragments[range].join(","))
        .collect()
}

/// Pack the statements of `sources` into the greedy minimum of size-bounded groups.
///
/// The concatenation of the groups' statements equals the concatenation of the sources'
/// statements. Any invalid source aborts the whole pack.
pub fn pack(sources: &[SourcePolicy]) -> RamPolicyResult<Vec<PackedGroup>> {
    let mut contributing = Vec::with_capacity(sources.len());
    let mut fragments = Vec::with_capacity(sources.len());

    for source in sources {
        if source.statements.is_empty() {
            warn!("Policy '{}' has no statements, skipping it", source.name);
            continue;
        }

        let fragment = source.fragment()?;
        if fragment.len() > STATEMENT_BUDGET {
            return Err(RamPolicyError::OversizedPolicy {
                policy_name: source.name.clone(),
                length: fragment.len(),
                budget: STATEMENT_BUDGET,
            });
        }

        contributing.push(source);
        fragments.push(fragment);
    }

    if fragments.is_empty() {
        return Err(RamPolicyError::NoStatements);
    }

    let lengths: Vec<usize> = fragments.iter().map(String::len).collect();
    let groups: Vec<PackedGroup> = greedy_fill(&lengths)
        .into_iter()
        .map(|range| PackedGroup {
            sources: contributing[range.clone()]
                .iter()
                .map(|source| source.name.clone())
                .collect(),
            statements: contributing[range.clone()]
                .iter()
                .flat_map(|source| source.statements.iter().cloned())
                .collect(),
            content: fragments[range].join(","),
        })
        .collect();

    debug!(
        "Packed {} policies into {} combined policies",
        contributing.len(),
        groups.len()
    );
    Ok(groups)
}

/// Pack `sources` and name the resulting documents after `user_name`.
pub fn build_combined_policies(
    user_name: &str,
    sources: &[SourcePolicy],
) -> RamPolicyResult<Vec<CombinedPolicy>> {
    Ok(pack(sources)?
        .into_iter()
        .enumerate()
        .map(|(index, group)| CombinedPolicy {
            name: build_combined_policy_name(user_name, index),
            document: group.document(),
            statements: group.statements,
        })
        .collect())
}
