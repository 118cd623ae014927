//! Per-topology declaration scope.
//!
//! A [`Stack`] is an explicit value handed to each topology builder; there is
//! no process-wide registry. Adding a resource returns a typed [`Handle`]
//! that later declarations use to reference it, so a resource must exist
//! before anything can bind to it.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::marker::PhantomData;

use tracing::debug;

use crate::error::SynthError;
use crate::expr::{Expr, Pseudo};
use crate::resources::Resource;
use crate::template::{
    referenced_logical_ids, Output, RemovalPolicy, ResourceEntry, Template,
    TEMPLATE_FORMAT_VERSION,
};

const MAX_STACK_NAME_LEN: usize = 128;
const MAX_LOGICAL_ID_LEN: usize = 255;

/// Target account and region of a stack.
///
/// Unset values stay environment-agnostic: they synthesize to pseudo
/// parameters and are resolved by CloudFormation at deploy time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackEnv {
    pub account: Option<String>,
    pub region: Option<String>,
}

impl StackEnv {
    pub fn agnostic() -> Self {
        Self::default()
    }

    pub fn new(account: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            account: Some(account.into()),
            region: Some(region.into()),
        }
    }

    pub fn account(&self) -> Expr {
        match &self.account {
            Some(account) => Expr::literal(account.clone()),
            None => Expr::pseudo(Pseudo::AccountId),
        }
    }

    pub fn region(&self) -> Expr {
        match &self.region {
            Some(region) => Expr::literal(region.clone()),
            None => Expr::pseudo(Pseudo::Region),
        }
    }

    /// Environment string used by the cloud assembly manifest.
    pub fn uri(&self) -> String {
        format!(
            "aws://{}/{}",
            self.account.as_deref().unwrap_or("unknown-account"),
            self.region.as_deref().unwrap_or("unknown-region"),
        )
    }
}

/// Typed reference to a resource declared in a [`Stack`].
pub struct Handle<T> {
    logical_id: String,
    _kind: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    fn new(logical_id: String) -> Self {
        Self {
            logical_id,
            _kind: PhantomData,
        }
    }

    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    /// `{"Ref": <logical id>}`.
    pub fn reference(&self) -> Expr {
        Expr::reference(self.logical_id.clone())
    }

    pub fn get_att(&self, attribute: &str) -> Expr {
        Expr::get_att(self.logical_id.clone(), attribute)
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Self::new(self.logical_id.clone())
    }
}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.logical_id == other.logical_id
    }
}

impl<T> Eq for Handle<T> {}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handle").field(&self.logical_id).finish()
    }
}

#[derive(Debug, Clone)]
pub struct Stack {
    name: String,
    env: StackEnv,
    description: Option<String>,
    resources: BTreeMap<String, ResourceEntry>,
    outputs: BTreeMap<String, Output>,
}

impl Stack {
    pub fn new(name: impl Into<String>, env: StackEnv) -> Result<Self, SynthError> {
        let name = name.into();
        validate_stack_name(&name)?;
        Ok(Self {
            name,
            env,
            description: None,
            resources: BTreeMap::new(),
            outputs: BTreeMap::new(),
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn env(&self) -> &StackEnv {
        &self.env
    }

    pub fn resource(&self, logical_id: &str) -> Option<&ResourceEntry> {
        self.resources.get(logical_id)
    }

    pub fn add<T: Resource>(&mut self, logical_id: &str, resource: T) -> Result<Handle<T>, SynthError> {
        validate_logical_id(logical_id)?;
        if self.resources.contains_key(logical_id) {
            return Err(SynthError::DuplicateLogicalId {
                stack: self.name.clone(),
                logical_id: logical_id.to_string(),
            });
        }

        let properties =
            serde_json::to_value(&resource).map_err(|source| SynthError::Serialize {
                what: format!("{} '{logical_id}'", T::TYPE_NAME),
                source,
            })?;

        debug!(
            stack = %self.name,
            logical_id,
            resource_type = T::TYPE_NAME,
            "declared resource"
        );
        self.resources.insert(
            logical_id.to_string(),
            ResourceEntry {
                type_name: T::TYPE_NAME.to_string(),
                properties,
                depends_on: BTreeSet::new(),
                update_replace_policy: None,
                deletion_policy: None,
            },
        );
        Ok(Handle::new(logical_id.to_string()))
    }

    /// Makes CloudFormation create `dependency` before `dependent`.
    pub fn add_dependency<A, B>(
        &mut self,
        dependent: &Handle<A>,
        dependency: &Handle<B>,
    ) -> Result<(), SynthError> {
        if !self.resources.contains_key(dependency.logical_id()) {
            return Err(self.dangling(dependent.logical_id(), dependency.logical_id()));
        }
        let entry = self.entry_mut(dependent.logical_id())?;
        entry.depends_on.insert(dependency.logical_id().to_string());
        Ok(())
    }

    pub fn set_removal_policy<T>(
        &mut self,
        handle: &Handle<T>,
        policy: RemovalPolicy,
    ) -> Result<(), SynthError> {
        let entry = self.entry_mut(handle.logical_id())?;
        entry.update_replace_policy = Some(policy);
        entry.deletion_policy = Some(policy);
        Ok(())
    }

    pub fn add_output(
        &mut self,
        name: &str,
        description: Option<&str>,
        value: Expr,
    ) -> Result<(), SynthError> {
        validate_logical_id(name)?;
        if self.outputs.contains_key(name) {
            return Err(SynthError::DuplicateOutput {
                stack: self.name.clone(),
                name: name.to_string(),
            });
        }
        self.outputs.insert(
            name.to_string(),
            Output {
                description: description.map(str::to_string),
                value,
            },
        );
        Ok(())
    }

    /// Checks that every `Ref`, `Fn::GetAtt` and `DependsOn` target is a
    /// resource of this stack.
    pub fn validate(&self) -> Result<(), SynthError> {
        if self.resources.is_empty() {
            return Err(SynthError::EmptyStack {
                stack: self.name.clone(),
            });
        }

        for (logical_id, entry) in &self.resources {
            for target in referenced_logical_ids(&entry.properties)
                .iter()
                .chain(entry.depends_on.iter())
            {
                if !self.resources.contains_key(target) {
                    return Err(self.dangling(logical_id, target));
                }
            }
        }

        for (name, output) in &self.outputs {
            let value = serde_json::to_value(&output.value).map_err(|source| {
                SynthError::Serialize {
                    what: format!("output '{name}'"),
                    source,
                }
            })?;
            for target in referenced_logical_ids(&value) {
                if !self.resources.contains_key(&target) {
                    return Err(self.dangling(name, &target));
                }
            }
        }

        Ok(())
    }

    pub fn to_template(&self) -> Result<Template, SynthError> {
        self.validate()?;
        Ok(Template {
            format_version: TEMPLATE_FORMAT_VERSION,
            description: self.description.clone(),
            resources: self.resources.clone(),
            outputs: self.outputs.clone(),
        })
    }

    fn entry_mut(&mut self, logical_id: &str) -> Result<&mut ResourceEntry, SynthError> {
        let stack = self.name.clone();
        self.resources
            .get_mut(logical_id)
            .ok_or_else(|| SynthError::DanglingReference {
                stack,
                from: "stack".to_string(),
                target: logical_id.to_string(),
            })
    }

    fn dangling(&self, from: &str, target: &str) -> SynthError {
        SynthError::DanglingReference {
            stack: self.name.clone(),
            from: from.to_string(),
            target: target.to_string(),
        }
    }
}

fn validate_stack_name(name: &str) -> Result<(), SynthError> {
    let invalid = |reason: &str| SynthError::InvalidStackName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    let Some(first) = name.chars().next() else {
        return Err(invalid("must not be empty"));
    };
    if !first.is_ascii_alphabetic() {
        return Err(invalid("must start with a letter"));
    }
    if name.len() > MAX_STACK_NAME_LEN {
        return Err(invalid("must be at most 128 characters"));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(invalid("may only contain letters, digits and hyphens"));
    }
    Ok(())
}

fn validate_logical_id(logical_id: &str) -> Result<(), SynthError> {
    if logical_id.is_empty()
        || logical_id.len() > MAX_LOGICAL_ID_LEN
        || !logical_id.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return Err(SynthError::InvalidLogicalId {
            logical_id: logical_id.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde::Serialize;
    use serde_json::json;

    use super::*;

    #[derive(Serialize)]
    #[serde(rename_all = "PascalCase")]
    struct Widget {
        peer: Option<Expr>,
    }

    impl Resource for Widget {
        const TYPE_NAME: &'static str = "Test::Widget";
    }

    #[test]
    fn rejects_duplicate_logical_ids() {
        let mut stack = Stack::new("Widgets", StackEnv::agnostic()).expect("valid name");
        stack.add("Left", Widget { peer: None }).expect("first add");

        let error = stack
            .add("Left", Widget { peer: None })
            .expect_err("duplicate should fail");
        assert!(matches!(error, SynthError::DuplicateLogicalId { .. }));
    }

    #[test]
    fn rejects_references_to_undeclared_resources() {
        let mut stack = Stack::new("Widgets", StackEnv::agnostic()).expect("valid name");
        stack
            .add(
                "Left",
                Widget {
                    peer: Some(Expr::reference("Missing")),
                },
            )
            .expect("add");

        let error = stack.to_template().expect_err("dangling ref should fail");
        assert!(matches!(
            error,
            SynthError::DanglingReference { ref target, .. } if target == "Missing"
        ));
    }

    #[test]
    fn handles_wire_dependencies_and_removal_policy() {
        let mut stack = Stack::new("Widgets", StackEnv::agnostic()).expect("valid name");
        let left = stack.add("Left", Widget { peer: None }).expect("add");
        let right = stack
            .add(
                "Right",
                Widget {
                    peer: Some(left.get_att("Arn")),
                },
            )
            .expect("add");
        stack.add_dependency(&right, &left).expect("dependency");
        stack
            .set_removal_policy(&left, RemovalPolicy::Retain)
            .expect("policy");

        let template = stack.to_template().expect("template");
        let value = serde_json::to_value(&template).expect("serialize");
        assert_eq!(value["Resources"]["Right"]["DependsOn"], json!(["Left"]));
        assert_eq!(value["Resources"]["Left"]["DeletionPolicy"], json!("Retain"));
        assert_eq!(
            value["Resources"]["Right"]["Properties"]["Peer"],
            json!({"Fn::GetAtt": ["Left", "Arn"]})
        );
    }

    #[test]
    fn agnostic_env_uses_pseudo_parameters() {
        let env = StackEnv::agnostic();
        assert_eq!(env.account(), Expr::pseudo(Pseudo::AccountId));
        assert_eq!(env.uri(), "aws://unknown-account/unknown-region");

        let env = StackEnv::new("123456789012", "eu-central-1");
        assert_eq!(env.region(), Expr::literal("eu-central-1"));
        assert_eq!(env.uri(), "aws://123456789012/eu-central-1");
    }

    #[test]
    fn rejects_invalid_stack_names() {
        assert!(Stack::new("", StackEnv::agnostic()).is_err());
        assert!(Stack::new("1Stack", StackEnv::agnostic()).is_err());
        assert!(Stack::new("My_Stack", StackEnv::agnostic()).is_err());
        assert!(Stack::new("Payment-Stack", StackEnv::agnostic()).is_ok());
    }
}
