//! App registry and cloud assembly synthesis.
//!
//! The assembly layout follows what the CDK toolkit consumes: one
//! `<stack>.template.json` per stack plus a `manifest.json` describing them.
//! Output is fully determined by the declared stacks; nothing time- or
//! host-dependent is written.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::SynthError;
use crate::stack::Stack;
use crate::template::Template;

pub const CLOUD_ASSEMBLY_SCHEMA_VERSION: &str = "36.0.0";
pub const MANIFEST_FILE: &str = "manifest.json";
const STACK_ARTIFACT_TYPE: &str = "aws:cloudformation:stack";

#[derive(Debug, Default)]
pub struct App {
    stacks: Vec<Stack>,
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_stack(&mut self, stack: Stack) -> Result<(), SynthError> {
        if self.stacks.iter().any(|known| known.name() == stack.name()) {
            return Err(SynthError::DuplicateStack {
                stack: stack.name().to_string(),
            });
        }
        self.stacks.push(stack);
        Ok(())
    }

    pub fn synth(&self) -> Result<CloudAssembly, SynthError> {
        let mut templates = BTreeMap::new();
        let mut files = BTreeMap::new();
        let mut artifacts = BTreeMap::new();

        for stack in &self.stacks {
            let template = stack.to_template()?;
            let file_name = template_file_name(stack.name());
            debug!(
                stack = stack.name(),
                resources = template.resources.len(),
                outputs = template.outputs.len(),
                "synthesized stack"
            );

            files.insert(file_name.clone(), template.to_json()?);
            artifacts.insert(
                stack.name().to_string(),
                ManifestArtifact {
                    kind: STACK_ARTIFACT_TYPE,
                    environment: stack.env().uri(),
                    properties: ArtifactProperties {
                        template_file: file_name,
                    },
                    display_name: stack.name().to_string(),
                },
            );
            templates.insert(stack.name().to_string(), template);
        }

        let manifest = Manifest {
            version: CLOUD_ASSEMBLY_SCHEMA_VERSION,
            artifacts,
        };
        let mut manifest_json =
            serde_json::to_string_pretty(&manifest).map_err(|source| SynthError::Serialize {
                what: "assembly manifest".to_string(),
                source,
            })?;
        manifest_json.push('\n');
        files.insert(MANIFEST_FILE.to_string(), manifest_json);

        Ok(CloudAssembly { templates, files })
    }
}

pub fn template_file_name(stack_name: &str) -> String {
    format!("{stack_name}.template.json")
}

#[derive(Debug, Serialize)]
struct Manifest {
    version: &'static str,
    artifacts: BTreeMap<String, ManifestArtifact>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ManifestArtifact {
    #[serde(rename = "type")]
    kind: &'static str,
    environment: String,
    properties: ArtifactProperties,
    display_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ArtifactProperties {
    template_file: String,
}

/// The synthesized output of an [`App`].
#[derive(Debug, Clone, PartialEq)]
pub struct CloudAssembly {
    templates: BTreeMap<String, Template>,
    files: BTreeMap<String, String>,
}

impl CloudAssembly {
    pub fn template(&self, stack_name: &str) -> Option<&Template> {
        self.templates.get(stack_name)
    }

    pub fn templates(&self) -> &BTreeMap<String, Template> {
        &self.templates
    }

    /// File name to file contents, manifest included.
    pub fn files(&self) -> &BTreeMap<String, String> {
        &self.files
    }

    /// Hex sha256 over every file name and body, in file name order.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for (name, body) in &self.files {
            hasher.update(name.as_bytes());
            hasher.update([0u8]);
            hasher.update(body.as_bytes());
            hasher.update([0u8]);
        }
        format!("{:x}", hasher.finalize())
    }

    pub fn write_to(&self, out_dir: &Path) -> Result<(), SynthError> {
        fs::create_dir_all(out_dir).map_err(|source| SynthError::Io {
            path: out_dir.to_path_buf(),
            source,
        })?;

        for (name, body) in &self.files {
            let path = out_dir.join(name);
            fs::write(&path, body).map_err(|source| SynthError::Io {
                path: path.clone(),
                source,
            })?;
        }

        info!(
            out_dir = %out_dir.display(),
            files = self.files.len(),
            fingerprint = %self.fingerprint(),
            "wrote cloud assembly"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde::Serialize;
    use serde_json::{json, Value};

    use super::*;
    use crate::resources::Resource;
    use crate::stack::StackEnv;

    #[derive(Serialize)]
    #[serde(rename_all = "PascalCase")]
    struct Topic {
        display_name: String,
    }

    impl Resource for Topic {
        const TYPE_NAME: &'static str = "AWS::SNS::Topic";
    }

    fn stack(name: &str) -> Stack {
        let mut stack = Stack::new(name, StackEnv::agnostic()).expect("valid name");
        stack
            .add(
                "Alerts",
                Topic {
                    display_name: "alerts".to_string(),
                },
            )
            .expect("add");
        stack
    }

    #[test]
    fn rejects_duplicate_stack_names() {
        let mut app = App::new();
        app.add_stack(stack("Alerts")).expect("first stack");
        assert!(matches!(
            app.add_stack(stack("Alerts")),
            Err(SynthError::DuplicateStack { .. })
        ));
    }

    #[test]
    fn writes_templates_and_manifest() {
        let mut app = App::new();
        app.add_stack(stack("Alerts")).expect("stack");
        let assembly = app.synth().expect("synth");

        let dir = tempfile::tempdir().expect("tempdir");
        assembly.write_to(dir.path()).expect("write");

        let manifest: Value = serde_json::from_str(
            &fs::read_to_string(dir.path().join(MANIFEST_FILE)).expect("manifest"),
        )
        .expect("manifest json");
        assert_eq!(
            manifest["artifacts"]["Alerts"],
            json!({
                "type": "aws:cloudformation:stack",
                "environment": "aws://unknown-account/unknown-region",
                "properties": {"templateFile": "Alerts.template.json"},
                "displayName": "Alerts"
            })
        );

        let template = fs::read_to_string(dir.path().join("Alerts.template.json")).expect("template");
        assert!(template.ends_with('\n'));
        assert_eq!(&template, &assembly.files()["Alerts.template.json"]);
    }

    #[test]
    fn fingerprint_tracks_content() {
        let mut first = App::new();
        first.add_stack(stack("Alerts")).expect("stack");
        let mut second = App::new();
        second.add_stack(stack("Alerts")).expect("stack");
        let mut third = App::new();
        third.add_stack(stack("Other")).expect("stack");

        let first = first.synth().expect("synth");
        assert_eq!(first.fingerprint(), second.synth().expect("synth").fingerprint());
        assert_ne!(first.fingerprint(), third.synth().expect("synth").fingerprint());
    }
}
