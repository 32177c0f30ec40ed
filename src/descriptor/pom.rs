//! POM rendering for module descriptors.

use super::ModuleDescriptor;
use crate::error::{DescriptorError, Result};
use handlebars::Handlebars;
use serde::Serialize;

const POM_TEMPLATE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:schemaLocation="http://maven.apache.org/POM/4.0.0 https://maven.apache.org/xsd/maven-4.0.0.xsd">
  <modelVersion>4.0.0</modelVersion>
  <groupId>{{d.group}}</groupId>
  <artifactId>{{d.artifact_id}}</artifactId>
  <version>{{version}}</version>
  <packaging>{{d.packaging}}</packaging>
  <name>{{d.name}}</name>
{{#if d.description}}
  <description>{{d.description}}</description>
{{/if}}
  <url>{{d.url}}</url>
{{#if d.organization}}
  <organization>
    <name>{{d.organization.name}}</name>
{{#if d.organization.url}}
    <url>{{d.organization.url}}</url>
{{/if}}
  </organization>
{{/if}}
  <licenses>
    <license>
      <name>{{d.license.name}}</name>
      <url>{{d.license.url}}</url>
    </license>
  </licenses>
  <developers>
{{#each d.developers}}
    <developer>
      <id>{{id}}</id>
      <name>{{name}}</name>
{{#if email}}
      <email>{{email}}</email>
{{/if}}
    </developer>
{{/each}}
  </developers>
  <scm>
    <connection>{{d.scm.connection}}</connection>
    <url>{{d.scm.url}}</url>
  </scm>
{{#if d.issues}}
  <issueManagement>
    <system>{{d.issues.system}}</system>
    <url>{{d.issues.url}}</url>
  </issueManagement>
{{/if}}
{{#if d.dependencies}}
  <dependencies>
{{#each d.dependencies}}
    <dependency>
      <groupId>{{group}}</groupId>
      <artifactId>{{artifact_id}}</artifactId>
      <version>{{version}}</version>
      <scope>{{scope}}</scope>
    </dependency>
{{/each}}
  </dependencies>
{{/if}}
</project>
"#;

#[derive(Serialize)]
struct PomContext<'a> {
    d: &'a ModuleDescriptor,
    version: &'a str,
}

/// Render the Maven POM for `descriptor` at `version`
pub fn render_pom(descriptor: &ModuleDescriptor, version: &str) -> Result<String> {
    let render_error = |reason: String| DescriptorError::Render {
        module: descriptor.artifact_id.clone(),
        reason,
    };

    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(escape_xml);
    handlebars
        .register_template_string("pom", POM_TEMPLATE)
        .map_err(|e| render_error(e.to_string()))?;

    let rendered = handlebars
        .render(
            "pom",
            &PomContext {
                d: descriptor,
                version,
            },
        )
        .map_err(|e| render_error(e.to_string()))?;

    Ok(rendered)
}

fn escape_xml(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
