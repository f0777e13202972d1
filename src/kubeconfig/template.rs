/// Handlebars template for GKE kubeconfigs
use handlebars::Handlebars;
use serde::Serialize;
use std::sync::OnceLock;

use super::access::{ClusterAccessInfo, ContextIdentity};
use super::Error;

const TEMPLATE_NAME: &str = "kubeconfig";

static SHARED: OnceLock<KubeconfigTemplate> = OnceLock::new();

const KUBECONFIG_TEMPLATE: &str = r#"apiVersion: v1
clusters:
- cluster:
    certificate-authority-data: {{ca_certificate}}
    server: https://{{endpoint}}
  name: {{context}}
contexts:
- context:
    cluster: {{context}}
    user: {{context}}
  name: {{context}}
current-context: {{context}}
kind: Config
preferences: {}
users:
- name: {{context}}
  user:
    auth-provider:
      config:
        cmd-args: config config-helper --format=json
        cmd-path: gcloud
        expiry-key: '{.credential.token_expiry}'
        token-key: '{.credential.access_token}'
      name: gcp
"#;

#[derive(Serialize)]
struct TemplateData<'a> {
    context: String,
    endpoint: &'a str,
    ca_certificate: &'a str,
}

/// Renders the kubeconfig document
pub struct KubeconfigTemplate {
    registry: Handlebars<'static>,
}

impl KubeconfigTemplate {
    pub fn new() -> Result<Self, Error> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        // Output is YAML, not HTML.
        registry.register_escape_fn(handlebars::no_escape);
        registry.register_template_string(TEMPLATE_NAME, KUBECONFIG_TEMPLATE)?;

        Ok(Self { registry })
    }

    /// Process-wide instance, compiled on first use
    pub fn shared() -> Result<&'static Self, Error> {
        if let Some(template) = SHARED.get() {
            return Ok(template);
        }

        let template = Self::new()?;
        Ok(SHARED.get_or_init(|| template))
    }

    /// Render the document for one cluster. Values are embedded as is.
    pub fn render(
        &self,
        identity: &ContextIdentity,
        info: &ClusterAccessInfo,
    ) -> Result<String, Error> {
        let data = TemplateData {
            context: identity.context_name(&info.name),
            endpoint: &info.endpoint,
            ca_certificate: &info.ca_certificate,
        };

        Ok(self.registry.render(TEMPLATE_NAME, &data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_ends_with_newline() {
        let template = KubeconfigTemplate::new().unwrap();
        let info = ClusterAccessInfo::new(
            "gke-native".to_string(),
            "34.1.2.3".to_string(),
            "QUJDRA==".to_string(),
        );

        let out = template
            .render(&ContextIdentity::new("p", "z"), &info)
            .unwrap();

        assert!(out.starts_with("apiVersion: v1\n"));
        assert!(out.ends_with("      name: gcp\n"));
        assert!(out.contains("  name: p_z_gke-native\n"));
    }

    #[test]
    fn test_shared_is_compiled_once() {
        let first = KubeconfigTemplate::shared().unwrap();
        let second = KubeconfigTemplate::shared().unwrap();

        assert!(std::ptr::eq(first, second));
    }
}
