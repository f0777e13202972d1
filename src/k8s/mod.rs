/// Kubernetes access through the generated kubeconfig
pub mod client;

pub use client::KubernetesClient;
