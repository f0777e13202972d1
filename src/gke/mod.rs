/// GKE resources: declarations, gcloud client and resolved cluster outputs
pub mod client;
pub mod declarations;
pub mod models;
pub mod outputs;

pub use client::GcloudClient;
pub use declarations::Plan;
pub use outputs::ClusterOutputs;
