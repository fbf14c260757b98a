//! Compute instances of a single compartment.
//!
//! # Usage
//!
//! ```bash
//! oci-ops list-instances --compartment-id ocid1.compartment.oc1..xxx --profile ops
//!
//! # Seed a start-stop config file
//! oci-ops list-instances --compartment-id ocid1.compartment.oc1..xxx --profile ops --json > instances.json
//! ```

use crate::commands::start_stop::InstanceEntry;
use crate::oci_api::models::Instance;
use crate::oci_api::OciClient;
use crate::utils::format::format_number;
use anyhow::{Context, Result};

pub async fn run(
    config_file: Option<&str>,
    profile: &str,
    compartment_id: &str,
    json: bool,
) -> Result<()> {
    let (config, client) = OciClient::from_profile(config_file, profile)?;

    let instances = client
        .list_instances(compartment_id)
        .await
        .with_context(|| format!("Failed to list instances in {}", compartment_id))?;

    if instances.is_empty() {
        eprintln!("No instances found in compartment {}", compartment_id);
        return Ok(());
    }
    eprintln!("Found {} instances", format_number(instances.len()));

    if json {
        println!("{}", render_entries(&instances, &config.profile)?);
    } else {
        for instance in &instances {
            println!("{}", instance_line(instance));
        }
    }

    Ok(())
}

fn instance_line(instance: &Instance) -> String {
    format!(
        "Instance {} state: {} OCID: {}",
        instance.display_name, instance.lifecycle_state, instance.id
    )
}

/// Instances as a start-stop config document.
pub fn render_entries(instances: &[Instance], profile: &str) -> Result<String> {
    let entries: Vec<InstanceEntry> = instances
        .iter()
        .map(|i| InstanceEntry::from_instance(i, profile))
        .collect();
    Ok(serde_json::to_string_pretty(&entries)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oci_api::models::LifecycleState;

    fn instance() -> Instance {
        Instance {
            id: "ocid1.instance.oc1..vm".to_string(),
            display_name: "runner".to_string(),
            compartment_id: "ocid1.compartment.oc1..c".to_string(),
            lifecycle_state: LifecycleState::Running,
            shape: Some("VM.Standard.E4.Flex".to_string()),
            availability_domain: None,
        }
    }

    #[test]
    fn test_instance_line() {
        assert_eq!(
            instance_line(&instance()),
            "Instance runner state: RUNNING OCID: ocid1.instance.oc1..vm"
        );
    }

    #[test]
    fn test_render_entries() {
        let text = render_entries(&[instance()], "ops").unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            value,
            serde_json::json!([{
                "instance": "runner",
                "compartment_id": "ocid1.compartment.oc1..c",
                "profilename": "ops",
                "instance_id": "ocid1.instance.oc1..vm"
            }])
        );
    }
}
