//! Start, stop or query compute instances named in an instance-config file.
//!
//! The config file is a JSON array of entries:
//!
//! ```json
//! [
//!   {
//!     "instance": "build-runner",
//!     "compartment_id": "ocid1.compartment.oc1..xxx",
//!     "profilename": "ops",
//!     "oci_config_file_path": "~/.oci/config",
//!     "nsg_name": "build-runner-ingress"
//!   }
//! ]
//! ```
//!
//! When `nsg_name` is set, starting an instance first adds that network
//! security group to its primary VNIC and stopping removes it again once the
//! instance is down.
//!
//! # Usage
//!
//! ```bash
//! oci-ops start-stop --config-file instances.json --list
//! oci-ops start-stop --config-file instances.json --instance build-runner --action start
//! oci-ops start-stop --config-file instances.json --instance build-runner --action status
//! ```
//!
//! `oci-ops list-instances --json` writes entries in this format.

use crate::config::DEFAULT_PROFILE;
use crate::oci_api::models::{Instance, LifecycleState};
use crate::oci_api::OciClient;
use anyhow::{anyhow, bail, Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

pub const DEFAULT_POLL_ATTEMPTS: u32 = 5;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Action {
    Start,
    Stop,
    Status,
}

/// One instance-config entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceEntry {
    pub instance: String,
    pub compartment_id: String,
    pub profilename: String,
    /// Informational; the OCID is looked up by display name at run time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oci_config_file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nsg_name: Option<String>,
}

impl InstanceEntry {
    /// Entry for an instance found in `compartment_id`.
    pub fn from_instance(instance: &Instance, profile: &str) -> Self {
        Self {
            instance: instance.display_name.clone(),
            compartment_id: instance.compartment_id.clone(),
            profilename: profile.to_string(),
            instance_id: Some(instance.id.clone()),
            oci_config_file_path: None,
            nsg_name: None,
        }
    }

    fn profile(&self) -> &str {
        if self.profilename.is_empty() {
            DEFAULT_PROFILE
        } else {
            &self.profilename
        }
    }
}

/// Read and validate an instance-config file.
pub fn load_entries(path: &str) -> Result<Vec<InstanceEntry>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read instance config file: {}", path))?;
    let entries: Vec<InstanceEntry> = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse instance config file: {}", path))?;
    Ok(entries)
}

pub fn find_entry<'a>(entries: &'a [InstanceEntry], name: &str) -> Result<&'a InstanceEntry> {
    entries
        .iter()
        .find(|e| e.instance == name)
        .ok_or_else(|| anyhow!("Instance '{}' is not in the instance config file", name))
}

/// New NSG membership of a VNIC, or `None` when nothing changes.
pub fn updated_nsg_ids(current: &[String], nsg_id: &str, add: bool) -> Option<Vec<String>> {
    let present = current.iter().any(|id| id == nsg_id);
    match (add, present) {
        (true, false) => {
            let mut ids = current.to_vec();
            ids.push(nsg_id.to_string());
            Some(ids)
        }
        (false, true) => Some(current.iter().filter(|id| *id != nsg_id).cloned().collect()),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_POLL_ATTEMPTS,
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        }
    }
}

pub async fn run(
    config_file: &str,
    action: Action,
    instance: Option<&str>,
    list: bool,
    poll: PollSettings,
) -> Result<()> {
    let entries = load_entries(config_file)?;

    if list {
        for entry in &entries {
            println!("{}", entry.instance);
        }
        return Ok(());
    }

    let name = instance.context("--instance is required unless --list is given")?;
    let entry = find_entry(&entries, name)?;
    let (_, client) = OciClient::from_profile(entry.oci_config_file_path.as_deref(), entry.profile())?;

    let target = find_instance(&client, entry).await?;

    if action == Action::Status {
        println!("{}: {}", entry.instance, target.lifecycle_state);
        return Ok(());
    }
    check_transition(action, target.lifecycle_state)
        .with_context(|| format!("Cannot {:?} {}", action, entry.instance))?;

    let nsg = match &entry.nsg_name {
        Some(nsg_name) => Some(resolve_nsg(&client, entry, &target, nsg_name).await?),
        None => None,
    };

    match action {
        Action::Start => {
            if let Some((vnic_id, nsg_id)) = &nsg {
                set_nsg(&client, vnic_id, nsg_id, true).await?;
            }
            eprintln!("Starting {}...", entry.instance);
            client
                .instance_action(&target.id, "START")
                .await
                .with_context(|| format!("Failed to start {}", entry.instance))?;
            let state = wait_for_state(&client, &target.id, LifecycleState::Running, poll).await?;
            println!("{}: {}", entry.instance, state);
        }
        Action::Stop => {
            eprintln!("Stopping {}...", entry.instance);
            client
                .instance_action(&target.id, "STOP")
                .await
                .with_context(|| format!("Failed to stop {}", entry.instance))?;
            let state = wait_for_state(&client, &target.id, LifecycleState::Stopped, poll).await?;
            println!("{}: {}", entry.instance, state);
            if let Some((vnic_id, nsg_id)) = &nsg {
                set_nsg(&client, vnic_id, nsg_id, false).await?;
            }
        }
        Action::Status => {}
    }

    Ok(())
}

async fn find_instance(client: &OciClient, entry: &InstanceEntry) -> Result<Instance> {
    let instances = client
        .list_instances(&entry.compartment_id)
        .await
        .with_context(|| format!("Failed to list instances in {}", entry.compartment_id))?;
    instances
        .into_iter()
        .find(|i| i.display_name == entry.instance && i.lifecycle_state != LifecycleState::Terminated)
        .ok_or_else(|| {
            anyhow!(
                "No instance named '{}' in compartment {}",
                entry.instance,
                entry.compartment_id
            )
        })
}

/// `(primary VNIC id, NSG id)` for the entry's NSG.
async fn resolve_nsg(
    client: &OciClient,
    entry: &InstanceEntry,
    instance: &Instance,
    nsg_name: &str,
) -> Result<(String, String)> {
    let nsg_id = client
        .list_network_security_groups(&entry.compartment_id)
        .await
        .context("Failed to list network security groups")?
        .into_iter()
        .find(|n| n.display_name == nsg_name)
        .map(|n| n.id)
        .ok_or_else(|| anyhow!("No network security group named '{}'", nsg_name))?;

    let vnic_id = client
        .list_vnic_attachments(&entry.compartment_id, &instance.id)
        .await
        .context("Failed to list VNIC attachments")?
        .into_iter()
        .find_map(|a| a.vnic_id)
        .ok_or_else(|| anyhow!("Instance '{}' has no attached VNIC", entry.instance))?;

    Ok((vnic_id, nsg_id))
}

async fn set_nsg(client: &OciClient, vnic_id: &str, nsg_id: &str, add: bool) -> Result<()> {
    let vnic = client
        .get_vnic(vnic_id)
        .await
        .with_context(|| format!("Failed to read VNIC {}", vnic_id))?;
    let current = vnic.nsg_ids.unwrap_or_default();

    match updated_nsg_ids(&current, nsg_id, add) {
        Some(ids) => {
            client
                .update_vnic_nsgs(vnic_id, &ids)
                .await
                .with_context(|| format!("Failed to update NSGs of VNIC {}", vnic_id))?;
            eprintln!(
                "{} network security group {}",
                if add { "Added" } else { "Removed" },
                nsg_id
            );
        }
        None => eprintln!(
            "Network security group {} already {}",
            nsg_id,
            if add { "attached" } else { "detached" }
        ),
    }
    Ok(())
}

/// Poll until the instance reaches `target` or the attempts run out.
///
/// Returns the last observed state either way.
async fn wait_for_state(
    client: &OciClient,
    instance_id: &str,
    target: LifecycleState,
    poll: PollSettings,
) -> Result<LifecycleState> {
    let mut state = LifecycleState::Unknown;
    for attempt in 1..=poll.attempts.max(1) {
        tokio::time::sleep(poll.interval).await;
        state = client
            .get_instance(instance_id)
            .await
            .context("Failed to read instance state")?
            .lifecycle_state;
        eprintln!("  [{}/{}] {}", attempt, poll.attempts.max(1), state);
        if state == target {
            return Ok(state);
        }
    }
    eprintln!("⚠️  Instance did not reach {} in time", target);
    Ok(state)
}

/// Fail early on an action that makes no sense for the current state.
pub fn check_transition(action: Action, state: LifecycleState) -> Result<()> {
    match (action, state) {
        (Action::Start, LifecycleState::Terminated | LifecycleState::Terminating)
        | (Action::Stop, LifecycleState::Terminated | LifecycleState::Terminating) => {
            bail!("Instance is {}", state)
        }
        _ => Ok(()),
    }
}
