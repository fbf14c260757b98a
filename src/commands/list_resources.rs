//! Resource listing across the compartment tree.
//!
//! For every `ACTIVE` compartment below the root, lists one kind of
//! resource. A compartment whose listing fails is reported and skipped.
//!
//! # Usage
//!
//! ```bash
//! # Every compartment with its parent
//! oci-ops list-resources --resource compartments --profile DEFAULT
//!
//! # All compute instances, written to a file
//! oci-ops list-resources --resource compute --profile ops --output instances.txt
//!
//! # Running instances without an active vulnerability scanning agent
//! oci-ops list-resources --resource compute-agents --profile ops
//!
//! # IAM policies and their statements
//! oci-ops list-resources --resource policy --profile ops
//!
//! # Subscribed regions of the tenancy
//! oci-ops list-resources --resource regions --profile ops
//! ```

use crate::oci_api::models::{Instance, InstanceAgentPlugin, LifecycleState, Policy, RegionSubscription};
use crate::oci_api::{CompartmentNode, CompartmentWalker, OciClient};
use crate::utils::format::format_number;
use anyhow::{Context, Result};
use clap::ValueEnum;
use std::fs::File;
use std::io::{BufWriter, Write};

/// Plugin whose absence `compute-agents` reports.
pub const SCANNING_PLUGIN: &str = "Vulnerability Scanning";
const PLUGIN_RUNNING: &str = "RUNNING";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ResourceKind {
    Compartments,
    Compute,
    ComputeAgents,
    Policy,
    Regions,
}

/// A running instance whose scanning plugin is not running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnscannedInstance {
    pub compartment: String,
    pub name: String,
    pub id: String,
}

/// What one listing run saw.
#[derive(Debug, Default)]
pub struct ResourceReport {
    pub compartments_visited: usize,
    pub resources_listed: usize,
    /// Compartments (or instances) whose listing failed, with the error
    pub failures: Vec<(String, String)>,
    pub unscanned: Vec<UnscannedInstance>,
}

pub async fn run(
    config_file: Option<&str>,
    profile: &str,
    resource: ResourceKind,
    root: Option<&str>,
    max_compartments: usize,
    output: Option<&str>,
) -> Result<()> {
    let (config, client) = OciClient::from_profile(config_file, profile)?;
    let root_id = root.unwrap_or(&config.tenancy);

    eprintln!("=== OCI Resource Listing ===");
    eprintln!("Profile: {} ({})", config.profile, client.region());
    eprintln!("Resource: {:?}", resource);
    eprintln!();

    let report = match output {
        Some(path) => {
            let file =
                File::create(path).with_context(|| format!("Failed to create output file: {}", path))?;
            let mut out = BufWriter::new(file);
            let report = list(&client, resource, root_id, max_compartments, &mut out).await?;
            out.flush()
                .with_context(|| format!("Failed to write output to: {}", path))?;
            eprintln!("Output written to: {}", path);
            report
        }
        None => {
            let mut out = std::io::stdout().lock();
            list(&client, resource, root_id, max_compartments, &mut out).await?
        }
    };

    eprintln!("\n=== Summary ===");
    if resource != ResourceKind::Regions {
        eprintln!(
            "Compartments visited: {}",
            format_number(report.compartments_visited)
        );
    }
    eprintln!("Resources listed: {}", format_number(report.resources_listed));
    if !report.failures.is_empty() {
        eprintln!("⚠️  {} listings failed:", report.failures.len());
        for (what, error) in &report.failures {
            eprintln!("  {}: {}", what, error);
        }
    }

    Ok(())
}

/// List `resource` below `root_id` into `out`.
pub async fn list<W: Write>(
    client: &OciClient,
    resource: ResourceKind,
    root_id: &str,
    max_compartments: usize,
    out: &mut W,
) -> Result<ResourceReport> {
    let mut report = ResourceReport::default();

    if resource == ResourceKind::Regions {
        let regions = client
            .list_region_subscriptions()
            .await
            .context("Failed to list region subscriptions")?;
        for region in &regions {
            writeln!(out, "{}", region_line(region))?;
        }
        report.resources_listed = regions.len();
        return Ok(report);
    }

    let walk = CompartmentWalker::new(client)
        .with_max_visits(max_compartments)
        .walk(root_id)
        .await
        .with_context(|| format!("Failed to read root compartment {}", root_id))?;
    report.compartments_visited = walk.nodes.len();
    report.failures.extend(walk.errors);

    for node in &walk.nodes {
        let name = &node.compartment.name;
        let id = &node.compartment.id;
        let listed = match resource {
            ResourceKind::Compartments => {
                if let Some(parent) = &node.parent_name {
                    writeln!(out, "{}", compartment_line(parent, node))?;
                    report.resources_listed += 1;
                }
                Ok(())
            }
            ResourceKind::Compute => match client.list_instances(id).await {
                Ok(instances) => {
                    for instance in &instances {
                        writeln!(out, "{}", instance_line(name, instance))?;
                    }
                    report.resources_listed += instances.len();
                    Ok(())
                }
                Err(e) => Err(e),
            },
            ResourceKind::ComputeAgents => match client.list_instances(id).await {
                Ok(instances) => {
                    for instance in &instances {
                        writeln!(out, "{}", instance_line(name, instance))?;
                        report.resources_listed += 1;
                        if instance.lifecycle_state != LifecycleState::Running {
                            continue;
                        }
                        match client.list_instance_agent_plugins(id, &instance.id).await {
                            Ok(plugins) => {
                                for plugin in &plugins {
                                    writeln!(out, "    {}: {}", plugin.name, plugin.status)?;
                                }
                                if !scanner_running(&plugins) {
                                    report.unscanned.push(UnscannedInstance {
                                        compartment: name.clone(),
                                        name: instance.display_name.clone(),
                                        id: instance.id.clone(),
                                    });
                                }
                            }
                            Err(e) => report.failures.push((
                                format!("agent plugins of {}", instance.display_name),
                                e.to_string(),
                            )),
                        }
                    }
                    Ok(())
                }
                Err(e) => Err(e),
            },
            ResourceKind::Policy => match client.list_policies(id).await {
                Ok(policies) => {
                    for policy in &policies {
                        write_policy(out, name, policy)?;
                    }
                    report.resources_listed += policies.len();
                    Ok(())
                }
                Err(e) => Err(e),
            },
            ResourceKind::Regions => Ok(()),
        };

        if let Err(e) = listed {
            eprintln!("Warning: listing failed in compartment {}: {}", name, e);
            report.failures.push((name.clone(), e.to_string()));
        }
    }

    if resource == ResourceKind::ComputeAgents {
        writeln!(out)?;
        if report.unscanned.is_empty() {
            writeln!(out, "All running instances have {} running", SCANNING_PLUGIN)?;
        } else {
            writeln!(
                out,
                "Running instances without {} ({}):",
                SCANNING_PLUGIN,
                report.unscanned.len()
            )?;
            for instance in &report.unscanned {
                writeln!(
                    out,
                    "  Compartment: {}, Instance: {}, OCID: {}",
                    instance.compartment, instance.name, instance.id
                )?;
            }
        }
    }

    Ok(report)
}

/// True when the scanning plugin is present and running.
pub fn scanner_running(plugins: &[InstanceAgentPlugin]) -> bool {
    plugins
        .iter()
        .any(|p| p.name == SCANNING_PLUGIN && p.status.eq_ignore_ascii_case(PLUGIN_RUNNING))
}

fn compartment_line(parent: &str, node: &CompartmentNode) -> String {
    format!(
        "Parent compartment: {} Name: {}, OCID: {}",
        parent, node.compartment.name, node.compartment.id
    )
}

fn instance_line(compartment: &str, instance: &Instance) -> String {
    format!(
        "Compartment: {}, OCID: {}, State: {}, Name: {}",
        compartment, instance.id, instance.lifecycle_state, instance.display_name
    )
}

fn write_policy<W: Write>(out: &mut W, compartment: &str, policy: &Policy) -> Result<()> {
    writeln!(
        out,
        "Compartment: {}, Policy: {}, Description: {}",
        compartment, policy.name, policy.description
    )?;
    for statement in &policy.statements {
        writeln!(out, "    {}", statement)?;
    }
    Ok(())
}

fn region_line(region: &RegionSubscription) -> String {
    format!(
        "Region: {} ({}), Status: {}{}",
        region.region_name,
        region.region_key.as_deref().unwrap_or("-"),
        region.status.as_deref().unwrap_or("UNKNOWN"),
        if region.is_home_region { ", home" } else { "" }
    )
}
