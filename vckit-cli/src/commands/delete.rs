use anyhow::Result;
use vckit_common::registry::RegistryClient;
use vckit_common::vm::{delete_vm_flow, DeleteOptions};
use vckit_common::vsphere::VsphereClient;

pub async fn execute(
    client: &VsphereClient,
    registry_url: &str,
    vmname: String,
    purge: bool,
    node_name: Option<String>,
) -> Result<()> {
    let registry = RegistryClient::new(registry_url)?;

    let opts = DeleteOptions {
        name: vmname,
        purge,
        node_name,
    };

    let report = delete_vm_flow(client, &registry, &opts).await?;

    println!("Deleted virtual machine {}", report.name);

    if let Some(record) = report.purged {
        println!("Deleted node {record}");
        println!("Deleted client {record}");
    } else {
        println!(
            "Corresponding node and client for the {} server were not deleted and remain registered with the registry",
            report.name
        );
    }

    Ok(())
}
