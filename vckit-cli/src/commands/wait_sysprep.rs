use std::io::Write as _;
use std::time::Duration;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use vckit_common::events::{wait_for_event, EntityRef, WaitOptions, CUSTOMIZATION_SUCCEEDED};
use vckit_common::vsphere::VsphereClient;
use vckit_common::VcError;

pub async fn execute(
    client: &VsphereClient,
    vmname: &str,
    sleep_secs: u64,
    timeout_secs: u64,
) -> Result<()> {
    let vm = client
        .find_vm(vmname)
        .await?
        .ok_or_else(|| VcError::NotFound {
            name: vmname.to_string(),
        })?;

    let entity = EntityRef {
        id: vm.vm,
        name: vm.name,
    };

    // Ctrl-C aborts the wait instead of killing the process mid-write.
    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let opts = WaitOptions {
        interval: Duration::from_secs(sleep_secs),
        timeout: Duration::from_secs(timeout_secs),
        cancel,
    };

    print!("Waiting for sysprep...");
    std::io::stdout().flush()?;

    let result = wait_for_event(&entity, client, CUSTOMIZATION_SUCCEEDED, &opts, || {
        print!(".");
        let _ = std::io::stdout().flush();
    })
    .await;

    // Terminate the dot line whether we succeeded or not.
    println!();

    for event in result? {
        println!("{}", event.full_formatted_message);
    }

    Ok(())
}
